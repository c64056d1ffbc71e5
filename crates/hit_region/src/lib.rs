//! Hit-region sampling engine.
//!
//! Given a document exposing a point-hit-test primitive, this crate computes
//! which viewport coordinates would deliver a click to which interactive
//! element:
//! - [`coords`]: coordinates and their `u64` map-key encoding;
//! - [`classifier`]: role-based interactive-element detection;
//! - [`index`]: the bidirectional element/coordinate index;
//! - [`sampler`]: grid sampling, resumable passes, cancellation and timeouts.

pub mod classifier;
pub mod coords;
pub mod error;
pub mod index;
pub mod sampler;
pub mod stats;

pub use classifier::{effective_role, find_interactive_ancestor, is_interactive};
pub use coords::{Coordinate, CoordinateKey, CoordinateParseError, is_valid};
pub use error::SamplingAbort;
pub use index::{DEFAULT_MAX_COORDINATES_PER_ELEMENT, HitRegionIndex, Insertion};
pub use sampler::{
    CancellationHandle, DEFAULT_SAMPLING_TIMEOUT, MAX_RESOLUTION, PassStatus, SLOW_PASS_THRESHOLD,
    Sample, SamplingOptions, SamplingPass, calculate, generate_grid, get_hit_region, sample_one,
    suggest_coarser_resolution,
};
pub use stats::{Progress, SamplingStats};
