//! Page handler for hit-region visualization.
//!
//! This crate orchestrates the hit-region engine for a single page: it keeps
//! the settings in sync with a configuration store, resolves the element the
//! inspector selected, filters page mutations down to the ones that can move
//! click targets, debounces them, runs sampling passes cooperatively and keeps
//! the overlay in step with the latest completed index.

pub mod config;
pub mod events;
pub mod invalidation;
pub mod overlay;
pub mod runtime;
pub mod scheduler;
pub mod selection;
pub mod state;
pub mod store;
pub mod telemetry;

pub use config::{EngineConfig, HighlightColor, HitmapSettings};
pub use events::{PageEvent, PageNotice};
pub use overlay::{Overlay, OverlayFrame, RecordingOverlay};
pub use selection::{ElementIdentifier, SelectionError};
pub use state::PageContext;
pub use store::{ConfigChange, ConfigStore, JsonFileStore, MemoryStore};
