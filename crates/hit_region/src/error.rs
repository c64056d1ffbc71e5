//! Ways a sampling pass can end without producing an index.

use core::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SamplingAbort {
    #[error("sampling cancelled after {sampled} of {total} points")]
    Cancelled { sampled: usize, total: usize },
    #[error(
        "sampling timed out after {elapsed:?} ({sampled} of {total} points); \
         try a sampling resolution of {suggested_resolution}"
    )]
    TimedOut {
        elapsed: Duration,
        sampled: usize,
        total: usize,
        suggested_resolution: u32,
    },
    #[error("sampling pass dropped with {remaining} points left")]
    Unfinished { remaining: usize },
}

impl SamplingAbort {
    /// Coarser resolution worth retrying with, for aborts caused by the page size.
    pub const fn suggested_resolution(&self) -> Option<u32> {
        match self {
            Self::TimedOut {
                suggested_resolution,
                ..
            } => Some(*suggested_resolution),
            Self::Cancelled { .. } | Self::Unfinished { .. } => None,
        }
    }

    /// Short machine-readable reason.
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::Cancelled { .. } => "cancelled",
            Self::TimedOut { .. } => "timeout",
            Self::Unfinished { .. } => "unfinished",
        }
    }
}
