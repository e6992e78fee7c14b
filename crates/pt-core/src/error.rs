//! Shared failure taxonomy and geometry errors

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Classification of every failure the capture and critique pipeline can
/// surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureKind {
    /// Connectivity or transport-level failure
    NetworkFailure,
    /// Service too slow, or the user abandoned the wait
    Timeout,
    /// A response arrived but was not valid or complete JSON
    ParseFailure,
    /// The service asked us to back off; recovered by model fallback
    RateLimited,
    /// Pixel readback or cropping failed; recovered by full-frame capture
    RenderCaptureFailure,
    Unknown,
}

impl FailureKind {
    /// Short user-facing title
    pub fn title(&self) -> &'static str {
        match self {
            FailureKind::NetworkFailure => "Network problem",
            FailureKind::Timeout => "Timed out",
            FailureKind::ParseFailure => "Unreadable response",
            FailureKind::RateLimited => "Service busy",
            FailureKind::RenderCaptureFailure => "Capture failed",
            FailureKind::Unknown => "Something went wrong",
        }
    }

    /// Whether a retry with the same inputs can reasonably succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            FailureKind::NetworkFailure
                | FailureKind::Timeout
                | FailureKind::RateLimited
                | FailureKind::ParseFailure
        )
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// Errors from the projective geometry engine
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    #[error("Render target has no area ({width}x{height})")]
    EmptyViewport { width: u32, height: u32 },

    #[error("Cube corner {index} is behind the camera")]
    CornerBehindCamera { index: usize },
}
