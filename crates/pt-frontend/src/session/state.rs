//! Session states and progress captions.

use std::fmt;

/// Where the practice round is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionState {
    /// User poses the cube
    #[default]
    Posing,
    /// Capture done; waiting for the user's drawing
    DrawingUpload,
    /// Drawing aspect differs from the capture; waiting for a crop
    Cropping,
    /// Comparison in flight
    Analyzing,
    Result,
    Error,
}

impl SessionState {
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Posing => "posing",
            SessionState::DrawingUpload => "drawing upload",
            SessionState::Cropping => "cropping",
            SessionState::Analyzing => "analyzing",
            SessionState::Result => "result",
            SessionState::Error => "error",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Cosmetic captions cycled while analyzing
pub const ANALYZING_CAPTIONS: [&str; 5] = [
    "Looking at your lines…",
    "Finding the vanishing points…",
    "Checking the verticals…",
    "Comparing angles with the reference…",
    "Writing feedback…",
];
