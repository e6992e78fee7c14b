//! Session errors.

use pt_core::FailureKind;
use pt_critique::CritiqueError;
use pt_renderer::CaptureError;
use thiserror::Error;

use super::state::SessionState;

/// Failure shown in the error state
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct SessionError {
    pub kind: FailureKind,
    pub message: String,
}

impl SessionError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Title and message for display
    pub fn display_text(&self) -> String {
        format!("{}: {}", self.kind.title(), self.message)
    }
}

impl From<&CritiqueError> for SessionError {
    fn from(error: &CritiqueError) -> Self {
        Self::new(error.kind(), error.to_string())
    }
}

/// A user action that could not be carried out
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("Cannot {action} while {state}")]
    InvalidState {
        action: &'static str,
        state: SessionState,
    },

    #[error("{0}")]
    NotReady(String),

    #[error("Capture failed: {0}")]
    Capture(#[from] CaptureError),

    #[error("Invalid drawing: {0}")]
    Drawing(String),
}

impl ActionError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ActionError::Capture(e) => e.kind(),
            _ => FailureKind::Unknown,
        }
    }
}
