//! Perspective Tutor Frontend
//!
//! Critique session flow, result overlays, configuration and the local
//! progress store behind the `pt` binary.

pub mod config;
pub mod overlay;
pub mod progress;
pub mod session;

pub use config::{AppConfig, ConfigManager, PracticeConfig, SessionConfig};
pub use overlay::{OverlayLayers, OverlayOptions, OverlayTarget, RevealAnimation};
pub use progress::{CritiqueRecord, CritiqueReward, LocalProgress, ProgressRecorder};
pub use session::{ActionError, CritiqueSession, SessionError, SessionState};
