//! Application configuration module
//!
//! Aggregates the capture, client, session and practice settings and
//! persists them as RON.

mod manager;

pub use manager::{ConfigError, ConfigManager};

use std::time::Duration;

use pt_core::{Difficulty, PerspectiveMode};
use pt_critique::ClientConfig;
use pt_renderer::CaptureConfig;
use serde::{Deserialize, Serialize};

use crate::overlay::OverlayOptions;

/// Critique session timing and input handling
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
    /// Seconds of analysis before the user may abandon it
    pub cancel_after_secs: u64,
    /// Progress caption rotation interval
    pub caption_interval_ms: u64,
    /// Relative aspect difference accepted without the cropping step
    pub aspect_tolerance: f32,
    /// Send the capture's exact edges instead of scanning the reference
    pub use_ground_truth_reference: bool,
    /// Longest side of history thumbnails
    pub thumbnail_size: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cancel_after_secs: 15,
            caption_interval_ms: 2500,
            aspect_tolerance: 0.02,
            use_ground_truth_reference: true,
            thumbnail_size: 160,
        }
    }
}

impl SessionConfig {
    pub fn cancel_after(&self) -> Duration {
        Duration::from_secs(self.cancel_after_secs)
    }

    pub fn caption_interval(&self) -> Duration {
        Duration::from_millis(self.caption_interval_ms.max(1))
    }
}

/// Practice defaults
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct PracticeConfig {
    pub difficulty: Difficulty,
    pub mode: PerspectiveMode,
}

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct AppConfig {
    /// Configuration format version
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub practice: PracticeConfig,
    #[serde(default)]
    pub overlay: OverlayOptions,
}

impl AppConfig {
    /// Current configuration version
    pub const CURRENT_VERSION: u32 = 1;

    pub fn new() -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            ..Default::default()
        }
    }
}
