//! Client configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How a comparison is split into service calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ComparisonStrategy {
    /// One request with both images returning grade, feedback and edges
    SingleShot,
    /// Extract reference edges, extract drawing edges, then compare
    #[default]
    TwoPhase,
}

impl ComparisonStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            ComparisonStrategy::SingleShot => "single-shot",
            ComparisonStrategy::TwoPhase => "two-phase",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// API base URL, without the `/models/...` suffix
    pub endpoint: String,
    /// Primary model first, then fallbacks in order
    pub models: Vec<String>,
    /// Environment variable holding the API key
    pub api_key_env: String,
    pub timeout_secs: u64,
    pub temperature: f32,
    pub strategy: ComparisonStrategy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            models: vec![
                "gemini-2.5-flash".to_string(),
                "gemini-2.0-flash".to_string(),
                "gemini-2.0-flash-lite".to_string(),
            ],
            api_key_env: "GEMINI_API_KEY".to_string(),
            timeout_secs: 60,
            temperature: 0.2,
            strategy: ComparisonStrategy::default(),
        }
    }
}

impl ClientConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}
