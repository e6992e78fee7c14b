//! Critique errors.

use pt_core::FailureKind;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CritiqueError {
    /// Connection, DNS or transport failure.
    #[error("Could not reach the analysis service: {0}")]
    Network(String),

    /// The service did not answer in time.
    #[error("The analysis service timed out: {0}")]
    Timeout(String),

    /// Non-success HTTP status that is not a rate limit.
    #[error("The analysis service returned HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// One model asked us to back off.
    #[error("Model {model} is rate limited")]
    RateLimited { model: String },

    /// Every configured model asked us to back off.
    #[error("All models are busy ({}); try again in a minute", attempted.join(", "))]
    RateLimitExhausted { attempted: Vec<String> },

    /// The response was not valid or complete JSON.
    #[error("Could not read the analysis: {0}")]
    Parse(String),

    #[error("No API key found; set the {0} environment variable")]
    MissingApiKey(String),

    #[error("No models configured")]
    NoModels,

    #[error("Image payload error: {0}")]
    Image(String),
}

impl CritiqueError {
    pub fn kind(&self) -> FailureKind {
        match self {
            CritiqueError::Network(_) => FailureKind::NetworkFailure,
            CritiqueError::Timeout(_) => FailureKind::Timeout,
            CritiqueError::Http { status, .. } => match status {
                429 => FailureKind::RateLimited,
                408 | 504 => FailureKind::Timeout,
                500..=599 => FailureKind::NetworkFailure,
                _ => FailureKind::Unknown,
            },
            CritiqueError::RateLimited { .. } | CritiqueError::RateLimitExhausted { .. } => {
                FailureKind::RateLimited
            }
            CritiqueError::Parse(_) => FailureKind::ParseFailure,
            CritiqueError::MissingApiKey(_) | CritiqueError::NoModels | CritiqueError::Image(_) => {
                FailureKind::Unknown
            }
        }
    }

    /// Whether the next model in the fallback list should be tried.
    ///
    /// Besides the typed variants, transport messages carrying a `429` or
    /// `RESOURCE_EXHAUSTED` marker count as rate limits.
    pub fn is_rate_limit(&self) -> bool {
        match self {
            CritiqueError::RateLimited { .. } => true,
            CritiqueError::Http { status: 429, .. } => true,
            CritiqueError::Http { message, .. } | CritiqueError::Network(message) => {
                message.contains("429") || message.contains("RESOURCE_EXHAUSTED")
            }
            _ => false,
        }
    }
}
