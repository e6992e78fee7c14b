//! Transport seam between the client and a generation service.

use crate::error::CritiqueError;
use crate::payload::InlineImage;

/// Output format requested from the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseFormat {
    #[default]
    Json,
    Text,
}

impl ResponseFormat {
    pub fn mime_type(&self) -> &'static str {
        match self {
            ResponseFormat::Json => "application/json",
            ResponseFormat::Text => "text/plain",
        }
    }
}

/// One model call: system role, images in order, then the instruction text
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateRequest {
    pub system_instruction: String,
    pub images: Vec<InlineImage>,
    pub instruction_text: String,
    pub response_format: ResponseFormat,
}

/// A multimodal text generation service.
///
/// Implementations return the model's raw text and classify failures into
/// [`CritiqueError`]; rate limits must map to an error whose
/// [`CritiqueError::is_rate_limit`] is true.
pub trait GenerationBackend: Send + Sync {
    fn generate(&self, model: &str, request: &GenerateRequest) -> Result<String, CritiqueError>;
}

impl<B: GenerationBackend + ?Sized> GenerationBackend for std::sync::Arc<B> {
    fn generate(&self, model: &str, request: &GenerateRequest) -> Result<String, CritiqueError> {
        (**self).generate(model, request)
    }
}

impl<B: GenerationBackend + ?Sized> GenerationBackend for Box<B> {
    fn generate(&self, model: &str, request: &GenerateRequest) -> Result<String, CritiqueError> {
        (**self).generate(model, request)
    }
}
