//! Gemini `generateContent` backend over HTTP.

use serde::{Deserialize, Serialize};

use crate::backend::{GenerateRequest, GenerationBackend};
use crate::config::ClientConfig;
use crate::error::CritiqueError;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentBody<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Text {
        text: &'a str,
    },
    Inline {
        #[serde(rename = "inlineData")]
        inline_data: InlineData<'a>,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData<'a> {
    mime_type: &'a str,
    data: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    temperature: f32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ApiError,
}

#[derive(Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
    status: Option<String>,
}

fn request_body<'a>(request: &'a GenerateRequest, temperature: f32) -> GenerateContentBody<'a> {
    let mut parts: Vec<Part<'a>> = request
        .images
        .iter()
        .map(|image| Part::Inline {
            inline_data: InlineData {
                mime_type: &image.mime_type,
                data: &image.data,
            },
        })
        .collect();
    parts.push(Part::Text {
        text: &request.instruction_text,
    });

    GenerateContentBody {
        system_instruction: Content {
            role: None,
            parts: vec![Part::Text {
                text: &request.system_instruction,
            }],
        },
        contents: vec![Content {
            role: Some("user"),
            parts,
        }],
        generation_config: GenerationConfig {
            response_mime_type: request.response_format.mime_type(),
            temperature,
        },
    }
}

/// Map a non-success HTTP answer to an error.
fn classify_failure(status: u16, body: &str, model: &str) -> CritiqueError {
    let api = serde_json::from_str::<ErrorEnvelope>(body).ok().map(|e| e.error);
    let api_status = api.as_ref().and_then(|e| e.status.as_deref()).unwrap_or_default();
    let message = api
        .as_ref()
        .map(|e| e.message.clone())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| body.chars().take(200).collect());

    if status == 429 || api_status == "RESOURCE_EXHAUSTED" {
        return CritiqueError::RateLimited {
            model: model.to_string(),
        };
    }
    if status == 408 || status == 504 || api_status == "DEADLINE_EXCEEDED" {
        return CritiqueError::Timeout(message);
    }
    CritiqueError::Http { status, message }
}

/// Concatenated text of the first candidate.
fn candidate_text(body: &str) -> Result<String, CritiqueError> {
    let response: GenerateContentResponse =
        serde_json::from_str(body).map_err(|e| CritiqueError::Parse(e.to_string()))?;

    if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(CritiqueError::Parse(format!("request blocked: {reason}")));
    }

    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| CritiqueError::Parse("response has no candidates".to_string()))?;
    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        let reason = candidate.finish_reason.unwrap_or_else(|| "unknown".to_string());
        return Err(CritiqueError::Parse(format!("empty answer (finish reason {reason})")));
    }
    if candidate.finish_reason.as_deref() == Some("MAX_TOKENS") {
        tracing::warn!("Answer was cut off at the token limit");
    }
    Ok(text)
}

fn transport_error(error: ureq::Error) -> CritiqueError {
    match error {
        ureq::Error::Timeout(t) => CritiqueError::Timeout(t.to_string()),
        ureq::Error::StatusCode(status) => CritiqueError::Http {
            status,
            message: "request failed".to_string(),
        },
        other => CritiqueError::Network(other.to_string()),
    }
}

/// Calls `{endpoint}/models/{model}:generateContent`.
pub struct GeminiBackend {
    agent: ureq::Agent,
    endpoint: String,
    api_key: String,
    temperature: f32,
}

impl GeminiBackend {
    /// Read the API key from the configured environment variable.
    pub fn from_env(config: &ClientConfig) -> Result<Self, CritiqueError> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| CritiqueError::MissingApiKey(config.api_key_env.clone()))?;
        Ok(Self::new(config, api_key))
    }

    pub fn new(config: &ClientConfig, api_key: String) -> Self {
        let agent_config = ureq::Agent::config_builder()
            .timeout_global(Some(config.timeout()))
            .http_status_as_error(false)
            .build();
        Self {
            agent: ureq::Agent::new_with_config(agent_config),
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_key,
            temperature: config.temperature,
        }
    }
}

impl GenerationBackend for GeminiBackend {
    fn generate(&self, model: &str, request: &GenerateRequest) -> Result<String, CritiqueError> {
        let url = format!("{}/models/{}:generateContent", self.endpoint, model);
        tracing::debug!("POST {} ({} images)", url, request.images.len());

        let mut response = self
            .agent
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .send_json(request_body(request, self.temperature))
            .map_err(transport_error)?;

        let status = response.status().as_u16();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(transport_error)?;

        if !(200..300).contains(&status) {
            return Err(classify_failure(status, &body, model));
        }
        candidate_text(&body)
    }
}
