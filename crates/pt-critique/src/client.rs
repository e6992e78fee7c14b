//! Comparison client: model fallback and the two call strategies.

use pt_core::{AxisClass, Difficulty, EdgeSegment, Grade, Normalized, PerspectiveMode, count_axis};
use serde::{Deserialize, Serialize};

use crate::backend::{GenerateRequest, GenerationBackend, ResponseFormat};
use crate::config::{ClientConfig, ComparisonStrategy};
use crate::error::CritiqueError;
use crate::payload::InlineImage;
use crate::prompt::{ImageRole, PromptSpec, build_instructions};
use crate::response::{parse_comparison, parse_edges, parse_verdict};

/// Outcome of one comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonResult {
    pub grade: Grade,
    /// Markdown
    pub feedback: String,
    pub reference_edges: Vec<EdgeSegment<Normalized>>,
    pub user_edges: Vec<EdgeSegment<Normalized>>,
}

impl ComparisonResult {
    /// `(left, right, vertical)` counts of the user's detected edges
    pub fn user_edge_counts(&self) -> (usize, usize, usize) {
        (
            count_axis(&self.user_edges, AxisClass::Left),
            count_axis(&self.user_edges, AxisClass::Right),
            count_axis(&self.user_edges, AxisClass::Vertical),
        )
    }
}

/// Inputs of one comparison
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonRequest {
    pub reference: InlineImage,
    pub drawing: InlineImage,
    /// Exact reference edges from the capture; skips the reference scan
    pub reference_edges: Option<Vec<EdgeSegment<Normalized>>>,
    pub difficulty: Difficulty,
    pub mode: PerspectiveMode,
}

/// Progress reported while a comparison runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparisonPhase {
    ScanningReference,
    ScanningDrawing,
    Comparing,
}

impl ComparisonPhase {
    pub fn label(&self) -> &'static str {
        match self {
            ComparisonPhase::ScanningReference => "Scanning reference…",
            ComparisonPhase::ScanningDrawing => "Scanning your drawing…",
            ComparisonPhase::Comparing => "Comparing…",
        }
    }
}

/// Anything that can grade a drawing against a reference.
pub trait Comparator: Send + Sync {
    fn compare(
        &self,
        request: &ComparisonRequest,
        progress: &mut dyn FnMut(ComparisonPhase),
    ) -> Result<ComparisonResult, CritiqueError>;
}

/// Talks to a [`GenerationBackend`] with ordered model fallback.
pub struct ComparisonClient<B> {
    backend: B,
    config: ClientConfig,
}

impl<B: GenerationBackend> ComparisonClient<B> {
    pub fn new(backend: B, config: ClientConfig) -> Self {
        Self { backend, config }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Send one request, moving down the model list on rate limits.
    ///
    /// Every call starts at the primary model. Any other failure is
    /// returned immediately.
    pub fn generate(&self, request: &GenerateRequest) -> Result<String, CritiqueError> {
        let mut attempted = Vec::new();
        for model in &self.config.models {
            match self.backend.generate(model, request) {
                Ok(text) => {
                    if !attempted.is_empty() {
                        tracing::info!("Request succeeded on fallback model {}", model);
                    }
                    return Ok(text);
                }
                Err(e) if e.is_rate_limit() => {
                    tracing::warn!("Model {} rate limited, trying next model", model);
                    attempted.push(model.clone());
                }
                Err(e) => return Err(e),
            }
        }

        if attempted.is_empty() {
            Err(CritiqueError::NoModels)
        } else {
            Err(CritiqueError::RateLimitExhausted { attempted })
        }
    }

    fn single_shot(
        &self,
        spec: &PromptSpec,
        request: &ComparisonRequest,
        progress: &mut dyn FnMut(ComparisonPhase),
    ) -> Result<ComparisonResult, CritiqueError> {
        progress(ComparisonPhase::Comparing);
        let text = self.generate(&GenerateRequest {
            system_instruction: spec.system_instruction(),
            images: vec![request.reference.clone(), request.drawing.clone()],
            instruction_text: spec.single_shot_instructions(),
            response_format: ResponseFormat::Json,
        })?;
        let mut result = parse_comparison(&text)?;
        if let Some(exact) = &request.reference_edges {
            result.reference_edges = exact.clone();
        }
        Ok(result)
    }

    fn extract(&self, spec: &PromptSpec, image: &InlineImage, role: ImageRole) -> Result<Vec<EdgeSegment<Normalized>>, CritiqueError> {
        let text = self.generate(&GenerateRequest {
            system_instruction: spec.system_instruction(),
            images: vec![image.clone()],
            instruction_text: spec.extraction_instructions(role),
            response_format: ResponseFormat::Json,
        })?;
        parse_edges(&text)
    }

    fn two_phase(
        &self,
        spec: &PromptSpec,
        request: &ComparisonRequest,
        progress: &mut dyn FnMut(ComparisonPhase),
    ) -> Result<ComparisonResult, CritiqueError> {
        progress(ComparisonPhase::ScanningReference);
        let reference_edges = match &request.reference_edges {
            Some(exact) => exact.clone(),
            None => self.extract(spec, &request.reference, ImageRole::Reference)?,
        };

        progress(ComparisonPhase::ScanningDrawing);
        let user_edges = self.extract(spec, &request.drawing, ImageRole::Drawing)?;

        progress(ComparisonPhase::Comparing);
        let text = self.generate(&GenerateRequest {
            system_instruction: spec.system_instruction(),
            images: Vec::new(),
            instruction_text: spec.comparison_instructions(&reference_edges, &user_edges),
            response_format: ResponseFormat::Json,
        })?;
        let verdict = parse_verdict(&text)?;

        Ok(ComparisonResult {
            grade: verdict.grade,
            feedback: verdict.feedback,
            reference_edges,
            user_edges,
        })
    }
}

impl<B: GenerationBackend> Comparator for ComparisonClient<B> {
    fn compare(
        &self,
        request: &ComparisonRequest,
        progress: &mut dyn FnMut(ComparisonPhase),
    ) -> Result<ComparisonResult, CritiqueError> {
        let spec = build_instructions(request.difficulty, request.mode);
        tracing::info!(
            "Comparing drawing ({}, {}, {})",
            self.config.strategy.name(),
            request.mode.name(),
            request.difficulty
        );
        let result = match self.config.strategy {
            ComparisonStrategy::SingleShot => self.single_shot(&spec, request, progress),
            ComparisonStrategy::TwoPhase => self.two_phase(&spec, request, progress),
        };
        match &result {
            Ok(r) => tracing::info!("Comparison graded {}", r.grade),
            Err(e) => tracing::warn!("Comparison failed: {}", e),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use pt_core::FailureKind;
    use std::collections::VecDeque;

    /// Returns queued answers in order and records which model was asked
    #[derive(Default)]
    struct ScriptedBackend {
        answers: Mutex<VecDeque<Result<String, CritiqueError>>>,
        calls: Mutex<Vec<(String, GenerateRequest)>>,
    }

    impl ScriptedBackend {
        fn new(answers: Vec<Result<String, CritiqueError>>) -> Self {
            Self {
                answers: Mutex::new(answers.into()),
                calls: Mutex::default(),
            }
        }

        fn models(&self) -> Vec<String> {
            self.calls.lock().iter().map(|(m, _)| m.clone()).collect()
        }
    }

    impl GenerationBackend for ScriptedBackend {
        fn generate(&self, model: &str, request: &GenerateRequest) -> Result<String, CritiqueError> {
            self.calls.lock().push((model.to_string(), request.clone()));
            self.answers
                .lock()
                .pop_front()
                .unwrap_or_else(|| Err(CritiqueError::Network("script exhausted".to_string())))
        }
    }

    fn rate_limited(model: &str) -> Result<String, CritiqueError> {
        Err(CritiqueError::RateLimited { model: model.to_string() })
    }

    fn config(strategy: ComparisonStrategy) -> ClientConfig {
        ClientConfig {
            models: vec!["primary".into(), "fallback-1".into(), "fallback-2".into()],
            strategy,
            ..Default::default()
        }
    }

    fn request() -> ComparisonRequest {
        ComparisonRequest {
            reference: InlineImage::from_png_bytes(b"reference"),
            drawing: InlineImage::from_png_bytes(b"drawing"),
            reference_edges: None,
            difficulty: Difficulty::Beginner,
            mode: PerspectiveMode::TwoPoint,
        }
    }

    const EDGES: &str = r#"{"edges": [{"start": [0, 0], "end": [100, 100], "type": "left"}]}"#;
    const VERDICT: &str = r#"{"grade": "B", "feedback": "Good convergence"}"#;

    #[test]
    fn test_rate_limit_moves_to_next_model() {
        let backend = ScriptedBackend::new(vec![rate_limited("primary"), Ok("ok".to_string())]);
        let client = ComparisonClient::new(backend, config(ComparisonStrategy::SingleShot));
        let request = GenerateRequest {
            system_instruction: String::new(),
            images: Vec::new(),
            instruction_text: String::new(),
            response_format: ResponseFormat::Json,
        };
        assert_eq!(client.generate(&request).unwrap(), "ok");
        assert_eq!(client.backend().models(), vec!["primary", "fallback-1"]);
    }

    #[test]
    fn test_exhausted_only_after_last_model() {
        let backend = ScriptedBackend::new(vec![
            rate_limited("primary"),
            rate_limited("fallback-1"),
            rate_limited("fallback-2"),
        ]);
        let client = ComparisonClient::new(backend, config(ComparisonStrategy::SingleShot));
        let err = client.compare(&request(), &mut |_| {}).unwrap_err();
        assert_eq!(err.kind(), FailureKind::RateLimited);
        assert_eq!(
            client.backend().models(),
            vec!["primary", "fallback-1", "fallback-2"]
        );
        assert!(matches!(err, CritiqueError::RateLimitExhausted { ref attempted } if attempted.len() == 3));
    }

    #[test]
    fn test_non_rate_limit_failure_is_not_retried() {
        let backend = ScriptedBackend::new(vec![Err(CritiqueError::Timeout("slow".to_string()))]);
        let client = ComparisonClient::new(backend, config(ComparisonStrategy::SingleShot));
        let err = client.compare(&request(), &mut |_| {}).unwrap_err();
        assert_eq!(err.kind(), FailureKind::Timeout);
        assert_eq!(client.backend().models(), vec!["primary"]);
    }

    #[test]
    fn test_each_request_restarts_at_primary() {
        let backend = ScriptedBackend::new(vec![
            rate_limited("primary"),
            Ok(EDGES.to_string()),
            Ok(EDGES.to_string()),
            Ok(VERDICT.to_string()),
        ]);
        let client = ComparisonClient::new(backend, config(ComparisonStrategy::TwoPhase));
        let result = client.compare(&request(), &mut |_| {}).unwrap();
        assert_eq!(result.grade, Grade::B);
        assert_eq!(
            client.backend().models(),
            vec!["primary", "fallback-1", "primary", "primary"]
        );
    }

    #[test]
    fn test_single_shot_sends_both_images() {
        let body = r#"{"grade": "A", "feedback": "f", "referenceEdges": [], "userEdges": []}"#;
        let backend = ScriptedBackend::new(vec![Ok(body.to_string())]);
        let client = ComparisonClient::new(backend, config(ComparisonStrategy::SingleShot));
        let mut phases = Vec::new();
        let result = client.compare(&request(), &mut |p| phases.push(p)).unwrap();
        assert_eq!(result.grade, Grade::A);
        assert_eq!(phases, vec![ComparisonPhase::Comparing]);

        let calls = client.backend().calls.lock();
        let sent = &calls[0].1;
        assert_eq!(sent.images, vec![request().reference, request().drawing]);
        assert_eq!(sent.response_format, ResponseFormat::Json);
    }

    #[test]
    fn test_two_phase_reports_progress_in_order() {
        let backend = ScriptedBackend::new(vec![
            Ok(EDGES.to_string()),
            Ok(EDGES.to_string()),
            Ok(VERDICT.to_string()),
        ]);
        let client = ComparisonClient::new(backend, config(ComparisonStrategy::TwoPhase));
        let mut phases = Vec::new();
        let result = client.compare(&request(), &mut |p| phases.push(p)).unwrap();
        assert_eq!(
            phases,
            vec![
                ComparisonPhase::ScanningReference,
                ComparisonPhase::ScanningDrawing,
                ComparisonPhase::Comparing
            ]
        );
        assert_eq!(result.reference_edges.len(), 1);
        assert_eq!(result.user_edges.len(), 1);

        let calls = client.backend().calls.lock();
        assert_eq!(calls[0].1.images, vec![request().reference]);
        assert_eq!(calls[1].1.images, vec![request().drawing]);
        assert!(calls[2].1.images.is_empty());
        assert!(calls[2].1.instruction_text.contains("\"left\""));
    }

    #[test]
    fn test_exact_reference_edges_skip_scan() {
        let backend = ScriptedBackend::new(vec![Ok(EDGES.to_string()), Ok(VERDICT.to_string())]);
        let client = ComparisonClient::new(backend, config(ComparisonStrategy::TwoPhase));
        let exact = vec![EdgeSegment::new(
            glam::Vec2::new(1.0, 1.0),
            glam::Vec2::new(2.0, 900.0),
            AxisClass::Vertical,
        )];
        let mut req = request();
        req.reference_edges = Some(exact.clone());

        let mut phases = Vec::new();
        let result = client.compare(&req, &mut |p| phases.push(p)).unwrap();
        assert_eq!(result.reference_edges, exact);
        assert_eq!(phases.len(), 3);
        assert_eq!(client.backend().models().len(), 2);
    }

    #[test]
    fn test_parse_failure_surfaces() {
        let backend = ScriptedBackend::new(vec![Ok("I cannot help with that".to_string())]);
        let client = ComparisonClient::new(backend, config(ComparisonStrategy::SingleShot));
        let err = client.compare(&request(), &mut |_| {}).unwrap_err();
        assert_eq!(err.kind(), FailureKind::ParseFailure);
    }

    #[test]
    fn test_empty_model_list() {
        let client = ComparisonClient::new(
            ScriptedBackend::default(),
            ClientConfig {
                models: Vec::new(),
                ..Default::default()
            },
        );
        assert_eq!(client.compare(&request(), &mut |_| {}).unwrap_err(), CritiqueError::NoModels);
    }

    #[test]
    fn test_user_edge_counts() {
        let backend = ScriptedBackend::new(vec![Ok(format!(
            r#"{{"grade": "B", "userEdges": {{"left": [{e}, {e}, {e}, {e}], "right": [{e}, {e}, {e}], "vertical": [{e}, {e}]}}}}"#,
            e = r#"{"start": [1, 2], "end": [3, 4]}"#
        ))]);
        let client = ComparisonClient::new(backend, config(ComparisonStrategy::SingleShot));
        let result = client.compare(&request(), &mut |_| {}).unwrap();
        assert_eq!(result.grade, Grade::B);
        assert_eq!(result.user_edge_counts(), (4, 3, 2));
    }
}
