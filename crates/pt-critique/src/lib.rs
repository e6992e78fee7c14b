//! Perspective Tutor Critique
//!
//! Sends the captured reference and the user's drawing to a multimodal
//! generation service and turns its answer into a [`ComparisonResult`].
//!
//! - [`prompt`] - difficulty- and mode-dependent instructions
//! - [`payload`] - inline image payloads
//! - [`backend`] - the transport seam ([`GenerationBackend`])
//! - [`gemini`] - HTTP backend for the Gemini `generateContent` API
//! - [`response`] - lenient parsing of the service's JSON
//! - [`client`] - model fallback and the comparison strategies
//!
//! All coordinates crossing this crate's boundary are on the 0..1000
//! normalized grid ([`pt_core::Normalized`]).

pub mod backend;
pub mod client;
pub mod config;
pub mod error;
pub mod gemini;
pub mod payload;
pub mod prompt;
pub mod response;

pub use backend::{GenerateRequest, GenerationBackend, ResponseFormat};
pub use client::{
    Comparator, ComparisonClient, ComparisonPhase, ComparisonRequest, ComparisonResult,
};
pub use config::{ClientConfig, ComparisonStrategy};
pub use error::CritiqueError;
pub use gemini::GeminiBackend;
pub use payload::InlineImage;
pub use prompt::{PromptSpec, Tone, build_instructions};
