//! Perspective Tutor Renderer
//!
//! Renders the reference cube off-screen and captures the images the
//! critique pipeline needs.
//!
//! # Architecture
//!
//! - [`surface::CaptureSurface`] - anything that can render the cube and read
//!   pixels back under a given [`surface::RenderState`]
//! - [`offscreen::OffscreenRenderer`] - wgpu implementation
//! - [`software::SoftwareSurface`] - CPU implementation for machines without
//!   a GPU adapter
//! - [`capture::CaptureController`] - the three-pass capture with crop and
//!   render-state restoration
//!
//! # Example
//!
//! ```ignore
//! use pt_renderer::{CaptureConfig, CaptureController, OffscreenRenderer};
//!
//! let config = CaptureConfig::default();
//! let mut surface = OffscreenRenderer::new_blocking(&config)?;
//! let capture = CaptureController::new(config).capture(&mut surface, &pose, &camera)?;
//! ```

pub mod camera;
pub mod capture;
pub mod config;
pub mod context;
pub mod cube_mesh;
pub mod error;
pub mod offscreen;
pub mod software;
pub mod surface;
pub mod vertex;

pub use capture::{CaptureController, CaptureHandoff, CaptureResult};
pub use config::{CaptureConfig, CubePalette};
pub use context::GpuContext;
pub use error::CaptureError;
pub use offscreen::OffscreenRenderer;
pub use software::{SoftwareSurface, draw_line};
pub use surface::{Background, CaptureSurface, RenderState, RenderStateGuard};
