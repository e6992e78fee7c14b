//! Perspective Tutor Core
//!
//! Pure geometry and data types shared by the renderer, the critique client
//! and the frontend:
//!
//! - [`types`] - cube pose, camera presets, edge segments and grades
//! - [`projection`] - world to render-target pixel projection
//! - [`cube`] - cube corners and the three edge families
//! - [`vanishing`] - vanishing points and the horizon line
//! - [`crop`] - bounding boxes, crop rectangles and aspect fitting
//! - [`geometry`] - the complete ground-truth geometry of one frame
//!
//! Nothing in this crate performs I/O.

pub mod crop;
pub mod cube;
pub mod error;
pub mod geometry;
pub mod projection;
pub mod types;
pub mod vanishing;

pub use crop::{DEFAULT_PADDING_RATIO, PixelRect, ScreenBounds, fit_aspect};
pub use cube::{CubeAxis, CubeEdge, cube_corners, cube_edges};
pub use error::{FailureKind, GeometryError};
pub use geometry::{GuideRay, SceneGeometry};
pub use projection::{Projector, Viewport};
pub use types::*;
pub use vanishing::{HORIZON_DEPTH, MAX_VP_SCREEN_DISTANCE, VanishingPoint};
