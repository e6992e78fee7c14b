//! World to render-target projection.
//!
//! [`Projector::project`] is the single mapping used for cube corners,
//! vanishing points and the horizon sample, so overlay geometry stays
//! self-consistent with the rendered image.

use glam::{Mat4, Vec2, Vec3, Vec4};
use serde::{Deserialize, Serialize};

use crate::error::GeometryError;
use crate::types::{CameraConfig, CameraRig};

/// Pixel dimensions of a render target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn aspect(&self) -> f32 {
        self.width.max(1) as f32 / self.height.max(1) as f32
    }

    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width as f32, self.height as f32)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Scale by a device pixel ratio, rounding to whole pixels.
    pub fn scaled(&self, pixel_ratio: f32) -> Self {
        let ratio = if pixel_ratio.is_finite() && pixel_ratio > 0.0 { pixel_ratio } else { 1.0 };
        Self {
            width: ((self.width as f32 * ratio).round() as u32).max(1),
            height: ((self.height as f32 * ratio).round() as u32).max(1),
        }
    }
}

/// Camera view-projection bound to a viewport
#[derive(Debug, Clone, Copy)]
pub struct Projector {
    rig: CameraRig,
    view: Mat4,
    projection: Mat4,
    view_proj: Mat4,
    viewport: Viewport,
}

impl Projector {
    pub fn new(camera: &CameraConfig, viewport: Viewport) -> Result<Self, GeometryError> {
        if viewport.is_empty() {
            return Err(GeometryError::EmptyViewport {
                width: viewport.width,
                height: viewport.height,
            });
        }

        let rig = camera.rig();
        let view = Mat4::look_at_rh(rig.eye, rig.target, rig.up);
        let projection = Mat4::perspective_rh(
            camera.fov_radians(),
            viewport.aspect(),
            camera.near_plane.max(1e-3),
            camera.far_plane.max(camera.near_plane + 1.0),
        );

        Ok(Self {
            rig,
            view,
            projection,
            view_proj: projection * view,
            viewport,
        })
    }

    pub fn rig(&self) -> &CameraRig {
        &self.rig
    }

    pub fn eye(&self) -> Vec3 {
        self.rig.eye
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn view_matrix(&self) -> Mat4 {
        self.view
    }

    pub fn projection_matrix(&self) -> Mat4 {
        self.projection
    }

    pub fn view_projection(&self) -> Mat4 {
        self.view_proj
    }

    /// Project a world point to pixel coordinates (top-left origin).
    ///
    /// Returns `None` for points at or behind the camera plane. Points
    /// outside the frustum still project; callers decide what is on screen.
    pub fn project(&self, world: Vec3) -> Option<Vec2> {
        let clip = self.view_proj * Vec4::new(world.x, world.y, world.z, 1.0);

        if clip.w <= f32::EPSILON {
            return None;
        }

        let ndc_x = clip.x / clip.w;
        let ndc_y = clip.y / clip.w;

        let screen_x = (ndc_x + 1.0) * 0.5 * self.viewport.width as f32;
        let screen_y = (1.0 - ndc_y) * 0.5 * self.viewport.height as f32;

        let screen = Vec2::new(screen_x, screen_y);
        screen.is_finite().then_some(screen)
    }
}
