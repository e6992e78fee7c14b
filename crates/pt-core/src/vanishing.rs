//! Vanishing points and the horizon line.
//!
//! Horizontal vanishing points are found by casting a ray from the eye along
//! the rotated cube axis, oriented away from the camera (negative Z), and
//! intersecting it with the plane `z = HORIZON_DEPTH`. Because that ray
//! passes through the eye, every point on it projects to the same pixel, so
//! the screen position is exact even though the plane depth is arbitrary.
//!
//! The vertical vanishing point of three-point mode is an approximation: the
//! cube's vertical axis is extended a fixed [`VERTICAL_EXTENSION`] towards
//! the side the camera is looking, instead of solving against a second
//! reference plane. Grading was tuned against this construction.

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::cube::CubeAxis;
use crate::projection::Projector;
use crate::types::{AxisClass, CubePose};

/// World Z of the horizon plane
pub const HORIZON_DEPTH: f32 = -1000.0;

/// Depth components smaller than this count as parallel to the horizon plane
pub const PARALLEL_EPSILON: f32 = 1e-5;

/// Distance the vertical axis is extended in three-point mode
pub const VERTICAL_EXTENSION: f32 = 1000.0;

/// Vanishing points farther than this from the screen origin (in pixels)
/// are treated as absent for overlay purposes.
pub const MAX_VP_SCREEN_DISTANCE: f32 = 50_000.0;

/// A finite vanishing point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VanishingPoint {
    pub axis: CubeAxis,
    pub class: AxisClass,
    /// Point on the horizon plane (or the extended vertical axis)
    pub world: Vec3,
    /// Pixel position; `None` when the point is behind the camera
    pub screen: Option<Vec2>,
}

impl VanishingPoint {
    /// Whether the point is close enough to draw guide lines to it.
    pub fn is_drawable(&self) -> bool {
        self.screen
            .is_some_and(|s| s.is_finite() && s.length() <= MAX_VP_SCREEN_DISTANCE)
    }

    /// Screen position if drawable
    pub fn drawable_screen(&self) -> Option<Vec2> {
        if self.is_drawable() { self.screen } else { None }
    }

    /// Shift the screen position by `-offset`.
    pub fn shifted(&self, offset: Vec2) -> Self {
        Self {
            screen: self.screen.map(|s| s - offset),
            ..*self
        }
    }
}

/// World-space vanishing point for a horizontal cube axis.
///
/// Returns `None` when the rotated axis is parallel to the horizon plane
/// (the axis renders as parallel lines, e.g. the width axis in one-point).
pub fn horizontal_vanishing_point(eye: Vec3, axis: CubeAxis, y_rotation: f32) -> Option<Vec3> {
    debug_assert!(axis != CubeAxis::Y, "vertical axis has no horizon intersection");

    let mut direction = axis.direction(y_rotation);
    if direction.z.abs() < PARALLEL_EPSILON {
        return None;
    }
    if direction.z > 0.0 {
        direction = -direction;
    }

    let t = (HORIZON_DEPTH - eye.z) / direction.z;
    if !t.is_finite() || t <= 0.0 {
        return None;
    }
    let mut point = eye + direction * t;
    point.z = HORIZON_DEPTH;
    Some(point)
}

/// World-space vertical vanishing point for three-point mode.
///
/// Verticals converge downward when the eye is above the cube centre and
/// upward when it is below; at eye level they are parallel.
pub fn vertical_vanishing_point(eye: Vec3, pose: &CubePose) -> Option<Vec3> {
    let dy = eye.y - pose.position.y;
    if dy.abs() < PARALLEL_EPSILON {
        return None;
    }
    let sign = if dy > 0.0 { -1.0 } else { 1.0 };
    Some(pose.position + Vec3::Y * sign * VERTICAL_EXTENSION)
}

/// Screen Y of the horizon line: the projection of an eye-level point on the
/// horizon plane.
pub fn horizon_screen_y(projector: &Projector) -> Option<f32> {
    let eye = projector.eye();
    projector
        .project(Vec3::new(eye.x, eye.y, HORIZON_DEPTH))
        .map(|p| p.y)
}
