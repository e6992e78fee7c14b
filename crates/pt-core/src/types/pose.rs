//! Cube pose type definition

use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

use super::PerspectiveMode;

/// Default cube edge length in world units
pub const DEFAULT_CUBE_SIZE: f32 = 4.0;

/// Default cube centre, below eye level so the top face is visible
pub const DEFAULT_CUBE_POSITION: Vec3 = Vec3::new(0.0, -2.5, 0.0);

/// Pose of the reference cube (position and rotation about the world Y axis)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CubePose {
    /// Cube centre in world space
    pub position: Vec3,
    /// Rotation about the world Y axis in radians
    pub y_rotation: f32,
    /// Edge length in world units
    pub size: f32,
}

impl Default for CubePose {
    fn default() -> Self {
        Self::preset(PerspectiveMode::TwoPoint)
    }
}

impl CubePose {
    pub fn new(position: Vec3, y_rotation: f32) -> Self {
        Self {
            position,
            y_rotation,
            size: DEFAULT_CUBE_SIZE,
        }
    }

    /// Starting pose for a perspective preset
    pub fn preset(mode: PerspectiveMode) -> Self {
        Self::new(DEFAULT_CUBE_POSITION, mode.preset_rotation())
    }

    /// Half of the edge length
    pub fn half_size(&self) -> f32 {
        self.size * 0.5
    }

    /// Rotation as a quaternion
    pub fn rotation(&self) -> Quat {
        Quat::from_rotation_y(self.y_rotation)
    }

    /// Local-to-world transform (unit cube scaled by `size`)
    pub fn to_mat4(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(Vec3::splat(self.size), self.rotation(), self.position)
    }

    /// Rotate by `delta` radians, unless the mode locks rotation.
    pub fn rotate(&mut self, delta: f32, mode: PerspectiveMode) {
        if mode.locks_rotation() {
            return;
        }
        self.y_rotation = wrap_angle(self.y_rotation + delta);
    }

    /// Drag the cube within the ground plane (Y is kept).
    pub fn translate(&mut self, dx: f32, dz: f32) {
        self.position.x += dx;
        self.position.z += dz;
    }
}

/// Wrap an angle into `(-PI, PI]`.
fn wrap_angle(angle: f32) -> f32 {
    use std::f32::consts::{PI, TAU};
    let wrapped = (angle + PI).rem_euclid(TAU) - PI;
    if wrapped <= -PI { wrapped + TAU } else { wrapped }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f32::consts::FRAC_PI_4;

    #[test]
    fn test_one_point_locks_rotation() {
        let mut pose = CubePose::preset(PerspectiveMode::OnePoint);
        pose.rotate(0.5, PerspectiveMode::OnePoint);
        assert_eq!(pose.y_rotation, 0.0);
    }

    #[test]
    fn test_rotate_wraps() {
        let mut pose = CubePose::preset(PerspectiveMode::TwoPoint);
        assert_relative_eq!(pose.y_rotation, FRAC_PI_4);
        pose.rotate(std::f32::consts::TAU, PerspectiveMode::TwoPoint);
        assert_relative_eq!(pose.y_rotation, FRAC_PI_4, epsilon = 1e-5);
    }

    #[test]
    fn test_translate_keeps_height() {
        let mut pose = CubePose::default();
        pose.translate(1.0, -2.0);
        assert_eq!(pose.position, Vec3::new(1.0, DEFAULT_CUBE_POSITION.y, -2.0));
    }
}
