//! Cube corners and edge families.
//!
//! Corner `i` sits at local `(±h, ±h, ±h)` with bit 0 selecting X, bit 1 Y
//! and bit 2 Z (set bit = positive side). An edge joins two corners that
//! differ in exactly one bit, which gives three families of four.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::types::CubePose;

/// Local cube axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CubeAxis {
    /// Width
    X,
    /// Height
    Y,
    /// Depth
    Z,
}

impl CubeAxis {
    pub const ALL: [CubeAxis; 3] = [CubeAxis::X, CubeAxis::Y, CubeAxis::Z];

    fn bit(&self) -> usize {
        match self {
            CubeAxis::X => 1,
            CubeAxis::Y => 2,
            CubeAxis::Z => 4,
        }
    }

    fn unit(&self) -> Vec3 {
        match self {
            CubeAxis::X => Vec3::X,
            CubeAxis::Y => Vec3::Y,
            CubeAxis::Z => Vec3::Z,
        }
    }

    /// World direction of this axis once the cube is rotated about Y
    pub fn direction(&self, y_rotation: f32) -> Vec3 {
        glam::Quat::from_rotation_y(y_rotation) * self.unit()
    }
}

/// One cube edge in world space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CubeEdge {
    pub axis: CubeAxis,
    /// Corner indices, lower index first
    pub corners: [usize; 2],
    pub start: Vec3,
    pub end: Vec3,
}

/// The 8 corners in world space.
pub fn cube_corners(pose: &CubePose) -> [Vec3; 8] {
    let h = pose.half_size();
    let rotation = pose.rotation();
    std::array::from_fn(|i| {
        let local = Vec3::new(
            if i & 1 != 0 { h } else { -h },
            if i & 2 != 0 { h } else { -h },
            if i & 4 != 0 { h } else { -h },
        );
        rotation * local + pose.position
    })
}

/// The 12 edges, grouped X family first, then Y, then Z.
pub fn cube_edges(pose: &CubePose) -> Vec<CubeEdge> {
    let corners = cube_corners(pose);
    let mut edges = Vec::with_capacity(12);
    for axis in [CubeAxis::X, CubeAxis::Y, CubeAxis::Z] {
        let bit = axis.bit();
        for i in (0..8).filter(|i| i & bit == 0) {
            let j = i | bit;
            edges.push(CubeEdge {
                axis,
                corners: [i, j],
                start: corners[i],
                end: corners[j],
            });
        }
    }
    edges
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn test_twelve_edges_in_three_families() {
        let edges = cube_edges(&CubePose::default());
        assert_eq!(edges.len(), 12);
        for axis in CubeAxis::ALL {
            assert_eq!(edges.iter().filter(|e| e.axis == axis).count(), 4);
        }
    }

    #[test]
    fn test_edges_have_cube_length_and_axis_direction() {
        let pose = CubePose::new(Vec3::new(1.0, 2.0, 3.0), 0.3);
        for edge in cube_edges(&pose) {
            let d = edge.end - edge.start;
            assert_relative_eq!(d.length(), pose.size, epsilon = 1e-4);
            let dir = edge.axis.direction(pose.y_rotation);
            assert_relative_eq!(d.normalize().dot(dir), 1.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_axis_direction_rotation() {
        let z = CubeAxis::Z.direction(FRAC_PI_2);
        assert_relative_eq!(z.x, 1.0, epsilon = 1e-6);
        assert_relative_eq!(z.z, 0.0, epsilon = 1e-6);
        let x = CubeAxis::X.direction(FRAC_PI_2);
        assert_relative_eq!(x.z, -1.0, epsilon = 1e-6);
        assert_eq!(CubeAxis::Y.direction(1.234), Vec3::Y);
    }

    #[test]
    fn test_corners_centered_on_position() {
        let pose = CubePose::default();
        let centroid = cube_corners(&pose).iter().sum::<Vec3>() / 8.0;
        assert_relative_eq!(centroid.x, pose.position.x, epsilon = 1e-5);
        assert_relative_eq!(centroid.y, pose.position.y, epsilon = 1e-5);
        assert_relative_eq!(centroid.z, pose.position.z, epsilon = 1e-5);
    }
}
