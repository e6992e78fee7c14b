//! Cube faces, shading and line geometry for both capture surfaces.

use glam::Vec3;
use pt_core::{CubeAxis, CubePose, cube_corners, cube_edges};

use crate::config::CubePalette;
use crate::vertex::CubeVertex;

/// Fixed key light, world space
const LIGHT_DIRECTION: Vec3 = Vec3::new(0.45, 0.8, 0.55);
const AMBIENT: f32 = 0.55;

/// One cube face
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CubeFace {
    /// Corner indices in cyclic order
    pub corners: [usize; 4],
    /// Outward world normal
    pub normal: Vec3,
    pub center: Vec3,
}

impl CubeFace {
    /// Whether the face points towards `eye`
    pub fn faces(&self, eye: Vec3) -> bool {
        self.normal.dot(eye - self.center) > 0.0
    }

    /// Whether the face contains the edge between corners `a` and `b`
    pub fn contains_edge(&self, a: usize, b: usize) -> bool {
        self.corners.contains(&a) && self.corners.contains(&b)
    }
}

/// The six faces of the posed cube.
pub fn cube_faces(pose: &CubePose) -> [CubeFace; 6] {
    let corners = cube_corners(pose);
    let axes = CubeAxis::ALL;
    std::array::from_fn(|i| {
        let axis_index = i / 2;
        let positive = i % 2 == 1;
        let fixed = 1usize << axis_index;
        let p = 1usize << ((axis_index + 1) % 3);
        let q = 1usize << ((axis_index + 2) % 3);
        let base = if positive { fixed } else { 0 };
        let quad = [base, base | p, base | p | q, base | q];
        let center = quad.iter().map(|&c| corners[c]).sum::<Vec3>() / 4.0;
        let sign = if positive { 1.0 } else { -1.0 };
        CubeFace {
            corners: quad,
            normal: axes[axis_index].direction(pose.y_rotation) * sign,
            center,
        }
    })
}

/// Lambert-shaded face colour
pub fn shade(base: [f32; 4], normal: Vec3) -> [f32; 4] {
    let light = LIGHT_DIRECTION.normalize();
    let intensity = AMBIENT + (1.0 - AMBIENT) * normal.dot(light).max(0.0);
    [base[0] * intensity, base[1] * intensity, base[2] * intensity, base[3]]
}

/// Triangle list for the faces
pub fn face_vertices(pose: &CubePose, palette: &CubePalette) -> Vec<CubeVertex> {
    let corners = cube_corners(pose);
    let mut vertices = Vec::with_capacity(36);
    for face in cube_faces(pose) {
        let color = shade(palette.face, face.normal);
        let [a, b, c, d] = face.corners.map(|i| CubeVertex::new(corners[i], color));
        vertices.extend_from_slice(&[a, b, c, a, c, d]);
    }
    vertices
}

/// Line list for the 12 edges
pub fn edge_vertices(pose: &CubePose, palette: &CubePalette) -> Vec<CubeVertex> {
    cube_edges(pose)
        .into_iter()
        .flat_map(|e| [CubeVertex::new(e.start, palette.edge), CubeVertex::new(e.end, palette.edge)])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_faces_cover_every_corner_three_times() {
        let faces = cube_faces(&CubePose::default());
        let mut counts = [0; 8];
        for face in &faces {
            for &c in &face.corners {
                counts[c] += 1;
            }
        }
        assert_eq!(counts, [3; 8]);
    }

    #[test]
    fn test_normals_point_outward() {
        let pose = CubePose::default();
        for face in cube_faces(&pose) {
            let outward = face.center - pose.position;
            assert_relative_eq!(outward.normalize().dot(face.normal), 1.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_three_faces_visible_from_above() {
        let pose = CubePose::default();
        let eye = Vec3::new(3.0, 10.0, 15.0);
        assert_eq!(cube_faces(&pose).iter().filter(|f| f.faces(eye)).count(), 3);
    }

    #[test]
    fn test_vertex_counts() {
        let pose = CubePose::default();
        let palette = CubePalette::default();
        assert_eq!(face_vertices(&pose, &palette).len(), 36);
        assert_eq!(edge_vertices(&pose, &palette).len(), 24);
    }
}
