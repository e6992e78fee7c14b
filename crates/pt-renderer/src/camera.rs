//! Camera uniform buffer data.

use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use pt_core::Projector;

/// Camera uniform uploaded once per frame
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self {
            view_proj: Mat4::IDENTITY.to_cols_array_2d(),
        }
    }
}

impl CameraUniform {
    /// Uses the same matrix as the overlay projection so edges line up.
    pub fn from_projector(projector: &Projector) -> Self {
        Self {
            view_proj: projector.view_projection().to_cols_array_2d(),
        }
    }
}
