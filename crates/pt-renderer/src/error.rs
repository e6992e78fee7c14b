//! Capture errors.

use pt_core::{FailureKind, GeometryError};
use thiserror::Error;

/// Errors raised while rendering or reading back a capture pass
#[derive(Debug, Error)]
pub enum CaptureError {
    /// No compatible GPU adapter found.
    #[error("No compatible GPU adapter found")]
    NoAdapter,

    /// Failed to request GPU device.
    #[error("Failed to request GPU device: {0}")]
    DeviceRequest(#[from] wgpu::RequestDeviceError),

    /// Mapping the staging buffer failed.
    #[error("Pixel readback failed: {0}")]
    Readback(String),

    /// The crop rectangle does not fit the frame that was read back.
    #[error("Crop {x},{y} {width}x{height} does not fit a {frame_width}x{frame_height} frame")]
    Crop {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        frame_width: u32,
        frame_height: u32,
    },

    #[error(transparent)]
    Geometry(#[from] GeometryError),
}

impl CaptureError {
    /// Every capture failure surfaces to the user the same way.
    pub fn kind(&self) -> FailureKind {
        FailureKind::RenderCaptureFailure
    }
}
