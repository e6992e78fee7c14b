//! Capture configuration.

use pt_core::{DEFAULT_PADDING_RATIO, Viewport};
use serde::{Deserialize, Serialize};

/// Colours used when drawing the cube
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CubePalette {
    /// Opaque background of the solid and wireframe passes
    pub background: [f32; 4],
    /// Base face colour before shading
    pub face: [f32; 4],
    /// Edge line colour
    pub edge: [f32; 4],
}

impl Default for CubePalette {
    fn default() -> Self {
        Self {
            background: [1.0, 1.0, 1.0, 1.0],
            face: [0.78, 0.80, 0.84, 1.0],
            edge: [0.08, 0.08, 0.10, 1.0],
        }
    }
}

/// Settings for [`crate::CaptureController`] and the capture surfaces
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Logical viewport width in points
    pub viewport_width: u32,
    /// Logical viewport height in points
    pub viewport_height: u32,
    /// Device pixel ratio of the live view
    pub pixel_ratio: f32,
    /// Multiplier applied to the pixel ratio during capture
    pub pixel_ratio_boost: f32,
    /// Crop padding as a fraction of the larger bounding-box side
    pub padding_ratio: f32,
    /// Edge stroke width in target pixels (software surface)
    pub edge_width: f32,
    pub palette: CubePalette,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            viewport_width: 800,
            viewport_height: 600,
            pixel_ratio: 1.0,
            pixel_ratio_boost: 2.0,
            padding_ratio: DEFAULT_PADDING_RATIO,
            edge_width: 3.0,
            palette: CubePalette::default(),
        }
    }
}

impl CaptureConfig {
    pub fn viewport(&self) -> Viewport {
        Viewport::new(self.viewport_width, self.viewport_height)
    }

    /// Pixel ratio in effect while capturing
    pub fn capture_pixel_ratio(&self, base: f32) -> f32 {
        let boost = if self.pixel_ratio_boost.is_finite() && self.pixel_ratio_boost > 0.0 {
            self.pixel_ratio_boost
        } else {
            1.0
        };
        base * boost
    }
}
