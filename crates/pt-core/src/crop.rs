//! Bounding boxes and crop rectangles in render-target pixels.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::projection::Viewport;

/// Default crop padding as a fraction of the larger bounding-box side
pub const DEFAULT_PADDING_RATIO: f32 = 0.1;

/// Integer pixel rectangle (`x`, `y` is the top-left corner)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// The whole render target
    pub fn full(viewport: Viewport) -> Self {
        Self::new(0, 0, viewport.width, viewport.height)
    }

    pub fn origin(&self) -> Vec2 {
        Vec2::new(self.x as f32, self.y as f32)
    }

    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    pub fn aspect(&self) -> f32 {
        self.width.max(1) as f32 / self.height.max(1) as f32
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Whether the rectangle lies within an image of the given size
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        !self.is_empty() && self.right() <= width && self.bottom() <= height
    }

    /// Convert a render-target point into this rectangle's frame.
    pub fn to_local(&self, point: Vec2) -> Vec2 {
        point - self.origin()
    }
}

/// Floating-point bounding box of projected geometry
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScreenBounds {
    pub min: Vec2,
    pub max: Vec2,
}

impl ScreenBounds {
    /// An empty accumulator; `include` grows it.
    pub fn empty() -> Self {
        Self {
            min: Vec2::splat(f32::INFINITY),
            max: Vec2::splat(f32::NEG_INFINITY),
        }
    }

    pub fn include(&mut self, point: Vec2) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y
    }

    pub fn width(&self) -> f32 {
        (self.max.x - self.min.x).max(0.0)
    }

    pub fn height(&self) -> f32 {
        (self.max.y - self.min.y).max(0.0)
    }

    /// Expand by `ratio` of the larger side and clamp into the viewport.
    ///
    /// Returns `None` when nothing of the box remains inside the viewport.
    pub fn pad_and_clamp(&self, ratio: f32, viewport: Viewport) -> Option<PixelRect> {
        if self.is_empty() || viewport.is_empty() {
            return None;
        }

        let pad = self.width().max(self.height()) * ratio.max(0.0);
        let limit = viewport.size();
        let min = (self.min - Vec2::splat(pad)).floor().clamp(Vec2::ZERO, limit);
        let max = (self.max + Vec2::splat(pad)).ceil().clamp(Vec2::ZERO, limit);

        let width = (max.x - min.x) as u32;
        let height = (max.y - min.y) as u32;
        if width == 0 || height == 0 {
            return None;
        }
        Some(PixelRect::new(min.x as u32, min.y as u32, width, height))
    }
}

impl Default for ScreenBounds {
    fn default() -> Self {
        Self::empty()
    }
}

/// Largest centred rectangle of `source` with the aspect ratio of `target`.
///
/// Used to force an uploaded drawing into the capture crop's aspect.
pub fn fit_aspect(source_width: u32, source_height: u32, target_width: u32, target_height: u32) -> PixelRect {
    if source_width == 0 || source_height == 0 || target_width == 0 || target_height == 0 {
        return PixelRect::new(0, 0, source_width, source_height);
    }

    let target_aspect = target_width as f64 / target_height as f64;
    let source_aspect = source_width as f64 / source_height as f64;

    if source_aspect > target_aspect {
        let width = ((source_height as f64 * target_aspect).round() as u32).clamp(1, source_width);
        PixelRect::new((source_width - width) / 2, 0, width, source_height)
    } else {
        let height = ((source_width as f64 / target_aspect).round() as u32).clamp(1, source_height);
        PixelRect::new(0, (source_height - height) / 2, source_width, height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pad_and_clamp_inside() {
        let mut b = ScreenBounds::empty();
        b.include(Vec2::new(100.0, 100.0));
        b.include(Vec2::new(300.0, 200.0));
        let rect = b.pad_and_clamp(0.1, Viewport::new(800, 600)).unwrap();
        // pad = 0.1 * 200
        assert_eq!(rect, PixelRect::new(80, 80, 240, 140));
    }

    #[test]
    fn test_pad_and_clamp_at_edges() {
        let mut b = ScreenBounds::empty();
        b.include(Vec2::new(-50.0, 10.0));
        b.include(Vec2::new(790.0, 590.0));
        let rect = b.pad_and_clamp(0.1, Viewport::new(800, 600)).unwrap();
        assert_eq!(rect.x, 0);
        assert_eq!(rect.y, 0);
        assert!(rect.fits_within(800, 600));
    }

    #[test]
    fn test_pad_and_clamp_offscreen() {
        let mut b = ScreenBounds::empty();
        b.include(Vec2::new(2000.0, 2000.0));
        b.include(Vec2::new(2100.0, 2100.0));
        assert!(b.pad_and_clamp(0.1, Viewport::new(800, 600)).is_none());
        assert!(ScreenBounds::empty().pad_and_clamp(0.1, Viewport::new(800, 600)).is_none());
    }

    #[test]
    fn test_fit_aspect_wide_source() {
        let rect = fit_aspect(1600, 900, 400, 400);
        assert_eq!(rect, PixelRect::new(350, 0, 900, 900));
    }

    #[test]
    fn test_fit_aspect_tall_source() {
        let rect = fit_aspect(1000, 2000, 200, 100);
        assert_eq!(rect, PixelRect::new(0, 750, 1000, 500));
    }

    #[test]
    fn test_fit_aspect_same_aspect_is_identity() {
        assert_eq!(fit_aspect(640, 480, 320, 240), PixelRect::new(0, 0, 640, 480));
    }
}
