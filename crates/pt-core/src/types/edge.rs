//! Edge segments and the coordinate spaces they live in

use std::fmt;
use std::marker::PhantomData;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::crop::PixelRect;

/// Extent of the normalized logical square on each axis
pub const NORMALIZED_EXTENT: f32 = 1000.0;

/// Marker trait for a 2D coordinate space.
pub trait CoordSpace: Copy + Default + PartialEq + fmt::Debug + Send + Sync + 'static {
    const NAME: &'static str;
}

/// Pixels of the full render target, top-left origin
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScreenPixels;

/// Pixels relative to a capture crop, top-left origin
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CropPixels;

/// Logical 0..1000 square, independent of the image's pixel size.
/// This is the only space that goes over the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Normalized;

impl CoordSpace for ScreenPixels {
    const NAME: &'static str = "screen";
}

impl CoordSpace for CropPixels {
    const NAME: &'static str = "crop";
}

impl CoordSpace for Normalized {
    const NAME: &'static str = "normalized";
}

/// Which vanishing-point family an edge belongs to.
///
/// The mapping from cube axes is fixed per mode rather than inferred from
/// wire strings:
/// - two- and three-point: the horizontal family whose vanishing point has
///   the smaller screen X is `Left`, the other is `Right`
/// - one-point: the parallel width family is `Left` and the converging depth
///   family is `Right`
/// - free: the cube's local X family is `Left`, local Z is `Right`
///
/// Vertical edges are always `Vertical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AxisClass {
    Left,
    Right,
    Vertical,
}

impl AxisClass {
    pub const ALL: [AxisClass; 3] = [AxisClass::Left, AxisClass::Right, AxisClass::Vertical];

    /// Tag used in the JSON protocol
    pub fn as_wire_str(&self) -> &'static str {
        match self {
            AxisClass::Left => "left",
            AxisClass::Right => "right",
            AxisClass::Vertical => "vertical",
        }
    }

    /// Parse a wire tag, accepting the synonyms the analysis service tends
    /// to produce.
    pub fn from_wire(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "left" | "horizontalleft" | "horizontal_left" | "left-converging" | "x" => {
                Some(AxisClass::Left)
            }
            "right" | "horizontalright" | "horizontal_right" | "right-converging" | "depth"
            | "z" => Some(AxisClass::Right),
            "vertical" | "up" | "y" => Some(AxisClass::Vertical),
            _ => None,
        }
    }
}

impl fmt::Display for AxisClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire_str())
    }
}

/// A 2D line segment tagged with its axis class and coordinate space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct EdgeSegment<S: CoordSpace> {
    pub start: Vec2,
    pub end: Vec2,
    pub axis: AxisClass,
    #[serde(skip)]
    space: PhantomData<S>,
}

impl<S: CoordSpace> EdgeSegment<S> {
    pub fn new(start: Vec2, end: Vec2, axis: AxisClass) -> Self {
        Self {
            start,
            end,
            axis,
            space: PhantomData,
        }
    }

    pub fn length(&self) -> f32 {
        self.start.distance(self.end)
    }

    /// Undirected angle in radians, in `[0, PI)`
    pub fn angle(&self) -> f32 {
        let d = self.end - self.start;
        d.y.atan2(d.x).rem_euclid(std::f32::consts::PI)
    }

    fn map<T: CoordSpace>(&self, f: impl Fn(Vec2) -> Vec2) -> EdgeSegment<T> {
        EdgeSegment::new(f(self.start), f(self.end), self.axis)
    }
}

impl EdgeSegment<ScreenPixels> {
    /// Shift into the crop's frame (`-crop.x, -crop.y`).
    pub fn to_crop(&self, crop: &PixelRect) -> EdgeSegment<CropPixels> {
        self.map(|p| crop.to_local(p))
    }
}

impl EdgeSegment<CropPixels> {
    /// Rescale crop pixels into the 0..1000 logical square.
    pub fn to_normalized(&self, width: u32, height: u32) -> EdgeSegment<Normalized> {
        let scale = Vec2::new(
            NORMALIZED_EXTENT / width.max(1) as f32,
            NORMALIZED_EXTENT / height.max(1) as f32,
        );
        self.map(|p| p * scale)
    }
}

impl EdgeSegment<Normalized> {
    /// Rescale into pixels of an image of the given size.
    pub fn to_pixels(&self, width: f32, height: f32) -> EdgeSegment<CropPixels> {
        let scale = Vec2::new(width / NORMALIZED_EXTENT, height / NORMALIZED_EXTENT);
        self.map(|p| p * scale)
    }

    /// Clamp both endpoints into the logical square.
    pub fn clamped(&self) -> Self {
        let max = Vec2::splat(NORMALIZED_EXTENT);
        self.map(|p| p.clamp(Vec2::ZERO, max))
    }
}

/// Edges grouped by axis class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct EdgeGroups<S: CoordSpace> {
    pub left: Vec<EdgeSegment<S>>,
    pub right: Vec<EdgeSegment<S>>,
    pub vertical: Vec<EdgeSegment<S>>,
}

impl<S: CoordSpace> Default for EdgeGroups<S> {
    fn default() -> Self {
        Self {
            left: Vec::new(),
            right: Vec::new(),
            vertical: Vec::new(),
        }
    }
}

impl<S: CoordSpace> EdgeGroups<S> {
    pub fn push(&mut self, edge: EdgeSegment<S>) {
        match edge.axis {
            AxisClass::Left => self.left.push(edge),
            AxisClass::Right => self.right.push(edge),
            AxisClass::Vertical => self.vertical.push(edge),
        }
    }

    pub fn get(&self, axis: AxisClass) -> &[EdgeSegment<S>] {
        match axis {
            AxisClass::Left => &self.left,
            AxisClass::Right => &self.right,
            AxisClass::Vertical => &self.vertical,
        }
    }

    pub fn len(&self) -> usize {
        self.left.len() + self.right.len() + self.vertical.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All edges, left family first
    pub fn iter(&self) -> impl Iterator<Item = &EdgeSegment<S>> {
        self.left.iter().chain(&self.right).chain(&self.vertical)
    }

    pub fn to_vec(&self) -> Vec<EdgeSegment<S>> {
        self.iter().copied().collect()
    }
}

impl<S: CoordSpace> FromIterator<EdgeSegment<S>> for EdgeGroups<S> {
    fn from_iter<I: IntoIterator<Item = EdgeSegment<S>>>(iter: I) -> Self {
        let mut groups = Self::default();
        for edge in iter {
            groups.push(edge);
        }
        groups
    }
}

/// Number of edges of one class in a flat list
pub fn count_axis<S: CoordSpace>(edges: &[EdgeSegment<S>], axis: AxisClass) -> usize {
    edges.iter().filter(|e| e.axis == axis).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_wire_synonyms() {
        assert_eq!(AxisClass::from_wire("LEFT"), Some(AxisClass::Left));
        assert_eq!(AxisClass::from_wire(" depth "), Some(AxisClass::Right));
        assert_eq!(AxisClass::from_wire("vertical"), Some(AxisClass::Vertical));
        assert_eq!(AxisClass::from_wire("diagonal"), None);
    }

    #[test]
    fn test_normalized_conversion_uses_both_dimensions() {
        let edge = EdgeSegment::<CropPixels>::new(
            Vec2::new(200.0, 50.0),
            Vec2::new(400.0, 100.0),
            AxisClass::Left,
        );
        let norm = edge.to_normalized(400, 100);
        assert_relative_eq!(norm.start.x, 500.0);
        assert_relative_eq!(norm.start.y, 500.0);
        assert_relative_eq!(norm.end.x, 1000.0);
        assert_relative_eq!(norm.end.y, 1000.0);

        let back = norm.to_pixels(400.0, 100.0);
        assert_relative_eq!(back.start.x, edge.start.x, epsilon = 1e-3);
        assert_relative_eq!(back.end.y, edge.end.y, epsilon = 1e-3);
    }

    #[test]
    fn test_clamped_keeps_axis() {
        let edge = EdgeSegment::<Normalized>::new(
            Vec2::new(-10.0, 500.0),
            Vec2::new(1200.0, 1001.0),
            AxisClass::Vertical,
        );
        let c = edge.clamped();
        assert_eq!(c.start, Vec2::new(0.0, 500.0));
        assert_eq!(c.end, Vec2::new(1000.0, 1000.0));
        assert_eq!(c.axis, AxisClass::Vertical);
    }

    #[test]
    fn test_groups_partition() {
        let e = |axis| EdgeSegment::<Normalized>::new(Vec2::ZERO, Vec2::ONE, axis);
        let groups: EdgeGroups<Normalized> = [
            e(AxisClass::Left),
            e(AxisClass::Vertical),
            e(AxisClass::Left),
            e(AxisClass::Right),
        ]
        .into_iter()
        .collect();
        assert_eq!(groups.left.len(), 2);
        assert_eq!(groups.right.len(), 1);
        assert_eq!(groups.vertical.len(), 1);
        assert_eq!(count_axis(&groups.to_vec(), AxisClass::Left), 2);
    }

    #[test]
    fn test_angle_is_undirected() {
        let a = EdgeSegment::<Normalized>::new(Vec2::ZERO, Vec2::new(1.0, 1.0), AxisClass::Left);
        let b = EdgeSegment::<Normalized>::new(Vec2::new(1.0, 1.0), Vec2::ZERO, AxisClass::Left);
        assert_relative_eq!(a.angle(), b.angle(), epsilon = 1e-6);
    }
}
