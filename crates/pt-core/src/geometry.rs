//! Ground-truth geometry of one rendered frame.
//!
//! [`SceneGeometry::compute`] projects the 12 cube edges, derives the
//! vanishing points and horizon for the perspective mode, classifies the
//! edge families and tracks the bounding box used for cropping.
//! [`SceneGeometry::crop_relative`] re-expresses everything in a crop's frame.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::crop::{PixelRect, ScreenBounds};
use crate::cube::{CubeAxis, cube_corners, cube_edges};
use crate::error::GeometryError;
use crate::projection::{Projector, Viewport};
use crate::types::{
    AxisClass, CameraConfig, CoordSpace, CropPixels, CubePose, EdgeGroups, EdgeSegment,
    PerspectiveMode, ScreenPixels,
};
use crate::vanishing::{
    VanishingPoint, horizon_screen_y, horizontal_vanishing_point, vertical_vanishing_point,
};

/// A perspective guide from a cube corner to a vanishing point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GuideRay {
    pub from: Vec2,
    pub to: Vec2,
    pub class: AxisClass,
}

/// Projected cube geometry in some 2D frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct SceneGeometry<S: CoordSpace = ScreenPixels> {
    /// Size of the frame the coordinates live in
    pub frame: Viewport,
    pub mode: PerspectiveMode,
    /// Projected cube corners, indexed as in [`crate::cube`]
    pub corners: [Vec2; 8],
    pub edges: EdgeGroups<S>,
    pub vanishing_points: Vec<VanishingPoint>,
    pub horizon_y: Option<f32>,
    /// Tight box around all projected edges (before padding)
    pub bounds: ScreenBounds,
}

impl SceneGeometry<ScreenPixels> {
    /// Project the cube for the given camera and render-target size.
    pub fn compute(
        pose: &CubePose,
        camera: &CameraConfig,
        viewport: Viewport,
    ) -> Result<Self, GeometryError> {
        let projector = Projector::new(camera, viewport)?;
        Self::compute_with(pose, &projector, camera.mode)
    }

    pub fn compute_with(
        pose: &CubePose,
        projector: &Projector,
        mode: PerspectiveMode,
    ) -> Result<Self, GeometryError> {
        let world_corners = cube_corners(pose);
        let mut corners = [Vec2::ZERO; 8];
        for (index, corner) in world_corners.iter().enumerate() {
            corners[index] = projector
                .project(*corner)
                .ok_or(GeometryError::CornerBehindCamera { index })?;
        }

        let vanishing_points = vanishing_points(pose, projector, mode);
        let (x_class, z_class) = classify_horizontal(mode, &vanishing_points);

        let mut edges = EdgeGroups::default();
        let mut bounds = ScreenBounds::empty();
        for edge in cube_edges(pose) {
            let start = corners[edge.corners[0]];
            let end = corners[edge.corners[1]];
            bounds.include(start);
            bounds.include(end);

            let class = match edge.axis {
                CubeAxis::X => x_class,
                CubeAxis::Z => z_class,
                CubeAxis::Y => AxisClass::Vertical,
            };
            edges.push(EdgeSegment::new(start, end, class));
        }

        let vanishing_points = vanishing_points
            .into_iter()
            .map(|vp| {
                let class = match vp.axis {
                    CubeAxis::X => x_class,
                    CubeAxis::Z => z_class,
                    CubeAxis::Y => AxisClass::Vertical,
                };
                VanishingPoint { class, ..vp }
            })
            .collect();

        let horizon_y = if mode.has_vanishing_points() {
            horizon_screen_y(projector)
        } else {
            None
        };

        Ok(Self {
            frame: projector.viewport(),
            mode,
            corners,
            edges,
            vanishing_points,
            horizon_y,
            bounds,
        })
    }

    /// Re-express the geometry relative to a crop (`-crop.x, -crop.y`).
    pub fn crop_relative(&self, crop: &PixelRect) -> SceneGeometry<CropPixels> {
        let offset = crop.origin();
        let edges = self.edges.iter().map(|e| e.to_crop(crop)).collect();
        let mut bounds = self.bounds;
        bounds.min -= offset;
        bounds.max -= offset;

        SceneGeometry {
            frame: Viewport::new(crop.width, crop.height),
            mode: self.mode,
            corners: self.corners.map(|c| crop.to_local(c)),
            edges,
            vanishing_points: self
                .vanishing_points
                .iter()
                .map(|vp| vp.shifted(offset))
                .collect(),
            horizon_y: self.horizon_y.map(|y| y - offset.y),
            bounds,
        }
    }
}

impl<S: CoordSpace> SceneGeometry<S> {
    /// Vanishing point of a class, if present
    pub fn vanishing_point(&self, class: AxisClass) -> Option<&VanishingPoint> {
        self.vanishing_points.iter().find(|vp| vp.class == class)
    }

    /// Guide rays from every corner to every drawable vanishing point.
    pub fn guide_rays(&self) -> Vec<GuideRay> {
        self.vanishing_points
            .iter()
            .filter_map(|vp| vp.drawable_screen().map(|to| (vp.class, to)))
            .flat_map(|(class, to)| {
                self.corners
                    .iter()
                    .map(move |&from| GuideRay { from, to, class })
            })
            .collect()
    }
}

fn vanishing_points(pose: &CubePose, projector: &Projector, mode: PerspectiveMode) -> Vec<VanishingPoint> {
    if !mode.has_vanishing_points() {
        return Vec::new();
    }

    let eye = projector.eye();
    let mut points = Vec::with_capacity(3);
    for axis in [CubeAxis::X, CubeAxis::Z] {
        if let Some(world) = horizontal_vanishing_point(eye, axis, pose.y_rotation) {
            points.push(VanishingPoint {
                axis,
                class: AxisClass::Left,
                world,
                screen: projector.project(world),
            });
        }
    }

    if mode == PerspectiveMode::ThreePoint
        && let Some(world) = vertical_vanishing_point(eye, pose)
    {
        points.push(VanishingPoint {
            axis: CubeAxis::Y,
            class: AxisClass::Vertical,
            world,
            screen: projector.project(world),
        });
    }

    points
}

/// Classes of the X and Z families (see [`AxisClass`] for the mapping).
fn classify_horizontal(mode: PerspectiveMode, points: &[VanishingPoint]) -> (AxisClass, AxisClass) {
    let screen_x = |axis: CubeAxis| {
        points
            .iter()
            .find(|vp| vp.axis == axis)
            .and_then(|vp| vp.screen)
            .map(|s| s.x)
    };

    match (mode, screen_x(CubeAxis::X), screen_x(CubeAxis::Z)) {
        (PerspectiveMode::TwoPoint | PerspectiveMode::ThreePoint, Some(x), Some(z)) if x < z => {
            (AxisClass::Left, AxisClass::Right)
        }
        (PerspectiveMode::TwoPoint | PerspectiveMode::ThreePoint, Some(_), Some(_)) => {
            (AxisClass::Right, AxisClass::Left)
        }
        // A single converging family is the depth family
        (_, Some(_), None) => (AxisClass::Right, AxisClass::Left),
        _ => (AxisClass::Left, AxisClass::Right),
    }
}
