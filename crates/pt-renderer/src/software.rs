//! CPU rasteriser implementing [`CaptureSurface`].
//!
//! Used when no GPU adapter is available and by tests. Only the faces that
//! point at the camera are filled; on a convex cube they never overlap, so
//! no depth buffer is needed.

use glam::Vec2;
use image::{Rgba, RgbaImage};
use pt_core::{CameraConfig, CubePose, Projector, Viewport, cube_corners, cube_edges};

use crate::config::{CaptureConfig, CubePalette};
use crate::cube_mesh::{cube_faces, shade};
use crate::error::CaptureError;
use crate::surface::{Background, CaptureSurface, RenderState};

pub struct SoftwareSurface {
    logical: Viewport,
    state: RenderState,
    palette: CubePalette,
    edge_width: f32,
    frames_rendered: usize,
}

impl SoftwareSurface {
    pub fn new(config: &CaptureConfig) -> Self {
        Self {
            logical: config.viewport(),
            state: RenderState {
                background: Background::Color(config.palette.background),
                faces_visible: true,
                pixel_ratio: config.pixel_ratio,
            },
            palette: config.palette,
            edge_width: config.edge_width.max(1.0),
            frames_rendered: 0,
        }
    }

    pub fn set_logical_size(&mut self, size: Viewport) {
        self.logical = size;
    }

    /// Number of frames rendered so far
    pub fn frames_rendered(&self) -> usize {
        self.frames_rendered
    }
}

impl CaptureSurface for SoftwareSurface {
    fn logical_size(&self) -> Viewport {
        self.logical
    }

    fn render_state(&self) -> RenderState {
        self.state
    }

    fn set_render_state(&mut self, state: RenderState) {
        self.state = state;
    }

    fn render_frame(&mut self, pose: &CubePose, camera: &CameraConfig) -> Result<RgbaImage, CaptureError> {
        let size = self.target_size();
        let projector = Projector::new(camera, size)?;
        let mut image = RgbaImage::from_pixel(size.width, size.height, Rgba(self.state.background.rgba8()));

        let corners = cube_corners(pose).map(|c| projector.project(c));
        let eye = projector.eye();
        let faces = cube_faces(pose);
        let front: Vec<_> = faces.iter().filter(|f| f.faces(eye)).collect();

        if self.state.faces_visible {
            for face in &front {
                let quad: Option<Vec<Vec2>> = face.corners.iter().map(|&i| corners[i]).collect();
                if let Some(quad) = quad {
                    fill_convex(&mut image, &quad, to_rgba8(shade(self.palette.face, face.normal)));
                }
            }
        }

        let edge_color = to_rgba8(self.palette.edge);
        for edge in cube_edges(pose) {
            let [a, b] = edge.corners;
            // Hidden edges are occluded by the faces
            if self.state.faces_visible && !front.iter().any(|f| f.contains_edge(a, b)) {
                continue;
            }
            if let (Some(p), Some(q)) = (corners[a], corners[b]) {
                draw_line(&mut image, p, q, self.edge_width, edge_color);
            }
        }

        self.frames_rendered += 1;
        Ok(image)
    }
}

fn to_rgba8(color: [f32; 4]) -> Rgba<u8> {
    Rgba(color.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8))
}

fn fill_convex(image: &mut RgbaImage, polygon: &[Vec2], color: Rgba<u8>) {
    if polygon.len() < 3 {
        return;
    }
    let (width, height) = image.dimensions();
    let min = polygon.iter().fold(Vec2::splat(f32::INFINITY), |m, p| m.min(*p));
    let max = polygon.iter().fold(Vec2::splat(f32::NEG_INFINITY), |m, p| m.max(*p));
    let x0 = min.x.floor().max(0.0) as u32;
    let y0 = min.y.floor().max(0.0) as u32;
    let x1 = (max.x.ceil().max(0.0) as u32).min(width);
    let y1 = (max.y.ceil().max(0.0) as u32).min(height);

    for y in y0..y1 {
        for x in x0..x1 {
            let p = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
            if inside_convex(polygon, p) {
                image.put_pixel(x, y, color);
            }
        }
    }
}

fn inside_convex(polygon: &[Vec2], p: Vec2) -> bool {
    let mut sign = 0.0_f32;
    for (i, a) in polygon.iter().enumerate() {
        let b = polygon[(i + 1) % polygon.len()];
        let cross = (b - *a).perp_dot(p - *a);
        if cross.abs() <= f32::EPSILON {
            continue;
        }
        if sign == 0.0 {
            sign = cross.signum();
        } else if cross.signum() != sign {
            return false;
        }
    }
    true
}

/// Stamp a square brush of `width` pixels along a segment, clipped to the image.
pub fn draw_line(image: &mut RgbaImage, from: Vec2, to: Vec2, width: f32, color: Rgba<u8>) {
    let (w, h) = image.dimensions();
    let delta = to - from;
    let limit = 4 * (w + h) as usize;
    let steps = (delta.x.abs().max(delta.y.abs()).ceil() as usize).clamp(1, limit);
    let radius = ((width - 1.0) * 0.5).max(0.0).round() as i64;

    for i in 0..=steps {
        let p = from + delta * (i as f32 / steps as f32);
        let (cx, cy) = (p.x.floor() as i64, p.y.floor() as i64);
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                let (x, y) = (cx + dx, cy + dy);
                if x >= 0 && y >= 0 && (x as u32) < w && (y as u32) < h {
                    image.put_pixel(x as u32, y as u32, color);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pt_core::{PerspectiveMode, SceneGeometry};

    fn surface() -> SoftwareSurface {
        SoftwareSurface::new(&CaptureConfig {
            viewport_width: 320,
            viewport_height: 240,
            ..Default::default()
        })
    }

    #[test]
    fn test_frame_matches_target_size() {
        let mut s = surface();
        s.set_render_state(RenderState {
            pixel_ratio: 2.0,
            ..s.render_state()
        });
        let frame = s
            .render_frame(&CubePose::default(), &CameraConfig::default())
            .unwrap();
        assert_eq!(frame.dimensions(), (640, 480));
        assert_eq!(s.frames_rendered(), 1);
    }

    #[test]
    fn test_transparent_background_and_opaque_cube() {
        let mut s = surface();
        s.set_render_state(RenderState {
            background: Background::Transparent,
            faces_visible: true,
            pixel_ratio: 1.0,
        });
        let pose = CubePose::preset(PerspectiveMode::TwoPoint);
        let camera = CameraConfig::preset(PerspectiveMode::TwoPoint);
        let frame = s.render_frame(&pose, &camera).unwrap();
        assert_eq!(frame.get_pixel(0, 0).0[3], 0);

        let geometry = SceneGeometry::compute(&pose, &camera, Viewport::new(320, 240)).unwrap();
        let center = (geometry.bounds.min + geometry.bounds.max) * 0.5;
        assert_eq!(frame.get_pixel(center.x as u32, center.y as u32).0[3], 255);
    }

    #[test]
    fn test_hidden_faces_leave_interior_clear() {
        let mut s = surface();
        s.set_render_state(RenderState {
            background: Background::Color([1.0, 1.0, 1.0, 1.0]),
            faces_visible: false,
            pixel_ratio: 1.0,
        });
        let pose = CubePose::preset(PerspectiveMode::OnePoint);
        let camera = CameraConfig::preset(PerspectiveMode::OnePoint);
        let frame = s.render_frame(&pose, &camera).unwrap();

        let geometry = SceneGeometry::compute(&pose, &camera, Viewport::new(320, 240)).unwrap();
        let center = (geometry.bounds.min + geometry.bounds.max) * 0.5;
        assert_eq!(frame.get_pixel(center.x as u32, center.y as u32).0, [255, 255, 255, 255]);
        let corner = geometry.corners[0];
        assert_ne!(frame.get_pixel(corner.x as u32, corner.y as u32).0, [255, 255, 255, 255]);
    }

    #[test]
    fn test_inside_convex() {
        let square = [
            Vec2::new(0.0, 0.0),
            Vec2::new(10.0, 0.0),
            Vec2::new(10.0, 10.0),
            Vec2::new(0.0, 10.0),
        ];
        assert!(inside_convex(&square, Vec2::new(5.0, 5.0)));
        assert!(!inside_convex(&square, Vec2::new(15.0, 5.0)));
    }
}
