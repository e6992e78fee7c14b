//! Result overlay painting
//!
//! Builds egui shapes for the comparison view: detected edges on the
//! reference and on the drawing, ground-truth perspective guides, the
//! horizon and the vanishing points. Shape builders are pure so they can be
//! tested without a UI; [`paint_overlay`] hands them to a painter.
//! [`render_overlay`] rasterizes the same layers into an image of a given
//! size for output files.

use std::time::{Duration, Instant};

use glam::Vec2;
use image::RgbaImage;
use image::imageops::{self, FilterType};
use pt_core::{AxisClass, CropPixels, EdgeSegment, NORMALIZED_EXTENT, Normalized, SceneGeometry};
use pt_renderer::draw_line;
use serde::{Deserialize, Serialize};

/// Overlay colours
pub mod axis_colors {
    use egui::Color32;

    pub const LEFT: Color32 = Color32::from_rgb(0xE3, 0x4A, 0x33);
    pub const RIGHT: Color32 = Color32::from_rgb(0x31, 0x8B, 0xBD);
    pub const VERTICAL: Color32 = Color32::from_rgb(0x31, 0xA3, 0x54);
    pub const HORIZON: Color32 = Color32::from_rgb(0xFD, 0x8D, 0x3C);
    pub const VANISHING_POINT: Color32 = Color32::from_rgb(0x75, 0x6B, 0xB1);
}

const GUIDE_ALPHA: f32 = 0.45;
const VP_RADIUS: f32 = 5.0;
const GUIDE_DASH: f32 = 6.0;
const GUIDE_GAP: f32 = 4.0;

pub fn axis_color(class: AxisClass) -> egui::Color32 {
    match class {
        AxisClass::Left => axis_colors::LEFT,
        AxisClass::Right => axis_colors::RIGHT,
        AxisClass::Vertical => axis_colors::VERTICAL,
    }
}

/// Which image an overlay is drawn over
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayTarget {
    Reference,
    Drawing,
}

/// Visibility toggles
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayOptions {
    /// Detected edges over the reference image
    pub show_reference_edges: bool,
    /// Detected edges over the user's drawing
    pub show_user_edges: bool,
    /// Corner-to-vanishing-point rays
    pub show_guides: bool,
    pub show_horizon: bool,
    pub show_vanishing_points: bool,
    pub edge_width: f32,
    pub guide_width: f32,
}

impl Default for OverlayOptions {
    fn default() -> Self {
        Self {
            show_reference_edges: true,
            show_user_edges: true,
            show_guides: false,
            show_horizon: true,
            show_vanishing_points: true,
            edge_width: 2.5,
            guide_width: 1.0,
        }
    }
}

/// What can be drawn over one image
#[derive(Debug, Clone, Copy)]
pub struct OverlayLayers<'a> {
    /// Ground truth in the capture crop frame
    pub geometry: Option<&'a SceneGeometry<CropPixels>>,
    pub reference_edges: &'a [EdgeSegment<Normalized>],
    pub user_edges: &'a [EdgeSegment<Normalized>],
}

/// Map a 0..1000 point into the displayed image rectangle.
pub fn normalized_to_display(point: Vec2, rect: egui::Rect) -> egui::Pos2 {
    let t = point / NORMALIZED_EXTENT;
    rect.min + egui::vec2(t.x * rect.width(), t.y * rect.height())
}

/// Map a crop-pixel point into the displayed image rectangle.
pub fn crop_to_display(point: Vec2, crop_size: Vec2, rect: egui::Rect) -> egui::Pos2 {
    let t = point / crop_size.max(Vec2::ONE);
    rect.min + egui::vec2(t.x * rect.width(), t.y * rect.height())
}

/// Detected edges as coloured segments.
pub fn edge_shapes(
    edges: &[EdgeSegment<Normalized>],
    rect: egui::Rect,
    width: f32,
) -> Vec<egui::Shape> {
    edges
        .iter()
        .map(|edge| {
            egui::Shape::line_segment(
                [
                    normalized_to_display(edge.start, rect),
                    normalized_to_display(edge.end, rect),
                ],
                egui::Stroke::new(width, axis_color(edge.axis)),
            )
        })
        .collect()
}

/// Guides, horizon and vanishing points from the ground truth.
pub fn guide_shapes(
    geometry: &SceneGeometry<CropPixels>,
    rect: egui::Rect,
    options: &OverlayOptions,
) -> Vec<egui::Shape> {
    let size = geometry.frame.size();
    let to_display = |p: Vec2| crop_to_display(p, size, rect);
    let mut shapes = Vec::new();

    if options.show_guides {
        for ray in geometry.guide_rays() {
            let stroke = egui::Stroke::new(
                options.guide_width,
                axis_color(ray.class).gamma_multiply(GUIDE_ALPHA),
            );
            shapes.extend(egui::Shape::dashed_line(
                &[to_display(ray.from), to_display(ray.to)],
                stroke,
                GUIDE_DASH,
                GUIDE_GAP,
            ));
        }
    }

    if options.show_horizon
        && let Some(y) = geometry.horizon_y
    {
        let y = to_display(Vec2::new(0.0, y)).y;
        shapes.push(egui::Shape::line_segment(
            [egui::pos2(rect.left(), y), egui::pos2(rect.right(), y)],
            egui::Stroke::new(options.guide_width, axis_colors::HORIZON),
        ));
    }

    if options.show_vanishing_points {
        for vp in &geometry.vanishing_points {
            if let Some(screen) = vp.drawable_screen() {
                shapes.push(egui::Shape::circle_filled(
                    to_display(screen),
                    VP_RADIUS,
                    axis_colors::VANISHING_POINT,
                ));
            }
        }
    }

    shapes
}

/// All shapes for one image.
///
/// `revealed` limits the detected edges to a prefix (see [`RevealAnimation`]).
pub fn overlay_shapes(
    target: OverlayTarget,
    layers: &OverlayLayers<'_>,
    rect: egui::Rect,
    options: &OverlayOptions,
    revealed: Option<usize>,
) -> Vec<egui::Shape> {
    let mut shapes = match layers.geometry {
        Some(geometry) => guide_shapes(geometry, rect, options),
        None => Vec::new(),
    };

    let edges = visible_edges(target, layers, options);
    let count = revealed.map_or(edges.len(), |n| n.min(edges.len()));
    shapes.extend(edge_shapes(&edges[..count], rect, options.edge_width));
    shapes
}

fn visible_edges<'a>(
    target: OverlayTarget,
    layers: &OverlayLayers<'a>,
    options: &OverlayOptions,
) -> &'a [EdgeSegment<Normalized>] {
    match target {
        OverlayTarget::Reference if options.show_reference_edges => layers.reference_edges,
        OverlayTarget::Drawing if options.show_user_edges => layers.user_edges,
        _ => &[],
    }
}

/// Paint the overlay for one image into `rect`.
pub fn paint_overlay(
    painter: &egui::Painter,
    target: OverlayTarget,
    layers: &OverlayLayers<'_>,
    rect: egui::Rect,
    options: &OverlayOptions,
    revealed: Option<usize>,
) {
    painter
        .with_clip_rect(rect)
        .extend(overlay_shapes(target, layers, rect, options, revealed));
}

fn to_rgba(color: egui::Color32) -> image::Rgba<u8> {
    image::Rgba(color.to_srgba_unmultiplied())
}

/// Rasterize the overlay for one image onto a transparent canvas of `size`.
///
/// Same layers, toggles and scaling as [`overlay_shapes`]; guide rays are
/// drawn solid.
pub fn render_overlay(
    target: OverlayTarget,
    layers: &OverlayLayers<'_>,
    size: (u32, u32),
    options: &OverlayOptions,
) -> RgbaImage {
    let (width, height) = size;
    let mut canvas = RgbaImage::new(width, height);
    let rect = egui::Rect::from_min_size(egui::Pos2::ZERO, egui::vec2(width as f32, height as f32));
    let pixel = |p: egui::Pos2| Vec2::new(p.x, p.y);

    if let Some(geometry) = layers.geometry {
        let frame = geometry.frame.size();
        let from_crop = |p: Vec2| pixel(crop_to_display(p, frame, rect));

        if options.show_guides {
            for ray in geometry.guide_rays() {
                let color = axis_color(ray.class).gamma_multiply(GUIDE_ALPHA);
                draw_line(
                    &mut canvas,
                    from_crop(ray.from),
                    from_crop(ray.to),
                    options.guide_width,
                    to_rgba(color),
                );
            }
        }
        if options.show_horizon
            && let Some(y) = geometry.horizon_y
        {
            let y = from_crop(Vec2::new(0.0, y)).y;
            draw_line(
                &mut canvas,
                Vec2::new(0.0, y),
                Vec2::new(width as f32, y),
                options.guide_width,
                to_rgba(axis_colors::HORIZON),
            );
        }
        if options.show_vanishing_points {
            for vp in &geometry.vanishing_points {
                if let Some(screen) = vp.drawable_screen() {
                    let center = from_crop(screen);
                    draw_line(
                        &mut canvas,
                        center,
                        center,
                        VP_RADIUS * 2.0,
                        to_rgba(axis_colors::VANISHING_POINT),
                    );
                }
            }
        }
    }

    for edge in visible_edges(target, layers, options) {
        draw_line(
            &mut canvas,
            pixel(normalized_to_display(edge.start, rect)),
            pixel(normalized_to_display(edge.end, rect)),
            options.edge_width,
            to_rgba(axis_color(edge.axis)),
        );
    }
    canvas
}

/// `base` with its overlay drawn on top, at the base image's size.
pub fn annotate(
    base: &RgbaImage,
    target: OverlayTarget,
    layers: &OverlayLayers<'_>,
    options: &OverlayOptions,
) -> RgbaImage {
    let overlay = render_overlay(target, layers, base.dimensions(), options);
    composite_overlay(base, &overlay)
}

/// Edge count per class with its colour, for a legend
pub fn legend(edges: &[EdgeSegment<Normalized>]) -> [(AxisClass, usize, egui::Color32); 3] {
    AxisClass::ALL.map(|class| (class, pt_core::count_axis(edges, class), axis_color(class)))
}

/// Shows a growing prefix of an edge list, one edge per interval.
#[derive(Debug, Clone, Copy)]
pub struct RevealAnimation {
    started: Instant,
    per_edge: Duration,
}

impl RevealAnimation {
    pub fn new(started: Instant, per_edge: Duration) -> Self {
        Self { started, per_edge }
    }

    /// Edges visible at `now`; never decreases and stops at `total`.
    pub fn visible_count(&self, total: usize, now: Instant) -> usize {
        if self.per_edge.is_zero() {
            return total;
        }
        let elapsed = now.saturating_duration_since(self.started);
        let shown = elapsed.as_nanos() / self.per_edge.as_nanos();
        usize::try_from(shown).map_or(total, |n| n.min(total))
    }

    pub fn is_complete(&self, total: usize, now: Instant) -> bool {
        self.visible_count(total, now) == total
    }
}

/// Composite the transparent edge overlay over the user's drawing.
pub fn composite_overlay(drawing: &RgbaImage, overlay: &RgbaImage) -> RgbaImage {
    let mut base = drawing.clone();
    let (w, h) = drawing.dimensions();
    if overlay.dimensions() == (w, h) {
        imageops::overlay(&mut base, overlay, 0, 0);
    } else {
        let scaled = imageops::resize(overlay, w, h, FilterType::Triangle);
        imageops::overlay(&mut base, &scaled, 0, 0);
    }
    base
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use pt_core::{CameraConfig, CubePose, PerspectiveMode, PixelRect, Viewport};

    fn rect() -> egui::Rect {
        egui::Rect::from_min_size(egui::pos2(10.0, 20.0), egui::vec2(400.0, 300.0))
    }

    fn edge(class: AxisClass) -> EdgeSegment<Normalized> {
        EdgeSegment::new(Vec2::new(0.0, 0.0), Vec2::new(1000.0, 500.0), class)
    }

    fn geometry(mode: PerspectiveMode) -> SceneGeometry<CropPixels> {
        let viewport = Viewport::new(800, 600);
        let geometry =
            SceneGeometry::compute(&CubePose::preset(mode), &CameraConfig::preset(mode), viewport)
                .unwrap();
        geometry.crop_relative(&PixelRect::full(viewport))
    }

    fn segments(shapes: &[egui::Shape]) -> Vec<[egui::Pos2; 2]> {
        shapes
            .iter()
            .filter_map(|s| match s {
                egui::Shape::LineSegment { points, .. } => Some(*points),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_normalized_scaling() {
        let p = normalized_to_display(Vec2::new(500.0, 1000.0), rect());
        assert_relative_eq!(p.x, 210.0);
        assert_relative_eq!(p.y, 320.0);
        let origin = normalized_to_display(Vec2::ZERO, rect());
        assert_eq!(origin, rect().min);
    }

    #[test]
    fn test_edges_colored_by_class() {
        let shapes = edge_shapes(&[edge(AxisClass::Left), edge(AxisClass::Vertical)], rect(), 2.0);
        let colors: Vec<_> = shapes
            .iter()
            .filter_map(|s| match s {
                egui::Shape::LineSegment { stroke, .. } => Some(stroke.color.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(colors.len(), 2);
        assert_ne!(colors[0], colors[1]);
        assert_eq!(segments(&shapes)[0][1], egui::pos2(410.0, 170.0));
    }

    #[test]
    fn test_reference_and_user_toggles_independent() {
        let reference = [edge(AxisClass::Left)];
        let user = [edge(AxisClass::Right), edge(AxisClass::Right)];
        let layers = OverlayLayers {
            geometry: None,
            reference_edges: &reference,
            user_edges: &user,
        };
        let options = OverlayOptions {
            show_reference_edges: false,
            ..Default::default()
        };
        assert!(overlay_shapes(OverlayTarget::Reference, &layers, rect(), &options, None).is_empty());
        assert_eq!(
            overlay_shapes(OverlayTarget::Drawing, &layers, rect(), &options, None).len(),
            2
        );
    }

    #[test]
    fn test_guides_independent_of_edges() {
        let g = geometry(PerspectiveMode::TwoPoint);
        let layers = OverlayLayers {
            geometry: Some(&g),
            reference_edges: &[],
            user_edges: &[],
        };
        let hidden = OverlayOptions {
            show_guides: false,
            show_horizon: false,
            show_vanishing_points: false,
            ..Default::default()
        };
        assert!(overlay_shapes(OverlayTarget::Reference, &layers, rect(), &hidden, None).is_empty());

        let guides_only = OverlayOptions {
            show_guides: true,
            show_reference_edges: false,
            show_user_edges: false,
            ..hidden
        };
        assert!(!overlay_shapes(OverlayTarget::Reference, &layers, rect(), &guides_only, None).is_empty());
    }

    #[test]
    fn test_horizon_spans_rect_and_vps_drawn() {
        let g = geometry(PerspectiveMode::TwoPoint);
        let options = OverlayOptions::default();
        let shapes = guide_shapes(&g, rect(), &options);
        let horizon = segments(&shapes)[0];
        assert_relative_eq!(horizon[0].x, rect().left());
        assert_relative_eq!(horizon[1].x, rect().right());
        assert_relative_eq!(horizon[0].y, horizon[1].y);

        let circles = shapes
            .iter()
            .filter(|s| matches!(s, egui::Shape::Circle(_)))
            .count();
        assert_eq!(
            circles,
            g.vanishing_points.iter().filter(|vp| vp.is_drawable()).count()
        );
    }

    #[test]
    fn test_free_mode_has_no_guides() {
        let g = geometry(PerspectiveMode::Free);
        let options = OverlayOptions {
            show_guides: true,
            ..Default::default()
        };
        assert!(guide_shapes(&g, rect(), &options).is_empty());
    }

    #[test]
    fn test_reveal_is_monotone_and_completes() {
        let start = Instant::now();
        let reveal = RevealAnimation::new(start, Duration::from_millis(100));
        let mut last = 0;
        for step in 0..20 {
            let count = reveal.visible_count(9, start + Duration::from_millis(step * 50));
            assert!(count >= last);
            assert!(count <= 9);
            last = count;
        }
        assert_eq!(reveal.visible_count(9, start), 0);
        assert!(reveal.is_complete(9, start + Duration::from_secs(1)));
        assert!(RevealAnimation::new(start, Duration::ZERO).is_complete(9, start));
    }

    #[test]
    fn test_revealed_prefix_limits_edges() {
        let user = [edge(AxisClass::Left), edge(AxisClass::Right), edge(AxisClass::Vertical)];
        let layers = OverlayLayers {
            geometry: None,
            reference_edges: &[],
            user_edges: &user,
        };
        let options = OverlayOptions::default();
        let shapes = overlay_shapes(OverlayTarget::Drawing, &layers, rect(), &options, Some(2));
        assert_eq!(shapes.len(), 2);
        let all = overlay_shapes(OverlayTarget::Drawing, &layers, rect(), &options, Some(99));
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn test_legend_counts() {
        let edges = [edge(AxisClass::Left), edge(AxisClass::Left), edge(AxisClass::Vertical)];
        let legend = legend(&edges);
        assert_eq!(legend[0].1, 2);
        assert_eq!(legend[1].1, 0);
        assert_eq!(legend[2].1, 1);
    }

    #[test]
    fn test_rendered_edge_lands_on_scaled_pixels() {
        let user = [EdgeSegment::new(Vec2::new(250.0, 750.0), Vec2::new(750.0, 750.0), AxisClass::Right)];
        let layers = OverlayLayers {
            geometry: None,
            reference_edges: &[],
            user_edges: &user,
        };
        let options = OverlayOptions {
            edge_width: 1.0,
            ..Default::default()
        };
        let canvas = render_overlay(OverlayTarget::Drawing, &layers, (300, 120), &options);
        assert_eq!(canvas.dimensions(), (300, 120));

        let right = to_rgba(axis_colors::RIGHT);
        for x in [75, 150, 225] {
            assert_eq!(canvas.get_pixel(x, 90), &right);
        }
        assert_eq!(canvas.get_pixel(150, 89).0[3], 0);
        assert_eq!(canvas.get_pixel(74, 90).0[3], 0);
        assert_eq!(canvas.get_pixel(150, 30).0[3], 0);
    }

    #[test]
    fn test_rendered_overlay_respects_toggles() {
        let reference = [edge(AxisClass::Left)];
        let user = [edge(AxisClass::Vertical)];
        let layers = OverlayLayers {
            geometry: None,
            reference_edges: &reference,
            user_edges: &user,
        };
        let options = OverlayOptions {
            show_user_edges: false,
            ..Default::default()
        };
        let drawing = render_overlay(OverlayTarget::Drawing, &layers, (64, 48), &options);
        assert!(drawing.pixels().all(|p| p.0[3] == 0));
        let reference = render_overlay(OverlayTarget::Reference, &layers, (64, 48), &options);
        assert!(reference.pixels().any(|p| *p == to_rgba(axis_colors::LEFT)));
    }

    #[test]
    fn test_rendered_guides_follow_geometry() {
        let g = geometry(PerspectiveMode::TwoPoint);
        let layers = OverlayLayers {
            geometry: Some(&g),
            reference_edges: &[],
            user_edges: &[],
        };
        let options = OverlayOptions {
            show_guides: false,
            show_vanishing_points: false,
            guide_width: 1.0,
            ..Default::default()
        };
        // Half the crop size: the horizon row scales with it
        let canvas = render_overlay(OverlayTarget::Reference, &layers, (400, 300), &options);
        let y = (g.horizon_y.unwrap() * 0.5).round() as u32;
        let horizon = to_rgba(axis_colors::HORIZON);
        assert!((y - 1..=y + 1).any(|row| canvas.get_pixel(200, row) == &horizon));
        assert_eq!(canvas.get_pixel(200, y + 10).0[3], 0);
    }

    #[test]
    fn test_annotate_keeps_base_size() {
        let base = RgbaImage::from_pixel(90, 60, image::Rgba([255, 255, 255, 255]));
        let user = [edge(AxisClass::Left)];
        let layers = OverlayLayers {
            geometry: None,
            reference_edges: &[],
            user_edges: &user,
        };
        let out = annotate(&base, OverlayTarget::Drawing, &layers, &OverlayOptions::default());
        assert_eq!(out.dimensions(), (90, 60));
        assert_eq!(out.get_pixel(45, 15), &to_rgba(axis_colors::LEFT));
        assert_eq!(out.get_pixel(10, 50), &image::Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn test_composite_keeps_drawing_size() {
        let drawing = RgbaImage::from_pixel(40, 30, image::Rgba([255, 255, 255, 255]));
        let mut overlay = RgbaImage::new(20, 15);
        overlay.put_pixel(0, 0, image::Rgba([0, 0, 0, 255]));
        let out = composite_overlay(&drawing, &overlay);
        assert_eq!(out.dimensions(), (40, 30));
        assert_eq!(out.get_pixel(39, 29), &image::Rgba([255, 255, 255, 255]));
        assert_ne!(out.get_pixel(0, 0), &image::Rgba([255, 255, 255, 255]));
    }
}
