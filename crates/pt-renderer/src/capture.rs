//! Three-pass scene capture.
//!
//! One capture renders the cube three times at a boosted pixel ratio:
//!
//! 1. solid faces on an opaque background (the AI reference)
//! 2. edges only on an opaque background (wireframe)
//! 3. edges only on a transparent background (user-facing overlay)
//!
//! Each frame is read back and cropped to the padded cube bounds right after
//! it is rendered. Ground-truth geometry is computed for the same render
//! target and shifted into the crop frame, so it lines up with all three
//! images. The surface's render state is restored on every exit path.

use std::sync::Arc;

use image::RgbaImage;
use image::imageops::FilterType;
use pt_core::{
    CameraConfig, CropPixels, CubePose, EdgeGroups, EdgeSegment, Normalized, PixelRect,
    SceneGeometry, Viewport,
};

use crate::config::CaptureConfig;
use crate::error::CaptureError;
use crate::surface::{Background, CaptureSurface, RenderState, RenderStateGuard};

/// Immutable output of one capture
#[derive(Debug, Clone)]
pub struct CaptureResult {
    /// Solid render with background
    pub solid: RgbaImage,
    /// Edges on the opaque background
    pub wireframe: RgbaImage,
    /// Edges on a transparent background
    pub overlay: RgbaImage,
    /// Crop applied to every pass, in render-target pixels
    pub crop: PixelRect,
    /// `false` when cropping failed and the full frame was kept
    pub cropped: bool,
    /// Ground truth relative to the crop's top-left corner
    pub geometry: SceneGeometry<CropPixels>,
    pub pose: CubePose,
    pub camera: CameraConfig,
}

impl CaptureResult {
    /// Width and height of all three images
    pub fn crop_size(&self) -> (u32, u32) {
        (self.crop.width, self.crop.height)
    }

    pub fn ground_truth(&self) -> &EdgeGroups<CropPixels> {
        &self.geometry.edges
    }

    /// Ground-truth edges on the 0..1000 grid of the crop
    pub fn normalized_ground_truth(&self) -> Vec<EdgeSegment<Normalized>> {
        let (w, h) = self.crop_size();
        self.geometry
            .edges
            .iter()
            .map(|e| e.to_normalized(w, h))
            .collect()
    }
}

/// Shared read-only view of a capture passed to the drawing-upload step
#[derive(Debug, Clone)]
pub struct CaptureHandoff {
    capture: Arc<CaptureResult>,
}

impl CaptureHandoff {
    pub fn new(capture: Arc<CaptureResult>) -> Self {
        Self { capture }
    }

    pub fn reference_image(&self) -> &RgbaImage {
        &self.capture.solid
    }

    pub fn wireframe_overlay(&self) -> &RgbaImage {
        &self.capture.overlay
    }

    pub fn crop_width(&self) -> u32 {
        self.capture.crop.width
    }

    pub fn crop_height(&self) -> u32 {
        self.capture.crop.height
    }

    pub fn capture(&self) -> &Arc<CaptureResult> {
        &self.capture
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pass {
    Solid,
    Wireframe,
    Transparent,
}

impl Pass {
    const ALL: [Pass; 3] = [Pass::Solid, Pass::Wireframe, Pass::Transparent];

    fn state(&self, background: [f32; 4], pixel_ratio: f32) -> RenderState {
        match self {
            Pass::Solid => RenderState {
                background: Background::Color(background),
                faces_visible: true,
                pixel_ratio,
            },
            Pass::Wireframe => RenderState {
                background: Background::Color(background),
                faces_visible: false,
                pixel_ratio,
            },
            Pass::Transparent => RenderState {
                background: Background::Transparent,
                faces_visible: false,
                pixel_ratio,
            },
        }
    }
}

/// Runs captures against a [`CaptureSurface`]
#[derive(Debug, Clone, Default)]
pub struct CaptureController {
    config: CaptureConfig,
}

impl CaptureController {
    pub fn new(config: CaptureConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    /// Capture the three passes for the current pose and camera.
    ///
    /// Running it twice with the same inputs gives identical crops and
    /// geometry; the surface is left exactly as it was found.
    pub fn capture<S: CaptureSurface + ?Sized>(
        &self,
        surface: &mut S,
        pose: &CubePose,
        camera: &CameraConfig,
    ) -> Result<CaptureResult, CaptureError> {
        let mut guard = RenderStateGuard::new(surface);
        let saved = guard.saved();
        let pixel_ratio = self.config.capture_pixel_ratio(saved.pixel_ratio);
        guard.set_render_state(RenderState {
            pixel_ratio,
            ..saved
        });

        let target = guard.target_size();
        let geometry = SceneGeometry::compute(pose, camera, target)?;
        let crop = geometry.bounds.pad_and_clamp(self.config.padding_ratio, target);
        if crop.is_none() {
            tracing::warn!("Cube bounds outside the {}x{} target; keeping full frame", target.width, target.height);
        }

        let mut full_frames = Vec::with_capacity(Pass::ALL.len());
        let mut cropped_frames = Vec::with_capacity(Pass::ALL.len());
        for pass in Pass::ALL {
            guard.set_render_state(pass.state(self.config.palette.background, pixel_ratio));
            let frame = guard.render_frame(pose, camera)?;

            let cropped = match crop {
                Some(rect) => match crop_frame(&frame, &rect) {
                    Ok(image) => Some(image),
                    Err(e) => {
                        tracing::warn!("{:?} pass crop failed: {}", pass, e);
                        None
                    }
                },
                None => None,
            };
            cropped_frames.push(cropped);
            full_frames.push(frame);
        }

        let all_cropped: Option<Vec<RgbaImage>> = cropped_frames.into_iter().collect();
        let (images, crop, cropped) = match (all_cropped, crop) {
            (Some(images), Some(rect)) => (images, rect, true),
            _ => {
                let frames = full_frames.into_iter().map(|f| fit_to_target(f, target)).collect();
                (frames, PixelRect::full(target), false)
            }
        };

        let [solid, wireframe, overlay]: [RgbaImage; 3] = images
            .try_into()
            .map_err(|_| CaptureError::Readback("missing capture pass".to_string()))?;

        tracing::debug!(
            "Captured {}x{} crop at ({}, {}), pixel ratio {}",
            crop.width,
            crop.height,
            crop.x,
            crop.y,
            pixel_ratio
        );

        Ok(CaptureResult {
            solid,
            wireframe,
            overlay,
            crop,
            cropped,
            geometry: geometry.crop_relative(&crop),
            pose: *pose,
            camera: *camera,
        })
    }
}

/// Scale a frame to the size its geometry was projected for.
fn fit_to_target(frame: RgbaImage, target: Viewport) -> RgbaImage {
    if frame.dimensions() == (target.width, target.height) {
        return frame;
    }
    tracing::warn!(
        "Frame is {}x{} but the target is {}x{}; rescaling",
        frame.width(),
        frame.height(),
        target.width,
        target.height
    );
    image::imageops::resize(&frame, target.width, target.height, FilterType::Triangle)
}

/// Copy `rect` out of `frame`.
pub fn crop_frame(frame: &RgbaImage, rect: &PixelRect) -> Result<RgbaImage, CaptureError> {
    let (width, height) = frame.dimensions();
    if !rect.fits_within(width, height) {
        return Err(CaptureError::Crop {
            x: rect.x,
            y: rect.y,
            width: rect.width,
            height: rect.height,
            frame_width: width,
            frame_height: height,
        });
    }
    Ok(image::imageops::crop_imm(frame, rect.x, rect.y, rect.width, rect.height).to_image())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::software::SoftwareSurface;
    use pt_core::PerspectiveMode;

    fn config() -> CaptureConfig {
        CaptureConfig {
            viewport_width: 320,
            viewport_height: 240,
            ..Default::default()
        }
    }

    fn scene() -> (CubePose, CameraConfig) {
        (
            CubePose::preset(PerspectiveMode::TwoPoint),
            CameraConfig::preset(PerspectiveMode::TwoPoint),
        )
    }

    /// Wraps a surface and fails or shrinks frames on demand
    struct FaultySurface {
        inner: SoftwareSurface,
        fail_on_pass: Option<usize>,
        shrink_frames: bool,
        passes: usize,
    }

    impl FaultySurface {
        fn new() -> Self {
            Self {
                inner: SoftwareSurface::new(&config()),
                fail_on_pass: None,
                shrink_frames: false,
                passes: 0,
            }
        }
    }

    impl CaptureSurface for FaultySurface {
        fn logical_size(&self) -> Viewport {
            self.inner.logical_size()
        }

        fn render_state(&self) -> RenderState {
            self.inner.render_state()
        }

        fn set_render_state(&mut self, state: RenderState) {
            self.inner.set_render_state(state);
        }

        fn render_frame(&mut self, pose: &CubePose, camera: &CameraConfig) -> Result<RgbaImage, CaptureError> {
            let pass = self.passes;
            self.passes += 1;
            if self.fail_on_pass == Some(pass) {
                return Err(CaptureError::Readback("lost device".to_string()));
            }
            let frame = self.inner.render_frame(pose, camera)?;
            if self.shrink_frames {
                return Ok(image::imageops::crop_imm(&frame, 0, 0, 8, 8).to_image());
            }
            Ok(frame)
        }
    }

    #[test]
    fn test_capture_crops_all_passes_identically() {
        let (pose, camera) = scene();
        let mut surface = SoftwareSurface::new(&config());
        let result = CaptureController::new(config())
            .capture(&mut surface, &pose, &camera)
            .unwrap();

        assert!(result.cropped);
        let size = result.crop_size();
        assert_eq!(result.solid.dimensions(), size);
        assert_eq!(result.wireframe.dimensions(), size);
        assert_eq!(result.overlay.dimensions(), size);
        assert!(result.crop.fits_within(640, 480));
        assert_eq!(result.geometry.frame, Viewport::new(size.0, size.1));
        assert_eq!(result.ground_truth().len(), 12);
        assert_eq!(surface.frames_rendered(), 3);
    }

    #[test]
    fn test_ground_truth_inside_crop() {
        let (pose, camera) = scene();
        let mut surface = SoftwareSurface::new(&config());
        let result = CaptureController::new(config())
            .capture(&mut surface, &pose, &camera)
            .unwrap();
        let (w, h) = result.crop_size();
        for edge in result.ground_truth().iter() {
            for p in [edge.start, edge.end] {
                assert!(p.x >= 0.0 && p.y >= 0.0);
                assert!(p.x <= w as f32 && p.y <= h as f32);
            }
        }
        for edge in result.normalized_ground_truth() {
            assert!(edge.start.max_element() <= 1000.0);
        }
    }

    #[test]
    fn test_render_state_restored_after_success() {
        let (pose, camera) = scene();
        let mut surface = SoftwareSurface::new(&config());
        let before = surface.render_state();
        CaptureController::new(config())
            .capture(&mut surface, &pose, &camera)
            .unwrap();
        assert_eq!(surface.render_state(), before);
    }

    #[test]
    fn test_render_state_restored_after_failure() {
        let (pose, camera) = scene();
        let mut surface = FaultySurface::new();
        surface.fail_on_pass = Some(1);
        let before = surface.render_state();
        let err = CaptureController::new(config())
            .capture(&mut surface, &pose, &camera)
            .unwrap_err();
        assert!(matches!(err, CaptureError::Readback(_)));
        assert_eq!(surface.render_state(), before);
    }

    #[test]
    fn test_capture_is_idempotent() {
        let (pose, camera) = scene();
        let mut surface = SoftwareSurface::new(&config());
        let controller = CaptureController::new(config());
        let first = controller.capture(&mut surface, &pose, &camera).unwrap();
        let second = controller.capture(&mut surface, &pose, &camera).unwrap();
        assert_eq!(first.crop, second.crop);
        assert_eq!(first.geometry, second.geometry);
        assert_eq!(first.solid, second.solid);
    }

    #[test]
    fn test_crop_failure_falls_back_to_full_frame() {
        let (pose, camera) = scene();
        let mut surface = FaultySurface::new();
        surface.shrink_frames = true;
        let result = CaptureController::new(config())
            .capture(&mut surface, &pose, &camera)
            .unwrap();
        assert!(!result.cropped);
        assert_eq!(result.crop, PixelRect::new(0, 0, 640, 480));
        assert_eq!(result.geometry.frame, Viewport::new(640, 480));
        for image in [&result.solid, &result.wireframe, &result.overlay] {
            assert_eq!(image.dimensions(), (640, 480));
        }
        for edge in result.ground_truth().iter() {
            for p in [edge.start, edge.end] {
                assert!(p.x >= 0.0 && p.x <= 640.0);
                assert!(p.y >= 0.0 && p.y <= 480.0);
            }
        }
    }

    #[test]
    fn test_offscreen_cube_keeps_full_frame() {
        let pose = CubePose::new(glam::Vec3::new(400.0, 0.0, -10.0), 0.3);
        let camera = CameraConfig::preset(PerspectiveMode::TwoPoint);
        let mut surface = SoftwareSurface::new(&config());
        let result = CaptureController::new(config())
            .capture(&mut surface, &pose, &camera)
            .unwrap();
        assert!(!result.cropped);
        assert_eq!(result.crop, PixelRect::new(0, 0, 640, 480));
    }

    #[test]
    fn test_overlay_pass_is_transparent() {
        let (pose, camera) = scene();
        let mut surface = SoftwareSurface::new(&config());
        let result = CaptureController::new(config())
            .capture(&mut surface, &pose, &camera)
            .unwrap();
        assert_eq!(result.overlay.get_pixel(0, 0).0[3], 0);
        assert_eq!(result.solid.get_pixel(0, 0).0, [255, 255, 255, 255]);
    }

    #[test]
    fn test_handoff_shares_capture() {
        let (pose, camera) = scene();
        let mut surface = SoftwareSurface::new(&config());
        let result = Arc::new(
            CaptureController::new(config())
                .capture(&mut surface, &pose, &camera)
                .unwrap(),
        );
        let handoff = CaptureHandoff::new(Arc::clone(&result));
        assert_eq!(handoff.crop_width(), result.crop.width);
        assert_eq!(handoff.crop_height(), result.crop.height);
        assert!(Arc::ptr_eq(handoff.capture(), &result));
    }
}
