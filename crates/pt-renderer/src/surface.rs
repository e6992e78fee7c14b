//! Capture surface abstraction and scoped render-state changes.

use std::ops::{Deref, DerefMut};

use image::RgbaImage;
use pt_core::{CameraConfig, CubePose, Viewport};

use crate::error::CaptureError;

/// Clear behaviour of a frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Background {
    /// Opaque RGBA clear colour (components in `0.0..=1.0`)
    Color([f32; 4]),
    /// Fully transparent clear
    Transparent,
}

impl Background {
    pub fn rgba(&self) -> [f32; 4] {
        match self {
            Background::Color(c) => *c,
            Background::Transparent => [0.0; 4],
        }
    }

    pub fn rgba8(&self) -> [u8; 4] {
        self.rgba().map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8)
    }
}

/// Mutable render settings a capture pass may change temporarily
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderState {
    pub background: Background,
    pub faces_visible: bool,
    /// Device pixel ratio: render-target pixels per logical point
    pub pixel_ratio: f32,
}

impl Default for RenderState {
    fn default() -> Self {
        Self {
            background: Background::Color([1.0, 1.0, 1.0, 1.0]),
            faces_visible: true,
            pixel_ratio: 1.0,
        }
    }
}

/// Something that can render the cube and read the pixels back.
pub trait CaptureSurface {
    /// Logical viewport size
    fn logical_size(&self) -> Viewport;

    fn render_state(&self) -> RenderState;

    fn set_render_state(&mut self, state: RenderState);

    /// Render-target size under the current pixel ratio
    fn target_size(&self) -> Viewport {
        self.logical_size().scaled(self.render_state().pixel_ratio)
    }

    /// Render one frame at [`Self::target_size`] and read it back.
    fn render_frame(&mut self, pose: &CubePose, camera: &CameraConfig) -> Result<RgbaImage, CaptureError>;
}

/// Restores the surface's render state when dropped.
///
/// Every exit path out of a capture, including `?` and panics, goes through
/// the guard's `Drop`, so the live view never keeps a capture setting.
pub struct RenderStateGuard<'a, S: CaptureSurface + ?Sized> {
    surface: &'a mut S,
    saved: RenderState,
}

impl<'a, S: CaptureSurface + ?Sized> RenderStateGuard<'a, S> {
    pub fn new(surface: &'a mut S) -> Self {
        let saved = surface.render_state();
        Self { surface, saved }
    }

    /// State that will be restored
    pub fn saved(&self) -> RenderState {
        self.saved
    }
}

impl<S: CaptureSurface + ?Sized> Deref for RenderStateGuard<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        self.surface
    }
}

impl<S: CaptureSurface + ?Sized> DerefMut for RenderStateGuard<'_, S> {
    fn deref_mut(&mut self) -> &mut S {
        self.surface
    }
}

impl<S: CaptureSurface + ?Sized> Drop for RenderStateGuard<'_, S> {
    fn drop(&mut self) {
        self.surface.set_render_state(self.saved);
    }
}
