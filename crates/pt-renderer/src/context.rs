//! Headless GPU device and queue.

use std::sync::Arc;

use crate::error::CaptureError;

/// Device and queue used for off-screen capture.
///
/// Cloning is cheap; an application that already owns a device (e.g. an
/// egui-wgpu viewport) can share it through [`GpuContext::from_shared`].
#[derive(Clone)]
pub struct GpuContext {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
}

impl GpuContext {
    /// Request an adapter and device without a presentation surface.
    pub async fn new() -> Result<Self, CaptureError> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor::default());

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or(CaptureError::NoAdapter)?;

        let info = adapter.get_info();
        tracing::info!("Capture adapter: {} ({:?})", info.name, info.backend);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Capture Device"),
                    ..Default::default()
                },
                None,
            )
            .await?;

        Ok(Self {
            device: Arc::new(device),
            queue: Arc::new(queue),
        })
    }

    /// Blocking variant of [`GpuContext::new`].
    pub fn new_blocking() -> Result<Self, CaptureError> {
        pollster::block_on(Self::new())
    }

    pub fn from_shared(device: Arc<wgpu::Device>, queue: Arc<wgpu::Queue>) -> Self {
        Self { device, queue }
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }
}
