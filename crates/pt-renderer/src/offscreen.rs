//! Off-screen wgpu cube renderer with pixel readback.

use image::RgbaImage;
use pt_core::{CameraConfig, CubePose, Projector, Viewport};
use wgpu::util::DeviceExt;

use crate::camera::CameraUniform;
use crate::config::{CaptureConfig, CubePalette};
use crate::context::GpuContext;
use crate::cube_mesh::{edge_vertices, face_vertices};
use crate::error::CaptureError;
use crate::surface::{Background, CaptureSurface, RenderState};
use crate::vertex::CubeVertex;

const COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
const BYTES_PER_PIXEL: u32 = 4;

/// Colour and depth targets for one render size
struct RenderTargets {
    size: Viewport,
    color: wgpu::Texture,
    depth_view: wgpu::TextureView,
}

impl RenderTargets {
    fn new(device: &wgpu::Device, size: Viewport) -> Self {
        let extent = wgpu::Extent3d {
            width: size.width,
            height: size.height,
            depth_or_array_layers: 1,
        };
        let color = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Capture Color Texture"),
            size: extent,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: COLOR_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let depth = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Capture Depth Texture"),
            size: extent,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        Self {
            size,
            color,
            depth_view: depth.create_view(&wgpu::TextureViewDescriptor::default()),
        }
    }
}

/// Renders the cube into an off-screen texture and reads it back.
pub struct OffscreenRenderer {
    gpu: GpuContext,
    logical: Viewport,
    state: RenderState,
    palette: CubePalette,
    face_pipeline: wgpu::RenderPipeline,
    edge_pipeline: wgpu::RenderPipeline,
    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,
    targets: Option<RenderTargets>,
}

impl OffscreenRenderer {
    pub fn new(gpu: GpuContext, config: &CaptureConfig) -> Self {
        let device = gpu.device();

        let camera_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Camera Bind Group Layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
            });

        let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Buffer"),
            contents: bytemuck::cast_slice(&[CameraUniform::default()]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Camera Bind Group"),
            layout: &camera_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Cube Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/cube.wgsl").into()),
        });

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Cube Pipeline Layout"),
            bind_group_layouts: &[&camera_bind_group_layout],
            push_constant_ranges: &[],
        });

        // Faces are pushed back slightly so coincident edges win the depth test
        let face_pipeline = create_pipeline(
            device,
            &layout,
            &shader,
            "Cube Faces",
            wgpu::PrimitiveTopology::TriangleList,
            wgpu::DepthBiasState {
                constant: 2,
                slope_scale: 2.0,
                clamp: 0.0,
            },
        );
        let edge_pipeline = create_pipeline(
            device,
            &layout,
            &shader,
            "Cube Edges",
            wgpu::PrimitiveTopology::LineList,
            wgpu::DepthBiasState::default(),
        );

        Self {
            gpu,
            logical: config.viewport(),
            state: RenderState {
                background: Background::Color(config.palette.background),
                faces_visible: true,
                pixel_ratio: config.pixel_ratio,
            },
            palette: config.palette,
            face_pipeline,
            edge_pipeline,
            camera_buffer,
            camera_bind_group,
            targets: None,
        }
    }

    /// Create a renderer on a fresh headless device.
    pub fn new_blocking(config: &CaptureConfig) -> Result<Self, CaptureError> {
        Ok(Self::new(GpuContext::new_blocking()?, config))
    }

    pub fn set_logical_size(&mut self, size: Viewport) {
        self.logical = size;
    }

    fn ensure_targets(&mut self, size: Viewport) {
        if self.targets.as_ref().is_some_and(|t| t.size == size) {
            return;
        }
        tracing::debug!("Creating capture targets {}x{}", size.width, size.height);
        self.targets = Some(RenderTargets::new(self.gpu.device(), size));
    }

    fn read_back(&self, texture: &wgpu::Texture, size: Viewport) -> Result<RgbaImage, CaptureError> {
        let device = self.gpu.device();
        let unpadded = size.width * BYTES_PER_PIXEL;
        let padded = unpadded.div_ceil(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT)
            * wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;

        let staging = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Capture Staging Buffer"),
            size: (padded * size.height) as u64,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Capture Readback Encoder"),
        });
        encoder.copy_texture_to_buffer(
            wgpu::ImageCopyTexture {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::ImageCopyBuffer {
                buffer: &staging,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(padded),
                    rows_per_image: Some(size.height),
                },
            },
            wgpu::Extent3d {
                width: size.width,
                height: size.height,
                depth_or_array_layers: 1,
            },
        );
        self.gpu.queue().submit(std::iter::once(encoder.finish()));

        let slice = staging.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        device.poll(wgpu::Maintain::Wait);
        rx.recv()
            .map_err(|e| CaptureError::Readback(e.to_string()))?
            .map_err(|e| CaptureError::Readback(e.to_string()))?;

        let data = slice.get_mapped_range();
        let mut pixels = Vec::with_capacity((unpadded * size.height) as usize);
        for row in data.chunks(padded as usize) {
            pixels.extend_from_slice(&row[..unpadded as usize]);
        }
        drop(data);
        staging.unmap();

        RgbaImage::from_raw(size.width, size.height, pixels)
            .ok_or_else(|| CaptureError::Readback("pixel buffer size mismatch".to_string()))
    }
}

impl CaptureSurface for OffscreenRenderer {
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
        let state = self.state;
        self.ensure_targets(size);

        let device = self.gpu.device();
        let queue = self.gpu.queue();
        queue.write_buffer(
            &self.camera_buffer,
            0,
            bytemuck::cast_slice(&[CameraUniform::from_projector(&projector)]),
        );

        let faces = face_vertices(pose, &self.palette);
        let edges = edge_vertices(pose, &self.palette);
        let face_buffer = vertex_buffer(device, "Cube Face Vertices", &faces);
        let edge_buffer = vertex_buffer(device, "Cube Edge Vertices", &edges);

        let Some(targets) = self.targets.as_ref() else {
            return Err(CaptureError::Readback("render targets missing".to_string()));
        };
        let color_view = targets.color.create_view(&wgpu::TextureViewDescriptor::default());
        let [r, g, b, a] = state.background.rgba().map(f64::from);

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Capture Encoder"),
        });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Capture Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &color_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color { r, g, b, a }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &targets.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Discard,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            pass.set_bind_group(0, &self.camera_bind_group, &[]);
            if state.faces_visible {
                pass.set_pipeline(&self.face_pipeline);
                pass.set_vertex_buffer(0, face_buffer.slice(..));
                pass.draw(0..faces.len() as u32, 0..1);
            }
            pass.set_pipeline(&self.edge_pipeline);
            pass.set_vertex_buffer(0, edge_buffer.slice(..));
            pass.draw(0..edges.len() as u32, 0..1);
        }
        queue.submit(std::iter::once(encoder.finish()));

        self.read_back(&targets.color, size)
    }
}

fn vertex_buffer(device: &wgpu::Device, label: &str, vertices: &[CubeVertex]) -> wgpu::Buffer {
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(label),
        contents: bytemuck::cast_slice(vertices),
        usage: wgpu::BufferUsages::VERTEX,
    })
}

fn create_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    label: &str,
    topology: wgpu::PrimitiveTopology,
    bias: wgpu::DepthBiasState,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_main"),
            compilation_options: Default::default(),
            buffers: &[CubeVertex::layout()],
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some("fs_main"),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format: COLOR_FORMAT,
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        primitive: wgpu::PrimitiveState {
            topology,
            cull_mode: None,
            ..Default::default()
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::LessEqual,
            stencil: wgpu::StencilState::default(),
            bias,
        }),
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pt_core::PerspectiveMode;

    #[test]
    #[ignore = "requires GPU"]
    fn test_render_frame_size_follows_pixel_ratio() {
        let config = CaptureConfig {
            viewport_width: 200,
            viewport_height: 150,
            ..Default::default()
        };
        let Ok(mut renderer) = OffscreenRenderer::new_blocking(&config) else {
            return;
        };
        renderer.set_render_state(RenderState {
            pixel_ratio: 2.0,
            ..renderer.render_state()
        });
        let pose = CubePose::preset(PerspectiveMode::TwoPoint);
        let camera = CameraConfig::preset(PerspectiveMode::TwoPoint);
        let frame = renderer.render_frame(&pose, &camera).unwrap();
        assert_eq!(frame.dimensions(), (400, 300));
        // Corner pixel is background
        assert_eq!(frame.get_pixel(0, 0).0, [255, 255, 255, 255]);
    }
}
