use std::collections::HashMap;
use std::path::{Path, PathBuf};

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec4};
use towerdef_render::{
    Batcher, Camera, DEFAULT_CLEAR_COLOR, RenderContext, RenderError, RenderQueue, RenderStats,
    SpriteDrawRequest, TextureHandle,
};
use wgpu::util::DeviceExt;

use crate::shaders;
use crate::texture::GpuTexture;

const INITIAL_INSTANCE_CAPACITY: usize = 1024;
const VERTICES_PER_SPRITE: u32 = 6;

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct Uniforms {
    view_proj: [[f32; 4]; 4],
}

/// Per-instance vertex data, one per sprite.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct SpriteInstance {
    pub position: [f32; 2],
    pub rotation: f32,
    pub uv_min: [f32; 2],
    pub uv_max: [f32; 2],
}

impl From<&SpriteDrawRequest> for SpriteInstance {
    fn from(sprite: &SpriteDrawRequest) -> Self {
        Self {
            position: sprite.position.to_array(),
            rotation: sprite.rotation,
            uv_min: sprite.uv_min.to_array(),
            uv_max: sprite.uv_max.to_array(),
        }
    }
}

/// Capacity to allocate when `needed` instances no longer fit in `current`.
pub fn grown_capacity(current: usize, needed: usize) -> usize {
    if needed <= current {
        current
    } else {
        needed.next_power_of_two().max(INITIAL_INSTANCE_CAPACITY)
    }
}

fn to_wgpu_color(c: Vec4) -> wgpu::Color {
    wgpu::Color {
        r: c.x as f64,
        g: c.y as f64,
        b: c.z as f64,
        a: c.w as f64,
    }
}

struct Frame {
    texture: wgpu::SurfaceTexture,
    view: wgpu::TextureView,
}

/// Borrowed GPU handles for drawing an overlay (e.g. egui) into the
/// current frame before it is presented.
pub struct OverlayTarget<'a> {
    pub device: &'a wgpu::Device,
    pub queue: &'a wgpu::Queue,
    pub view: &'a wgpu::TextureView,
    pub size: [u32; 2],
}

/// Sprite renderer drawing into a window surface.
///
/// The surface texture is acquired lazily on the first submit of a frame and
/// released by `present`. A clear requested with `clear` is folded into the
/// first pass of the frame.
pub struct WgpuRenderContext {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    texture_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    instance_buffer: wgpu::Buffer,
    instance_capacity: usize,
    instances: Vec<SpriteInstance>,
    textures: Vec<GpuTexture>,
    by_path: HashMap<PathBuf, TextureHandle>,
    batcher: Batcher,
    clear_color: Vec4,
    pending_clear: bool,
    frame: Option<Frame>,
    backend: String,
}

impl WgpuRenderContext {
    /// Pick an adapter for `surface`, create the device and configure the
    /// surface at `width` x `height`.
    pub fn new(
        instance: &wgpu::Instance,
        surface: wgpu::Surface<'static>,
        width: u32,
        height: u32,
    ) -> Result<Self, RenderError> {
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .ok_or_else(|| RenderError::Backend("no compatible GPU adapter".into()))?;

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("towerdef_device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
            },
            None,
        ))
        .map_err(|e| RenderError::Backend(e.to_string()))?;

        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or(caps.formats.first())
            .copied()
            .ok_or_else(|| RenderError::Backend("surface reports no formats".into()))?;
        let alpha_mode = caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: width.max(1),
            height: height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("sprite_uniforms"),
            contents: bytemuck::bytes_of(&Uniforms {
                view_proj: Mat4::IDENTITY.to_cols_array_2d(),
            }),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("sprite_uniform_layout"),
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

        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("sprite_uniform_bind_group"),
            layout: &uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let texture_layout = GpuTexture::bind_group_layout(&device);
        let sampler = GpuTexture::create_sampler(&device);

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("sprite_pipeline_layout"),
            bind_group_layouts: &[&uniform_layout, &texture_layout],
            push_constant_ranges: &[],
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("sprite_shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::SPRITE_SHADER.into()),
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("sprite_pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_sprite"),
                compilation_options: Default::default(),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<SpriteInstance>() as u64,
                    step_mode: wgpu::VertexStepMode::Instance,
                    attributes: &wgpu::vertex_attr_array![
                        0 => Float32x2,
                        1 => Float32,
                        2 => Float32x2,
                        3 => Float32x2,
                    ],
                }],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_sprite"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: Default::default(),
            multiview: None,
            cache: None,
        });

        let instance_buffer = Self::create_instance_buffer(&device, INITIAL_INSTANCE_CAPACITY);
        let backend = adapter.get_info().backend.to_str().to_string();
        tracing::info!(backend = %backend, ?format, "wgpu render context ready");

        Ok(Self {
            surface,
            device,
            queue,
            config,
            pipeline,
            uniform_buffer,
            uniform_bind_group,
            texture_layout,
            sampler,
            instance_buffer,
            instance_capacity: INITIAL_INSTANCE_CAPACITY,
            instances: Vec::new(),
            textures: Vec::new(),
            by_path: HashMap::new(),
            batcher: Batcher::new(),
            clear_color: DEFAULT_CLEAR_COLOR,
            pending_clear: false,
            frame: None,
            backend,
        })
    }

    pub fn backend(&self) -> &str {
        &self.backend
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    pub fn size(&self) -> [u32; 2] {
        [self.config.width, self.config.height]
    }

    /// Reconfigure the surface after the window changed size.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.frame = None;
        self.config.width = width.max(1);
        self.config.height = height.max(1);
        self.surface.configure(&self.device, &self.config);
    }

    /// Handles for drawing on top of this frame's sprites. Acquires the
    /// frame (and applies a pending clear) if nothing was submitted yet.
    pub fn overlay_target(&mut self) -> Option<OverlayTarget<'_>> {
        self.flush_clear();
        let frame = self.frame.as_ref()?;
        Some(OverlayTarget {
            device: &self.device,
            queue: &self.queue,
            view: &frame.view,
            size: [self.config.width, self.config.height],
        })
    }

    fn create_instance_buffer(device: &wgpu::Device, capacity: usize) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("sprite_instances"),
            size: (capacity * std::mem::size_of::<SpriteInstance>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    /// Make sure a surface texture is held for this frame.
    fn acquire_frame(&mut self) -> bool {
        if self.frame.is_some() {
            return true;
        }
        match self.surface.get_current_texture() {
            Ok(texture) => {
                let view = texture
                    .texture
                    .create_view(&wgpu::TextureViewDescriptor::default());
                self.frame = Some(Frame { texture, view });
                true
            }
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                tracing::warn!("surface lost or outdated, reconfiguring");
                self.surface.configure(&self.device, &self.config);
                false
            }
            Err(e) => {
                tracing::error!("surface error: {e}");
                false
            }
        }
    }

    fn take_load_op(&mut self) -> wgpu::LoadOp<wgpu::Color> {
        if std::mem::take(&mut self.pending_clear) {
            wgpu::LoadOp::Clear(to_wgpu_color(self.clear_color))
        } else {
            wgpu::LoadOp::Load
        }
    }

    /// Run a clear-only pass if a clear is still pending.
    fn flush_clear(&mut self) {
        if !self.acquire_frame() || !self.pending_clear {
            return;
        }
        let load = self.take_load_op();
        let Some(frame) = &self.frame else {
            return;
        };
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("clear_encoder"),
            });
        {
            let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("clear_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &frame.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                ..Default::default()
            });
        }
        self.queue.submit(std::iter::once(encoder.finish()));
    }
}

impl RenderContext for WgpuRenderContext {
    fn load_texture(&mut self, path: &Path) -> Result<TextureHandle, RenderError> {
        if let Some(&handle) = self.by_path.get(path) {
            return Ok(handle);
        }
        let texture = GpuTexture::from_file(
            &self.device,
            &self.queue,
            &self.texture_layout,
            &self.sampler,
            path,
        )?;
        let handle = TextureHandle(self.textures.len() as u32);
        tracing::debug!(
            path = %path.display(),
            handle = handle.0,
            width = texture.width,
            height = texture.height,
            "texture loaded"
        );
        self.textures.push(texture);
        self.by_path.insert(path.to_path_buf(), handle);
        Ok(handle)
    }

    fn texture_sort_key(&self, texture: TextureHandle) -> usize {
        texture.0 as usize
    }

    fn clear(&mut self, color: Vec4) {
        self.clear_color = color;
        self.pending_clear = true;
    }

    fn submit(
        &mut self,
        queue: &mut RenderQueue,
        camera: &dyn Camera,
        sort: bool,
    ) -> RenderStats {
        let mut batcher = std::mem::take(&mut self.batcher);
        let stats = batcher.prepare(queue, |t| self.texture_sort_key(t), sort);
        self.batcher = batcher;
        if queue.is_empty() {
            self.flush_clear();
            return stats;
        }
        if !self.acquire_frame() {
            return stats;
        }

        self.queue.write_buffer(
            &self.uniform_buffer,
            0,
            bytemuck::bytes_of(&Uniforms {
                view_proj: camera.view_projection().to_cols_array_2d(),
            }),
        );

        self.instances.clear();
        self.instances
            .extend(queue.sprites.iter().map(SpriteInstance::from));
        let capacity = grown_capacity(self.instance_capacity, self.instances.len());
        if capacity != self.instance_capacity {
            tracing::debug!(capacity, "growing sprite instance buffer");
            self.instance_buffer = Self::create_instance_buffer(&self.device, capacity);
            self.instance_capacity = capacity;
        }
        self.queue.write_buffer(
            &self.instance_buffer,
            0,
            bytemuck::cast_slice(&self.instances),
        );

        let load = self.take_load_op();
        let Some(frame) = &self.frame else {
            return stats;
        };
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("sprite_encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("sprite_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &frame.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                ..Default::default()
            });

            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &self.uniform_bind_group, &[]);
            pass.set_vertex_buffer(0, self.instance_buffer.slice(..));
            for batch in self.batcher.batches() {
                let Some(texture) = self.textures.get(batch.texture.0 as usize) else {
                    let err = RenderError::UnknownTexture(batch.texture);
                    tracing::warn!("skipping batch: {err}");
                    continue;
                };
                pass.set_bind_group(1, &texture.bind_group, &[]);
                pass.draw(
                    0..VERTICES_PER_SPRITE,
                    batch.range.start as u32..batch.range.end as u32,
                );
            }
        }
        self.queue.submit(std::iter::once(encoder.finish()));
        stats
    }

    fn present(&mut self) {
        self.flush_clear();
        if let Some(frame) = self.frame.take() {
            frame.texture.present();
        }
    }

    fn name(&self) -> &'static str {
        "wgpu"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;

    #[test]
    fn instance_layout_is_packed() {
        assert_eq!(std::mem::size_of::<SpriteInstance>(), 28);
    }

    #[test]
    fn instance_copies_sprite_fields() {
        let sprite = SpriteDrawRequest {
            texture: TextureHandle(2),
            uv_min: Vec2::new(0.25, 0.5),
            uv_max: Vec2::new(0.5, 0.75),
            position: Vec2::new(3.0, -4.0),
            rotation: 1.5,
        };
        let instance = SpriteInstance::from(&sprite);
        assert_eq!(instance.position, [3.0, -4.0]);
        assert_eq!(instance.rotation, 1.5);
        assert_eq!(instance.uv_min, [0.25, 0.5]);
        assert_eq!(instance.uv_max, [0.5, 0.75]);
    }

    #[test]
    fn capacity_grows_to_power_of_two() {
        assert_eq!(grown_capacity(1024, 10), 1024);
        assert_eq!(grown_capacity(1024, 1024), 1024);
        assert_eq!(grown_capacity(1024, 1025), 2048);
        assert_eq!(grown_capacity(2048, 5000), 8192);
    }

    #[test]
    fn clear_color_converts_channels() {
        let c = to_wgpu_color(Vec4::new(0.5, 0.25, 1.0, 1.0));
        assert_eq!((c.r, c.g, c.b, c.a), (0.5, 0.25, 1.0, 1.0));
    }
}
