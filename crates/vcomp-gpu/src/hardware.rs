//! wgpu execution of recorded passes.
//!
//! Every draw is a six-vertex quad sampled with `textureLoad`, so results
//! match the software rasterizer texel for texel. The blend state lives in
//! the pipeline; the blend constant and scissor are set per draw.

use crate::blend::BlendState;
use crate::command::{DrawCommand, LoadAction, RenderPass};
use crate::context::GpuConfig;
use crate::error::{GpuError, Result};
use crate::pipeline::RenderPipelineDescriptor;
use bytemuck::{Pod, Zeroable};
use crossbeam_channel::bounded;
use parking_lot::Mutex;
use tracing::{debug, error, info};
use vcomp_core::{ImageBuffer, PixelFormat, PixelRect};
use wgpu::util::DeviceExt;

const SHADER: &str = include_str!("shaders/composite.wgsl");

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct DrawUniforms {
    dest: [f32; 4],
    canvas: [f32; 2],
    source: [f32; 2],
}

pub(crate) struct WgpuDevice {
    adapter_info: wgpu::AdapterInfo,
    device: wgpu::Device,
    queue: wgpu::Queue,
    shader: wgpu::ShaderModule,
    bind_group_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    max_texture_dimension: u32,
    // wgpu keeps one error scope stack per device
    scopes: Mutex<()>,
}

impl WgpuDevice {
    /// Request an adapter and device (blocking).
    pub(crate) fn new(config: &GpuConfig) -> Result<Self> {
        pollster::block_on(Self::request(config))
    }

    async fn request(config: &GpuConfig) -> Result<Self> {
        #[cfg(target_os = "macos")]
        let backends = wgpu::Backends::METAL;
        #[cfg(not(target_os = "macos"))]
        let backends = wgpu::Backends::VULKAN | wgpu::Backends::DX12 | wgpu::Backends::GL;

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends,
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: config.force_fallback_adapter,
            })
            .await
            .ok_or(GpuError::NoAdapter)?;

        let adapter_info = adapter.get_info();
        info!(adapter = %adapter_info.name, backend = ?adapter_info.backend, "using GPU adapter");

        let max_texture_dimension = config
            .max_texture_dimension
            .min(adapter.limits().max_texture_dimension_2d);
        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some(&config.label),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits {
                        max_texture_dimension_2d: max_texture_dimension,
                        ..wgpu::Limits::downlevel_defaults()
                    },
                    memory_hints: wgpu::MemoryHints::Performance,
                },
                None,
            )
            .await
            .map_err(|e| GpuError::DeviceRequest(e.to_string()))?;

        device.on_uncaptured_error(Box::new(|err: wgpu::Error| {
            error!(%err, "uncaptured wgpu error");
        }));

        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("vcomp composite shader"),
            source: wgpu::ShaderSource::Wgsl(SHADER.into()),
        });
        if let Some(err) = device.pop_error_scope().await {
            return Err(GpuError::PipelineCreation {
                label: "composite shader".to_string(),
                reason: err.to_string(),
            });
        }

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("vcomp draw bind group layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: false },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("vcomp draw pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        Ok(Self {
            adapter_info,
            device,
            queue,
            shader,
            bind_group_layout,
            pipeline_layout,
            max_texture_dimension,
            scopes: Mutex::new(()),
        })
    }

    pub(crate) fn adapter_name(&self) -> &str {
        &self.adapter_info.name
    }

    pub(crate) fn max_texture_dimension(&self) -> u32 {
        self.max_texture_dimension
    }

    /// Build the render pipeline for `desc`, surfacing validation errors.
    pub(crate) fn create_pipeline(
        &self,
        desc: &RenderPipelineDescriptor,
    ) -> Result<wgpu::RenderPipeline> {
        let _scope = self.scopes.lock();
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let pipeline = self
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(&desc.label),
                layout: Some(&self.pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &self.shader,
                    entry_point: Some("vs_main"),
                    compilation_options: Default::default(),
                    buffers: &[],
                },
                fragment: Some(wgpu::FragmentState {
                    module: &self.shader,
                    entry_point: Some("fs_main"),
                    compilation_options: Default::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: texture_format(desc.format),
                        blend: Some(blend_state(desc.blend)),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                primitive: wgpu::PrimitiveState::default(),
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            });
        match pollster::block_on(self.device.pop_error_scope()) {
            Some(err) => Err(GpuError::PipelineCreation {
                label: desc.label.clone(),
                reason: err.to_string(),
            }),
            None => Ok(pipeline),
        }
    }

    /// Run `passes` against `target` and read the result back into it.
    ///
    /// Returns once the queue reports the submitted work done and the
    /// readback is mapped.
    pub(crate) fn execute(&self, target: &mut ImageBuffer, passes: &[RenderPass]) -> Result<()> {
        if passes.is_empty() {
            return Ok(());
        }
        let _scope = self.scopes.lock();
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let result = self.encode_and_submit(target, passes);
        let validation = pollster::block_on(self.device.pop_error_scope());
        match (result, validation) {
            (Err(err), _) => Err(err),
            (Ok(_), Some(err)) => Err(GpuError::Execution {
                label: "render".to_string(),
                reason: err.to_string(),
            }),
            (Ok(()), None) => Ok(()),
        }
    }

    fn encode_and_submit(&self, target: &mut ImageBuffer, passes: &[RenderPass]) -> Result<()> {
        let (width, height) = (target.width(), target.height());
        let format = target.format();
        let target_texture = self.upload_texture(
            "vcomp target",
            target,
            wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            passes[0].load_action() == LoadAction::Load,
        );
        let view = target_texture.create_view(&wgpu::TextureViewDescriptor::default());
        let bounds = PixelRect::full(width, height);

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("vcomp compose"),
            });

        for pass in passes {
            let draws = pass
                .draws()
                .iter()
                .filter_map(|draw| draw.clip_rect(bounds).map(|clip| (draw, clip)))
                .map(|(draw, clip)| self.prepare_draw(draw, clip, bounds))
                .collect::<Result<Vec<_>>>()?;

            let load = match pass.load_action() {
                LoadAction::Clear(color) => wgpu::LoadOp::Clear(clear_color(color, format)),
                LoadAction::Load => wgpu::LoadOp::Load,
            };
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("vcomp pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            for draw in &draws {
                let c = draw.blend_constant as f64;
                render_pass.set_pipeline(draw.pipeline);
                render_pass.set_bind_group(0, &draw.bind_group, &[]);
                render_pass.set_blend_constant(wgpu::Color { r: c, g: c, b: c, a: c });
                render_pass.set_scissor_rect(draw.clip.x, draw.clip.y, draw.clip.width, draw.clip.height);
                render_pass.draw(0..6, 0..1);
            }
        }

        let row_bytes = width * format.bytes_per_pixel() as u32;
        let padded_row = row_bytes.div_ceil(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT)
            * wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let readback = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("vcomp readback"),
            size: padded_row as u64 * height as u64,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        encoder.copy_texture_to_buffer(
            target_texture.as_image_copy(),
            wgpu::ImageCopyBuffer {
                buffer: &readback,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_row),
                    rows_per_image: Some(height),
                },
            },
            extent(width, height),
        );

        self.queue.submit(Some(encoder.finish()));
        let (done_tx, done_rx) = bounded(1);
        self.queue.on_submitted_work_done(move || {
            let _ = done_tx.send(());
        });
        let slice = readback.slice(..);
        let (map_tx, map_rx) = bounded(1);
        slice.map_async(wgpu::MapMode::Read, move |mapped| {
            let _ = map_tx.send(mapped);
        });
        let _ = self.device.poll(wgpu::Maintain::Wait);

        let failed = |reason: String| GpuError::Execution {
            label: "readback".to_string(),
            reason,
        };
        done_rx
            .recv()
            .map_err(|_| failed("submitted work never completed".to_string()))?;
        map_rx
            .recv()
            .map_err(|_| failed("map callback dropped".to_string()))?
            .map_err(|e| failed(e.to_string()))?;

        {
            let data = slice.get_mapped_range();
            for (y, row) in data.chunks(padded_row as usize).take(height as usize).enumerate() {
                let pixels: &[[u8; 4]] = bytemuck::cast_slice(&row[..row_bytes as usize]);
                target.row_pixels_mut(y as u32).copy_from_slice(pixels);
            }
        }
        readback.unmap();
        debug!(width, height, passes = passes.len(), "readback complete");
        Ok(())
    }

    fn prepare_draw<'a>(
        &self,
        draw: &'a DrawCommand,
        clip: PixelRect,
        bounds: PixelRect,
    ) -> Result<PreparedDraw<'a>> {
        let pipeline = draw.pipeline().raw().ok_or_else(|| GpuError::PipelineCreation {
            label: draw.pipeline().label().to_string(),
            reason: "pipeline was not built for this device".to_string(),
        })?;
        let texture = draw.texture();
        let source = self.upload_texture(
            "vcomp source",
            texture,
            wgpu::TextureUsages::TEXTURE_BINDING,
            true,
        );
        let dest = draw.dest();
        let uniforms = DrawUniforms {
            dest: [dest.x as f32, dest.y as f32, dest.width as f32, dest.height as f32],
            canvas: [bounds.width as f32, bounds.height as f32],
            source: [texture.width() as f32, texture.height() as f32],
        };
        let uniform_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("vcomp draw uniforms"),
                contents: bytemuck::bytes_of(&uniforms),
                usage: wgpu::BufferUsages::UNIFORM,
            });
        let view = source.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("vcomp draw bind group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: uniform_buffer.as_entire_binding(),
                },
            ],
        });
        Ok(PreparedDraw {
            pipeline,
            bind_group,
            blend_constant: draw.blend_constant().clamp(0.0, 1.0),
            clip,
        })
    }

    fn upload_texture(
        &self,
        label: &str,
        image: &ImageBuffer,
        usage: wgpu::TextureUsages,
        write_contents: bool,
    ) -> wgpu::Texture {
        let size = extent(image.width(), image.height());
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: texture_format(image.format()),
            usage: usage | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        if write_contents {
            self.queue.write_texture(
                texture.as_image_copy(),
                image.as_bytes(),
                wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(image.stride() as u32),
                    rows_per_image: Some(image.height()),
                },
                size,
            );
        }
        texture
    }
}

impl std::fmt::Debug for WgpuDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WgpuDevice")
            .field("adapter", &self.adapter_info.name)
            .field("backend", &self.adapter_info.backend)
            .field("max_texture_dimension", &self.max_texture_dimension)
            .finish()
    }
}

struct PreparedDraw<'a> {
    pipeline: &'a wgpu::RenderPipeline,
    bind_group: wgpu::BindGroup,
    blend_constant: f32,
    clip: PixelRect,
}

fn extent(width: u32, height: u32) -> wgpu::Extent3d {
    wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    }
}

fn texture_format(format: PixelFormat) -> wgpu::TextureFormat {
    match format {
        PixelFormat::Rgba8 => wgpu::TextureFormat::Rgba8Unorm,
        PixelFormat::Bgra8 => wgpu::TextureFormat::Bgra8Unorm,
    }
}

fn blend_state(blend: BlendState) -> wgpu::BlendState {
    match blend {
        BlendState::Replace => wgpu::BlendState::REPLACE,
        BlendState::ConstantAlpha => {
            let component = wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::Constant,
                dst_factor: wgpu::BlendFactor::OneMinusConstant,
                operation: wgpu::BlendOperation::Add,
            };
            wgpu::BlendState {
                color: component,
                alpha: component,
            }
        }
        BlendState::SourceOver => wgpu::BlendState::ALPHA_BLENDING,
    }
}

/// Clear colors are given in memory order; wgpu wants them as RGBA.
fn clear_color(color: [u8; 4], format: PixelFormat) -> wgpu::Color {
    let [r, g, b, a] = match format {
        PixelFormat::Rgba8 => color,
        PixelFormat::Bgra8 => [color[2], color[1], color[0], color[3]],
    };
    let unorm = |v: u8| v as f64 / 255.0;
    wgpu::Color {
        r: unorm(r),
        g: unorm(g),
        b: unorm(b),
        a: unorm(a),
    }
}
