use anyhow::{Context, Result};
use wgpu::util::DeviceExt;
use winit::window::Window;

use super::{BufferKind, Built, FrameCommand, RenderBackend, ShaderStage};
use crate::config::GpuConfig;

/// wgpu implementation of [RenderBackend].
///
/// Shader stages are `ShaderModule`s and the linked program is a
/// `RenderPipeline`. Compile and link status come from a validation error
/// scope pushed around the creating call.
pub struct Gpu {
    window_surface: wgpu::Surface,
    device: wgpu::Device,
    command_queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
}

/// A vertex buffer layout fed from buffer slot [GpuBinding::SLOT].
///
/// wgpu has no standalone vertex array object: the layout is baked into the
/// pipeline at link time and the slot is bound per pass.
pub struct GpuBinding {
    layout: wgpu::VertexBufferLayout<'static>,
}

impl GpuBinding {
    /// The quad's only vertex buffer is always bound to slot 0.
    pub const SLOT: u32 = 0;

    fn new(layout: &wgpu::VertexBufferLayout<'static>) -> Self {
        Self {
            layout: layout.clone(),
        }
    }
}

impl Gpu {
    /// Creates the surface, device and queue for `window`.
    ///
    /// --SAFETY--
    /// The surface needs to live as long as the window that created it. The
    /// application declares its renderer before its window, so the surface is
    /// dropped first.
    pub async fn new(window: &Window, config: &GpuConfig) -> Result<Gpu> {
        let size = window.inner_size();

        let wgpu_instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let window_surface = unsafe { wgpu_instance.create_surface(window) }
            .context("failed to create window surface")?;

        let adapter = wgpu_instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: config.power_preference,
                compatible_surface: Some(&window_surface),
                force_fallback_adapter: false,
            })
            .await
            .context("no GPU adapter compatible with the window surface")?;

        log::debug!("using adapter {:?}", adapter.get_info());

        let (device, command_queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("main device"),
                    features: wgpu::Features::empty(),
                    limits: wgpu::Limits::default(),
                },
                None,
            )
            .await
            .context("failed to create GPU device")?;

        // The default handler panics. Shader and pipeline failures are
        // reported through error scopes already; anything that escapes one is
        // logged and rendering carries on.
        device.on_uncaptured_error(Box::new(|err: wgpu::Error| {
            log::error!("uncaptured GPU error: {err}");
        }));

        let surface_caps = window_surface.get_capabilities(&adapter);
        let format = choose_surface_format(&surface_caps, config.prefer_srgb)
            .context("window surface reports no supported formats")?;
        let present_mode = if surface_caps.present_modes.contains(&config.present_mode) {
            config.present_mode
        } else {
            surface_caps
                .present_modes
                .first()
                .copied()
                .unwrap_or(wgpu::PresentMode::Fifo)
        };

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode,
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
        };
        window_surface.configure(&device, &config);

        log::debug!(
            "surface configured: {:?} {}x{} {:?}",
            config.format,
            config.width,
            config.height,
            config.present_mode
        );

        Ok(Gpu {
            window_surface,
            device,
            command_queue,
            config,
        })
    }

    /// Runs `f` inside a validation error scope and returns its output along
    /// with the error the scope caught, if any.
    fn validated<T>(&self, f: impl FnOnce(&wgpu::Device) -> T) -> (T, Option<wgpu::Error>) {
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let out = f(&self.device);
        let error = pollster::block_on(self.device.pop_error_scope());
        (out, error)
    }
}

fn choose_surface_format(
    caps: &wgpu::SurfaceCapabilities,
    prefer_srgb: bool,
) -> Option<wgpu::TextureFormat> {
    caps.formats
        .iter()
        .copied()
        .find(|f| f.is_srgb() == prefer_srgb)
        .or_else(|| caps.formats.first().copied())
}

impl RenderBackend for Gpu {
    type Buffer = wgpu::Buffer;
    type Binding = GpuBinding;
    type Shader = wgpu::ShaderModule;
    type Program = wgpu::RenderPipeline;
    type FrameError = wgpu::SurfaceError;

    fn create_binding(&mut self, layout: &wgpu::VertexBufferLayout<'static>) -> GpuBinding {
        GpuBinding::new(layout)
    }

    fn create_buffer(&mut self, kind: BufferKind, label: &str, contents: &[u8]) -> wgpu::Buffer {
        let usage = match kind {
            BufferKind::Vertex => wgpu::BufferUsages::VERTEX,
            BufferKind::Index => wgpu::BufferUsages::INDEX,
        };

        self.device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents,
                usage,
            })
    }

    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> Built<wgpu::ShaderModule> {
        let label = match stage {
            ShaderStage::Vertex => "Quad Vertex Shader",
            ShaderStage::Fragment => "Quad Fragment Shader",
        };

        let (module, error) = self.validated(|device| {
            device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(label),
                source: wgpu::ShaderSource::Wgsl(source.into()),
            })
        });

        match error {
            None => Built::ok(module),
            Some(err) => Built::failed(module, err.to_string()),
        }
    }

    fn link_program(
        &mut self,
        vertex: wgpu::ShaderModule,
        fragment: wgpu::ShaderModule,
        binding: &GpuBinding,
    ) -> Built<wgpu::RenderPipeline> {
        let format = self.config.format;

        let (pipeline, error) = self.validated(|device| {
            let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Quad Pipeline Layout"),
                bind_group_layouts: &[],
                push_constant_ranges: &[],
            });

            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("Quad Pipeline"),
                layout: Some(&layout),
                vertex: wgpu::VertexState {
                    module: &vertex,
                    entry_point: ShaderStage::Vertex.entry_point(),
                    buffers: std::slice::from_ref(&binding.layout),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &fragment,
                    entry_point: ShaderStage::Fragment.entry_point(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format,
                        blend: Some(wgpu::BlendState::REPLACE),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    // The quad's triangles wind clockwise; nothing is culled.
                    cull_mode: None,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState {
                    count: 1,
                    mask: !0,
                    alpha_to_coverage_enabled: false,
                },
                multiview: None,
            })
        });

        // The pipeline keeps what it needs from the modules.
        drop(vertex);
        drop(fragment);

        match error {
            None => Built::ok(pipeline),
            Some(err) => Built::failed(pipeline, err.to_string()),
        }
    }

    fn resize_surface(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.config.width = width;
            self.config.height = height;
            self.window_surface.configure(&self.device, &self.config);
        }
    }

    fn submit_frame(&mut self, commands: &[FrameCommand<'_, Self>]) -> Result<(), wgpu::SurfaceError> {
        // Waits for the surface to hand out the next texture.
        let output = self.window_surface.get_current_texture()?;

        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        // A clear is the load op of the pass, so it has to be known before the
        // pass begins.
        let load = commands
            .iter()
            .find_map(|command| match command {
                FrameCommand::Clear(color) => Some(wgpu::LoadOp::Clear(*color)),
                _ => None,
            })
            .unwrap_or(wgpu::LoadOp::Load);

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            // Index buffer of the live binding.
            let mut bound_indices: Option<&wgpu::Buffer> = None;

            for command in commands {
                match command {
                    FrameCommand::Clear(_) => {}
                    FrameCommand::SetViewport(viewport) => render_pass.set_viewport(
                        viewport.x as f32,
                        viewport.y as f32,
                        viewport.width as f32,
                        viewport.height as f32,
                        0.0,
                        1.0,
                    ),
                    FrameCommand::UseProgram(pipeline) => render_pass.set_pipeline(pipeline),
                    FrameCommand::BindAttributes {
                        binding,
                        vertices,
                        indices,
                    } => {
                        render_pass.set_vertex_buffer(GpuBinding::SLOT, vertices.slice(..));
                        bound_indices = Some(*indices);
                    }
                    FrameCommand::DrawIndexed { count, format } => match bound_indices {
                        Some(indices) => {
                            render_pass.set_index_buffer(indices.slice(..), *format);
                            render_pass.draw_indexed(0..*count, 0, 0..1);
                        }
                        None => log::warn!("indexed draw issued without an attribute binding"),
                    },
                    FrameCommand::UnbindAttributes => bound_indices = None,
                }
            }
        }

        // submit will accept anything that implements IntoIter
        self.command_queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(())
    }
}
