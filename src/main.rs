mod backend;
mod config;
mod geometry;
mod input;
mod logging;
mod renderer;
mod shader;

use std::process::ExitCode;

use anyhow::{Context, Result};
use winit::{
    dpi::PhysicalSize,
    event::*,
    event_loop::{ControlFlow, EventLoop},
    window::{Window, WindowBuilder},
};

use backend::{gpu::Gpu, Viewport};
use config::{GpuConfig, WindowConfig};
use geometry::Geometry;
use input::CloseRequest;
use renderer::RenderCore;
use shader::ShaderSources;

struct Application {
    // Declared before `window` so the surface is dropped first.
    renderer: RenderCore<Gpu>,
    window: Window,
    size: PhysicalSize<u32>,
    close: CloseRequest,
    failure: Option<anyhow::Error>,
}

impl Application {
    // Create new application
    async fn new(
        event_loop: &EventLoop<()>,
        window_config: &WindowConfig,
        gpu_config: &GpuConfig,
    ) -> Result<Application> {
        let window = WindowBuilder::new()
            .with_title(&window_config.title)
            .with_resizable(window_config.resizable)
            .with_inner_size(window_config.initial_size)
            .build(event_loop)
            .context("failed to create window")?;

        let size = window.inner_size();

        let gpu = Gpu::new(&window, gpu_config).await?;
        let renderer = RenderCore::init_resources(
            gpu,
            &Geometry::quad(),
            &ShaderSources::quad(),
            Viewport::sized(size.width, size.height),
        );
        if !renderer.build_report().is_ok() {
            log::warn!("continuing with a shader program that failed to build; output is undefined");
        }

        Ok(Application {
            renderer,
            window,
            size,
            close: CloseRequest::default(),
            failure: None,
        })
    }

    /// Runs the event loop until close is requested, then releases the GPU
    /// resources before the window goes away.
    fn run(mut self, event_loop: EventLoop<()>) -> Result<()> {
        event_loop.set_control_flow(ControlFlow::Poll);
        event_loop
            .run(|event, elwt| {
                match event {
                    Event::WindowEvent {
                        window_id,
                        ref event,
                    } if window_id == self.window.id() => match event {
                        WindowEvent::CloseRequested => self.close.window_closed(),
                        WindowEvent::KeyboardInput {
                            event:
                                KeyEvent {
                                    logical_key, state, ..
                                },
                            ..
                        } => self.close.process_key(logical_key, *state),
                        WindowEvent::Resized(physical_size) => self.resize(*physical_size),
                        WindowEvent::RedrawRequested => self.redraw(),
                        _ => (),
                    },
                    Event::AboutToWait => self.window.request_redraw(),
                    _ => (),
                }

                if !self.close.keep_running() || self.failure.is_some() {
                    elwt.exit();
                }
            })
            .context("event loop terminated with an error")?;

        let Application {
            renderer,
            window,
            failure,
            ..
        } = self;
        let gpu = renderer.release_resources();
        drop(gpu);
        drop(window);

        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn resize(&mut self, new_size: PhysicalSize<u32>) {
        self.size = new_size;
        self.renderer.resize(new_size.width, new_size.height);
        self.window.request_redraw();
    }

    fn redraw(&mut self) {
        let now = instant::Instant::now();

        match self.renderer.render_frame() {
            Ok(()) => {}
            // Reconfigure the surface if lost
            Err(wgpu::SurfaceError::Lost) => self.resize(self.size),
            Err(wgpu::SurfaceError::OutOfMemory) => {
                self.failure = Some(anyhow::anyhow!("GPU ran out of memory while rendering"));
            }
            // Outdated and Timeout resolve by the next frame
            Err(err) => log::warn!("skipping frame: {err}"),
        }

        log::trace!("frame took {:.2}ms", now.elapsed().as_secs_f64() * 1000.0);
    }
}

fn run() -> Result<()> {
    let event_loop = EventLoop::new().context("failed to create event loop")?;
    let application = pollster::block_on(Application::new(
        &event_loop,
        &WindowConfig::default(),
        &GpuConfig::default(),
    ))?;
    application.run(event_loop)
}

fn main() -> ExitCode {
    logging::init_logging();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}
