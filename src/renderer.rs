use crate::backend::{BufferKind, FrameCommand, RenderBackend, Viewport};
use crate::geometry::{Geometry, Vertex};
use crate::shader::{self, BuildReport, ShaderSources};

/// Background color the color target is cleared to every frame.
pub const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.2,
    g: 0.3,
    b: 0.3,
    a: 1.0,
};

/// Buffers holding the uploaded geometry and the binding that reads them.
struct GeometryBuffers<B: RenderBackend> {
    binding: B::Binding,
    vertices: B::Buffer,
    indices: B::Buffer,
    index_count: u32,
}

/// Uploads `geometry` once and describes slot 0 for the shader.
fn upload_geometry<B: RenderBackend>(backend: &mut B, geometry: &Geometry) -> GeometryBuffers<B> {
    let binding = backend.create_binding(&Vertex::desc());
    let vertices = backend.create_buffer(BufferKind::Vertex, "Quad VB", geometry.vertex_bytes());
    let indices = backend.create_buffer(BufferKind::Index, "Quad IB", geometry.index_bytes());

    log::debug!(
        "uploaded {} vertices and {} indices",
        geometry.vertices.len(),
        geometry.indices.len()
    );

    GeometryBuffers {
        binding,
        vertices,
        indices,
        index_count: geometry.index_count(),
    }
}

/// Owns every GPU resource of the quad and draws it.
///
/// Resources are created once by [RenderCore::init_resources] and released
/// when the core is dropped or handed to [RenderCore::release_resources].
pub struct RenderCore<B: RenderBackend> {
    // Declared ahead of `backend`: resources go before the device that made them.
    program: B::Program,
    buffers: GeometryBuffers<B>,
    report: BuildReport,
    viewport: Viewport,
    backend: B,
}

impl<B: RenderBackend> RenderCore<B> {
    /// Uploads the geometry and builds the shader program.
    ///
    /// Shader failures are logged and kept in [RenderCore::build_report]; the
    /// core is created either way.
    pub fn init_resources(
        mut backend: B,
        geometry: &Geometry,
        sources: &ShaderSources<'_>,
        viewport: Viewport,
    ) -> Self {
        let buffers = upload_geometry(&mut backend, geometry);
        let (program, report) = shader::build_program(&mut backend, sources, &buffers.binding);

        Self {
            program,
            buffers,
            report,
            viewport,
            backend,
        }
    }

    /// Matches the viewport and the surface to a new framebuffer size.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.viewport = Viewport::sized(width, height);
        self.backend.resize_surface(width, height);
        log::debug!("viewport set to {width}x{height}");
    }

    /// Clears and draws the quad. Nothing is submitted while the viewport is
    /// empty (a minimized window).
    pub fn render_frame(&mut self) -> Result<(), B::FrameError> {
        if self.viewport.is_empty() {
            return Ok(());
        }

        let buffers = &self.buffers;
        let commands = [
            FrameCommand::Clear(CLEAR_COLOR),
            FrameCommand::SetViewport(self.viewport),
            FrameCommand::UseProgram(&self.program),
            FrameCommand::BindAttributes {
                binding: &buffers.binding,
                vertices: &buffers.vertices,
                indices: &buffers.indices,
            },
            FrameCommand::DrawIndexed {
                count: buffers.index_count,
                format: wgpu::IndexFormat::Uint32,
            },
            FrameCommand::UnbindAttributes,
        ];

        self.backend.submit_frame(&commands)
    }

    /// Releases every GPU resource and gives the backend back.
    pub fn release_resources(self) -> B {
        let Self {
            program,
            buffers,
            backend,
            ..
        } = self;

        drop(program);
        drop(buffers);
        log::debug!("render resources released");

        backend
    }

    #[cfg(test)]
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn build_report(&self) -> &BuildReport {
        &self.report
    }

    #[cfg(test)]
    pub fn backend(&self) -> &B {
        &self.backend
    }
}
