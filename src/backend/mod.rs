//! The seam between the render core and the graphics API.
//!
//! Handles returned by a [RenderBackend] own the GPU resource behind them:
//! dropping a handle releases it. The render core never calls a "delete"
//! entry point, it just lets its handles go out of scope.

pub mod gpu;
#[cfg(test)]
pub mod mock;

use std::fmt;

/// Which kind of data a buffer holds. Both kinds are uploaded once and never
/// written again by the host.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BufferKind {
    Vertex,
    Index,
}

/// A programmable pipeline stage.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    /// Entry point every shader source for this stage must define.
    pub fn entry_point(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vs_main",
            ShaderStage::Fragment => "fs_main",
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

/// Output rectangle in physical pixels.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Viewport {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    /// Viewport anchored at the origin covering `width` x `height`.
    pub fn sized(width: u32, height: u32) -> Self {
        Self {
            x: 0,
            y: 0,
            width,
            height,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Result of compiling a stage or linking a program.
///
/// The handle is always returned, even when the driver rejected the source:
/// callers report the failure and keep going with whatever the driver gave
/// back.
pub struct Built<T> {
    pub handle: T,
    /// Raw driver log, present only when the build failed.
    pub error_log: Option<String>,
}

impl<T> Built<T> {
    pub fn ok(handle: T) -> Self {
        Self {
            handle,
            error_log: None,
        }
    }

    pub fn failed(handle: T, log: impl Into<String>) -> Self {
        Self {
            handle,
            error_log: Some(log.into()),
        }
    }
}

/// One step of a frame, executed by the backend in slice order.
pub enum FrameCommand<'a, B: RenderBackend + ?Sized> {
    /// Clear the color target.
    Clear(wgpu::Color),
    SetViewport(Viewport),
    /// Make `program` the target of subsequent draws.
    UseProgram(&'a B::Program),
    /// Make the attribute binding and the buffers it reads from live.
    BindAttributes {
        binding: &'a B::Binding,
        vertices: &'a B::Buffer,
        indices: &'a B::Buffer,
    },
    /// Indexed triangle-list draw over the bound buffers.
    DrawIndexed {
        count: u32,
        format: wgpu::IndexFormat,
    },
    /// Reset to "no binding".
    UnbindAttributes,
}

/// GPU operations the render core depends on.
pub trait RenderBackend {
    type Buffer;
    /// Vertex-attribute binding descriptor (a vertex array object in GL terms).
    type Binding;
    /// Transient compiled stage, consumed by [RenderBackend::link_program].
    type Shader;
    type Program;
    type FrameError: fmt::Debug;

    /// Creates the attribute binding described by `layout` and enables its slot.
    fn create_binding(&mut self, layout: &wgpu::VertexBufferLayout<'static>) -> Self::Binding;

    /// Creates a buffer and fills it with `contents` once.
    fn create_buffer(&mut self, kind: BufferKind, label: &str, contents: &[u8]) -> Self::Buffer;

    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> Built<Self::Shader>;

    /// Links both stages into a program. The stage objects are released once
    /// this returns.
    fn link_program(
        &mut self,
        vertex: Self::Shader,
        fragment: Self::Shader,
        binding: &Self::Binding,
    ) -> Built<Self::Program>;

    /// Resizes the presentation surface. Zero sizes are ignored.
    fn resize_surface(&mut self, width: u32, height: u32);

    /// Executes one frame and presents it.
    fn submit_frame(&mut self, commands: &[FrameCommand<'_, Self>]) -> Result<(), Self::FrameError>;
}
