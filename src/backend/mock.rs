//! Recording backend for headless tests.

use std::cell::RefCell;
use std::convert::Infallible;
use std::rc::Rc;

use super::{BufferKind, Built, FrameCommand, RenderBackend, ShaderStage, Viewport};

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Resource {
    Binding,
    Buffer,
    Shader,
    Program,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    CreateBinding,
    CreateBuffer(BufferKind, usize),
    CompileShader(ShaderStage),
    LinkProgram,
    ResizeSurface(u32, u32),
    SubmitFrame,
}

/// A frame command with handles replaced by their ids.
#[derive(Debug, Clone, PartialEq)]
pub enum Recorded {
    Clear(wgpu::Color),
    SetViewport(Viewport),
    UseProgram(u32),
    BindAttributes {
        binding: u32,
        vertices: u32,
        indices: u32,
    },
    DrawIndexed {
        count: u32,
        format: wgpu::IndexFormat,
    },
    UnbindAttributes,
}

/// What to make the backend reject.
#[derive(Debug, Clone)]
pub enum Failure {
    Compile(ShaderStage, String),
    Link(String),
}

#[derive(Debug, Default)]
pub struct Ledger {
    pub calls: Vec<Call>,
    pub frames: Vec<Vec<Recorded>>,
    created: Vec<Resource>,
    released: Vec<Resource>,
}

impl Ledger {
    pub fn created(&self, kind: Resource) -> usize {
        self.created.iter().filter(|&&k| k == kind).count()
    }

    pub fn released(&self, kind: Resource) -> usize {
        self.released.iter().filter(|&&k| k == kind).count()
    }

    /// Creations of resources that outlive initialization.
    pub fn persistent_creations(&self) -> usize {
        self.created.iter().filter(|&&k| k != Resource::Shader).count()
    }

    pub fn live(&self) -> usize {
        self.created.len() - self.released.len()
    }
}

/// Stands in for any GPU object. Dropping it records a release.
#[derive(Debug)]
pub struct Handle {
    pub id: u32,
    pub kind: Resource,
    ledger: Rc<RefCell<Ledger>>,
}

impl Drop for Handle {
    fn drop(&mut self) {
        self.ledger.borrow_mut().released.push(self.kind);
    }
}

#[derive(Debug, Default)]
pub struct MockBackend {
    ledger: Rc<RefCell<Ledger>>,
    failure: Option<Failure>,
    next_id: u32,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(mut self, failure: Failure) -> Self {
        self.failure = Some(failure);
        self
    }

    /// Shared view of everything recorded so far. Stays valid after the
    /// backend is dropped.
    pub fn ledger(&self) -> Rc<RefCell<Ledger>> {
        Rc::clone(&self.ledger)
    }

    fn handle(&mut self, kind: Resource, call: Call) -> Handle {
        self.next_id += 1;
        let mut ledger = self.ledger.borrow_mut();
        ledger.calls.push(call);
        ledger.created.push(kind);
        Handle {
            id: self.next_id,
            kind,
            ledger: Rc::clone(&self.ledger),
        }
    }
}

impl RenderBackend for MockBackend {
    type Buffer = Handle;
    type Binding = Handle;
    type Shader = Handle;
    type Program = Handle;
    type FrameError = Infallible;

    fn create_binding(&mut self, layout: &wgpu::VertexBufferLayout<'static>) -> Handle {
        assert!(!layout.attributes.is_empty(), "binding without attributes");
        self.handle(Resource::Binding, Call::CreateBinding)
    }

    fn create_buffer(&mut self, kind: BufferKind, _label: &str, contents: &[u8]) -> Handle {
        self.handle(Resource::Buffer, Call::CreateBuffer(kind, contents.len()))
    }

    fn compile_shader(&mut self, stage: ShaderStage, _source: &str) -> Built<Handle> {
        let shader = self.handle(Resource::Shader, Call::CompileShader(stage));
        match &self.failure {
            Some(Failure::Compile(failing, log)) if *failing == stage => {
                Built::failed(shader, log.clone())
            }
            _ => Built::ok(shader),
        }
    }

    fn link_program(&mut self, vertex: Handle, fragment: Handle, _binding: &Handle) -> Built<Handle> {
        let program = self.handle(Resource::Program, Call::LinkProgram);
        drop(vertex);
        drop(fragment);
        match &self.failure {
            Some(Failure::Link(log)) => Built::failed(program, log.clone()),
            _ => Built::ok(program),
        }
    }

    fn resize_surface(&mut self, width: u32, height: u32) {
        self.ledger
            .borrow_mut()
            .calls
            .push(Call::ResizeSurface(width, height));
    }

    fn submit_frame(&mut self, commands: &[FrameCommand<'_, Self>]) -> Result<(), Infallible> {
        let frame = commands
            .iter()
            .map(|command| match command {
                FrameCommand::Clear(color) => Recorded::Clear(*color),
                FrameCommand::SetViewport(viewport) => Recorded::SetViewport(*viewport),
                FrameCommand::UseProgram(program) => Recorded::UseProgram(program.id),
                FrameCommand::BindAttributes {
                    binding,
                    vertices,
                    indices,
                } => Recorded::BindAttributes {
                    binding: binding.id,
                    vertices: vertices.id,
                    indices: indices.id,
                },
                FrameCommand::DrawIndexed { count, format } => Recorded::DrawIndexed {
                    count: *count,
                    format: *format,
                },
                FrameCommand::UnbindAttributes => Recorded::UnbindAttributes,
            })
            .collect();

        let mut ledger = self.ledger.borrow_mut();
        ledger.calls.push(Call::SubmitFrame);
        ledger.frames.push(frame);
        Ok(())
    }
}
