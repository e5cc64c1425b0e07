use std::fmt;

use crate::backend::{Built, RenderBackend, ShaderStage};

/// Driver logs are cut to this many bytes.
pub const DIAGNOSTIC_CAPACITY: usize = 512;

/// WGSL sources for the two stages of the quad program.
#[derive(Debug, Clone, Copy)]
pub struct ShaderSources<'a> {
    pub vertex: &'a str,
    pub fragment: &'a str,
}

impl ShaderSources<'static> {
    /// Position pass-through vertex stage and a constant orange fragment stage.
    pub fn quad() -> Self {
        Self {
            vertex: include_str!("quad.vert.wgsl"),
            fragment: include_str!("quad.frag.wgsl"),
        }
    }
}

/// Which part of building the program a diagnostic came from.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BuildStep {
    Compile(ShaderStage),
    Link,
}

impl fmt::Display for BuildStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildStep::Compile(stage) => write!(f, "{stage} shader compilation"),
            BuildStep::Link => f.write_str("shader program link"),
        }
    }
}

/// A driver log, bounded to [DIAGNOSTIC_CAPACITY] bytes.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Diagnostic {
    pub step: BuildStep,
    pub message: String,
    /// The driver log was longer than the capacity and got cut.
    pub truncated: bool,
}

impl Diagnostic {
    /// Captures at most [DIAGNOSTIC_CAPACITY] bytes of `log`, cutting on a
    /// character boundary.
    pub fn capture(step: BuildStep, log: &str) -> Self {
        let log = log.trim_end();
        if log.len() <= DIAGNOSTIC_CAPACITY {
            return Self {
                step,
                message: log.to_string(),
                truncated: false,
            };
        }

        let mut end = DIAGNOSTIC_CAPACITY;
        while !log.is_char_boundary(end) {
            end -= 1;
        }

        Self {
            step,
            message: log[..end].to_string(),
            truncated: true,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed: {}", self.step, self.message)?;
        if self.truncated {
            f.write_str(" [truncated]")?;
        }
        Ok(())
    }
}

/// Outcome of one build step.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Status {
    Ok,
    Failed(Diagnostic),
}

impl Status {
    pub fn is_ok(&self) -> bool {
        matches!(self, Status::Ok)
    }

    #[cfg(test)]
    pub fn diagnostic(&self) -> Option<&Diagnostic> {
        match self {
            Status::Ok => None,
            Status::Failed(diagnostic) => Some(diagnostic),
        }
    }
}

/// Compile and link status of every step that built a program.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct BuildReport {
    pub vertex: Status,
    pub fragment: Status,
    pub link: Status,
}

impl BuildReport {
    pub fn is_ok(&self) -> bool {
        self.vertex.is_ok() && self.fragment.is_ok() && self.link.is_ok()
    }
}

/// Turns a backend result into a status, logging the failure.
fn check<T>(step: BuildStep, built: &Built<T>) -> Status {
    match &built.error_log {
        None => Status::Ok,
        Some(log) => {
            let diagnostic = Diagnostic::capture(step, log);
            log::error!("{diagnostic}");
            Status::Failed(diagnostic)
        }
    }
}

/// Compiles both stages, links them against `binding` and releases the stages.
///
/// Failures are logged and recorded in the report but never stop the build:
/// the program handle is returned regardless, and drawing with a program whose
/// report is not ok has undefined results.
pub fn build_program<B: RenderBackend>(
    backend: &mut B,
    sources: &ShaderSources<'_>,
    binding: &B::Binding,
) -> (B::Program, BuildReport) {
    let vertex = backend.compile_shader(ShaderStage::Vertex, sources.vertex);
    let vertex_status = check(BuildStep::Compile(ShaderStage::Vertex), &vertex);

    let fragment = backend.compile_shader(ShaderStage::Fragment, sources.fragment);
    let fragment_status = check(BuildStep::Compile(ShaderStage::Fragment), &fragment);

    let program = backend.link_program(vertex.handle, fragment.handle, binding);
    let link_status = check(BuildStep::Link, &program);

    let report = BuildReport {
        vertex: vertex_status,
        fragment: fragment_status,
        link: link_status,
    };
    (program.handle, report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::mock::{Failure, MockBackend, Resource};
    use crate::geometry::Vertex;

    fn build(backend: &mut MockBackend) -> BuildReport {
        let binding = backend.create_binding(&Vertex::desc());
        let (_program, report) = build_program(backend, &ShaderSources::quad(), &binding);
        report
    }

    #[test]
    fn clean_sources_link() {
        let mut backend = MockBackend::new();
        let report = build(&mut backend);
        assert!(report.is_ok());
        assert_eq!(report.link, Status::Ok);
    }

    #[test]
    fn vertex_failure_is_reported_not_fatal() {
        let mut backend = MockBackend::new().failing(Failure::Compile(
            ShaderStage::Vertex,
            "error: expected ';'".into(),
        ));
        let report = build(&mut backend);

        let diagnostic = report.vertex.diagnostic().expect("vertex stage should fail");
        assert_eq!(diagnostic.step, BuildStep::Compile(ShaderStage::Vertex));
        assert!(diagnostic.to_string().contains("vertex"));
        assert!(diagnostic.message.contains("expected ';'"));
        assert!(report.fragment.is_ok());
        // The program is still built from what the driver returned.
        assert_eq!(backend.ledger().borrow().created(Resource::Program), 1);
    }

    #[test]
    fn fragment_failure_names_the_fragment_stage() {
        let mut backend = MockBackend::new().failing(Failure::Compile(
            ShaderStage::Fragment,
            "error: unknown identifier `FragColor`".into(),
        ));
        let report = build(&mut backend);

        assert!(report.vertex.is_ok());
        let diagnostic = report.fragment.diagnostic().expect("fragment stage should fail");
        assert!(diagnostic.to_string().contains("fragment"));
        assert!(!diagnostic.to_string().contains("vertex"));
    }

    #[test]
    fn link_failure_is_reported() {
        let mut backend =
            MockBackend::new().failing(Failure::Link("entry point `fs_main` missing".into()));
        let report = build(&mut backend);

        assert!(report.vertex.is_ok());
        assert!(report.fragment.is_ok());
        let diagnostic = report.link.diagnostic().expect("link should fail");
        assert_eq!(diagnostic.step, BuildStep::Link);
        assert!(diagnostic.to_string().contains("program"));
    }

    #[test]
    fn stages_are_released_after_linking() {
        let mut backend = MockBackend::new();
        let binding = backend.create_binding(&Vertex::desc());
        let (program, _) = build_program(&mut backend, &ShaderSources::quad(), &binding);

        let ledger = backend.ledger();
        assert_eq!(ledger.borrow().created(Resource::Shader), 2);
        assert_eq!(ledger.borrow().released(Resource::Shader), 2);
        assert_eq!(ledger.borrow().released(Resource::Program), 0);
        drop(program);
        assert_eq!(ledger.borrow().released(Resource::Program), 1);
    }

    #[test]
    fn long_logs_are_truncated() {
        let log = "x".repeat(DIAGNOSTIC_CAPACITY + 100);
        let diagnostic = Diagnostic::capture(BuildStep::Link, &log);
        assert!(diagnostic.truncated);
        assert_eq!(diagnostic.message.len(), DIAGNOSTIC_CAPACITY);
        assert!(diagnostic.to_string().ends_with("[truncated]"));
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        // 'é' is two bytes, so the capacity lands in the middle of one.
        let log = format!("a{}", "é".repeat(DIAGNOSTIC_CAPACITY));
        let diagnostic = Diagnostic::capture(BuildStep::Compile(ShaderStage::Vertex), &log);
        assert!(diagnostic.truncated);
        assert_eq!(diagnostic.message.len(), DIAGNOSTIC_CAPACITY - 1);
        assert!(diagnostic.message.chars().skip(1).all(|c| c == 'é'));
    }

    #[test]
    fn short_logs_are_kept_whole() {
        let diagnostic =
            Diagnostic::capture(BuildStep::Compile(ShaderStage::Fragment), "bad token\n");
        assert!(!diagnostic.truncated);
        assert_eq!(diagnostic.message, "bad token");
    }

    #[test]
    fn shipped_sources_define_their_entry_points() {
        let sources = ShaderSources::quad();
        assert!(sources.vertex.contains(ShaderStage::Vertex.entry_point()));
        assert!(sources.fragment.contains(ShaderStage::Fragment.entry_point()));
    }
}
