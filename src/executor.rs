//! Transform execution with aggregated failure diagnostics.
//!
//! The underlying runtime reports failures one level at a time; a transform
//! failure is rarely diagnosable from the top level alone, so the executor
//! walks the full cause chain and raises one error carrying every level.

use crate::document::Document;
use crate::error_codes;
use crate::extension::ExtensionBindings;
use crate::runtime::{TransformProgram, TransformRuntime};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ExecutionError {
    #[error(
        "[MAPCHECK_EXEC_001] an error occurred while executing transform '{program}':\n{causes}"
    )]
    TransformFailed { program: String, causes: String },

    #[error("[MAPCHECK_EXEC_002] failed to compile transform: {causes}")]
    CompileFailed { causes: String },

    #[error(
        "[MAPCHECK_EXEC_003] transform '{program}' produced no output. Suggestion: check the input document reaches the map's source root."
    )]
    EmptyOutput { program: String },
}

impl ExecutionError {
    pub fn code(&self) -> &'static str {
        match self {
            ExecutionError::TransformFailed { .. } => error_codes::EXEC_TRANSFORM_FAILED,
            ExecutionError::CompileFailed { .. } => error_codes::EXEC_COMPILE_FAILED,
            ExecutionError::EmptyOutput { .. } => error_codes::EXEC_EMPTY_OUTPUT,
        }
    }
}

/// Render an error and every level of its `source()` chain, one per line,
/// outermost first.
pub fn render_cause_chain(error: &(dyn std::error::Error + 'static)) -> String {
    let mut rendered = error.to_string();
    let mut current = error.source();
    while let Some(cause) = current {
        rendered.push('\n');
        rendered.push_str("caused by: ");
        rendered.push_str(&cause.to_string());
        current = cause.source();
    }
    rendered
}

/// Invokes the external transform runtime: exactly one `run` per call, no
/// retries, failures aggregated into a single diagnostic.
pub struct TransformExecutor;

impl TransformExecutor {
    pub fn compile(
        runtime: &dyn TransformRuntime,
        source: &str,
    ) -> Result<TransformProgram, ExecutionError> {
        runtime
            .compile(source)
            .map_err(|e| ExecutionError::CompileFailed {
                causes: render_cause_chain(&e),
            })
    }

    pub fn execute(
        runtime: &dyn TransformRuntime,
        program: &TransformProgram,
        bindings: &ExtensionBindings,
        input: &Document,
    ) -> Result<String, ExecutionError> {
        debug!(program = %program.display_name, "executing transform");

        let output = runtime.run(program, bindings, input).map_err(|e| {
            ExecutionError::TransformFailed {
                program: program.display_name.clone(),
                causes: render_cause_chain(&e),
            }
        })?;

        if output.trim().is_empty() {
            return Err(ExecutionError::EmptyOutput {
                program: program.display_name.clone(),
            });
        }

        debug!(program = %program.display_name, bytes = output.len(), "transform completed");
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::TransformRunError;

    struct FixedRuntime {
        output: &'static str,
    }

    impl TransformRuntime for FixedRuntime {
        fn compile(&self, source: &str) -> Result<TransformProgram, TransformRunError> {
            Ok(TransformProgram {
                id: 1,
                display_name: source.to_string(),
            })
        }

        fn run(
            &self,
            _program: &TransformProgram,
            _bindings: &ExtensionBindings,
            _input: &Document,
        ) -> Result<String, TransformRunError> {
            Ok(self.output.to_string())
        }
    }

    struct FailingRuntime;

    impl TransformRuntime for FailingRuntime {
        fn compile(&self, _source: &str) -> Result<TransformProgram, TransformRunError> {
            Ok(TransformProgram {
                id: 1,
                display_name: "failing".to_string(),
            })
        }

        fn run(
            &self,
            _program: &TransformProgram,
            _bindings: &ExtensionBindings,
            _input: &Document,
        ) -> Result<String, TransformRunError> {
            let root = std::io::Error::new(std::io::ErrorKind::NotFound, "lookup table missing");
            let mid = TransformRunError::with_cause("script step 3 aborted", root);
            Err(TransformRunError::with_cause("transform engine fault", mid))
        }
    }

    fn input() -> Document {
        Document::parse("<in/>").unwrap()
    }

    #[test]
    fn aggregates_every_cause_level() {
        let program = TransformProgram {
            id: 1,
            display_name: "failing".to_string(),
        };
        let err = TransformExecutor::execute(
            &FailingRuntime,
            &program,
            &ExtensionBindings::default(),
            &input(),
        )
        .unwrap_err();

        let message = err.to_string();
        assert!(message.contains("transform engine fault"));
        assert!(message.contains("script step 3 aborted"));
        assert!(message.contains("lookup table missing"));
        assert_eq!(err.code(), error_codes::EXEC_TRANSFORM_FAILED);
    }

    #[test]
    fn blank_output_is_an_error() {
        let runtime = FixedRuntime { output: "   \n" };
        let program = runtime.compile("m").unwrap();
        let err = TransformExecutor::execute(
            &runtime,
            &program,
            &ExtensionBindings::default(),
            &input(),
        )
        .unwrap_err();
        assert_eq!(err.code(), error_codes::EXEC_EMPTY_OUTPUT);
    }

    #[test]
    fn successful_run_returns_runtime_output() {
        let runtime = FixedRuntime { output: "<out/>" };
        let program = runtime.compile("m").unwrap();
        let output = TransformExecutor::execute(
            &runtime,
            &program,
            &ExtensionBindings::default(),
            &input(),
        )
        .unwrap();
        assert_eq!(output, "<out/>");
    }
}
