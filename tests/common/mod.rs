//! Common test utilities shared across integration tests.

#![allow(dead_code)]

use mapcheck::{
    ConversionError, ConversionIssue, Document, ExtensionBindings, FlatFileConverter, SchemaRef,
    SchemaSet, Severity, TextBlob, TransformProgram, TransformRunError, TransformRuntime,
    ValidationError, ValidationIssue, ValidationReport,
};
use std::cell::Cell;
use std::sync::Once;

static TRACING: Once = Once::new();

/// Install a capturing subscriber once per test binary so the harness's
/// narration paths run under a real subscriber. Filter with `RUST_LOG`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

pub fn doc(xml: &str) -> Document {
    Document::parse(xml).unwrap_or_else(|e| panic!("fixture markup failed to parse: {e}"))
}

pub fn blob(lines: &[&str]) -> TextBlob {
    TextBlob::from_lines(lines.iter().map(|l| l.to_string()).collect())
}

/// A transform runtime that returns a fixed output and counts `run` calls.
pub struct CountingRuntime {
    pub output: String,
    pub runs: Cell<usize>,
}

impl CountingRuntime {
    pub fn returning(output: &str) -> CountingRuntime {
        CountingRuntime {
            output: output.to_string(),
            runs: Cell::new(0),
        }
    }
}

impl TransformRuntime for CountingRuntime {
    fn compile(&self, source: &str) -> Result<TransformProgram, TransformRunError> {
        Ok(TransformProgram {
            id: 0,
            display_name: source.lines().next().unwrap_or("map").to_string(),
        })
    }

    fn run(
        &self,
        _program: &TransformProgram,
        _bindings: &ExtensionBindings,
        _input: &Document,
    ) -> Result<String, TransformRunError> {
        self.runs.set(self.runs.get() + 1);
        Ok(self.output.clone())
    }
}

/// A runtime whose `run` always fails with a two-level cause chain.
pub struct FailingRuntime;

impl TransformRuntime for FailingRuntime {
    fn compile(&self, _source: &str) -> Result<TransformProgram, TransformRunError> {
        Ok(TransformProgram {
            id: 0,
            display_name: "failing-map".to_string(),
        })
    }

    fn run(
        &self,
        _program: &TransformProgram,
        _bindings: &ExtensionBindings,
        _input: &Document,
    ) -> Result<String, TransformRunError> {
        let inner = TransformRunError::new("lookup table missing");
        Err(TransformRunError::with_cause("script step failed", inner))
    }
}

/// A schema set that accepts everything.
pub struct AcceptAllSchemas;

impl SchemaSet for AcceptAllSchemas {
    fn validate_document(
        &self,
        _document: &Document,
        _schema: &SchemaRef,
    ) -> Result<ValidationReport, ValidationError> {
        Ok(ValidationReport::default())
    }

    fn validate_text(
        &self,
        _text: &str,
        _schema: &SchemaRef,
    ) -> Result<ValidationReport, ValidationError> {
        Ok(ValidationReport::default())
    }
}

/// A schema set that rejects documents whose root local name matches.
pub struct RejectRoot(pub &'static str);

impl SchemaSet for RejectRoot {
    fn validate_document(
        &self,
        document: &Document,
        _schema: &SchemaRef,
    ) -> Result<ValidationReport, ValidationError> {
        if document.root.name.local == self.0 {
            Ok(ValidationReport {
                issues: vec![ValidationIssue {
                    line: 1,
                    column: 1,
                    severity: Severity::Error,
                    message: format!("element '{}' not allowed here", self.0),
                }],
            })
        } else {
            Ok(ValidationReport::default())
        }
    }

    fn validate_text(
        &self,
        _text: &str,
        _schema: &SchemaRef,
    ) -> Result<ValidationReport, ValidationError> {
        Ok(ValidationReport::default())
    }
}

/// Wraps flat lines as `<flat><line>..</line></flat>` and back: a stand-in
/// for a schema-driven conversion service.
pub struct LineConverter;

impl FlatFileConverter for LineConverter {
    fn flat_to_tree(&self, text: &str, schema: &SchemaRef) -> Result<Document, ConversionError> {
        if text.is_empty() {
            return Err(ConversionError {
                schema: schema.clone(),
                issues: vec![ConversionIssue {
                    line: 1,
                    column: 1,
                    warning: false,
                    message: "flat content is empty".to_string(),
                }],
            });
        }
        let mut xml = String::from("<flat>");
        for line in text.lines() {
            xml.push_str("<line>");
            xml.push_str(line);
            xml.push_str("</line>");
        }
        xml.push_str("</flat>");
        Document::parse(&xml).map_err(|e| ConversionError {
            schema: schema.clone(),
            issues: vec![ConversionIssue {
                line: 1,
                column: 1,
                warning: false,
                message: e.to_string(),
            }],
        })
    }

    fn tree_to_flat(&self, document: &Document, schema: &SchemaRef) -> Result<String, ConversionError> {
        if document.root.name.local != "flat" {
            return Err(ConversionError {
                schema: schema.clone(),
                issues: vec![ConversionIssue {
                    line: 1,
                    column: 1,
                    warning: false,
                    message: format!(
                        "root element '{}' does not match the flat-file schema",
                        document.root.name.local
                    ),
                }],
            });
        }
        let lines: Vec<String> = document
            .root
            .elements()
            .map(|line| line.text())
            .collect();
        Ok(lines.join("\n"))
    }
}
