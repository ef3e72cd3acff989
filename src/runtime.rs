//! Interfaces to the external collaborators this harness orchestrates.
//!
//! The transform runtime, schema validation, flat-file conversion and
//! resource loading all live outside this crate. Each is specified here as a
//! blocking, object-safe trait plus the structured diagnostics it must
//! produce. The crate ships only in-memory and directory-backed resource
//! stores; everything else is supplied by the caller (production adapters or
//! test fakes).

use crate::document::Document;
use crate::error_codes;
use crate::extension::ExtensionBindings;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// An opaque compiled transform obtained from the runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformProgram {
    pub id: u64,
    pub display_name: String,
}

/// The external transform-execution runtime.
///
/// `run` is treated as a deterministic pure function of input and bindings;
/// the orchestrator therefore never retries it.
pub trait TransformRuntime {
    fn compile(&self, source: &str) -> Result<TransformProgram, TransformRunError>;

    fn run(
        &self,
        program: &TransformProgram,
        bindings: &ExtensionBindings,
        input: &Document,
    ) -> Result<String, TransformRunError>;
}

/// Runtime-side failure. `cause` preserves the underlying chain so the
/// executor can aggregate every level into one diagnostic.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct TransformRunError {
    pub message: String,
    #[source]
    pub cause: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl TransformRunError {
    pub fn new(message: impl Into<String>) -> TransformRunError {
        TransformRunError {
            message: message.into(),
            cause: None,
        }
    }

    pub fn with_cause(
        message: impl Into<String>,
        cause: impl std::error::Error + Send + Sync + 'static,
    ) -> TransformRunError {
        TransformRunError {
            message: message.into(),
            cause: Some(Box::new(cause)),
        }
    }
}

/// A reference to a schema known to the external schema set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SchemaRef(pub String);

impl SchemaRef {
    pub fn new(name: impl Into<String>) -> SchemaRef {
        SchemaRef(name.into())
    }
}

impl std::fmt::Display for SchemaRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Warning,
    Error,
}

/// One schema violation with its position in the validated payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub line: u32,
    pub column: u32,
    pub severity: Severity,
    pub message: String,
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let severity = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        write!(
            f,
            "line {} column {}: {}: {}",
            self.line, self.column, severity, self.message
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ValidationReport {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.issues.iter().all(|i| i.severity != Severity::Error)
    }

    fn render(&self) -> String {
        self.issues
            .iter()
            .map(ValidationIssue::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Schema non-conformance, with per-violation detail. A bare boolean failure
/// would defeat the purpose of this harness.
#[derive(Debug, Error)]
#[error("[MAPCHECK_VAL_001] schema validation against '{schema}' failed:\n{}", report.render())]
pub struct ValidationError {
    pub schema: SchemaRef,
    pub report: ValidationReport,
}

impl ValidationError {
    pub fn code(&self) -> &'static str {
        error_codes::VALIDATION_FAILED
    }
}

/// The external schema-validation service.
pub trait SchemaSet {
    fn validate_document(
        &self,
        document: &Document,
        schema: &SchemaRef,
    ) -> Result<ValidationReport, ValidationError>;

    fn validate_text(&self, text: &str, schema: &SchemaRef)
        -> Result<ValidationReport, ValidationError>;
}

/// One flat-file conversion violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionIssue {
    pub line: u32,
    pub column: u32,
    pub warning: bool,
    pub message: String,
}

impl std::fmt::Display for ConversionIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "line {} column {}: {}: {}",
            self.line,
            self.column,
            if self.warning { "warning" } else { "error" },
            self.message
        )
    }
}

/// Flat-file <-> tree conversion failure with structured violation detail.
#[derive(Debug, Error)]
#[error("[MAPCHECK_CONV_001] flat-file conversion via '{schema}' failed:\n{}", render_issues(issues))]
pub struct ConversionError {
    pub schema: SchemaRef,
    pub issues: Vec<ConversionIssue>,
}

impl ConversionError {
    pub fn code(&self) -> &'static str {
        error_codes::CONVERSION_FAILED
    }
}

fn render_issues(issues: &[ConversionIssue]) -> String {
    issues
        .iter()
        .map(ConversionIssue::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

/// The external schema-bound flat-file conversion service.
pub trait FlatFileConverter {
    fn flat_to_tree(&self, text: &str, schema: &SchemaRef) -> Result<Document, ConversionError>;

    fn tree_to_flat(&self, document: &Document, schema: &SchemaRef)
        -> Result<String, ConversionError>;
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ResourceError {
    #[error("[MAPCHECK_RES_001] resource '{name}' not found in container '{container}'")]
    NotFound { container: String, name: String },

    #[error("[MAPCHECK_RES_002] failed reading resource '{name}': {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

impl ResourceError {
    pub fn code(&self) -> &'static str {
        match self {
            ResourceError::NotFound { .. } => error_codes::RESOURCE_NOT_FOUND,
            ResourceError::Io { .. } => error_codes::RESOURCE_IO,
        }
    }
}

/// Loads named text payloads (map sources, schema sources, fixtures) by
/// (container, name).
pub trait ResourceStore {
    fn load(&self, container: &str, name: &str) -> Result<String, ResourceError>;
}

/// In-memory resource store for tests and embedded fixtures.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Vec<(String, String, String)>,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }

    pub fn with(
        mut self,
        container: impl Into<String>,
        name: impl Into<String>,
        payload: impl Into<String>,
    ) -> MemoryStore {
        self.entries
            .push((container.into(), name.into(), payload.into()));
        self
    }
}

impl ResourceStore for MemoryStore {
    fn load(&self, container: &str, name: &str) -> Result<String, ResourceError> {
        self.entries
            .iter()
            .find(|(c, n, _)| c == container && n == name)
            .map(|(_, _, payload)| payload.clone())
            .ok_or_else(|| ResourceError::NotFound {
                container: container.to_string(),
                name: name.to_string(),
            })
    }
}

/// Directory-backed resource store: `container` is a subdirectory of the
/// base path, `name` a file within it.
#[derive(Debug, Clone)]
pub struct DirStore {
    base: PathBuf,
}

impl DirStore {
    pub fn new(base: impl Into<PathBuf>) -> DirStore {
        DirStore { base: base.into() }
    }
}

impl ResourceStore for DirStore {
    fn load(&self, container: &str, name: &str) -> Result<String, ResourceError> {
        let path = self.base.join(container).join(name);
        if !path.is_file() {
            return Err(ResourceError::NotFound {
                container: container.to_string(),
                name: name.to_string(),
            });
        }
        std::fs::read_to_string(&path).map_err(|source| ResourceError::Io {
            name: name.to_string(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_lookup() {
        let store = MemoryStore::new().with("maps", "m1", "<map/>");
        assert_eq!(store.load("maps", "m1").unwrap(), "<map/>");
        let err = store.load("maps", "missing").unwrap_err();
        assert_eq!(err.code(), error_codes::RESOURCE_NOT_FOUND);
    }

    #[test]
    fn validation_report_with_only_warnings_is_valid() {
        let report = ValidationReport {
            issues: vec![ValidationIssue {
                line: 1,
                column: 2,
                severity: Severity::Warning,
                message: "deprecated field".to_string(),
            }],
        };
        assert!(report.is_valid());
    }

    #[test]
    fn validation_error_renders_line_and_column() {
        let err = ValidationError {
            schema: SchemaRef::new("S1"),
            report: ValidationReport {
                issues: vec![ValidationIssue {
                    line: 3,
                    column: 14,
                    severity: Severity::Error,
                    message: "missing element".to_string(),
                }],
            },
        };
        let rendered = err.to_string();
        assert!(rendered.contains("line 3 column 14"));
        assert!(rendered.contains("missing element"));
    }
}
