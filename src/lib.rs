//! mapcheck: a test oracle and harness engine for data-transformation maps.
//!
//! This crate provides functionality for:
//! - Proving that a map (a declarative transformation between two
//!   schema-bound formats) produces output equivalent to an expected result
//! - Semantic equivalence of tree-structured markup: children pair by name,
//!   attributes compare unordered, namespace prefixes never matter
//! - Exact line diffs of flat delimited text, where whitespace is significant
//! - Staged orchestration of the four input/output format combinations with
//!   optional schema-validation gates and per-test extension overrides
//!
//! # Quick Start
//!
//! ```
//! use mapcheck::{Document, TreeTester};
//!
//! let mut tester = TreeTester::new();
//! tester.arrange_expected(Document::parse(r#"<a xmlns="urn:x"><b>hi</b><c/></a>"#)?);
//! tester.arrange_actual(Document::parse(
//!     r#"<ns0:a xmlns:ns0="urn:x"><ns0:c/><ns0:b>hi</ns0:b></ns0:a>"#,
//! )?);
//! assert!(tester.is_equal());
//! # Ok::<(), mapcheck::DocumentError>(())
//! ```

mod diff;
mod document;
pub(crate) mod error_codes;
mod executor;
mod extension;
mod filter;
mod orchestrator;
mod output;
mod runtime;
mod suppression;
mod tester;
mod text;
mod text_diff;
mod tree_diff;

pub use diff::{ComparisonType, DiffKind, DiffRecord, DiffResult, RecordLocation};
pub use document::{Attribute, Document, DocumentError, Node, NodeContent, QName};
pub use executor::{render_cause_chain, ExecutionError, TransformExecutor};
pub use extension::{
    resolve_overrides, BindingError, ExtensionBindings, ExtensionCallError,
    ExtensionImplementation, ExtensionManifest, ExtensionOverride,
};
pub use filter::{ElementFilter, PathError, PathExpr};
pub use orchestrator::{
    MapTestCase, MapTestError, MapTestOrchestrator, MapTestOutcome, OrchestratorError, Payload,
    PayloadKind, Stage, StageError,
};
pub use output::json::{deserialize_diff_result, serialize_diff_result};
pub use output::report::render_report;
pub use runtime::{
    ConversionError, ConversionIssue, DirStore, FlatFileConverter, MemoryStore, ResourceError,
    ResourceStore, SchemaRef, SchemaSet, Severity, TransformProgram, TransformRunError,
    TransformRuntime, ValidationError, ValidationIssue, ValidationReport,
};
pub use suppression::{SuppressionPipeline, SuppressionRule, Verdict};
pub use tester::{ArrangeError, ComparisonFailure, TextTester, TreeTester};
pub use text::TextBlob;
pub use text_diff::diff_text;
pub use tree_diff::{diff_documents, downgrade_matching_tag_names};
