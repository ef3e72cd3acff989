//! Staged orchestration of one map test case.
//!
//! Each test case runs one of four flows depending on the input and target
//! payload kinds, with the transform always the single central step: exactly
//! one execution per case, no implicit retries. Optional schema-validation
//! gates guard the input and the output independently. Any stage failure
//! carries its stage context and aborts the remaining stages.

use crate::diff::DiffResult;
use crate::document::{Document, DocumentError};
use crate::error_codes;
use crate::executor::{ExecutionError, TransformExecutor};
use crate::extension::{resolve_overrides, BindingError, ExtensionManifest, ExtensionOverride};
use crate::runtime::{
    ConversionError, FlatFileConverter, SchemaRef, SchemaSet, TransformRuntime, ValidationError,
};
use crate::tester::{ComparisonFailure, TextTester, TreeTester};
use thiserror::Error;
use tracing::{debug, info};

/// A test payload in either of the two supported shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Tree(Document),
    Flat(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    Tree,
    Flat,
}

impl Payload {
    pub fn kind(&self) -> PayloadKind {
        match self {
            Payload::Tree(_) => PayloadKind::Tree,
            Payload::Flat(_) => PayloadKind::Flat,
        }
    }

    pub fn as_tree(&self) -> Option<&Document> {
        match self {
            Payload::Tree(doc) => Some(doc),
            Payload::Flat(_) => None,
        }
    }

    pub fn as_flat(&self) -> Option<&str> {
        match self {
            Payload::Flat(text) => Some(text),
            Payload::Tree(_) => None,
        }
    }
}

/// Orchestration stages, also used as failure context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    InputConverted,
    InputValidated,
    Transformed,
    OutputValidated,
    FormatConverted,
    Done,
    Failed,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Idle => "idle",
            Stage::InputConverted => "input-converted",
            Stage::InputValidated => "input-validated",
            Stage::Transformed => "transformed",
            Stage::OutputValidated => "output-validated",
            Stage::FormatConverted => "format-converted",
            Stage::Done => "done",
            Stage::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StageError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Conversion(#[from] ConversionError),
    #[error(transparent)]
    Execution(#[from] ExecutionError),
    #[error(transparent)]
    Binding(#[from] BindingError),
    #[error(transparent)]
    Document(#[from] DocumentError),
}

/// A stage failure carrying the stage that was being attempted when the
/// error occurred. Remaining stages never run.
#[derive(Debug, Error)]
#[error("[MAPCHECK_ORCH_001] map test failed during stage '{stage}': {source}")]
pub struct OrchestratorError {
    pub stage: Stage,
    #[source]
    pub source: StageError,
}

impl OrchestratorError {
    pub fn code(&self) -> &'static str {
        error_codes::ORCH_STAGE_FAILED
    }
}

/// Everything one test needs: built per test case and discarded afterwards.
/// The expected output also fixes the target payload kind: a tree expectation
/// makes flows 1/3, a flat expectation flows 2/4.
#[derive(Debug, Clone)]
pub struct MapTestCase {
    pub map_source: String,
    pub map_name: String,
    pub source_schema: SchemaRef,
    pub target_schema: SchemaRef,
    pub input: Payload,
    pub expected_output: Payload,
    pub manifest: ExtensionManifest,
    pub overrides: Vec<ExtensionOverride>,
    pub validate_input: bool,
    pub validate_output: bool,
}

impl MapTestCase {
    /// A case with both validation gates enabled and no overrides.
    pub fn new(
        map_name: impl Into<String>,
        map_source: impl Into<String>,
        source_schema: SchemaRef,
        target_schema: SchemaRef,
        input: Payload,
        expected_output: Payload,
    ) -> MapTestCase {
        MapTestCase {
            map_source: map_source.into(),
            map_name: map_name.into(),
            source_schema,
            target_schema,
            input,
            expected_output,
            manifest: ExtensionManifest::new(),
            overrides: Vec::new(),
            validate_input: true,
            validate_output: true,
        }
    }

    /// The payload kind the transform's output is delivered in.
    pub fn target_kind(&self) -> PayloadKind {
        self.expected_output.kind()
    }

    pub fn with_manifest(mut self, manifest: ExtensionManifest) -> MapTestCase {
        self.manifest = manifest;
        self
    }

    pub fn with_override(mut self, o: ExtensionOverride) -> MapTestCase {
        self.overrides.push(o);
        self
    }

    pub fn validating(mut self, input: bool, output: bool) -> MapTestCase {
        self.validate_input = input;
        self.validate_output = output;
        self
    }
}

/// The actual output plus the stage trail the case went through.
#[derive(Debug, Clone, PartialEq)]
pub struct MapTestOutcome {
    pub actual: Payload,
    pub stages: Vec<Stage>,
}

/// Failure of a verified case: either the flow never produced an output, or
/// the output differs from the case's expected output.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum MapTestError {
    #[error(transparent)]
    Run(#[from] OrchestratorError),
    #[error(transparent)]
    Comparison(#[from] ComparisonFailure),
}

/// Sequences conversion, validation and execution for one test case at a
/// time. Holds no per-case state; independent cases may run on separate
/// orchestrator instances in parallel.
pub struct MapTestOrchestrator<'a> {
    runtime: &'a dyn TransformRuntime,
    schemas: &'a dyn SchemaSet,
    converter: &'a dyn FlatFileConverter,
}

impl<'a> MapTestOrchestrator<'a> {
    pub fn new(
        runtime: &'a dyn TransformRuntime,
        schemas: &'a dyn SchemaSet,
        converter: &'a dyn FlatFileConverter,
    ) -> MapTestOrchestrator<'a> {
        MapTestOrchestrator {
            runtime,
            schemas,
            converter,
        }
    }

    /// Run the flow selected by the case's input and target payload kinds.
    pub fn run(&self, case: &MapTestCase) -> Result<MapTestOutcome, OrchestratorError> {
        let mut trail = StageTrail::new(case.map_name.clone());

        info!(
            map = %case.map_name,
            input = ?case.input.kind(),
            target = ?case.target_kind(),
            "running map test case"
        );

        match self.run_stages(case, &mut trail) {
            Ok(actual) => {
                trail.attempt(Stage::Done);
                trail.complete();
                Ok(MapTestOutcome {
                    actual,
                    stages: trail.stages,
                })
            }
            Err(source) => Err(OrchestratorError {
                stage: trail.attempting,
                source,
            }),
        }
    }

    /// Run the case and judge its actual output against the case's expected
    /// output, tree outputs structurally and flat outputs line by line.
    pub fn verify(&self, case: &MapTestCase) -> Result<MapTestOutcome, MapTestError> {
        let outcome = self.run(case)?;
        judge_outcome(case, &outcome)?;
        Ok(outcome)
    }

    fn run_stages(
        &self,
        case: &MapTestCase,
        trail: &mut StageTrail,
    ) -> Result<Payload, StageError> {
        // Flat input first converts to a tree; parse/validation problems in
        // the flat content surface as conversion errors here.
        let input_tree = match &case.input {
            Payload::Tree(doc) => doc.clone(),
            Payload::Flat(text) => {
                trail.attempt(Stage::InputConverted);
                let doc = self.converter.flat_to_tree(text, &case.source_schema)?;
                trail.complete();
                doc
            }
        };

        if case.validate_input {
            trail.attempt(Stage::InputValidated);
            self.validate(&input_tree, &case.source_schema)?;
            trail.complete();
        }

        trail.attempt(Stage::Transformed);

        // Override resolution precedes execution: an unknown binding fails
        // the case before the transform ever runs.
        let bindings = resolve_overrides(&case.manifest, &case.overrides)?;

        let program = TransformExecutor::compile(self.runtime, &case.map_source)?;
        let output_text =
            TransformExecutor::execute(self.runtime, &program, &bindings, &input_tree)?;
        let output_tree = Document::parse(&output_text)?;
        trail.complete();

        if case.validate_output {
            trail.attempt(Stage::OutputValidated);
            self.validate(&output_tree, &case.target_schema)?;
            trail.complete();
        }

        match case.target_kind() {
            PayloadKind::Tree => Ok(Payload::Tree(output_tree)),
            PayloadKind::Flat => {
                trail.attempt(Stage::FormatConverted);
                let flat = self
                    .converter
                    .tree_to_flat(&output_tree, &case.target_schema)?;
                trail.complete();
                Ok(Payload::Flat(flat))
            }
        }
    }

    fn validate(&self, document: &Document, schema: &SchemaRef) -> Result<(), StageError> {
        let report = self.schemas.validate_document(document, schema)?;
        if !report.is_valid() {
            return Err(StageError::Validation(ValidationError {
                schema: schema.clone(),
                report,
            }));
        }
        Ok(())
    }
}

fn judge_outcome(case: &MapTestCase, outcome: &MapTestOutcome) -> Result<(), ComparisonFailure> {
    match (&case.expected_output, &outcome.actual) {
        (Payload::Tree(expected), Payload::Tree(actual)) => {
            let mut tester = TreeTester::new();
            tester.arrange_expected(expected.clone());
            tester.arrange_actual(actual.clone());
            tester.assert_equal()
        }
        (Payload::Flat(expected), Payload::Flat(actual)) => {
            let mut tester = TextTester::new();
            tester.arrange_expected(expected);
            tester.arrange_actual(actual);
            tester.assert_equal()
        }
        // run_stages always delivers the expectation's kind.
        (expected, actual) => Err(ComparisonFailure {
            subject: "payload".to_string(),
            report: format!(
                "expected a {:?} payload, got a {:?} payload",
                expected.kind(),
                actual.kind()
            ),
            result: DiffResult::default(),
        }),
    }
}

struct StageTrail {
    map_name: String,
    attempting: Stage,
    stages: Vec<Stage>,
}

impl StageTrail {
    fn new(map_name: String) -> StageTrail {
        StageTrail {
            map_name,
            attempting: Stage::Idle,
            stages: vec![Stage::Idle],
        }
    }

    fn attempt(&mut self, stage: Stage) {
        debug!(map = %self.map_name, %stage, "stage starting");
        self.attempting = stage;
    }

    fn complete(&mut self) {
        debug!(map = %self.map_name, stage = %self.attempting, "stage completed");
        self.stages.push(self.attempting);
    }
}
