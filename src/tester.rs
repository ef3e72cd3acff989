//! Arrange/assert harness surface over the diff engines.
//!
//! Testers are value holders: every arrange operation replaces the held
//! value with a fresh one and synchronously notifies registered observers.
//! Observers are owned by the tester and torn down with it; there is no
//! global event bus and no implicit unregistration.

use crate::diff::DiffResult;
use crate::document::Document;
use crate::error_codes;
use crate::filter::ElementFilter;
use crate::output::report::render_report;
use crate::runtime::{ResourceError, ResourceStore};
use crate::suppression::SuppressionPipeline;
use crate::text::TextBlob;
use crate::text_diff::diff_text;
use crate::tree_diff::diff_documents;
use thiserror::Error;
use tracing::{debug, info};

/// Terminal comparison failure carrying the rendered differences report.
///
/// Deliberately catchable: a test that wants to assert two payloads are
/// correctly reported as *different* triggers and inspects this error.
#[derive(Debug, Error)]
#[error("[MAPCHECK_CMP_001] {subject} differs from the expected value:\n{report}")]
pub struct ComparisonFailure {
    pub subject: String,
    pub report: String,
    pub result: DiffResult,
}

impl ComparisonFailure {
    pub fn code(&self) -> &'static str {
        error_codes::COMPARISON_FAILED
    }
}

type Observer<T> = Box<dyn FnMut(&T)>;

/// A replace-only value slot with synchronous change observers.
struct Held<T> {
    value: Option<T>,
    observers: Vec<Observer<T>>,
}

impl<T> Held<T> {
    fn empty() -> Held<T> {
        Held {
            value: None,
            observers: Vec::new(),
        }
    }

    fn replace(&mut self, value: T) {
        for observer in &mut self.observers {
            observer(&value);
        }
        self.value = Some(value);
    }

    fn observe(&mut self, observer: impl FnMut(&T) + 'static) {
        self.observers.push(Box::new(observer));
    }
}

/// Line-oriented comparison harness for flat text payloads.
pub struct TextTester {
    expected: Held<TextBlob>,
    actual: Held<TextBlob>,
    suppression: SuppressionPipeline,
}

impl Default for TextTester {
    fn default() -> TextTester {
        TextTester::new()
    }
}

impl TextTester {
    pub fn new() -> TextTester {
        TextTester {
            expected: Held::empty(),
            actual: Held::empty(),
            suppression: SuppressionPipeline::new(),
        }
    }

    pub fn arrange_expected(&mut self, text: &str) {
        debug!(lines = text.lines().count(), "arranging expected text");
        self.expected.replace(TextBlob::from_text(text));
    }

    pub fn arrange_actual(&mut self, text: &str) {
        debug!(lines = text.lines().count(), "arranging actual text");
        self.actual.replace(TextBlob::from_text(text));
    }

    pub fn arrange_expected_from(
        &mut self,
        store: &dyn ResourceStore,
        container: &str,
        name: &str,
    ) -> Result<(), ResourceError> {
        let payload = store.load(container, name)?;
        self.arrange_expected(&payload);
        Ok(())
    }

    pub fn arrange_actual_from(
        &mut self,
        store: &dyn ResourceStore,
        container: &str,
        name: &str,
    ) -> Result<(), ResourceError> {
        let payload = store.load(container, name)?;
        self.arrange_actual(&payload);
        Ok(())
    }

    pub fn expected(&self) -> Option<&TextBlob> {
        self.expected.value.as_ref()
    }

    pub fn actual(&self) -> Option<&TextBlob> {
        self.actual.value.as_ref()
    }

    pub fn on_expected_changed(&mut self, observer: impl FnMut(&TextBlob) + 'static) {
        self.expected.observe(observer);
    }

    pub fn on_actual_changed(&mut self, observer: impl FnMut(&TextBlob) + 'static) {
        self.actual.observe(observer);
    }

    pub fn suppression_mut(&mut self) -> &mut SuppressionPipeline {
        &mut self.suppression
    }

    /// Raw diff of the arranged values, before suppression. Both sides must
    /// be arranged; an unarranged side compares as empty.
    pub fn diff(&self) -> DiffResult {
        let empty = TextBlob::default();
        let expected = self.expected.value.as_ref().unwrap_or(&empty);
        let actual = self.actual.value.as_ref().unwrap_or(&empty);
        diff_text(expected, actual)
    }

    pub fn is_equal(&self) -> bool {
        let mut result = self.diff();
        self.suppression.apply(&mut result);
        !result.has_differences()
    }

    /// Judge the arranged values, rendering the differences report into the
    /// failure.
    pub fn assert_equal(&self) -> Result<(), ComparisonFailure> {
        info!("asserting actual and expected text are equal");
        let mut result = self.diff();
        self.suppression.apply(&mut result);
        judge("text", result)
    }
}

/// Structural comparison harness for tree payloads.
pub struct TreeTester {
    expected: Held<Document>,
    actual: Held<Document>,
    suppression: SuppressionPipeline,
    filter: Option<ElementFilter>,
}

impl Default for TreeTester {
    fn default() -> TreeTester {
        TreeTester::new()
    }
}

impl TreeTester {
    pub fn new() -> TreeTester {
        TreeTester {
            expected: Held::empty(),
            actual: Held::empty(),
            suppression: SuppressionPipeline::new(),
            filter: None,
        }
    }

    /// Apply a pruning filter to both sides before every comparison.
    pub fn with_filter(mut self, filter: ElementFilter) -> TreeTester {
        if filter.has_filters() {
            info!(%filter, "comparison filter installed");
        }
        self.filter = Some(filter);
        self
    }

    pub fn arrange_expected(&mut self, document: Document) {
        debug!("arranging expected document");
        self.expected.replace(document);
    }

    pub fn arrange_actual(&mut self, document: Document) {
        debug!("arranging actual document");
        self.actual.replace(document);
    }

    pub fn arrange_expected_from(
        &mut self,
        store: &dyn ResourceStore,
        container: &str,
        name: &str,
    ) -> Result<(), ArrangeError> {
        let payload = store.load(container, name)?;
        self.arrange_expected(Document::parse(&payload)?);
        Ok(())
    }

    pub fn arrange_actual_from(
        &mut self,
        store: &dyn ResourceStore,
        container: &str,
        name: &str,
    ) -> Result<(), ArrangeError> {
        let payload = store.load(container, name)?;
        self.arrange_actual(Document::parse(&payload)?);
        Ok(())
    }

    pub fn expected(&self) -> Option<&Document> {
        self.expected.value.as_ref()
    }

    pub fn actual(&self) -> Option<&Document> {
        self.actual.value.as_ref()
    }

    pub fn on_expected_changed(&mut self, observer: impl FnMut(&Document) + 'static) {
        self.expected.observe(observer);
    }

    pub fn on_actual_changed(&mut self, observer: impl FnMut(&Document) + 'static) {
        self.actual.observe(observer);
    }

    pub fn suppression_mut(&mut self) -> &mut SuppressionPipeline {
        &mut self.suppression
    }

    /// Raw structural diff of the arranged documents (after filtering,
    /// before suppression). Returns `None` until both sides are arranged.
    pub fn diff(&self) -> Option<DiffResult> {
        let expected = self.expected.value.as_ref()?;
        let actual = self.actual.value.as_ref()?;
        match &self.filter {
            Some(filter) if filter.has_filters() => {
                let expected = filter.apply(expected);
                let actual = filter.apply(actual);
                Some(diff_documents(&expected, &actual))
            }
            _ => Some(diff_documents(expected, actual)),
        }
    }

    pub fn is_equal(&self) -> bool {
        match self.diff() {
            Some(mut result) => {
                self.suppression.apply(&mut result);
                !result.has_differences()
            }
            None => false,
        }
    }

    pub fn assert_equal(&self) -> Result<(), ComparisonFailure> {
        info!("asserting actual and expected documents are equal");
        let Some(mut result) = self.diff() else {
            return Err(ComparisonFailure {
                subject: "document".to_string(),
                report: "expected and/or actual document was never arranged".to_string(),
                result: DiffResult::default(),
            });
        };
        self.suppression.apply(&mut result);
        judge("document", result)
    }
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ArrangeError {
    #[error(transparent)]
    Resource(#[from] ResourceError),
    #[error(transparent)]
    Document(#[from] crate::document::DocumentError),
}

fn judge(subject: &str, result: DiffResult) -> Result<(), ComparisonFailure> {
    if result.has_differences() {
        let report = render_report(&result);
        info!(differences = result.difference_count(), "the {subject} is not as expected:\n{report}");
        return Err(ComparisonFailure {
            subject: subject.to_string(),
            report,
            result,
        });
    }
    info!("the {subject} is as expected");
    Ok(())
}
