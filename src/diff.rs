//! Classified difference records shared by the text and structural engines.
//!
//! A comparison produces a [`DiffResult`]: an ordered sequence of
//! [`DiffRecord`]s. Records start out classified by the engine that produced
//! them; a suppression pass may later reclassify individual records to
//! [`DiffKind::Unchanged`] before the result is judged.

use serde::{Deserialize, Serialize};

/// How a single compared unit differs between expected and actual.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffKind {
    Unchanged,
    /// Present only in the actual side.
    Inserted,
    /// Present only in the expected side.
    Deleted,
    /// Present on both sides with differing content.
    Changed,
}

/// What aspect of the compared units a record is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonType {
    ElementTagName,
    NamespaceUri,
    AttributeValue,
    AttributePresence,
    ChildCount,
    TextValue,
    LineContent,
}

/// Where a record's compared units live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RecordLocation {
    /// Zero-based line index into the side(s) that carry the line.
    Line { index: usize },
    /// Slash paths with 1-based sibling ordinals, for each tree the unit
    /// exists in (e.g. `/order[1]/item[2]`).
    Node {
        #[serde(skip_serializing_if = "Option::is_none")]
        expected_path: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        actual_path: Option<String>,
    },
}

/// One classified difference (or agreement) between expected and actual.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffRecord {
    pub kind: DiffKind,
    pub comparison: ComparisonType,
    pub location: RecordLocation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual: Option<String>,
}

impl DiffRecord {
    pub fn line(
        kind: DiffKind,
        index: usize,
        expected: Option<String>,
        actual: Option<String>,
    ) -> DiffRecord {
        DiffRecord {
            kind,
            comparison: ComparisonType::LineContent,
            location: RecordLocation::Line { index },
            expected,
            actual,
        }
    }

    pub fn node(
        kind: DiffKind,
        comparison: ComparisonType,
        expected_path: Option<String>,
        actual_path: Option<String>,
        expected: Option<String>,
        actual: Option<String>,
    ) -> DiffRecord {
        DiffRecord {
            kind,
            comparison,
            location: RecordLocation::Node {
                expected_path,
                actual_path,
            },
            expected,
            actual,
        }
    }

    /// Reclassify this record as non-significant.
    pub fn suppress(&mut self) {
        self.kind = DiffKind::Unchanged;
    }

    pub fn is_difference(&self) -> bool {
        self.kind != DiffKind::Unchanged
    }
}

/// The ordered outcome of one comparison. Produced fresh per comparison and
/// never cached; must not be shared across concurrent comparisons.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DiffResult {
    pub records: Vec<DiffRecord>,
}

impl DiffResult {
    pub fn new(records: Vec<DiffRecord>) -> DiffResult {
        DiffResult { records }
    }

    /// Whether any record remains a difference (evaluate after suppression).
    pub fn has_differences(&self) -> bool {
        self.records.iter().any(DiffRecord::is_difference)
    }

    pub fn differences(&self) -> impl Iterator<Item = &DiffRecord> {
        self.records.iter().filter(|r| r.is_difference())
    }

    pub fn difference_count(&self) -> usize {
        self.differences().count()
    }
}
