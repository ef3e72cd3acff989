//! Human-readable difference reports.
//!
//! Every failure this crate raises embeds a rendered diagnostic; the report
//! here is the one for comparison failures: one line per remaining
//! difference, locating it and quoting both sides.

use crate::diff::{ComparisonType, DiffKind, DiffRecord, DiffResult, RecordLocation};

/// Render the differences of a result, one per line. A result with no
/// remaining differences renders as a single `no differences` line.
pub fn render_report(result: &DiffResult) -> String {
    let differences: Vec<&DiffRecord> = result.differences().collect();
    if differences.is_empty() {
        return "no differences".to_string();
    }

    let mut out = String::new();
    out.push_str(&format!("{} difference(s):\n", differences.len()));
    for record in differences {
        out.push_str(&render_record(record));
        out.push('\n');
    }
    out.pop();
    out
}

fn render_record(record: &DiffRecord) -> String {
    let kind = match record.kind {
        DiffKind::Unchanged => "unchanged",
        DiffKind::Inserted => "inserted",
        DiffKind::Deleted => "deleted",
        DiffKind::Changed => "changed",
    };
    let what = match record.comparison {
        ComparisonType::ElementTagName => "element tag name",
        ComparisonType::NamespaceUri => "namespace URI",
        ComparisonType::AttributeValue => "attribute value",
        ComparisonType::AttributePresence => "attribute",
        ComparisonType::ChildCount => "child element",
        ComparisonType::TextValue => "text value",
        ComparisonType::LineContent => "line",
    };

    let location = match &record.location {
        RecordLocation::Line { index } => format!("line {}", index + 1),
        RecordLocation::Node {
            expected_path,
            actual_path,
        } => match (expected_path, actual_path) {
            (Some(e), Some(a)) if e == a => e.clone(),
            (Some(e), Some(a)) => format!("{e} vs {a}"),
            (Some(e), None) => e.clone(),
            (None, Some(a)) => a.clone(),
            (None, None) => "(unknown)".to_string(),
        },
    };

    match (&record.expected, &record.actual) {
        (Some(expected), Some(actual)) => {
            format!("  {kind} {what} at {location}: expected {expected:?}, actual {actual:?}")
        }
        (Some(expected), None) => {
            format!("  {kind} {what} at {location}: expected {expected:?}")
        }
        (None, Some(actual)) => {
            format!("  {kind} {what} at {location}: actual {actual:?}")
        }
        (None, None) => format!("  {kind} {what} at {location}"),
    }
}
