//! Structural diff of two document trees.
//!
//! Children are paired by qualified name rather than position, so two
//! documents whose children carry the same multiset of names in a different
//! order compare equal. Attributes compare as unordered sets keyed by
//! qualified name. Namespace prefixes are already gone by the time this
//! engine runs (resolved away at parse), so only bound URIs can differ.

use crate::diff::{ComparisonType, DiffKind, DiffRecord, DiffResult};
use crate::document::{Document, Node, QName};
use rustc_hash::FxHashMap;

/// Compare two documents and classify every observation.
///
/// The result contains `Unchanged` records for agreements that matter to
/// judgement (tag names, attribute values, text) so that suppression rules
/// see the same record stream a difference report renders.
pub fn diff_documents(expected: &Document, actual: &Document) -> DiffResult {
    let mut records = Vec::new();
    let expected_path = node_path("", &expected.root.name, 1);
    let actual_path = node_path("", &actual.root.name, 1);
    diff_nodes(
        &expected.root,
        &actual.root,
        &expected_path,
        &actual_path,
        &mut records,
    );

    let mut result = DiffResult::new(records);
    downgrade_matching_tag_names(&mut result);
    result
}

/// Reclassify any `Changed(ElementTagName)` record whose two names in fact
/// agree on local name and namespace URI.
///
/// The name-bucketed matcher never emits such a record itself, but records
/// can also arrive from deserialized results and from suppression-rule
/// authors, and the comparison contract promises that a matching name is
/// never reported as a tag-name difference.
pub fn downgrade_matching_tag_names(result: &mut DiffResult) {
    for record in &mut result.records {
        if record.kind == DiffKind::Changed
            && record.comparison == ComparisonType::ElementTagName
            && record.expected.is_some()
            && record.expected == record.actual
        {
            record.suppress();
        }
    }
}

fn diff_nodes(
    expected: &Node,
    actual: &Node,
    expected_path: &str,
    actual_path: &str,
    records: &mut Vec<DiffRecord>,
) {
    diff_names(expected, actual, expected_path, actual_path, records);
    diff_attributes(expected, actual, expected_path, actual_path, records);
    diff_text(expected, actual, expected_path, actual_path, records);
    diff_children(expected, actual, expected_path, actual_path, records);
}

fn diff_names(
    expected: &Node,
    actual: &Node,
    expected_path: &str,
    actual_path: &str,
    records: &mut Vec<DiffRecord>,
) {
    let (kind, comparison) = if expected.name == actual.name {
        (DiffKind::Unchanged, ComparisonType::ElementTagName)
    } else if expected.name.local == actual.name.local {
        (DiffKind::Changed, ComparisonType::NamespaceUri)
    } else {
        (DiffKind::Changed, ComparisonType::ElementTagName)
    };
    records.push(DiffRecord::node(
        kind,
        comparison,
        Some(expected_path.to_string()),
        Some(actual_path.to_string()),
        Some(expected.name.to_string()),
        Some(actual.name.to_string()),
    ));
}

fn diff_attributes(
    expected: &Node,
    actual: &Node,
    expected_path: &str,
    actual_path: &str,
    records: &mut Vec<DiffRecord>,
) {
    for attr in &expected.attributes {
        match actual.attribute(&attr.name) {
            Some(actual_value) if actual_value == attr.value => {
                records.push(DiffRecord::node(
                    DiffKind::Unchanged,
                    ComparisonType::AttributeValue,
                    Some(attr_path(expected_path, &attr.name)),
                    Some(attr_path(actual_path, &attr.name)),
                    Some(attr.value.clone()),
                    Some(actual_value.to_string()),
                ));
            }
            Some(actual_value) => {
                records.push(DiffRecord::node(
                    DiffKind::Changed,
                    ComparisonType::AttributeValue,
                    Some(attr_path(expected_path, &attr.name)),
                    Some(attr_path(actual_path, &attr.name)),
                    Some(attr.value.clone()),
                    Some(actual_value.to_string()),
                ));
            }
            None => {
                records.push(DiffRecord::node(
                    DiffKind::Deleted,
                    ComparisonType::AttributePresence,
                    Some(attr_path(expected_path, &attr.name)),
                    None,
                    Some(attr.value.clone()),
                    None,
                ));
            }
        }
    }

    for attr in &actual.attributes {
        if expected.attribute(&attr.name).is_none() {
            records.push(DiffRecord::node(
                DiffKind::Inserted,
                ComparisonType::AttributePresence,
                None,
                Some(attr_path(actual_path, &attr.name)),
                None,
                Some(attr.value.clone()),
            ));
        }
    }
}

fn diff_text(
    expected: &Node,
    actual: &Node,
    expected_path: &str,
    actual_path: &str,
    records: &mut Vec<DiffRecord>,
) {
    let expected_text = expected.text();
    let actual_text = actual.text();
    if expected_text.is_empty() && actual_text.is_empty() {
        return;
    }
    // Verbatim: surrounding whitespace can be semantically meaningful in
    // transformed payloads.
    let kind = if expected_text == actual_text {
        DiffKind::Unchanged
    } else {
        DiffKind::Changed
    };
    records.push(DiffRecord::node(
        kind,
        ComparisonType::TextValue,
        Some(expected_path.to_string()),
        Some(actual_path.to_string()),
        Some(expected_text),
        Some(actual_text),
    ));
}

fn diff_children(
    expected: &Node,
    actual: &Node,
    expected_path: &str,
    actual_path: &str,
    records: &mut Vec<DiffRecord>,
) {
    let expected_children: Vec<&Node> = expected.elements().collect();
    let actual_children: Vec<&Node> = actual.elements().collect();

    if expected_children.len() != actual_children.len() {
        records.push(DiffRecord::node(
            DiffKind::Changed,
            ComparisonType::ChildCount,
            Some(expected_path.to_string()),
            Some(actual_path.to_string()),
            Some(expected_children.len().to_string()),
            Some(actual_children.len().to_string()),
        ));
    }

    // Bucket actual children by qualified name. Pairing within a bucket is
    // two-phase: exact-subtree matches first, then document order for the
    // remainder. The first phase keeps arbitrary reorderings of same-named
    // siblings from producing spurious content differences.
    let mut buckets: FxHashMap<&QName, Vec<usize>> = FxHashMap::default();
    for (idx, child) in actual_children.iter().enumerate() {
        buckets.entry(&child.name).or_default().push(idx);
    }

    let mut matched_actual = vec![false; actual_children.len()];
    let mut pair_of_expected: Vec<Option<usize>> = vec![None; expected_children.len()];

    for (e_idx, child) in expected_children.iter().enumerate() {
        if let Some(indices) = buckets.get(&child.name) {
            let exact = indices
                .iter()
                .find(|&&a_idx| !matched_actual[a_idx] && actual_children[a_idx] == *child);
            if let Some(&a_idx) = exact {
                matched_actual[a_idx] = true;
                pair_of_expected[e_idx] = Some(a_idx);
            }
        }
    }
    for (e_idx, child) in expected_children.iter().enumerate() {
        if pair_of_expected[e_idx].is_some() {
            continue;
        }
        if let Some(indices) = buckets.get(&child.name) {
            if let Some(&a_idx) = indices.iter().find(|&&a_idx| !matched_actual[a_idx]) {
                matched_actual[a_idx] = true;
                pair_of_expected[e_idx] = Some(a_idx);
            }
        }
    }

    // Per-name ordinals in each tree's own document order.
    let mut actual_ordinals_by_idx = vec![0usize; actual_children.len()];
    {
        let mut counters: FxHashMap<&QName, usize> = FxHashMap::default();
        for (idx, child) in actual_children.iter().enumerate() {
            actual_ordinals_by_idx[idx] = bump(&mut counters, &child.name);
        }
    }
    let mut expected_ordinals: FxHashMap<&QName, usize> = FxHashMap::default();

    for (e_idx, child) in expected_children.iter().enumerate() {
        let ordinal = bump(&mut expected_ordinals, &child.name);
        let child_expected_path = node_path(expected_path, &child.name, ordinal);

        match pair_of_expected[e_idx] {
            Some(a_idx) => {
                let partner = actual_children[a_idx];
                let child_actual_path =
                    node_path(actual_path, &partner.name, actual_ordinals_by_idx[a_idx]);
                diff_nodes(
                    child,
                    partner,
                    &child_expected_path,
                    &child_actual_path,
                    records,
                );
            }
            None => {
                records.push(DiffRecord::node(
                    DiffKind::Deleted,
                    ComparisonType::ChildCount,
                    Some(child_expected_path),
                    None,
                    Some(child.name.to_string()),
                    None,
                ));
            }
        }
    }

    for (idx, child) in actual_children.iter().enumerate() {
        if !matched_actual[idx] {
            records.push(DiffRecord::node(
                DiffKind::Inserted,
                ComparisonType::ChildCount,
                None,
                Some(node_path(actual_path, &child.name, actual_ordinals_by_idx[idx])),
                None,
                Some(child.name.to_string()),
            ));
        }
    }
}

fn bump<'a>(ordinals: &mut FxHashMap<&'a QName, usize>, name: &'a QName) -> usize {
    let counter = ordinals.entry(name).or_insert(0);
    *counter += 1;
    *counter
}

fn node_path(parent: &str, name: &QName, ordinal: usize) -> String {
    format!("{}/{}[{}]", parent, name.local, ordinal)
}

fn attr_path(element_path: &str, name: &QName) -> String {
    format!("{}/@{}", element_path, name.local)
}
