//! Arrange/assert harness behavior: observers, judgement, filters, stores.

mod common;

use common::doc;
use mapcheck::{
    ComparisonType, DiffKind, ElementFilter, MemoryStore, ResourceError, TextTester, TreeTester,
    Verdict,
};
use std::cell::Cell;
use std::rc::Rc;

#[test]
fn arranging_notifies_observers_before_each_replacement() {
    let seen = Rc::new(Cell::new(0usize));
    let counter = Rc::clone(&seen);

    let mut tester = TextTester::new();
    tester.on_actual_changed(move |blob| {
        counter.set(counter.get() + 1);
        assert!(!blob.is_empty());
    });

    tester.arrange_actual("first\n");
    tester.arrange_actual("second\n");

    assert_eq!(seen.get(), 2);
}

#[test]
fn comparison_failure_is_catchable_and_carries_the_report() {
    let mut tester = TreeTester::new();
    tester.arrange_expected(doc("<a><b>1</b></a>"));
    tester.arrange_actual(doc("<a><b>2</b></a>"));

    let failure = tester.assert_equal().unwrap_err();

    assert_eq!(failure.code(), "MAPCHECK_CMP_001");
    assert!(failure.report.contains("1 difference"));
    assert_eq!(failure.result.difference_count(), 1);
    let diff: Vec<_> = failure.result.differences().collect();
    assert_eq!(diff[0].comparison, ComparisonType::TextValue);
}

#[test]
fn equal_documents_assert_ok() {
    let mut tester = TreeTester::new();
    tester.arrange_expected(doc(r#"<a xmlns="urn:x"><b/><c/></a>"#));
    tester.arrange_actual(doc(r#"<p:a xmlns:p="urn:x"><p:c/><p:b/></p:a>"#));
    tester.assert_equal().unwrap();
}

#[test]
fn unarranged_tester_reports_rather_than_passes() {
    let mut tester = TreeTester::new();
    tester.arrange_expected(doc("<a/>"));

    assert!(tester.diff().is_none());
    assert!(!tester.is_equal());
    let failure = tester.assert_equal().unwrap_err();
    assert!(failure.report.contains("never arranged"));
}

#[test]
fn filter_prunes_volatile_elements_before_comparison() {
    let expected = doc("<envelope><stamp>2024-01-01</stamp><body>same</body></envelope>");
    let actual = doc("<envelope><stamp>2024-06-30</stamp><body>same</body></envelope>");

    let mut unfiltered = TreeTester::new();
    unfiltered.arrange_expected(expected.clone());
    unfiltered.arrange_actual(actual.clone());
    assert!(!unfiltered.is_equal());

    let mut filtered = TreeTester::new().with_filter(ElementFilter::new().ignore_local_name("stamp"));
    filtered.arrange_expected(expected);
    filtered.arrange_actual(actual);
    assert!(filtered.is_equal());
}

#[test]
fn path_filter_prunes_only_the_addressed_subtree() {
    let expected = doc("<a><b><stamp>x</stamp></b><stamp>keep</stamp></a>");
    let actual = doc("<a><b><stamp>y</stamp></b><stamp>KEEP</stamp></a>");

    let filter = ElementFilter::new().ignore_path("/a/b/stamp").unwrap();
    let mut tester = TreeTester::new().with_filter(filter);
    tester.arrange_expected(expected);
    tester.arrange_actual(actual);

    // The nested stamp is gone; the top-level one still differs.
    let result = tester.diff().unwrap();
    let diff: Vec<_> = result.differences().collect();
    assert_eq!(diff.len(), 1);
    assert_eq!(diff[0].expected.as_deref(), Some("keep"));
}

#[test]
fn text_tester_suppression_applies_at_judgement() {
    let mut tester = TextTester::new();
    tester.arrange_expected("stable\nrun-id: 17\n");
    tester.arrange_actual("stable\nrun-id: 99\n");

    assert!(!tester.is_equal());

    tester.suppression_mut().add_listener(|record| {
        let volatile = record
            .expected
            .as_deref()
            .or(record.actual.as_deref())
            .is_some_and(|line| line.starts_with("run-id:"));
        if volatile {
            Verdict::Suppress
        } else {
            Verdict::Keep
        }
    });

    assert!(tester.is_equal());
    tester.assert_equal().unwrap();
    // The raw diff still reports the difference.
    assert!(tester.diff().has_differences());
}

#[test]
fn tree_tester_arranges_from_a_resource_store() {
    let store = MemoryStore::new()
        .with("fixtures", "expected.xml", "<a><b>1</b></a>")
        .with("fixtures", "actual.xml", "<a><b>1</b></a>");

    let mut tester = TreeTester::new();
    tester
        .arrange_expected_from(&store, "fixtures", "expected.xml")
        .unwrap();
    tester
        .arrange_actual_from(&store, "fixtures", "actual.xml")
        .unwrap();

    assert!(tester.is_equal());
}

#[test]
fn missing_resource_is_a_not_found_error() {
    let store = MemoryStore::new();
    let mut tester = TextTester::new();

    let err = tester
        .arrange_expected_from(&store, "fixtures", "absent.txt")
        .unwrap_err();
    assert!(matches!(err, ResourceError::NotFound { .. }));
}

#[test]
fn observers_see_parsed_documents_from_store_arranges() {
    let store = MemoryStore::new().with("fixtures", "doc.xml", "<root><leaf/></root>");
    let seen_root = Rc::new(Cell::new(false));
    let flag = Rc::clone(&seen_root);

    let mut tester = TreeTester::new();
    tester.on_expected_changed(move |document| {
        flag.set(document.root.name.local == "root");
    });
    tester
        .arrange_expected_from(&store, "fixtures", "doc.xml")
        .unwrap();

    assert!(seen_root.get());
}

#[test]
fn intentional_difference_tests_catch_and_inspect() {
    let mut tester = TextTester::new();
    tester.arrange_expected("alpha\n");
    tester.arrange_actual("beta\n");

    // A negative test: the payloads must differ, and in the expected way.
    let failure = tester.assert_equal().unwrap_err();
    let kinds: Vec<_> = failure.result.differences().map(|r| r.kind).collect();
    assert_eq!(kinds, vec![DiffKind::Deleted, DiffKind::Inserted]);
}
