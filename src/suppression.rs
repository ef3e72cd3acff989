//! Post-diff reclassification of individual difference records.
//!
//! Suppression lets a test accept known, expected deltas (generated
//! identifiers, timestamps) without weakening the comparator globally. Rules
//! run synchronously on the calling thread, in registration order, against a
//! result the caller owns; none may block indefinitely.

use crate::diff::{DiffRecord, DiffResult};

/// A rule's verdict for one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Leave the record as classified.
    Keep,
    /// Reclassify the record to `Unchanged`. Terminal for that record.
    Suppress,
}

pub type SuppressionRule = Box<dyn Fn(&DiffRecord) -> Verdict>;

/// Zero or more registered rules applied to a raw [`DiffResult`] before
/// judgement.
///
/// Two equivalent registration forms exist: a single pre-set override
/// callback and an unbounded multicast listener list. Both see the same
/// records with the same terminal-suppression semantics; the override, when
/// set, is simply consulted first.
#[derive(Default)]
pub struct SuppressionPipeline {
    override_rule: Option<SuppressionRule>,
    listeners: Vec<SuppressionRule>,
}

impl SuppressionPipeline {
    pub fn new() -> SuppressionPipeline {
        SuppressionPipeline::default()
    }

    /// Set (or replace) the single override callback.
    pub fn set_override(&mut self, rule: impl Fn(&DiffRecord) -> Verdict + 'static) {
        self.override_rule = Some(Box::new(rule));
    }

    pub fn clear_override(&mut self) {
        self.override_rule = None;
    }

    /// Append a persistent listener. Listeners run after the override, in
    /// registration order.
    pub fn add_listener(&mut self, rule: impl Fn(&DiffRecord) -> Verdict + 'static) {
        self.listeners.push(Box::new(rule));
    }

    pub fn is_empty(&self) -> bool {
        self.override_rule.is_none() && self.listeners.is_empty()
    }

    /// Offer every difference record to the rules; the first `Suppress` wins
    /// for that record, later rules still evaluate the remaining records.
    pub fn apply(&self, result: &mut DiffResult) {
        if self.is_empty() {
            return;
        }
        for record in &mut result.records {
            if !record.is_difference() {
                continue;
            }
            let rules = self.override_rule.iter().chain(self.listeners.iter());
            for rule in rules {
                if rule(record) == Verdict::Suppress {
                    record.suppress();
                    break;
                }
            }
        }
    }
}

impl std::fmt::Debug for SuppressionPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SuppressionPipeline")
            .field("has_override", &self.override_rule.is_some())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::DiffKind;

    fn changed_line(index: usize) -> DiffRecord {
        DiffRecord::line(DiffKind::Deleted, index, Some("x".into()), None)
    }

    #[test]
    fn empty_pipeline_leaves_result_alone() {
        let mut result = DiffResult::new(vec![changed_line(0)]);
        SuppressionPipeline::new().apply(&mut result);
        assert!(result.has_differences());
    }

    #[test]
    fn suppression_is_terminal_per_record() {
        use std::cell::Cell;
        use std::rc::Rc;

        let seen_by_second = Rc::new(Cell::new(0usize));
        let counter = Rc::clone(&seen_by_second);

        let mut pipeline = SuppressionPipeline::new();
        pipeline.add_listener(|record| {
            if matches!(record.location, crate::diff::RecordLocation::Line { index: 0 }) {
                Verdict::Suppress
            } else {
                Verdict::Keep
            }
        });
        pipeline.add_listener(move |_| {
            counter.set(counter.get() + 1);
            Verdict::Keep
        });

        let mut result = DiffResult::new(vec![changed_line(0), changed_line(1)]);
        pipeline.apply(&mut result);

        assert_eq!(result.difference_count(), 1);
        // Record 0 was suppressed by the first rule; only record 1 reached
        // the second listener.
        assert_eq!(seen_by_second.get(), 1);
    }

    #[test]
    fn override_runs_before_listeners() {
        let mut pipeline = SuppressionPipeline::new();
        pipeline.set_override(|_| Verdict::Suppress);
        pipeline.add_listener(|_| panic!("listener must not see suppressed records"));

        let mut result = DiffResult::new(vec![changed_line(0)]);
        pipeline.apply(&mut result);
        assert!(!result.has_differences());
    }
}
