//! Pre-comparison pruning of document trees.
//!
//! Filtering removes nodes (and their structural effects: child count,
//! ordering) before the structural diff engine ever sees them. This is
//! distinct from suppression, which masks differences after they have been
//! detected.

use crate::document::{Document, Node, NodeContent};
use crate::error_codes;
use rustc_hash::FxHashMap;
use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PathError {
    #[error("[MAPCHECK_PATH_001] invalid path expression '{expr}': {reason}")]
    Syntax { expr: String, reason: String },
}

impl PathError {
    pub fn code(&self) -> &'static str {
        match self {
            PathError::Syntax { .. } => error_codes::PATH_SYNTAX,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Step {
    /// `None` is the `*` wildcard.
    local: Option<String>,
    /// 1-based position among same-named siblings.
    ordinal: Option<usize>,
}

/// A small location-path subset: absolute paths (`/a/b`), descendant paths
/// (`//b/c`), `*` wildcards and `[n]` ordinal predicates. Matching is on
/// local names only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathExpr {
    anchored: bool,
    steps: Vec<Step>,
    source: String,
}

impl PathExpr {
    pub fn parse(expr: &str) -> Result<PathExpr, PathError> {
        let syntax = |reason: &str| PathError::Syntax {
            expr: expr.to_string(),
            reason: reason.to_string(),
        };

        let (anchored, rest) = if let Some(rest) = expr.strip_prefix("//") {
            (false, rest)
        } else if let Some(rest) = expr.strip_prefix('/') {
            (true, rest)
        } else {
            return Err(syntax("must start with '/' or '//'"));
        };

        if rest.is_empty() {
            return Err(syntax("no steps"));
        }

        let mut steps = Vec::new();
        for raw in rest.split('/') {
            if raw.is_empty() {
                return Err(syntax("empty step ('//' is only allowed as a prefix)"));
            }
            let (name_part, ordinal) = match raw.split_once('[') {
                Some((name, bracket)) => {
                    let digits = bracket
                        .strip_suffix(']')
                        .ok_or_else(|| syntax("unterminated '['"))?;
                    let n: usize = digits
                        .parse()
                        .map_err(|_| syntax("ordinal must be a positive integer"))?;
                    if n == 0 {
                        return Err(syntax("ordinals are 1-based"));
                    }
                    (name, Some(n))
                }
                None => (raw, None),
            };
            if name_part.is_empty() {
                return Err(syntax("empty step name"));
            }
            let local = if name_part == "*" {
                None
            } else {
                Some(name_part.to_string())
            };
            steps.push(Step { local, ordinal });
        }

        Ok(PathExpr {
            anchored,
            steps,
            source: expr.to_string(),
        })
    }

    /// Match against an element's ancestor chain of (local name, per-name
    /// ordinal), root first, ending at the element itself.
    fn matches(&self, chain: &[(String, usize)]) -> bool {
        if self.anchored {
            self.steps.len() == chain.len() && self.steps_match(chain)
        } else {
            // Descendant paths match a contiguous suffix of the chain.
            self.steps.len() <= chain.len()
                && self.steps_match(&chain[chain.len() - self.steps.len()..])
        }
    }

    fn steps_match(&self, chain: &[(String, usize)]) -> bool {
        self.steps.iter().zip(chain).all(|(step, (local, ordinal))| {
            step.local.as_ref().map_or(true, |n| n == local)
                && step.ordinal.map_or(true, |n| n == *ordinal)
        })
    }
}

impl std::fmt::Display for PathExpr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.source)
    }
}

/// Removes, before comparison, all descendant elements matching the given
/// local names or path expressions. `apply` is pure: the input document is
/// never mutated.
#[derive(Debug, Clone, Default)]
pub struct ElementFilter {
    local_names: Vec<String>,
    paths: Vec<PathExpr>,
}

impl ElementFilter {
    pub fn new() -> ElementFilter {
        ElementFilter::default()
    }

    pub fn ignore_local_name(mut self, local: impl Into<String>) -> ElementFilter {
        self.local_names.push(local.into());
        self
    }

    pub fn ignore_path(mut self, expr: &str) -> Result<ElementFilter, PathError> {
        self.paths.push(PathExpr::parse(expr)?);
        Ok(self)
    }

    pub fn has_filters(&self) -> bool {
        !self.local_names.is_empty() || !self.paths.is_empty()
    }

    /// Return a copy of the document with every matching element removed.
    ///
    /// The root element itself is never removed: a document must keep its
    /// root, and pruning the whole tree would make any comparison vacuous.
    pub fn apply(&self, doc: &Document) -> Document {
        let mut copy = doc.clone();
        if !self.has_filters() {
            return copy;
        }
        let mut chain = vec![(copy.root.name.local.clone(), 1)];
        self.prune_children(&mut copy.root, &mut chain);
        copy
    }

    fn prune_children(&self, node: &mut Node, chain: &mut Vec<(String, usize)>) {
        let mut ordinals: FxHashMap<String, usize> = FxHashMap::default();
        let mut kept = Vec::with_capacity(node.children.len());

        for child in node.children.drain(..) {
            match child {
                NodeContent::Element(mut element) => {
                    let counter = ordinals.entry(element.name.local.clone()).or_insert(0);
                    *counter += 1;
                    chain.push((element.name.local.clone(), *counter));
                    let drop = self.matches_element(&element, chain);
                    if !drop {
                        self.prune_children(&mut element, chain);
                        kept.push(NodeContent::Element(element));
                    }
                    chain.pop();
                }
                text => kept.push(text),
            }
        }

        node.children = kept;
    }

    fn matches_element(&self, element: &Node, chain: &[(String, usize)]) -> bool {
        self.local_names.iter().any(|n| *n == element.name.local)
            || self.paths.iter().any(|p| p.matches(chain))
    }
}

impl std::fmt::Display for ElementFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if !self.local_names.is_empty() {
            writeln!(
                f,
                "elements with the following local names will be ignored: {}",
                self.local_names.join(", ")
            )?;
        }
        if !self.paths.is_empty() {
            let rendered: Vec<String> = self.paths.iter().map(|p| p.to_string()).collect();
            writeln!(
                f,
                "elements matching the following paths will be ignored: {}",
                rendered.join(", ")
            )?;
        }
        Ok(())
    }
}
