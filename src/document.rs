//! Owned document trees for tree-structured markup.
//!
//! A [`Document`] is a strictly-owned value tree: no shared subtrees, no
//! cycles, one parent per node. Namespace prefixes are resolved to their
//! bound URIs during parsing and never stored, so two serializations that
//! differ only in prefix spelling parse to identical trees.

use crate::error_codes;
use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::name::ResolveResult;
use quick_xml::NsReader;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DocumentError {
    #[error("[MAPCHECK_DOC_001] XML parse error: {0}. Suggestion: check the markup is well-formed.")]
    Xml(String),

    #[error("[MAPCHECK_DOC_002] document has no root element")]
    NoRoot,

    #[error("[MAPCHECK_DOC_003] unbalanced element nesting near '{0}'")]
    Unbalanced(String),
}

impl DocumentError {
    pub fn code(&self) -> &'static str {
        match self {
            DocumentError::Xml(_) => error_codes::DOC_XML,
            DocumentError::NoRoot => error_codes::DOC_NO_ROOT,
            DocumentError::Unbalanced(_) => error_codes::DOC_UNBALANCED,
        }
    }
}

/// A qualified name: local name plus the namespace URI it is bound to.
///
/// The prefix used in the source markup is deliberately absent. Equality of
/// two `QName`s is equality of `(local, ns_uri)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QName {
    pub local: String,
    /// Empty string means "no namespace".
    pub ns_uri: String,
}

impl QName {
    pub fn new(local: impl Into<String>, ns_uri: impl Into<String>) -> QName {
        QName {
            local: local.into(),
            ns_uri: ns_uri.into(),
        }
    }

    pub fn unqualified(local: impl Into<String>) -> QName {
        QName {
            local: local.into(),
            ns_uri: String::new(),
        }
    }
}

impl std::fmt::Display for QName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.ns_uri.is_empty() {
            write!(f, "{}", self.local)
        } else {
            write!(f, "{{{}}}{}", self.ns_uri, self.local)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: QName,
    pub value: String,
}

/// Ordered child content of an element. Comments are dropped at parse time
/// and never appear.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum NodeContent {
    Element(Node),
    Text { value: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub name: QName,
    pub attributes: Vec<Attribute>,
    pub children: Vec<NodeContent>,
}

impl Node {
    pub fn new(name: QName) -> Node {
        Node {
            name,
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Element children in document order.
    pub fn elements(&self) -> impl Iterator<Item = &Node> {
        self.children.iter().filter_map(|c| match c {
            NodeContent::Element(n) => Some(n),
            NodeContent::Text { .. } => None,
        })
    }

    /// The concatenation of this element's direct text children, verbatim.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            if let NodeContent::Text { value } = child {
                out.push_str(value);
            }
        }
        out
    }

    pub fn attribute(&self, name: &QName) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == *name)
            .map(|a| a.value.as_str())
    }
}

/// An ordered, strictly-owned markup tree. A value object: every arrange
/// operation builds a fresh `Document` rather than mutating in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub root: Node,
}

impl Document {
    pub fn new(root: Node) -> Document {
        Document { root }
    }

    /// Parse markup text into a document tree.
    ///
    /// Namespace declarations are resolved in scope; CDATA sections fold into
    /// text; comments and processing instructions are discarded.
    pub fn parse(xml: &str) -> Result<Document, DocumentError> {
        let mut reader = NsReader::from_str(xml);
        reader.config_mut().trim_text(false);

        let mut stack: Vec<Node> = Vec::new();
        let mut root: Option<Node> = None;

        loop {
            match reader.read_resolved_event() {
                Ok((ns, Event::Start(e))) => {
                    // The resolved namespace borrows the reader mutably;
                    // take it as an owned string before touching the reader
                    // again for attribute resolution.
                    let ns_uri = resolve_to_owned(ns)?;
                    let node = start_to_node(&reader, ns_uri, &e)?;
                    stack.push(node);
                }
                Ok((ns, Event::Empty(e))) => {
                    let ns_uri = resolve_to_owned(ns)?;
                    let node = start_to_node(&reader, ns_uri, &e)?;
                    attach(&mut stack, &mut root, node)?;
                }
                Ok((_, Event::End(e))) => {
                    let node = stack.pop().ok_or_else(|| {
                        DocumentError::Unbalanced(
                            String::from_utf8_lossy(e.local_name().as_ref()).into_owned(),
                        )
                    })?;
                    attach(&mut stack, &mut root, node)?;
                }
                Ok((_, Event::Text(t))) => {
                    let value = t
                        .unescape()
                        .map_err(|e| DocumentError::Xml(e.to_string()))?
                        .into_owned();
                    if let Some(parent) = stack.last_mut() {
                        push_text(parent, &value);
                    }
                }
                Ok((_, Event::CData(t))) => {
                    let value = String::from_utf8_lossy(t.as_ref()).into_owned();
                    if let Some(parent) = stack.last_mut() {
                        push_text(parent, &value);
                    }
                }
                Ok((_, Event::Eof)) => break,
                Ok(_) => {}
                Err(e) => return Err(DocumentError::Xml(e.to_string())),
            }
        }

        if !stack.is_empty() {
            return Err(DocumentError::Unbalanced(stack.last().map_or_else(
                String::new,
                |n| n.name.local.clone(),
            )));
        }

        root.map(Document::new).ok_or(DocumentError::NoRoot)
    }

    /// Serialize back to markup text.
    ///
    /// Prefixes are generated deterministically (`ns0`, `ns1`, ... in
    /// first-seen URI order) and declared on the root element, so two equal
    /// documents always serialize identically.
    pub fn to_xml(&self) -> String {
        let mut prefixes: Vec<String> = Vec::new();
        collect_namespaces(&self.root, &mut prefixes);

        let mut out = String::new();
        write_node(&self.root, &prefixes, true, &mut out);
        out
    }
}

fn resolve_to_owned(ns: ResolveResult<'_>) -> Result<String, DocumentError> {
    match ns {
        ResolveResult::Bound(uri) => Ok(String::from_utf8_lossy(uri.as_ref()).into_owned()),
        ResolveResult::Unbound => Ok(String::new()),
        ResolveResult::Unknown(prefix) => Err(DocumentError::Xml(format!(
            "undeclared namespace prefix '{}'",
            String::from_utf8_lossy(&prefix)
        ))),
    }
}

fn start_to_node(
    reader: &NsReader<&[u8]>,
    ns_uri: String,
    e: &quick_xml::events::BytesStart<'_>,
) -> Result<Node, DocumentError> {
    let local = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
    let mut node = Node::new(QName::new(local, ns_uri));

    for attr in e.attributes() {
        let attr = attr.map_err(|e| DocumentError::Xml(e.to_string()))?;
        // xmlns declarations are scope machinery, not data.
        if attr.key.as_ref() == b"xmlns" || attr.key.as_ref().starts_with(b"xmlns:") {
            continue;
        }
        let (attr_ns, attr_local) = reader.resolve_attribute(attr.key);
        let attr_uri = resolve_to_owned(attr_ns)?;
        let value = attr
            .unescape_value()
            .map_err(|e| DocumentError::Xml(e.to_string()))?
            .into_owned();
        node.attributes.push(Attribute {
            name: QName::new(
                String::from_utf8_lossy(attr_local.as_ref()).into_owned(),
                attr_uri,
            ),
            value,
        });
    }

    Ok(node)
}

fn attach(
    stack: &mut [Node],
    root: &mut Option<Node>,
    node: Node,
) -> Result<(), DocumentError> {
    match stack.last_mut() {
        Some(parent) => {
            parent.children.push(NodeContent::Element(node));
            Ok(())
        }
        None => {
            if root.is_some() {
                return Err(DocumentError::Xml(
                    "multiple root elements".to_string(),
                ));
            }
            *root = Some(node);
            Ok(())
        }
    }
}

fn push_text(parent: &mut Node, value: &str) {
    // Adjacent text runs (e.g. around a CDATA boundary) merge into one node.
    if let Some(NodeContent::Text { value: last }) = parent.children.last_mut() {
        last.push_str(value);
    } else {
        parent.children.push(NodeContent::Text {
            value: value.to_string(),
        });
    }
}

fn collect_namespaces(node: &Node, uris: &mut Vec<String>) {
    if !node.name.ns_uri.is_empty() && !uris.contains(&node.name.ns_uri) {
        uris.push(node.name.ns_uri.clone());
    }
    for attr in &node.attributes {
        if !attr.name.ns_uri.is_empty() && !uris.contains(&attr.name.ns_uri) {
            uris.push(attr.name.ns_uri.clone());
        }
    }
    for child in node.elements() {
        collect_namespaces(child, uris);
    }
}

fn prefix_for<'a>(uris: &'a [String], uri: &str) -> Option<(usize, &'a str)> {
    uris.iter()
        .position(|u| u == uri)
        .map(|idx| (idx, uris[idx].as_str()))
}

fn qname_token(name: &QName, uris: &[String]) -> String {
    match prefix_for(uris, &name.ns_uri) {
        Some((idx, _)) => format!("ns{}:{}", idx, name.local),
        None => name.local.clone(),
    }
}

fn write_node(node: &Node, uris: &[String], is_root: bool, out: &mut String) {
    let tag = qname_token(&node.name, uris);
    out.push('<');
    out.push_str(&tag);

    if is_root {
        for (idx, uri) in uris.iter().enumerate() {
            out.push_str(&format!(" xmlns:ns{}=\"{}\"", idx, escape(uri.as_str())));
        }
    }

    for attr in &node.attributes {
        out.push(' ');
        out.push_str(&qname_token(&attr.name, uris));
        out.push_str("=\"");
        out.push_str(&escape(attr.value.as_str()));
        out.push('"');
    }

    if node.children.is_empty() {
        out.push_str("/>");
        return;
    }

    out.push('>');
    for child in &node.children {
        match child {
            NodeContent::Element(n) => write_node(n, uris, false, out),
            NodeContent::Text { value } => out.push_str(&escape(value.as_str())),
        }
    }
    out.push_str("</");
    out.push_str(&tag);
    out.push('>');
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_resolves_prefixes_to_uris() {
        let a = Document::parse(r#"<a xmlns="urn:x"><b>hi</b></a>"#).unwrap();
        let b = Document::parse(r#"<ns0:a xmlns:ns0="urn:x"><ns0:b>hi</ns0:b></ns0:a>"#).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.root.name, QName::new("a", "urn:x"));
    }

    #[test]
    fn comments_are_dropped() {
        let doc = Document::parse("<a><!-- note --><b/></a>").unwrap();
        assert_eq!(doc.root.children.len(), 1);
    }

    #[test]
    fn cdata_folds_into_text() {
        let doc = Document::parse("<a>one<![CDATA[ & two]]></a>").unwrap();
        assert_eq!(doc.root.text(), "one & two");
        assert_eq!(doc.root.children.len(), 1);
    }

    #[test]
    fn attributes_keep_document_order_in_storage() {
        let doc = Document::parse(r#"<a z="1" y="2"/>"#).unwrap();
        let names: Vec<&str> = doc
            .root
            .attributes
            .iter()
            .map(|a| a.name.local.as_str())
            .collect();
        assert_eq!(names, vec!["z", "y"]);
    }

    #[test]
    fn xmlns_declarations_are_not_attributes() {
        let doc = Document::parse(r#"<a xmlns:p="urn:p" p:x="1"/>"#).unwrap();
        assert_eq!(doc.root.attributes.len(), 1);
        assert_eq!(doc.root.attributes[0].name, QName::new("x", "urn:p"));
    }

    #[test]
    fn to_xml_round_trips_structure() {
        let doc = Document::parse(r#"<a xmlns="urn:x" k="v"><b>text &amp; more</b></a>"#).unwrap();
        let reparsed = Document::parse(&doc.to_xml()).unwrap();
        assert_eq!(doc, reparsed);
    }

    #[test]
    fn undeclared_prefix_is_an_error() {
        let err = Document::parse("<p:a><p:b/></p:a>").unwrap_err();
        assert_eq!(err.code(), crate::error_codes::DOC_XML);
        assert!(err.to_string().contains("undeclared namespace prefix 'p'"));
    }

    #[test]
    fn missing_root_is_an_error() {
        let err = Document::parse("  ").unwrap_err();
        assert_eq!(err.code(), crate::error_codes::DOC_NO_ROOT);
    }
}
