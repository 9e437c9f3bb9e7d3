//! Mutable HTML document tree.
//!
//! [`ParsedTree`] owns a parsed document and supports the structural edits the
//! sanitizer and image recovery passes need: dropping a tag while keeping its
//! children, dropping a whole subtree, rewriting attributes, and grafting new
//! markup next to an existing node. Each pipeline pass takes a tree by value
//! and hands it back, so no tree is ever shared between two extractions.
//!
//! # Example
//!
//! ```rust
//! use lectern_core::tree::ParsedTree;
//!
//! let mut tree = ParsedTree::parse_fragment("<table><tr><td><p>Cell</p></td></tr></table>");
//! for id in tree.select("table, tr, td, tbody").unwrap() {
//!     tree.unwrap(id);
//! }
//! assert_eq!(tree.to_html(), "<p>Cell</p>");
//! ```

use std::collections::HashMap;
use std::io;

pub use ego_tree::NodeId;
use ego_tree::NodeRef;
use ego_tree::iter::Edge;
use html5ever::serialize::{Serialize, SerializeOpts, Serializer, TraversalScope, serialize};
use html5ever::{LocalName, QualName, ns};
use scraper::{ElementRef, Html, Node, Selector};

use crate::{LecternError, Result};

/// An owned, mutable HTML tree.
pub struct ParsedTree {
    html: Html,
    fragment: bool,
    attr_overrides: HashMap<NodeId, Vec<(QualName, String)>>,
}

impl ParsedTree {
    /// Parses a complete HTML document.
    pub fn parse_document(html: &str) -> Self {
        Self { html: Html::parse_document(html), fragment: false, attr_overrides: HashMap::new() }
    }

    /// Parses an HTML fragment, as found in extracted article content.
    pub fn parse_fragment(html: &str) -> Self {
        Self { html: Html::parse_fragment(html), fragment: true, attr_overrides: HashMap::new() }
    }

    /// The node that holds the tree's content.
    ///
    /// For documents this is the document node, for fragments the implicit
    /// `<html>` wrapper html5ever places around the parsed nodes.
    pub fn content_root(&self) -> NodeId {
        let root = self.html.tree.root();
        if self.fragment
            && let Some(wrapper) = root.children().find(|child| child.value().is_element())
        {
            return wrapper.id();
        }
        root.id()
    }

    /// The `<body>` element, if the tree has one.
    pub fn body(&self) -> Option<NodeId> {
        self.select("body").ok().and_then(|ids| ids.first().copied())
    }

    /// Selects elements matching a CSS selector, in document order.
    ///
    /// Detached nodes are never returned.
    ///
    /// # Errors
    ///
    /// Returns [`LecternError::HtmlParseError`] if the selector is invalid.
    pub fn select(&self, selector: &str) -> Result<Vec<NodeId>> {
        let sel =
            Selector::parse(selector).map_err(|e| LecternError::HtmlParseError(format!("Invalid selector: {}", e)))?;

        Ok(self
            .html
            .tree
            .root()
            .descendants()
            .filter_map(ElementRef::wrap)
            .filter(|el| sel.matches(el))
            .map(|el| el.id())
            .collect())
    }

    /// Read-only view of an element.
    pub fn element(&self, id: NodeId) -> Option<ElementRef<'_>> {
        self.html.tree.get(id).and_then(ElementRef::wrap)
    }

    /// Lowercase tag name of an element.
    pub fn tag_name(&self, id: NodeId) -> Option<String> {
        self.element(id).map(|el| el.value().name().to_lowercase())
    }

    /// Reads an attribute, honouring earlier [`ParsedTree::set_attr`] calls.
    pub fn attr(&self, id: NodeId, name: &str) -> Option<String> {
        if let Some(overrides) = self.attr_overrides.get(&id)
            && let Some((_, value)) = overrides.iter().find(|(key, _)| &*key.local == name)
        {
            return Some(value.clone());
        }
        self.element(id).and_then(|el| el.value().attr(name)).map(str::to_string)
    }

    /// Writes an attribute value on an element.
    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        if self.element(id).is_none() {
            return;
        }
        let overrides = self.attr_overrides.entry(id).or_default();
        match overrides.iter_mut().find(|(key, _)| &*key.local == name) {
            Some(entry) => entry.1 = value.to_string(),
            None => overrides.push((QualName::new(None, ns!(), LocalName::from(name)), value.to_string())),
        }
    }

    /// Concatenated text content of a node and its descendants.
    pub fn text(&self, id: NodeId) -> String {
        match self.html.tree.get(id) {
            Some(node) => node
                .descendants()
                .filter_map(|n| n.value().as_text().map(|t| t.to_string()))
                .collect(),
            None => String::new(),
        }
    }

    /// Text held directly by a node, excluding descendants' text.
    pub fn direct_text(&self, id: NodeId) -> String {
        match self.html.tree.get(id) {
            Some(node) => node
                .children()
                .filter_map(|c| c.value().as_text().map(|t| t.to_string()))
                .collect(),
            None => String::new(),
        }
    }

    /// Ids of the direct element children of a node, in order.
    pub fn child_elements(&self, id: NodeId) -> Vec<NodeId> {
        match self.html.tree.get(id) {
            Some(node) => node.children().filter(|c| c.value().is_element()).map(|c| c.id()).collect(),
            None => Vec::new(),
        }
    }

    /// Removes an element's tag, promoting its children into its parent at
    /// the same position.
    ///
    /// Returns `false` if the node does not exist or has no parent.
    pub fn unwrap(&mut self, id: NodeId) -> bool {
        let children: Vec<NodeId> = match self.html.tree.get(id) {
            Some(node) if node.parent().is_some() => node.children().map(|c| c.id()).collect(),
            _ => return false,
        };

        if let Some(mut node) = self.html.tree.get_mut(id) {
            for child in children {
                node.insert_id_before(child);
            }
            node.detach();
        }
        self.attr_overrides.remove(&id);
        true
    }

    /// Removes a node together with its whole subtree.
    pub fn remove(&mut self, id: NodeId) -> bool {
        let attached = self.html.tree.get(id).is_some_and(|node| node.parent().is_some());
        if !attached {
            return false;
        }
        if let Some(mut node) = self.html.tree.get_mut(id) {
            node.detach();
        }
        true
    }

    /// Parses `html` as a fragment and inserts its nodes right after `target`.
    ///
    /// Returns `false` (and leaves the tree untouched) if `target` has no parent.
    pub fn insert_html_after(&mut self, target: NodeId, html: &str) -> bool {
        let attached = self.html.tree.get(target).is_some_and(|node| node.parent().is_some());
        if !attached {
            return false;
        }

        let fragment = Html::parse_fragment(html);
        let mut anchor = target;
        for source in fragment_nodes(&fragment) {
            let id = self.graft(source);
            if let Some(mut node) = self.html.tree.get_mut(anchor) {
                node.insert_id_after(id);
            }
            anchor = id;
        }
        true
    }

    /// Parses `html` as a fragment and appends its nodes as the last children of `parent`.
    pub fn append_html(&mut self, parent: NodeId, html: &str) -> bool {
        if self.html.tree.get(parent).is_none() {
            return false;
        }

        let fragment = Html::parse_fragment(html);
        for source in fragment_nodes(&fragment) {
            let id = self.graft(source);
            if let Some(mut node) = self.html.tree.get_mut(parent) {
                node.append_id(id);
            }
        }
        true
    }

    /// Copies a node from another tree into this one as an orphan.
    fn graft(&mut self, source: NodeRef<'_, Node>) -> NodeId {
        let id = self.html.tree.orphan(source.value().clone()).id();
        for child in source.children() {
            let child_id = self.graft(child);
            if let Some(mut node) = self.html.tree.get_mut(id) {
                node.append_id(child_id);
            }
        }
        id
    }

    /// Serializes the tree.
    ///
    /// Documents serialize in full, fragments serialize only their content.
    pub fn to_html(&self) -> String {
        let Some(root) = self.html.tree.get(self.content_root()) else {
            return String::new();
        };
        let scope = if self.fragment { TraversalScope::ChildrenOnly(None) } else { TraversalScope::IncludeNode };
        let opts = SerializeOpts { traversal_scope: scope, ..Default::default() };

        let mut buf = Vec::new();
        if let Err(err) = serialize(&mut buf, &SerializableNode { tree: self, node: root }, opts) {
            tracing::warn!(error = %err, "failed to serialize tree");
            return String::new();
        }
        String::from_utf8_lossy(&buf).into_owned()
    }
}

/// A node handed to html5ever's serializer, with [`ParsedTree::set_attr`]
/// values standing in for the parsed ones.
struct SerializableNode<'a> {
    tree: &'a ParsedTree,
    node: NodeRef<'a, Node>,
}

impl Serialize for SerializableNode<'_> {
    fn serialize<S: Serializer>(&self, serializer: &mut S, traversal_scope: TraversalScope) -> io::Result<()> {
        let skip_self = traversal_scope == TraversalScope::ChildrenOnly(None);

        for edge in self.node.traverse() {
            match edge {
                Edge::Open(node) => {
                    if skip_self && node == self.node {
                        continue;
                    }
                    match node.value() {
                        Node::Doctype(doctype) => serializer.write_doctype(doctype.name())?,
                        Node::Comment(comment) => serializer.write_comment(comment)?,
                        Node::Text(text) => serializer.write_text(text)?,
                        Node::Element(element) => {
                            let overrides: &[(QualName, String)] =
                                self.tree.attr_overrides.get(&node.id()).map(Vec::as_slice).unwrap_or_default();
                            let parsed = element.attrs.iter().map(|(name, value)| {
                                match overrides.iter().find(|(key, _)| key == name) {
                                    Some((_, replaced)) => (name, replaced.as_str()),
                                    None => (name, &value[..]),
                                }
                            });
                            let added = overrides
                                .iter()
                                .filter(|(key, _)| element.attrs.iter().all(|(name, _)| name != key))
                                .map(|(key, value)| (key, value.as_str()));
                            serializer.start_elem(element.name.clone(), parsed.chain(added))?;
                        }
                        _ => {}
                    }
                }
                Edge::Close(node) => {
                    if skip_self && node == self.node {
                        continue;
                    }
                    if let Some(element) = node.value().as_element() {
                        serializer.end_elem(element.name.clone())?;
                    }
                }
            }
        }
        Ok(())
    }
}

/// Top-level nodes of a parsed fragment, skipping html5ever's `<html>` wrapper.
fn fragment_nodes(fragment: &Html) -> Vec<NodeRef<'_, Node>> {
    let root = fragment.tree.root();
    match root.children().find(|child| child.value().is_element()) {
        Some(wrapper) => wrapper.children().collect(),
        None => root.children().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fragment_round_trip() {
        let html = r#"<p class="lead">Hello <b>world</b> &amp; friends</p><img src="a.png">"#;
        let tree = ParsedTree::parse_fragment(html);
        assert_eq!(tree.to_html(), html);
    }

    #[test]
    fn test_document_serialization_keeps_doctype() {
        let tree = ParsedTree::parse_document("<!DOCTYPE html><html><head></head><body><p>x</p></body></html>");
        let html = tree.to_html();
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<body><p>x</p></body>"));
    }

    #[test]
    fn test_unwrap_promotes_children_in_place() {
        let mut tree = ParsedTree::parse_fragment("<div><span>a</span><em>b</em></div><p>c</p>");
        let div = tree.select("div").unwrap()[0];
        assert!(tree.unwrap(div));
        assert_eq!(tree.to_html(), "<span>a</span><em>b</em><p>c</p>");
    }

    #[test]
    fn test_remove_drops_subtree() {
        let mut tree = ParsedTree::parse_fragment("<p>keep</p><map name=\"m\"><area href=\"x\"></map>");
        let map = tree.select("map").unwrap()[0];
        assert!(tree.remove(map));
        assert_eq!(tree.to_html(), "<p>keep</p>");
        assert!(tree.select("area").unwrap().is_empty());
    }

    #[test]
    fn test_set_attr_overrides_serialization() {
        let mut tree = ParsedTree::parse_fragment(r#"<a href="https://a.test/?utm_source=x">link</a>"#);
        let a = tree.select("a").unwrap()[0];
        tree.set_attr(a, "href", "https://a.test/");
        tree.set_attr(a, "title", "t");
        assert_eq!(tree.attr(a, "href").as_deref(), Some("https://a.test/"));
        assert_eq!(tree.to_html(), r#"<a href="https://a.test/" title="t">link</a>"#);
    }

    #[test]
    fn test_set_attr_values_are_escaped() {
        let mut tree = ParsedTree::parse_fragment("<p><a>go</a> &lt;now&gt;\u{a0}</p>");
        let a = tree.select("a").unwrap()[0];
        tree.set_attr(a, "title", r#"say "hi" & bye"#);
        assert_eq!(tree.to_html(), r#"<p><a title="say &quot;hi&quot; &amp; bye">go</a> &lt;now&gt;&nbsp;</p>"#);
    }

    #[test]
    fn test_insert_html_after() {
        let mut tree = ParsedTree::parse_fragment("<p>one</p><p>two</p>");
        let first = tree.select("p").unwrap()[0];
        assert!(tree.insert_html_after(first, r#"<p><img src="x.png"></p>"#));
        assert_eq!(tree.to_html(), r#"<p>one</p><p><img src="x.png"></p><p>two</p>"#);
        assert_eq!(tree.select("p").unwrap().len(), 3);
    }

    #[test]
    fn test_append_html() {
        let mut tree = ParsedTree::parse_fragment("<p>one</p>");
        let root = tree.content_root();
        assert!(tree.append_html(root, "<p>end</p>"));
        assert_eq!(tree.to_html(), "<p>one</p><p>end</p>");
    }

    #[test]
    fn test_select_is_document_order_after_graft() {
        let mut tree = ParsedTree::parse_fragment("<h2>a</h2><h2>c</h2>");
        let first = tree.select("h2").unwrap()[0];
        tree.insert_html_after(first, "<h2>b</h2>");
        let texts: Vec<String> = tree.select("h2").unwrap().into_iter().map(|id| tree.text(id)).collect();
        assert_eq!(texts, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_invalid_selector() {
        let tree = ParsedTree::parse_fragment("<p>x</p>");
        assert!(matches!(tree.select("[[bad"), Err(LecternError::HtmlParseError(_))));
    }

    #[test]
    fn test_raw_text_not_escaped() {
        let tree = ParsedTree::parse_fragment("<style>a > b { color: red }</style>");
        assert_eq!(tree.to_html(), "<style>a > b { color: red }</style>");
    }
}
