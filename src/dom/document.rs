//! Arena-backed document tree
//!
//! Nodes live in a flat arena and refer to each other by [`NodeId`]. Detached
//! nodes stay in the arena, so ids handed out during a visit remain valid for
//! the lifetime of the document even after the node leaves the tree.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::core::errors::{ParallelError, Result};
use crate::dom::selector::{matches_selector, SelectorList};

/// Handle to a node in a [`Document`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(usize);

impl NodeId {
    /// Position of the node in its document's arena
    pub fn index(self) -> usize {
        self.0
    }
}

/// Element payload: tag, attributes, inline style properties and scroll state
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ElementData {
    pub tag_name: String,
    pub attributes: IndexMap<String, String>,
    /// Inline style properties, including custom properties
    pub style: IndexMap<String, String>,
    pub scroll_top: i64,
}

impl ElementData {
    pub fn new(tag_name: impl Into<String>) -> Self {
        Self {
            tag_name: tag_name.into().to_ascii_lowercase(),
            ..Default::default()
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Tokens of the `class` attribute in order
    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attribute("class").unwrap_or("").split_whitespace()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes().any(|c| c == class)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum NodeKind {
    Document,
    Element(ElementData),
    Text(String),
    Comment(String),
}

#[derive(Clone, Debug)]
pub struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    kind: NodeKind,
}

impl Node {
    fn new(kind: NodeKind) -> Self {
        Self {
            parent: None,
            children: Vec::new(),
            kind,
        }
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn as_element(&self) -> Option<&ElementData> {
        match &self.kind {
            NodeKind::Element(data) => Some(data),
            _ => None,
        }
    }
}

/// Snapshot taken when layout is forced on a node
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LayoutFlush {
    pub node: NodeId,
    /// Classes present on the node at the time of the flush
    pub classes: Vec<String>,
}

/// A document tree
///
/// Nodes live in an arena addressed by [`NodeId`]. Removing a node only
/// detaches it, so ids held by a visit stay valid until the document is
/// dropped; the arena grows with every imported subtree. Hosts that keep one
/// document for a long session should rebuild it from a fresh parse between
/// page loads.
#[derive(Clone, Debug)]
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
    flushes: Vec<LayoutFlush>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty document containing only the root node
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::new(NodeKind::Document)],
            root: NodeId(0),
            flushes: Vec::new(),
        }
    }

    /// Parse an HTML string into a new document
    pub fn parse(html: &str) -> Self {
        crate::dom::parse::parse_html(html)
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of nodes ever allocated, attached or not
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn node(&self, id: NodeId) -> Result<&Node> {
        self.nodes
            .get(id.0)
            .ok_or_else(|| ParallelError::node_not_found(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.nodes
            .get_mut(id.0)
            .ok_or_else(|| ParallelError::node_not_found(id))
    }

    pub fn element(&self, id: NodeId) -> Result<&ElementData> {
        self.node(id)?
            .as_element()
            .ok_or_else(|| ParallelError::dom("element", format!("{:?} is not an element", id)))
    }

    fn element_mut(&mut self, id: NodeId) -> Result<&mut ElementData> {
        match &mut self.node_mut(id)?.kind {
            NodeKind::Element(data) => Ok(data),
            _ => Err(ParallelError::dom(
                "element",
                format!("{:?} is not an element", id),
            )),
        }
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.element(id).is_ok()
    }

    fn alloc(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::new(kind));
        id
    }

    pub fn create_element(&mut self, tag_name: &str) -> NodeId {
        self.alloc(NodeKind::Element(ElementData::new(tag_name)))
    }

    /// Allocate a detached element from prepared data
    pub fn create_element_with(&mut self, data: ElementData) -> NodeId {
        self.alloc(NodeKind::Element(data))
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.alloc(NodeKind::Text(text.into()))
    }

    pub fn create_comment(&mut self, text: impl Into<String>) -> NodeId {
        self.alloc(NodeKind::Comment(text.into()))
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.0).and_then(|n| n.parent)
    }

    /// Nearest ancestor that is an element
    pub fn parent_element(&self, id: NodeId) -> Option<NodeId> {
        self.parent(id).filter(|p| self.is_element(*p))
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes.get(id.0).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// Inclusive ancestor check
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// Whether the node is reachable from the document root
    pub fn is_connected(&self, id: NodeId) -> bool {
        self.contains(self.root, id)
    }

    fn check_insertable(&self, parent: NodeId, child: NodeId, operation: &str) -> Result<()> {
        self.node(parent)?;
        self.node(child)?;
        if child == self.root {
            return Err(ParallelError::dom(operation, "the document root cannot be moved"));
        }
        if self.contains(child, parent) {
            return Err(ParallelError::dom(
                operation,
                format!("{:?} is an ancestor of {:?}", child, parent),
            ));
        }
        if matches!(self.node(parent)?.kind, NodeKind::Text(_) | NodeKind::Comment(_)) {
            return Err(ParallelError::dom(operation, "character data cannot have children"));
        }
        Ok(())
    }

    fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.0].parent.take() {
            self.nodes[parent.0].children.retain(|c| *c != id);
        }
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.check_insertable(parent, child, "append_child")?;
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
        Ok(())
    }

    /// Insert `node` under `parent` before `reference`, or at the end when
    /// `reference` is `None`
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        node: NodeId,
        reference: Option<NodeId>,
    ) -> Result<()> {
        let Some(reference) = reference else {
            return self.append_child(parent, node);
        };
        if node == reference {
            return Ok(());
        }
        self.check_insertable(parent, node, "insert_before")?;
        if self.parent(reference) != Some(parent) {
            return Err(ParallelError::dom(
                "insert_before",
                format!("{:?} is not a child of {:?}", reference, parent),
            ));
        }
        self.detach(node);
        let index = self.nodes[parent.0]
            .children
            .iter()
            .position(|c| *c == reference)
            .unwrap_or(self.nodes[parent.0].children.len());
        self.nodes[node.0].parent = Some(parent);
        self.nodes[parent.0].children.insert(index, node);
        Ok(())
    }

    /// Detach a node from its parent. Detached nodes are left alone.
    pub fn remove(&mut self, id: NodeId) -> Result<()> {
        self.node(id)?;
        self.detach(id);
        Ok(())
    }

    /// Put `replacement` where `old` is and detach `old`
    pub fn replace_with(&mut self, old: NodeId, replacement: NodeId) -> Result<()> {
        let parent = self
            .parent(old)
            .ok_or_else(|| ParallelError::dom("replace_with", format!("{:?} has no parent", old)))?;
        self.insert_before(parent, replacement, Some(old))?;
        self.detach(old);
        Ok(())
    }

    /// Descendants of `id` in document order, excluding `id` itself
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        out
    }

    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        self.element(id).ok().map(|e| e.tag_name.as_str())
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id).ok().and_then(|e| e.attribute(name))
    }

    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: impl Into<String>) -> Result<()> {
        self.element_mut(id)?
            .attributes
            .insert(name.to_ascii_lowercase(), value.into());
        Ok(())
    }

    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> Result<Option<String>> {
        Ok(self.element_mut(id)?.attributes.shift_remove(name))
    }

    pub fn classes(&self, id: NodeId) -> Vec<String> {
        self.element(id)
            .map(|e| e.classes().map(str::to_string).collect())
            .unwrap_or_default()
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.element(id).map(|e| e.has_class(class)).unwrap_or(false)
    }

    pub fn add_class(&mut self, id: NodeId, class: &str) -> Result<()> {
        let element = self.element_mut(id)?;
        if element.has_class(class) {
            return Ok(());
        }
        let value = match element.attribute("class").map(str::trim) {
            Some(existing) if !existing.is_empty() => format!("{} {}", existing, class),
            _ => class.to_string(),
        };
        element.attributes.insert("class".to_string(), value);
        Ok(())
    }

    /// Remove a class token; returns whether it was present
    pub fn remove_class(&mut self, id: NodeId, class: &str) -> Result<bool> {
        let element = self.element_mut(id)?;
        if !element.has_class(class) {
            return Ok(false);
        }
        let remaining: Vec<&str> = element.classes().filter(|c| *c != class).collect();
        let value = remaining.join(" ");
        element.attributes.insert("class".to_string(), value);
        Ok(true)
    }

    pub fn style_property(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id)
            .ok()
            .and_then(|e| e.style.get(name).map(String::as_str))
    }

    pub fn set_style_property(&mut self, id: NodeId, name: &str, value: impl Into<String>) -> Result<()> {
        self.element_mut(id)?.style.insert(name.to_string(), value.into());
        Ok(())
    }

    pub fn scroll_top(&self, id: NodeId) -> i64 {
        self.element(id).map(|e| e.scroll_top).unwrap_or(0)
    }

    pub fn set_scroll_top(&mut self, id: NodeId, value: i64) -> Result<()> {
        self.element_mut(id)?.scroll_top = value;
        Ok(())
    }

    /// Concatenated text of all descendant text nodes
    pub fn text_content(&self, id: NodeId) -> String {
        let mut text = String::new();
        if let Ok(Node { kind: NodeKind::Text(t), .. }) = self.node(id) {
            text.push_str(t);
        }
        for node in self.descendants(id) {
            if let NodeKind::Text(t) = &self.nodes[node.0].kind {
                text.push_str(t);
            }
        }
        text
    }

    /// Deep-copy a subtree of another document into this one. The copy is
    /// returned detached.
    pub fn import_node(&mut self, source: &Document, node: NodeId) -> Result<NodeId> {
        let kind = match &source.node(node)?.kind {
            NodeKind::Document => {
                return Err(ParallelError::dom("import_node", "cannot import a document node"))
            }
            kind => kind.clone(),
        };
        let copy = self.alloc(kind);
        let mut stack = vec![(node, copy)];
        while let Some((from, to)) = stack.pop() {
            for child in source.children(from) {
                let child_copy = self.alloc(source.nodes[child.0].kind.clone());
                self.nodes[child_copy.0].parent = Some(to);
                self.nodes[to.0].children.push(child_copy);
                stack.push((*child, child_copy));
            }
        }
        Ok(copy)
    }

    /// Force a synchronous layout of `id`, recording the classes it carries
    /// at this point
    pub fn force_reflow(&mut self, id: NodeId) -> Result<()> {
        let classes = self.element(id)?.classes().map(str::to_string).collect();
        self.flushes.push(LayoutFlush { node: id, classes });
        Ok(())
    }

    pub fn layout_flushes(&self) -> &[LayoutFlush] {
        &self.flushes
    }

    /// Hand over the recorded flushes and start a fresh log
    pub fn take_layout_flushes(&mut self) -> Vec<LayoutFlush> {
        std::mem::take(&mut self.flushes)
    }

    /// Connected elements in document order
    pub fn elements(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.descendants(self.root)
            .into_iter()
            .filter(move |id| self.is_element(*id))
    }

    pub fn query_selector(&self, selector: &str) -> Result<Option<NodeId>> {
        let list = SelectorList::parse(selector)?;
        Ok(self.query_selector_list(&list).into_iter().next())
    }

    pub fn query_selector_all(&self, selector: &str) -> Result<Vec<NodeId>> {
        let list = SelectorList::parse(selector)?;
        Ok(self.query_selector_list(&list))
    }

    pub fn query_selector_list(&self, list: &SelectorList) -> Vec<NodeId> {
        self.elements()
            .filter(|id| matches_selector(self, *id, list))
            .collect()
    }

    pub fn matches(&self, id: NodeId, selector: &str) -> Result<bool> {
        let list = SelectorList::parse(selector)?;
        Ok(matches_selector(self, id, &list))
    }
}
