//! Node arena and tree operations

use std::fmt;

use smallvec::SmallVec;
use thiserror::Error;

/// Elements serialised without a closing tag
const VOID_ELEMENTS: &[&str] = &["br", "hr", "img", "input", "link", "meta", "wbr"];

/// Document-specific error type
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DomError {
    #[error("Unknown node: {0}")]
    UnknownNode(NodeId),

    #[error("Node {0} is not an element")]
    NotAnElement(NodeId),

    #[error("Node {0} is not a text node")]
    NotText(NodeId),

    #[error("Appending {child} under {parent} would create a cycle")]
    Cycle { parent: NodeId, child: NodeId },
}

/// Result type for document operations
pub type DomResult<T> = Result<T, DomError>;

/// Stable index of a node inside one `Document`.
///
/// Slots are never reused, so an id keeps naming the same node even after
/// the node has been removed from the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A single element attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

/// Payload of a node slot
#[derive(Debug, Clone)]
pub enum NodeKind {
    Element {
        tag: String,
        attributes: SmallVec<[Attribute; 4]>,
        children: Vec<NodeId>,
    },
    Text(String),
}

#[derive(Debug, Clone)]
struct Slot {
    kind: NodeKind,
    parent: Option<NodeId>,
    removed: bool,
}

/// Arena-backed document tree.
///
/// The root is created with the document. Every other node starts detached
/// and is attached with `append_child` / `prepend_child`.
#[derive(Debug, Clone)]
pub struct Document {
    slots: Vec<Slot>,
    root: NodeId,
}

impl Document {
    /// Create a document whose root is an element with the given tag
    pub fn new(root_tag: &str) -> Self {
        let mut doc = Self {
            slots: Vec::new(),
            root: NodeId(0),
        };
        doc.root = doc.create_element(root_tag);
        doc
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of slots ever allocated, including removed nodes
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push(NodeKind::Element {
            tag: tag.to_ascii_lowercase(),
            attributes: SmallVec::new(),
            children: Vec::new(),
        })
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.push(NodeKind::Text(text.into()))
    }

    fn push(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.slots.len());
        self.slots.push(Slot {
            kind,
            parent: None,
            removed: false,
        });
        id
    }

    fn slot(&self, node: NodeId) -> DomResult<&Slot> {
        self.slots.get(node.0).ok_or(DomError::UnknownNode(node))
    }

    fn slot_mut(&mut self, node: NodeId) -> DomResult<&mut Slot> {
        self.slots.get_mut(node.0).ok_or(DomError::UnknownNode(node))
    }

    fn children_mut(&mut self, node: NodeId) -> DomResult<&mut Vec<NodeId>> {
        match &mut self.slot_mut(node)?.kind {
            NodeKind::Element { children, .. } => Ok(children),
            NodeKind::Text(_) => Err(DomError::NotAnElement(node)),
        }
    }

    fn attributes_mut(&mut self, node: NodeId) -> DomResult<&mut SmallVec<[Attribute; 4]>> {
        match &mut self.slot_mut(node)?.kind {
            NodeKind::Element { attributes, .. } => Ok(attributes),
            NodeKind::Text(_) => Err(DomError::NotAnElement(node)),
        }
    }

    pub fn kind(&self, node: NodeId) -> Option<&NodeKind> {
        self.slots.get(node.0).map(|slot| &slot.kind)
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.slots.get(node.0).and_then(|slot| slot.parent)
    }

    /// Children of an element; empty for text nodes and unknown ids
    pub fn children(&self, node: NodeId) -> &[NodeId] {
        match self.kind(node) {
            Some(NodeKind::Element { children, .. }) => children,
            _ => &[],
        }
    }

    pub fn tag(&self, node: NodeId) -> Option<&str> {
        match self.kind(node) {
            Some(NodeKind::Element { tag, .. }) => Some(tag),
            _ => None,
        }
    }

    pub fn is_element(&self, node: NodeId) -> bool {
        self.tag(node).is_some()
    }

    pub fn text(&self, node: NodeId) -> Option<&str> {
        match self.kind(node) {
            Some(NodeKind::Text(text)) => Some(text),
            _ => None,
        }
    }

    pub fn set_text(&mut self, node: NodeId, value: impl Into<String>) -> DomResult<()> {
        match &mut self.slot_mut(node)?.kind {
            NodeKind::Text(text) => {
                *text = value.into();
                Ok(())
            }
            NodeKind::Element { .. } => Err(DomError::NotText(node)),
        }
    }

    /// Iterate an element's attributes in insertion order
    pub fn attributes(&self, node: NodeId) -> impl Iterator<Item = &Attribute> {
        let attributes: &[Attribute] = match self.kind(node) {
            Some(NodeKind::Element { attributes, .. }) => attributes.as_slice(),
            _ => &[],
        };
        attributes.iter()
    }

    pub fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        self.attributes(node)
            .find(|attr| attr.name == name)
            .map(|attr| attr.value.as_str())
    }

    pub fn set_attribute(
        &mut self,
        node: NodeId,
        name: &str,
        value: impl Into<String>,
    ) -> DomResult<()> {
        let value = value.into();
        let attributes = self.attributes_mut(node)?;

        match attributes.iter_mut().find(|attr| attr.name == name) {
            Some(existing) => existing.value = value,
            None => attributes.push(Attribute {
                name: name.to_string(),
                value,
            }),
        }

        Ok(())
    }

    /// Remove an attribute, returning whether it was present
    pub fn remove_attribute(&mut self, node: NodeId, name: &str) -> DomResult<bool> {
        let attributes = self.attributes_mut(node)?;
        let before = attributes.len();
        attributes.retain(|attr| attr.name != name);
        Ok(attributes.len() != before)
    }

    /// Read a `data-*` attribute
    pub fn data(&self, node: NodeId, key: &str) -> Option<&str> {
        self.attribute(node, &format!("data-{}", key))
    }

    pub fn set_data(&mut self, node: NodeId, key: &str, value: impl Into<String>) -> DomResult<()> {
        self.set_attribute(node, &format!("data-{}", key), value)
    }

    pub fn classes(&self, node: NodeId) -> impl Iterator<Item = &str> {
        self.attribute(node, "class")
            .unwrap_or_default()
            .split_ascii_whitespace()
    }

    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.classes(node).any(|c| c == class)
    }

    pub fn add_class(&mut self, node: NodeId, class: &str) -> DomResult<()> {
        if self.has_class(node, class) {
            return Ok(());
        }

        let value = match self.attribute(node, "class") {
            Some(existing) if !existing.trim().is_empty() => format!("{} {}", existing.trim(), class),
            _ => class.to_string(),
        };
        self.set_attribute(node, "class", value)
    }

    /// Whether `ancestor` is `node` or one of its ancestors
    pub fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> DomResult<()> {
        self.insert_child(parent, child, false)
    }

    pub fn prepend_child(&mut self, parent: NodeId, child: NodeId) -> DomResult<()> {
        self.insert_child(parent, child, true)
    }

    fn insert_child(&mut self, parent: NodeId, child: NodeId, front: bool) -> DomResult<()> {
        self.slot(child)?;
        if !self.is_element(parent) {
            self.slot(parent)?;
            return Err(DomError::NotAnElement(parent));
        }
        if self.is_inclusive_ancestor(child, parent) {
            return Err(DomError::Cycle { parent, child });
        }

        self.detach(child)?;

        let children = self.children_mut(parent)?;
        if front {
            children.insert(0, child);
        } else {
            children.push(child);
        }

        self.slot_mut(child)?.parent = Some(parent);
        for id in std::iter::once(child).chain(self.descendants(child)) {
            self.slot_mut(id)?.removed = false;
        }
        Ok(())
    }

    fn detach(&mut self, node: NodeId) -> DomResult<()> {
        if let Some(parent) = self.slot(node)?.parent {
            self.children_mut(parent)?.retain(|&c| c != node);
            self.slot_mut(node)?.parent = None;
        }
        Ok(())
    }

    /// Remove a subtree from the tree.
    ///
    /// Returns every node id in the removed subtree (including `node`) so
    /// that side tables keyed by node identity can drop their entries.
    pub fn remove(&mut self, node: NodeId) -> DomResult<Vec<NodeId>> {
        self.detach(node)?;

        let mut removed = vec![node];
        removed.extend(self.descendants(node));
        for &id in &removed {
            self.slot_mut(id)?.removed = true;
        }

        Ok(removed)
    }

    /// Whether the node is live and reachable from the document root
    pub fn is_attached(&self, node: NodeId) -> bool {
        let mut current = node;
        loop {
            match self.slots.get(current.0) {
                Some(slot) if !slot.removed => match slot.parent {
                    Some(parent) => current = parent,
                    None => return current == self.root,
                },
                _ => return false,
            }
        }
    }

    /// All descendants of `node` in document (pre-)order, excluding `node`
    pub fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(node).iter().rev().copied().collect();

        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.children(id).iter().rev().copied());
        }

        out
    }

    /// First descendant element with the given tag
    pub fn find_first_element(&self, node: NodeId, tag: &str) -> Option<NodeId> {
        self.descendants(node)
            .into_iter()
            .find(|&id| self.tag(id) == Some(tag))
    }

    /// Concatenated text of every text node under `node`
    pub fn text_content(&self, node: NodeId) -> String {
        if let Some(text) = self.text(node) {
            return text.to_string();
        }

        self.descendants(node)
            .into_iter()
            .filter_map(|id| self.text(id))
            .collect()
    }

    /// Serialise `node` and its subtree as HTML
    pub fn to_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.write_html(node, &mut out);
        out
    }

    fn write_html(&self, node: NodeId, out: &mut String) {
        match self.kind(node) {
            Some(NodeKind::Text(text)) => escape_into(text, false, out),
            Some(NodeKind::Element {
                tag,
                attributes,
                children,
            }) => {
                out.push('<');
                out.push_str(tag);
                for attr in attributes {
                    out.push(' ');
                    out.push_str(&attr.name);
                    out.push_str("=\"");
                    escape_into(&attr.value, true, out);
                    out.push('"');
                }
                out.push('>');

                if VOID_ELEMENTS.contains(&tag.as_str()) {
                    return;
                }

                for &child in children {
                    self.write_html(child, out);
                }
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
            None => {}
        }
    }
}

fn escape_into(value: &str, attribute: bool, out: &mut String) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
}
