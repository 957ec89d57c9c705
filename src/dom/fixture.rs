//! JSON fixture format for documents.
//!
//! A string is a text node; an object is an element:
//!
//! ```json
//! { "tag": "p", "attrs": { "class": "lead" }, "children": ["BEFORE =KEY= AFTER"] }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::document::{Document, DomError, NodeId, NodeKind};

/// Fixture-specific error type
#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("Invalid fixture JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Fixture root must be an element, found text")]
    TextRoot,

    #[error("Document error: {0}")]
    Dom(#[from] DomError),
}

/// Result type for fixture operations
pub type FixtureResult<T> = Result<T, FixtureError>;

/// Serialisable node tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FixtureNode {
    Text(String),
    Element {
        tag: String,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        attrs: BTreeMap<String, String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        children: Vec<FixtureNode>,
    },
}

impl FixtureNode {
    /// Shorthand for an element fixture
    pub fn element(tag: &str, attrs: &[(&str, &str)], children: Vec<FixtureNode>) -> Self {
        FixtureNode::Element {
            tag: tag.to_string(),
            attrs: attrs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            children,
        }
    }

    pub fn text(text: &str) -> Self {
        FixtureNode::Text(text.to_string())
    }
}

impl Document {
    /// Build a document whose root is the fixture's root element
    pub fn from_fixture(fixture: &FixtureNode) -> FixtureResult<Self> {
        let (tag, attrs, children) = match fixture {
            FixtureNode::Element {
                tag,
                attrs,
                children,
            } => (tag, attrs, children),
            FixtureNode::Text(_) => return Err(FixtureError::TextRoot),
        };

        let mut doc = Document::new(tag);
        let root = doc.root();
        for (name, value) in attrs {
            doc.set_attribute(root, name, value.as_str())?;
        }
        for child in children {
            let id = doc.build_fixture(child)?;
            doc.append_child(root, id)?;
        }

        Ok(doc)
    }

    pub fn from_json(json: &str) -> FixtureResult<Self> {
        let fixture: FixtureNode = serde_json::from_str(json)?;
        Self::from_fixture(&fixture)
    }

    fn build_fixture(&mut self, fixture: &FixtureNode) -> FixtureResult<NodeId> {
        match fixture {
            FixtureNode::Text(text) => Ok(self.create_text(text.as_str())),
            FixtureNode::Element {
                tag,
                attrs,
                children,
            } => {
                let id = self.create_element(tag);
                for (name, value) in attrs {
                    self.set_attribute(id, name, value.as_str())?;
                }
                for child in children {
                    let child_id = self.build_fixture(child)?;
                    self.append_child(id, child_id)?;
                }
                Ok(id)
            }
        }
    }

    /// Convert a subtree back to fixture form
    pub fn to_fixture(&self, node: NodeId) -> Option<FixtureNode> {
        match self.kind(node)? {
            NodeKind::Text(text) => Some(FixtureNode::Text(text.clone())),
            NodeKind::Element {
                tag,
                attributes,
                children,
            } => Some(FixtureNode::Element {
                tag: tag.clone(),
                attrs: attributes
                    .iter()
                    .map(|attr| (attr.name.clone(), attr.value.clone()))
                    .collect(),
                children: children
                    .iter()
                    .filter_map(|&child| self.to_fixture(child))
                    .collect(),
            }),
        }
    }
}
