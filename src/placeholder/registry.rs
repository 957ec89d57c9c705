//! Placeholder block discovery

use crate::dom::{Document, DomResult, NodeId};
use crate::metrics::RegistryMetrics;
use crate::store::ValueStore;

use super::controls::{build_control, insert_label};
use super::types::{PlaceholderDefinition, Placeholders, PostIdentifier, DEFAULT_DELIMITER};

const BLOCK_CLASS: &str = "d-wrap";
const BLOCK_WRAP: &str = "placeholder";

/// Marker added to a block once its label and control exist
pub const PROCESSED_CLASS: &str = "placeholdered";

/// Scans rendered posts for placeholder blocks.
#[derive(Debug, Clone)]
pub struct PlaceholderRegistry {
    default_delimiter: String,
}

impl Default for PlaceholderRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_DELIMITER)
    }
}

impl PlaceholderRegistry {
    pub fn new(default_delimiter: impl Into<String>) -> Self {
        Self {
            default_delimiter: default_delimiter.into(),
        }
    }

    pub fn default_delimiter(&self) -> &str {
        &self.default_delimiter
    }

    /// Whether `node` is a placeholder block not yet processed
    pub fn is_pending_block(doc: &Document, node: NodeId) -> bool {
        doc.has_class(node, BLOCK_CLASS)
            && doc.data(node, "wrap") == Some(BLOCK_WRAP)
            && !doc.has_class(node, PROCESSED_CLASS)
    }

    /// Definition described by a block's data attributes.
    ///
    /// Returns `None` when the block has no key.
    pub fn parse_block(&self, doc: &Document, block: NodeId) -> Option<PlaceholderDefinition> {
        let key = doc.data(block, "key").filter(|key| !key.is_empty())?;

        let delimiter = doc
            .data(block, "delimiter")
            .filter(|d| !d.is_empty())
            .unwrap_or(&self.default_delimiter);

        let alternatives: Vec<&str> = doc
            .data(block, "defaults")
            .unwrap_or_default()
            .split(',')
            .filter(|value| !value.is_empty())
            .collect();

        let mut definition = PlaceholderDefinition::new(key)
            .with_delimiter(delimiter)
            .with_alternatives(alternatives);

        if let Some(default) = doc.data(block, "default").filter(|v| !v.is_empty()) {
            definition = definition.with_default(default);
        }
        if let Some(description) = doc.data(block, "description").filter(|v| !v.is_empty()) {
            definition = definition.with_description(description);
        }

        Some(definition)
    }

    /// Process every pending block under `root`, adding new definitions to
    /// `placeholders`.
    ///
    /// Each processed block gets a label and an editor control and is marked
    /// so later scans skip it. A block without a key is marked and left bare. A key already in `placeholders` keeps its
    /// first definition; the later block still gets a control bound to it.
    /// Returns the keys that were newly registered.
    pub fn scan_into(
        &self,
        doc: &mut Document,
        root: NodeId,
        post: &PostIdentifier,
        store: &ValueStore,
        placeholders: &mut Placeholders,
    ) -> DomResult<Vec<String>> {
        let blocks: Vec<NodeId> = doc
            .descendants(root)
            .into_iter()
            .filter(|&id| Self::is_pending_block(doc, id))
            .collect();

        let mut registered = Vec::new();

        for block in blocks {
            let mut definition = match self.parse_block(doc, block) {
                Some(definition) => definition,
                None => {
                    // Marked so later scans of a streaming post pass over it
                    doc.add_class(block, PROCESSED_CLASS)?;
                    RegistryMetrics::record_skipped();
                    tracing::debug!(post = %post, block = %block, "Skipping placeholder block without key");
                    continue;
                }
            };

            definition.current_value = store
                .get(&post.scoped_key(&definition.key))
                .or_else(|| definition.default_value.clone());

            let key = definition.key.clone();
            if placeholders.insert(definition) {
                RegistryMetrics::record_registered();
                tracing::info!(post = %post, key = %key, "Registered placeholder");
                registered.push(key.clone());
            }

            // Bind the control to the winning definition for this key
            if let Some(bound) = placeholders.get(&key) {
                insert_label(doc, block, &key)?;
                build_control(doc, block, bound)?;
            }
            doc.add_class(block, PROCESSED_CLASS)?;
        }

        Ok(registered)
    }

    /// Scan into a fresh mapping
    pub fn scan(
        &self,
        doc: &mut Document,
        root: NodeId,
        post: &PostIdentifier,
        store: &ValueStore,
    ) -> DomResult<Placeholders> {
        let mut placeholders = Placeholders::new();
        self.scan_into(doc, root, post, store, &mut placeholders)?;
        Ok(placeholders)
    }
}
