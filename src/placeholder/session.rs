//! Per-post placeholder state

use crate::dom::{Document, NodeId};
use crate::store::ValueStore;

use super::controls::{find_controls, sync_control};
use super::engine::{ApplyStats, OriginalContent, SubstitutionEngine};
use super::registry::PlaceholderRegistry;
use super::types::{is_filled, PlaceholderError, PlaceholderResult, Placeholders, PostIdentifier};

/// Placeholder state of one rendered post instance
#[derive(Debug, Clone)]
pub struct PostPlaceholders {
    post: PostIdentifier,
    root: NodeId,
    placeholders: Placeholders,
    originals: OriginalContent,
}

impl PostPlaceholders {
    pub fn new(post: PostIdentifier, root: NodeId) -> Self {
        Self {
            post,
            root,
            placeholders: Placeholders::new(),
            originals: OriginalContent::new(),
        }
    }

    pub fn post(&self) -> &PostIdentifier {
        &self.post
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn placeholders(&self) -> &Placeholders {
        &self.placeholders
    }

    pub fn originals(&self) -> &OriginalContent {
        &self.originals
    }

    /// Register any new placeholder blocks under the post root
    pub fn scan(
        &mut self,
        doc: &mut Document,
        registry: &PlaceholderRegistry,
        store: &ValueStore,
    ) -> PlaceholderResult<Vec<String>> {
        Ok(registry.scan_into(doc, self.root, &self.post, store, &mut self.placeholders)?)
    }

    /// Full substitution pass over the post root
    pub fn apply(
        &mut self,
        doc: &mut Document,
        engine: &SubstitutionEngine,
    ) -> PlaceholderResult<ApplyStats> {
        Ok(engine.apply(doc, self.root, &self.placeholders, &mut self.originals)?)
    }

    /// Apply a value entered in the control bound to `key`.
    ///
    /// A filled value other than the default is persisted as typed. A
    /// cleared value, the `"none"` sentinel, or the default itself removes
    /// any persisted value and falls back to the default. Only select
    /// controls are synced back; an input keeps the reader's text.
    pub fn handle_change(
        &mut self,
        doc: &mut Document,
        key: &str,
        value: &str,
        store: &ValueStore,
        engine: &SubstitutionEngine,
    ) -> PlaceholderResult<ApplyStats> {
        let definition = self
            .placeholders
            .get_mut(key)
            .ok_or_else(|| PlaceholderError::UnknownKey(key.to_string()))?;

        let scoped = self.post.scoped_key(key);

        if is_filled(value) && definition.default_value.as_deref() != Some(value) {
            store.set(&scoped, value);
            definition.current_value = Some(value.to_string());
        } else {
            store.remove(&scoped);
            definition.reset();
        }

        tracing::debug!(
            post = %self.post,
            key = %key,
            filled = definition.replacement().is_some(),
            "Placeholder value changed"
        );

        for control in find_controls(doc, self.root, key) {
            sync_control(doc, control, definition)?;
        }

        self.apply(doc, engine)
    }

    /// Drop original-content entries for removed nodes
    pub fn forget(&mut self, removed: &[NodeId]) -> usize {
        self.originals.forget(removed)
    }
}
