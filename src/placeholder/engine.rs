//! Substitution engine over a rendered document

use std::collections::{HashMap, HashSet};

use crate::config::EngineConfig;
use crate::dom::{Document, DomResult, NodeId, SelectorList, SelectorResult};
use crate::metrics::EngineMetrics;

use super::substitution::replace_tokens;
use super::types::Placeholders;

/// Elements whose text is never rewritten
const OPAQUE_TAGS: &[&str] = &["input", "select", "option", "textarea", "script", "style"];

/// Attribute rewritten on anchors
const LINK_ATTRIBUTE: &str = "href";

/// Identity of a piece of rewritable content
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ContentSlot {
    Text(NodeId),
    Attribute(NodeId, String),
}

impl ContentSlot {
    pub fn node(&self) -> NodeId {
        match self {
            ContentSlot::Text(node) | ContentSlot::Attribute(node, _) => *node,
        }
    }
}

/// Text each slot held the first time a pass observed it.
///
/// Every pass recomputes from these originals, never from previously
/// substituted content.
#[derive(Debug, Clone, Default)]
pub struct OriginalContent {
    entries: HashMap<ContentSlot, String>,
}

impl OriginalContent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, slot: &ContentSlot) -> Option<&str> {
        self.entries.get(slot).map(String::as_str)
    }

    /// Recorded original for `slot`, recording `current` on first sight
    fn original_or_record(&mut self, slot: ContentSlot, current: &str) -> &str {
        self.entries
            .entry(slot)
            .or_insert_with(|| current.to_string())
    }

    /// Drop entries belonging to removed nodes
    pub fn forget(&mut self, removed: &[NodeId]) -> usize {
        let removed: HashSet<NodeId> = removed.iter().copied().collect();
        let before = self.entries.len();
        self.entries.retain(|slot, _| !removed.contains(&slot.node()));
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Outcome of one `apply` pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyStats {
    pub text_nodes_rewritten: usize,
    pub attributes_rewritten: usize,
}

impl ApplyStats {
    /// Whether the pass changed nothing
    pub fn is_noop(&self) -> bool {
        self.text_nodes_rewritten == 0 && self.attributes_rewritten == 0
    }
}

/// Rewrites placeholder tokens in eligible text and link targets
#[derive(Debug, Clone)]
pub struct SubstitutionEngine {
    eligible: SelectorList,
}

impl SubstitutionEngine {
    pub fn new(eligible: SelectorList) -> Self {
        Self { eligible }
    }

    pub fn from_config(config: &EngineConfig) -> SelectorResult<Self> {
        Ok(Self::new(SelectorList::parse(&config.eligible_selectors)?))
    }

    pub fn eligible(&self) -> &SelectorList {
        &self.eligible
    }

    /// Bring every eligible text node and anchor `href` under `root` to the
    /// state implied by `placeholders`.
    ///
    /// Idempotent: a second call with the same mapping writes nothing.
    pub fn apply(
        &self,
        doc: &mut Document,
        root: NodeId,
        placeholders: &Placeholders,
        originals: &mut OriginalContent,
    ) -> DomResult<ApplyStats> {
        let mut stats = ApplyStats::default();
        if placeholders.is_empty() {
            return Ok(stats);
        }

        let rules = placeholders.token_rules();

        for node in self.eligible_text_nodes(doc, root) {
            let current = match doc.text(node) {
                Some(text) => text.to_string(),
                None => continue,
            };

            let original = originals.original_or_record(ContentSlot::Text(node), &current);
            let rewritten = replace_tokens(original, &rules);

            if rewritten != current {
                doc.set_text(node, rewritten)?;
                stats.text_nodes_rewritten += 1;
            }
        }

        for anchor in Self::anchors(doc, root) {
            let current = match doc.attribute(anchor, LINK_ATTRIBUTE) {
                Some(href) => href.to_string(),
                None => continue,
            };

            let slot = ContentSlot::Attribute(anchor, LINK_ATTRIBUTE.to_string());
            let original = originals.original_or_record(slot, &current);
            let rewritten = replace_tokens(original, &rules);

            if rewritten != current {
                doc.set_attribute(anchor, LINK_ATTRIBUTE, rewritten)?;
                stats.attributes_rewritten += 1;
            }
        }

        EngineMetrics::record_pass(stats.text_nodes_rewritten, stats.attributes_rewritten);
        tracing::debug!(
            root = %root,
            placeholders = placeholders.len(),
            text_nodes_rewritten = stats.text_nodes_rewritten,
            attributes_rewritten = stats.attributes_rewritten,
            "Substitution pass completed"
        );

        Ok(stats)
    }

    /// Text nodes under eligible elements, each listed once, in document order
    fn eligible_text_nodes(&self, doc: &Document, root: NodeId) -> Vec<NodeId> {
        let mut seen = HashSet::new();
        let mut nodes = Vec::new();

        let candidates = std::iter::once(root).chain(doc.descendants(root));
        for element in candidates.filter(|&id| self.eligible.matches(doc, id)) {
            collect_text_nodes(doc, element, &mut seen, &mut nodes);
        }

        nodes
    }

    fn anchors(doc: &Document, root: NodeId) -> Vec<NodeId> {
        std::iter::once(root)
            .chain(doc.descendants(root))
            .filter(|&id| doc.tag(id) == Some("a"))
            .collect()
    }
}

fn collect_text_nodes(
    doc: &Document,
    node: NodeId,
    seen: &mut HashSet<NodeId>,
    out: &mut Vec<NodeId>,
) {
    for &child in doc.children(node) {
        if doc.text(child).is_some() {
            if seen.insert(child) {
                out.push(child);
            }
            continue;
        }

        match doc.tag(child) {
            Some(tag) if OPAQUE_TAGS.contains(&tag) => {}
            Some(_) => collect_text_nodes(doc, child, seen, out),
            None => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_ELIGIBLE_SELECTORS;
    use crate::placeholder::PlaceholderDefinition;

    fn engine() -> SubstitutionEngine {
        SubstitutionEngine::new(SelectorList::parse(DEFAULT_ELIGIBLE_SELECTORS).unwrap())
    }

    fn doc_with(tag: &str, text: &str) -> (Document, NodeId) {
        let mut doc = Document::new("div");
        let el = doc.create_element(tag);
        let t = doc.create_text(text);
        doc.append_child(el, t).unwrap();
        doc.append_child(doc.root(), el).unwrap();
        (doc, t)
    }

    fn set(placeholders: &mut Placeholders, key: &str, value: Option<&str>) {
        let definition = placeholders.get_mut(key).unwrap();
        definition.current_value = value.map(str::to_string);
    }

    #[test]
    fn test_round_trip() {
        let (mut doc, text) = doc_with("p", "BEFORE =KEY= AFTER");
        let mut placeholders: Placeholders =
            vec![PlaceholderDefinition::new("KEY")].into_iter().collect();
        let mut originals = OriginalContent::new();
        let root = doc.root();

        set(&mut placeholders, "KEY", Some("foo"));
        engine().apply(&mut doc, root, &placeholders, &mut originals).unwrap();
        assert_eq!(doc.text(text), Some("BEFORE foo AFTER"));

        set(&mut placeholders, "KEY", None);
        engine().apply(&mut doc, root, &placeholders, &mut originals).unwrap();
        assert_eq!(doc.text(text), Some("BEFORE =KEY= AFTER"));
    }

    #[test]
    fn test_idempotent() {
        let (mut doc, _) = doc_with("p", "BEFORE =KEY= AFTER");
        let placeholders: Placeholders =
            vec![PlaceholderDefinition::new("KEY").with_current("foo")]
                .into_iter()
                .collect();
        let mut originals = OriginalContent::new();
        let root = doc.root();

        let first = engine().apply(&mut doc, root, &placeholders, &mut originals).unwrap();
        let second = engine().apply(&mut doc, root, &placeholders, &mut originals).unwrap();

        assert_eq!(first.text_nodes_rewritten, 1);
        assert!(second.is_noop());
    }

    #[test]
    fn test_multi_key_independence() {
        let (mut doc, text) = doc_with("p", "=A= =B=");
        let mut placeholders: Placeholders =
            vec![PlaceholderDefinition::new("A"), PlaceholderDefinition::new("B")]
                .into_iter()
                .collect();
        let mut originals = OriginalContent::new();
        let root = doc.root();

        set(&mut placeholders, "A", Some("foo"));
        engine().apply(&mut doc, root, &placeholders, &mut originals).unwrap();
        assert_eq!(doc.text(text), Some("foo =B="));

        set(&mut placeholders, "B", Some("bar"));
        engine().apply(&mut doc, root, &placeholders, &mut originals).unwrap();
        assert_eq!(doc.text(text), Some("foo bar"));
    }

    #[test]
    fn test_href_rewritten_without_residue() {
        let mut doc = Document::new("div");
        let a = doc.create_element("a");
        doc.set_attribute(a, "href", "https://example.com/=KEY=").unwrap();
        doc.append_child(doc.root(), a).unwrap();
        let root = doc.root();

        let mut placeholders: Placeholders =
            vec![PlaceholderDefinition::new("KEY")].into_iter().collect();
        let mut originals = OriginalContent::new();

        set(&mut placeholders, "KEY", Some("foo"));
        let stats = engine().apply(&mut doc, root, &placeholders, &mut originals).unwrap();
        assert_eq!(stats.attributes_rewritten, 1);
        assert_eq!(doc.attribute(a, "href"), Some("https://example.com/foo"));

        set(&mut placeholders, "KEY", Some("bar"));
        engine().apply(&mut doc, root, &placeholders, &mut originals).unwrap();
        assert_eq!(doc.attribute(a, "href"), Some("https://example.com/bar"));
    }

    #[test]
    fn test_ineligible_elements_untouched() {
        let (mut doc, text) = doc_with("div", "=KEY=");
        let placeholders: Placeholders =
            vec![PlaceholderDefinition::new("KEY").with_current("foo")]
                .into_iter()
                .collect();
        let mut originals = OriginalContent::new();
        let root = doc.root();

        let stats = engine().apply(&mut doc, root, &placeholders, &mut originals).unwrap();
        assert!(stats.is_noop());
        assert_eq!(doc.text(text), Some("=KEY="));
        assert!(originals.is_empty());
    }

    #[test]
    fn test_nested_eligible_text_visited_once() {
        let mut doc = Document::new("div");
        let p = doc.create_element("p");
        let code = doc.create_element("code");
        let text = doc.create_text("=KEY=");
        doc.append_child(code, text).unwrap();
        doc.append_child(p, code).unwrap();
        doc.append_child(doc.root(), p).unwrap();
        let root = doc.root();

        let placeholders: Placeholders =
            vec![PlaceholderDefinition::new("KEY").with_current("foo")]
                .into_iter()
                .collect();
        let mut originals = OriginalContent::new();

        let stats = engine().apply(&mut doc, root, &placeholders, &mut originals).unwrap();
        assert_eq!(stats.text_nodes_rewritten, 1);
        assert_eq!(doc.text(text), Some("foo"));
    }

    #[test]
    fn test_option_text_inside_eligible_element_untouched() {
        let mut doc = Document::new("div");
        let p = doc.create_element("p");
        let select = doc.create_element("select");
        let option = doc.create_element("option");
        let text = doc.create_text("=KEY=");
        doc.append_child(option, text).unwrap();
        doc.append_child(select, option).unwrap();
        doc.append_child(p, select).unwrap();
        doc.append_child(doc.root(), p).unwrap();
        let root = doc.root();

        let placeholders: Placeholders =
            vec![PlaceholderDefinition::new("KEY").with_current("foo")]
                .into_iter()
                .collect();
        let mut originals = OriginalContent::new();

        engine().apply(&mut doc, root, &placeholders, &mut originals).unwrap();
        assert_eq!(doc.text(text), Some("=KEY="));
    }

    #[test]
    fn test_forget_drops_removed_nodes() {
        let (mut doc, text) = doc_with("p", "=KEY=");
        let placeholders: Placeholders =
            vec![PlaceholderDefinition::new("KEY").with_current("foo")]
                .into_iter()
                .collect();
        let mut originals = OriginalContent::new();
        let root = doc.root();

        engine().apply(&mut doc, root, &placeholders, &mut originals).unwrap();
        assert_eq!(originals.get(&ContentSlot::Text(text)), Some("=KEY="));

        let p = doc.parent(text).unwrap();
        let removed = doc.remove(p).unwrap();
        assert_eq!(originals.forget(&removed), 1);
        assert!(originals.is_empty());
    }

    #[test]
    fn test_empty_mapping_is_noop() {
        let (mut doc, _) = doc_with("p", "=KEY=");
        let mut originals = OriginalContent::new();
        let root = doc.root();

        let stats = engine()
            .apply(&mut doc, root, &Placeholders::new(), &mut originals)
            .unwrap();
        assert!(stats.is_noop());
    }
}
