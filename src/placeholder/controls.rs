//! Inline editor controls bound to placeholder keys.
//!
//! A control is either a free-text `input` or, when the block declares
//! alternative values, a `select`. Both carry `data-key` and
//! `data-delimiter` so change events can be routed back to their
//! definition.

use crate::dom::{Document, DomResult, NodeId};

use super::types::{PlaceholderDefinition, NONE_SENTINEL};

pub const LABEL_CLASS: &str = "discourse-placeholder-name";
pub const INPUT_CLASS: &str = "discourse-placeholder-value";
pub const SELECT_CLASS: &str = "discourse-placeholder-select";
pub const OPTION_CLASS: &str = "discourse-placeholder-option";

/// Prepend a label carrying the key name to the block.
///
/// The label goes into the block's first paragraph when the block has
/// authored content, otherwise directly into the block.
pub fn insert_label(doc: &mut Document, block: NodeId, key: &str) -> DomResult<NodeId> {
    let label = doc.create_element("span");
    doc.add_class(label, LABEL_CLASS)?;
    let text = doc.create_text(key);
    doc.append_child(label, text)?;

    let host = doc.find_first_element(block, "p").unwrap_or(block);
    doc.prepend_child(host, label)?;

    Ok(label)
}

/// Build and append the control for `definition` to `block`
pub fn build_control(
    doc: &mut Document,
    block: NodeId,
    definition: &PlaceholderDefinition,
) -> DomResult<NodeId> {
    let control = if definition.uses_select() {
        build_select(doc, definition)?
    } else {
        build_input(doc, definition)?
    };

    doc.append_child(block, control)?;
    Ok(control)
}

fn build_input(doc: &mut Document, definition: &PlaceholderDefinition) -> DomResult<NodeId> {
    let input = doc.create_element("input");
    doc.add_class(input, INPUT_CLASS)?;
    bind(doc, input, definition)?;

    if let Some(description) = &definition.description {
        doc.set_attribute(input, "placeholder", description.as_str())?;
    }
    if let Some(value) = &definition.current_value {
        doc.set_attribute(input, "value", value.as_str())?;
    }

    Ok(input)
}

fn build_select(doc: &mut Document, definition: &PlaceholderDefinition) -> DomResult<NodeId> {
    let select = doc.create_element("select");
    doc.add_class(select, SELECT_CLASS)?;
    bind(doc, select, definition)?;

    if let Some(description) = &definition.description {
        add_option(doc, select, NONE_SENTINEL, description)?;
    }

    for value in &definition.alternative_values {
        let option = add_option(doc, select, value, value)?;
        if definition.current_value.as_deref() == Some(value.as_str()) {
            doc.set_attribute(option, "selected", "true")?;
        }
    }

    Ok(select)
}

fn bind(doc: &mut Document, control: NodeId, definition: &PlaceholderDefinition) -> DomResult<()> {
    doc.set_data(control, "key", definition.key.as_str())?;
    doc.set_data(control, "delimiter", definition.delimiter.as_str())
}

fn add_option(doc: &mut Document, select: NodeId, value: &str, label: &str) -> DomResult<NodeId> {
    let option = doc.create_element("option");
    doc.add_class(option, OPTION_CLASS)?;
    doc.set_attribute(option, "value", value)?;
    let text = doc.create_text(label);
    doc.append_child(option, text)?;
    doc.append_child(select, option)?;
    Ok(option)
}

/// Every control under `root` bound to `key`
pub fn find_controls(doc: &Document, root: NodeId, key: &str) -> Vec<NodeId> {
    doc.descendants(root)
        .into_iter()
        .filter(|&id| doc.has_class(id, INPUT_CLASS) || doc.has_class(id, SELECT_CLASS))
        .filter(|&id| doc.data(id, "key") == Some(key))
        .collect()
}

/// Make a select reflect the definition's current value.
///
/// Text inputs are left alone: their value is whatever the reader typed.
pub fn sync_control(
    doc: &mut Document,
    control: NodeId,
    definition: &PlaceholderDefinition,
) -> DomResult<()> {
    if !doc.has_class(control, SELECT_CLASS) {
        return Ok(());
    }

    let current = definition.current_value.as_deref();
    let options: Vec<NodeId> = doc
        .children(control)
        .iter()
        .copied()
        .filter(|&id| doc.has_class(id, OPTION_CLASS))
        .collect();

    for option in options {
        let selected = current.is_some() && doc.attribute(option, "value") == current;
        if selected {
            doc.set_attribute(option, "selected", "true")?;
        } else {
            doc.remove_attribute(option, "selected")?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block_with_paragraph(doc: &mut Document) -> (NodeId, NodeId) {
        let block = doc.create_element("div");
        let p = doc.create_element("p");
        doc.append_child(block, p).unwrap();
        doc.append_child(doc.root(), block).unwrap();
        (block, p)
    }

    #[test]
    fn test_label_goes_into_first_paragraph() {
        let mut doc = Document::new("div");
        let (block, p) = block_with_paragraph(&mut doc);

        let label = insert_label(&mut doc, block, "KEY").unwrap();

        assert_eq!(doc.parent(label), Some(p));
        assert_eq!(doc.children(p)[0], label);
        assert_eq!(doc.text_content(label), "KEY");
        assert!(doc.has_class(label, LABEL_CLASS));
    }

    #[test]
    fn test_label_without_paragraph() {
        let mut doc = Document::new("div");
        let block = doc.create_element("div");
        doc.append_child(doc.root(), block).unwrap();

        let label = insert_label(&mut doc, block, "KEY").unwrap();
        assert_eq!(doc.parent(label), Some(block));
    }

    #[test]
    fn test_input_control() {
        let mut doc = Document::new("div");
        let (block, _) = block_with_paragraph(&mut doc);
        let definition = PlaceholderDefinition::new("KEY")
            .with_description("Your name")
            .with_current("foo");

        let input = build_control(&mut doc, block, &definition).unwrap();

        assert_eq!(doc.tag(input), Some("input"));
        assert_eq!(doc.data(input, "key"), Some("KEY"));
        assert_eq!(doc.data(input, "delimiter"), Some("="));
        assert_eq!(doc.attribute(input, "placeholder"), Some("Your name"));
        assert_eq!(doc.attribute(input, "value"), Some("foo"));
    }

    #[test]
    fn test_select_control_with_sentinel() {
        let mut doc = Document::new("div");
        let (block, _) = block_with_paragraph(&mut doc);
        let definition = PlaceholderDefinition::new("KEY")
            .with_description("Pick one")
            .with_alternatives(["a", "b"])
            .with_current("b");

        let select = build_control(&mut doc, block, &definition).unwrap();
        let options = doc.children(select).to_vec();

        assert_eq!(doc.tag(select), Some("select"));
        assert_eq!(options.len(), 3);
        assert_eq!(doc.attribute(options[0], "value"), Some("none"));
        assert_eq!(doc.text_content(options[0]), "Pick one");
        assert_eq!(doc.attribute(options[2], "selected"), Some("true"));
        assert_eq!(doc.attribute(options[1], "selected"), None);
    }

    #[test]
    fn test_select_without_description_has_no_sentinel() {
        let mut doc = Document::new("div");
        let (block, _) = block_with_paragraph(&mut doc);
        let definition = PlaceholderDefinition::new("KEY").with_alternatives(["a", "b"]);

        let select = build_control(&mut doc, block, &definition).unwrap();
        assert_eq!(doc.children(select).len(), 2);
        assert_eq!(doc.attribute(doc.children(select)[0], "value"), Some("a"));
    }

    #[test]
    fn test_sync_control() {
        let mut doc = Document::new("div");
        let (block, _) = block_with_paragraph(&mut doc);
        let mut definition = PlaceholderDefinition::new("KEY")
            .with_description("Pick one")
            .with_alternatives(["a", "b"])
            .with_current("a");
        let select = build_control(&mut doc, block, &definition).unwrap();

        definition.current_value = Some("b".to_string());
        sync_control(&mut doc, select, &definition).unwrap();

        let options = doc.children(select).to_vec();
        assert_eq!(doc.attribute(options[1], "selected"), None);
        assert_eq!(doc.attribute(options[2], "selected"), Some("true"));
        assert_eq!(find_controls(&doc, doc.root(), "KEY"), vec![select]);
        assert!(find_controls(&doc, doc.root(), "OTHER").is_empty());
    }

    #[test]
    fn test_sync_leaves_input_text() {
        let mut doc = Document::new("div");
        let (block, _) = block_with_paragraph(&mut doc);
        let mut definition = PlaceholderDefinition::new("KEY").with_default("foo");
        let input = build_control(&mut doc, block, &definition).unwrap();
        doc.set_attribute(input, "value", "half-typed").unwrap();

        definition.reset();
        sync_control(&mut doc, input, &definition).unwrap();

        assert_eq!(doc.attribute(input, "value"), Some("half-typed"));
    }
}
