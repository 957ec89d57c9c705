//! Minimal selector dialect for eligibility policy.
//!
//! Supported grammar: a comma-separated list of selectors, each a
//! whitespace-separated chain of compounds (descendant combinator). A
//! compound is `tag`, `.class`, or `tag.class[.class...]`.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use super::document::{Document, NodeId};

/// Selector-specific error type
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectorError {
    #[error("Empty selector in list: {0:?}")]
    Empty(String),

    #[error("Invalid selector {selector:?}: {reason}")]
    Invalid { selector: String, reason: String },
}

/// Result type for selector parsing
pub type SelectorResult<T> = Result<T, SelectorError>;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    classes: Vec<String>,
}

impl Compound {
    fn parse(raw: &str, selector: &str) -> SelectorResult<Self> {
        let invalid = |reason: &str| SelectorError::Invalid {
            selector: selector.to_string(),
            reason: reason.to_string(),
        };

        let mut pieces = raw.split('.');
        let tag = match pieces.next() {
            Some("") => None,
            Some(tag) => {
                if !tag.chars().all(|c| c.is_ascii_alphanumeric()) {
                    return Err(invalid("tag names must be alphanumeric"));
                }
                Some(tag.to_ascii_lowercase())
            }
            None => None,
        };

        let mut classes = Vec::new();
        for class in pieces {
            if class.is_empty() {
                return Err(invalid("empty class name"));
            }
            if !class
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
            {
                return Err(invalid("class names must be alphanumeric, dash, or underscore"));
            }
            classes.push(class.to_string());
        }

        if tag.is_none() && classes.is_empty() {
            return Err(invalid("empty compound"));
        }

        Ok(Self { tag, classes })
    }

    fn matches(&self, doc: &Document, node: NodeId) -> bool {
        let tag = match doc.tag(node) {
            Some(tag) => tag,
            None => return false,
        };

        if let Some(expected) = &self.tag {
            if expected != tag {
                return false;
            }
        }

        self.classes.iter().all(|class| doc.has_class(node, class))
    }
}

impl fmt::Display for Compound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(tag) = &self.tag {
            f.write_str(tag)?;
        }
        for class in &self.classes {
            write!(f, ".{}", class)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Selector {
    /// Outermost ancestor first, subject last
    chain: Vec<Compound>,
}

impl Selector {
    fn matches(&self, doc: &Document, node: NodeId) -> bool {
        let (subject, ancestors) = match self.chain.split_last() {
            Some(parts) => parts,
            None => return false,
        };

        if !subject.matches(doc, node) {
            return false;
        }

        // Nearest-ancestor matching is exact for descendant-only chains
        let mut current = doc.parent(node);
        for compound in ancestors.iter().rev() {
            loop {
                match current {
                    Some(id) if compound.matches(doc, id) => {
                        current = doc.parent(id);
                        break;
                    }
                    Some(id) => current = doc.parent(id),
                    None => return false,
                }
            }
        }

        true
    }
}

/// A parsed comma-separated selector list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorList {
    selectors: Vec<Selector>,
}

impl SelectorList {
    pub fn parse(list: &str) -> SelectorResult<Self> {
        let mut selectors = Vec::new();

        for raw in list.split(',') {
            let raw = raw.trim();
            if raw.is_empty() {
                return Err(SelectorError::Empty(list.to_string()));
            }

            let chain = raw
                .split_ascii_whitespace()
                .map(|part| Compound::parse(part, raw))
                .collect::<SelectorResult<Vec<_>>>()?;

            selectors.push(Selector { chain });
        }

        Ok(Self { selectors })
    }

    /// Whether `node` matches any selector in the list
    pub fn matches(&self, doc: &Document, node: NodeId) -> bool {
        self.selectors.iter().any(|s| s.matches(doc, node))
    }

    pub fn len(&self) -> usize {
        self.selectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selectors.is_empty()
    }
}

impl FromStr for SelectorList {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for SelectorList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, selector) in self.selectors.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            for (j, compound) in selector.chain.iter().enumerate() {
                if j > 0 {
                    f.write_str(" ")?;
                }
                write!(f, "{}", compound)?;
            }
        }
        Ok(())
    }
}
