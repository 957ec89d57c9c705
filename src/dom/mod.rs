//! Arena document model for rendered ("cooked") post content.
//!
//! This module provides:
//! - `Document`: an index-addressed node arena with stable `NodeId`s
//! - `SelectorList`: the small selector dialect used for eligibility policy
//! - A JSON fixture format and HTML serialisation for host integration
//!
//! # Example
//!
//! ```ignore
//! let mut doc = Document::new("div");
//! let p = doc.create_element("p");
//! let text = doc.create_text("BEFORE =KEY= AFTER");
//! doc.append_child(p, text)?;
//! doc.append_child(doc.root(), p)?;
//!
//! assert_eq!(doc.to_html(doc.root()), "<div><p>BEFORE =KEY= AFTER</p></div>");
//! ```

mod document;
mod fixture;
mod selector;

pub use document::{Attribute, Document, DomError, DomResult, NodeId, NodeKind};
pub use fixture::{FixtureError, FixtureNode, FixtureResult};
pub use selector::{SelectorError, SelectorList, SelectorResult};
