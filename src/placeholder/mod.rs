// Placeholder definitions, substitution and per-post state

pub mod controls;
pub mod directive;
pub mod engine;
pub mod registry;
pub mod session;
pub mod substitution;
pub mod types;

pub use directive::{DirectiveError, DirectiveResult, PlaceholderDirective};
pub use engine::{ApplyStats, ContentSlot, OriginalContent, SubstitutionEngine};
pub use registry::{PlaceholderRegistry, PROCESSED_CLASS};
pub use session::PostPlaceholders;
pub use substitution::replace_tokens;
pub use types::{
    is_filled, PlaceholderDefinition, PlaceholderError, PlaceholderResult, Placeholders,
    PostIdentifier, PostMetadata, TokenRule, DEFAULT_DELIMITER, NONE_SENTINEL,
};
