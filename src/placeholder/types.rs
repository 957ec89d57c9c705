//! Placeholder types and error definitions

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dom::DomError;

/// Delimiter used when a block does not declare one
pub const DEFAULT_DELIMITER: &str = "=";

/// Select value meaning "use the default"
pub const NONE_SENTINEL: &str = "none";

/// Placeholder-specific error type
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlaceholderError {
    #[error("Unknown placeholder key: {0}")]
    UnknownKey(String),

    #[error("Document error: {0}")]
    Dom(#[from] DomError),
}

/// Result type for placeholder operations
pub type PlaceholderResult<T> = Result<T, PlaceholderError>;

/// Topic/post ids supplied by the host with each render
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PostMetadata {
    #[serde(rename = "topicId")]
    pub topic_id: u64,
    #[serde(rename = "postId")]
    pub post_id: u64,
}

/// Namespace for one rendered post instance: `"{topicId}-{postId}-"`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PostIdentifier(String);

impl PostIdentifier {
    pub fn new(metadata: PostMetadata) -> Self {
        Self(format!("{}-{}-", metadata.topic_id, metadata.post_id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Store key for a placeholder of this post
    pub fn scoped_key(&self, key: &str) -> String {
        format!("{}{}", self.0, key)
    }
}

impl From<PostMetadata> for PostIdentifier {
    fn from(metadata: PostMetadata) -> Self {
        Self::new(metadata)
    }
}

impl fmt::Display for PostIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A placeholder discovered in a rendered post
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderDefinition {
    /// Key, unique within one rendered post
    pub key: String,

    /// Character bounding the key to form its token
    pub delimiter: String,

    /// Value used when the reader has not supplied one
    pub default_value: Option<String>,

    /// Choices offered by a select control; empty for free text
    pub alternative_values: Vec<String>,

    /// Prompt shown by the control (optional)
    pub description: Option<String>,

    /// Value currently substituted into the post
    pub current_value: Option<String>,
}

impl PlaceholderDefinition {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            delimiter: DEFAULT_DELIMITER.to_string(),
            default_value: None,
            alternative_values: Vec::new(),
            description: None,
            current_value: None,
        }
    }

    pub fn with_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = delimiter.into();
        self
    }

    pub fn with_default(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn with_alternatives<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.alternative_values = values.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_current(mut self, value: impl Into<String>) -> Self {
        self.current_value = Some(value.into());
        self
    }

    /// The literal `delimiter + key + delimiter` searched for in content
    pub fn token(&self) -> String {
        format!("{}{}{}", self.delimiter, self.key, self.delimiter)
    }

    /// Text to substitute for the token, if the placeholder is filled
    pub fn replacement(&self) -> Option<&str> {
        self.current_value
            .as_deref()
            .filter(|value| is_filled(value))
    }

    /// Whether this placeholder is edited with a select control
    pub fn uses_select(&self) -> bool {
        !self.alternative_values.is_empty()
    }

    /// Reset the current value to the default
    pub fn reset(&mut self) {
        self.current_value = self.default_value.clone();
    }
}

/// Whether a raw control value counts as a supplied value
pub fn is_filled(value: &str) -> bool {
    !value.is_empty() && value != NONE_SENTINEL
}

/// One token and what it is replaced with during a pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRule {
    pub token: String,
    /// `None` leaves the token in place
    pub replacement: Option<String>,
}

/// Key → definition mapping for one rendered post
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Placeholders {
    definitions: BTreeMap<String, PlaceholderDefinition>,
}

impl Placeholders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a definition unless its key is already known.
    ///
    /// Returns `false` when the key existed; the first definition wins.
    pub fn insert(&mut self, definition: PlaceholderDefinition) -> bool {
        if self.definitions.contains_key(&definition.key) {
            return false;
        }
        self.definitions.insert(definition.key.clone(), definition);
        true
    }

    pub fn get(&self, key: &str) -> Option<&PlaceholderDefinition> {
        self.definitions.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut PlaceholderDefinition> {
        self.definitions.get_mut(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.definitions.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PlaceholderDefinition> {
        self.definitions.values()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.definitions.keys().map(String::as_str)
    }

    /// Token rules for every definition, filled or not
    pub fn token_rules(&self) -> Vec<TokenRule> {
        self.iter()
            .map(|definition| TokenRule {
                token: definition.token(),
                replacement: definition.replacement().map(str::to_string),
            })
            .collect()
    }

    /// Merge definitions from another scan, keeping existing keys
    pub fn extend(&mut self, other: Placeholders) -> Vec<String> {
        other
            .definitions
            .into_values()
            .filter_map(|definition| {
                let key = definition.key.clone();
                self.insert(definition).then_some(key)
            })
            .collect()
    }
}

impl FromIterator<PlaceholderDefinition> for Placeholders {
    fn from_iter<T: IntoIterator<Item = PlaceholderDefinition>>(iter: T) -> Self {
        let mut placeholders = Placeholders::new();
        for definition in iter {
            placeholders.insert(definition);
        }
        placeholders
    }
}
