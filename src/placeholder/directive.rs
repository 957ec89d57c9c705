//! Authoring directive emitted into post source

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DirectiveError {
    #[error("Placeholder directive requires a key")]
    MissingKey,

    #[error("Placeholder directive field contains a reserved character: {0}")]
    InvalidValue(String),
}

/// Characters that would end an attribute or the opening tag early
const RESERVED: [char; 2] = ['"', ']'];

fn check_quotable(field: &str) -> DirectiveResult<()> {
    if field.contains(&RESERVED[..]) {
        return Err(DirectiveError::InvalidValue(field.to_string()));
    }
    Ok(())
}

pub type DirectiveResult<T> = Result<T, DirectiveError>;

/// Builder for a `[wrap=placeholder ...][/wrap]` block
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaceholderDirective {
    pub key: String,
    pub description: String,
    pub values: Vec<String>,
}

impl PlaceholderDirective {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Default::default()
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.values.push(value.into());
        self
    }

    /// Render the directive markup.
    ///
    /// One value is written as `default`, several as comma-joined `defaults`.
    pub fn render(&self) -> DirectiveResult<String> {
        let key = self.key.trim();
        if key.is_empty() {
            return Err(DirectiveError::MissingKey);
        }

        let description = self.description.trim();
        check_quotable(key)?;
        check_quotable(description)?;

        for value in &self.values {
            if value.contains(',') {
                return Err(DirectiveError::InvalidValue(value.clone()));
            }
            check_quotable(value)?;
        }

        let mut out = format!("[wrap=placeholder key=\"{}\"", key);

        if !description.is_empty() {
            out.push_str(&format!(" description=\"{}\"", description));
        }

        match self.values.as_slice() {
            [] => {}
            [single] => out.push_str(&format!(" default=\"{}\"", single)),
            many => out.push_str(&format!(" defaults=\"{}\"", many.join(","))),
        }

        out.push_str("][/wrap]");
        Ok(out)
    }
}
