use thiserror::Error;

use crate::dom::{FixtureError, SelectorError};
use crate::placeholder::{DirectiveError, PlaceholderError};
use crate::store::StoreError;
use crate::telemetry::TelemetryError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid selector policy: {0}")]
    Selector(#[from] SelectorError),

    #[error("Fixture error: {0}")]
    Fixture(#[from] FixtureError),

    #[error("Placeholder error: {0}")]
    Placeholder(#[from] PlaceholderError),

    #[error("Directive error: {0}")]
    Directive(#[from] DirectiveError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;
