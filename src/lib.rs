// Supporting modules
pub mod config;
pub mod error;
pub mod metrics;
pub mod telemetry;

// Document model and persistence
pub mod dom;
pub mod store;

// Placeholder core
pub mod placeholder;
pub mod tasks;

// Host integration
pub mod host;
