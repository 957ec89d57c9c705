use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

/// Eligible text-bearing elements for substitution
pub const DEFAULT_ELIGIBLE_SELECTORS: &str =
    "h1, h2, h3, h4, h5, h6, p, code, blockquote, .md-table, li p";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Backend type: "memory" or "redis"
    #[serde(default = "default_store_backend")]
    pub backend: String,
    /// Prefix prepended to every persisted key
    #[serde(default = "default_store_prefix")]
    pub prefix: String,
    /// Sliding expiry window in seconds
    #[serde(default = "default_ttl_seconds")]
    pub ttl_seconds: u64,
    #[serde(default = "default_redis_url")]
    pub redis_url: String,
    /// Redis key namespace (keeps SCAN away from unrelated keys)
    #[serde(default = "default_redis_namespace")]
    pub redis_namespace: String,
}

fn default_store_backend() -> String {
    "memory".to_string()
}

fn default_store_prefix() -> String {
    "d-placeholder-".to_string()
}

fn default_ttl_seconds() -> u64 {
    7 * 24 * 60 * 60 // 7 days
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_redis_namespace() -> String {
    "placeholders:".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Selector list of elements whose text may be rewritten
    #[serde(default = "default_eligible_selectors")]
    pub eligible_selectors: String,
    /// Delimiter used when a block does not declare one
    #[serde(default = "default_delimiter")]
    pub default_delimiter: String,
}

fn default_eligible_selectors() -> String {
    DEFAULT_ELIGIBLE_SELECTORS.to_string()
}

fn default_delimiter() -> String {
    "=".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    /// Debounce window for control change events in milliseconds
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// Delay before the first substitution pass of a rendered post
    #[serde(default = "default_initial_pass_delay_ms")]
    pub initial_pass_delay_ms: u64,
}

fn default_debounce_ms() -> u64 {
    150
}

fn default_initial_pass_delay_ms() -> u64 {
    500
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// Default filter directive when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Output format: "pretty" or "json"
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        // Load .env file if exists
        let _ = dotenvy::dotenv();

        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let builder = Config::builder()
            // Start with default values
            .set_default("store.backend", default_store_backend())?
            .set_default("store.prefix", default_store_prefix())?
            .set_default("store.ttl_seconds", default_ttl_seconds())?
            .set_default("store.redis_url", default_redis_url())?
            .set_default("store.redis_namespace", default_redis_namespace())?
            .set_default("engine.eligible_selectors", DEFAULT_ELIGIBLE_SELECTORS)?
            .set_default("engine.default_delimiter", default_delimiter())?
            .set_default("scheduler.debounce_ms", default_debounce_ms())?
            .set_default("scheduler.initial_pass_delay_ms", default_initial_pass_delay_ms())?
            .set_default("log.level", default_log_level())?
            .set_default("log.format", default_log_format())?
            // Load config file if exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Load from environment variables
            // PLACEHOLDER_STORE__BACKEND, PLACEHOLDER_SCHEDULER__DEBOUNCE_MS, etc.
            .add_source(
                Environment::with_prefix("PLACEHOLDER")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_store_backend(),
            prefix: default_store_prefix(),
            ttl_seconds: default_ttl_seconds(),
            redis_url: default_redis_url(),
            redis_namespace: default_redis_namespace(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            eligible_selectors: default_eligible_selectors(),
            default_delimiter: default_delimiter(),
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            initial_pass_delay_ms: default_initial_pass_delay_ms(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let settings = Settings::default();
        assert_eq!(settings.store.backend, "memory");
        assert_eq!(settings.store.prefix, "d-placeholder-");
        assert_eq!(settings.store.ttl_seconds, 604_800);
        assert_eq!(settings.engine.default_delimiter, "=");
        assert_eq!(settings.scheduler.debounce_ms, 150);
        assert_eq!(settings.scheduler.initial_pass_delay_ms, 500);
        assert_eq!(settings.log.format, "pretty");
    }

    #[test]
    fn test_partial_sections_fill_defaults() {
        let settings: Settings = serde_json::from_str(
            r#"{"store": {"backend": "redis"}, "scheduler": {"debounce_ms": 10}}"#,
        )
        .unwrap();

        assert_eq!(settings.store.backend, "redis");
        assert_eq!(settings.store.prefix, "d-placeholder-");
        assert_eq!(settings.scheduler.debounce_ms, 10);
        assert_eq!(settings.scheduler.initial_pass_delay_ms, 500);
        assert_eq!(settings.engine.eligible_selectors, DEFAULT_ELIGIBLE_SELECTORS);
    }
}
