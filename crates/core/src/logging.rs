//! # Structured Logging
//!
//! Subscriber setup for applications embedding the bootstrap pipeline.
//! Every component logs under the `weave` target prefix, so a filter such as
//! `weave=debug` shows per-item registration decisions.

use serde_json::{json, Value};
use std::io;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry};

use crate::bootstrap::ConfigurationInfo;
use crate::errors::BootstrapError;
use crate::registry::ItemKind;
use crate::stats::Stat;

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "warn")
    pub level: String,
    /// Enable JSON structured logging (vs plain text)
    pub json_format: bool,
    /// Enable pretty printing for development
    pub pretty_print: bool,
    /// Include file and line number information
    pub include_location: bool,
    /// Include timestamp in plain text logs
    pub include_timestamp: bool,
    /// Custom fields logged with the initialization message
    pub global_fields: serde_json::Map<String, Value>,
    /// Environment filter (supports complex filters like "weave=debug,weave::stats=info")
    pub env_filter: Option<String>,
    pub service_name: Option<String>,
    pub service_version: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            pretty_print: true,
            include_location: false,
            include_timestamp: true,
            global_fields: serde_json::Map::new(),
            env_filter: None,
            service_name: None,
            service_version: None,
        }
    }
}

impl LoggingConfig {
    /// Create production logging configuration
    pub fn production() -> Self {
        Self {
            level: "info".to_string(),
            json_format: true,
            pretty_print: false,
            include_location: false,
            include_timestamp: true,
            global_fields: env_field("production"),
            env_filter: Some("weave=info,weave::registry=warn".to_string()),
            service_name: None,
            service_version: None,
        }
    }

    /// Create development logging configuration
    pub fn development() -> Self {
        Self {
            level: "debug".to_string(),
            json_format: false,
            pretty_print: true,
            include_location: true,
            include_timestamp: true,
            global_fields: env_field("development"),
            env_filter: Some("weave=debug".to_string()),
            service_name: None,
            service_version: None,
        }
    }

    /// Create test logging configuration (minimal output)
    pub fn test() -> Self {
        Self {
            level: "error".to_string(),
            json_format: false,
            pretty_print: false,
            include_location: false,
            include_timestamp: false,
            global_fields: env_field("test"),
            env_filter: Some("weave=error".to_string()),
            service_name: None,
            service_version: None,
        }
    }

    /// Add a global field to the initialization message
    pub fn with_global_field<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        self.global_fields.insert(key.into(), value.into());
        self
    }

    /// Set service name and version
    pub fn with_service(mut self, name: &str, version: &str) -> Self {
        self.service_name = Some(name.to_string());
        self.service_version = Some(version.to_string());
        self
    }

    pub fn with_env_filter<S: Into<String>>(mut self, filter: S) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    fn filter(&self) -> Result<EnvFilter, BootstrapError> {
        let directives = self.env_filter.as_deref().unwrap_or(&self.level);
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(directives))
            .map_err(|e| BootstrapError::configuration(format!("Invalid log filter '{}': {}", directives, e)))
    }

    fn fmt_layer(&self) -> Box<dyn Layer<Registry> + Send + Sync> {
        let location = self.include_location;
        if self.json_format {
            fmt::layer()
                .with_writer(io::stdout)
                .with_file(location)
                .with_line_number(location)
                .json()
                .boxed()
        } else if self.pretty_print {
            fmt::layer()
                .with_writer(io::stdout)
                .with_file(location)
                .with_line_number(location)
                .pretty()
                .boxed()
        } else if self.include_timestamp {
            fmt::layer()
                .with_writer(io::stdout)
                .with_file(location)
                .with_line_number(location)
                .boxed()
        } else {
            fmt::layer()
                .with_writer(io::stdout)
                .with_file(location)
                .with_line_number(location)
                .without_time()
                .boxed()
        }
    }
}

fn env_field(env: &str) -> serde_json::Map<String, Value> {
    let mut fields = serde_json::Map::new();
    fields.insert("env".to_string(), json!(env));
    fields
}

/// Install the global subscriber.
///
/// Fails instead of panicking when a subscriber is already installed.
pub fn init_logging(config: LoggingConfig) -> Result<(), BootstrapError> {
    let filter = config.filter()?;
    tracing_subscriber::registry()
        .with(config.fmt_layer())
        .with(filter)
        .try_init()
        .map_err(|e| BootstrapError::configuration(format!("Logging is already initialized: {}", e)))?;

    if !config.global_fields.is_empty() {
        let mut init_msg = json!({
            "message": "Structured logging initialized",
            "config": {
                "level": config.level,
                "json_format": config.json_format,
                "pretty_print": config.pretty_print,
                "include_location": config.include_location,
            }
        });
        if let Some(name) = config.service_name {
            init_msg["service_name"] = json!(name);
        }
        if let Some(version) = config.service_version {
            init_msg["service_version"] = json!(version);
        }
        for (key, value) in config.global_fields {
            init_msg[key] = value;
        }
        tracing::info!(target: "weave::logging", "{}", init_msg);
    } else {
        tracing::info!(
            target: "weave::logging",
            "Structured logging initialized (level: {}, format: {})",
            config.level,
            if config.json_format { "JSON" } else { "text" }
        );
    }
    Ok(())
}

/// Structured one-line summary of a completed bootstrap
pub fn bootstrap_summary(info: &ConfigurationInfo) -> Value {
    let count = |kind| info.enabled(kind).len();
    json!({
        "event": "bootstrap_completed",
        "run_id": info.run_id().to_string(),
        "completed_at": info.completed_at().to_rfc3339(),
        "bundles": count(ItemKind::Bundle),
        "modules": count(ItemKind::Module),
        "installers": count(ItemKind::Installer),
        "extensions": count(ItemKind::Extension),
        "duration_ms": info.stats().time(Stat::OverallTime).as_millis() as u64,
    })
}

/// Log [`bootstrap_summary`] at info level
pub fn log_bootstrap_summary(info: &ConfigurationInfo) {
    tracing::info!(target: "weave::bootstrap", "{}", bootstrap_summary(info));
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_logging_config_presets() {
        let prod = LoggingConfig::production();
        assert!(prod.json_format);
        assert!(!prod.pretty_print);
        assert_eq!(prod.level, "info");
        assert!(prod.global_fields.contains_key("env"));

        let dev = LoggingConfig::development();
        assert!(!dev.json_format);
        assert!(dev.pretty_print);
        assert_eq!(dev.level, "debug");
        assert!(dev.include_location);

        let test = LoggingConfig::test();
        assert_eq!(test.level, "error");
        assert!(!test.include_timestamp);
    }

    #[test]
    fn test_logging_config_builder() {
        let config = LoggingConfig::default()
            .with_global_field("app", "inventory-service")
            .with_service("inventory", "1.0.0")
            .with_env_filter("weave=debug");

        assert_eq!(config.global_fields.get("app").unwrap(), "inventory-service");
        assert_eq!(config.service_name.unwrap(), "inventory");
        assert_eq!(config.service_version.unwrap(), "1.0.0");
        assert_eq!(config.env_filter.unwrap(), "weave=debug");
    }

    #[test]
    #[serial]
    fn test_second_init_is_an_error() {
        let _ = init_logging(LoggingConfig::test());
        let err = init_logging(LoggingConfig::test()).unwrap_err();
        assert!(err.is_configuration());
    }
}
