//! Configuration loading and typed config structures for buzzer.
//!
//! The canonical configuration lives in `buzzer-config.yaml` next to the
//! binary's working directory. This module defines strongly-typed structs
//! that mirror the YAML structure, and provides a loader that reads and
//! validates the file. Every field has a default, so an empty file (or no
//! file at all) yields a working configuration.

use std::path::Path;

use serde::Deserialize;
use tracing::warn;

/// Environment variable overriding `server.port`.
pub const ENV_PORT: &str = "BUZZER_PORT";

/// Environment variable overriding `engine.queue_capacity`.
pub const ENV_QUEUE_CAPACITY: &str = "BUZZER_QUEUE_CAPACITY";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value parsed but is out of range.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// Explanation of what is wrong with the configuration.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level configuration.
///
/// Mirrors the structure of `buzzer-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct BuzzerConfig {
    /// Engine queue and reporting settings.
    #[serde(default)]
    pub engine: EngineConfig,

    /// HTTP bind settings.
    #[serde(default)]
    pub server: ServerSettings,

    /// Synthetic load generator settings.
    #[serde(default)]
    pub loadgen: LoadgenSettings,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl BuzzerConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override YAML values:
    /// - `BUZZER_PORT` overrides `server.port`
    /// - `BUZZER_QUEUE_CAPACITY` overrides `engine.queue_capacity`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string, then apply environment
    /// overrides and validate.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        // serde_yml rejects an empty document; treat it as "all defaults".
        let mut config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yml::from_str(yaml)?
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Override values with environment variables when set.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Override values using an arbitrary key lookup.
    ///
    /// Unparseable values are logged and ignored.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_PORT) {
            match raw.trim().parse::<u16>() {
                Ok(port) => self.server.port = port,
                Err(e) => warn!(var = ENV_PORT, value = %raw, error = %e, "Ignoring invalid override"),
            }
        }
        if let Some(raw) = lookup(ENV_QUEUE_CAPACITY) {
            match raw.trim().parse::<usize>() {
                Ok(capacity) => self.engine.queue_capacity = capacity,
                Err(e) => {
                    warn!(var = ENV_QUEUE_CAPACITY, value = %raw, error = %e, "Ignoring invalid override");
                }
            }
        }
    }

    /// Check that every value is within its allowed range.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.engine.queue_capacity == 0 {
            return Err(invalid("engine.queue_capacity must be at least 1"));
        }
        if self.engine.notification_capacity == 0 {
            return Err(invalid("engine.notification_capacity must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.loadgen.correct_probability) {
            return Err(invalid("loadgen.correct_probability must be within [0, 1]"));
        }
        if self.loadgen.min_delay_ms > self.loadgen.max_delay_ms {
            return Err(invalid("loadgen.min_delay_ms must not exceed loadgen.max_delay_ms"));
        }
        Ok(())
    }
}

fn invalid(reason: &str) -> ConfigError {
    ConfigError::Invalid {
        reason: reason.to_owned(),
    }
}

/// Engine queue and reporting settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EngineConfig {
    /// Slots in the bounded event queue. A full queue sends submissions
    /// down the inline path.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Milliseconds between live stats reports. `0` disables the reporter.
    #[serde(default = "default_report_interval_ms")]
    pub report_interval_ms: u64,

    /// Buffered notifications per live subscriber before it starts lagging.
    #[serde(default = "default_notification_capacity")]
    pub notification_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            report_interval_ms: default_report_interval_ms(),
            notification_capacity: default_notification_capacity(),
        }
    }
}

/// HTTP bind settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerSettings {
    /// Host address to bind (e.g. `0.0.0.0`).
    #[serde(default = "default_host")]
    pub host: String,

    /// TCP port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Synthetic load generator settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LoadgenSettings {
    /// Number of simulated participants.
    #[serde(default = "default_users")]
    pub users: u32,

    /// Probability that a simulated participant answers correctly.
    #[serde(default = "default_correct_probability")]
    pub correct_probability: f64,

    /// Lower bound of the random think time before submitting.
    #[serde(default = "default_min_delay_ms")]
    pub min_delay_ms: u64,

    /// Upper bound of the random think time before submitting.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Per-request HTTP timeout.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for LoadgenSettings {
    fn default() -> Self {
        Self {
            users: default_users(),
            correct_probability: default_correct_probability(),
            min_delay_ms: default_min_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error) used when `RUST_LOG`
    /// is not set.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

const fn default_queue_capacity() -> usize {
    1000
}

const fn default_report_interval_ms() -> u64 {
    5000
}

const fn default_notification_capacity() -> usize {
    256
}

fn default_host() -> String {
    "0.0.0.0".to_owned()
}

const fn default_port() -> u16 {
    8080
}

const fn default_users() -> u32 {
    1000
}

const fn default_correct_probability() -> f64 {
    0.3
}

const fn default_min_delay_ms() -> u64 {
    10
}

const fn default_max_delay_ms() -> u64 {
    1000
}

const fn default_request_timeout_ms() -> u64 {
    5000
}

fn default_log_level() -> String {
    "info".to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_key: &str) -> Option<String> {
        None
    }

    #[test]
    fn default_config_is_valid() {
        let config = BuzzerConfig::default();
        assert_eq!(config.engine.queue_capacity, 1000);
        assert_eq!(config.engine.report_interval_ms, 5000);
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.loadgen.users, 1000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parse_full_yaml() {
        let yaml = r#"
engine:
  queue_capacity: 64
  report_interval_ms: 0
  notification_capacity: 16

server:
  host: "127.0.0.1"
  port: 9090

loadgen:
  users: 50
  correct_probability: 0.5
  min_delay_ms: 1
  max_delay_ms: 5
  request_timeout_ms: 1000

logging:
  level: "debug"
"#;
        let mut config: BuzzerConfig = serde_yml::from_str(yaml).unwrap_or_default();
        config.apply_overrides_from(no_env);

        assert_eq!(config.engine.queue_capacity, 64);
        assert_eq!(config.engine.report_interval_ms, 0);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.loadgen.users, 50);
        assert_eq!(config.logging.level, "debug");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parse_minimal_yaml() {
        let yaml = "engine:\n  queue_capacity: 5\n";
        let config: BuzzerConfig = serde_yml::from_str(yaml).unwrap_or_default();

        assert_eq!(config.engine.queue_capacity, 5);
        // Everything else uses defaults
        assert_eq!(config.engine.report_interval_ms, 5000);
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn parse_empty_yaml() {
        let config = BuzzerConfig::parse("");
        assert!(config.is_ok());
    }

    #[test]
    fn overrides_apply_when_present() {
        let mut config = BuzzerConfig::default();
        config.apply_overrides_from(|key| match key {
            ENV_PORT => Some("9999".to_owned()),
            ENV_QUEUE_CAPACITY => Some(" 12 ".to_owned()),
            _ => None,
        });
        assert_eq!(config.server.port, 9999);
        assert_eq!(config.engine.queue_capacity, 12);
    }

    #[test]
    fn unparseable_override_is_ignored() {
        let mut config = BuzzerConfig::default();
        config.apply_overrides_from(|key| (key == ENV_PORT).then(|| "not-a-port".to_owned()));
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn zero_queue_capacity_is_rejected() {
        let mut config = BuzzerConfig::default();
        config.engine.queue_capacity = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn probability_out_of_range_is_rejected() {
        let mut config = BuzzerConfig::default();
        config.loadgen.correct_probability = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn inverted_delay_bounds_are_rejected() {
        let mut config = BuzzerConfig::default();
        config.loadgen.min_delay_ms = 100;
        config.loadgen.max_delay_ms = 10;
        assert!(config.validate().is_err());
    }

    #[test]
    fn malformed_yaml_is_an_error() {
        let config = BuzzerConfig::parse("engine: [unterminated");
        assert!(matches!(config, Err(ConfigError::Yaml { .. })));
    }

    #[test]
    fn load_project_config_file() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("buzzer-config.yaml");
        if path.exists() {
            let config = BuzzerConfig::from_file(&path);
            assert!(config.is_ok(), "Failed to load project config: {config:?}");
        }
    }
}
