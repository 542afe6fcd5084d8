//! Relay configuration loading from file and environment variables.

use std::time::Duration;

use nodelog_channel::ChannelConfig;
use nodelog_db::DbSettings;
use serde::Deserialize;
use thiserror::Error;

/// Top-level relay configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub collector: CollectorConfig,

    #[serde(default)]
    pub sink: SinkConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Durable store settings.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,

    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    #[serde(default = "default_pool_max_size")]
    pub pool_max_size: u32,
}

/// Realtime collector connection settings.
#[derive(Debug, Clone, Deserialize)]
pub struct CollectorConfig {
    /// WebSocket URL of the collector (`ws://` or `wss://`).
    #[serde(default = "default_collector_url")]
    pub url: String,

    /// Shared secret for the authentication handshake. Required.
    #[serde(default)]
    pub token: Option<String>,

    /// Node identity for the authentication handshake. Required.
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,

    #[serde(default = "default_ping_interval_ms")]
    pub ping_interval_ms: u64,

    #[serde(default = "default_liveness_threshold_ms")]
    pub liveness_threshold_ms: u64,

    #[serde(default = "default_outbound_capacity")]
    pub outbound_capacity: usize,
}

/// Durable sink queue settings.
#[derive(Debug, Clone, Deserialize)]
pub struct SinkConfig {
    /// Envelopes buffered ahead of the writer before appends are dropped.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "nodelog_channel=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

fn default_db_path() -> String {
    "nodelog.db".to_string()
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

fn default_pool_max_size() -> u32 {
    4
}

fn default_collector_url() -> String {
    "ws://127.0.0.1:8080".to_string()
}

fn default_reconnect_delay_ms() -> u64 {
    5000
}

fn default_ping_interval_ms() -> u64 {
    5000
}

fn default_liveness_threshold_ms() -> u64 {
    10_000
}

fn default_outbound_capacity() -> usize {
    256
}

fn default_queue_capacity() -> usize {
    1024
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
            pool_max_size: default_pool_max_size(),
        }
    }
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            url: default_collector_url(),
            token: None,
            name: None,
            reconnect_delay_ms: default_reconnect_delay_ms(),
            ping_interval_ms: default_ping_interval_ms(),
            liveness_threshold_ms: default_liveness_threshold_ms(),
            outbound_capacity: default_outbound_capacity(),
        }
    }
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// A collector credential is absent or empty.
    #[error("missing required setting {0}")]
    MissingCredential(&'static str),

    /// A collector timing cannot drive the connection loop.
    #[error("invalid collector timing: {0}")]
    InvalidTiming(&'static str),
}

impl Config {
    /// Builds the realtime channel settings.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingCredential` if `collector.token` or
    /// `collector.name` is absent or blank, and `ConfigError::InvalidTiming`
    /// if a timing is zero or the liveness threshold does not exceed the
    /// ping interval.
    pub fn channel_config(&self) -> Result<ChannelConfig, ConfigError> {
        let c = &self.collector;
        let token = required(c.token.as_deref(), "collector.token")?;
        let name = required(c.name.as_deref(), "collector.name")?;

        if c.reconnect_delay_ms == 0 {
            return Err(ConfigError::InvalidTiming(
                "collector.reconnect_delay_ms must be greater than zero",
            ));
        }
        if c.ping_interval_ms == 0 {
            return Err(ConfigError::InvalidTiming(
                "collector.ping_interval_ms must be greater than zero",
            ));
        }
        if c.liveness_threshold_ms <= c.ping_interval_ms {
            return Err(ConfigError::InvalidTiming(
                "collector.liveness_threshold_ms must exceed collector.ping_interval_ms",
            ));
        }

        Ok(ChannelConfig {
            reconnect_delay: Duration::from_millis(c.reconnect_delay_ms),
            ping_interval: Duration::from_millis(c.ping_interval_ms),
            liveness_threshold: Duration::from_millis(c.liveness_threshold_ms),
            outbound_capacity: c.outbound_capacity.max(1),
            ..ChannelConfig::new(token, name)
        })
    }

    pub fn db_settings(&self) -> DbSettings {
        DbSettings {
            path: self.database.path.clone(),
            busy_timeout_ms: self.database.busy_timeout_ms,
            pool_max_size: self.database.pool_max_size,
        }
    }

    /// Applies `NODELOG_*` overrides read through `var`.
    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(path) = var("NODELOG_DB_PATH") {
            self.database.path = path;
        }
        if let Some(url) = var("NODELOG_COLLECTOR_URL") {
            self.collector.url = url;
        }
        if let Some(token) = var("NODELOG_TOKEN") {
            self.collector.token = Some(token);
        }
        if let Some(name) = var("NODELOG_NAME") {
            self.collector.name = Some(name);
        }
        if let Some(level) = var("NODELOG_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(json) = var("NODELOG_LOG_JSON") {
            self.logging.json = json == "true" || json == "1";
        }
    }
}

fn required<'a>(value: Option<&'a str>, key: &'static str) -> Result<&'a str, ConfigError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ConfigError::MissingCredential(key)),
    }
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `NODELOG_DB_PATH` overrides `database.path`
/// - `NODELOG_COLLECTOR_URL` overrides `collector.url`
/// - `NODELOG_TOKEN` overrides `collector.token`
/// - `NODELOG_NAME` overrides `collector.name`
/// - `NODELOG_LOG_LEVEL` overrides `logging.level`
/// - `NODELOG_LOG_JSON` overrides `logging.json` (set to "true" to enable)
///
/// Credentials are not checked here; see [`Config::channel_config`].
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    config.apply_overrides(|key| std::env::var(key).ok());
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn parse(toml_text: &str) -> Config {
        toml::from_str(toml_text).expect("failed to parse test config")
    }

    fn with_credentials(collector_extra: &str) -> Config {
        parse(&format!(
            "[collector]\ntoken = \"secret\"\nname = \"node\"\n{collector_extra}"
        ))
    }

    #[test]
    fn empty_file_yields_defaults() {
        let config = parse("");
        assert_eq!(config.database.path, "nodelog.db");
        assert_eq!(config.collector.reconnect_delay_ms, 5000);
        assert_eq!(config.collector.ping_interval_ms, 5000);
        assert_eq!(config.collector.liveness_threshold_ms, 10_000);
        assert_eq!(config.sink.queue_capacity, 1024);
        assert_eq!(config.logging.level, "info");
        assert!(!config.logging.json);
    }

    #[test]
    fn channel_config_carries_credentials_and_timings() {
        let config = parse(
            r#"
            [collector]
            url = "wss://collector.example/ws"
            token = "secret"
            name = "node-eu-1"
            reconnect_delay_ms = 250
            ping_interval_ms = 1000
            liveness_threshold_ms = 3000
            "#,
        );

        let channel = config
            .channel_config()
            .expect("failed to build channel config");
        assert_eq!(channel.token, "secret");
        assert_eq!(channel.name, "node-eu-1");
        assert_eq!(channel.reconnect_delay, Duration::from_millis(250));
        assert_eq!(channel.ping_interval, Duration::from_secs(1));
        assert_eq!(channel.liveness_threshold, Duration::from_secs(3));
        assert_eq!(config.collector.url, "wss://collector.example/ws");
    }

    #[test]
    fn default_timings_are_valid() {
        let channel = with_credentials("")
            .channel_config()
            .expect("failed to build channel config");
        assert_eq!(channel.ping_interval, Duration::from_secs(5));
        assert_eq!(channel.liveness_threshold, Duration::from_secs(10));
    }

    #[test]
    fn missing_token_is_fatal() {
        let config = parse("[collector]\nname = \"node\"\n");
        assert!(matches!(
            config.channel_config(),
            Err(ConfigError::MissingCredential("collector.token"))
        ));
    }

    #[test]
    fn blank_name_is_fatal() {
        let config = parse("[collector]\ntoken = \"secret\"\nname = \"  \"\n");
        assert!(matches!(
            config.channel_config(),
            Err(ConfigError::MissingCredential("collector.name"))
        ));
    }

    #[test]
    fn zero_ping_interval_is_fatal() {
        let config = with_credentials("ping_interval_ms = 0\n");
        assert!(matches!(
            config.channel_config(),
            Err(ConfigError::InvalidTiming(_))
        ));
    }

    #[test]
    fn zero_reconnect_delay_is_fatal() {
        let config = with_credentials("reconnect_delay_ms = 0\n");
        assert!(matches!(
            config.channel_config(),
            Err(ConfigError::InvalidTiming(_))
        ));
    }

    #[test]
    fn liveness_threshold_must_exceed_ping_interval() {
        for threshold in [0, 2000, 5000] {
            let config = with_credentials(&format!("liveness_threshold_ms = {threshold}\n"));
            assert!(
                matches!(config.channel_config(), Err(ConfigError::InvalidTiming(_))),
                "threshold {threshold} should be rejected"
            );
        }
    }

    #[test]
    fn environment_overrides_file_values() {
        let mut config = parse(
            r#"
            [database]
            path = "file.db"
            [collector]
            token = "from-file"
            "#,
        );
        let env: HashMap<&str, &str> = [
            ("NODELOG_DB_PATH", "env.db"),
            ("NODELOG_TOKEN", "from-env"),
            ("NODELOG_NAME", "node-env"),
            ("NODELOG_LOG_JSON", "1"),
        ]
        .into_iter()
        .collect();

        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.db_settings().path, "env.db");
        assert!(config.logging.json);
        let channel = config
            .channel_config()
            .expect("failed to build channel config");
        assert_eq!(channel.token, "from-env");
        assert_eq!(channel.name, "node-env");
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let path = dir.path().join("absent.toml");
        let config = load_config(path.to_str()).expect("failed to load config");
        assert_eq!(config.collector.outbound_capacity, 256);
    }

    #[test]
    fn unparseable_file_is_an_error() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[collector\nurl = ").expect("failed to write config file");
        assert!(matches!(
            load_config(path.to_str()),
            Err(ConfigError::Parse(_))
        ));
    }
}
