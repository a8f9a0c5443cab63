mod validation;

use crate::buffer::DEFAULT_CHANNEL_CAPACITY;
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("File error: {0}")]
    FileError(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Environment error: {0}")]
    EnvError(String),
}

/// Verbosity of the crate's own diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

/// Settings consumed by the delivery pipeline.
///
/// Built once by the host application and handed to every component by
/// reference. Sources, in order of preference: [`Config::new`] in code,
/// [`Config::from_env`] (flags and `REMOTE_LOG_*` variables), or
/// [`Config::from_file`] (TOML).
#[derive(Parser, Debug, Clone, Serialize, Deserialize)]
#[command(name = "remote-log", author, version, about, long_about = None)]
#[serde(default)]
pub struct Config {
    /// Collector base URL
    #[arg(long, env = "REMOTE_LOG_API_URL")]
    pub api_url: String,

    /// Shared access token sent as the `pwd` query parameter
    #[arg(long, env = "REMOTE_LOG_TOKEN", hide_env_values = true)]
    pub access_token: String,

    /// Directory for batches that could not be delivered
    #[arg(long, env = "REMOTE_LOG_ERROR_DIR", default_value = "./remote_logs")]
    pub error_log_dir: PathBuf,

    /// Flush interval in milliseconds
    #[arg(long, env = "REMOTE_LOG_FLUSH_INTERVAL_MS", default_value = "1000")]
    pub flush_interval_ms: u64,

    /// Maximum number of entries per batch
    #[arg(long, env = "REMOTE_LOG_MAX_BATCH_SIZE", default_value = "100")]
    pub max_batch_size: usize,

    /// Maximum aggregate entry length per batch, in bytes
    #[arg(long, env = "REMOTE_LOG_MAX_BATCH_LENGTH", default_value = "50000")]
    pub max_batch_length: usize,

    /// Capacity of the ingest channel
    #[arg(long, env = "REMOTE_LOG_CHANNEL_CAPACITY", default_value = "10000")]
    pub channel_capacity: usize,

    /// Batches longer than this many bytes are sent compressed
    #[arg(long, env = "REMOTE_LOG_COMPRESS_THRESHOLD", default_value = "1000")]
    pub compress_threshold: usize,

    /// HTTP request timeout in seconds
    #[arg(long, env = "REMOTE_LOG_REQUEST_TIMEOUT_SECS", default_value = "30")]
    pub request_timeout_secs: u64,

    /// Retries after a failed first delivery attempt
    #[arg(long, env = "REMOTE_LOG_MAX_RETRIES", default_value = "3")]
    pub max_retries: u32,

    /// Fixed delay between delivery attempts in milliseconds
    #[arg(long, env = "REMOTE_LOG_RETRY_DELAY_MS", default_value = "1000")]
    pub retry_delay_ms: u64,

    /// How long shutdown waits for in-flight retries, in milliseconds
    #[arg(long, env = "REMOTE_LOG_SHUTDOWN_GRACE_MS", default_value = "5000")]
    pub shutdown_grace_ms: u64,

    /// Level for the crate's own diagnostics
    #[arg(long, env = "REMOTE_LOG_LEVEL", default_value = "info")]
    pub log_level: LogLevel,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: String::new(),
            access_token: String::new(),
            error_log_dir: PathBuf::from("./remote_logs"),
            flush_interval_ms: 1000,
            max_batch_size: 100,
            max_batch_length: 50_000,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            compress_threshold: 1000,
            request_timeout_secs: 30,
            max_retries: 3,
            retry_delay_ms: 1000,
            shutdown_grace_ms: 5000,
            log_level: LogLevel::Info,
        }
    }
}

impl Config {
    pub fn new(
        api_url: impl Into<String>,
        access_token: impl Into<String>,
        error_log_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            api_url: api_url.into(),
            access_token: access_token.into(),
            error_log_dir: error_log_dir.into(),
            ..Self::default()
        }
    }

    /// Reads settings from `REMOTE_LOG_*` environment variables only.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_args(["remote-log"])
    }

    /// Parses command line style arguments, falling back to the environment.
    pub fn from_args<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let config =
            Self::try_parse_from(args).map_err(|e| ConfigError::EnvError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a TOML file; keys missing from the file keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_pipeline_constants() {
        let config = Config::new("http://collector:8080", "token", "/tmp/remote-log");
        assert_eq!(config.flush_interval(), Duration::from_millis(1000));
        assert_eq!(config.max_batch_size, 100);
        assert_eq!(config.max_batch_length, 50_000);
        assert_eq!(config.channel_capacity, 10_000);
        assert_eq!(config.compress_threshold, 1000);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.retry_delay(), Duration::from_secs(1));
    }

    #[test]
    fn test_from_args_overrides_defaults() {
        let config = Config::from_args([
            "remote-log",
            "--api-url",
            "http://collector:8080",
            "--access-token",
            "secret",
            "--max-batch-size",
            "20",
            "--flush-interval-ms",
            "250",
        ])
        .unwrap();

        assert_eq!(config.max_batch_size, 20);
        assert_eq!(config.flush_interval(), Duration::from_millis(250));
        assert_eq!(config.max_batch_length, 50_000);
    }

    #[test]
    fn test_from_file_keeps_unset_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("remote-log.toml");
        std::fs::write(
            &path,
            "api_url = \"https://logs.example.com\"\naccess_token = \"abc\"\nmax_retries = 5\n",
        )
        .unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.api_url, "https://logs.example.com");
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.max_batch_size, 100);
    }
}
