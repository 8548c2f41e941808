//! Execution log pipeline configuration

use crate::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, warn};

/// Environment variable overriding [`ObserveConfig::log_dir`]
pub const ENV_LOG_DIR: &str = "HOOKWATCH_LOG_DIR";
/// Environment variable overriding [`ObserveConfig::ring_capacity`]
pub const ENV_RING_CAPACITY: &str = "HOOKWATCH_RING_CAPACITY";
/// Environment variable overriding [`ObserveConfig::after_window`]
pub const ENV_AFTER_WINDOW: &str = "HOOKWATCH_AFTER_WINDOW";
/// Environment variable overriding [`ObserveConfig::context_retention_days`]
pub const ENV_CONTEXT_RETENTION_DAYS: &str = "HOOKWATCH_CONTEXT_RETENTION_DAYS";
/// Environment variable overriding [`ObserveConfig::session_idle_ttl_secs`]
pub const ENV_SESSION_TTL_SECS: &str = "HOOKWATCH_SESSION_TTL_SECS";
/// Environment variable enabling debug logging; only the exact value `"true"` enables it
pub const ENV_DEBUG: &str = "HOOKWATCH_DEBUG";

/// Configuration for the execution log pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObserveConfig {
    /// Root directory for session logs, severity logs and error context records
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,

    /// Number of recent events kept per session
    #[serde(default = "default_ring_capacity")]
    pub ring_capacity: usize,

    /// Number of events captured after an error before the record is written
    #[serde(default = "default_after_window")]
    pub after_window: usize,

    /// Age in days after which error context records are pruned
    #[serde(default = "default_context_retention_days")]
    pub context_retention_days: u64,

    /// Write DEBUG-severity events to the dedicated debug log
    #[serde(default)]
    pub debug_logging: bool,

    /// Evict in-memory session state idle for longer than this many seconds.
    ///
    /// Unset means sessions live until explicitly cleared, which is fine for
    /// short-lived hook processes but leaks in a long-running host.
    #[serde(default)]
    pub session_idle_ttl_secs: Option<u64>,
}

fn default_log_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".hookwatch")
        .join("logs")
}

fn default_ring_capacity() -> usize {
    10
}

fn default_after_window() -> usize {
    5
}

fn default_context_retention_days() -> u64 {
    7
}

impl Default for ObserveConfig {
    fn default() -> Self {
        Self {
            log_dir: default_log_dir(),
            ring_capacity: default_ring_capacity(),
            after_window: default_after_window(),
            context_retention_days: default_context_retention_days(),
            debug_logging: false,
            session_idle_ttl_secs: None,
        }
    }
}

impl ObserveConfig {
    /// Default configuration rooted at the given log directory
    pub fn with_log_dir(log_dir: impl Into<PathBuf>) -> Self {
        Self {
            log_dir: log_dir.into(),
            ..Self::default()
        }
    }

    /// Resolve configuration from defaults, an optional TOML file and the environment
    pub async fn load(path: Option<&Path>) -> ConfigResult<Self> {
        let mut config = match path {
            Some(path) => Self::load_from_file(path).await?,
            None => Self::default(),
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Parse a (possibly partial) TOML file; missing keys take their defaults
    pub async fn load_from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        let config: Self = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "Loaded observe config");
        Ok(config)
    }

    /// Apply `HOOKWATCH_*` environment overrides in place
    pub fn apply_env_overrides(&mut self) {
        if let Ok(dir) = std::env::var(ENV_LOG_DIR) {
            if !dir.is_empty() {
                self.log_dir = PathBuf::from(dir);
            }
        }
        if let Some(capacity) = env_parse(ENV_RING_CAPACITY) {
            self.ring_capacity = capacity;
        }
        if let Some(window) = env_parse(ENV_AFTER_WINDOW) {
            self.after_window = window;
        }
        if let Some(days) = env_parse(ENV_CONTEXT_RETENTION_DAYS) {
            self.context_retention_days = days;
        }
        if let Some(ttl) = env_parse(ENV_SESSION_TTL_SECS) {
            self.session_idle_ttl_secs = Some(ttl);
        }
        if let Ok(flag) = std::env::var(ENV_DEBUG) {
            self.debug_logging = debug_flag_enabled(&flag);
        }
    }

    /// Check value ranges
    pub fn validate(&self) -> ConfigResult<()> {
        if self.ring_capacity == 0 {
            return Err(ConfigError::Invalid(
                "ring_capacity must be at least 1".to_string(),
            ));
        }
        if self.after_window == 0 {
            return Err(ConfigError::Invalid(
                "after_window must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Idle TTL for in-memory session state, if eviction is enabled
    pub fn session_idle_ttl(&self) -> Option<Duration> {
        self.session_idle_ttl_secs.map(Duration::from_secs)
    }

    /// Directory holding persisted error context records
    pub fn context_dir(&self) -> PathBuf {
        self.log_dir.join("error-context")
    }
}

/// The debug toggle is an exact match; `"1"`, `"TRUE"` or `"yes"` leave it off
pub fn debug_flag_enabled(value: &str) -> bool {
    value == "true"
}

fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(var = name, value = %raw, "Ignoring unparseable environment override");
            None
        }
    }
}
