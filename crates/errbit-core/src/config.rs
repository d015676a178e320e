//! Delivery configuration.
//!
//! Resolution order: environment variables → config file → defaults.
//!
//! Config file location:
//!   1. $ERRBIT_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/errbit/config.toml
//!   3. ~/.config/errbit/config.toml

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Datagram size bound used when `mtu` is not configured.
pub const DEFAULT_MTU: usize = 7000;

/// Parameters for one delivery. Consumed by reference per call; the writer
/// never keeps a copy between calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WriterConfig {
    /// Collector host name or address.
    pub host: String,
    pub port: u16,
    /// Fragment over UDP instead of posting over a stream.
    #[serde(rename = "async")]
    pub async_mode: bool,
    /// Wrap the stream in TLS. Ignored when `async` is set.
    pub secure: bool,
    /// Bound on connection establishment (stream path only).
    #[serde(with = "secs_serde")]
    pub connect_timeout: Duration,
    /// Bound on each write/send, both paths.
    #[serde(with = "secs_serde")]
    pub write_timeout: Duration,
    /// User-Agent header value.
    pub agent: String,
    /// Maximum encoded datagram size. None = DEFAULT_MTU.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mtu: Option<usize>,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 80,
            async_mode: false,
            secure: false,
            connect_timeout: Duration::from_secs(3),
            write_timeout: Duration::from_secs(3),
            agent: concat!("errbit-rs/", env!("CARGO_PKG_VERSION")).to_string(),
            mtu: None,
        }
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_or_home().join(".config"))
        .join("errbit")
}

fn dirs_or_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
    #[error("failed to write {0}: {1}")]
    WriteFailed(PathBuf, std::io::Error),
    #[error("failed to serialize: {0}")]
    SerializeFailed(toml::ser::Error),
    #[error("invalid config: {0}")]
    Invalid(&'static str),
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl WriterConfig {
    /// Load config: env vars → file → defaults.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_at(&Self::file_path())
    }

    /// Load `path` (defaults if absent), then apply env overrides.
    pub fn load_at(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load_from(path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load from a specific file, falling back to defaults if it is absent.
    /// Environment overrides are not applied.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(WriterConfig::default());
        }
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadFailed(path.to_path_buf(), e))?;
        toml::from_str(&text).map_err(|e| ConfigError::ParseFailed(path.to_path_buf(), e))
    }

    /// Config file path.
    pub fn file_path() -> PathBuf {
        std::env::var("ERRBIT_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("config.toml"))
    }

    /// Write default config if none exists. Returns the path.
    pub fn write_default_if_missing() -> Result<PathBuf, ConfigError> {
        let path = Self::file_path();
        if !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
            }
            std::fs::write(&path, WriterConfig::default().to_toml()?)
                .map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
        }
        Ok(path)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::SerializeFailed)
    }

    /// Reject settings no delivery could succeed with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::Invalid("host must not be empty"));
        }
        if self.port == 0 {
            return Err(ConfigError::Invalid("port must be non-zero"));
        }
        if self.mtu == Some(0) {
            return Err(ConfigError::Invalid("mtu must be non-zero"));
        }
        Ok(())
    }

    /// Effective MTU.
    pub fn mtu(&self) -> usize {
        self.mtu.unwrap_or(DEFAULT_MTU)
    }

    /// `host:port`, suitable for `ToSocketAddrs`.
    pub fn target(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    /// Apply ERRBIT_* overrides. `lookup` abstracts the environment so the
    /// mapping can be exercised without touching process state.
    fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let flag = |v: String| v == "true" || v == "1";

        if let Some(v) = lookup("ERRBIT_HOST") {
            self.host = v;
        }
        if let Some(p) = lookup("ERRBIT_PORT").and_then(|v| v.parse().ok()) {
            self.port = p;
        }
        if let Some(v) = lookup("ERRBIT_ASYNC") {
            self.async_mode = flag(v);
        }
        if let Some(v) = lookup("ERRBIT_SECURE") {
            self.secure = flag(v);
        }
        if let Some(d) = lookup("ERRBIT_CONNECT_TIMEOUT").and_then(|v| parse_secs(&v)) {
            self.connect_timeout = d;
        }
        if let Some(d) = lookup("ERRBIT_WRITE_TIMEOUT").and_then(|v| parse_secs(&v)) {
            self.write_timeout = d;
        }
        if let Some(v) = lookup("ERRBIT_AGENT") {
            self.agent = v;
        }
        if let Some(m) = lookup("ERRBIT_MTU").and_then(|v| v.parse().ok()) {
            self.mtu = Some(m);
        }
    }
}

fn parse_secs(v: &str) -> Option<Duration> {
    v.parse::<f64>()
        .ok()
        .and_then(|s| Duration::try_from_secs_f64(s).ok())
}

/// Timeouts are written as fractional seconds, e.g. `write_timeout = 0.5`.
mod secs_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(d: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}
