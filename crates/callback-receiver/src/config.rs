//! Harness configuration with validation.
//!
//! Which simulated roles get a callback endpoint, where each one listens,
//! and the request limits every endpoint shares.

use callback_types::RoleId;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::env;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;

/// Main harness configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// One entry per simulated role
    pub roles: Vec<RoleConfig>,
    /// Limits shared by every receiver
    pub limits: LimitsConfig,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            roles: vec![
                RoleConfig::new(RoleId::rp(1), 8200),
                RoleConfig::new(RoleId::idp(1), 8100),
                RoleConfig::new(RoleId::idp(2), 8101).unavailable(),
                RoleConfig::new(RoleId::as_(1), 8300),
                RoleConfig::new(RoleId::as_(2), 8301).unavailable(),
                RoleConfig::new(RoleId::proxy(1), 8400).unavailable(),
                RoleConfig::new(RoleId::proxy(2), 8401).unavailable(),
                RoleConfig::new(RoleId::ndid(), 8500).unavailable(),
            ],
            limits: LimitsConfig::default(),
        }
    }
}

impl HarnessConfig {
    /// Parse a TOML document. Missing sections take their defaults; a
    /// `[[roles]]` list replaces the default role set entirely.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        toml::from_str(raw).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Read and parse a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&raw)
    }

    /// Apply overrides from the process environment.
    ///
    /// - `HARNESS_CALLBACK_HOST`: bind address for every role
    /// - `HARNESS_<ROLE>_CALLBACK_PORT`: port for one role, e.g. `HARNESS_IDP2_CALLBACK_PORT`
    /// - `HARNESS_<ROLE>_AVAILABLE`: `true`/`false`, e.g. `HARNESS_AS2_AVAILABLE`
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env_from(|key| env::var(key).ok())
    }

    /// Same as [`HarnessConfig::apply_env`] over an arbitrary lookup.
    pub fn apply_env_from(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        let host = match lookup("HARNESS_CALLBACK_HOST") {
            Some(raw) => Some(parse_env("HARNESS_CALLBACK_HOST", &raw, |v| v.parse::<IpAddr>().ok())?),
            None => None,
        };

        for role in &mut self.roles {
            if let Some(host) = host {
                role.host = host;
            }

            let port_key = format!("HARNESS_{}_CALLBACK_PORT", role.role.env_key());
            if let Some(raw) = lookup(&port_key) {
                role.port = parse_env(&port_key, &raw, |v| v.parse::<u16>().ok())?;
            }

            let available_key = format!("HARNESS_{}_AVAILABLE", role.role.env_key());
            if let Some(raw) = lookup(&available_key) {
                role.available = parse_env(&available_key, &raw, parse_flag)?;
            }
        }

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut roles = HashSet::new();
        for role in &self.roles {
            if !roles.insert(role.role) {
                return Err(ConfigError::DuplicateRole(role.role.to_string()));
            }
        }

        // Ephemeral ports (0) never collide.
        let mut ports = HashSet::new();
        for role in self.available_roles() {
            if role.port != 0 && !ports.insert(role.port) {
                return Err(ConfigError::DuplicatePorts(role.port));
            }
        }

        for role in &self.roles {
            role.validate_path()?;
        }

        if self.limits.max_body_size == 0 {
            return Err(ConfigError::InvalidLimit("max_body_size cannot be 0".into()));
        }

        if self.limits.channel_capacity == 0 {
            return Err(ConfigError::InvalidLimit("channel_capacity cannot be 0".into()));
        }

        if self.limits.request_timeout.is_zero() {
            return Err(ConfigError::InvalidLimit("request_timeout cannot be 0".into()));
        }

        Ok(())
    }

    /// Roles that get a receiver.
    pub fn available_roles(&self) -> impl Iterator<Item = &RoleConfig> {
        self.roles.iter().filter(|role| role.available)
    }

    /// Configuration for one role.
    pub fn role(&self, role: RoleId) -> Option<&RoleConfig> {
        self.roles.iter().find(|r| r.role == role)
    }

    /// Same configuration with every port set to 0, for tests that must not
    /// collide with a running harness.
    #[must_use]
    pub fn with_ephemeral_ports(mut self) -> Self {
        for role in &mut self.roles {
            role.host = IpAddr::V4(Ipv4Addr::LOCALHOST);
            role.port = 0;
        }
        self
    }
}

/// Callback endpoint for one simulated role
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleConfig {
    /// Role whose webhooks this endpoint accepts
    pub role: RoleId,
    /// Bind address
    #[serde(default = "default_host")]
    pub host: IpAddr,
    /// Port (0 = ephemeral)
    #[serde(default)]
    pub port: u16,
    /// Path of the webhook endpoint
    #[serde(default = "default_path")]
    pub path: String,
    /// Whether the role takes part in this run
    #[serde(default = "default_available")]
    pub available: bool,
}

impl RoleConfig {
    /// Available role on `port` with the default host and path.
    pub fn new(role: RoleId, port: u16) -> Self {
        Self {
            role,
            host: default_host(),
            port,
            path: default_path(),
            available: default_available(),
        }
    }

    #[must_use]
    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Get bind address
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// The callback path must be a literal absolute route that does not
    /// shadow `/health`.
    pub fn validate_path(&self) -> Result<(), ConfigError> {
        let path = self.path.as_str();
        if !path.starts_with('/') || path == "/health" || path.contains([':', '*', '{', '}']) {
            return Err(ConfigError::InvalidPath {
                role: self.role.to_string(),
                path: self.path.clone(),
            });
        }
        Ok(())
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_path() -> String {
    "/callback".to_string()
}

fn default_available() -> bool {
    true
}

/// Request validation limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Max webhook body size in bytes
    pub max_body_size: usize,
    /// Tap buffer per role stream
    pub channel_capacity: usize,
    /// Time allowed for reading a request
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    /// Time allowed for in-flight requests on shutdown
    #[serde(with = "humantime_serde")]
    pub shutdown_timeout: Duration,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_body_size: 1024 * 1024, // 1 MB
            channel_capacity: callback_bus::DEFAULT_CHANNEL_CAPACITY,
            request_timeout: Duration::from_secs(10),
            shutdown_timeout: Duration::from_secs(5),
        }
    }
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Same role configured twice
    #[error("role {0} configured more than once")]
    DuplicateRole(String),
    /// Two available roles on the same non-zero port
    #[error("duplicate port {0} configured")]
    DuplicatePorts(u16),
    /// Callback path must be absolute and not shadow `/health`
    #[error("invalid callback path {path:?} for role {role}")]
    InvalidPath { role: String, path: String },
    /// Invalid size or count limit
    #[error("invalid limit: {0}")]
    InvalidLimit(String),
    /// Environment override could not be parsed
    #[error("invalid value {value:?} for {key}")]
    InvalidEnv { key: String, value: String },
    /// TOML could not be parsed
    #[error("failed to parse configuration: {0}")]
    Parse(String),
    /// File could not be read
    #[error("failed to read configuration: {0}")]
    Io(String),
}

fn parse_env<T>(key: &str, raw: &str, parse: impl Fn(&str) -> Option<T>) -> Result<T, ConfigError> {
    parse(raw.trim()).ok_or_else(|| ConfigError::InvalidEnv {
        key: key.to_string(),
        value: raw.to_string(),
    })
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.to_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

/// Humantime serde module for Duration serialization
mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("{}ms", duration.as_millis()))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_duration(&s).map_err(serde::de::Error::custom)
    }

    pub(super) fn parse_duration(s: &str) -> Result<Duration, &'static str> {
        let s = s.trim();
        // "ms" before "s" and "m": both are suffixes of it.
        if let Some(ms) = s.strip_suffix("ms") {
            ms.trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|_| "invalid milliseconds")
        } else if let Some(secs) = s.strip_suffix('s') {
            secs.trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| "invalid seconds")
        } else if let Some(mins) = s.strip_suffix('m') {
            mins.trim()
                .parse::<u64>()
                .ok()
                .and_then(|m| m.checked_mul(60))
                .map(Duration::from_secs)
                .ok_or("invalid minutes")
        } else {
            // Try parsing as plain seconds
            s.parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| "invalid duration format")
        }
    }
}
