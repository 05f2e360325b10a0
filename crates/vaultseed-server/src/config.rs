//! Server configuration from `VAULTSEED_*` environment variables

use std::env;
use std::net::IpAddr;

use thiserror::Error;
use tracing::Level;
use vaultseed_core::{PublicKey, DEFAULT_SERVICE_NAME};

/// Default credential lifetime (one day)
pub const DEFAULT_CREDENTIAL_TTL_SECS: i64 = 86_400;

/// Longest configurable credential lifetime (one year)
pub const MAX_CREDENTIAL_TTL_SECS: i64 = 365 * 86_400;

/// A variable was set to something unusable
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{var} has invalid value '{value}': {reason}")]
pub struct ConfigError {
    pub var: &'static str,
    pub value: String,
    pub reason: String,
}

/// Runtime configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Interface to bind
    pub bind: IpAddr,
    /// Listen port
    pub port: u16,
    /// Maximum log level
    pub log_level: Level,
    /// Name embedded in login challenges
    pub service_name: String,
    /// Credential lifetime
    pub credential_ttl: chrono::Duration,
    /// Key ID of the credential signing key
    pub credential_kid: String,
    /// Hex Ed25519 seed; a random key is generated when unset
    pub credential_key: Option<String>,
    /// Previous credential keys still accepted for verification
    pub retired_keys: Vec<PublicKey>,
    /// PostgreSQL connection string; in-memory storage when unset
    pub database_url: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: IpAddr::from([0, 0, 0, 0]),
            port: 8080,
            log_level: Level::INFO,
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            credential_ttl: chrono::Duration::seconds(DEFAULT_CREDENTIAL_TTL_SECS),
            credential_kid: format!("vaultseed-{}", uuid::Uuid::new_v4()),
            credential_key: None,
            retired_keys: Vec::new(),
            database_url: None,
        }
    }
}

impl ServerConfig {
    /// Read configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Read configuration through `lookup`, falling back to defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup("VAULTSEED_BIND") {
            config.bind = parse("VAULTSEED_BIND", value)?;
        }
        if let Some(value) = lookup("VAULTSEED_PORT") {
            config.port = parse("VAULTSEED_PORT", value)?;
        }
        if let Some(value) = lookup("VAULTSEED_LOG_LEVEL") {
            config.log_level = parse("VAULTSEED_LOG_LEVEL", value)?;
        }
        if let Some(value) = lookup("VAULTSEED_SERVICE_NAME") {
            if value.trim().is_empty() {
                return Err(invalid("VAULTSEED_SERVICE_NAME", value, "must not be empty"));
            }
            config.service_name = value;
        }
        if let Some(value) = lookup("VAULTSEED_CREDENTIAL_TTL_SECS") {
            let secs: i64 = parse("VAULTSEED_CREDENTIAL_TTL_SECS", value.clone())?;
            if !(1..=MAX_CREDENTIAL_TTL_SECS).contains(&secs) {
                return Err(invalid(
                    "VAULTSEED_CREDENTIAL_TTL_SECS",
                    value,
                    format!("must be between 1 and {}", MAX_CREDENTIAL_TTL_SECS),
                ));
            }
            config.credential_ttl = chrono::Duration::seconds(secs);
        }
        if let Some(value) = lookup("VAULTSEED_CREDENTIAL_KID") {
            config.credential_kid = value;
        }
        config.credential_key = lookup("VAULTSEED_CREDENTIAL_KEY");
        if let Some(value) = lookup("VAULTSEED_CREDENTIAL_RETIRED_KEYS") {
            config.retired_keys = parse_retired_keys(&value)?;
        }
        config.database_url = lookup("VAULTSEED_DATABASE_URL");

        Ok(config)
    }

    /// Socket address to listen on
    pub fn listen_addr(&self) -> std::net::SocketAddr {
        std::net::SocketAddr::new(self.bind, self.port)
    }
}

fn parse<T>(var: &'static str, value: String) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| invalid(var, value.clone(), e.to_string()))
}

/// Parse `kid:hex-key` pairs separated by commas
fn parse_retired_keys(value: &str) -> Result<Vec<PublicKey>, ConfigError> {
    const VAR: &str = "VAULTSEED_CREDENTIAL_RETIRED_KEYS";

    value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (kid, key) = entry
                .split_once(':')
                .ok_or_else(|| invalid(VAR, entry.to_string(), "expected kid:hex-key"))?;
            if kid.trim().is_empty() {
                return Err(invalid(VAR, entry.to_string(), "kid must not be empty"));
            }
            PublicKey::from_hex(kid.trim(), key)
                .map_err(|e| invalid(VAR, entry.to_string(), e.to_string()))
        })
        .collect()
}

fn invalid(var: &'static str, value: String, reason: impl Into<String>) -> ConfigError {
    ConfigError {
        var,
        value,
        reason: reason.into(),
    }
}
