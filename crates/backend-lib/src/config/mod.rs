// ============================
// sessiongate-backend/src/config/mod.rs
// ============================
//! Configuration management.
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::{
    providers::{Env, Format, Json, Serialized, Toml, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::auth::{PasswordPolicy, DEFAULT_HASH_COST, MAX_HASH_COST};

/// Prefix of environment variables read by `Settings::load`.
/// Nested keys are separated by `__`, e.g. `SESSIONGATE_SERVER__PORT`.
pub const ENV_PREFIX: &str = "SESSIONGATE_";

/// Longest session lifetime accepted from configuration (one year)
pub const MAX_SESSION_TTL_SECS: u64 = 60 * 60 * 24 * 365;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Cannot resolve bind address {0}")]
    BindAddr(String),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        ConfigError::Load(Box::new(err))
    }
}

/// Application settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub storage: StorageSettings,
    pub session: SessionSettings,
    pub auth: AuthSettings,
    /// Log level used when `RUST_LOG` is unset
    pub log_level: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

/// Which `UserStore` implementation backs the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    File,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub backend: StorageBackend,
    /// Data directory for the file backend
    pub path: PathBuf,
    /// Deadline for each storage call
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    pub ttl_secs: u64,
    pub cleanup_interval_secs: u64,
    pub cookie_name: String,
    /// Add the `Secure` attribute to the session cookie
    pub secure_cookie: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    /// scrypt work factor (log2 N)
    pub hash_cost: u8,
    pub min_password_length: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings::default(),
            storage: StorageSettings::default(),
            session: SessionSettings::default(),
            auth: AuthSettings::default(),
            log_level: "info".to_string(),
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            path: PathBuf::from("data"),
            timeout_ms: 5_000,
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            ttl_secs: 60 * 60 * 24, // 1 day
            cleanup_interval_secs: 60 * 60,
            cookie_name: "sid".to_string(),
            secure_cookie: false,
        }
    }
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            hash_cost: DEFAULT_HASH_COST,
            min_password_length: PasswordPolicy::default().min_length,
        }
    }
}

impl Settings {
    /// Load settings from defaults, `sessiongate.{toml,yaml,json}` in the
    /// working directory and the environment, in that order of precedence
    pub fn load() -> Result<Self, ConfigError> {
        let settings: Settings = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file("sessiongate.toml"))
            .merge(Yaml::file("sessiongate.yaml"))
            .merge(Json::file("sessiongate.json"))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from one explicit file layered over defaults, with the
    /// environment on top. The format follows the file extension.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let figment = Figment::from(Serialized::defaults(Settings::default()));
        let figment = match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => figment.merge(Toml::file(path)),
            Some("yaml") | Some("yml") => figment.merge(Yaml::file(path)),
            Some("json") => figment.merge(Json::file(path)),
            _ => {
                return Err(ConfigError::Invalid(format!(
                    "unsupported config file format: {}",
                    path.display()
                )))
            },
        };
        let settings: Settings = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Check that the settings make sense
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !LOG_LEVELS.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(ConfigError::Invalid(format!(
                "unknown log level '{}'",
                self.log_level
            )));
        }
        if self.session.ttl_secs == 0 || self.session.ttl_secs > MAX_SESSION_TTL_SECS {
            return Err(ConfigError::Invalid(format!(
                "session.ttl_secs must be between 1 and {MAX_SESSION_TTL_SECS}"
            )));
        }
        if self.session.cleanup_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "session.cleanup_interval_secs must be positive".to_string(),
            ));
        }
        if self.session.cookie_name.trim().is_empty() {
            return Err(ConfigError::Invalid("session.cookie_name must not be empty".to_string()));
        }
        if self.storage.timeout_ms == 0 {
            return Err(ConfigError::Invalid("storage.timeout_ms must be positive".to_string()));
        }
        if self.auth.hash_cost == 0 || self.auth.hash_cost > MAX_HASH_COST {
            return Err(ConfigError::Invalid(format!(
                "auth.hash_cost must be between 1 and {MAX_HASH_COST}"
            )));
        }
        if self.auth.min_password_length == 0 {
            return Err(ConfigError::Invalid(
                "auth.min_password_length must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Resolve `server.host:server.port`
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let target = format!("{}:{}", self.server.host, self.server.port);
        target
            .to_socket_addrs()
            .ok()
            .and_then(|mut addrs| addrs.next())
            .ok_or(ConfigError::BindAddr(target))
    }

    pub fn storage_timeout(&self) -> Duration {
        Duration::from_millis(self.storage.timeout_ms)
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session.ttl_secs)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.session.cleanup_interval_secs)
    }

    pub fn password_policy(&self) -> PasswordPolicy {
        PasswordPolicy {
            min_length: self.auth.min_password_length,
        }
    }
}
