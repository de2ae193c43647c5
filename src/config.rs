use std::path::PathBuf;

use axum_extra::extract::cookie::Key;
use base64::Engine;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Immutable process settings. Built once in `main` and shared through the router state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub pwd: String,
    /// Base64 encoded cookie key material, at least 64 bytes once decoded.
    pub secret_key: String,
    pub environment: String,
    /// Branding shown in page titles and the navbar.
    pub logo: String,
    pub loglevel: String,
    /// Drop the `Secure` attribute from the session cookie (plain-http deployments).
    pub insecure_cookie: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 4000,
            user: String::new(),
            pwd: String::new(),
            secret_key: String::new(),
            environment: "development".to_string(),
            logo: "jspoc".to_string(),
            loglevel: "info".to_string(),
            insecure_cookie: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Single host, or a comma separated seed list when running a replica set.
    pub host: String,
    pub port: u16,
    pub db: String,
    pub user: String,
    pub pwd: String,
    pub replicaset: Option<String>,
    /// Upper bound on opening one connection, per host tried.
    pub connect_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            db: "jspoc".to_string(),
            user: "jspoc".to_string(),
            pwd: String::new(),
            replicaset: None,
            connect_timeout_secs: 5,
        }
    }
}

/// The one valid username/password pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Config {
    /// Defaults, then `config.toml` (or `$JSPOC_CONFIG`), then `JSPOC_*` env vars.
    pub fn load() -> Result<Self, AppError> {
        let path = std::env::var_os("JSPOC_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

        let cfg: Config = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(&path))
            .merge(Env::prefixed("JSPOC_").split("__"))
            .extract()
            .map_err(|e| AppError::Config(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.server.user.is_empty() || self.server.pwd.is_empty() {
            return Err(AppError::Config(
                "server.user and server.pwd must both be set".to_string(),
            ));
        }
        self.cookie_key()?;
        if self.database.connect_timeout_secs == 0 {
            return Err(AppError::Config(
                "database.connect_timeout_secs must be positive".to_string(),
            ));
        }
        if self.is_production() && self.database.replicaset.as_deref().unwrap_or("").is_empty() {
            return Err(AppError::Config(
                "database.replicaset is required in production".to_string(),
            ));
        }
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.server.environment == "production"
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn credentials(&self) -> Credentials {
        Credentials {
            username: self.server.user.clone(),
            password: self.server.pwd.clone(),
        }
    }

    pub fn cookie_key(&self) -> Result<Key, AppError> {
        let raw = base64::engine::general_purpose::STANDARD
            .decode(self.server.secret_key.trim())
            .map_err(|e| AppError::Config(format!("server.secret_key is not base64: {e}")))?;
        Key::try_from(raw.as_slice()).map_err(|_| {
            AppError::Config("server.secret_key must decode to at least 64 bytes".to_string())
        })
    }

    pub fn database_hosts(&self) -> Vec<String> {
        self.database
            .host
            .split(',')
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .map(str::to_string)
            .collect()
    }
}
