//! Application configuration structs
//!
//! Loads configuration from environment variables (and a `.env` file if present).

use rooms_core::DEFAULT_NAMESPACE;
use serde::Deserialize;
use std::env;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub app: AppSettings,
    pub gateway: ServerConfig,
    pub redis: RedisConfig,
    pub adapter: AdapterSettings,
}

/// General application settings
#[derive(Debug, Clone, Deserialize)]
pub struct AppSettings {
    #[serde(default = "default_app_name")]
    pub name: String,
    #[serde(default = "default_env")]
    pub env: Environment,
}

/// Environment type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "production" => Some(Self::Production),
            "staging" => Some(Self::Staging),
            "development" => Some(Self::Development),
            _ => None,
        }
    }
}

/// Gateway server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Redis configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: String,
    #[serde(default = "default_redis_max_connections")]
    pub max_connections: u32,
}

/// Room adapter settings that can be expressed as plain values
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AdapterSettings {
    /// Key namespace shared by every process of one logical application
    #[serde(default = "default_namespace")]
    pub namespace: String,
    /// Hand broadcasts to the cross-process relay
    #[serde(default)]
    pub relay: bool,
    /// Reconcile this process's connections out of the store on shutdown
    #[serde(default = "default_remove_clients_on_exit")]
    pub remove_clients_on_exit: bool,
    /// `COUNT` hint for key scans
    #[serde(default = "default_scan_count")]
    pub scan_count: usize,
}

impl Default for AdapterSettings {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            relay: false,
            remove_clients_on_exit: default_remove_clients_on_exit(),
            scan_count: default_scan_count(),
        }
    }
}

// Default value functions
fn default_app_name() -> String {
    "rooms-gateway".to_string()
}

fn default_env() -> Environment {
    Environment::Development
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_redis_max_connections() -> u32 {
    10
}

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

fn default_remove_clients_on_exit() -> bool {
    true
}

fn default_scan_count() -> usize {
    100
}

fn parse_bool(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue(var, value.to_string())),
    }
}

fn parse_number<T: std::str::FromStr>(var: &'static str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue(var, value.to_string()))
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if required environment variables are missing or malformed
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        let optional = |var: &'static str| lookup(var).filter(|v| !v.trim().is_empty());

        let env = match optional("APP_ENV") {
            Some(value) => Environment::parse(&value)
                .ok_or(ConfigError::InvalidValue("APP_ENV", value))?,
            None => default_env(),
        };

        let port = optional("GATEWAY_PORT").ok_or(ConfigError::MissingVar("GATEWAY_PORT"))?;
        let redis_url = optional("REDIS_URL").ok_or(ConfigError::MissingVar("REDIS_URL"))?;

        let defaults = AdapterSettings::default();

        Ok(Self {
            app: AppSettings {
                name: optional("APP_NAME").unwrap_or_else(default_app_name),
                env,
            },
            gateway: ServerConfig {
                host: optional("GATEWAY_HOST").unwrap_or_else(default_host),
                port: parse_number("GATEWAY_PORT", &port)?,
            },
            redis: RedisConfig {
                url: redis_url,
                max_connections: optional("REDIS_MAX_CONNECTIONS")
                    .map(|v| parse_number("REDIS_MAX_CONNECTIONS", &v))
                    .transpose()?
                    .unwrap_or_else(default_redis_max_connections),
            },
            adapter: AdapterSettings {
                namespace: optional("ROOMS_NAMESPACE").unwrap_or(defaults.namespace),
                relay: optional("ROOMS_RELAY")
                    .map(|v| parse_bool("ROOMS_RELAY", &v))
                    .transpose()?
                    .unwrap_or(defaults.relay),
                remove_clients_on_exit: optional("ROOMS_REMOVE_CLIENTS_ON_EXIT")
                    .map(|v| parse_bool("ROOMS_REMOVE_CLIENTS_ON_EXIT", &v))
                    .transpose()?
                    .unwrap_or(defaults.remove_clients_on_exit),
                scan_count: optional("ROOMS_SCAN_COUNT")
                    .map(|v| parse_number("ROOMS_SCAN_COUNT", &v))
                    .transpose()?
                    .unwrap_or(defaults.scan_count),
            },
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}
