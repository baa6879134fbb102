//! Configuration structs

mod app_config;

pub use app_config::{
    AdapterSettings, AppConfig, AppSettings, ConfigError, Environment, RedisConfig, ServerConfig,
};
