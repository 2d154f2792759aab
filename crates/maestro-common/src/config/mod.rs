//! Application configuration

mod app_config;

pub use app_config::{
    ApiSettings, AppConfig, AppSettings, ConfigError, Environment, RealtimeSettings,
};
