//! # maestro-common
//!
//! Shared utilities for the conservatory console: configuration and telemetry.

pub mod config;
pub mod telemetry;

// Re-export commonly used types at crate root
pub use config::{ApiSettings, AppConfig, AppSettings, ConfigError, Environment, RealtimeSettings};
pub use telemetry::{try_init_tracing_with_config, TracingConfig, TracingError};
