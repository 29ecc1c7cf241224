//! Configuration for the Conduit host.
//!
//! Layered loading with figment, a serde schema for the `logging` and
//! `plugins` sections, and validation.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile, load_config, load_config_from_file};
pub use schema::{
    ConduitConfig, LogFormat, LogLevel, LogOutput, LogRotation, LoggingConfig, PluginsConfig,
    SpanEventConfig,
};
pub use validation::validate_config;
