//! Conduit Runtime - configuration, logging and the host process.
//!
//! This crate provides:
//! - Layered configuration (`ConfigLoader`, `ConduitConfig`)
//! - Logging setup (`LoggingBuilder`, `init_from_config`)
//! - The host (`Conduit`), which owns one bus and the plugins loaded onto it
//!
//! ```ignore
//! use conduit_runtime::Conduit;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let host = Conduit::builder().build().await?;
//!     host.run().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod host;
pub mod logging;

// Re-exports
pub use config::{
    ConduitConfig, ConfigError, ConfigLoader, ConfigResult, LoggingConfig, PluginsConfig, Profile,
};
pub use error::{RuntimeError, RuntimeResult};
pub use host::{Conduit, ConduitBuilder};
pub use logging::{LoggingBuilder, SpanEvents, init_from_config};

// Re-export tracing for use by plugins
pub use tracing;
pub use tracing_subscriber;

/// Logging macros.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
