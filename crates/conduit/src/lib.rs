//! # Conduit
//!
//! The communication core of a modular host process: an in-process event bus
//! plus a loader that brings plugins onto it.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐  load   ┌──────────────────────────────────────┐
//! │    Runtime   │────────▶│ Plugin "greeter" (scoped context)    │──┐
//! │ (config, log)│────────▶│ Plugin "logger"  (scoped context)    │──┤
//! └──────────────┘         └──────────────────────────────────────┘  │
//!                                                                    ▼
//!                        ┌──────────────────────────────────────────────┐
//!                        │ EventBus: middleware → requests │ notifications │
//!                        └──────────────────────────────────────────────┘
//! ```
//!
//! - **Bus**: routes requests to one handler and fans notifications out
//! - **Middleware**: rewrites, resolves or rejects requests before routing
//! - **Plugins**: directories with a manifest whose entry names a module
//!   linked into the host
//! - **Runtime**: configuration, logging, startup and shutdown
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use conduit::prelude::*;
//!
//! #[export_module("greeter")]
//! fn greeter() -> PluginModule {
//!     PluginModule::new().on_init(|ctx: PluginContext| async move {
//!         ctx.listen_for_requests("greeter")
//!             .on("hello", |_req: Request| async { Ok(json!("hi")) });
//!         Ok(())
//!     })
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     Conduit::builder().build().await?.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! `#[export_module]` expands to paths under `conduit_plugin`, so crates
//! exporting modules depend on `conduit-plugin` directly.
//!
//! ## Features
//!
//! - `toml-config`: TOML configuration files (default)
//! - `yaml-config`: YAML configuration files
//! - `json-log`: JSON log lines

pub use conduit_core as core;
pub use conduit_plugin as plugin;
pub use conduit_runtime as runtime;

pub use conduit_macros::export_module;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use conduit::prelude::*;
/// ```
pub mod prelude {
    // Host
    pub use conduit_runtime::{Conduit, ConduitConfig};

    // Bus
    pub use conduit_core::prelude::*;
    pub use conduit_core::{CORE_CHANNEL, Verdict};

    // Plugins
    pub use conduit_macros::export_module;
    pub use conduit_plugin::{PluginContext, PluginHandle, PluginModule};
}
