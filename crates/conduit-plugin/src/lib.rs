//! # Conduit Plugin
//!
//! Finds plugin directories, reads their manifests, resolves their entry
//! points and initializes them against a shared [`EventBus`].
//!
//! ```rust,ignore
//! let bus = EventBus::new();
//! let handle = PluginLoader::new(bus.clone(), LoaderOptions::new("."))
//!     .load_plugins()
//!     .await;
//!
//! // …traffic on the bus…
//!
//! handle.close_all().await;
//! ```
//!
//! A plugin directory holds a `plugin.json` manifest. Its `entry` names a
//! [`PluginModule`] linked into the host, usually exported with
//! `#[export_module("entry")]`.
//!
//! [`EventBus`]: conduit_core::EventBus

pub mod discovery;
pub mod error;
pub mod facade;
pub mod handle;
pub mod loader;
pub mod manifest;
pub mod module;
mod util;

pub use discovery::discover;
pub use error::{PluginError, PluginResult};
pub use facade::{NotificationChannel, PluginContext, RequestChannel};
pub use handle::{CloseSummary, Plugin, PluginHandle};
pub use loader::{DEFAULT_INIT_TIMEOUT, DEFAULT_PATTERN, LoaderOptions, PluginLoader, load_plugins};
pub use manifest::{DEFAULT_MANIFEST_FILE, PluginManifest};
pub use module::{
    CloseFn, InitFn, ModuleExport, ModuleRegistry, ModuleResolver, PLUGIN_MODULES, PluginModule,
};

#[doc(hidden)]
pub use linkme;
