//! The in-memory plugin module and the registry that resolves entry points.
//!
//! Rust has no runtime `import`, so a plugin's entry point names a module
//! that was linked into the host binary. Modules reach the
//! [`ModuleRegistry`] in two ways:
//!
//! - at link time, through the [`PLUGIN_MODULES`] distributed slice that
//!   `#[export_module("entry")]` appends to;
//! - programmatically, through [`ModuleRegistry::register`].
//!
//! ```rust,ignore
//! #[export_module("greeter")]
//! fn greeter() -> PluginModule {
//!     PluginModule::new()
//!         .on_init(|ctx: PluginContext| async move {
//!             ctx.listen_for_requests("greeter").on("hello", |_req| async {
//!                 Ok(json!("hello"))
//!             });
//!             Ok(())
//!         })
//!         .on_close(|| async { Ok(()) })
//! }
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use conduit_core::BoxError;
use futures::FutureExt;
use futures::future::BoxFuture;
use linkme::distributed_slice;
use tracing::{debug, warn};

use crate::facade::PluginContext;
use crate::manifest::PluginManifest;

/// Stored `init` entry point.
pub type InitFn =
    Arc<dyn Fn(PluginContext) -> BoxFuture<'static, Result<(), BoxError>> + Send + Sync>;

/// Stored `close` entry point.
pub type CloseFn = Arc<dyn Fn() -> BoxFuture<'static, Result<(), BoxError>> + Send + Sync>;

// ─── PluginModule ─────────────────────────────────────────────────────────────

/// What a resolved entry point exposes: a required `init` and an optional `close`.
///
/// A module without `init` still resolves; the loader rejects it as `no-init`.
#[derive(Clone, Default)]
pub struct PluginModule {
    init: Option<InitFn>,
    close: Option<CloseFn>,
}

impl PluginModule {
    /// Creates a module with no entry points.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the `init` entry point.
    pub fn on_init<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(PluginContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        self.init = Some(Arc::new(move |ctx| f(ctx).boxed()));
        self
    }

    /// Sets the `close` entry point.
    pub fn on_close<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        self.close = Some(Arc::new(move || f().boxed()));
        self
    }

    /// Returns `true` if the module exposes `init`.
    pub fn has_init(&self) -> bool {
        self.init.is_some()
    }

    /// Returns `true` if the module exposes `close`.
    pub fn has_close(&self) -> bool {
        self.close.is_some()
    }

    pub(crate) fn init_fn(&self) -> Option<InitFn> {
        self.init.clone()
    }

    pub(crate) fn close_fn(&self) -> Option<CloseFn> {
        self.close.clone()
    }
}

impl std::fmt::Debug for PluginModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginModule")
            .field("init", &self.has_init())
            .field("close", &self.has_close())
            .finish()
    }
}

// ─── Link-time export ─────────────────────────────────────────────────────────

/// One module contributed at link time.
///
/// Generated by `#[export_module("entry")]`; rarely written by hand.
pub struct ModuleExport {
    /// The entry point name manifests refer to.
    pub entry: &'static str,
    /// Builds the module.
    pub build: fn() -> PluginModule,
}

/// Every module exported with `#[export_module]` across the final binary.
#[distributed_slice]
pub static PLUGIN_MODULES: [ModuleExport];

// ─── Resolution ───────────────────────────────────────────────────────────────

/// Turns a manifest's entry point into a [`PluginModule`].
///
/// This is the only seam between the loader and the mechanism that produces
/// modules. Errors are reported as `load-error`.
#[async_trait]
pub trait ModuleResolver: Send + Sync {
    /// Resolves the entry point of `manifest`, found in directory `dir`.
    async fn resolve(
        &self,
        manifest: &PluginManifest,
        dir: &Path,
    ) -> Result<PluginModule, BoxError>;
}

/// Default resolver: a name → module map.
#[derive(Clone, Default)]
pub struct ModuleRegistry {
    modules: HashMap<String, PluginModule>,
}

impl ModuleRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding every module exported at link time.
    pub fn collect() -> Self {
        let mut registry = Self::new();
        for export in PLUGIN_MODULES.iter() {
            registry.register(export.entry, (export.build)());
        }
        debug!(count = registry.len(), "Collected exported plugin modules");
        registry
    }

    /// Adds a module under `entry`, replacing any earlier one.
    pub fn register(&mut self, entry: impl Into<String>, module: PluginModule) -> &mut Self {
        let entry = entry.into();
        if self.modules.insert(entry.clone(), module).is_some() {
            warn!(entry = %entry, "Plugin module exported twice, last registration wins");
        }
        self
    }

    /// Builder form of [`register`](Self::register).
    pub fn with(mut self, entry: impl Into<String>, module: PluginModule) -> Self {
        self.register(entry, module);
        self
    }

    /// Returns the module registered under `entry`.
    pub fn get(&self, entry: &str) -> Option<&PluginModule> {
        self.modules.get(entry)
    }

    /// Number of registered modules.
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Returns `true` if no module is registered.
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

#[async_trait]
impl ModuleResolver for ModuleRegistry {
    async fn resolve(
        &self,
        manifest: &PluginManifest,
        _dir: &Path,
    ) -> Result<PluginModule, BoxError> {
        let entry = manifest.entry();
        self.get(entry)
            .cloned()
            .ok_or_else(|| format!("no module is exported under '{entry}'").into())
    }
}

impl std::fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut entries: Vec<_> = self.modules.keys().collect();
        entries.sort();
        f.debug_struct("ModuleRegistry")
            .field("entries", &entries)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest(name: &str, entry: Option<&str>) -> PluginManifest {
        PluginManifest {
            entry: entry.map(str::to_string),
            ..PluginManifest::named(name)
        }
    }

    #[tokio::test]
    async fn test_resolve_by_entry_or_name() {
        let registry = ModuleRegistry::new()
            .with("alpha", PluginModule::new().on_init(|_ctx| async { Ok(()) }))
            .with("beta-main", PluginModule::new());

        let alpha = registry
            .resolve(&manifest("alpha", None), Path::new("."))
            .await
            .unwrap();
        assert!(alpha.has_init());

        let beta = registry
            .resolve(&manifest("beta", Some("beta-main")), Path::new("."))
            .await
            .unwrap();
        assert!(!beta.has_init());
    }

    #[tokio::test]
    async fn test_unknown_entry_fails() {
        let registry = ModuleRegistry::new();
        let err = registry
            .resolve(&manifest("ghost", None), Path::new("."))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "no module is exported under 'ghost'");
    }

    #[test]
    fn test_register_replaces() {
        let mut registry = ModuleRegistry::new();
        registry.register("a", PluginModule::new());
        registry.register("a", PluginModule::new().on_close(|| async { Ok(()) }));
        assert_eq!(registry.len(), 1);
        assert!(registry.get("a").is_some_and(PluginModule::has_close));
    }
}
