//! Discovery, description, loading and initialization of plugins.
//!
//! Each candidate directory moves through
//!
//! ```text
//! Discovered ──► Described ──► Loaded ──► Initialized ──► Active
//!      │             │            │            │
//!      └─────────────┴────────────┴────────────┴──► Rejected(kind)
//! ```
//!
//! A rejection is logged, reported on `core/plugin-load-error` and never
//! stops the batch. Active plugins end up in the returned [`PluginHandle`] in
//! discovery order.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use conduit_core::{EventBus, Message, PLUGIN_LOAD_ERROR};
use futures::FutureExt;
use serde_json::{Map, Value};
use tracing::{Instrument, debug, info, info_span, warn};

use crate::discovery::discover;
use crate::error::{PluginError, PluginResult};
use crate::facade::PluginContext;
use crate::handle::{Plugin, PluginHandle};
use crate::manifest::{DEFAULT_MANIFEST_FILE, PluginManifest};
use crate::module::{ModuleRegistry, ModuleResolver};
use crate::util::panic_message;

/// Default discovery pattern.
pub const DEFAULT_PATTERN: &str = "plugins/*";

/// Default bound on a plugin's `init`.
pub const DEFAULT_INIT_TIMEOUT: Duration = Duration::from_secs(30);

// ─── LoaderOptions ────────────────────────────────────────────────────────────

/// Where to look for plugins and how to treat them.
#[derive(Debug, Clone)]
pub struct LoaderOptions {
    /// Directory the patterns are relative to.
    pub base_dir: PathBuf,
    /// Glob patterns matching plugin directories, in priority order.
    pub patterns: Vec<String>,
    /// Manifest file name inside each plugin directory.
    pub manifest_file: String,
    /// Load a directory matched by several patterns only once.
    pub dedupe: bool,
    /// Bound on each plugin's `init`.
    pub init_timeout: Duration,
    /// Per-plugin settings sections, keyed by plugin name.
    pub settings: HashMap<String, Value>,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("."),
            patterns: vec![DEFAULT_PATTERN.to_string()],
            manifest_file: DEFAULT_MANIFEST_FILE.to_string(),
            dedupe: false,
            init_timeout: DEFAULT_INIT_TIMEOUT,
            settings: HashMap::new(),
        }
    }
}

impl LoaderOptions {
    /// Options rooted at `base_dir` with default patterns.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            ..Self::default()
        }
    }

    /// Replaces the discovery patterns.
    pub fn with_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.patterns = patterns.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the manifest file name.
    pub fn with_manifest_file(mut self, file_name: impl Into<String>) -> Self {
        self.manifest_file = file_name.into();
        self
    }

    /// Enables or disables duplicate suppression.
    pub fn with_dedupe(mut self, dedupe: bool) -> Self {
        self.dedupe = dedupe;
        self
    }

    /// Sets the `init` bound.
    pub fn with_init_timeout(mut self, timeout: Duration) -> Self {
        self.init_timeout = timeout;
        self
    }

    /// Sets the settings section of plugin `name`.
    pub fn with_settings(mut self, name: impl Into<String>, settings: Value) -> Self {
        self.settings.insert(name.into(), settings);
        self
    }
}

// ─── PluginLoader ─────────────────────────────────────────────────────────────

/// Loads plugins onto one bus.
pub struct PluginLoader {
    bus: EventBus,
    resolver: Arc<dyn ModuleResolver>,
    options: LoaderOptions,
}

impl PluginLoader {
    /// Creates a loader that resolves entry points against every module
    /// exported at link time.
    pub fn new(bus: EventBus, options: LoaderOptions) -> Self {
        Self {
            bus,
            resolver: Arc::new(ModuleRegistry::collect()),
            options,
        }
    }

    /// Replaces the module resolver.
    pub fn with_resolver(mut self, resolver: impl ModuleResolver + 'static) -> Self {
        self.resolver = Arc::new(resolver);
        self
    }

    /// Replaces the module resolver with one shared with other loaders.
    pub fn with_shared_resolver(mut self, resolver: Arc<dyn ModuleResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// The loader's options.
    pub fn options(&self) -> &LoaderOptions {
        &self.options
    }

    /// Lists candidate directories without loading them.
    pub fn discover(&self) -> Vec<PathBuf> {
        discover(
            &self.options.base_dir,
            &self.options.patterns,
            self.options.dedupe,
        )
    }

    /// Loads every discovered plugin, one after another.
    ///
    /// Never fails: rejected candidates are reported on
    /// `core/plugin-load-error` and left out of the handle.
    pub async fn load_plugins(&self) -> PluginHandle {
        let candidates = self.discover();
        info!(candidates = candidates.len(), "Loading plugins");

        let mut handle = PluginHandle::new();
        for dir in candidates {
            let span = info_span!("plugin", path = %dir.display());
            match self.load_plugin(&dir).instrument(span).await {
                Ok(plugin) => handle.push(plugin),
                Err(e) => self.report(&dir, &e),
            }
        }

        info!(active = handle.len(), names = ?handle.names(), "Plugins loaded");
        handle
    }

    /// Takes one directory from description to activation.
    ///
    /// Does not report the error on the bus; [`load_plugins`](Self::load_plugins)
    /// does.
    pub async fn load_plugin(&self, dir: &Path) -> PluginResult<Plugin> {
        let manifest = PluginManifest::read(dir, &self.options.manifest_file).await?;
        debug!(plugin = %manifest.name, "Plugin described");

        let module = self
            .resolver
            .resolve(&manifest, dir)
            .await
            .map_err(|e| PluginError::Load {
                name: manifest.name.clone(),
                entry: manifest.entry().to_string(),
                reason: e.to_string(),
            })?;
        debug!(plugin = %manifest.name, entry = %manifest.entry(), "Plugin module loaded");

        let init = module.init_fn().ok_or_else(|| PluginError::NoInit {
            name: manifest.name.clone(),
        })?;

        let ctx = PluginContext::new(
            self.bus.clone(),
            &manifest.name,
            dir,
            self.settings_for(&manifest.name),
        );
        let timeout = self.options.init_timeout;
        let running = AssertUnwindSafe(async move { init(ctx).await }).catch_unwind();

        match tokio::time::timeout(timeout, running).await {
            Err(_) => {
                return Err(PluginError::InitTimeout {
                    name: manifest.name,
                    timeout,
                });
            }
            Ok(Err(panic)) => {
                return Err(PluginError::Init {
                    name: manifest.name,
                    source: format!("init panicked: {}", panic_message(&*panic)).into(),
                });
            }
            Ok(Ok(Err(source))) => {
                return Err(PluginError::Init {
                    name: manifest.name,
                    source,
                });
            }
            Ok(Ok(Ok(()))) => {}
        }

        info!(
            plugin = %manifest.name,
            version = manifest.version.as_deref().unwrap_or("-"),
            "Plugin active"
        );
        Ok(Plugin::new(manifest, dir.to_path_buf(), module.close_fn()))
    }

    fn settings_for(&self, name: &str) -> Value {
        self.options
            .settings
            .get(name)
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new()))
    }

    fn report(&self, dir: &Path, error: &PluginError) {
        warn!(
            path = %dir.display(),
            kind = error.kind(),
            error = %error,
            "Plugin rejected"
        );

        let mut notification = Message::core(PLUGIN_LOAD_ERROR)
            .with("message", error.to_string())
            .with("kind", error.kind())
            .with("path", dir.display().to_string());
        if let Some(name) = error.plugin_name() {
            notification.insert("name", name);
        }
        self.bus.notify(notification);
    }
}

impl std::fmt::Debug for PluginLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginLoader")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// Loads plugins onto `bus` with the link-time module registry.
pub async fn load_plugins(bus: &EventBus, options: LoaderOptions) -> PluginHandle {
    PluginLoader::new(bus.clone(), options).load_plugins().await
}
