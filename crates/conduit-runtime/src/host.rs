//! The host process: one bus, its plugins, and their shutdown.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use conduit_runtime::Conduit;
//!
//! // Loads conduit.toml from the current directory, then every plugin.
//! let host = Conduit::builder().build().await?;
//! host.run().await?;
//! ```

use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use conduit_core::EventBus;
use conduit_plugin::{CloseSummary, ModuleResolver, PluginHandle, PluginLoader};
use tokio::signal;
use tracing::{info, warn};

use crate::config::{ConduitConfig, ConfigLoader, validate_config};
use crate::error::{RuntimeError, RuntimeResult};
use crate::logging;

/// A running host: the bus and the plugins loaded onto it.
///
/// ```rust,ignore
/// let host = Conduit::builder()
///     .config_file("config/conduit.toml")
///     .profile("production")
///     .build()
///     .await?;
///
/// let reply = host.bus().request(Request::new("greeter", "hello")).await?;
/// host.shutdown().await;
/// ```
pub struct Conduit {
    config: ConduitConfig,
    bus: EventBus,
    plugins: PluginHandle,
}

impl Conduit {
    /// Creates a host builder.
    pub fn builder() -> ConduitBuilder {
        ConduitBuilder::new()
    }

    /// Creates a host from an already loaded configuration.
    ///
    /// Initializes logging, then loads plugins with the link-time module
    /// registry.
    pub async fn from_config(config: ConduitConfig) -> RuntimeResult<Self> {
        Self::builder().config(config).build().await
    }

    async fn start(
        config: ConduitConfig,
        bus: EventBus,
        resolver: Option<Arc<dyn ModuleResolver>>,
    ) -> Self {
        info!(
            base_dir = %config.plugins.base_dir.display(),
            patterns = ?config.plugins.patterns,
            "Starting Conduit host"
        );

        let mut loader = PluginLoader::new(bus.clone(), config.plugins.to_loader_options());
        if let Some(resolver) = resolver {
            loader = loader.with_shared_resolver(resolver);
        }
        let plugins = loader.load_plugins().await;

        Self {
            config,
            bus,
            plugins,
        }
    }

    /// The configuration the host was built from.
    pub fn config(&self) -> &ConduitConfig {
        &self.config
    }

    /// The bus shared by every plugin.
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// The active plugins.
    pub fn plugins(&self) -> &PluginHandle {
        &self.plugins
    }

    /// Closes every plugin in load order.
    pub async fn shutdown(self) -> CloseSummary {
        info!(plugins = self.plugins.len(), "Shutting down Conduit host");
        let summary = self.plugins.close_all().await;
        if summary.is_clean() {
            info!(closed = summary.closed.len(), "Conduit host stopped");
        } else {
            warn!(failed = ?summary.failed, "Conduit host stopped with close failures");
        }
        summary
    }

    /// Runs until Ctrl+C or SIGTERM, then shuts down.
    pub async fn run(self) -> RuntimeResult<CloseSummary> {
        info!("Conduit host is running. Press Ctrl+C to stop.");
        wait_for_shutdown().await?;
        Ok(self.shutdown().await)
    }

    /// Runs until `shutdown` completes, then shuts down.
    pub async fn run_until<F>(self, shutdown: F) -> CloseSummary
    where
        F: Future<Output = ()>,
    {
        shutdown.await;
        self.shutdown().await
    }
}

impl std::fmt::Debug for Conduit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Conduit")
            .field("bus", &self.bus)
            .field("plugins", &self.plugins.names())
            .finish_non_exhaustive()
    }
}

/// Waits for Ctrl+C, or SIGTERM on unix.
async fn wait_for_shutdown() -> RuntimeResult<()> {
    #[cfg(unix)]
    {
        let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())
            .map_err(RuntimeError::Signal)?;

        tokio::select! {
            result = signal::ctrl_c() => {
                result.map_err(RuntimeError::Signal)?;
                info!("Received Ctrl+C, shutting down");
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down");
            }
        }
    }

    #[cfg(not(unix))]
    {
        signal::ctrl_c().await.map_err(RuntimeError::Signal)?;
        info!("Received Ctrl+C, shutting down");
    }

    Ok(())
}

// =============================================================================
// ConduitBuilder
// =============================================================================

/// Builder for a [`Conduit`] host.
pub struct ConduitBuilder {
    config_loader: ConfigLoader,
    config: Option<ConduitConfig>,
    bus: Option<EventBus>,
    resolver: Option<Arc<dyn ModuleResolver>>,
    init_logging: bool,
}

impl ConduitBuilder {
    /// Creates a builder searching the current directory for configuration.
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new().with_current_dir(),
            config: None,
            bus: None,
            resolver: None,
            init_logging: true,
        }
    }

    /// Sets a specific configuration file to load.
    pub fn config_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    /// Sets the configuration profile (e.g. "development", "production").
    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.config_loader = self.config_loader.profile(profile);
        self
    }

    /// Adds a search path for configuration files.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    /// Enables loading environment variables (enabled by default).
    pub fn with_env(mut self) -> Self {
        self.config_loader = self.config_loader.with_env();
        self
    }

    /// Disables loading environment variables.
    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    /// Merges additional configuration over the loaded sources.
    pub fn merge(mut self, config: ConduitConfig) -> Self {
        self.config_loader = self.config_loader.merge(config);
        self
    }

    /// Uses `config` as is, skipping every configuration source.
    pub fn config(mut self, config: ConduitConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Loads plugins onto an existing bus instead of a fresh one.
    pub fn bus(mut self, bus: EventBus) -> Self {
        self.bus = Some(bus);
        self
    }

    /// Resolves plugin entry points with `resolver` instead of the
    /// link-time registry.
    pub fn resolver(mut self, resolver: impl ModuleResolver + 'static) -> Self {
        self.resolver = Some(Arc::new(resolver));
        self
    }

    /// Leaves the global subscriber alone.
    pub fn without_logging(mut self) -> Self {
        self.init_logging = false;
        self
    }

    /// Loads and validates configuration, then loads every plugin.
    pub async fn build(self) -> RuntimeResult<Conduit> {
        let config = match self.config {
            Some(config) => config,
            None => self.config_loader.load()?,
        };
        validate_config(&config)?;

        if self.init_logging {
            logging::init_from_config(&config.logging);
        }

        let bus = self.bus.unwrap_or_default();
        Ok(Conduit::start(config, bus, self.resolver).await)
    }
}

impl Default for ConduitBuilder {
    fn default() -> Self {
        Self::new()
    }
}
