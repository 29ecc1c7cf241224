//! The set of active plugins returned by the loader.

use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};

use conduit_core::BoxError;
use futures::FutureExt;
use tracing::{error, info, warn};

use crate::manifest::PluginManifest;
use crate::module::CloseFn;
use crate::util::panic_message;

/// A plugin whose `init` completed successfully.
pub struct Plugin {
    manifest: PluginManifest,
    path: PathBuf,
    close: Option<CloseFn>,
}

impl Plugin {
    pub(crate) fn new(manifest: PluginManifest, path: PathBuf, close: Option<CloseFn>) -> Self {
        Self {
            manifest,
            path,
            close,
        }
    }

    /// The plugin's name.
    pub fn name(&self) -> &str {
        &self.manifest.name
    }

    /// The manifest version, if any.
    pub fn version(&self) -> Option<&str> {
        self.manifest.version.as_deref()
    }

    /// The manifest description, if any.
    pub fn description(&self) -> Option<&str> {
        self.manifest.description.as_deref()
    }

    /// Declared dependencies.
    pub fn dependencies(&self) -> &BTreeMap<String, String> {
        &self.manifest.dependencies
    }

    /// The full manifest.
    pub fn manifest(&self) -> &PluginManifest {
        &self.manifest
    }

    /// The directory the plugin was loaded from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns `true` if the plugin defines `close`.
    pub fn has_close(&self) -> bool {
        self.close.is_some()
    }

    /// Runs `close`, turning a panic into an error. A plugin without `close`
    /// succeeds immediately.
    pub async fn close(&self) -> Result<(), BoxError> {
        let Some(close) = &self.close else {
            return Ok(());
        };
        let close = close.clone();
        match AssertUnwindSafe(async move { close().await })
            .catch_unwind()
            .await
        {
            Ok(result) => result,
            Err(panic) => Err(format!("close panicked: {}", panic_message(&*panic)).into()),
        }
    }
}

impl std::fmt::Debug for Plugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Plugin")
            .field("name", &self.name())
            .field("path", &self.path)
            .field("close", &self.has_close())
            .finish()
    }
}

/// Outcome of [`PluginHandle::close_all`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CloseSummary {
    /// Plugins whose `close` ran and succeeded.
    pub closed: Vec<String>,
    /// Plugins whose `close` failed or panicked.
    pub failed: Vec<String>,
}

impl CloseSummary {
    /// Returns `true` if no `close` failed.
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Ordered list of active plugins, in discovery order.
#[derive(Debug, Default)]
pub struct PluginHandle {
    plugins: Vec<Plugin>,
}

impl PluginHandle {
    /// Creates an empty handle.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, plugin: Plugin) {
        self.plugins.push(plugin);
    }

    /// Returns the first plugin named `name`.
    pub fn get(&self, name: &str) -> Option<&Plugin> {
        self.plugins.iter().find(|p| p.name() == name)
    }

    /// Plugin names in load order.
    pub fn names(&self) -> Vec<&str> {
        self.plugins.iter().map(Plugin::name).collect()
    }

    /// Iterates plugins in load order.
    pub fn iter(&self) -> std::slice::Iter<'_, Plugin> {
        self.plugins.iter()
    }

    /// Number of active plugins.
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    /// Returns `true` if no plugin is active.
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Calls `close` on every plugin that defines one, in load order.
    ///
    /// A failing or panicking `close` is logged and recorded in the summary;
    /// it never stops the remaining plugins from closing.
    pub async fn close_all(&self) -> CloseSummary {
        let mut summary = CloseSummary::default();

        for plugin in self.plugins.iter().filter(|p| p.has_close()) {
            match plugin.close().await {
                Ok(()) => {
                    info!(plugin = %plugin.name(), "Plugin closed");
                    summary.closed.push(plugin.name().to_string());
                }
                Err(e) => {
                    error!(plugin = %plugin.name(), error = %e, "Plugin close failed");
                    summary.failed.push(plugin.name().to_string());
                }
            }
        }

        if !summary.is_clean() {
            warn!(
                closed = summary.closed.len(),
                failed = summary.failed.len(),
                "Some plugins did not close cleanly"
            );
        }
        summary
    }
}

impl<'a> IntoIterator for &'a PluginHandle {
    type Item = &'a Plugin;
    type IntoIter = std::slice::Iter<'a, Plugin>;

    fn into_iter(self) -> Self::IntoIter {
        self.plugins.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::PluginModule;
    use std::sync::Arc;

    fn plugin(name: &str, module: PluginModule) -> Plugin {
        Plugin::new(
            PluginManifest::named(name),
            PathBuf::from(name),
            module.close_fn(),
        )
    }

    #[tokio::test]
    async fn test_close_all_continues_after_failure() {
        let order = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let closing = |name: &'static str| {
            let order = Arc::clone(&order);
            PluginModule::new().on_close(move || {
                let order = Arc::clone(&order);
                async move {
                    order.lock().push(name);
                    Ok(())
                }
            })
        };

        let mut handle = PluginHandle::new();
        handle.push(plugin("first", closing("first")));
        handle.push(plugin(
            "second",
            PluginModule::new().on_close(|| async { Err("disk full".into()) }),
        ));
        handle.push(plugin("silent", PluginModule::new()));
        handle.push(plugin(
            "third",
            PluginModule::new().on_close(|| async { panic!("close exploded") }),
        ));
        handle.push(plugin("fourth", closing("fourth")));

        let summary = handle.close_all().await;

        assert_eq!(*order.lock(), vec!["first", "fourth"]);
        assert_eq!(summary.closed, vec!["first", "fourth"]);
        assert_eq!(summary.failed, vec!["second", "third"]);
        assert!(!summary.is_clean());
    }

    #[test]
    fn test_lookup() {
        let mut handle = PluginHandle::new();
        handle.push(plugin("a", PluginModule::new()));
        handle.push(plugin("b", PluginModule::new()));

        assert_eq!(handle.names(), vec!["a", "b"]);
        assert_eq!(handle.len(), 2);
        assert!(handle.get("b").is_some());
        assert!(handle.get("c").is_none());
        assert_eq!((&handle).into_iter().count(), 2);
    }
}
