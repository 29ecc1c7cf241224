//! Error types for plugin loading.
//!
//! A [`PluginError`] never aborts a batch. The loader reports it on
//! `core/plugin-load-error` and moves on to the next candidate.

use std::path::PathBuf;
use std::time::Duration;

use conduit_core::BoxError;
use thiserror::Error;

/// Why a plugin candidate was rejected.
#[derive(Debug, Error)]
pub enum PluginError {
    /// The manifest is missing, unreadable, not valid JSON or has no name.
    #[error(
        "the folder {} does not contain a correct {manifest} and is ignored: {reason}",
        path.display()
    )]
    Manifest {
        /// The candidate directory.
        path: PathBuf,
        /// The manifest file name that was looked for.
        manifest: String,
        /// What was wrong with it.
        reason: String,
    },

    /// The entry point could not be resolved into a module.
    #[error("could not load entry point '{entry}' of plugin {name}: {reason}")]
    Load {
        /// Plugin name from the manifest.
        name: String,
        /// The entry point that failed to resolve.
        entry: String,
        /// Resolver message.
        reason: String,
    },

    /// The module exposes no `init`.
    #[error("plugin {name} does not export an init function")]
    NoInit {
        /// Plugin name from the manifest.
        name: String,
    },

    /// `init` returned an error or panicked.
    #[error("init of plugin {name} failed: {source}")]
    Init {
        /// Plugin name from the manifest.
        name: String,
        /// The underlying failure.
        #[source]
        source: BoxError,
    },

    /// `init` did not complete in time.
    #[error("init of plugin {name} did not complete within {timeout:?}")]
    InitTimeout {
        /// Plugin name from the manifest.
        name: String,
        /// The configured bound.
        timeout: Duration,
    },
}

impl PluginError {
    /// Stable machine-readable tag, carried as `kind` in the load-error notification.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Manifest { .. } => "manifest-error",
            Self::Load { .. } => "load-error",
            Self::NoInit { .. } => "no-init",
            Self::Init { .. } => "init-error",
            Self::InitTimeout { .. } => "init-timeout",
        }
    }

    /// The plugin name, once the manifest has been read.
    pub fn plugin_name(&self) -> Option<&str> {
        match self {
            Self::Manifest { .. } => None,
            Self::Load { name, .. }
            | Self::NoInit { name }
            | Self::Init { name, .. }
            | Self::InitTimeout { name, .. } => Some(name),
        }
    }
}

/// Result type for plugin operations.
pub type PluginResult<T> = Result<T, PluginError>;
