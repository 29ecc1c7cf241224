//! The per-directory plugin manifest.
//!
//! ```json
//! {
//!   "name": "greeter",
//!   "version": "1.0.0",
//!   "entry": "greeter",
//!   "description": "Answers greeter/hello",
//!   "dependencies": { "logger": "^1" }
//! }
//! ```
//!
//! Only `name` is required. Unknown fields are ignored.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PluginError, PluginResult};

/// Default manifest file name.
pub const DEFAULT_MANIFEST_FILE: &str = "plugin.json";

/// Descriptive metadata read from a plugin directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginManifest {
    /// Unique plugin name.
    pub name: String,
    /// Plugin version string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Module identifier; defaults to `name`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry: Option<String>,
    /// One-line description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Declared dependencies, name → version requirement. Informational only.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub dependencies: BTreeMap<String, String>,
}

impl PluginManifest {
    /// Creates a manifest carrying only a name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: None,
            entry: None,
            description: None,
            dependencies: BTreeMap::new(),
        }
    }

    /// The module identifier to resolve.
    pub fn entry(&self) -> &str {
        self.entry.as_deref().unwrap_or(&self.name)
    }

    /// Parses and validates manifest text.
    ///
    /// `dir` and `file_name` only feed the error message.
    pub fn parse(text: &str, dir: &Path, file_name: &str) -> PluginResult<Self> {
        let invalid = |reason: String| PluginError::Manifest {
            path: dir.to_path_buf(),
            manifest: file_name.to_string(),
            reason,
        };

        let manifest: Self = serde_json::from_str(text).map_err(|e| invalid(e.to_string()))?;
        if manifest.name.trim().is_empty() {
            return Err(invalid("name must not be empty".to_string()));
        }
        Ok(manifest)
    }

    /// Reads `dir/file_name`.
    ///
    /// # Errors
    ///
    /// [`PluginError::Manifest`] if the file is missing, unreadable, not a
    /// JSON object or has no non-empty `name`.
    pub async fn read(dir: &Path, file_name: &str) -> PluginResult<Self> {
        let text = tokio::fs::read_to_string(dir.join(file_name))
            .await
            .map_err(|e| PluginError::Manifest {
                path: dir.to_path_buf(),
                manifest: file_name.to_string(),
                reason: match e.kind() {
                    ErrorKind::NotFound => "file not found".to_string(),
                    _ => e.to_string(),
                },
            })?;
        Self::parse(&text, dir, file_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> PluginResult<PluginManifest> {
        PluginManifest::parse(text, Path::new("plugins/p"), DEFAULT_MANIFEST_FILE)
    }

    #[test]
    fn test_minimal_manifest() {
        let manifest = parse(r#"{"name": "greeter"}"#).unwrap();
        assert_eq!(manifest, PluginManifest::named("greeter"));
        assert_eq!(manifest.entry(), "greeter");
    }

    #[test]
    fn test_full_manifest() {
        let manifest = parse(
            r#"{
                "name": "greeter",
                "version": "1.2.0",
                "entry": "greeter-v2",
                "description": "says hello",
                "dependencies": {"logger": "^1"},
                "private": true
            }"#,
        )
        .unwrap();

        assert_eq!(manifest.entry(), "greeter-v2");
        assert_eq!(manifest.version.as_deref(), Some("1.2.0"));
        assert_eq!(manifest.dependencies.get("logger").map(String::as_str), Some("^1"));
    }

    #[test]
    fn test_missing_or_empty_name_is_rejected() {
        for text in [r#"{}"#, r#"{"name": ""}"#, r#"{"name": "  "}"#, "not json", "[]"] {
            let err = parse(text).unwrap_err();
            assert_eq!(err.kind(), "manifest-error", "{text}");
        }
    }

    #[tokio::test]
    async fn test_read_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = PluginManifest::read(dir.path(), DEFAULT_MANIFEST_FILE)
            .await
            .unwrap_err();
        assert!(err.to_string().ends_with("is ignored: file not found"));
    }
}
