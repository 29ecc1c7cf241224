//! Configuration validation utilities.

use super::error::{ConfigError, ConfigResult};
use super::schema::{ConduitConfig, LogOutput, LoggingConfig, PluginsConfig};

/// Validates the entire configuration.
pub fn validate_config(config: &ConduitConfig) -> ConfigResult<()> {
    validate_logging_config(&config.logging)?;
    validate_plugins_config(&config.plugins)?;
    Ok(())
}

/// Validates logging settings.
fn validate_logging_config(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::missing_field("logging.file_path"));
    }

    if logging.filters.keys().any(|target| target.trim().is_empty()) {
        return Err(ConfigError::validation(
            "Log filter targets cannot be empty",
        ));
    }

    Ok(())
}

/// Validates plugin discovery settings.
fn validate_plugins_config(plugins: &PluginsConfig) -> ConfigResult<()> {
    if plugins.patterns.is_empty() {
        return Err(ConfigError::missing_field("plugins.patterns"));
    }

    if plugins.patterns.iter().any(|p| p.trim().is_empty()) {
        return Err(ConfigError::validation(
            "Plugin patterns cannot be empty strings",
        ));
    }

    if plugins.init_timeout_ms == 0 {
        return Err(ConfigError::validation(
            "Plugin init timeout must be greater than 0",
        ));
    }

    let manifest = plugins.manifest_file.trim();
    if manifest.is_empty() {
        return Err(ConfigError::missing_field("plugins.manifest_file"));
    }
    if manifest.contains('/') || manifest.contains('\\') {
        return Err(ConfigError::validation(format!(
            "Manifest file must be a bare file name, got: {manifest}"
        )));
    }

    Ok(())
}
