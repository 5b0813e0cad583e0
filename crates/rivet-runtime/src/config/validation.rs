//! Configuration validation.

use rivet_converters::Charset;

use super::error::{ConfigError, ConfigResult};
use super::schema::{ContainerConfig, LogOutput, LoggingConfig, RivetConfig, StartupConditionConfig};

/// Validates the entire configuration.
pub fn validate_config(config: &RivetConfig) -> ConfigResult<()> {
    validate_container_config(&config.container)?;
    validate_logging_config(&config.logging)?;
    validate_startup_config(&config.startup)?;
    Ok(())
}

fn validate_container_config(container: &ContainerConfig) -> ConfigResult<()> {
    if container.name.trim().is_empty() {
        return Err(ConfigError::missing_field("container.name"));
    }
    if container.name.chars().any(char::is_whitespace) {
        return Err(ConfigError::validation("Container name cannot contain whitespace"));
    }
    if let Some(charset) = &container.default_charset {
        charset.parse::<Charset>().map_err(|e| ConfigError::validation(e.to_string()))?;
    }
    Ok(())
}

fn validate_logging_config(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::missing_field("logging.file_path"));
    }
    if logging.max_files == 0 {
        return Err(ConfigError::validation("logging.max_files must be greater than 0"));
    }
    if let Some(module) = logging.filters.keys().find(|m| m.trim().is_empty()) {
        return Err(ConfigError::validation(format!(
            "Invalid log filter target: {module:?}"
        )));
    }
    Ok(())
}

fn validate_startup_config(startup: &StartupConditionConfig) -> ConfigResult<()> {
    if !startup.enabled {
        return Ok(());
    }
    if startup.interval_ms == 0 {
        return Err(ConfigError::validation("startup.interval_ms must be greater than 0"));
    }
    if startup.interval_ms > startup.timeout_ms {
        return Err(ConfigError::validation(format!(
            "startup.interval_ms ({}) must not exceed startup.timeout_ms ({})",
            startup.interval_ms, startup.timeout_ms
        )));
    }
    Ok(())
}
