//! Layered configuration loading with figment.
//!
//! # Priority (lowest to highest)
//!
//! 1. Built-in defaults
//! 2. Main file (`rivet.toml`)
//! 3. Profile file (`rivet.{profile}.toml`)
//! 4. Environment variables (`RIVET_*`)
//! 5. Programmatic merges made before loading
//!
//! Environment variables use `__` to separate nesting levels:
//!
//! - `RIVET_CONTAINER__NAME=orders` sets `container.name`
//! - `RIVET_STARTUP__TIMEOUT_MS=500` sets `startup.timeout_ms`
//! - `RIVET_LOGGING__LEVEL=debug` sets `logging.level`
//!
//! ```rust,ignore
//! let config = ConfigLoader::new()
//!     .profile("production")
//!     .search_path("/etc/rivet")
//!     .load()?;
//! ```

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use tracing::{debug, info, trace, warn};

use super::error::{ConfigError, ConfigResult};
use super::schema::RivetConfig;
use super::validation::validate_config;

const ENV_PREFIX: &str = "RIVET_";
const PROFILE_VAR: &str = "RIVET_PROFILE";
const BASE_NAME: &str = "rivet";

/// Configuration profile selecting the `rivet.{profile}.toml` overlay.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Profile {
    #[default]
    Development,
    Production,
    Custom(String),
}

impl Profile {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Custom(name) => name,
        }
    }

    /// Parses a profile name; `dev` and `prod` are accepted as short forms.
    pub fn parse(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "development" | "dev" => Self::Development,
            other => Self::Custom(other.to_string()),
        }
    }

    /// Reads `RIVET_PROFILE`, defaulting to development.
    pub fn from_env() -> Self {
        std::env::var(PROFILE_VAR)
            .map(|p| Self::parse(&p))
            .unwrap_or_default()
    }
}

impl std::fmt::Display for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Multi-source configuration loader.
pub struct ConfigLoader {
    figment: Figment,
    profile: Option<Profile>,
    search_paths: Vec<PathBuf>,
    load_env: bool,
    config_file: Option<PathBuf>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            figment: Figment::new(),
            profile: None,
            search_paths: Vec::new(),
            load_env: true,
            config_file: None,
        }
    }

    /// Sets the profile; without one, `RIVET_PROFILE` decides at load time.
    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.profile = Some(Profile::parse(profile.as_ref()));
        self
    }

    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.search_paths.push(path.as_ref().to_path_buf());
        self
    }

    pub fn with_current_dir(self) -> Self {
        match std::env::current_dir() {
            Ok(cwd) => self.search_path(cwd),
            Err(_) => self,
        }
    }

    /// Adds `<user config dir>/rivet` to the search paths.
    pub fn with_user_config_dir(self) -> Self {
        match dirs::config_dir() {
            Some(dir) => self.search_path(dir.join(BASE_NAME)),
            None => self,
        }
    }

    /// Loads exactly this file instead of searching.
    pub fn file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_file = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn with_env(mut self) -> Self {
        self.load_env = true;
        self
    }

    pub fn without_env(mut self) -> Self {
        self.load_env = false;
        self
    }

    /// Merges a whole configuration over every other layer.
    pub fn merge(mut self, config: RivetConfig) -> Self {
        self.figment = self.figment.merge(Serialized::defaults(config));
        self
    }

    /// Loads, extracts and validates the configuration.
    pub fn load(self) -> ConfigResult<RivetConfig> {
        let profile = self.profile.clone().unwrap_or_else(Profile::from_env);
        let figment = self.build_figment(&profile)?;
        let config: RivetConfig = figment.extract()?;
        validate_config(&config)?;

        debug!(
            profile = %profile,
            container = %config.container.name,
            logging_level = %config.logging.level,
            "Configuration loaded"
        );
        Ok(config)
    }

    fn build_figment(mut self, profile: &Profile) -> ConfigResult<Figment> {
        let overrides = std::mem::take(&mut self.figment);
        let mut figment = Figment::from(Serialized::defaults(RivetConfig::default()));

        if let Some(path) = &self.config_file {
            if !path.exists() {
                return Err(ConfigError::FileNotFound(path.clone()));
            }
            info!(path = %path.display(), "Loading configuration file");
            figment = merge_file(figment, path)?;
        } else {
            figment = self.load_config_files(figment, profile);
        }

        if self.load_env {
            trace!(prefix = ENV_PREFIX, "Loading environment variables");
            figment = figment.merge(Env::prefixed(ENV_PREFIX).ignore(&["PROFILE"]).split("__"));
        }
        Ok(figment.merge(overrides))
    }

    fn resolve_search_paths(&self) -> Vec<PathBuf> {
        if !self.search_paths.is_empty() {
            return self.search_paths.clone();
        }
        let mut paths = Vec::new();
        if let Ok(cwd) = std::env::current_dir() {
            paths.push(cwd);
        }
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join(BASE_NAME));
        }
        paths
    }

    /// Merges the main file then the profile file from the first search path
    /// that has either.
    fn load_config_files(&self, mut figment: Figment, profile: &Profile) -> Figment {
        for dir in self.resolve_search_paths() {
            let base_path = dir.join(format!("{BASE_NAME}.toml"));
            let profile_path = dir.join(format!("{BASE_NAME}.{}.toml", profile.as_str()));
            if !base_path.exists() && !profile_path.exists() {
                continue;
            }

            if base_path.exists() {
                info!(path = %base_path.display(), "Loading configuration file");
                figment = figment.merge(Toml::file(&base_path));
            }
            if profile_path.exists() {
                debug!(path = %profile_path.display(), "Loading profile-specific config");
                figment = figment.merge(Toml::file(&profile_path));
            }
            return figment;
        }
        warn!("No configuration file found, using defaults");
        figment
    }
}

fn merge_file(figment: Figment, path: &Path) -> ConfigResult<Figment> {
    match path.extension().and_then(|e| e.to_str()).unwrap_or("") {
        "toml" => Ok(figment.merge(Toml::file(path))),
        other => Err(ConfigError::UnsupportedFormat(other.to_string())),
    }
}

/// Loads configuration from the current directory and the user config dir.
pub fn load_config() -> ConfigResult<RivetConfig> {
    ConfigLoader::new().load()
}

/// Loads configuration from one file plus environment overrides.
pub fn load_config_from_file<P: AsRef<Path>>(path: P) -> ConfigResult<RivetConfig> {
    ConfigLoader::new().file(path).load()
}

#[cfg(test)]
mod tests {
    use figment::Jail;

    use super::*;
    use crate::config::{LogLevel, OnTimeout};

    #[test]
    fn test_defaults_without_files() {
        Jail::expect_with(|jail| {
            let config = ConfigLoader::new()
                .search_path(jail.directory())
                .without_env()
                .load()
                .map_err(|e| e.to_string())?;
            assert_eq!(config.container.name, "rivet");
            assert!(config.container.standard_converters);
            assert_eq!(config.logging.level, LogLevel::Info);
            Ok(())
        });
    }

    #[test]
    fn test_file_then_env_override() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "rivet.toml",
                r#"
                [container]
                name = "orders"

                [startup]
                enabled = true
                timeout_ms = 250
                interval_ms = 50
                on_timeout = "fail"
                "#,
            )?;
            jail.set_env("RIVET_CONTAINER__NAME", "billing");
            jail.set_env("RIVET_LOGGING__LEVEL", "debug");

            let config = ConfigLoader::new()
                .search_path(jail.directory())
                .load()
                .map_err(|e| e.to_string())?;
            assert_eq!(config.container.name, "billing");
            assert_eq!(config.logging.level, LogLevel::Debug);
            assert_eq!(config.startup.timeout_ms, 250);
            assert_eq!(config.startup.on_timeout, OnTimeout::Fail);
            Ok(())
        });
    }

    #[test]
    fn test_profile_file_overrides_main_file() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "rivet.production.toml",
                "[container]\nname = \"prod\"\nfail_fast_bindings = true\n",
            )?;
            jail.create_file(
                "rivet.toml",
                "[container]\nname = \"main\"\ndefault_charset = \"US-ASCII\"\n",
            )?;

            let config = ConfigLoader::new()
                .profile("prod")
                .search_path(jail.directory())
                .without_env()
                .load()
                .map_err(|e| e.to_string())?;
            assert_eq!(config.container.name, "prod");
            assert!(config.container.fail_fast_bindings);
            assert_eq!(config.container.default_charset.as_deref(), Some("US-ASCII"));
            Ok(())
        });
    }

    #[test]
    fn test_programmatic_merge_wins_over_file_and_env() {
        Jail::expect_with(|jail| {
            jail.create_file("rivet.toml", "[container]\nname = \"from-file\"\n")?;
            jail.set_env("RIVET_CONTAINER__NAME", "from-env");

            let mut overrides = RivetConfig::default();
            overrides.container.name = "from-code".into();
            let config = ConfigLoader::new()
                .search_path(jail.directory())
                .merge(overrides)
                .load()
                .map_err(|e| e.to_string())?;
            assert_eq!(config.container.name, "from-code");
            Ok(())
        });
    }

    #[test]
    fn test_profile_from_env() {
        Jail::expect_with(|jail| {
            jail.set_env("RIVET_PROFILE", "prod");
            assert_eq!(Profile::from_env(), Profile::Production);
            jail.set_env("RIVET_PROFILE", "staging");
            assert_eq!(Profile::from_env(), Profile::Custom("staging".into()));
            Ok(())
        });
    }

    #[test]
    fn test_missing_explicit_file() {
        Jail::expect_with(|jail| {
            let missing = jail.directory().join("absent.toml");
            let result = ConfigLoader::new().file(&missing).without_env().load();
            assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
            Ok(())
        });
    }

    #[test]
    fn test_invalid_values_fail_validation() {
        Jail::expect_with(|jail| {
            jail.create_file("rivet.toml", "[container]\nname = \"\"\n")?;
            let result = ConfigLoader::new()
                .search_path(jail.directory())
                .without_env()
                .load();
            assert!(matches!(result, Err(ConfigError::MissingField { .. })));
            Ok(())
        });
    }
}
