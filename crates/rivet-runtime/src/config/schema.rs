//! Configuration schema definitions.
//!
//! ```toml
//! [container]
//! name = "orders"
//! fail_fast_bindings = true
//! default_charset = "ISO-8859-1"
//!
//! [logging]
//! level = "debug"
//! format = "pretty"
//!
//! [logging.filters]
//! rivet_core = "trace"
//!
//! [startup]
//! enabled = true
//! timeout_ms = 250
//! on_timeout = "stop"
//! ```

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RivetConfig {
    #[serde(default)]
    pub container: ContainerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub startup: StartupConditionConfig,
}

// =============================================================================
// Container
// =============================================================================

/// Settings for the container built by the runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerConfig {
    /// Container name, used in logs.
    #[serde(default = "default_container_name")]
    pub name: String,

    /// Treat every binding as critical: the first failure halts start.
    #[serde(default)]
    pub fail_fast_bindings: bool,

    /// Register the standard converter set on build.
    #[serde(default = "default_true")]
    pub standard_converters: bool,

    /// Charset placed in conversion contexts that do not name one.
    #[serde(default)]
    pub default_charset: Option<String>,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            name: default_container_name(),
            fail_fast_bindings: false,
            standard_converters: true,
            default_charset: None,
        }
    }
}

fn default_container_name() -> String {
    "rivet".to_string()
}

fn default_true() -> bool {
    true
}

// =============================================================================
// Logging
// =============================================================================

/// Log verbosity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Full,
    Pretty,
    /// Requires the `json-log` feature.
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
    /// Requires `file_path`.
    File,
}

/// Which span lifecycle events are logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SpanEventConfig {
    #[serde(default)]
    pub new: bool,
    #[serde(default)]
    pub enter: bool,
    #[serde(default)]
    pub exit: bool,
    #[serde(default)]
    pub close: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub level: LogLevel,

    #[serde(default)]
    pub format: LogFormat,

    #[serde(default)]
    pub output: LogOutput,

    #[serde(default)]
    pub file_path: Option<PathBuf>,

    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,

    #[serde(default = "default_max_files")]
    pub max_files: u32,

    #[serde(default)]
    pub thread_ids: bool,

    /// Include file names and line numbers.
    #[serde(default)]
    pub file_location: bool,

    #[serde(default)]
    pub span_events: SpanEventConfig,

    /// Per-module levels, e.g. `rivet_core = "trace"`.
    #[serde(default)]
    pub filters: HashMap<String, LogLevel>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::default(),
            format: LogFormat::default(),
            output: LogOutput::default(),
            file_path: None,
            max_file_size: default_max_file_size(),
            max_files: default_max_files(),
            thread_ids: false,
            file_location: false,
            span_events: SpanEventConfig::default(),
            filters: HashMap::new(),
        }
    }
}

fn default_max_file_size() -> u64 {
    10 * 1024 * 1024
}

fn default_max_files() -> u32 {
    5
}

// =============================================================================
// Startup conditions
// =============================================================================

/// What happens when startup conditions do not pass in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OnTimeout {
    /// Veto the start and stop the container.
    #[default]
    Stop,
    /// Return an error from `start`.
    Fail,
    /// Log a warning and carry on.
    Ignore,
}

impl fmt::Display for OnTimeout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Stop => "stop",
            Self::Fail => "fail",
            Self::Ignore => "ignore",
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartupConditionConfig {
    /// Conditions are only checked when enabled.
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_startup_timeout_ms")]
    pub timeout_ms: u64,

    /// Delay between two polls of a failing condition.
    #[serde(default = "default_startup_interval_ms")]
    pub interval_ms: u64,

    #[serde(default)]
    pub on_timeout: OnTimeout,
}

impl StartupConditionConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl Default for StartupConditionConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            timeout_ms: default_startup_timeout_ms(),
            interval_ms: default_startup_interval_ms(),
            on_timeout: OnTimeout::default(),
        }
    }
}

fn default_startup_timeout_ms() -> u64 {
    10_000
}

fn default_startup_interval_ms() -> u64 {
    100
}
