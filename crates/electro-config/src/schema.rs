//! Configuration sections.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Application identity and error exposure.
///
/// # Example
///
/// ```
/// use electro_config::AppConfig;
///
/// let config = AppConfig::default();
/// assert_eq!(config.name, "electro-app");
/// assert!(!config.expose_internal_errors);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Application name, used in logs.
    #[serde(default = "default_app_name")]
    pub name: String,

    /// Deployment environment (e.g., "development", "production").
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Show internal error messages in error responses.
    #[serde(default)]
    pub expose_internal_errors: bool,

    /// Accept `x-request-id` from clients instead of generating one.
    #[serde(default)]
    pub trust_request_id: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            environment: default_environment(),
            expose_internal_errors: false,
            trust_request_id: false,
        }
    }
}

fn default_app_name() -> String {
    "electro-app".to_string()
}

fn default_environment() -> String {
    "development".to_string()
}

/// Log format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON formatted logs (production).
    #[default]
    Json,
    /// Human-readable pretty format (development).
    Pretty,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Enable logging.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Filter directives (e.g., "info", "electro_pipeline=debug,warn").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Include source file and line in logs.
    #[serde(default)]
    pub include_location: bool,

    /// Emit span open/close events.
    #[serde(default)]
    pub span_events: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: default_log_level(),
            format: LogFormat::default(),
            include_location: false,
            span_events: false,
        }
    }
}

impl LoggingConfig {
    /// Converts to the subscriber settings understood by `electro-telemetry`.
    #[must_use]
    pub fn to_log_config(&self) -> electro_telemetry::LogConfig {
        electro_telemetry::LogConfig {
            enabled: self.enabled,
            level: self.level.clone(),
            json_format: self.format == LogFormat::Json,
            span_events: self.span_events,
            file_line_info: self.include_location,
            thread_ids: false,
            include_target: true,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Dispatch behaviour.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct DispatchConfig {
    /// Deadline for one request in milliseconds. `0` disables the deadline.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,

    /// Log every route pattern tried.
    #[serde(default)]
    pub trace_routing: bool,

    /// Record dispatch metrics.
    #[serde(default = "default_true")]
    pub record_metrics: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: default_request_timeout(),
            trace_routing: false,
            record_metrics: true,
        }
    }
}

impl DispatchConfig {
    /// The request deadline, if any.
    #[must_use]
    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_ms > 0).then(|| Duration::from_millis(self.request_timeout_ms))
    }
}

fn default_request_timeout() -> u64 {
    30_000
}

/// Flash message session settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
    /// Register the flash message stage.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Request header carrying the session identifier.
    #[serde(default = "default_session_header")]
    pub header: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            header: default_session_header(),
        }
    }
}

fn default_session_header() -> String {
    "x-session-id".to_string()
}

fn default_true() -> bool {
    true
}
