//! The root configuration type.

use serde::{Deserialize, Serialize};

use crate::{AppConfig, ConfigError, DispatchConfig, LogFormat, LoggingConfig, SessionConfig};

/// Complete Electro application configuration.
///
/// Use [`ConfigLoader`](crate::ConfigLoader) to load it from files and
/// environment variables.
///
/// # Example
///
/// ```
/// use electro_config::ElectroConfig;
///
/// let config = ElectroConfig::default();
/// assert_eq!(config.dispatch.request_timeout_ms, 30_000);
/// assert!(config.session.enabled);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct ElectroConfig {
    /// Application settings.
    #[serde(default)]
    pub app: AppConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Dispatch settings.
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Flash message session settings.
    #[serde(default)]
    pub session: SessionConfig,
}

impl ElectroConfig {
    /// Create a new configuration builder.
    #[must_use]
    pub fn builder() -> ElectroConfigBuilder {
        ElectroConfigBuilder::new()
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if:
    /// - the application name is empty
    /// - the log filter directives do not parse
    /// - the session header is not a valid lowercase header name
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.app.name.trim().is_empty() {
            return Err(ConfigError::invalid_value("app.name", "must not be empty"));
        }

        if self.logging.enabled {
            electro_telemetry::logging::create_env_filter(&self.logging.level)
                .map_err(|e| ConfigError::invalid_value("logging.level", e.to_string()))?;
        }

        if self.session.enabled && !is_header_name(&self.session.header) {
            return Err(ConfigError::invalid_value(
                "session.header",
                format!("not a lowercase header name: '{}'", self.session.header),
            ));
        }

        Ok(())
    }

    /// Development preset: pretty debug logs, internal errors exposed,
    /// routing traced.
    ///
    /// ```
    /// use electro_config::{ElectroConfig, LogFormat};
    ///
    /// let config = ElectroConfig::development();
    /// assert_eq!(config.logging.format, LogFormat::Pretty);
    /// assert!(config.app.expose_internal_errors);
    /// ```
    #[must_use]
    pub fn development() -> Self {
        let mut config = Self::default();
        config.app.environment = "development".to_string();
        config.app.expose_internal_errors = true;
        config.logging.level = "debug".to_string();
        config.logging.format = LogFormat::Pretty;
        config.logging.include_location = true;
        config.dispatch.trace_routing = true;
        config
    }

    /// Production preset: JSON info logs, internal errors hidden.
    #[must_use]
    pub fn production() -> Self {
        let mut config = Self::default();
        config.app.environment = "production".to_string();
        config.app.expose_internal_errors = false;
        config.logging.level = "info".to_string();
        config.logging.format = LogFormat::Json;
        config
    }
}

fn is_header_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-' || b == b'_')
}

/// Builder for [`ElectroConfig`].
#[derive(Debug, Default)]
pub struct ElectroConfigBuilder {
    app: Option<AppConfig>,
    logging: Option<LoggingConfig>,
    dispatch: Option<DispatchConfig>,
    session: Option<SessionConfig>,
}

impl ElectroConfigBuilder {
    /// Create a new builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the application section.
    #[must_use]
    pub fn app(mut self, app: AppConfig) -> Self {
        self.app = Some(app);
        self
    }

    /// Set the logging section.
    #[must_use]
    pub fn logging(mut self, logging: LoggingConfig) -> Self {
        self.logging = Some(logging);
        self
    }

    /// Set the dispatch section.
    #[must_use]
    pub fn dispatch(mut self, dispatch: DispatchConfig) -> Self {
        self.dispatch = Some(dispatch);
        self
    }

    /// Set the session section.
    #[must_use]
    pub fn session(mut self, session: SessionConfig) -> Self {
        self.session = Some(session);
        self
    }

    /// Build the configuration. Unset sections use their defaults.
    #[must_use]
    pub fn build(self) -> ElectroConfig {
        ElectroConfig {
            app: self.app.unwrap_or_default(),
            logging: self.logging.unwrap_or_default(),
            dispatch: self.dispatch.unwrap_or_default(),
            session: self.session.unwrap_or_default(),
        }
    }

    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if validation fails.
    pub fn build_validated(self) -> Result<ElectroConfig, ConfigError> {
        let config = self.build();
        config.validate()?;
        Ok(config)
    }
}
