//! Typed configuration for Electro applications.
//!
//! [`ElectroConfig`] holds every setting the application builder reads:
//!
//! - [`AppConfig`] - name, environment and error exposure
//! - [`LoggingConfig`] - subscriber level and format
//! - [`DispatchConfig`] - request deadline and dispatch observability
//! - [`SessionConfig`] - the flash message stage
//!
//! Unknown fields are rejected in every section.
//!
//! # Example
//!
//! ```no_run
//! use electro_config::ConfigLoader;
//!
//! # fn main() -> Result<(), electro_config::ConfigError> {
//! let config = ConfigLoader::new()
//!     .with_optional_file("electro.toml")?
//!     .with_env_prefix("ELECTRO")
//!     .load()?;
//!
//! println!("starting {}", config.app.name);
//! # Ok(())
//! # }
//! ```
//!
//! # File Format
//!
//! ```toml
//! [app]
//! name = "billing"
//! environment = "production"
//! expose_internal_errors = false
//! trust_request_id = true
//!
//! [logging]
//! level = "info,electro_pipeline=debug"
//! format = "json"
//!
//! [dispatch]
//! request_timeout_ms = 5000
//! trace_routing = false
//!
//! [session]
//! enabled = true
//! header = "x-session-id"
//! ```
//!
//! # Environment Overrides
//!
//! Variables named `PREFIX__SECTION__KEY` override file values, e.g.
//! `ELECTRO__LOGGING__LEVEL=debug` or `ELECTRO__SESSION__ENABLED=false`.

#![doc(html_root_url = "https://docs.rs/electro-config/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::{ElectroConfig, ElectroConfigBuilder};
pub use error::ConfigError;
pub use loader::{ConfigLoader, DEFAULT_ENV_PREFIX};
pub use schema::{AppConfig, DispatchConfig, LogFormat, LoggingConfig, SessionConfig};
