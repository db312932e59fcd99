//! Application assembly errors.

use electro_config::ConfigError;
use electro_core::RegistryError;
use thiserror::Error;

/// Errors raised while building an [`Application`](crate::Application).
///
/// All of them are fatal: an application that failed to boot never serves.
#[derive(Error, Debug)]
pub enum BootError {
    /// The configuration failed validation.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// The default pipeline could not be assembled.
    #[error("failed to assemble the default pipeline: {0}")]
    Pipeline(#[source] RegistryError),

    /// A module's registrations were rejected.
    #[error("module '{module}' failed to boot: {source}")]
    Module {
        /// Name of the failing module.
        module: &'static str,
        /// The rejected registration.
        #[source]
        source: RegistryError,
    },

    /// Two modules share a name.
    #[error("module '{0}' is registered more than once")]
    DuplicateModule(&'static str),
}

impl BootError {
    /// Creates a module boot error.
    #[must_use]
    pub fn module(module: &'static str, source: RegistryError) -> Self {
        Self::Module { module, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_error_display() {
        let err = BootError::module("blog", RegistryError::anchor_not_found("auth"));
        assert_eq!(
            err.to_string(),
            "module 'blog' failed to boot: anchor key 'auth' is not registered"
        );
    }

    #[test]
    fn test_config_error_converts() {
        let err: BootError = ConfigError::invalid_value("app.name", "must not be empty").into();
        assert!(matches!(err, BootError::Config(_)));
    }
}
