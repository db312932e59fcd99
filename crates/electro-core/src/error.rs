//! Error types for Electro.
//!
//! Errors fall into two families:
//!
//! - [`RegistryError`]: configuration faults raised while a pipeline or route
//!   table is being assembled. They are fatal to application boot.
//! - [`DispatchError`]: faults raised while a request travels the pipeline.
//!   The core never swallows them; they unwind through every continuation to
//!   the outermost caller unless a stage (error handling, session) converts
//!   them into a response.
//!
//! Handler code usually raises [`AppError`], which carries an
//! [`ErrorCategory`] that maps onto an HTTP status and a JSON envelope.

use electro_router::PatternError;
use http::StatusCode;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Result type alias for dispatch.
pub type DispatchResult<T> = Result<T, DispatchError>;

/// Categories of application errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Invalid input.
    Validation,
    /// Invalid or missing credentials.
    Authentication,
    /// Permission denied.
    Authorization,
    /// Resource not found.
    NotFound,
    /// Conflicting modification.
    Conflict,
    /// Internal server error.
    Internal,
}

impl ErrorCategory {
    /// Returns the default HTTP status code for this error category.
    #[must_use]
    pub const fn default_status_code(&self) -> StatusCode {
        match self {
            Self::Validation => StatusCode::BAD_REQUEST,
            Self::Authentication => StatusCode::UNAUTHORIZED,
            Self::Authorization => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Conflict => StatusCode::CONFLICT,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// An error raised by application handlers.
///
/// # Example
///
/// ```
/// use electro_core::{AppError, ErrorCategory};
///
/// fn load_user(id: &str) -> Result<(), AppError> {
///     if id.is_empty() {
///         return Err(AppError::validation("user id must not be empty"));
///     }
///     Err(AppError::not_found_resource("User", id))
/// }
///
/// let err = load_user("42").unwrap_err();
/// assert_eq!(err.category(), ErrorCategory::NotFound);
/// ```
#[derive(Error, Debug)]
pub enum AppError {
    /// Request validation failed.
    #[error("Validation error: {message}")]
    Validation {
        /// Human-readable error message.
        message: String,
        /// Field-specific validation errors.
        #[source]
        field_errors: Option<FieldErrors>,
    },

    /// Authentication failed.
    #[error("Authentication error: {message}")]
    Authentication {
        /// Human-readable error message.
        message: String,
    },

    /// Authorization denied.
    #[error("Authorization denied: {message}")]
    Authorization {
        /// Human-readable error message.
        message: String,
    },

    /// Resource not found.
    #[error("Not found: {message}")]
    NotFound {
        /// Human-readable error message.
        message: String,
        /// The type of resource that was not found.
        resource_type: Option<String>,
        /// The identifier of the resource.
        resource_id: Option<String>,
    },

    /// Conflicting modification.
    #[error("Conflict: {message}")]
    Conflict {
        /// Human-readable error message.
        message: String,
    },

    /// Internal server error.
    #[error("Internal error: {message}")]
    Internal {
        /// Human-readable error message.
        message: String,
        /// The underlying error (not exposed to clients).
        #[source]
        source: Option<anyhow::Error>,
    },
}

impl AppError {
    /// Creates a validation error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            field_errors: None,
        }
    }

    /// Creates a validation error with field-specific errors.
    #[must_use]
    pub fn validation_with_fields(message: impl Into<String>, field_errors: FieldErrors) -> Self {
        Self::Validation {
            message: message.into(),
            field_errors: Some(field_errors),
        }
    }

    /// Creates an authentication error.
    #[must_use]
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication {
            message: message.into(),
        }
    }

    /// Creates an authorization error.
    #[must_use]
    pub fn authorization(message: impl Into<String>) -> Self {
        Self::Authorization {
            message: message.into(),
        }
    }

    /// Creates a not found error.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
            resource_type: None,
            resource_id: None,
        }
    }

    /// Creates a not found error naming the missing resource.
    #[must_use]
    pub fn not_found_resource(
        resource_type: impl Into<String>,
        resource_id: impl Into<String>,
    ) -> Self {
        let resource_type = resource_type.into();
        let resource_id = resource_id.into();
        Self::NotFound {
            message: format!("{resource_type} with ID '{resource_id}' not found"),
            resource_type: Some(resource_type),
            resource_id: Some(resource_id),
        }
    }

    /// Creates a conflict error.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// Creates an internal error wrapping a source error.
    pub fn internal_with_source(
        message: impl Into<String>,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        Self::Internal {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Returns the error category.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::Validation { .. } => ErrorCategory::Validation,
            Self::Authentication { .. } => ErrorCategory::Authentication,
            Self::Authorization { .. } => ErrorCategory::Authorization,
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::Conflict { .. } => ErrorCategory::Conflict,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        self.category().default_status_code()
    }

    /// Returns a machine-readable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::Authentication { .. } => "AUTHENTICATION_ERROR",
            Self::Authorization { .. } => "AUTHORIZATION_DENIED",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Conflict { .. } => "CONFLICT",
            Self::Internal { .. } => "INTERNAL_ERROR",
        }
    }

    /// Converts this error to a serializable error envelope.
    ///
    /// Internal errors never leak their source; the envelope only carries the
    /// top-level message.
    #[must_use]
    pub fn to_envelope(&self, request_id: Option<&str>) -> ErrorEnvelope {
        ErrorEnvelope {
            error: ErrorDetail {
                code: self.code().to_string(),
                message: self.to_string(),
                category: self.category(),
                details: self.details(),
            },
            request_id: request_id.map(ToString::to_string),
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            Self::Validation {
                field_errors: Some(errors),
                ..
            } => serde_json::to_value(errors).ok(),
            Self::NotFound {
                resource_type: Some(rt),
                resource_id: Some(rid),
                ..
            } => Some(serde_json::json!({
                "resource_type": rt,
                "resource_id": rid
            })),
            _ => None,
        }
    }
}

/// Field-specific validation errors.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Error)]
#[error("{} field(s) failed validation", .fields.len())]
pub struct FieldErrors {
    /// Map of field path to error messages.
    pub fields: HashMap<String, Vec<String>>,
}

impl FieldErrors {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an error for a field.
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.fields
            .entry(field.into())
            .or_default()
            .push(message.into());
    }

    /// Returns `true` if there are no field errors.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns the number of fields with errors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }
}

/// Serializable error envelope for HTTP responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// The error details.
    pub error: ErrorDetail,
    /// The request ID for correlation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

/// Error detail within an envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Machine-readable error code.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Error category.
    pub category: ErrorCategory,
    /// Additional error details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Severity of a flash message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlashKind {
    /// Informational.
    #[default]
    Info,
    /// Operation succeeded.
    Success,
    /// Something needs attention.
    Warning,
    /// Operation failed.
    Error,
}

/// A one-shot message shown to the user on the next page view.
///
/// Raising one as [`DispatchError::Flash`] makes the session stage store it
/// and redirect back to the current URI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashMessage {
    /// Severity.
    pub kind: FlashKind,
    /// Message body.
    pub message: String,
    /// Optional heading.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl FlashMessage {
    /// Creates a message of the given kind.
    #[must_use]
    pub fn new(kind: FlashKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            title: None,
        }
    }

    /// Creates an informational message.
    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self::new(FlashKind::Info, message)
    }

    /// Creates a success message.
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self::new(FlashKind::Success, message)
    }

    /// Creates a warning message.
    #[must_use]
    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(FlashKind::Warning, message)
    }

    /// Creates an error message.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(FlashKind::Error, message)
    }

    /// Sets the heading.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

impl fmt::Display for FlashMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.title {
            Some(title) => write!(f, "{title}: {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Configuration faults raised while assembling a registry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// A name key is already present.
    #[error("duplicate handler key '{key}'")]
    DuplicateKey {
        /// The repeated key.
        key: String,
    },

    /// A `before`/`after` anchor names a key that is not registered.
    #[error("anchor key '{anchor}' is not registered")]
    AnchorNotFound {
        /// The missing anchor.
        anchor: String,
    },

    /// The registry was frozen and can no longer change.
    #[error("registry is frozen")]
    RegistryFrozen,

    /// An ordinal overwrite was combined with an anchor.
    #[error("cannot overwrite slot '{key}' and reposition it in one call")]
    AnchoredOverwrite {
        /// The overwritten ordinal.
        key: String,
    },

    /// A route pattern failed to parse.
    #[error(transparent)]
    InvalidPattern(#[from] PatternError),

    /// A registry was run before being frozen.
    #[error("registry must be frozen before it is run")]
    NotFrozen,

    /// Every ordinal key is taken; auto-keyed handlers cannot be added.
    #[error("no free ordinal key left")]
    OrdinalsExhausted,
}

impl RegistryError {
    /// Creates a duplicate key error.
    #[must_use]
    pub fn duplicate_key(key: impl fmt::Display) -> Self {
        Self::DuplicateKey {
            key: key.to_string(),
        }
    }

    /// Creates an anchor not found error.
    #[must_use]
    pub fn anchor_not_found(anchor: impl fmt::Display) -> Self {
        Self::AnchorNotFound {
            anchor: anchor.to_string(),
        }
    }

    /// Creates an anchored overwrite error.
    #[must_use]
    pub fn anchored_overwrite(key: impl fmt::Display) -> Self {
        Self::AnchoredOverwrite {
            key: key.to_string(),
        }
    }
}

/// Faults raised while a request is dispatched.
#[derive(Error, Debug)]
pub enum DispatchError {
    /// A handler called its continuation twice.
    #[error("continuation of stack {stack_id} invoked more than once")]
    ContinuationAlreadyInvoked {
        /// Stack whose continuation was reused.
        stack_id: u64,
    },

    /// A lazily constructed handler failed to instantiate.
    #[error("failed to instantiate handler '{key}': {reason}")]
    Instantiation {
        /// Registry key of the entry.
        key: String,
        /// Why construction failed.
        reason: String,
    },

    /// A registry fault surfaced during dispatch.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// The request ran past its deadline.
    #[error("request timed out after {after_ms}ms")]
    Timeout {
        /// Deadline in milliseconds.
        after_ms: u64,
    },

    /// A user-facing message to flash and redirect on.
    #[error("flash: {0}")]
    Flash(FlashMessage),

    /// An application handler fault.
    #[error(transparent)]
    Application(#[from] AppError),
}

impl DispatchError {
    /// Creates an instantiation error.
    #[must_use]
    pub fn instantiation(key: impl fmt::Display, reason: impl fmt::Display) -> Self {
        Self::Instantiation {
            key: key.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Returns true for the flashable kind.
    #[must_use]
    pub const fn is_flash(&self) -> bool {
        matches!(self, Self::Flash(_))
    }

    /// Returns the HTTP status this error maps to when unhandled.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Application(err) => err.status_code(),
            Self::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns a short label used in logs and metrics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::ContinuationAlreadyInvoked { .. } => "continuation_reused",
            Self::Instantiation { .. } => "instantiation",
            Self::Registry(_) => "registry",
            Self::Timeout { .. } => "timeout",
            Self::Flash(_) => "flash",
            Self::Application(_) => "application",
        }
    }
}

impl From<FlashMessage> for DispatchError {
    fn from(message: FlashMessage) -> Self {
        Self::Flash(message)
    }
}
