//! # Electro Core
//!
//! Foundational types shared by every Electro crate:
//!
//! - [`Request`] / [`Response`] - Cloneable request and response value objects
//! - [`RequestId`] - UUID v7 request identifier
//! - [`AppError`] - Application errors with HTTP status mapping
//! - [`RegistryError`] / [`DispatchError`] - Pipeline assembly and dispatch faults
//! - [`FlashMessage`] - User-facing messages raised as a distinct error kind

#![doc(html_root_url = "https://docs.rs/electro-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod message;
mod request_id;

pub use electro_router::Params;
pub use error::{
    AppError, DispatchError, DispatchResult, ErrorCategory, ErrorDetail, ErrorEnvelope,
    FieldErrors, FlashKind, FlashMessage, RegistryError,
};
pub use message::{Request, Response};
pub use request_id::RequestId;
