//! # Electro
//!
//! A modular web application framework built around one ordered, keyed
//! dispatch pipeline.
//!
//! Modules register middleware and routes without knowing what else is
//! installed; named anchors (`before("router")`, `after("requestId")`)
//! resolve every registration into a single deterministic order. The pipeline
//! is frozen once every module has booted and then serves any number of
//! concurrent requests.
//!
//! ## Default Pipeline
//!
//! ```text
//! Request → requestId → errorHandling → session → router → notFound
//!              ↑              ↑             ↑         ↑
//!          x-request-id   AppError→JSON  Flash→303  module routes
//! ```
//!
//! The `session` stage is present when `session.enabled` is set (the default).
//!
//! ## Example
//!
//! ```
//! use electro::prelude::*;
//! use http::StatusCode;
//!
//! struct Blog;
//!
//! impl Module for Blog {
//!     fn name(&self) -> &'static str {
//!         "blog"
//!     }
//!
//!     fn boot(&self, boot: &mut Boot) -> Result<(), RegistryError> {
//!         boot.route("/posts/@slug", responder("show_post", |request| {
//!             match request.attribute("slug") {
//!                 Some("hello") => Ok(Response::text(StatusCode::OK, "Hello, world")),
//!                 _ => Err(AppError::not_found("no such post").into()),
//!             }
//!         }))
//!     }
//! }
//!
//! # tokio_test::block_on(async {
//! let app = Application::builder().module(Blog).build()?;
//!
//! let found = app.handle(Request::get("/posts/hello")).await?;
//! assert_eq!(found.status(), StatusCode::OK);
//!
//! let missing = app.handle(Request::get("/posts/other")).await?;
//! assert_eq!(missing.status(), StatusCode::NOT_FOUND);
//! assert_eq!(missing.header("content-type"), Some("application/json"));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! # }).unwrap();
//! ```

#![doc(html_root_url = "https://docs.rs/electro/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod application;
mod error;
mod module;

pub use application::{Application, ApplicationBuilder};
pub use error::BootError;
pub use module::{module_fn, Boot, FnModule, Module};

pub use electro_config as config;
pub use electro_core as core;
pub use electro_pipeline as pipeline;
pub use electro_telemetry as telemetry;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::{module_fn, Application, Boot, BootError, Module};

    pub use electro_config::{ConfigLoader, ElectroConfig};
    pub use electro_core::{
        AppError, DispatchError, DispatchResult, FlashMessage, RegistryError, Request, Response,
    };
    pub use electro_pipeline::{
        handler_fn, responder, DispatchContext, Handler, HandlerRegistry, Next, Placement,
        RouteTable,
    };
}
