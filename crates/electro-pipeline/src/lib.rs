//! # Electro Pipeline
//!
//! Ordered, keyed handler registries and the executor that dispatches
//! requests through them.
//!
//! ## Model
//!
//! ```text
//! Request → [requestId] → [errorHandling] → [session] → [router] → [notFound]
//!                                                          │
//!                                           /users/@id ────┤ (route table)
//!                                           /admin/*  ─────┘ (nested table)
//! ```
//!
//! - A [`HandlerRegistry`] holds handlers in order. Each slot has a [`Key`]:
//!   an auto-assigned ordinal or a caller-chosen name.
//! - Slots can be placed before or after an existing key with an
//!   [`Anchor`], or overwrite an existing slot in place.
//! - A slot holds a [`HandlerRef`]: a handler instance, a factory that builds
//!   the handler on first use, or a nested [`RouteTable`].
//! - Registries are frozen before dispatch and immutable afterwards, so one
//!   registry serves any number of concurrent requests.
//!
//! ## Dispatch
//!
//! Every handler receives the request, the response so far, and a [`Next`]
//! continuation. Running `next` resumes at the following slot; returning
//! without running it short-circuits. A [`DispatchContext`] travels with the
//! request and records what the executor is doing, for diagnostics and for
//! [`DispatchObserver`]s.
//!
//! ## Example
//!
//! ```
//! use electro_core::{Request, Response};
//! use electro_pipeline::{handler_fn, responder, DispatchContext, HandlerRegistry, Placement, RouteTable};
//! use http::header::HeaderValue;
//! use http::StatusCode;
//!
//! # tokio_test::block_on(async {
//! let mut routes = RouteTable::new();
//! routes.add("/hello/@name", responder("hello", |request| {
//!     let name = request.attribute("name").unwrap_or("world");
//!     Ok(Response::text(StatusCode::OK, format!("hello {name}")))
//! }))?;
//!
//! let mut pipeline = HandlerRegistry::new();
//! pipeline.add_keyed("router", routes)?;
//! pipeline.insert(
//!     handler_fn("server_header", |ctx, request, response, next| {
//!         Box::pin(async move {
//!             let response = next.run(ctx, request, response).await?;
//!             Ok(Some(response.with_header("server", HeaderValue::from_static("electro"))))
//!         })
//!     }),
//!     Placement::new().before("router"),
//! )?;
//! pipeline.freeze();
//!
//! let mut ctx = DispatchContext::new();
//! let response = pipeline
//!     .run(&mut ctx, Request::get("/hello/ada"), Response::ok(), None)
//!     .await?;
//! assert_eq!(response.body_text(), "hello ada");
//! assert_eq!(response.header("server"), Some("electro"));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! # }).unwrap();
//! ```

#![doc(html_root_url = "https://docs.rs/electro-pipeline/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod context;
mod executor;
pub mod handler;
pub mod handler_ref;
pub mod key;
pub mod observer;
pub mod registry;
pub mod route_table;
pub mod stages;

pub use context::DispatchContext;
pub use executor::PipelineExecutor;
pub use handler::{handler_fn, responder, BoxFuture, FnHandler, Handler, HandlerResult, Next, Responder};
pub use handler_ref::{HandlerRef, LazyHandler};
pub use key::{Anchor, Key, Placement};
pub use observer::{DispatchObserver, NoopObserver, StackKind};
pub use registry::{Entry, HandlerRegistry};
pub use route_table::RouteTable;
