//! # Electro Test
//!
//! In-memory testing for Electro applications. Requests run through the
//! complete pipeline and the HTTP adapter without binding a port.
//!
//! ## Example
//!
//! ```
//! use electro::{module_fn, Application};
//! use electro_core::{FlashMessage, Response};
//! use electro_pipeline::responder;
//! use electro_test::TestClient;
//! use http::StatusCode;
//!
//! # tokio_test::block_on(async {
//! let app = Application::builder()
//!     .module(module_fn("posts", |boot| {
//!         boot.route("/posts", responder("create_post", |request| {
//!             if request.body().is_empty() {
//!                 return Err(FlashMessage::error("Title is required").into());
//!             }
//!             Ok(Response::new(StatusCode::CREATED))
//!         }))
//!     }))
//!     .build()
//!     .unwrap();
//!
//! let client = TestClient::new(app).with_session("reader-1");
//!
//! client.post("/posts").send().await.assert_redirect("/posts");
//! client
//!     .post("/posts")
//!     .body("Hello")
//!     .send()
//!     .await
//!     .assert_status(StatusCode::CREATED);
//! # });
//! ```

#![doc(html_root_url = "https://docs.rs/electro-test/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod client;
mod error;
mod request;
mod response;

pub use client::{TestClient, TestClientRequest};
pub use error::TestError;
pub use request::{TestRequest, TestRequestBuilder};
pub use response::TestResponse;
