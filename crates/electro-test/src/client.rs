//! In-memory client for Electro applications.

use crate::error::TestError;
use crate::request::{TestRequest, TestRequestBuilder};
use crate::response::TestResponse;
use bytes::Bytes;
use electro::Application;
use http::Method;

/// Sends requests through an [`Application`] without a network.
///
/// Requests take the same path a server would give them: they are converted
/// to `http` requests and passed to [`Application::serve_http`], so unhandled
/// errors come back as error envelopes rather than `Err`.
///
/// # Example
///
/// ```
/// use electro::{module_fn, Application};
/// use electro_core::Response;
/// use electro_pipeline::responder;
/// use electro_test::TestClient;
/// use http::StatusCode;
///
/// # tokio_test::block_on(async {
/// let app = Application::builder()
///     .module(module_fn("ping", |boot| {
///         boot.route("/ping", responder("ping", |_| Ok(Response::text(StatusCode::OK, "pong"))))
///     }))
///     .build()
///     .unwrap();
///
/// let client = TestClient::new(app);
/// client.get("/ping").send().await.assert_status(StatusCode::OK).assert_body_eq("pong");
/// # });
/// ```
#[must_use]
#[derive(Debug, Clone)]
pub struct TestClient {
    app: Application,
    default_headers: Vec<(String, String)>,
}

impl TestClient {
    /// Creates a client for `app`.
    pub fn new(app: Application) -> Self {
        Self {
            app,
            default_headers: Vec::new(),
        }
    }

    /// The application under test.
    pub fn app(&self) -> &Application {
        &self.app
    }

    /// Adds a header sent with every request.
    pub fn with_default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.push((name.into(), value.into()));
        self
    }

    /// Sends every request under the session `id`, using the header the
    /// application's session stage reads.
    pub fn with_session(self, id: impl Into<String>) -> Self {
        let header = self.app.config().session.header.clone();
        self.with_default_header(header, id)
    }

    /// Creates a GET request.
    pub fn get(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        TestClientRequest::new(self, TestRequest::get(uri))
    }

    /// Creates a POST request.
    pub fn post(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        TestClientRequest::new(self, TestRequest::post(uri))
    }

    /// Creates a PUT request.
    pub fn put(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        TestClientRequest::new(self, TestRequest::put(uri))
    }

    /// Creates a PATCH request.
    pub fn patch(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        TestClientRequest::new(self, TestRequest::patch(uri))
    }

    /// Creates a DELETE request.
    pub fn delete(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        TestClientRequest::new(self, TestRequest::delete(uri))
    }

    /// Creates a request with any method.
    pub fn request(&self, method: Method, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        TestClientRequest::new(self, TestRequestBuilder::new(method, uri))
    }

    /// Sends a built request.
    pub async fn send(&self, request: TestRequest) -> TestResponse {
        let response = self.app.serve_http(request.into_http_request()).await;
        TestResponse::from_http(response).await
    }
}

/// A request builder bound to a [`TestClient`].
#[must_use]
#[derive(Debug)]
pub struct TestClientRequest<'a> {
    client: &'a TestClient,
    builder: TestRequestBuilder,
}

impl<'a> TestClientRequest<'a> {
    fn new(client: &'a TestClient, builder: TestRequestBuilder) -> Self {
        let builder = client
            .default_headers
            .iter()
            .fold(builder, |builder, (name, value)| builder.header(name, value));
        Self { client, builder }
    }

    /// Sets a header.
    pub fn header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.builder = self.builder.header(name, value);
        self
    }

    /// Sets the Content-Type header.
    pub fn content_type(mut self, content_type: impl AsRef<str>) -> Self {
        self.builder = self.builder.content_type(content_type);
        self
    }

    /// Sets the raw body.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.builder = self.builder.body(body);
        self
    }

    /// Sets a JSON body.
    pub fn json<T: serde::Serialize>(mut self, value: &T) -> Self {
        self.builder = self.builder.json(value);
        self
    }

    /// Sends the request.
    ///
    /// # Panics
    ///
    /// Panics if the request could not be built; use
    /// [`try_send`](Self::try_send) to handle that case.
    pub async fn send(self) -> TestResponse {
        match self.try_send().await {
            Ok(response) => response,
            Err(e) => panic!("failed to build test request: {e}"),
        }
    }

    /// Sends the request, reporting build failures.
    ///
    /// # Errors
    ///
    /// Returns the [`TestError`] raised while building the request.
    pub async fn try_send(self) -> Result<TestResponse, TestError> {
        let request = self.builder.build()?;
        Ok(self.client.send(request).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use electro::module_fn;
    use electro_core::{AppError, Response};
    use electro_pipeline::responder;
    use http::StatusCode;
    use serde_json::json;

    fn app() -> Application {
        Application::builder()
            .module(module_fn("echo", |boot| {
                boot.route(
                    "/echo",
                    responder("echo", |request| {
                        let body = json!({
                            "method": request.method().as_str(),
                            "custom": request.header("x-custom"),
                            "body": String::from_utf8_lossy(request.body()),
                        });
                        Ok(Response::json(StatusCode::OK, &body))
                    }),
                )?;
                boot.route(
                    "/taken",
                    responder("taken", |_| Err(AppError::conflict("name taken").into())),
                )
            }))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_methods_reach_routes() {
        let client = TestClient::new(app());
        for method in [Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE] {
            let response = client.request(method.clone(), "/echo").send().await;
            response
                .assert_success()
                .assert_json_field("method", &json!(method.as_str()));
        }
    }

    #[tokio::test]
    async fn test_default_headers_and_body() {
        let client = TestClient::new(app()).with_default_header("x-custom", "default");
        client
            .post("/echo")
            .json(&json!({"a": 1}))
            .send()
            .await
            .assert_json_field("custom", &json!("default"))
            .assert_json_field("body", &json!("{\"a\":1}"));
    }

    #[tokio::test]
    async fn test_error_envelope() {
        let client = TestClient::new(app());
        let response = client.get("/taken").send().await;
        response
            .assert_status(StatusCode::CONFLICT)
            .assert_error_code("CONFLICT");
        assert_eq!(
            response.json::<serde_json::Value>().unwrap()["request_id"].as_str(),
            response.request_id()
        );
    }

    #[tokio::test]
    async fn test_try_send_reports_build_errors() {
        let client = TestClient::new(app());
        let result = client.get("/echo").header("bad header", "x").try_send().await;
        assert!(matches!(result, Err(TestError::InvalidHeader(_))));
    }

    #[tokio::test]
    async fn test_with_session_uses_configured_header() {
        let client = TestClient::new(app()).with_session("s-1");
        assert_eq!(client.default_headers, [("x-session-id".to_string(), "s-1".to_string())]);
    }
}
