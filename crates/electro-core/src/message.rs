//! Request and response value objects.
//!
//! Both types are cheap to clone (bodies are [`Bytes`]) and are treated as
//! immutable by convention: a handler that wants a different request or
//! response builds a new value with the `with_*` methods and hands it on.

use bytes::Bytes;
use electro_router::Params;
use http::header::{HeaderValue, IntoHeaderName, CONTENT_TYPE, LOCATION};
use http::{HeaderMap, Method, StatusCode, Uri};
use http_body_util::Full;
use std::borrow::Cow;

/// An inbound request as seen by handlers.
///
/// # Example
///
/// ```
/// use electro_core::Request;
///
/// let request = Request::get("/users/42").with_attribute("id", "42");
/// assert_eq!(request.path(), "/users/42");
/// assert_eq!(request.attribute("id"), Some("42"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Request {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
    attributes: Params,
}

impl Request {
    /// Creates an empty request.
    #[must_use]
    pub fn new(method: Method, uri: Uri) -> Self {
        Self {
            method,
            uri,
            ..Self::default()
        }
    }

    /// Creates a request from a URI string.
    ///
    /// # Errors
    ///
    /// Returns the parse error if `uri` is not a valid URI.
    pub fn try_new(method: Method, uri: &str) -> Result<Self, http::uri::InvalidUri> {
        Ok(Self::new(method, uri.parse()?))
    }

    /// Creates a `GET` request for a static URI.
    ///
    /// # Panics
    ///
    /// Panics if `uri` is not a valid URI, like [`Uri::from_static`].
    #[must_use]
    pub fn get(uri: &'static str) -> Self {
        Self::new(Method::GET, Uri::from_static(uri))
    }

    /// Creates a `POST` request for a static URI.
    ///
    /// # Panics
    ///
    /// Panics if `uri` is not a valid URI, like [`Uri::from_static`].
    #[must_use]
    pub fn post(uri: &'static str) -> Self {
        Self::new(Method::POST, Uri::from_static(uri))
    }

    /// Builds a request from `http` request parts and a collected body.
    #[must_use]
    pub fn from_parts(parts: http::request::Parts, body: Bytes) -> Self {
        Self {
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
            body,
            attributes: Params::new(),
        }
    }

    /// Returns the request method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the request URI.
    #[must_use]
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Returns the URI path (what route patterns are matched against).
    #[must_use]
    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// Returns the query string, if any.
    #[must_use]
    pub fn query(&self) -> Option<&str> {
        self.uri.query()
    }

    /// Returns the request headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns a header value as a string, if present and valid UTF-8.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns the request body.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Returns all attributes (route bindings and handler-provided values).
    #[must_use]
    pub fn attributes(&self) -> &Params {
        &self.attributes
    }

    /// Returns one attribute by name.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name)
    }

    /// Returns a copy with a different method.
    #[must_use]
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Returns a copy with a different URI.
    #[must_use]
    pub fn with_uri(mut self, uri: Uri) -> Self {
        self.uri = uri;
        self
    }

    /// Returns a copy with a header set (replacing existing values).
    #[must_use]
    pub fn with_header<K: IntoHeaderName>(mut self, name: K, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Returns a copy with a different body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Returns a copy with one attribute set.
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name, value);
        self
    }

    /// Returns a copy with `attributes` merged in; incoming values win.
    #[must_use]
    pub fn with_attributes(mut self, attributes: Params) -> Self {
        self.attributes.merge(attributes);
        self
    }
}

/// An outbound response as produced by handlers.
///
/// # Example
///
/// ```
/// use electro_core::Response;
/// use http::StatusCode;
///
/// let response = Response::text(StatusCode::NOT_FOUND, "no such page");
/// assert_eq!(response.status(), StatusCode::NOT_FOUND);
/// assert_eq!(response.body_text(), "no such page");
/// ```
#[derive(Debug, Clone, Default)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl Response {
    /// Creates an empty response with the given status.
    #[must_use]
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            ..Self::default()
        }
    }

    /// Creates an empty `200 OK` response.
    #[must_use]
    pub fn ok() -> Self {
        Self::new(StatusCode::OK)
    }

    /// Creates a `text/plain` response.
    #[must_use]
    pub fn text(status: StatusCode, body: impl Into<String>) -> Self {
        Self::new(status)
            .with_header(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"))
            .with_body(body.into())
    }

    /// Creates a `text/html` response.
    #[must_use]
    pub fn html(status: StatusCode, body: impl Into<String>) -> Self {
        Self::new(status)
            .with_header(CONTENT_TYPE, HeaderValue::from_static("text/html; charset=utf-8"))
            .with_body(body.into())
    }

    /// Creates an `application/json` response.
    #[must_use]
    pub fn json(status: StatusCode, body: &serde_json::Value) -> Self {
        Self::new(status)
            .with_header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .with_body(body.to_string())
    }

    /// Creates a redirect response pointing at `location`.
    #[must_use]
    pub fn redirect(status: StatusCode, location: HeaderValue) -> Self {
        Self::new(status).with_header(LOCATION, location)
    }

    /// Builds a response from `http` response parts and a collected body.
    #[must_use]
    pub fn from_parts(parts: http::response::Parts, body: Bytes) -> Self {
        Self {
            status: parts.status,
            headers: parts.headers,
            body,
        }
    }

    /// Converts into an `http` response for the transport layer.
    #[must_use]
    pub fn into_http(self) -> http::Response<Full<Bytes>> {
        let mut response = http::Response::new(Full::new(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }

    /// Returns the status code.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the response headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns a header value as a string, if present and valid UTF-8.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns the response body.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Returns the body as text, replacing invalid UTF-8.
    #[must_use]
    pub fn body_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Returns a copy with a different status.
    #[must_use]
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Returns a copy with a header set (replacing existing values).
    #[must_use]
    pub fn with_header<K: IntoHeaderName>(mut self, name: K, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Returns a copy with a different body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }
}
