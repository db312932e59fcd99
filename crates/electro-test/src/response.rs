//! Test response wrapper.

use crate::error::TestError;
use bytes::Bytes;
use http::{header, HeaderMap, HeaderValue, StatusCode};
use http_body_util::{BodyExt, Full};
use serde::de::DeserializeOwned;
use std::fmt;

/// A fully read response with assertion helpers.
///
/// Assertion methods panic with a descriptive message and return `&Self`, so
/// they chain.
pub struct TestResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl TestResponse {
    /// Reads an `http` response produced by the application.
    pub async fn from_http(response: http::Response<Full<Bytes>>) -> Self {
        let (parts, body) = response.into_parts();
        let body = match body.collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(never) => match never {},
        };

        Self::new(parts.status, parts.headers, body)
    }

    /// Creates a response from its parts.
    #[must_use]
    pub fn new(status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Returns the status.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the status as a number.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        self.status.as_u16()
    }

    /// Returns true for a 2xx status.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Returns true for a 3xx status.
    #[must_use]
    pub fn is_redirect(&self) -> bool {
        self.status.is_redirection()
    }

    /// Returns the headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns a header value.
    #[must_use]
    pub fn header(&self, name: impl AsRef<str>) -> Option<&HeaderValue> {
        self.headers.get(name.as_ref())
    }

    /// Returns a header value as a string, if it is visible ASCII.
    #[must_use]
    pub fn header_str(&self, name: impl AsRef<str>) -> Option<&str> {
        self.header(name).and_then(|v| v.to_str().ok())
    }

    /// Returns the Content-Type header.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.header_str(header::CONTENT_TYPE.as_str())
    }

    /// Returns the `x-request-id` header.
    #[must_use]
    pub fn request_id(&self) -> Option<&str> {
        self.header_str("x-request-id")
    }

    /// Returns the raw body.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Returns the body as UTF-8 text.
    ///
    /// # Errors
    ///
    /// Returns [`TestError::BodyRead`] if the body is not UTF-8.
    pub fn text(&self) -> Result<String, TestError> {
        String::from_utf8(self.body.to_vec())
            .map_err(|e| TestError::BodyRead(format!("invalid UTF-8: {e}")))
    }

    /// Deserializes a JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`TestError::Json`] if the body does not deserialize into `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, TestError> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Returns the `error.code` of an error envelope body.
    #[must_use]
    pub fn error_code(&self) -> Option<String> {
        let value: serde_json::Value = self.json().ok()?;
        value["error"]["code"].as_str().map(str::to_string)
    }

    /// Asserts the status.
    pub fn assert_status(&self, expected: StatusCode) -> &Self {
        assert_eq!(
            self.status, expected,
            "Expected status {}, got {} with body: {}",
            expected,
            self.status,
            String::from_utf8_lossy(&self.body)
        );
        self
    }

    /// Asserts a 2xx status.
    pub fn assert_success(&self) -> &Self {
        assert!(
            self.is_success(),
            "Expected success status, got {}",
            self.status
        );
        self
    }

    /// Asserts a header value.
    pub fn assert_header(&self, name: impl AsRef<str>, expected: impl AsRef<str>) -> &Self {
        let name = name.as_ref();
        let expected = expected.as_ref();
        let actual = self
            .header_str(name)
            .unwrap_or_else(|| panic!("Header '{name}' not found"));
        assert_eq!(
            actual, expected,
            "Header '{name}': expected '{expected}', got '{actual}'"
        );
        self
    }

    /// Asserts a redirect to `location`.
    pub fn assert_redirect(&self, location: impl AsRef<str>) -> &Self {
        assert!(
            self.is_redirect(),
            "Expected a redirect, got {}",
            self.status
        );
        self.assert_header(header::LOCATION.as_str(), location)
    }

    /// Asserts the body contains `expected`.
    pub fn assert_body_contains(&self, expected: impl AsRef<str>) -> &Self {
        let expected = expected.as_ref();
        let body = String::from_utf8_lossy(&self.body);
        assert!(
            body.contains(expected),
            "Body should contain '{expected}', got: {body}"
        );
        self
    }

    /// Asserts the body equals `expected`.
    pub fn assert_body_eq(&self, expected: impl AsRef<str>) -> &Self {
        let body = String::from_utf8_lossy(&self.body);
        assert_eq!(body, expected.as_ref(), "Body mismatch");
        self
    }

    /// Asserts the body is an error envelope with `code`.
    pub fn assert_error_code(&self, code: &str) -> &Self {
        assert_eq!(
            self.error_code().as_deref(),
            Some(code),
            "Expected error envelope with code {code}, got: {}",
            String::from_utf8_lossy(&self.body)
        );
        self
    }

    /// Asserts the value at a dotted JSON path, e.g. `"error.category"` or
    /// `"items.0.name"`.
    pub fn assert_json_field(&self, path: &str, expected: &serde_json::Value) -> &Self {
        let json: serde_json::Value = self
            .json()
            .unwrap_or_else(|e| panic!("Body should be valid JSON: {e}"));
        let actual = json_path(&json, path)
            .unwrap_or_else(|| panic!("JSON path '{path}' not found in: {json}"));
        assert_eq!(
            actual, expected,
            "JSON field '{path}': expected {expected}, got {actual}"
        );
        self
    }
}

impl fmt::Debug for TestResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("body_len", &self.body.len())
            .finish()
    }
}

fn json_path<'a>(value: &'a serde_json::Value, path: &str) -> Option<&'a serde_json::Value> {
    path.split('.')
        .filter(|segment| !segment.is_empty())
        .try_fold(value, |current, segment| match segment.parse::<usize>() {
            Ok(index) => current.get(index),
            Err(_) => current.get(segment),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn json_response(status: StatusCode, body: &str) -> TestResponse {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        TestResponse::new(status, headers, Bytes::from(body.to_string()))
    }

    #[test]
    fn test_error_code() {
        let response = json_response(
            StatusCode::CONFLICT,
            r#"{"error":{"code":"CONFLICT","message":"Conflict: taken","category":"conflict"}}"#,
        );
        assert_eq!(response.error_code().as_deref(), Some("CONFLICT"));
        response
            .assert_status(StatusCode::CONFLICT)
            .assert_error_code("CONFLICT")
            .assert_json_field("error.category", &json!("conflict"));
    }

    #[test]
    fn test_error_code_absent() {
        let response = json_response(StatusCode::OK, "[1, 2]");
        assert_eq!(response.error_code(), None);
    }

    #[test]
    fn test_json_path() {
        let value = json!({"items": [{"name": "first"}]});
        assert_eq!(json_path(&value, "items.0.name"), Some(&json!("first")));
        assert_eq!(json_path(&value, "items.1"), None);
    }

    #[test]
    fn test_redirect() {
        let mut headers = HeaderMap::new();
        headers.insert(header::LOCATION, HeaderValue::from_static("/posts"));
        let response = TestResponse::new(StatusCode::SEE_OTHER, headers, Bytes::new());
        response.assert_redirect("/posts");
    }

    #[test]
    #[should_panic(expected = "Expected status 200 OK")]
    fn test_assert_status_failure_message() {
        json_response(StatusCode::NOT_FOUND, "{}").assert_status(StatusCode::OK);
    }

    #[tokio::test]
    async fn test_from_http() {
        let http = http::Response::builder()
            .status(StatusCode::ACCEPTED)
            .body(Full::new(Bytes::from_static(b"queued")))
            .unwrap();
        let response = TestResponse::from_http(http).await;
        assert_eq!(response.status_code(), 202);
        assert_eq!(response.text().unwrap(), "queued");
    }
}
