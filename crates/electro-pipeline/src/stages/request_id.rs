//! Request ID propagation.
//!
//! Every response leaves with an `x-request-id` header carrying the
//! dispatch context's ID, so clients can quote it when reporting problems.
//! When configured to trust upstream proxies, a valid incoming
//! `x-request-id` replaces the generated ID before anything else runs.

use crate::context::DispatchContext;
use crate::handler::{BoxFuture, Handler, HandlerResult, Next};
use electro_core::{Request, RequestId, Response};
use http::header::HeaderValue;

/// The header name for request ID propagation.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Handler that stamps responses with the request ID.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestIdHandler {
    trust_incoming: bool,
}

impl RequestIdHandler {
    /// Creates the stage. Incoming IDs are ignored.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the stage accepting valid incoming `x-request-id` headers.
    ///
    /// Use behind a trusted proxy that assigns IDs.
    #[must_use]
    pub fn trust_incoming() -> Self {
        Self {
            trust_incoming: true,
        }
    }

    /// Builds the stage from a flag.
    #[must_use]
    pub fn with_trust(trust_incoming: bool) -> Self {
        Self { trust_incoming }
    }

    fn incoming_id(&self, request: &Request) -> Option<RequestId> {
        if !self.trust_incoming {
            return None;
        }
        request.header(REQUEST_ID_HEADER)?.parse().ok()
    }
}

impl Handler for RequestIdHandler {
    fn name(&self) -> &'static str {
        "request_id"
    }

    fn handle<'a>(
        &'a self,
        ctx: &'a mut DispatchContext,
        request: Request,
        response: Response,
        next: &'a Next<'a>,
    ) -> BoxFuture<'a, HandlerResult> {
        Box::pin(async move {
            if let Some(id) = self.incoming_id(&request) {
                ctx.set_request_id(id);
            }

            let response = next.run(ctx, request, response).await?;

            let response = match HeaderValue::from_str(&ctx.request_id().to_string()) {
                Ok(value) => response.with_header(REQUEST_ID_HEADER, value),
                Err(_) => response,
            };
            Ok(Some(response))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;

    fn ok_next() -> Next<'static> {
        Next::from_fn(|_ctx, _request, _response| {
            Box::pin(async { Ok(Response::new(StatusCode::OK)) })
        })
    }

    fn request_with_id(id: &str) -> Request {
        Request::get("/test").with_header(REQUEST_ID_HEADER, HeaderValue::from_str(id).unwrap())
    }

    #[tokio::test]
    async fn test_sets_header_from_context() {
        let stage = RequestIdHandler::new();
        let mut ctx = DispatchContext::new();
        let next = ok_next();

        let response = stage
            .handle(&mut ctx, Request::get("/test"), Response::ok(), &next)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(
            response.header(REQUEST_ID_HEADER),
            Some(ctx.request_id().to_string().as_str())
        );
    }

    #[tokio::test]
    async fn test_ignores_incoming_id_when_not_trusted() {
        let stage = RequestIdHandler::new();
        let mut ctx = DispatchContext::new();
        let incoming = "01234567-89ab-7def-8123-456789abcdef";
        let next = ok_next();

        let response = stage
            .handle(&mut ctx, request_with_id(incoming), Response::ok(), &next)
            .await
            .unwrap()
            .unwrap();

        assert_ne!(response.header(REQUEST_ID_HEADER), Some(incoming));
    }

    #[tokio::test]
    async fn test_uses_incoming_id_when_trusted() {
        let stage = RequestIdHandler::trust_incoming();
        let mut ctx = DispatchContext::new();
        let incoming = "01234567-89ab-7def-8123-456789abcdef";
        let next = ok_next();

        let response = stage
            .handle(&mut ctx, request_with_id(incoming), Response::ok(), &next)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(response.header(REQUEST_ID_HEADER), Some(incoming));
        assert_eq!(ctx.request_id().to_string(), incoming);
    }

    #[tokio::test]
    async fn test_ignores_invalid_incoming_id() {
        let stage = RequestIdHandler::with_trust(true);
        let mut ctx = DispatchContext::new();
        let original = ctx.request_id();
        let next = ok_next();

        stage
            .handle(&mut ctx, request_with_id("not-a-uuid"), Response::ok(), &next)
            .await
            .unwrap();

        assert_eq!(ctx.request_id(), original);
    }
}
