//! Application error rendering.
//!
//! Converts [`DispatchError::Application`] raised anywhere downstream into a
//! JSON error envelope with the status of the error's category:
//!
//! ```json
//! {
//!   "error": {
//!     "code": "NOT_FOUND",
//!     "message": "Not found: no such user",
//!     "category": "not_found"
//!   },
//!   "request_id": "0190a4f2-..."
//! }
//! ```
//!
//! Every other error kind keeps unwinding. Flash messages in particular
//! belong to the session stage.

use crate::context::DispatchContext;
use crate::handler::{BoxFuture, Handler, HandlerResult, Next};
use electro_core::{AppError, DispatchError, ErrorCategory, Request, Response};
use http::StatusCode;

/// Message shown in place of internal error details.
pub const DEFAULT_INTERNAL_MESSAGE: &str = "An internal error occurred";

/// Handler that renders application errors as responses.
#[derive(Debug, Clone)]
pub struct ErrorHandler {
    expose_internal_errors: bool,
    internal_error_message: String,
}

/// The error the stage rendered, left in the context for later inspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandledError {
    /// Machine-readable code.
    pub code: &'static str,
    /// Category of the error.
    pub category: ErrorCategory,
    /// Status of the rendered response.
    pub status: StatusCode,
}

impl Default for ErrorHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl ErrorHandler {
    /// Creates the stage with internal details hidden.
    #[must_use]
    pub fn new() -> Self {
        Self {
            expose_internal_errors: false,
            internal_error_message: DEFAULT_INTERNAL_MESSAGE.to_string(),
        }
    }

    /// Sets whether internal error messages reach the client.
    ///
    /// **Warning**: Only enable this in development environments.
    #[must_use]
    pub fn expose_internal_errors(mut self, expose: bool) -> Self {
        self.expose_internal_errors = expose;
        self
    }

    /// Sets the message used for hidden internal errors.
    #[must_use]
    pub fn internal_error_message(mut self, message: impl Into<String>) -> Self {
        self.internal_error_message = message.into();
        self
    }

    fn render(&self, ctx: &mut DispatchContext, error: &AppError) -> Response {
        let request_id = ctx.request_id().to_string();
        let mut envelope = error.to_envelope(Some(&request_id));

        if error.category() == ErrorCategory::Internal {
            tracing::error!(
                request_id = %request_id,
                error = ?error,
                "Unhandled internal error"
            );
            if !self.expose_internal_errors {
                envelope.error.message.clone_from(&self.internal_error_message);
            }
        } else {
            tracing::debug!(
                request_id = %request_id,
                code = error.code(),
                "Rendering application error"
            );
        }

        ctx.set_extension(HandledError {
            code: error.code(),
            category: error.category(),
            status: error.status_code(),
        });

        let body = serde_json::to_value(&envelope).unwrap_or_default();
        Response::json(error.status_code(), &body)
    }
}

impl Handler for ErrorHandler {
    fn name(&self) -> &'static str {
        "error_handling"
    }

    fn handle<'a>(
        &'a self,
        ctx: &'a mut DispatchContext,
        request: Request,
        response: Response,
        next: &'a Next<'a>,
    ) -> BoxFuture<'a, HandlerResult> {
        Box::pin(async move {
            match next.run(ctx, request, response).await {
                Ok(response) => Ok(Some(response)),
                Err(DispatchError::Application(error)) => Ok(Some(self.render(ctx, &error))),
                Err(other) => Err(other),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use electro_core::FlashMessage;

    fn failing(error: fn() -> DispatchError) -> Next<'static> {
        Next::from_fn(move |_ctx, _request, _response| Box::pin(async move { Err(error()) }))
    }

    async fn run_stage(stage: &ErrorHandler, ctx: &mut DispatchContext, next: &Next<'_>) -> HandlerResult {
        stage
            .handle(ctx, Request::get("/test"), Response::ok(), next)
            .await
    }

    #[test]
    fn test_stage_name() {
        assert_eq!(ErrorHandler::new().name(), "error_handling");
    }

    #[tokio::test]
    async fn test_success_passes_through() {
        let stage = ErrorHandler::new();
        let mut ctx = DispatchContext::new();
        let next = Next::from_fn(|_ctx, _request, response| {
            Box::pin(async move { Ok(response.with_status(StatusCode::CREATED)) })
        });

        let response = run_stage(&stage, &mut ctx, &next).await.unwrap().unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert!(ctx.get_extension::<HandledError>().is_none());
    }

    #[tokio::test]
    async fn test_application_error_rendered() {
        let stage = ErrorHandler::new();
        let mut ctx = DispatchContext::new();
        let next = failing(|| AppError::not_found_resource("User", "42").into());

        let response = run_stage(&stage, &mut ctx, &next).await.unwrap().unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.header("content-type"), Some("application/json"));

        let body: serde_json::Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body["error"]["code"], "NOT_FOUND");
        assert_eq!(body["error"]["details"]["resource_id"], "42");
        assert_eq!(body["request_id"], ctx.request_id().to_string());

        let handled = ctx.get_extension::<HandledError>().unwrap();
        assert_eq!(handled.status, StatusCode::NOT_FOUND);
        assert_eq!(handled.category, ErrorCategory::NotFound);
    }

    #[tokio::test]
    async fn test_internal_details_hidden_by_default() {
        let stage = ErrorHandler::new();
        let mut ctx = DispatchContext::new();
        let next = failing(|| AppError::internal("connection pool exhausted").into());

        let response = run_stage(&stage, &mut ctx, &next).await.unwrap().unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!response.body_text().contains("connection pool"));
        assert!(response.body_text().contains(DEFAULT_INTERNAL_MESSAGE));
    }

    #[tokio::test]
    async fn test_internal_details_exposed_when_configured() {
        let stage = ErrorHandler::new().expose_internal_errors(true);
        let mut ctx = DispatchContext::new();
        let next = failing(|| AppError::internal("connection pool exhausted").into());

        let response = run_stage(&stage, &mut ctx, &next).await.unwrap().unwrap();
        assert!(response.body_text().contains("connection pool exhausted"));
    }

    #[tokio::test]
    async fn test_custom_internal_message() {
        let stage = ErrorHandler::new().internal_error_message("Try again later");
        let mut ctx = DispatchContext::new();
        let next = failing(|| AppError::internal("boom").into());

        let response = run_stage(&stage, &mut ctx, &next).await.unwrap().unwrap();
        assert!(response.body_text().contains("Try again later"));
    }

    #[tokio::test]
    async fn test_other_errors_propagate() {
        let stage = ErrorHandler::new();
        let mut ctx = DispatchContext::new();
        let next = failing(|| FlashMessage::error("Name is required").into());

        let err = run_stage(&stage, &mut ctx, &next).await.unwrap_err();
        assert!(err.is_flash());

        let next = failing(|| DispatchError::Timeout { after_ms: 5 });
        let err = run_stage(&stage, &mut ctx, &next).await.unwrap_err();
        assert!(matches!(err, DispatchError::Timeout { after_ms: 5 }));
    }
}
