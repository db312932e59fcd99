//! Fallback for requests no route answered.

use crate::context::DispatchContext;
use crate::handler::{BoxFuture, Handler, HandlerResult, Next};
use electro_core::{Request, Response};
use http::StatusCode;

/// Terminal handler answering `404 Not Found`. Never runs `next`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotFoundHandler;

impl Handler for NotFoundHandler {
    fn name(&self) -> &'static str {
        "not_found"
    }

    fn handle<'a>(
        &'a self,
        ctx: &'a mut DispatchContext,
        request: Request,
        _response: Response,
        _next: &'a Next<'a>,
    ) -> BoxFuture<'a, HandlerResult> {
        Box::pin(async move {
            tracing::debug!(
                request_id = %ctx.request_id(),
                method = %request.method(),
                path = request.path(),
                "No route matched"
            );
            Ok(Some(Response::text(
                StatusCode::NOT_FOUND,
                format!("No route for {} {}", request.method(), request.path()),
            )))
        })
    }
}
