//! A dispatch observer that logs and counts.

use crate::metrics::{record_handler_call, record_route_match, record_unwind};
use electro_core::{DispatchError, Params, Response};
use electro_pipeline::{DispatchContext, DispatchObserver, Key, StackKind};
use electro_router::RoutePattern;

/// Reports dispatch events through `tracing` and `metrics`.
///
/// Handler calls are logged at `debug`. Unwinds are logged at `warn` for
/// server-side failures and at `debug` for flashes and client errors. Route
/// matching is only logged with [`TracingObserver::trace_routing`], as it
/// fires once per pattern tried.
#[derive(Debug, Clone, Copy)]
pub struct TracingObserver {
    trace_routing: bool,
    record_metrics: bool,
}

impl Default for TracingObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl TracingObserver {
    /// Creates an observer that records metrics and skips routing logs.
    #[must_use]
    pub fn new() -> Self {
        Self {
            trace_routing: false,
            record_metrics: true,
        }
    }

    /// Logs every pattern matched or skipped.
    #[must_use]
    pub fn trace_routing(mut self, enabled: bool) -> Self {
        self.trace_routing = enabled;
        self
    }

    /// Enables or disables metric recording.
    #[must_use]
    pub fn record_metrics(mut self, enabled: bool) -> Self {
        self.record_metrics = enabled;
        self
    }
}

impl DispatchObserver for TracingObserver {
    fn on_enter_stack(&self, ctx: &DispatchContext, stack_id: u64, kind: StackKind, len: usize) {
        tracing::trace!(
            request_id = %ctx.request_id(),
            stack_id,
            kind = kind.as_str(),
            len,
            depth = ctx.stack_depth(),
            "Entering stack"
        );
    }

    fn on_call(&self, ctx: &DispatchContext, stack_id: u64, key: &Key, handler: &'static str) {
        tracing::debug!(
            request_id = %ctx.request_id(),
            stack_id,
            key = %key,
            handler,
            "Calling handler"
        );
        if self.record_metrics {
            record_handler_call(handler);
        }
    }

    fn on_return(&self, ctx: &DispatchContext, stack_id: u64, key: &Key, response: &Response) {
        tracing::trace!(
            request_id = %ctx.request_id(),
            stack_id,
            key = %key,
            status = response.status().as_u16(),
            "Handler returned"
        );
    }

    fn on_match(&self, ctx: &DispatchContext, stack_id: u64, pattern: &RoutePattern, params: &Params) {
        if self.trace_routing {
            tracing::debug!(
                request_id = %ctx.request_id(),
                stack_id,
                pattern = pattern.as_str(),
                params = ?params,
                "Route matched"
            );
        }
        if self.record_metrics {
            record_route_match(pattern.as_str());
        }
    }

    fn on_no_match(&self, ctx: &DispatchContext, stack_id: u64, pattern: &RoutePattern) {
        if self.trace_routing {
            tracing::trace!(
                request_id = %ctx.request_id(),
                stack_id,
                pattern = pattern.as_str(),
                "Route skipped"
            );
        }
    }

    fn on_end_of_stack(&self, ctx: &DispatchContext, stack_id: u64) {
        tracing::trace!(request_id = %ctx.request_id(), stack_id, "End of stack");
    }

    fn on_unwind(&self, ctx: &DispatchContext, stack_id: u64, error: &DispatchError) {
        if error.is_flash() || error.status_code().is_client_error() {
            tracing::debug!(
                request_id = %ctx.request_id(),
                stack_id,
                kind = error.kind(),
                error = %error,
                "Unwinding stack"
            );
        } else {
            tracing::warn!(
                request_id = %ctx.request_id(),
                stack_id,
                kind = error.kind(),
                error = %error,
                "Unwinding stack"
            );
        }
        if self.record_metrics {
            record_unwind(error.kind());
        }
    }

    fn on_exit(&self, ctx: &DispatchContext, stack_id: u64) {
        tracing::trace!(
            request_id = %ctx.request_id(),
            stack_id,
            elapsed_ms = ctx.elapsed().as_millis() as u64,
            "Leaving stack"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use electro_core::{AppError, Request};
    use electro_pipeline::{responder, HandlerRegistry, RouteTable};
    use http::StatusCode;
    use std::sync::Arc;

    #[test]
    fn test_builder_flags() {
        let observer = TracingObserver::new().trace_routing(true).record_metrics(false);
        assert!(observer.trace_routing);
        assert!(!observer.record_metrics);
    }

    #[test]
    fn test_hooks_accept_every_event() {
        let observer = TracingObserver::new().trace_routing(true);
        let ctx = DispatchContext::new();
        let pattern = RoutePattern::parse("/users/@id").unwrap();
        let params = pattern.match_path("/users/1").unwrap();
        let key = Key::name("router");

        observer.on_enter_stack(&ctx, 1, StackKind::Routes, 2);
        observer.on_call(&ctx, 1, &key, "routes");
        observer.on_match(&ctx, 1, &pattern, &params);
        observer.on_no_match(&ctx, 1, &pattern);
        observer.on_return(&ctx, 1, &key, &Response::ok());
        observer.on_end_of_stack(&ctx, 1);
        observer.on_unwind(&ctx, 1, &AppError::internal("boom").into());
        observer.on_unwind(&ctx, 1, &AppError::not_found("gone").into());
        observer.on_exit(&ctx, 1);
    }

    #[test]
    fn test_observer_drives_real_dispatch() {
        let mut routes = RouteTable::new();
        routes
            .add("/ping", responder("ping", |_| Ok(Response::text(StatusCode::OK, "pong"))))
            .unwrap();
        let mut registry = HandlerRegistry::new();
        registry.add(routes).unwrap();
        registry.freeze();

        let mut ctx = DispatchContext::new().with_observer(Arc::new(TracingObserver::new()));
        let response = tokio_test::block_on(registry.run(
            &mut ctx,
            Request::get("/ping"),
            Response::ok(),
            None,
        ))
        .unwrap();
        assert_eq!(response.body_text(), "pong");
    }
}
