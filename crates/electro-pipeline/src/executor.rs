//! Ordered dispatch over a frozen registry.
//!
//! [`PipelineExecutor`] walks a [`HandlerRegistry`] front to back. Each
//! handler receives a continuation positioned at the following slot, so the
//! chain is built lazily as handlers delegate; nothing is allocated for
//! slots that are never reached.

use crate::context::DispatchContext;
use crate::handler::{BoxFuture, Handler, Next};
use crate::key::Key;
use crate::observer::{DispatchObserver, StackKind};
use crate::registry::{Entry, HandlerRegistry};
use electro_core::{DispatchResult, RegistryError, Request, Response};
use std::sync::Arc;

/// Runs the handlers of one registry in order.
///
/// # Example
///
/// ```
/// use electro_core::{Request, Response};
/// use electro_pipeline::{responder, DispatchContext, HandlerRegistry, PipelineExecutor};
/// use http::StatusCode;
///
/// # tokio_test::block_on(async {
/// let mut registry = HandlerRegistry::new();
/// registry.add(responder("hello", |_| Ok(Response::text(StatusCode::OK, "hello"))))?;
/// registry.freeze();
///
/// let mut ctx = DispatchContext::new();
/// let response = PipelineExecutor::new(&registry)?
///     .run(&mut ctx, Request::get("/"), Response::ok(), None)
///     .await?;
/// assert_eq!(response.body_text(), "hello");
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// # }).unwrap();
/// ```
#[derive(Debug, Clone, Copy)]
pub struct PipelineExecutor<'r> {
    registry: &'r HandlerRegistry,
}

impl<'r> PipelineExecutor<'r> {
    /// Creates an executor over a frozen registry.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFrozen`] if the registry can still change.
    pub fn new(registry: &'r HandlerRegistry) -> Result<Self, RegistryError> {
        if !registry.is_frozen() {
            return Err(RegistryError::NotFrozen);
        }
        Ok(Self { registry })
    }

    /// Dispatches `request` and `response` through the registry.
    ///
    /// When every handler delegates, the chain ends by running `next`, or by
    /// returning the response unchanged when there is no `next`.
    ///
    /// # Errors
    ///
    /// Propagates any [`electro_core::DispatchError`] raised by a handler.
    pub async fn run(
        &self,
        ctx: &mut DispatchContext,
        request: Request,
        response: Response,
        next: Option<&Next<'_>>,
    ) -> DispatchResult<Response> {
        let observer = Arc::clone(ctx.observer());
        let stack_id = open_stack(ctx, observer.as_ref(), StackKind::Registry, self.registry.len());

        let walk = Walk {
            entries: self.registry.entries(),
            outer: next,
            stack_id,
        };
        let result = walk.step(ctx, 0, request, response).await;

        close_stack(ctx, observer.as_ref(), stack_id, &result);
        result
    }
}

/// One in-progress traversal of a registry.
pub(crate) struct Walk<'a> {
    entries: &'a [Entry],
    outer: Option<&'a Next<'a>>,
    stack_id: u64,
}

impl<'a> Walk<'a> {
    pub(crate) fn stack_id(&self) -> u64 {
        self.stack_id
    }

    /// Invokes the handler at `cursor`, or finishes the stack.
    pub(crate) fn step<'b>(
        &'b self,
        ctx: &'b mut DispatchContext,
        cursor: usize,
        request: Request,
        response: Response,
    ) -> BoxFuture<'b, DispatchResult<Response>> {
        Box::pin(async move {
            let Some(entry) = self.entries.get(cursor) else {
                let observer = Arc::clone(ctx.observer());
                observer.on_end_of_stack(ctx, self.stack_id);
                return finish(ctx, self.outer, request, response).await;
            };

            let handler = entry.handler().resolve(entry.key())?;
            let next = Next::chain(self, cursor + 1);
            invoke(ctx, self.stack_id, entry.key(), handler, request, response, &next).await
        })
    }
}

/// Calls one handler, keeping the context's current values in step.
pub(crate) async fn invoke(
    ctx: &mut DispatchContext,
    stack_id: u64,
    key: &Key,
    handler: &dyn Handler,
    request: Request,
    response: Response,
    next: &Next<'_>,
) -> DispatchResult<Response> {
    let observer = Arc::clone(ctx.observer());
    ctx.enter_stack(stack_id);
    ctx.record(&request, &response);
    observer.on_call(ctx, stack_id, key, handler.name());

    let outcome = handler.handle(ctx, request, response, next).await?;

    let response = match outcome {
        Some(response) => response,
        None => ctx.settled_response(),
    };
    ctx.enter_stack(stack_id);
    ctx.record_response(&response);
    observer.on_return(ctx, stack_id, key, &response);
    Ok(response)
}

/// Ends a stack: hand over to the outer continuation, or return as-is.
pub(crate) async fn finish(
    ctx: &mut DispatchContext,
    outer: Option<&Next<'_>>,
    request: Request,
    response: Response,
) -> DispatchResult<Response> {
    match outer {
        Some(next) => next.run(ctx, request, response).await,
        None => {
            ctx.record(&request, &response);
            Ok(response)
        }
    }
}

pub(crate) fn open_stack(
    ctx: &mut DispatchContext,
    observer: &dyn DispatchObserver,
    kind: StackKind,
    len: usize,
) -> u64 {
    let stack_id = ctx.open_stack();
    ctx.enter_stack(stack_id);
    observer.on_enter_stack(ctx, stack_id, kind, len);
    stack_id
}

pub(crate) fn close_stack(
    ctx: &mut DispatchContext,
    observer: &dyn DispatchObserver,
    stack_id: u64,
    result: &DispatchResult<Response>,
) {
    if let Err(err) = result {
        observer.on_unwind(ctx, stack_id, err);
    }
    ctx.close_stack();
    observer.on_exit(ctx, stack_id);
}
