//! The handler trait and its continuation.
//!
//! Every pipeline participant implements [`Handler`]. A handler receives the
//! dispatch context, the current request and response, and a [`Next`]
//! continuation. It may:
//!
//! - delegate by calling `next.run(ctx, request, response)`, possibly with
//!   modified values, and post-process what comes back
//! - short-circuit by returning a response without calling `next`
//! - return `Ok(None)`, meaning "whatever the continuation produced" (or the
//!   response it was given, if it never called `next`)
//! - fail with a [`DispatchError`], which unwinds to the outermost caller
//!
//! # Example
//!
//! ```
//! use electro_core::{Request, Response};
//! use electro_pipeline::{BoxFuture, DispatchContext, Handler, HandlerResult, Next};
//! use http::header::HeaderValue;
//!
//! struct PoweredBy;
//!
//! impl Handler for PoweredBy {
//!     fn name(&self) -> &'static str {
//!         "powered_by"
//!     }
//!
//!     fn handle<'a>(
//!         &'a self,
//!         ctx: &'a mut DispatchContext,
//!         request: Request,
//!         response: Response,
//!         next: &'a Next<'a>,
//!     ) -> BoxFuture<'a, HandlerResult> {
//!         Box::pin(async move {
//!             let response = next.run(ctx, request, response).await?;
//!             Ok(Some(response.with_header("x-powered-by", HeaderValue::from_static("electro"))))
//!         })
//!     }
//! }
//! ```

use crate::context::DispatchContext;
use crate::executor::{finish, Walk};
use crate::handler_ref::HandlerRef;
use electro_core::{DispatchError, DispatchResult, Request, Response};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A boxed, sendable future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// What a handler yields: a replacement response, or `None` to keep the
/// response produced downstream.
pub type HandlerResult = DispatchResult<Option<Response>>;

/// A pipeline participant.
///
/// Handlers are shared between concurrent requests, so they hold no
/// per-request state; anything request-scoped belongs in the
/// [`DispatchContext`].
pub trait Handler: Send + Sync + 'static {
    /// Name used in logs and observer events.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Processes one request.
    ///
    /// `next` may be run at most once; a second call fails with
    /// [`DispatchError::ContinuationAlreadyInvoked`].
    fn handle<'a>(
        &'a self,
        ctx: &'a mut DispatchContext,
        request: Request,
        response: Response,
        next: &'a Next<'a>,
    ) -> BoxFuture<'a, HandlerResult>;

    /// Converts this handler into a registry slot.
    ///
    /// Composite handlers override this to freeze themselves on the way in.
    fn into_handler_ref(self) -> HandlerRef
    where
        Self: Sized,
    {
        HandlerRef::Direct(Arc::new(self))
    }
}

type TerminalFn<'a> = Box<
    dyn for<'b> Fn(&'b mut DispatchContext, Request, Response) -> BoxFuture<'b, DispatchResult<Response>>
        + Send
        + Sync
        + 'a,
>;

/// The continuation handed to a handler.
///
/// Running it resumes dispatch at the next registry slot. When the registry
/// is exhausted it runs the outer continuation (for nested stacks) or
/// returns the response as-is.
pub struct Next<'a> {
    kind: NextKind<'a>,
    stack_id: u64,
    invoked: AtomicBool,
}

enum NextKind<'a> {
    /// Resume a registry walk at `cursor`.
    Chain { walk: &'a Walk<'a>, cursor: usize },
    /// Skip the rest of this stack and continue outward.
    Forward(Option<&'a Next<'a>>),
    /// Caller-supplied final step.
    Terminal(TerminalFn<'a>),
}

impl<'a> Next<'a> {
    pub(crate) fn chain(walk: &'a Walk<'a>, cursor: usize) -> Self {
        Self {
            stack_id: walk.stack_id(),
            kind: NextKind::Chain { walk, cursor },
            invoked: AtomicBool::new(false),
        }
    }

    pub(crate) fn forward(stack_id: u64, outer: Option<&'a Next<'a>>) -> Self {
        Self {
            kind: NextKind::Forward(outer),
            stack_id,
            invoked: AtomicBool::new(false),
        }
    }

    /// Creates a continuation from a function.
    ///
    /// Used as the outer `next` of a top-level run, and in tests.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: for<'b> Fn(&'b mut DispatchContext, Request, Response) -> BoxFuture<'b, DispatchResult<Response>>
            + Send
            + Sync
            + 'a,
    {
        Self {
            kind: NextKind::Terminal(Box::new(f)),
            stack_id: 0,
            invoked: AtomicBool::new(false),
        }
    }

    /// The stack this continuation belongs to (`0` for [`Next::from_fn`]).
    #[must_use]
    pub fn stack_id(&self) -> u64 {
        self.stack_id
    }

    /// Returns true once the continuation has been run.
    #[must_use]
    pub fn was_invoked(&self) -> bool {
        self.invoked.load(Ordering::Acquire)
    }

    /// Runs the rest of the pipeline.
    ///
    /// # Errors
    ///
    /// Fails with [`DispatchError::ContinuationAlreadyInvoked`] on a second
    /// call, and otherwise propagates whatever downstream handlers raise.
    pub fn run<'b>(
        &'b self,
        ctx: &'b mut DispatchContext,
        request: Request,
        response: Response,
    ) -> BoxFuture<'b, DispatchResult<Response>> {
        Box::pin(async move {
            if self.invoked.swap(true, Ordering::AcqRel) {
                return Err(DispatchError::ContinuationAlreadyInvoked {
                    stack_id: self.stack_id,
                });
            }
            match &self.kind {
                NextKind::Chain { walk, cursor } => walk.step(ctx, *cursor, request, response).await,
                NextKind::Forward(outer) => finish(ctx, *outer, request, response).await,
                NextKind::Terminal(f) => {
                    ctx.record(&request, &response);
                    let response = f(ctx, request, response).await?;
                    ctx.record_response(&response);
                    Ok(response)
                }
            }
        })
    }
}

impl fmt::Debug for Next<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.kind {
            NextKind::Chain { cursor, .. } => format!("chain@{cursor}"),
            NextKind::Forward(outer) => format!("forward(outer: {})", outer.is_some()),
            NextKind::Terminal(_) => "terminal".to_string(),
        };
        f.debug_struct("Next")
            .field("kind", &kind)
            .field("stack_id", &self.stack_id)
            .field("invoked", &self.was_invoked())
            .finish()
    }
}

/// A handler built from a closure.
///
/// Create one with [`handler_fn`].
pub struct FnHandler<F> {
    name: &'static str,
    func: F,
}

/// Creates a handler from a closure that returns a boxed future.
///
/// # Example
///
/// ```
/// use electro_pipeline::handler_fn;
///
/// let timing = handler_fn("timing", |ctx, request, response, next| {
///     Box::pin(async move {
///         let response = next.run(ctx, request, response).await?;
///         tracing::debug!(elapsed_ms = ctx.elapsed().as_millis() as u64, "dispatched");
///         Ok(Some(response))
///     })
/// });
/// # let _ = timing;
/// ```
pub fn handler_fn<F>(name: &'static str, func: F) -> FnHandler<F>
where
    F: for<'a> Fn(&'a mut DispatchContext, Request, Response, &'a Next<'a>) -> BoxFuture<'a, HandlerResult>
        + Send
        + Sync
        + 'static,
{
    FnHandler { name, func }
}

impl<F> Handler for FnHandler<F>
where
    F: for<'a> Fn(&'a mut DispatchContext, Request, Response, &'a Next<'a>) -> BoxFuture<'a, HandlerResult>
        + Send
        + Sync
        + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn handle<'a>(
        &'a self,
        ctx: &'a mut DispatchContext,
        request: Request,
        response: Response,
        next: &'a Next<'a>,
    ) -> BoxFuture<'a, HandlerResult> {
        (self.func)(ctx, request, response, next)
    }
}

/// A terminal handler computing a response from the request alone.
///
/// Create one with [`responder`]. It never runs `next`.
pub struct Responder<F> {
    name: &'static str,
    func: F,
}

/// Creates an endpoint handler from a synchronous function.
///
/// # Example
///
/// ```
/// use electro_core::Response;
/// use electro_pipeline::responder;
/// use http::StatusCode;
///
/// let show_user = responder("show_user", |request| {
///     let id = request.attribute("id").unwrap_or_default();
///     Ok(Response::text(StatusCode::OK, format!("user {id}")))
/// });
/// # let _ = show_user;
/// ```
pub fn responder<F>(name: &'static str, func: F) -> Responder<F>
where
    F: Fn(&Request) -> DispatchResult<Response> + Send + Sync + 'static,
{
    Responder { name, func }
}

impl<F> Handler for Responder<F>
where
    F: Fn(&Request) -> DispatchResult<Response> + Send + Sync + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn handle<'a>(
        &'a self,
        _ctx: &'a mut DispatchContext,
        request: Request,
        _response: Response,
        _next: &'a Next<'a>,
    ) -> BoxFuture<'a, HandlerResult> {
        let result = (self.func)(&request).map(Some);
        Box::pin(async move { result })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;

    fn echo_terminal() -> Next<'static> {
        Next::from_fn(|_ctx, request, response| {
            Box::pin(async move {
                Ok(response.with_body(format!("reached {}", request.path())))
            })
        })
    }

    #[tokio::test]
    async fn test_terminal_next_runs_function() {
        let mut ctx = DispatchContext::new();
        let next = echo_terminal();
        assert!(!next.was_invoked());

        let response = next
            .run(&mut ctx, Request::get("/end"), Response::ok())
            .await
            .unwrap();

        assert!(next.was_invoked());
        assert_eq!(response.body_text(), "reached /end");
        assert_eq!(ctx.current_response().unwrap().body_text(), "reached /end");
    }

    #[tokio::test]
    async fn test_next_runs_at_most_once() {
        let mut ctx = DispatchContext::new();
        let next = echo_terminal();

        next.run(&mut ctx, Request::get("/"), Response::ok())
            .await
            .unwrap();
        let err = next
            .run(&mut ctx, Request::get("/"), Response::ok())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DispatchError::ContinuationAlreadyInvoked { stack_id: 0 }
        ));
    }

    #[tokio::test]
    async fn test_forward_without_outer_returns_response() {
        let mut ctx = DispatchContext::new();
        let next = Next::forward(7, None);

        let response = next
            .run(
                &mut ctx,
                Request::get("/"),
                Response::new(StatusCode::CREATED),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(next.stack_id(), 7);
    }

    #[tokio::test]
    async fn test_forward_delegates_to_outer() {
        let mut ctx = DispatchContext::new();
        let outer = echo_terminal();
        let next = Next::forward(1, Some(&outer));

        let response = next
            .run(&mut ctx, Request::get("/out"), Response::ok())
            .await
            .unwrap();

        assert_eq!(response.body_text(), "reached /out");
        assert!(outer.was_invoked());
    }

    #[tokio::test]
    async fn test_handler_fn() {
        let handler = handler_fn("tagging", |ctx, request, response, next| {
            Box::pin(async move {
                let request = request.with_attribute("tagged", "yes");
                let response = next.run(ctx, request, response).await?;
                Ok(Some(response.with_status(StatusCode::ACCEPTED)))
            })
        });
        assert_eq!(handler.name(), "tagging");

        let mut ctx = DispatchContext::new();
        let next = Next::from_fn(|_ctx, request, response| {
            Box::pin(async move {
                let tagged = request.attribute("tagged").unwrap_or("no").to_string();
                Ok(response.with_body(tagged))
            })
        });

        let response = handler
            .handle(&mut ctx, Request::get("/"), Response::ok(), &next)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(response.body_text(), "yes");
    }

    #[tokio::test]
    async fn test_responder_ignores_next() {
        let handler = responder("hello", |request| {
            Ok(Response::text(StatusCode::OK, format!("hello {}", request.path())))
        });

        let mut ctx = DispatchContext::new();
        let next = echo_terminal();
        let response = handler
            .handle(&mut ctx, Request::get("/world"), Response::ok(), &next)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(response.body_text(), "hello /world");
        assert!(!next.was_invoked());
    }

    #[test]
    fn test_default_name_is_type_name() {
        struct Anonymous;
        impl Handler for Anonymous {
            fn handle<'a>(
                &'a self,
                _ctx: &'a mut DispatchContext,
                _request: Request,
                _response: Response,
                _next: &'a Next<'a>,
            ) -> BoxFuture<'a, HandlerResult> {
                Box::pin(async { Ok(None) })
            }
        }

        assert!(Anonymous.name().ends_with("Anonymous"));
    }
}
