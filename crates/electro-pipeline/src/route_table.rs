//! Pattern-keyed handler registries.
//!
//! A [`RouteTable`] is a registry whose keys are route patterns. Running it
//! scans the entries in order and dispatches to the first whose pattern
//! matches the request path:
//!
//! - bindings from the pattern are merged into the request attributes
//! - the matched handler's continuation is the table's *outer* `next`, so a
//!   route that delegates skips the remaining routes
//! - with no match, the table behaves as if it were empty
//!
//! Tables nest: a table registered inside another registry opens its own
//! stack, and falling off its end resumes the parent chain.

use crate::context::DispatchContext;
use crate::executor::{close_stack, finish, invoke, open_stack};
use crate::handler::{BoxFuture, Handler, HandlerResult, Next};
use crate::handler_ref::HandlerRef;
use crate::key::{Anchor, Key, Placement};
use crate::observer::{DispatchObserver, StackKind};
use crate::registry::HandlerRegistry;
use electro_core::{DispatchResult, Params, RegistryError, Request, Response};
use electro_router::RoutePattern;
use std::sync::Arc;

/// An ordered table of route patterns.
///
/// Patterns may repeat; the first registered wins, and later ones can be
/// positioned with anchors.
///
/// # Example
///
/// ```
/// use electro_core::{Request, Response};
/// use electro_pipeline::{responder, DispatchContext, RouteTable};
/// use http::StatusCode;
///
/// # tokio_test::block_on(async {
/// let mut routes = RouteTable::new();
/// routes.add("/users/@id", responder("show_user", |request| {
///     let id = request.attribute("id").unwrap_or_default();
///     Ok(Response::text(StatusCode::OK, format!("user {id}")))
/// }))?;
/// routes.freeze();
///
/// let mut ctx = DispatchContext::new();
/// let response = routes
///     .run(&mut ctx, Request::get("/users/42"), Response::ok(), None)
///     .await?;
/// assert_eq!(response.body_text(), "user 42");
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// # }).unwrap();
/// ```
#[derive(Debug)]
pub struct RouteTable {
    registry: HandlerRegistry,
}

impl RouteTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            registry: HandlerRegistry::allowing_duplicate_names(),
        }
    }

    /// Appends a route.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::InvalidPattern`] for a malformed pattern and
    /// [`RegistryError::RegistryFrozen`] after [`Self::freeze`].
    pub fn add(
        &mut self,
        pattern: &str,
        handler: impl Into<HandlerRef>,
    ) -> Result<(), RegistryError> {
        self.insert(pattern, handler, None)
    }

    /// Registers a route, optionally next to an existing pattern.
    ///
    /// # Errors
    ///
    /// As [`Self::add`], plus [`RegistryError::AnchorNotFound`] when the
    /// anchor pattern is not registered.
    pub fn insert(
        &mut self,
        pattern: &str,
        handler: impl Into<HandlerRef>,
        anchor: Option<Anchor>,
    ) -> Result<(), RegistryError> {
        let route = RoutePattern::parse(pattern)?;
        let mut placement = Placement::keyed(pattern);
        if let Some(anchor) = anchor {
            placement = placement.anchored(anchor);
        }
        self.registry
            .insert_entry(handler.into(), Some(route), placement)
            .map(drop)
    }

    /// Makes the table read-only. Idempotent.
    pub fn freeze(&mut self) {
        self.registry.freeze();
    }

    /// Freezes and returns the table.
    #[must_use]
    pub fn frozen(mut self) -> Self {
        self.freeze();
        self
    }

    /// Returns true once frozen.
    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.registry.is_frozen()
    }

    /// Patterns in scan order.
    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.registry.keys().filter_map(Key::as_name)
    }

    /// Number of routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    /// Returns true if there are no routes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    /// Returns the first pattern matching `path`, with its bindings.
    ///
    /// Diagnostic only; dispatch goes through [`Self::run`].
    #[must_use]
    pub fn match_path(&self, path: &str) -> Option<(&RoutePattern, Params)> {
        self.registry.entries().iter().find_map(|entry| {
            let route = entry.route()?;
            route.match_path(path).map(|params| (route, params))
        })
    }

    /// Dispatches to the first route matching the request path.
    ///
    /// # Errors
    ///
    /// Fails with [`RegistryError::NotFrozen`] if the table is not frozen,
    /// and otherwise propagates handler errors.
    pub async fn run(
        &self,
        ctx: &mut DispatchContext,
        request: Request,
        response: Response,
        next: Option<&Next<'_>>,
    ) -> DispatchResult<Response> {
        if !self.is_frozen() {
            return Err(RegistryError::NotFrozen.into());
        }

        let observer = Arc::clone(ctx.observer());
        let stack_id = open_stack(ctx, observer.as_ref(), StackKind::Routes, self.len());
        let result = self
            .dispatch(ctx, observer.as_ref(), stack_id, request, response, next)
            .await;
        close_stack(ctx, observer.as_ref(), stack_id, &result);
        result
    }

    async fn dispatch(
        &self,
        ctx: &mut DispatchContext,
        observer: &dyn DispatchObserver,
        stack_id: u64,
        request: Request,
        response: Response,
        next: Option<&Next<'_>>,
    ) -> DispatchResult<Response> {
        for entry in self.registry.entries() {
            let Some(route) = entry.route() else {
                continue;
            };
            let Some(params) = route.match_path(request.path()) else {
                observer.on_no_match(ctx, stack_id, route);
                continue;
            };

            observer.on_match(ctx, stack_id, route, &params);
            let handler = entry.handler().resolve(entry.key())?;
            let request = request.with_attributes(params);
            let forward = Next::forward(stack_id, next);
            return invoke(ctx, stack_id, entry.key(), handler, request, response, &forward).await;
        }

        observer.on_end_of_stack(ctx, stack_id);
        finish(ctx, next, request, response).await
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::new()
    }
}

impl Handler for RouteTable {
    fn name(&self) -> &'static str {
        "routes"
    }

    fn handle<'a>(
        &'a self,
        ctx: &'a mut DispatchContext,
        request: Request,
        response: Response,
        next: &'a Next<'a>,
    ) -> BoxFuture<'a, HandlerResult> {
        Box::pin(async move { self.run(ctx, request, response, Some(next)).await.map(Some) })
    }

    fn into_handler_ref(self) -> HandlerRef {
        HandlerRef::Routes(Arc::new(self.frozen()))
    }
}
