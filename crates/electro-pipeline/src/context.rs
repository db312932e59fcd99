//! Per-request dispatch state.
//!
//! A [`DispatchContext`] is created for every request and threaded through
//! the pipeline by `&mut`. It is never shared between requests, so concurrent
//! dispatches over the same frozen registries cannot observe each other.

use crate::observer::{DispatchObserver, NoopObserver};
use electro_core::{Request, RequestId, Response};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// State that flows through one dispatch.
///
/// Besides typed extensions, the context records the request and response
/// most recently seen by the executor. They are updated immediately before
/// and after every handler invocation, which is what gives a handler that
/// returns `None` its "use whatever the continuation produced" meaning.
///
/// # Example
///
/// ```
/// use electro_pipeline::DispatchContext;
///
/// #[derive(Debug, PartialEq)]
/// struct Locale(&'static str);
///
/// let mut ctx = DispatchContext::new();
/// ctx.set_extension(Locale("pt-PT"));
///
/// assert_eq!(ctx.get_extension::<Locale>(), Some(&Locale("pt-PT")));
/// assert_eq!(ctx.stack_depth(), 0);
/// assert!(ctx.current_response().is_none());
/// ```
pub struct DispatchContext {
    request_id: RequestId,
    current_request: Option<Request>,
    current_response: Option<Response>,
    /// Id of the most recently opened stack
    last_stack_id: u64,
    /// Stack whose handler is currently executing
    active_stack_id: u64,
    depth: usize,
    started_at: Instant,
    extensions: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
    observer: Arc<dyn DispatchObserver>,
}

impl DispatchContext {
    /// Creates a context with a fresh request ID and no observer.
    #[must_use]
    pub fn new() -> Self {
        Self::with_request_id(RequestId::new())
    }

    /// Creates a context with a specific request ID.
    #[must_use]
    pub fn with_request_id(request_id: RequestId) -> Self {
        Self {
            request_id,
            current_request: None,
            current_response: None,
            last_stack_id: 0,
            active_stack_id: 0,
            depth: 0,
            started_at: Instant::now(),
            extensions: HashMap::new(),
            observer: Arc::new(NoopObserver),
        }
    }

    /// Attaches an observer.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn DispatchObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Returns the request ID.
    #[must_use]
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Replaces the request ID (used when an upstream ID is trusted).
    pub fn set_request_id(&mut self, request_id: RequestId) {
        self.request_id = request_id;
    }

    /// The request most recently seen by the executor.
    #[must_use]
    pub fn current_request(&self) -> Option<&Request> {
        self.current_request.as_ref()
    }

    /// The response most recently seen by the executor.
    #[must_use]
    pub fn current_response(&self) -> Option<&Response> {
        self.current_response.as_ref()
    }

    /// Id of the stack whose handler is executing; `0` before any stack opens.
    ///
    /// Ids increase monotonically within one context.
    #[must_use]
    pub fn stack_id(&self) -> u64 {
        self.active_stack_id
    }

    /// Number of currently open stacks.
    #[must_use]
    pub fn stack_depth(&self) -> usize {
        self.depth
    }

    /// Returns when dispatch started.
    #[must_use]
    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    /// Returns the time elapsed since dispatch started.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Returns the observer receiving dispatch events.
    #[must_use]
    pub fn observer(&self) -> &Arc<dyn DispatchObserver> {
        &self.observer
    }

    /// Stores a typed extension value, replacing any previous one.
    pub fn set_extension<T: Send + Sync + 'static>(&mut self, value: T) {
        self.extensions.insert(TypeId::of::<T>(), Box::new(value));
    }

    /// Retrieves a typed extension value.
    #[must_use]
    pub fn get_extension<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.extensions
            .get(&TypeId::of::<T>())
            .and_then(|v| v.downcast_ref())
    }

    /// Removes and returns a typed extension value.
    pub fn remove_extension<T: Send + Sync + 'static>(&mut self) -> Option<T> {
        self.extensions
            .remove(&TypeId::of::<T>())
            .and_then(|v| v.downcast().ok())
            .map(|b| *b)
    }

    /// Checks if an extension of the given type exists.
    #[must_use]
    pub fn has_extension<T: Send + Sync + 'static>(&self) -> bool {
        self.extensions.contains_key(&TypeId::of::<T>())
    }

    pub(crate) fn record(&mut self, request: &Request, response: &Response) {
        self.current_request = Some(request.clone());
        self.current_response = Some(response.clone());
    }

    pub(crate) fn record_response(&mut self, response: &Response) {
        self.current_response = Some(response.clone());
    }

    /// The response a handler yields when it returns `None`.
    pub(crate) fn settled_response(&self) -> Response {
        self.current_response.clone().unwrap_or_default()
    }

    pub(crate) fn open_stack(&mut self) -> u64 {
        self.last_stack_id += 1;
        self.depth += 1;
        self.last_stack_id
    }

    pub(crate) fn close_stack(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    pub(crate) fn enter_stack(&mut self, stack_id: u64) {
        self.active_stack_id = stack_id;
    }
}

impl Default for DispatchContext {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DispatchContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchContext")
            .field("request_id", &self.request_id)
            .field("stack_id", &self.active_stack_id)
            .field("stack_depth", &self.depth)
            .field("current_request", &self.current_request.as_ref().map(Request::path))
            .field(
                "current_response",
                &self.current_response.as_ref().map(Response::status),
            )
            .field("extensions", &self.extensions.len())
            .finish_non_exhaustive()
    }
}
