//! Flash messages.
//!
//! A handler that wants to bounce the user back with a message fails with
//! [`DispatchError::Flash`]. [`FlashHandler`] catches it, stores the message
//! against the caller's session and answers `303 See Other` to the same URI.
//! On the following request the stored message is taken out of the store
//! and exposed to downstream handlers as a [`PendingFlash`] context
//! extension.
//!
//! Sessions are identified by a request header (`x-session-id` unless
//! configured otherwise). Requests without one share the `anonymous`
//! session.

use crate::context::DispatchContext;
use crate::handler::{BoxFuture, Handler, HandlerResult, Next};
use electro_core::{DispatchError, FlashMessage, Request, Response};
use http::header::HeaderValue;
use http::StatusCode;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Default header carrying the session identifier.
pub const DEFAULT_SESSION_HEADER: &str = "x-session-id";

/// Session used when a request carries no session header.
pub const ANONYMOUS_SESSION: &str = "anonymous";

/// Storage for flash messages awaiting display.
pub trait FlashStore: Send + Sync + 'static {
    /// Removes and returns the message pending for `session`.
    fn take(&self, session: &str) -> Option<FlashMessage>;

    /// Stores a message for `session`, replacing any pending one.
    fn put(&self, session: &str, message: FlashMessage);
}

/// Pending messages a [`MemoryFlashStore`] holds unless told otherwise.
pub const DEFAULT_FLASH_CAPACITY: usize = 10_000;

/// In-process flash store.
///
/// Session ids come from a client-supplied header, so the store is bounded:
/// once `capacity` sessions have a message pending, storing one for a new
/// session evicts the oldest. Deployments with many concurrent users should
/// supply a shared [`FlashStore`] instead.
#[derive(Debug)]
pub struct MemoryFlashStore {
    capacity: usize,
    state: Mutex<PendingMessages>,
}

#[derive(Debug, Default)]
struct PendingMessages {
    next_seq: u64,
    by_session: HashMap<String, (u64, FlashMessage)>,
}

impl PendingMessages {
    fn evict_oldest(&mut self) {
        let oldest = self
            .by_session
            .iter()
            .min_by_key(|(_, (seq, _))| *seq)
            .map(|(session, _)| session.clone());
        if let Some(session) = oldest {
            self.by_session.remove(&session);
        }
    }
}

impl Default for MemoryFlashStore {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_FLASH_CAPACITY)
    }
}

impl MemoryFlashStore {
    /// Creates an empty store holding up to [`DEFAULT_FLASH_CAPACITY`] messages.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty store holding up to `capacity` messages (at least one).
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            state: Mutex::new(PendingMessages::default()),
        }
    }

    /// Maximum number of pending messages.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of sessions with a pending message.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().by_session.len()
    }

    /// Returns true if no messages are pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.lock().by_session.is_empty()
    }
}

impl FlashStore for MemoryFlashStore {
    fn take(&self, session: &str) -> Option<FlashMessage> {
        self.state
            .lock()
            .by_session
            .remove(session)
            .map(|(_, message)| message)
    }

    fn put(&self, session: &str, message: FlashMessage) {
        let mut state = self.state.lock();
        if !state.by_session.contains_key(session) && state.by_session.len() >= self.capacity {
            state.evict_oldest();
        }
        let seq = state.next_seq;
        state.next_seq = seq.wrapping_add(1);
        state.by_session.insert(session.to_string(), (seq, message));
    }
}

/// The flash message carried over from the previous request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingFlash(pub FlashMessage);

/// Handler that turns flash errors into redirects.
#[derive(Clone)]
pub struct FlashHandler {
    store: Arc<dyn FlashStore>,
    header: String,
}

impl fmt::Debug for FlashHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlashHandler")
            .field("header", &self.header)
            .finish_non_exhaustive()
    }
}

impl Default for FlashHandler {
    fn default() -> Self {
        Self::new(Arc::new(MemoryFlashStore::new()))
    }
}

impl FlashHandler {
    /// Creates the stage over a store.
    #[must_use]
    pub fn new(store: Arc<dyn FlashStore>) -> Self {
        Self {
            store,
            header: DEFAULT_SESSION_HEADER.to_string(),
        }
    }

    /// Reads the session identifier from another header.
    #[must_use]
    pub fn session_header(mut self, header: impl Into<String>) -> Self {
        self.header = header.into();
        self
    }

    /// The backing store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn FlashStore> {
        &self.store
    }

    fn session_of(&self, request: &Request) -> String {
        request
            .header(&self.header)
            .filter(|value| !value.is_empty())
            .unwrap_or(ANONYMOUS_SESSION)
            .to_string()
    }
}

fn redirect_target(request: &Request) -> HeaderValue {
    HeaderValue::from_str(&request.uri().to_string())
        .unwrap_or_else(|_| HeaderValue::from_static("/"))
}

impl Handler for FlashHandler {
    fn name(&self) -> &'static str {
        "session"
    }

    fn handle<'a>(
        &'a self,
        ctx: &'a mut DispatchContext,
        request: Request,
        response: Response,
        next: &'a Next<'a>,
    ) -> BoxFuture<'a, HandlerResult> {
        Box::pin(async move {
            let session = self.session_of(&request);
            let target = redirect_target(&request);

            if let Some(message) = self.store.take(&session) {
                ctx.set_extension(PendingFlash(message));
            }

            match next.run(ctx, request, response).await {
                Ok(response) => Ok(Some(response)),
                Err(DispatchError::Flash(message)) => {
                    tracing::debug!(
                        request_id = %ctx.request_id(),
                        session = %session,
                        kind = ?message.kind,
                        "Storing flash message and redirecting"
                    );
                    self.store.put(&session, message);
                    Ok(Some(Response::redirect(StatusCode::SEE_OTHER, target)))
                }
                Err(other) => Err(other),
            }
        })
    }
}
