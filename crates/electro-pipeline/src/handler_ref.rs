//! Registry slot contents.

use crate::handler::Handler;
use crate::key::Key;
use crate::route_table::RouteTable;
use electro_core::{DispatchError, DispatchResult};
use parking_lot::Mutex;
use std::fmt;
use std::sync::{Arc, OnceLock};

type Factory = Box<dyn Fn() -> anyhow::Result<Arc<dyn Handler>> + Send + Sync>;

/// What a registry slot holds.
pub enum HandlerRef {
    /// A ready handler instance.
    Direct(Arc<dyn Handler>),
    /// A handler built on first dispatch.
    Factory(LazyHandler),
    /// A nested route table.
    Routes(Arc<RouteTable>),
}

impl HandlerRef {
    /// Wraps a ready handler.
    #[must_use]
    pub fn direct(handler: impl Handler) -> Self {
        Self::Direct(Arc::new(handler))
    }

    /// Defers construction until the slot is first reached.
    ///
    /// # Example
    ///
    /// ```
    /// use electro_core::Response;
    /// use electro_pipeline::{responder, HandlerRef};
    /// use http::StatusCode;
    ///
    /// let slot = HandlerRef::lazy(|| {
    ///     Ok(responder("expensive", |_| Ok(Response::new(StatusCode::OK))))
    /// });
    /// assert!(!slot.is_instantiated());
    /// ```
    pub fn lazy<F, H>(factory: F) -> Self
    where
        F: Fn() -> anyhow::Result<H> + Send + Sync + 'static,
        H: Handler,
    {
        Self::Factory(LazyHandler::new(move || {
            factory().map(|handler| Arc::new(handler) as Arc<dyn Handler>)
        }))
    }

    /// Returns the handler, instantiating a factory on first use.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Instantiation`] when a factory fails. The
    /// failure is not memoized; the next dispatch tries again.
    pub fn resolve(&self, key: &Key) -> DispatchResult<&dyn Handler> {
        match self {
            Self::Direct(handler) => Ok(&**handler),
            Self::Factory(lazy) => lazy.get(key),
            Self::Routes(table) => Ok(&**table),
        }
    }

    /// Returns false for a factory that has not been built yet.
    #[must_use]
    pub fn is_instantiated(&self) -> bool {
        match self {
            Self::Factory(lazy) => lazy.is_instantiated(),
            Self::Direct(_) | Self::Routes(_) => true,
        }
    }

    /// Returns the nested route table, if this slot holds one.
    #[must_use]
    pub fn as_routes(&self) -> Option<&RouteTable> {
        match self {
            Self::Routes(table) => Some(&**table),
            Self::Direct(_) | Self::Factory(_) => None,
        }
    }
}

impl<H: Handler> From<H> for HandlerRef {
    fn from(handler: H) -> Self {
        handler.into_handler_ref()
    }
}

impl From<Arc<dyn Handler>> for HandlerRef {
    fn from(handler: Arc<dyn Handler>) -> Self {
        Self::Direct(handler)
    }
}

impl From<Arc<RouteTable>> for HandlerRef {
    fn from(table: Arc<RouteTable>) -> Self {
        Self::Routes(table)
    }
}

impl From<LazyHandler> for HandlerRef {
    fn from(lazy: LazyHandler) -> Self {
        Self::Factory(lazy)
    }
}

impl fmt::Debug for HandlerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Direct(handler) => f.debug_tuple("Direct").field(&handler.name()).finish(),
            Self::Factory(lazy) => f.debug_tuple("Factory").field(lazy).finish(),
            Self::Routes(table) => f.debug_tuple("Routes").field(&table.len()).finish(),
        }
    }
}

/// A handler constructed on first use and then reused.
///
/// Construction is single-flight: concurrent first dispatches wait for one
/// another instead of building the handler twice.
pub struct LazyHandler {
    cell: OnceLock<Arc<dyn Handler>>,
    init: Mutex<()>,
    factory: Factory,
}

impl LazyHandler {
    /// Creates a lazy handler from a factory returning a shared handler.
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn() -> anyhow::Result<Arc<dyn Handler>> + Send + Sync + 'static,
    {
        Self {
            cell: OnceLock::new(),
            init: Mutex::new(()),
            factory: Box::new(factory),
        }
    }

    /// Returns true once the handler has been built.
    #[must_use]
    pub fn is_instantiated(&self) -> bool {
        self.cell.get().is_some()
    }

    fn get(&self, key: &Key) -> DispatchResult<&dyn Handler> {
        if let Some(handler) = self.cell.get() {
            return Ok(&**handler);
        }

        let _guard = self.init.lock();
        if let Some(handler) = self.cell.get() {
            return Ok(&**handler);
        }

        let handler = (self.factory)().map_err(|err| {
            tracing::warn!(key = %key, error = %err, "Handler factory failed");
            DispatchError::instantiation(key, format!("{err:#}"))
        })?;
        Ok(&**self.cell.get_or_init(|| handler))
    }
}

impl fmt::Debug for LazyHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyHandler")
            .field("instantiated", &self.is_instantiated())
            .finish_non_exhaustive()
    }
}
