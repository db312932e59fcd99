//! Ordered, keyed handler registries.
//!
//! Modules contribute handlers without knowing the final order. Each
//! registration names where it wants to go (an ordinal slot, a position
//! relative to an existing key, or the end) and the registry resolves all of
//! them into one deterministic sequence.
//!
//! ## Placement rules
//!
//! | Request | Effect |
//! |---------|--------|
//! | no key | appended under the next free ordinal |
//! | existing ordinal | slot overwritten in place |
//! | new ordinal | appended; later auto ordinals skip past it |
//! | existing name | [`RegistryError::DuplicateKey`] |
//! | `before(k)` / `after(k)` | inserted next to the first entry keyed `k` |
//! | unknown anchor | [`RegistryError::AnchorNotFound`] |
//! | overwrite + anchor | [`RegistryError::AnchoredOverwrite`] |
//! | no key, ordinal `u64::MAX` taken | [`RegistryError::OrdinalsExhausted`] |
//! | after [`HandlerRegistry::freeze`] | [`RegistryError::RegistryFrozen`] |
//!
//! Anchors resolve against the order at the time of the call. A failing
//! call leaves the registry untouched.

use crate::context::DispatchContext;
use crate::executor::PipelineExecutor;
use crate::handler::{BoxFuture, Handler, HandlerResult, Next};
use crate::handler_ref::HandlerRef;
use crate::key::{Anchor, Key, Placement};
use electro_core::{DispatchResult, RegistryError, Request, Response};
use electro_router::RoutePattern;
use std::sync::Arc;

/// One registry slot.
#[derive(Debug)]
pub struct Entry {
    key: Key,
    handler: HandlerRef,
    route: Option<RoutePattern>,
}

impl Entry {
    /// The slot key.
    #[must_use]
    pub fn key(&self) -> &Key {
        &self.key
    }

    /// The slot contents.
    #[must_use]
    pub fn handler(&self) -> &HandlerRef {
        &self.handler
    }

    /// The compiled pattern, for route table entries.
    #[must_use]
    pub fn route(&self) -> Option<&RoutePattern> {
        self.route.as_ref()
    }
}

/// An ordered set of keyed handlers.
///
/// # Example
///
/// ```
/// use electro_core::Response;
/// use electro_pipeline::{responder, HandlerRegistry, Key, Placement};
/// use http::StatusCode;
///
/// let ok = || responder("ok", |_| Ok(Response::new(StatusCode::OK)));
///
/// let mut registry = HandlerRegistry::new();
/// registry.add_keyed("router", ok())?;
/// registry.add_keyed("notFound", ok())?;
/// registry.insert(ok(), Placement::keyed("csrf").before("router"))?;
///
/// let keys: Vec<String> = registry.keys().map(ToString::to_string).collect();
/// assert_eq!(keys, ["csrf", "router", "notFound"]);
/// # Ok::<(), electro_core::RegistryError>(())
/// ```
#[derive(Debug)]
pub struct HandlerRegistry {
    entries: Vec<Entry>,
    // None once `u64::MAX` has been handed out.
    next_ordinal: Option<u64>,
    frozen: bool,
    unique_names: bool,
}

impl HandlerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_ordinal: Some(0),
            frozen: false,
            unique_names: true,
        }
    }

    /// A registry where name keys may repeat (route patterns).
    pub(crate) fn allowing_duplicate_names() -> Self {
        Self {
            unique_names: false,
            ..Self::new()
        }
    }

    /// Registers a handler at the requested placement.
    ///
    /// Returns the key the handler ended up under.
    ///
    /// # Errors
    ///
    /// See the placement rules in the module documentation.
    pub fn insert(
        &mut self,
        handler: impl Into<HandlerRef>,
        placement: Placement,
    ) -> Result<Key, RegistryError> {
        self.insert_entry(handler.into(), None, placement)
    }

    /// Appends a handler under the next free ordinal.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::RegistryFrozen`] after [`Self::freeze`].
    pub fn add(&mut self, handler: impl Into<HandlerRef>) -> Result<Key, RegistryError> {
        self.insert(handler, Placement::new())
    }

    /// Appends (or, for an existing ordinal, overwrites) under `key`.
    ///
    /// # Errors
    ///
    /// See the placement rules in the module documentation.
    pub fn add_keyed(
        &mut self,
        key: impl Into<Key>,
        handler: impl Into<HandlerRef>,
    ) -> Result<Key, RegistryError> {
        self.insert(handler, Placement::keyed(key))
    }

    /// Appends a handler only when `condition` holds.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::RegistryFrozen`] after [`Self::freeze`],
    /// whether or not the condition holds.
    pub fn add_if(
        &mut self,
        condition: bool,
        handler: impl Into<HandlerRef>,
    ) -> Result<Option<Key>, RegistryError> {
        self.ensure_open()?;
        if condition {
            self.add(handler).map(Some)
        } else {
            Ok(None)
        }
    }

    /// Appends every handler in order.
    ///
    /// # Errors
    ///
    /// Stops at the first failure; handlers before it stay registered.
    pub fn extend<I>(&mut self, handlers: I) -> Result<(), RegistryError>
    where
        I: IntoIterator,
        I::Item: Into<HandlerRef>,
    {
        for handler in handlers {
            self.add(handler)?;
        }
        Ok(())
    }

    pub(crate) fn insert_entry(
        &mut self,
        handler: HandlerRef,
        route: Option<RoutePattern>,
        placement: Placement,
    ) -> Result<Key, RegistryError> {
        self.ensure_open()?;
        let (key, anchor) = placement.into_parts();

        if let Some(key @ Key::Ordinal(_)) = &key {
            if let Some(index) = self.position(key) {
                if anchor.is_some() {
                    return Err(RegistryError::anchored_overwrite(key));
                }
                let key = key.clone();
                self.entries[index] = Entry {
                    key: key.clone(),
                    handler,
                    route,
                };
                return Ok(key);
            }
        }

        if let Some(key @ Key::Name(_)) = &key {
            if self.unique_names && self.contains(key) {
                return Err(RegistryError::duplicate_key(key));
            }
        }

        let index = match &anchor {
            None => self.entries.len(),
            Some(Anchor::Before(anchor)) => self
                .position(anchor)
                .ok_or_else(|| RegistryError::anchor_not_found(anchor))?,
            Some(Anchor::After(anchor)) => self
                .position(anchor)
                .map(|index| index + 1)
                .ok_or_else(|| RegistryError::anchor_not_found(anchor))?,
        };

        let (key, next_ordinal) = match key {
            Some(Key::Ordinal(n)) => {
                let next = match (self.next_ordinal, n.checked_add(1)) {
                    (Some(current), Some(after)) => Some(current.max(after)),
                    _ => None,
                };
                (Key::Ordinal(n), next)
            }
            Some(name) => (name, self.next_ordinal),
            None => {
                let n = self.next_ordinal.ok_or(RegistryError::OrdinalsExhausted)?;
                (Key::Ordinal(n), n.checked_add(1))
            }
        };
        self.next_ordinal = next_ordinal;

        self.entries.insert(
            index,
            Entry {
                key: key.clone(),
                handler,
                route,
            },
        );
        Ok(key)
    }

    fn ensure_open(&self) -> Result<(), RegistryError> {
        if self.frozen {
            Err(RegistryError::RegistryFrozen)
        } else {
            Ok(())
        }
    }

    /// Makes the registry read-only. Idempotent.
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    /// Freezes and returns the registry.
    #[must_use]
    pub fn frozen(mut self) -> Self {
        self.freeze();
        self
    }

    /// Returns true once frozen.
    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Keys in dispatch order.
    pub fn keys(&self) -> impl Iterator<Item = &Key> {
        self.entries.iter().map(Entry::key)
    }

    /// Entries in dispatch order.
    #[must_use]
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Returns the first entry with `key`.
    #[must_use]
    pub fn get(&self, key: &Key) -> Option<&Entry> {
        self.entries.iter().find(|entry| &entry.key == key)
    }

    /// Index of the first entry with `key`.
    #[must_use]
    pub fn position(&self, key: &Key) -> Option<usize> {
        self.entries.iter().position(|entry| &entry.key == key)
    }

    /// Returns true if some entry has `key`.
    #[must_use]
    pub fn contains(&self, key: &Key) -> bool {
        self.position(key).is_some()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Dispatches through this registry; see [`PipelineExecutor::run`].
    ///
    /// # Errors
    ///
    /// Fails with [`RegistryError::NotFrozen`] if the registry is not frozen,
    /// and otherwise propagates handler errors.
    pub async fn run(
        &self,
        ctx: &mut DispatchContext,
        request: Request,
        response: Response,
        next: Option<&Next<'_>>,
    ) -> DispatchResult<Response> {
        PipelineExecutor::new(self)?
            .run(ctx, request, response, next)
            .await
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// A registry nested inside another runs as its own stack; falling off its
/// end resumes the parent chain.
impl Handler for HandlerRegistry {
    fn name(&self) -> &'static str {
        "registry"
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
        HandlerRef::Direct(Arc::new(self.frozen()))
    }
}
