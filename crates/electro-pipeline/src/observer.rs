//! Dispatch observation hooks.
//!
//! The executor reports what it does to a [`DispatchObserver`] held by the
//! [`DispatchContext`]. Observers see every stack opened, every handler
//! called and returned, every route matched or skipped, and every error that
//! unwinds a stack. They cannot alter dispatch.
//!
//! `electro-telemetry` provides an observer that logs these events and
//! records metrics; [`NoopObserver`] is the default.

use crate::context::DispatchContext;
use crate::key::Key;
use electro_core::{DispatchError, Params, Response};
use electro_router::RoutePattern;
use std::fmt;

/// The kind of stack being entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StackKind {
    /// A plain handler registry.
    Registry,
    /// A route table.
    Routes,
}

impl StackKind {
    /// Returns a short label.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Registry => "registry",
            Self::Routes => "routes",
        }
    }
}

impl fmt::Display for StackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receives dispatch events. Every hook defaults to doing nothing.
#[allow(unused_variables)]
pub trait DispatchObserver: Send + Sync + 'static {
    /// A registry or route table started running.
    fn on_enter_stack(&self, ctx: &DispatchContext, stack_id: u64, kind: StackKind, len: usize) {}

    /// A handler is about to be invoked.
    fn on_call(&self, ctx: &DispatchContext, stack_id: u64, key: &Key, handler: &'static str) {}

    /// A handler returned normally.
    fn on_return(&self, ctx: &DispatchContext, stack_id: u64, key: &Key, response: &Response) {}

    /// A route pattern matched the request path.
    fn on_match(&self, ctx: &DispatchContext, stack_id: u64, pattern: &RoutePattern, params: &Params) {}

    /// A route pattern did not match and was skipped.
    fn on_no_match(&self, ctx: &DispatchContext, stack_id: u64, pattern: &RoutePattern) {}

    /// A stack ran out of entries.
    fn on_end_of_stack(&self, ctx: &DispatchContext, stack_id: u64) {}

    /// An error is leaving a stack.
    fn on_unwind(&self, ctx: &DispatchContext, stack_id: u64, error: &DispatchError) {}

    /// A stack finished, normally or not.
    fn on_exit(&self, ctx: &DispatchContext, stack_id: u64) {}
}

/// An observer that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl DispatchObserver for NoopObserver {}
