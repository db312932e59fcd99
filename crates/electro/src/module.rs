//! Modules and the boot phase.
//!
//! A module contributes middleware and routes without knowing what else is
//! installed. Middleware is placed relative to the default pipeline keys
//! (see [`electro_pipeline::stages`]) or to keys other modules registered
//! earlier; anchors resolve against the order at the moment of the call.

use electro_config::ElectroConfig;
use electro_core::RegistryError;
use electro_pipeline::{HandlerRef, HandlerRegistry, Key, Placement, RouteTable};

/// A unit of application functionality.
///
/// # Example
///
/// ```
/// use electro::{Boot, Module};
/// use electro_core::{RegistryError, Response};
/// use electro_pipeline::responder;
/// use http::StatusCode;
///
/// struct Health;
///
/// impl Module for Health {
///     fn name(&self) -> &'static str {
///         "health"
///     }
///
///     fn boot(&self, boot: &mut Boot) -> Result<(), RegistryError> {
///         boot.route("/health", responder("health", |_| Ok(Response::text(StatusCode::OK, "ok"))))
///     }
/// }
/// ```
pub trait Module: Send + 'static {
    /// Unique module name.
    fn name(&self) -> &'static str;

    /// Registers the module's handlers.
    ///
    /// # Errors
    ///
    /// Any rejected registration; it aborts the application build.
    fn boot(&self, boot: &mut Boot) -> Result<(), RegistryError>;
}

/// A module defined by a closure.
pub struct FnModule<F> {
    name: &'static str,
    boot: F,
}

/// Creates a module from a boot closure.
///
/// ```
/// use electro::module_fn;
/// use electro_pipeline::stages::NotFoundHandler;
/// use electro_pipeline::Placement;
///
/// let admin = module_fn("admin", |boot| {
///     boot.middleware(NotFoundHandler, Placement::keyed("adminGate").before("router"))?;
///     Ok(())
/// });
/// ```
pub fn module_fn<F>(name: &'static str, boot: F) -> FnModule<F>
where
    F: Fn(&mut Boot) -> Result<(), RegistryError> + Send + 'static,
{
    FnModule { name, boot }
}

impl<F> Module for FnModule<F>
where
    F: Fn(&mut Boot) -> Result<(), RegistryError> + Send + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn boot(&self, boot: &mut Boot) -> Result<(), RegistryError> {
        (self.boot)(boot)
    }
}

/// Registration surface handed to [`Module::boot`].
#[derive(Debug)]
pub struct Boot {
    pipeline: HandlerRegistry,
    routes: RouteTable,
    config: ElectroConfig,
}

impl Boot {
    pub(crate) fn new(pipeline: HandlerRegistry, config: ElectroConfig) -> Self {
        Self {
            pipeline,
            routes: RouteTable::new(),
            config,
        }
    }

    pub(crate) fn into_parts(self) -> (HandlerRegistry, RouteTable, ElectroConfig) {
        (self.pipeline, self.routes, self.config)
    }

    /// The application configuration.
    #[must_use]
    pub fn config(&self) -> &ElectroConfig {
        &self.config
    }

    /// The middleware pipeline, in its current order.
    pub fn pipeline(&mut self) -> &mut HandlerRegistry {
        &mut self.pipeline
    }

    /// The application route table mounted at the `router` key.
    pub fn routes(&mut self) -> &mut RouteTable {
        &mut self.routes
    }

    /// Places a middleware handler in the pipeline.
    ///
    /// # Errors
    ///
    /// See [`HandlerRegistry::insert`].
    pub fn middleware(
        &mut self,
        handler: impl Into<HandlerRef>,
        placement: Placement,
    ) -> Result<Key, RegistryError> {
        self.pipeline.insert(handler, placement)
    }

    /// Appends an application route.
    ///
    /// # Errors
    ///
    /// See [`RouteTable::add`].
    pub fn route(&mut self, pattern: &str, handler: impl Into<HandlerRef>) -> Result<(), RegistryError> {
        self.routes.add(pattern, handler)
    }
}
