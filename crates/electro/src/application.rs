//! Application assembly and request entry points.

use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, OnceLock};

use bytes::Bytes;
use electro_config::ElectroConfig;
use electro_core::{AppError, DispatchError, DispatchResult, RegistryError, Request, RequestId, Response};
use electro_pipeline::stages::{
    ErrorHandler, FlashHandler, FlashStore, MemoryFlashStore, NotFoundHandler, RequestIdHandler,
    DEFAULT_INTERNAL_MESSAGE, ERROR_HANDLING_KEY, NOT_FOUND_KEY, REQUEST_ID_KEY, ROUTER_KEY,
    SESSION_KEY,
};
use electro_pipeline::{
    BoxFuture, DispatchContext, DispatchObserver, Handler, HandlerRegistry, HandlerResult, Next,
    RouteTable,
};
use electro_telemetry::metrics::record_request;
use electro_telemetry::TracingObserver;
use http_body_util::{BodyExt, Full};

use crate::error::BootError;
use crate::module::{Boot, Module};

/// The `router` slot. Routes are added during boot, after the slot has been
/// placed, so it resolves the sealed table at dispatch time.
struct ApplicationRoutes {
    table: Arc<OnceLock<Arc<RouteTable>>>,
}

impl Handler for ApplicationRoutes {
    fn name(&self) -> &'static str {
        "router"
    }

    fn handle<'a>(
        &'a self,
        ctx: &'a mut DispatchContext,
        request: Request,
        response: Response,
        next: &'a Next<'a>,
    ) -> BoxFuture<'a, HandlerResult> {
        match self.table.get() {
            Some(table) => table.handle(ctx, request, response, next),
            None => Box::pin(async { Err(RegistryError::NotFrozen.into()) }),
        }
    }
}

/// Builder for [`Application`].
pub struct ApplicationBuilder {
    config: ElectroConfig,
    observer: Option<Arc<dyn DispatchObserver>>,
    flash_store: Option<Arc<dyn FlashStore>>,
    modules: Vec<Box<dyn Module>>,
}

impl fmt::Debug for ApplicationBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApplicationBuilder")
            .field("config", &self.config)
            .field("modules", &self.modules.iter().map(|m| m.name()).collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl Default for ApplicationBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ApplicationBuilder {
    /// Creates a builder with default configuration and no modules.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: ElectroConfig::default(),
            observer: None,
            flash_store: None,
            modules: Vec::new(),
        }
    }

    /// Sets the configuration.
    #[must_use]
    pub fn config(mut self, config: ElectroConfig) -> Self {
        self.config = config;
        self
    }

    /// Replaces the default [`TracingObserver`].
    #[must_use]
    pub fn observer(mut self, observer: Arc<dyn DispatchObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Sets the flash message store. Defaults to a [`MemoryFlashStore`].
    #[must_use]
    pub fn flash_store(mut self, store: Arc<dyn FlashStore>) -> Self {
        self.flash_store = Some(store);
        self
    }

    /// Adds a module. Modules boot in the order they are added.
    #[must_use]
    pub fn module(mut self, module: impl Module) -> Self {
        self.modules.push(Box::new(module));
        self
    }

    /// Assembles the default pipeline, boots every module and freezes the
    /// result.
    ///
    /// # Errors
    ///
    /// Returns [`BootError`] if the configuration is invalid, module names
    /// repeat, or any registration is rejected.
    pub fn build(self) -> Result<Application, BootError> {
        self.config.validate()?;

        let mut seen = HashSet::new();
        for module in &self.modules {
            if !seen.insert(module.name()) {
                return Err(BootError::DuplicateModule(module.name()));
            }
        }

        let table = Arc::new(OnceLock::new());
        let store = self
            .flash_store
            .unwrap_or_else(|| Arc::new(MemoryFlashStore::new()));
        let pipeline = default_pipeline(&self.config, store, Arc::clone(&table))
            .map_err(BootError::Pipeline)?;

        let mut boot = Boot::new(pipeline, self.config);
        for module in &self.modules {
            tracing::debug!(module = module.name(), "Booting module");
            module.boot(&mut boot).map_err(|source| {
                tracing::error!(module = module.name(), error = %source, "Module boot failed");
                BootError::module(module.name(), source)
            })?;
        }

        let (mut pipeline, routes, config) = boot.into_parts();
        let route_count = routes.len();
        table
            .set(Arc::new(routes.frozen()))
            .map_err(|_| BootError::Pipeline(RegistryError::RegistryFrozen))?;
        pipeline.freeze();

        let observer = self.observer.unwrap_or_else(|| {
            Arc::new(
                TracingObserver::new()
                    .trace_routing(config.dispatch.trace_routing)
                    .record_metrics(config.dispatch.record_metrics),
            )
        });

        tracing::info!(
            app = %config.app.name,
            environment = %config.app.environment,
            modules = self.modules.len(),
            handlers = pipeline.len(),
            routes = route_count,
            "Application booted"
        );

        Ok(Application {
            inner: Arc::new(Inner {
                pipeline,
                routes: table,
                config,
                observer,
            }),
        })
    }
}

/// Registers the stages every application starts with.
fn default_pipeline(
    config: &ElectroConfig,
    store: Arc<dyn FlashStore>,
    table: Arc<OnceLock<Arc<RouteTable>>>,
) -> Result<HandlerRegistry, RegistryError> {
    let mut pipeline = HandlerRegistry::new();

    pipeline.add_keyed(
        REQUEST_ID_KEY,
        RequestIdHandler::with_trust(config.app.trust_request_id),
    )?;
    pipeline.add_keyed(
        ERROR_HANDLING_KEY,
        ErrorHandler::new().expose_internal_errors(config.app.expose_internal_errors),
    )?;
    if config.session.enabled {
        pipeline.add_keyed(
            SESSION_KEY,
            FlashHandler::new(store).session_header(config.session.header.clone()),
        )?;
    }
    pipeline.add_keyed(ROUTER_KEY, ApplicationRoutes { table })?;
    pipeline.add_keyed(NOT_FOUND_KEY, NotFoundHandler)?;

    Ok(pipeline)
}

struct Inner {
    pipeline: HandlerRegistry,
    routes: Arc<OnceLock<Arc<RouteTable>>>,
    config: ElectroConfig,
    observer: Arc<dyn DispatchObserver>,
}

/// A booted, frozen application.
///
/// Cheap to clone; every clone shares the same pipeline.
///
/// # Example
///
/// ```
/// use electro::{module_fn, Application};
/// use electro_core::{Request, Response};
/// use electro_pipeline::responder;
/// use http::StatusCode;
///
/// # tokio_test::block_on(async {
/// let app = Application::builder()
///     .module(module_fn("greeter", |boot| {
///         boot.route("/hello/@name", responder("hello", |request| {
///             let name = request.attribute("name").unwrap_or_default();
///             Ok(Response::text(StatusCode::OK, format!("hello {name}")))
///         }))
///     }))
///     .build()?;
///
/// let response = app.handle(Request::get("/hello/ada")).await?;
/// assert_eq!(response.body_text(), "hello ada");
/// assert!(response.header("x-request-id").is_some());
///
/// let missing = app.handle(Request::get("/nope")).await?;
/// assert_eq!(missing.status(), StatusCode::NOT_FOUND);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// # }).unwrap();
/// ```
#[derive(Clone)]
pub struct Application {
    inner: Arc<Inner>,
}

impl fmt::Debug for Application {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Application")
            .field("name", &self.inner.config.app.name)
            .field("pipeline", &self.keys())
            .field("routes", &self.route_patterns())
            .finish()
    }
}

impl Application {
    /// Creates an application builder.
    #[must_use]
    pub fn builder() -> ApplicationBuilder {
        ApplicationBuilder::new()
    }

    /// The configuration the application was built with.
    #[must_use]
    pub fn config(&self) -> &ElectroConfig {
        &self.inner.config
    }

    /// The frozen middleware pipeline.
    #[must_use]
    pub fn pipeline(&self) -> &HandlerRegistry {
        &self.inner.pipeline
    }

    /// Pipeline keys in dispatch order, as strings.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.inner.pipeline.keys().map(ToString::to_string).collect()
    }

    /// Application route patterns in scan order.
    #[must_use]
    pub fn route_patterns(&self) -> Vec<String> {
        self.inner
            .routes
            .get()
            .map(|table| table.patterns().map(str::to_string).collect())
            .unwrap_or_default()
    }

    /// Dispatches one request through the pipeline.
    ///
    /// # Errors
    ///
    /// Returns whatever no stage handled, including
    /// [`DispatchError::Timeout`] when the configured deadline passes.
    pub async fn handle(&self, request: Request) -> DispatchResult<Response> {
        self.dispatch(request).await.0
    }

    /// Serves a request from the `http` crate.
    ///
    /// Errors that escape the pipeline become a JSON error envelope with the
    /// error's status; they are logged here since nothing else saw them.
    pub async fn serve_http(&self, request: http::Request<Full<Bytes>>) -> http::Response<Full<Bytes>> {
        let (parts, body) = request.into_parts();
        let body = match body.collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(never) => match never {},
        };

        let (result, request_id) = self.dispatch(Request::from_parts(parts, body)).await;
        match result {
            Ok(response) => response.into_http(),
            Err(error) => self.render_unhandled(&error, request_id).into_http(),
        }
    }

    async fn dispatch(&self, request: Request) -> (DispatchResult<Response>, RequestId) {
        let method = request.method().clone();
        let path = request.path().to_string();
        let mut ctx = DispatchContext::new().with_observer(Arc::clone(&self.inner.observer));

        let deadline = self.inner.config.dispatch.request_timeout();
        let run = self.inner.pipeline.run(&mut ctx, request, Response::ok(), None);
        let result = match deadline {
            Some(deadline) => match tokio::time::timeout(deadline, run).await {
                Ok(result) => result,
                Err(_) => {
                    tracing::warn!(
                        method = %method,
                        path = %path,
                        timeout_ms = self.inner.config.dispatch.request_timeout_ms,
                        "Request timed out"
                    );
                    Err(DispatchError::Timeout {
                        after_ms: self.inner.config.dispatch.request_timeout_ms,
                    })
                }
            },
            None => run.await,
        };

        if self.inner.config.dispatch.record_metrics {
            let status = match &result {
                Ok(response) => response.status(),
                Err(error) => error.status_code(),
            };
            record_request(method.as_str(), status.as_u16(), ctx.elapsed());
        }

        (result, ctx.request_id())
    }

    fn render_unhandled(&self, error: &DispatchError, request_id: RequestId) -> Response {
        let request_id = request_id.to_string();
        tracing::error!(
            request_id = %request_id,
            kind = error.kind(),
            error = %error,
            "Unhandled dispatch error"
        );

        let envelope = match error {
            DispatchError::Application(app) => app.to_envelope(Some(&request_id)),
            other => {
                let mut envelope = AppError::internal(other.to_string()).to_envelope(Some(&request_id));
                if !self.inner.config.app.expose_internal_errors {
                    envelope.error.message = DEFAULT_INTERNAL_MESSAGE.to_string();
                }
                envelope
            }
        };

        let body = serde_json::to_value(&envelope).unwrap_or_default();
        Response::json(error.status_code(), &body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use electro_config::{DispatchConfig, SessionConfig};
    use electro_pipeline::{handler_fn, responder, Placement};
    use http::StatusCode;
    use std::time::Duration;

    use crate::module::module_fn;

    fn ok_route(body: &'static str) -> impl Handler {
        responder(body, move |_| Ok(Response::text(StatusCode::OK, body)))
    }

    #[test]
    fn test_application_is_send_sync() {
        fn check<T: Send + Sync + Clone>() {}
        check::<Application>();
    }

    #[test]
    fn test_default_pipeline_order() {
        let app = Application::builder().build().unwrap();
        assert_eq!(
            app.keys(),
            ["requestId", "errorHandling", "session", "router", "notFound"]
        );
        assert!(app.pipeline().is_frozen());
    }

    #[test]
    fn test_session_stage_is_optional() {
        let config = ElectroConfig::builder()
            .session(SessionConfig {
                enabled: false,
                ..SessionConfig::default()
            })
            .build();
        let app = Application::builder().config(config).build().unwrap();
        assert_eq!(app.keys(), ["requestId", "errorHandling", "router", "notFound"]);
    }

    #[test]
    fn test_invalid_config_fails_build() {
        let mut config = ElectroConfig::default();
        config.app.name = String::new();
        let err = Application::builder().config(config).build().unwrap_err();
        assert!(matches!(err, BootError::Config(_)));
    }

    #[test]
    fn test_duplicate_module_names() {
        let err = Application::builder()
            .module(module_fn("blog", |_| Ok(())))
            .module(module_fn("blog", |_| Ok(())))
            .build()
            .unwrap_err();
        assert!(matches!(err, BootError::DuplicateModule("blog")));
    }

    #[test]
    fn test_module_anchoring_failure_names_module() {
        let err = Application::builder()
            .module(module_fn("audit", |boot| {
                boot.middleware(NotFoundHandler, Placement::new().after("auth"))
                    .map(drop)
            }))
            .build()
            .unwrap_err();

        match err {
            BootError::Module { module, source } => {
                assert_eq!(module, "audit");
                assert_eq!(source, RegistryError::anchor_not_found("auth"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_routes_added_after_router_slot_is_placed() {
        let app = Application::builder()
            .module(module_fn("pages", |boot| {
                boot.route("/about", ok_route("about"))?;
                boot.route("/contact", ok_route("contact"))
            }))
            .build()
            .unwrap();
        assert_eq!(app.route_patterns(), ["/about", "/contact"]);
    }

    #[tokio::test]
    async fn test_handle_sets_request_id() {
        let app = Application::builder()
            .module(module_fn("pages", |boot| boot.route("/", ok_route("home"))))
            .build()
            .unwrap();

        let response = app.handle(Request::get("/")).await.unwrap();
        assert_eq!(response.body_text(), "home");
        let id = response.header("x-request-id").unwrap();
        assert!(id.parse::<RequestId>().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_produces_timeout() {
        let config = ElectroConfig::builder()
            .dispatch(DispatchConfig {
                request_timeout_ms: 50,
                ..DispatchConfig::default()
            })
            .build();
        let app = Application::builder()
            .config(config)
            .module(module_fn("slow", |boot| {
                boot.route(
                    "/slow",
                    handler_fn("slow", |_ctx, _request, response, _next| {
                        Box::pin(async move {
                            tokio::time::sleep(Duration::from_secs(5)).await;
                            Ok(Some(response))
                        })
                    }),
                )
            }))
            .build()
            .unwrap();

        let err = app.handle(Request::get("/slow")).await.unwrap_err();
        assert!(matches!(err, DispatchError::Timeout { after_ms: 50 }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_serve_http_renders_unhandled_errors() {
        let config = ElectroConfig::builder()
            .dispatch(DispatchConfig {
                request_timeout_ms: 10,
                ..DispatchConfig::default()
            })
            .build();
        let app = Application::builder()
            .config(config)
            .module(module_fn("slow", |boot| {
                boot.route(
                    "/slow",
                    handler_fn("slow", |_ctx, _request, response, _next| {
                        Box::pin(async move {
                            tokio::time::sleep(Duration::from_secs(1)).await;
                            Ok(Some(response))
                        })
                    }),
                )
            }))
            .build()
            .unwrap();

        let request = http::Request::get("/slow").body(Full::new(Bytes::new())).unwrap();
        let response = app.serve_http(request).await;
        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"]["code"], "INTERNAL_ERROR");
        assert_eq!(json["error"]["message"], DEFAULT_INTERNAL_MESSAGE);
        assert!(json["request_id"].is_string());
    }

    #[tokio::test]
    async fn test_serve_http_passes_body_through() {
        let app = Application::builder()
            .module(module_fn("echo", |boot| {
                boot.route(
                    "/echo",
                    responder("echo", |request| {
                        Ok(Response::new(StatusCode::OK).with_body(request.body().clone()))
                    }),
                )
            }))
            .build()
            .unwrap();

        let request = http::Request::post("/echo")
            .body(Full::new(Bytes::from_static(b"ping")))
            .unwrap();
        let response = app.serve_http(request).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"ping");
    }
}
