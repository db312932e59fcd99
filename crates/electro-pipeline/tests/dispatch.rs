//! End-to-end dispatch behaviour of registries and route tables.

use electro_core::{AppError, DispatchError, Params, RegistryError, Request, Response};
use electro_pipeline::{
    handler_fn, responder, DispatchContext, DispatchObserver, Handler, HandlerRef,
    HandlerRegistry, Key, LazyHandler, Placement, RouteTable, StackKind,
};
use electro_router::RoutePattern;
use http::StatusCode;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn ok() -> impl Handler {
    responder("ok", |_| Ok(Response::new(StatusCode::OK)))
}

fn text(body: &'static str) -> impl Handler {
    responder("text", move |_| Ok(Response::text(StatusCode::OK, body)))
}

fn passthrough() -> impl Handler {
    handler_fn("passthrough", |ctx, request, response, next| {
        Box::pin(async move { next.run(ctx, request, response).await.map(Some) })
    })
}

fn keys(registry: &HandlerRegistry) -> Vec<String> {
    registry.keys().map(ToString::to_string).collect()
}

// ---------------------------------------------------------------------------
// Ordering
// ---------------------------------------------------------------------------

#[test]
fn test_anchored_inserts_resolve_against_current_order() {
    let mut registry = HandlerRegistry::new();
    registry.add_keyed("A", ok()).unwrap();
    registry.add_keyed("B", ok()).unwrap();
    registry.add_keyed("C", ok()).unwrap();

    registry
        .insert(ok(), Placement::keyed("D").before("B"))
        .unwrap();
    assert_eq!(keys(&registry), ["A", "D", "B", "C"]);

    registry
        .insert(ok(), Placement::keyed("E").after("C"))
        .unwrap();
    assert_eq!(keys(&registry), ["A", "D", "B", "C", "E"]);
}

#[test]
fn test_ordinal_overwrite_preserves_positions() {
    let mut registry = HandlerRegistry::new();
    registry.add(text("zero")).unwrap();
    registry.add_keyed("named", ok()).unwrap();
    registry.add(text("one")).unwrap();
    registry.add(text("two")).unwrap();

    registry.add_keyed(2_u64, text("replaced")).unwrap();

    assert_eq!(keys(&registry), ["0", "named", "1", "2"]);
    let entry = registry.get(&Key::Ordinal(2)).unwrap();
    assert_eq!(entry.handler().resolve(entry.key()).unwrap().name(), "text");
    assert_eq!(registry.position(&Key::Ordinal(2)), Some(3));
}

#[test]
fn test_missing_anchor_leaves_registry_unchanged() {
    let mut registry = HandlerRegistry::new();
    registry.add_keyed("A", ok()).unwrap();
    registry.add(ok()).unwrap();

    let err = registry
        .insert(ok(), Placement::keyed("X").before("missing"))
        .unwrap_err();

    assert_eq!(err, RegistryError::anchor_not_found("missing"));
    assert_eq!(keys(&registry), ["A", "0"]);
    assert_eq!(registry.add(ok()).unwrap(), Key::Ordinal(1));
}

#[test]
fn test_duplicate_name_keeps_first() {
    let mut registry = HandlerRegistry::new();
    registry.add_keyed("session", text("first")).unwrap();

    let err = registry.add_keyed("session", text("second")).unwrap_err();

    assert!(matches!(err, RegistryError::DuplicateKey { .. }));
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_anchored_overwrite_rejected() {
    let mut registry = HandlerRegistry::new();
    registry.add(ok()).unwrap();
    registry.add_keyed("router", ok()).unwrap();

    let err = registry
        .insert(ok(), Placement::keyed(0_u64).after("router"))
        .unwrap_err();

    assert_eq!(err, RegistryError::anchored_overwrite(0));
    assert_eq!(keys(&registry), ["0", "router"]);
}

#[test]
fn test_frozen_registry_rejects_changes() {
    let mut registry = HandlerRegistry::new();
    registry.add(ok()).unwrap();
    registry.freeze();

    assert_eq!(registry.add(ok()).unwrap_err(), RegistryError::RegistryFrozen);
    assert_eq!(
        registry.add_if(false, ok()).unwrap_err(),
        RegistryError::RegistryFrozen
    );
}

// ---------------------------------------------------------------------------
// Execution
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_empty_registry_returns_input_response() {
    let registry = HandlerRegistry::new().frozen();
    let mut ctx = DispatchContext::new();
    let input = Response::text(StatusCode::ACCEPTED, "untouched");

    let response = registry
        .run(&mut ctx, Request::get("/"), input, None)
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert_eq!(response.body_text(), "untouched");
}

#[tokio::test]
async fn test_unfrozen_registry_refuses_to_run() {
    let registry = HandlerRegistry::new();
    let mut ctx = DispatchContext::new();

    let err = registry
        .run(&mut ctx, Request::get("/"), Response::ok(), None)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        DispatchError::Registry(RegistryError::NotFrozen)
    ));
}

#[tokio::test]
async fn test_double_continuation_fails() {
    let mut registry = HandlerRegistry::new();
    registry
        .add(handler_fn("greedy", |ctx, request, response, next| {
            Box::pin(async move {
                let first = next.run(ctx, request.clone(), response.clone()).await?;
                let _second = next.run(ctx, request, first).await?;
                Ok(None)
            })
        }))
        .unwrap();
    registry.add(ok()).unwrap();
    registry.freeze();

    let mut ctx = DispatchContext::new();
    let err = registry
        .run(&mut ctx, Request::get("/"), Response::ok(), None)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        DispatchError::ContinuationAlreadyInvoked { .. }
    ));
}

#[tokio::test]
async fn test_uncaught_application_error_reaches_caller() {
    let mut registry = HandlerRegistry::new();
    registry.add(passthrough()).unwrap();
    registry.add(passthrough()).unwrap();
    registry
        .add(responder("fails", |_| {
            Err(AppError::conflict("email already registered").into())
        }))
        .unwrap();
    registry.add(ok()).unwrap();
    registry.freeze();

    let mut ctx = DispatchContext::new();
    let err = registry
        .run(&mut ctx, Request::post("/signup"), Response::ok(), None)
        .await
        .unwrap_err();

    match err {
        DispatchError::Application(error) => {
            assert_eq!(error.code(), "CONFLICT");
            assert!(error.to_string().contains("email already registered"));
        }
        other => panic!("expected application error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_lazy_slot_builds_once_across_requests() {
    let builds = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&builds);

    let mut registry = HandlerRegistry::new();
    registry
        .add(HandlerRef::lazy(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(text("lazy"))
        }))
        .unwrap();
    registry.freeze();

    for _ in 0..3 {
        let mut ctx = DispatchContext::new();
        let response = registry
            .run(&mut ctx, Request::get("/"), Response::ok(), None)
            .await
            .unwrap();
        assert_eq!(response.body_text(), "lazy");
    }

    assert_eq!(builds.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_failing_factory_reports_instantiation_error() {
    let mut registry = HandlerRegistry::new();
    registry
        .add_keyed(
            "mailer",
            LazyHandler::new(|| Err(anyhow::anyhow!("smtp host not configured"))),
        )
        .unwrap();
    registry.freeze();

    let mut ctx = DispatchContext::new();
    let err = registry
        .run(&mut ctx, Request::get("/"), Response::ok(), None)
        .await
        .unwrap_err();

    match err {
        DispatchError::Instantiation { key, reason } => {
            assert_eq!(key, "mailer");
            assert!(reason.contains("smtp host not configured"));
        }
        other => panic!("expected instantiation error, got {other:?}"),
    }
    assert!(!registry.entries()[0].handler().is_instantiated());
}

// ---------------------------------------------------------------------------
// Route tables
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_first_matching_route_wins() {
    let evaluated = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&evaluated);

    let mut routes = RouteTable::new();
    routes.add("/a", text("literal")).unwrap();
    routes
        .add(
            "/@x",
            responder("catch_all", move |_| {
                seen.fetch_add(1, Ordering::SeqCst);
                Ok(Response::text(StatusCode::OK, "placeholder"))
            }),
        )
        .unwrap();
    routes.freeze();

    let mut ctx = DispatchContext::new();
    let response = routes
        .run(&mut ctx, Request::get("/a"), Response::ok(), None)
        .await
        .unwrap();

    assert_eq!(response.body_text(), "literal");
    assert_eq!(evaluated.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_route_bindings_reach_handler() {
    let mut routes = RouteTable::new();
    routes
        .add(
            "/users/@id",
            responder("show_user", |request| {
                let id = request.attribute("id").unwrap_or_default();
                Ok(Response::text(StatusCode::OK, format!("user {id}")))
            }),
        )
        .unwrap();

    let mut pipeline = HandlerRegistry::new();
    pipeline.add_keyed("router", routes).unwrap();
    pipeline.add_keyed("notFound", text("fallback")).unwrap();
    pipeline.freeze();

    for (path, expected) in [
        ("/users/42", "user 42"),
        ("/users", "fallback"),
        ("/users/42/edit", "fallback"),
    ] {
        let mut ctx = DispatchContext::new();
        let response = pipeline
            .run(&mut ctx, Request::try_new(http::Method::GET, path).unwrap(), Response::ok(), None)
            .await
            .unwrap();
        assert_eq!(response.body_text(), expected, "path {path}");
    }
}

#[tokio::test]
async fn test_nested_table_falls_through_to_parent_chain() {
    let mut admin = RouteTable::new();
    admin.add("/admin/users", text("admin users")).unwrap();

    let mut routes = RouteTable::new();
    routes.add("/admin/*", admin).unwrap();
    routes.add("/admin/reports", text("unreachable")).unwrap();

    let mut pipeline = HandlerRegistry::new();
    pipeline.add_keyed("router", routes).unwrap();
    pipeline.add_keyed("notFound", text("not found")).unwrap();
    pipeline.freeze();

    let mut ctx = DispatchContext::new();
    let response = pipeline
        .run(&mut ctx, Request::get("/admin/users"), Response::ok(), None)
        .await
        .unwrap();
    assert_eq!(response.body_text(), "admin users");

    let mut ctx = DispatchContext::new();
    let response = pipeline
        .run(&mut ctx, Request::get("/admin/reports"), Response::ok(), None)
        .await
        .unwrap();
    assert_eq!(response.body_text(), "not found");
    assert_eq!(ctx.stack_depth(), 0);
}

#[tokio::test]
async fn test_route_handler_delegating_skips_remaining_routes() {
    let mut routes = RouteTable::new();
    routes
        .add(
            "/items/@id",
            handler_fn("tag", |ctx, request, response, next| {
                Box::pin(async move {
                    let response = next.run(ctx, request, response).await?;
                    Ok(Some(response.with_status(StatusCode::PARTIAL_CONTENT)))
                })
            }),
        )
        .unwrap();
    routes.add("/items/*", text("second route")).unwrap();

    let mut pipeline = HandlerRegistry::new();
    pipeline.add(routes).unwrap();
    pipeline.add(text("after router")).unwrap();
    pipeline.freeze();

    let mut ctx = DispatchContext::new();
    let response = pipeline
        .run(&mut ctx, Request::get("/items/9"), Response::ok(), None)
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(response.body_text(), "after router");
}

// ---------------------------------------------------------------------------
// Observation
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<String>>,
}

impl Recorder {
    fn push(&self, event: String) {
        self.events.lock().push(event);
    }

    fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }
}

impl DispatchObserver for Recorder {
    fn on_enter_stack(&self, _ctx: &DispatchContext, _stack_id: u64, kind: StackKind, len: usize) {
        self.push(format!("enter {kind} {len}"));
    }

    fn on_call(&self, _ctx: &DispatchContext, _stack_id: u64, key: &Key, handler: &'static str) {
        self.push(format!("call {key} {handler}"));
    }

    fn on_match(&self, _ctx: &DispatchContext, _stack_id: u64, pattern: &RoutePattern, params: &Params) {
        self.push(format!("match {} {}", pattern.as_str(), params.len()));
    }

    fn on_no_match(&self, _ctx: &DispatchContext, _stack_id: u64, pattern: &RoutePattern) {
        self.push(format!("skip {}", pattern.as_str()));
    }

    fn on_unwind(&self, _ctx: &DispatchContext, _stack_id: u64, error: &DispatchError) {
        self.push(format!("unwind {}", error.kind()));
    }

    fn on_exit(&self, _ctx: &DispatchContext, _stack_id: u64) {
        self.push("exit".to_string());
    }
}

#[tokio::test]
async fn test_observer_sees_routing_decisions() {
    let mut routes = RouteTable::new();
    routes.add("/health", text("up")).unwrap();
    routes.add("/posts/@slug", text("post")).unwrap();

    let mut pipeline = HandlerRegistry::new();
    pipeline.add_keyed("router", routes).unwrap();
    pipeline.freeze();

    let recorder = Arc::new(Recorder::default());
    let mut ctx = DispatchContext::new().with_observer(recorder.clone());
    pipeline
        .run(&mut ctx, Request::get("/posts/hello"), Response::ok(), None)
        .await
        .unwrap();

    assert_eq!(
        recorder.events(),
        [
            "enter registry 1",
            "call router routes",
            "enter routes 2",
            "skip /health",
            "match /posts/@slug 1",
            "call /posts/@slug text",
            "exit",
            "exit",
        ]
    );
}

#[tokio::test]
async fn test_unwind_reported_once_per_stack() {
    let mut routes = RouteTable::new();
    routes
        .add(
            "/boom",
            responder("boom", |_| Err(AppError::internal("exploded").into())),
        )
        .unwrap();

    let mut pipeline = HandlerRegistry::new();
    pipeline.add(passthrough()).unwrap();
    pipeline.add(routes).unwrap();
    pipeline.freeze();

    let recorder = Arc::new(Recorder::default());
    let mut ctx = DispatchContext::new().with_observer(recorder.clone());
    pipeline
        .run(&mut ctx, Request::get("/boom"), Response::ok(), None)
        .await
        .unwrap_err();

    let unwinds: Vec<_> = recorder
        .events()
        .into_iter()
        .filter(|event| event.starts_with("unwind"))
        .collect();
    assert_eq!(unwinds, ["unwind application", "unwind application"]);
    assert_eq!(ctx.stack_depth(), 0);
}

// ---------------------------------------------------------------------------
// Concurrency
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_keep_their_own_context() {
    let probe = || {
        handler_fn("probe", |ctx, request, response, next| {
            Box::pin(async move {
                let path = request.path().to_string();
                tokio::task::yield_now().await;
                assert_eq!(ctx.current_request().map(Request::path), Some(path.as_str()));

                let response = next.run(ctx, request, response).await?;

                tokio::task::yield_now().await;
                assert_eq!(ctx.current_request().map(Request::path), Some(path.as_str()));
                assert_eq!(
                    ctx.current_response().map(|r| r.body_text().into_owned()),
                    Some(path.clone())
                );
                Ok(Some(response))
            })
        })
    };

    let mut registry = HandlerRegistry::new();
    registry.add(probe()).unwrap();
    registry.add(probe()).unwrap();
    registry
        .add(responder("echo", |request| {
            Ok(Response::text(StatusCode::OK, request.path().to_string()))
        }))
        .unwrap();
    let registry = Arc::new(registry.frozen());

    let tasks: Vec<_> = (0..64)
        .map(|i| {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move {
                let path = format!("/requests/{i}");
                let request = Request::try_new(http::Method::GET, &path).unwrap();
                let mut ctx = DispatchContext::new();
                let response = registry
                    .run(&mut ctx, request, Response::ok(), None)
                    .await
                    .unwrap();
                assert_eq!(response.body_text(), path);
            })
        })
        .collect();

    for task in tasks {
        task.await.unwrap();
    }
}
