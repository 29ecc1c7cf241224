//! End-to-end behaviour of the event bus.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use conduit_core::{
    CORE_CHANNEL, Disposition, EventBus, HANDLER_OVERWRITE, Notification, Request, RequestError,
    UNDEFINED_NOTIFICATION_HANDLER,
};
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio_test::{assert_err, assert_ok};
use tower::ServiceExt;

fn add_handler(bus: &EventBus) {
    bus.listen_for_requests("math", "add", |req: Request| async move {
        let a = req.get("a").and_then(Value::as_i64).unwrap_or(0);
        let b = req.get("b").and_then(Value::as_i64).unwrap_or(0);
        Ok(json!({ "result": a + b }))
    });
}

fn record_all(bus: &EventBus) -> Arc<Mutex<Vec<Notification>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    bus.listen_for_all_notifications(move |n: &Notification| sink.lock().push(n.clone()));
    seen
}

// ─── Requests ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_request_reaches_handler() {
    let bus = EventBus::new();
    add_handler(&bus);

    let response = assert_ok!(
        bus.request(Request::new("math", "add").with("a", 2).with("b", 3))
            .await
    );
    assert_eq!(response, json!({ "result": 5 }));
}

#[tokio::test]
async fn test_unknown_channel_and_method() {
    let bus = EventBus::new();
    add_handler(&bus);

    let err = assert_err!(bus.request(Request::new("nope", "add")).await);
    assert_eq!(
        err,
        RequestError::NoSuchChannel {
            channel: "nope".into()
        }
    );
    assert_eq!(err.to_string(), "no such channel nope");

    let err = assert_err!(bus.request(Request::new("math", "sub")).await);
    assert_eq!(
        err,
        RequestError::NoSuchMethod {
            channel: "math".into(),
            method: "sub".into()
        }
    );
    assert!(err.is_routing_error());
}

#[tokio::test]
async fn test_handler_rejection_is_propagated_unchanged() {
    let bus = EventBus::new();
    bus.listen_for_requests("db", "get", |_req: Request| async {
        Err(RequestError::rejected(json!({ "message": "row not found" })))
    });

    let err = assert_err!(bus.request(Request::new("db", "get")).await);
    assert_eq!(err.payload(), Some(&json!({ "message": "row not found" })));
}

#[tokio::test]
async fn test_overwrite_replaces_handler_and_signals_once() {
    let bus = EventBus::new();
    let seen = record_all(&bus);

    bus.listen_for_requests("c", "m", |_req: Request| async { Ok(json!(1)) });
    assert!(seen.lock().is_empty());

    bus.listen_for_requests("c", "m", |_req: Request| async { Ok(json!(2)) });

    let overwrites: Vec<_> = seen
        .lock()
        .iter()
        .filter(|n| n.channel == CORE_CHANNEL && n.method == HANDLER_OVERWRITE)
        .cloned()
        .collect();
    assert_eq!(overwrites.len(), 1);
    assert_eq!(
        overwrites[0].get("message"),
        Some(&json!("overwriting request handler for method m in channel c"))
    );
    assert_eq!(
        overwrites[0].get("overwritten"),
        Some(&json!({ "channel": "c", "method": "m" }))
    );

    let response = assert_ok!(bus.request(Request::new("c", "m")).await);
    assert_eq!(response, json!(2));
}

// ─── Middleware ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_middleware_registered_before_handler_applies() {
    let bus = EventBus::new();
    bus.add_middleware(|req: Request| async move {
        let doubled = req.get("a").and_then(Value::as_i64).unwrap_or(0) * 2;
        Disposition::rewrite(req.with("a", doubled))
    });
    add_handler(&bus);

    let response = assert_ok!(
        bus.request(Request::new("math", "add").with("a", 2).with("b", 3))
            .await
    );
    assert_eq!(response, json!({ "result": 7 }));
}

#[tokio::test]
async fn test_middleware_reject_skips_handler() {
    let bus = EventBus::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    bus.listen_for_requests("c", "m", move |_req: Request| {
        let counter = Arc::clone(&counter);
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(json!(null))
        }
    });
    bus.add_middleware(|_req: Request| async { Disposition::reject("denied") });

    let err = assert_err!(bus.request(Request::new("c", "m")).await);
    assert_eq!(err, RequestError::Rejected(json!("denied")));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_middleware_resolve_skips_handler() {
    let bus = EventBus::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    bus.listen_for_requests("c", "m", move |_req: Request| {
        let counter = Arc::clone(&counter);
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(json!("from handler"))
        }
    });
    bus.add_middleware(|_req: Request| async { Disposition::resolve(json!({ "cached": true })) });

    let response = assert_ok!(bus.request(Request::new("c", "m")).await);
    assert_eq!(response, json!({ "cached": true }));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_middleware_resolve_answers_unknown_route() {
    let bus = EventBus::new();
    bus.add_middleware(|req: Request| async move {
        if req.method == "ping" {
            Disposition::resolve("pong")
        } else {
            Disposition::pass()
        }
    });

    assert_eq!(
        assert_ok!(bus.request(Request::new("anything", "ping")).await),
        json!("pong")
    );
    assert_err!(bus.request(Request::new("anything", "else")).await);
}

#[tokio::test]
async fn test_notifications_bypass_middleware() {
    let bus = EventBus::new();
    bus.add_middleware(|_req: Request| async { Disposition::reject("blocked") });
    let seen = record_all(&bus);

    bus.notify(Notification::new("log", "info"));
    assert_eq!(seen.lock().len(), 1);
}

// ─── Notifications ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_notification_fans_out_in_order() {
    let bus = EventBus::new();
    let order = Arc::new(Mutex::new(Vec::new()));
    for id in ["first", "second"] {
        let order = Arc::clone(&order);
        bus.listen_for_notifications("log", "info", move |n: &Notification| {
            order.lock().push((id, n.get("text").cloned()));
        });
    }

    let delivered = bus.notify(Notification::new("log", "info").with("text", "hello"));

    assert_eq!(delivered, 2);
    assert_eq!(
        *order.lock(),
        vec![
            ("first", Some(json!("hello"))),
            ("second", Some(json!("hello")))
        ]
    );
    assert_eq!(bus.notification_handler_count("log", "info"), 2);
}

#[tokio::test]
async fn test_wildcard_sees_every_notification() {
    let bus = EventBus::new();
    bus.listen_for_notifications("log", "info", |_n: &Notification| {});
    let seen = record_all(&bus);

    bus.notify(Notification::new("log", "info"));
    bus.notify(Notification::new("metrics", "tick"));

    let keys: Vec<_> = seen
        .lock()
        .iter()
        .map(|n| (n.channel.clone(), n.method.clone()))
        .collect();
    assert_eq!(
        keys,
        vec![
            ("log".to_string(), "info".to_string()),
            ("metrics".to_string(), "tick".to_string())
        ]
    );
}

#[tokio::test]
async fn test_undelivered_notification_is_signalled() {
    let bus = EventBus::new();
    let signals = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&signals);
    bus.listen_for_notifications(
        CORE_CHANNEL,
        UNDEFINED_NOTIFICATION_HANDLER,
        move |n: &Notification| sink.lock().push(n.clone()),
    );

    assert_eq!(bus.notify(Notification::new("nobody", "listens")), 0);

    let signals = signals.lock();
    assert_eq!(signals.len(), 1);
    assert_eq!(
        signals[0].get("notification"),
        Some(&json!({ "channel": "nobody", "method": "listens" }))
    );
}

// ─── Introspection and tower ─────────────────────────────────────────────────

#[tokio::test]
async fn test_clones_share_routing_tables() {
    let bus = EventBus::new();
    let clone = bus.clone();
    add_handler(&clone);
    clone.add_middleware(|_req: Request| async { Disposition::pass() });

    assert!(bus.same_bus(&clone));
    assert!(bus.has_request_handler("math", "add"));
    assert!(!bus.has_request_handler("math", "sub"));
    assert_eq!(bus.middleware_count(), 1);
    assert!(!bus.same_bus(&EventBus::new()));
}

#[tokio::test]
async fn test_service_oneshot() {
    let bus = EventBus::new();
    add_handler(&bus);

    let response = assert_ok!(
        bus.clone()
            .oneshot(Request::new("math", "add").with("a", 1).with("b", 1))
            .await
    );
    assert_eq!(response, json!({ "result": 2 }));
}

#[tokio::test]
async fn test_caller_side_timeout() {
    let bus = EventBus::new();
    bus.listen_for_requests("slow", "op", |_req: Request| async {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(json!(null))
    });

    let service = tower::timeout::Timeout::new(bus, Duration::from_millis(20));
    let err = assert_err!(service.oneshot(Request::new("slow", "op")).await);
    assert!(err.is::<tower::timeout::error::Elapsed>());
}
