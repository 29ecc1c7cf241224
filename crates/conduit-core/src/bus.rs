//! The event bus: one entry point for requests and notifications.
//!
//! [`EventBus`] composes the [`MiddlewareChain`], the [`RequestRouter`] and
//! the [`NotificationRouter`]. It is a cheap, clonable handle; every clone
//! shares the same routing tables, so a single bus constructed by the host
//! can be injected into every plugin.
//!
//! ```rust,ignore
//! let bus = EventBus::new();
//! bus.listen_for_requests("math", "add", |req: Request| async move {
//!     let a = req.get("a").and_then(Value::as_i64).unwrap_or(0);
//!     let b = req.get("b").and_then(Value::as_i64).unwrap_or(0);
//!     Ok(json!({ "result": a + b }))
//! });
//!
//! let sum = bus.request(Request::new("math", "add").with("a", 2).with("b", 3)).await?;
//! assert_eq!(sum, json!({ "result": 5 }));
//! ```
//!
//! # Timeouts
//!
//! The bus never times a request out. `EventBus` implements
//! [`tower::Service`], so callers bound a request with `tower::timeout` or by
//! racing [`EventBus::request`] against a timer themselves.

use std::future::Future;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::FutureExt;
use futures::future::BoxFuture;
use serde_json::json;
use tower::Service;
use tracing::{debug, warn};

use crate::error::{RequestError, RequestResult};
use crate::handler::{into_middleware, into_notification_handler, into_request_handler};
use crate::message::{HANDLER_OVERWRITE, Message, Notification, Request, Response};
use crate::middleware::{Disposition, MiddlewareChain, Verdict};
use crate::notification::NotificationRouter;
use crate::request::{Registration, RequestRouter};

#[derive(Default, Debug)]
struct BusInner {
    middleware: MiddlewareChain,
    requests: RequestRouter,
    notifications: NotificationRouter,
}

/// Shared handle to the in-process event bus.
#[derive(Clone, Default, Debug)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl EventBus {
    /// Creates a bus with empty routing tables.
    pub fn new() -> Self {
        Self::default()
    }

    // ─── Dispatch ────────────────────────────────────────────────────────────

    /// Sends a request and waits for its answer.
    ///
    /// The request first passes through every middleware. A `Resolve` or
    /// `Reject` disposition answers it without reaching the handler;
    /// otherwise the (possibly rewritten) request is routed to the handler
    /// registered for its `(channel, method)` and the handler's outcome is
    /// returned unchanged.
    pub async fn request(&self, request: Request) -> RequestResult<Response> {
        match self.inner.middleware.handle(request).await {
            Verdict::Resolve(response) => Ok(response),
            Verdict::Reject(payload) => Err(RequestError::Rejected(payload)),
            Verdict::Forward(request) => self.inner.requests.dispatch(request).await,
        }
    }

    /// Delivers a notification to its subscribers and to every wildcard
    /// subscriber. Notifications bypass middleware.
    ///
    /// Returns the number of subscribers reached.
    pub fn notify(&self, notification: Notification) -> usize {
        self.inner.notifications.dispatch(&notification)
    }

    // ─── Registration ────────────────────────────────────────────────────────

    /// Registers the single handler for `(channel, method)` requests.
    ///
    /// An existing handler for the slot is replaced and a
    /// `core/handler-overwrite` notification is raised.
    pub fn listen_for_requests<F, Fut>(
        &self,
        channel: impl Into<String>,
        method: impl Into<String>,
        handler: F,
    ) where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = RequestResult<Response>> + Send + 'static,
    {
        let channel = channel.into();
        let method = method.into();
        let registration =
            self.inner
                .requests
                .register(channel.clone(), method.clone(), into_request_handler(handler));

        if registration == Registration::Replaced {
            warn!(
                channel = %channel,
                method = %method,
                "Overwriting request handler"
            );
            self.notify(
                Message::core(HANDLER_OVERWRITE)
                    .with(
                        "message",
                        format!(
                            "overwriting request handler for method {method} in channel {channel}"
                        ),
                    )
                    .with("overwritten", json!({ "channel": channel, "method": method })),
            );
        }
    }

    /// Subscribes `handler` to `(channel, method)` notifications.
    pub fn listen_for_notifications<F>(
        &self,
        channel: impl Into<String>,
        method: impl Into<String>,
        handler: F,
    ) where
        F: Fn(&Notification) + Send + Sync + 'static,
    {
        self.inner
            .notifications
            .register(channel, method, into_notification_handler(handler));
    }

    /// Subscribes `handler` to every notification.
    pub fn listen_for_all_notifications<F>(&self, handler: F)
    where
        F: Fn(&Notification) + Send + Sync + 'static,
    {
        self.inner
            .notifications
            .register_wildcard(into_notification_handler(handler));
    }

    /// Appends a middleware to the request pipeline.
    pub fn add_middleware<F, Fut>(&self, middleware: F)
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Disposition> + Send + 'static,
    {
        self.inner.middleware.push(into_middleware(middleware));
    }

    // ─── Introspection ───────────────────────────────────────────────────────

    /// Returns `true` if a request handler occupies `(channel, method)`.
    pub fn has_request_handler(&self, channel: &str, method: &str) -> bool {
        self.inner.requests.contains(channel, method)
    }

    /// Returns the number of scoped notification subscribers for `(channel, method)`.
    pub fn notification_handler_count(&self, channel: &str, method: &str) -> usize {
        self.inner.notifications.handler_count(channel, method)
    }

    /// Returns the number of wildcard notification subscribers.
    pub fn wildcard_handler_count(&self) -> usize {
        self.inner.notifications.wildcard_count()
    }

    /// Returns the number of registered middleware.
    pub fn middleware_count(&self) -> usize {
        self.inner.middleware.len()
    }

    /// Returns `true` if both handles point at the same bus.
    pub fn same_bus(&self, other: &EventBus) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Service<Request> for EventBus {
    type Response = Response;
    type Error = RequestError;
    type Future = BoxFuture<'static, RequestResult<Response>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request) -> Self::Future {
        let bus = self.clone();
        debug!(channel = %request.channel, method = %request.method, "Request via service");
        async move { bus.request(request).await }.boxed()
    }
}
