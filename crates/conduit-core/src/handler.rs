//! Type-erased handler and middleware callables.
//!
//! Handlers are stored behind `Arc<dyn Fn ..>` so that the routing tables can
//! hand out cheap clones and release their locks before a handler runs.
//! The `into_*` helpers box an ordinary closure or `async fn`.

use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;

use crate::error::RequestResult;
use crate::message::{Notification, Request, Response};
use crate::middleware::Disposition;

/// A stored request handler.
pub type RequestHandler =
    Arc<dyn Fn(Request) -> BoxFuture<'static, RequestResult<Response>> + Send + Sync>;

/// A stored notification handler.
///
/// Notifications are fire-and-forget, so handlers run synchronously; a
/// handler that needs asynchronous work spawns it itself.
pub type NotificationHandler = Arc<dyn Fn(&Notification) + Send + Sync>;

/// A stored middleware.
pub type Middleware = Arc<dyn Fn(Request) -> BoxFuture<'static, Disposition> + Send + Sync>;

/// Boxes an async request handler.
pub fn into_request_handler<F, Fut>(f: F) -> RequestHandler
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = RequestResult<Response>> + Send + 'static,
{
    Arc::new(move |request| f(request).boxed())
}

/// Boxes a notification handler.
pub fn into_notification_handler<F>(f: F) -> NotificationHandler
where
    F: Fn(&Notification) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Boxes an async middleware.
pub fn into_middleware<F, Fut>(f: F) -> Middleware
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Disposition> + Send + 'static,
{
    Arc::new(move |request| f(request).boxed())
}
