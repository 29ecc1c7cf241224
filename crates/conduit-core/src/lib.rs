//! # Conduit Core
//!
//! The in-process event bus at the heart of Conduit.
//!
//! Plugins never hold references to one another. They register interest in a
//! `(channel, method)` coordinate and exchange two kinds of messages:
//!
//! - **Requests** are answered by exactly one handler. They pass through the
//!   middleware pipeline first, which may rewrite, resolve or reject them.
//! - **Notifications** are fire-and-forget and reach every subscriber of the
//!   exact coordinate plus every wildcard subscriber.
//!
//! ```text
//!              ┌────────────┐    ┌───────────────┐    ┌──────────┐
//! request ────▶│ Middleware │───▶│ RequestRouter │───▶│ handler  │
//!              └────────────┘    └───────────────┘    └──────────┘
//!                                ┌────────────────────┐
//! notify  ──────────────────────▶│ NotificationRouter │──▶ handlers…
//!                                └────────────────────┘
//! ```
//!
//! The `core` channel is reserved for bus-internal signals:
//! [`HANDLER_OVERWRITE`], [`PLUGIN_LOAD_ERROR`] and
//! [`UNDEFINED_NOTIFICATION_HANDLER`].

pub mod bus;
pub mod error;
pub mod handler;
pub mod message;
pub mod middleware;
pub mod notification;
pub mod request;

pub use bus::EventBus;
pub use error::{RequestError, RequestResult};
pub use handler::{
    Middleware, NotificationHandler, RequestHandler, into_middleware, into_notification_handler,
    into_request_handler,
};
pub use message::{
    CORE_CHANNEL, HANDLER_OVERWRITE, Message, Notification, PLUGIN_LOAD_ERROR, Request, Response,
    UNDEFINED_NOTIFICATION_HANDLER,
};
pub use middleware::{Disposition, MiddlewareChain, Verdict};
pub use notification::NotificationRouter;
pub use request::{Registration, RequestRouter};
pub use tower::BoxError;

/// Prelude for common imports.
pub mod prelude {
    pub use super::{
        Disposition, EventBus, Message, Notification, Request, RequestError, RequestResult,
        Response,
    };
}
