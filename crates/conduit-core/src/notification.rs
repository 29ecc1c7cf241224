//! Multicast notification routing.
//!
//! The [`NotificationRouter`] keeps an ordered subscriber list per
//! `(channel, method)` and a list of wildcard subscribers that see every
//! notification. Delivery order is scoped subscribers (in registration order)
//! followed by wildcard subscribers.
//!
//! A notification that reaches nobody is not an error. The router re-enters
//! itself with a `core/undefined-notification-handler` signal carrying the
//! original message; that signal is never itself re-signalled.

use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};

use parking_lot::RwLock;
use tracing::{debug, error, trace};

use crate::handler::NotificationHandler;
use crate::message::{CORE_CHANNEL, Message, Notification, UNDEFINED_NOTIFICATION_HANDLER};

#[derive(Default)]
struct Subscribers {
    scoped: HashMap<String, HashMap<String, Vec<NotificationHandler>>>,
    wildcard: Vec<NotificationHandler>,
}

/// Table of notification subscribers.
#[derive(Default)]
pub struct NotificationRouter {
    subscribers: RwLock<Subscribers>,
}

impl NotificationRouter {
    /// Creates an empty router.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `handler` to the subscribers of `(channel, method)`.
    pub fn register(
        &self,
        channel: impl Into<String>,
        method: impl Into<String>,
        handler: NotificationHandler,
    ) {
        let channel = channel.into();
        let method = method.into();
        self.subscribers
            .write()
            .scoped
            .entry(channel.clone())
            .or_default()
            .entry(method.clone())
            .or_default()
            .push(handler);
        debug!(channel = %channel, method = %method, "Added notification listener");
    }

    /// Appends `handler` to the wildcard subscribers.
    pub fn register_wildcard(&self, handler: NotificationHandler) {
        self.subscribers.write().wildcard.push(handler);
        debug!("Added wildcard notification listener");
    }

    /// Returns the effective subscriber list: scoped first, then wildcard.
    pub fn subscribers(&self, channel: &str, method: &str) -> Vec<NotificationHandler> {
        let subscribers = self.subscribers.read();
        subscribers
            .scoped
            .get(channel)
            .and_then(|methods| methods.get(method))
            .into_iter()
            .flatten()
            .chain(subscribers.wildcard.iter())
            .cloned()
            .collect()
    }

    /// Returns the number of scoped subscribers for `(channel, method)`.
    pub fn handler_count(&self, channel: &str, method: &str) -> usize {
        self.subscribers
            .read()
            .scoped
            .get(channel)
            .and_then(|methods| methods.get(method))
            .map_or(0, Vec::len)
    }

    /// Returns the number of wildcard subscribers.
    pub fn wildcard_count(&self) -> usize {
        self.subscribers.read().wildcard.len()
    }

    /// Delivers `notification` to every effective subscriber.
    ///
    /// Subscribers run one after another. A panicking subscriber is logged and
    /// skipped; the remaining subscribers still receive the notification.
    /// Returns the number of subscribers the notification was handed to.
    pub fn dispatch(&self, notification: &Notification) -> usize {
        let subscribers = self.subscribers(&notification.channel, &notification.method);

        if subscribers.is_empty() {
            if is_undeliverable_signal(notification) {
                trace!("Undeliverable-notification signal has no listener");
                return 0;
            }
            debug!(
                channel = %notification.channel,
                method = %notification.method,
                "No listener for notification"
            );
            let signal = Message::core(UNDEFINED_NOTIFICATION_HANDLER)
                .with("notification", notification.to_value());
            self.dispatch(&signal);
            return 0;
        }

        for (position, subscriber) in subscribers.iter().enumerate() {
            if catch_unwind(AssertUnwindSafe(|| subscriber(notification))).is_err() {
                error!(
                    channel = %notification.channel,
                    method = %notification.method,
                    position,
                    "Notification listener panicked"
                );
            }
        }

        subscribers.len()
    }
}

fn is_undeliverable_signal(notification: &Notification) -> bool {
    notification.channel == CORE_CHANNEL && notification.method == UNDEFINED_NOTIFICATION_HANDLER
}

impl std::fmt::Debug for NotificationRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let subscribers = self.subscribers.read();
        f.debug_struct("NotificationRouter")
            .field("channels", &subscribers.scoped.len())
            .field("wildcard", &subscribers.wildcard.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::into_notification_handler;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter() -> (Arc<AtomicUsize>, NotificationHandler) {
        let count = Arc::new(AtomicUsize::new(0));
        let clone = Arc::clone(&count);
        let handler = into_notification_handler(move |_n: &Notification| {
            clone.fetch_add(1, Ordering::SeqCst);
        });
        (count, handler)
    }

    #[test]
    fn test_scoped_then_wildcard() {
        let router = NotificationRouter::new();
        let order = Arc::new(parking_lot::Mutex::new(Vec::new()));

        let o = Arc::clone(&order);
        router.register_wildcard(into_notification_handler(move |_n: &Notification| {
            o.lock().push("wildcard")
        }));
        let o = Arc::clone(&order);
        router.register(
            "log",
            "info",
            into_notification_handler(move |_n: &Notification| o.lock().push("scoped")),
        );

        assert_eq!(router.dispatch(&Notification::new("log", "info")), 2);
        assert_eq!(*order.lock(), vec!["scoped", "wildcard"]);
    }

    #[test]
    fn test_other_keys_do_not_receive() {
        let router = NotificationRouter::new();
        let (count, handler) = counter();
        router.register("log", "info", handler);

        router.dispatch(&Notification::new("log", "warn"));
        router.dispatch(&Notification::new("other", "info"));

        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_undeliverable_signal_carries_original() {
        let router = NotificationRouter::new();
        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let s = Arc::clone(&seen);
        router.register(
            CORE_CHANNEL,
            UNDEFINED_NOTIFICATION_HANDLER,
            into_notification_handler(move |n: &Notification| {
                s.lock().push(n.get("notification").cloned())
            }),
        );

        assert_eq!(router.dispatch(&Notification::new("nobody", "home")), 0);

        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(
            seen[0],
            Some(serde_json::json!({"channel": "nobody", "method": "home"}))
        );
    }

    #[test]
    fn test_undeliverable_signal_does_not_recurse() {
        let router = NotificationRouter::new();
        assert_eq!(router.dispatch(&Notification::new("nobody", "home")), 0);
        assert_eq!(
            router.dispatch(&Notification::core(UNDEFINED_NOTIFICATION_HANDLER)),
            0
        );
    }

    #[test]
    fn test_panicking_listener_does_not_block_others() {
        let router = NotificationRouter::new();
        router.register(
            "log",
            "info",
            into_notification_handler(|_n: &Notification| panic!("listener failure")),
        );
        let (count, handler) = counter();
        router.register("log", "info", handler);

        assert_eq!(router.dispatch(&Notification::new("log", "info")), 2);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
