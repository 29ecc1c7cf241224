//! The scoped handle a plugin receives in `init`.
//!
//! [`PluginContext`] is a narrowed view of the bus. It adds no routing state
//! of its own, only the plugin's identity and its configuration section, plus
//! per-channel builders so a plugin can register several methods fluently:
//!
//! ```rust,ignore
//! ctx.listen_for_requests("math")
//!     .on("add", add)
//!     .on("sub", sub);
//! ctx.listen_for_notifications("log")
//!     .on("info", |n| println!("{:?}", n.get("text")));
//! ```

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use conduit_core::{Disposition, EventBus, Notification, Request, RequestResult, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// A plugin's view of the bus.
#[derive(Clone, Debug)]
pub struct PluginContext {
    bus: EventBus,
    name: Arc<str>,
    path: Arc<Path>,
    config: Arc<Value>,
}

impl PluginContext {
    /// Creates a context for the plugin `name` found at `path`.
    ///
    /// `config` is the plugin's settings section, or an empty object.
    pub fn new(bus: EventBus, name: &str, path: impl Into<PathBuf>, config: Value) -> Self {
        Self {
            bus,
            name: Arc::from(name),
            path: Arc::from(path.into()),
            config: Arc::new(config),
        }
    }

    /// The plugin's name from its manifest.
    pub fn plugin_name(&self) -> &str {
        &self.name
    }

    /// The plugin's directory.
    pub fn plugin_path(&self) -> &Path {
        &self.path
    }

    /// Deserialises the plugin's settings section into `T`.
    ///
    /// Use `#[serde(default)]` on `T` to tolerate a missing section.
    pub fn get_config<T>(&self) -> serde_json::Result<T>
    where
        T: DeserializeOwned,
    {
        T::deserialize(self.config.as_ref())
    }

    // ─── Bus forwarders ──────────────────────────────────────────────────────

    /// See [`EventBus::request`].
    pub async fn request(&self, request: Request) -> RequestResult<Response> {
        self.bus.request(request).await
    }

    /// See [`EventBus::notify`].
    pub fn notify(&self, notification: Notification) -> usize {
        self.bus.notify(notification)
    }

    /// See [`EventBus::add_middleware`].
    pub fn add_middleware<F, Fut>(&self, middleware: F)
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Disposition> + Send + 'static,
    {
        self.bus.add_middleware(middleware);
    }

    /// See [`EventBus::listen_for_all_notifications`].
    pub fn listen_for_all_notifications<F>(&self, handler: F)
    where
        F: Fn(&Notification) + Send + Sync + 'static,
    {
        self.bus.listen_for_all_notifications(handler);
    }

    /// Starts registering request handlers on `channel`.
    pub fn listen_for_requests(&self, channel: impl Into<String>) -> RequestChannel<'_> {
        RequestChannel {
            bus: &self.bus,
            channel: channel.into(),
        }
    }

    /// Starts registering notification handlers on `channel`.
    pub fn listen_for_notifications(&self, channel: impl Into<String>) -> NotificationChannel<'_> {
        NotificationChannel {
            bus: &self.bus,
            channel: channel.into(),
        }
    }
}

/// Fluent request registration bound to one channel.
pub struct RequestChannel<'a> {
    bus: &'a EventBus,
    channel: String,
}

impl RequestChannel<'_> {
    /// Registers the handler for `method`; chainable.
    pub fn on<F, Fut>(self, method: impl Into<String>, handler: F) -> Self
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = RequestResult<Response>> + Send + 'static,
    {
        self.bus
            .listen_for_requests(self.channel.clone(), method, handler);
        self
    }
}

/// Fluent notification registration bound to one channel.
pub struct NotificationChannel<'a> {
    bus: &'a EventBus,
    channel: String,
}

impl NotificationChannel<'_> {
    /// Adds a subscriber for `method`; chainable.
    pub fn on<F>(self, method: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&Notification) + Send + Sync + 'static,
    {
        self.bus
            .listen_for_notifications(self.channel.clone(), method, handler);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    fn context(config: Value) -> (EventBus, PluginContext) {
        let bus = EventBus::new();
        let ctx = PluginContext::new(bus.clone(), "math", "plugins/math", config);
        (bus, ctx)
    }

    #[tokio::test]
    async fn test_builder_registers_on_shared_bus() {
        let (bus, ctx) = context(json!({}));

        ctx
            .listen_for_requests("math")
            .on("one", |_req: Request| async { Ok(json!(1)) })
            .on("two", |_req: Request| async { Ok(json!(2)) });
        ctx
            .listen_for_notifications("log")
            .on("info", |_n: &Notification| {})
            .on("info", |_n: &Notification| {});

        assert!(bus.has_request_handler("math", "one"));
        assert_eq!(bus.notification_handler_count("log", "info"), 2);
        assert_eq!(
            ctx.request(Request::new("math", "two")).await.unwrap(),
            json!(2)
        );
    }

    #[test]
    fn test_get_config() {
        #[derive(Deserialize, Default)]
        #[serde(default)]
        struct Settings {
            precision: u32,
        }

        let (_, ctx) = context(json!({ "precision": 3 }));
        assert_eq!(ctx.get_config::<Settings>().unwrap().precision, 3);

        let (_, ctx) = context(json!({}));
        assert_eq!(ctx.get_config::<Settings>().unwrap().precision, 0);
        assert_eq!(ctx.plugin_name(), "math");
        assert_eq!(ctx.plugin_path(), Path::new("plugins/math"));
    }
}
