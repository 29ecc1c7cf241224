//! The routing envelope carried over the bus.
//!
//! Every message has a fixed `(channel, method)` routing key and an open,
//! schema-less JSON payload. Handlers define their own per-method payload
//! shape and deserialise it with [`Message::payload_as`].
//!
//! ```rust,ignore
//! let req = Message::new("math", "add").with("a", 2).with("b", 3);
//! assert_eq!(req.get("a"), Some(&json!(2)));
//! ```

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Channel reserved for bus-internal signaling.
pub const CORE_CHANNEL: &str = "core";

/// Raised on `core` when a request handler replaces an existing one.
pub const HANDLER_OVERWRITE: &str = "handler-overwrite";

/// Raised on `core` when a plugin candidate is rejected during loading.
pub const PLUGIN_LOAD_ERROR: &str = "plugin-load-error";

/// Raised on `core` when a notification reaches no subscriber.
pub const UNDEFINED_NOTIFICATION_HANDLER: &str = "undefined-notification-handler";

/// A message on the bus: routing key plus caller-defined payload.
///
/// Serialises as a flat JSON object, `{"channel": .., "method": .., ..payload}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Coarse routing namespace, usually one per plugin.
    pub channel: String,
    /// Operation name within the channel.
    pub method: String,
    /// Every other field of the message.
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

/// A message that expects exactly one answer.
pub type Request = Message;

/// A message that expects no answer.
pub type Notification = Message;

/// The answer to a [`Request`].
pub type Response = Value;

impl Message {
    /// Creates a message with an empty payload.
    pub fn new(channel: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            method: method.into(),
            payload: Map::new(),
        }
    }

    /// Creates a message on the reserved `core` channel.
    pub fn core(method: impl Into<String>) -> Self {
        Self::new(CORE_CHANNEL, method)
    }

    /// Adds a payload field (builder pattern).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.payload.insert(key.into(), value.into());
        self
    }

    /// Sets a payload field in place, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.payload.insert(key.into(), value.into())
    }

    /// Returns a payload field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }

    /// Returns the `(channel, method)` routing key.
    pub fn routing_key(&self) -> (&str, &str) {
        (&self.channel, &self.method)
    }

    /// Returns `true` for messages on the reserved `core` channel.
    pub fn is_core(&self) -> bool {
        self.channel == CORE_CHANNEL
    }

    /// Deserialises the payload (without `channel`/`method`) into `T`.
    pub fn payload_as<T>(&self) -> serde_json::Result<T>
    where
        T: DeserializeOwned,
    {
        T::deserialize(Value::Object(self.payload.clone()))
    }

    /// Converts the whole message into a flat JSON object.
    pub fn to_value(&self) -> Value {
        let mut object = self.payload.clone();
        object.insert("channel".into(), Value::String(self.channel.clone()));
        object.insert("method".into(), Value::String(self.method.clone()));
        Value::Object(object)
    }

    /// Parses a flat JSON object into a message.
    pub fn from_value(value: Value) -> serde_json::Result<Self> {
        serde_json::from_value(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flat_serialization() {
        let msg = Message::new("math", "add").with("a", 2).with("b", 3);
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            value,
            json!({"channel": "math", "method": "add", "a": 2, "b": 3})
        );
        assert_eq!(msg.to_value(), value);
    }

    #[test]
    fn test_from_value_keeps_extra_fields_in_payload() {
        let msg = Message::from_value(json!({
            "channel": "log",
            "method": "info",
            "text": "hi",
        }))
        .unwrap();

        assert_eq!(msg.routing_key(), ("log", "info"));
        assert_eq!(msg.get("text"), Some(&json!("hi")));
        assert!(!msg.payload.contains_key("channel"));
    }

    #[test]
    fn test_from_value_requires_routing_key() {
        assert!(Message::from_value(json!({"channel": "log"})).is_err());
    }

    #[test]
    fn test_payload_as() {
        #[derive(Deserialize)]
        struct Add {
            a: i64,
            b: i64,
        }

        let msg = Message::new("math", "add").with("a", 2).with("b", 3);
        let add: Add = msg.payload_as().unwrap();
        assert_eq!(add.a + add.b, 5);
    }

    #[test]
    fn test_core_message() {
        let msg = Message::core(HANDLER_OVERWRITE);
        assert!(msg.is_core());
        assert_eq!(msg.method, "handler-overwrite");
    }
}
