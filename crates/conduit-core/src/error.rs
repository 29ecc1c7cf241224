//! Error types for the event bus.

use serde_json::Value;
use thiserror::Error;

/// The failure outcome of [`EventBus::request`](crate::EventBus::request).
///
/// Routing failures are raised by the bus itself. Everything else arrives as
/// [`RequestError::Rejected`] carrying the payload supplied by whoever
/// rejected the request: a middleware short-circuit and a handler failure
/// look the same to the caller.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RequestError {
    /// No request handler was ever registered on the channel.
    #[error("no such channel {channel}")]
    NoSuchChannel {
        /// The requested channel.
        channel: String,
    },

    /// The channel exists but has no handler for the method.
    #[error("no such method {method} in channel {channel}")]
    NoSuchMethod {
        /// The requested channel.
        channel: String,
        /// The requested method.
        method: String,
    },

    /// A middleware or the handler rejected the request.
    #[error("request rejected: {0}")]
    Rejected(Value),
}

impl RequestError {
    /// Creates a rejection carrying `payload`.
    pub fn rejected(payload: impl Into<Value>) -> Self {
        Self::Rejected(payload.into())
    }

    /// Returns `true` for `NoSuchChannel` and `NoSuchMethod`.
    pub fn is_routing_error(&self) -> bool {
        matches!(self, Self::NoSuchChannel { .. } | Self::NoSuchMethod { .. })
    }

    /// Returns the rejection payload, if this is a rejection.
    pub fn payload(&self) -> Option<&Value> {
        match self {
            Self::Rejected(payload) => Some(payload),
            _ => None,
        }
    }
}

/// Result type for request handlers and [`EventBus::request`](crate::EventBus::request).
pub type RequestResult<T> = Result<T, RequestError>;
