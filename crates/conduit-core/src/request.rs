//! Single-owner request routing.
//!
//! The [`RequestRouter`] maps each `(channel, method)` slot to exactly one
//! handler. A request is a question with one right answerer, so registering a
//! second handler for an occupied slot replaces the first; the caller is told
//! about the replacement so it can raise the overwrite signal.

use std::collections::HashMap;

use parking_lot::RwLock;
use tracing::{Instrument, Level, debug, span};

use crate::error::{RequestError, RequestResult};
use crate::handler::RequestHandler;
use crate::message::{Request, Response};

/// Outcome of [`RequestRouter::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// The slot was empty.
    Added,
    /// The slot was occupied; the previous handler has been dropped.
    Replaced,
}

/// Table of request handlers keyed by channel, then method.
#[derive(Default)]
pub struct RequestRouter {
    handlers: RwLock<HashMap<String, HashMap<String, RequestHandler>>>,
}

impl RequestRouter {
    /// Creates an empty router.
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs `handler` at the `(channel, method)` slot.
    pub fn register(
        &self,
        channel: impl Into<String>,
        method: impl Into<String>,
        handler: RequestHandler,
    ) -> Registration {
        let channel = channel.into();
        let method = method.into();

        let previous = self
            .handlers
            .write()
            .entry(channel.clone())
            .or_default()
            .insert(method.clone(), handler);

        debug!(channel = %channel, method = %method, "Added request handler");

        if previous.is_some() {
            Registration::Replaced
        } else {
            Registration::Added
        }
    }

    /// Returns the handler occupying the slot.
    ///
    /// # Errors
    ///
    /// [`RequestError::NoSuchChannel`] if nothing was ever registered on the
    /// channel, [`RequestError::NoSuchMethod`] if the channel exists but the
    /// method does not.
    pub fn lookup(&self, channel: &str, method: &str) -> RequestResult<RequestHandler> {
        let handlers = self.handlers.read();
        let methods = handlers
            .get(channel)
            .ok_or_else(|| RequestError::NoSuchChannel {
                channel: channel.to_string(),
            })?;
        methods
            .get(method)
            .cloned()
            .ok_or_else(|| RequestError::NoSuchMethod {
                channel: channel.to_string(),
                method: method.to_string(),
            })
    }

    /// Returns `true` if a handler occupies the slot.
    pub fn contains(&self, channel: &str, method: &str) -> bool {
        self.lookup(channel, method).is_ok()
    }

    /// Routes `request` to its handler and returns the handler's outcome unchanged.
    pub async fn dispatch(&self, request: Request) -> RequestResult<Response> {
        let handler = self.lookup(&request.channel, &request.method)?;
        let span = span!(
            Level::DEBUG,
            "request",
            channel = %request.channel,
            method = %request.method
        );
        handler(request).instrument(span).await
    }
}

impl std::fmt::Debug for RequestRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let handlers = self.handlers.read();
        f.debug_struct("RequestRouter")
            .field("channels", &handlers.len())
            .field(
                "handlers",
                &handlers.values().map(HashMap::len).sum::<usize>(),
            )
            .finish()
    }
}
