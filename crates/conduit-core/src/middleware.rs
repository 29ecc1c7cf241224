//! The middleware pipeline that sits in front of every request.
//!
//! A middleware inspects a request and returns a [`Disposition`]:
//!
//! - [`Disposition::Pass`] continues the chain, optionally replacing the
//!   request seen by later middleware and by the handler.
//! - [`Disposition::Resolve`] answers the request on the spot.
//! - [`Disposition::Reject`] fails the request with the given payload.
//!
//! Middleware run one after another in registration order and apply to every
//! channel, including channels whose handlers are registered later.

use parking_lot::RwLock;
use serde_json::Value;
use tracing::{debug, trace};

use crate::handler::Middleware;
use crate::message::{Request, Response};

/// The outcome of one middleware invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum Disposition {
    /// Continue with the replacement request, or the unchanged one on `None`.
    Pass(Option<Request>),
    /// Short-circuit with a successful response.
    Resolve(Response),
    /// Short-circuit with an error payload.
    Reject(Value),
}

impl Disposition {
    /// Continue with the request unchanged.
    pub fn pass() -> Self {
        Self::Pass(None)
    }

    /// Continue with `request` in place of the current one.
    pub fn rewrite(request: Request) -> Self {
        Self::Pass(Some(request))
    }

    /// Answer the request with `response`.
    pub fn resolve(response: impl Into<Response>) -> Self {
        Self::Resolve(response.into())
    }

    /// Fail the request with `payload`.
    pub fn reject(payload: impl Into<Value>) -> Self {
        Self::Reject(payload.into())
    }
}

/// The outcome of running a request through the whole chain.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// No middleware short-circuited; forward this request to its handler.
    Forward(Request),
    /// A middleware answered the request.
    Resolve(Response),
    /// A middleware rejected the request.
    Reject(Value),
}

/// Ordered, append-only list of middleware.
///
/// The list is read live at every step of [`handle`](Self::handle), so a
/// middleware added while traffic is flowing takes part in the next step of
/// any in-flight chain that has not yet reached the end.
#[derive(Default)]
pub struct MiddlewareChain {
    middleware: RwLock<Vec<Middleware>>,
}

impl MiddlewareChain {
    /// Creates an empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a middleware. Registration order is execution order.
    pub fn push(&self, middleware: Middleware) {
        let mut list = self.middleware.write();
        list.push(middleware);
        debug!(position = list.len() - 1, "Added middleware");
    }

    /// Returns the number of registered middleware.
    pub fn len(&self) -> usize {
        self.middleware.read().len()
    }

    /// Returns `true` if no middleware is registered.
    pub fn is_empty(&self) -> bool {
        self.middleware.read().is_empty()
    }

    /// Runs `request` through every middleware in order.
    ///
    /// Each middleware is awaited to completion before the next one starts.
    pub async fn handle(&self, mut request: Request) -> Verdict {
        let mut index = 0;
        loop {
            let Some(middleware) = self.middleware.read().get(index).cloned() else {
                break;
            };

            match middleware(request.clone()).await {
                Disposition::Pass(Some(rewritten)) => {
                    trace!(position = index, "Middleware rewrote request");
                    request = rewritten;
                }
                Disposition::Pass(None) => {}
                Disposition::Resolve(response) => {
                    debug!(
                        position = index,
                        channel = %request.channel,
                        method = %request.method,
                        "Middleware resolved request"
                    );
                    return Verdict::Resolve(response);
                }
                Disposition::Reject(payload) => {
                    debug!(
                        position = index,
                        channel = %request.channel,
                        method = %request.method,
                        "Middleware rejected request"
                    );
                    return Verdict::Reject(payload);
                }
            }
            index += 1;
        }

        Verdict::Forward(request)
    }
}

impl std::fmt::Debug for MiddlewareChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MiddlewareChain")
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::into_middleware;
    use serde_json::json;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn request() -> Request {
        Request::new("channel", "method").with("message", "this is a request")
    }

    #[tokio::test]
    async fn test_empty_chain_forwards_unchanged() {
        let chain = MiddlewareChain::new();
        assert_eq!(chain.handle(request()).await, Verdict::Forward(request()));
    }

    #[tokio::test]
    async fn test_rewrite_is_seen_by_later_middleware() {
        let chain = MiddlewareChain::new();
        chain.push(into_middleware(|req: Request| async move {
            Disposition::rewrite(req.with("stamp", 1))
        }));
        chain.push(into_middleware(|req: Request| async move {
            assert_eq!(req.get("stamp"), Some(&json!(1)));
            Disposition::pass()
        }));

        let Verdict::Forward(forwarded) = chain.handle(request()).await else {
            panic!("expected forward");
        };
        assert_eq!(forwarded.get("stamp"), Some(&json!(1)));
    }

    #[tokio::test]
    async fn test_short_circuit_skips_remaining_middleware() {
        let calls = Arc::new(AtomicUsize::new(0));
        let chain = MiddlewareChain::new();
        chain.push(into_middleware(|_req: Request| async {
            Disposition::reject(json!({"message": "denied"}))
        }));
        let counter = Arc::clone(&calls);
        chain.push(into_middleware(move |_req: Request| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Disposition::pass()
            }
        }));

        assert_eq!(
            chain.handle(request()).await,
            Verdict::Reject(json!({"message": "denied"}))
        );
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_runs_in_registration_order() {
        let order = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let chain = MiddlewareChain::new();
        for id in 0..3 {
            let order = Arc::clone(&order);
            chain.push(into_middleware(move |_req: Request| {
                let order = Arc::clone(&order);
                async move {
                    tokio::task::yield_now().await;
                    order.lock().push(id);
                    Disposition::pass()
                }
            }));
        }

        chain.handle(request()).await;
        assert_eq!(*order.lock(), vec![0, 1, 2]);
        assert_eq!(chain.len(), 3);
    }
}
