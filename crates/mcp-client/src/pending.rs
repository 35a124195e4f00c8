//! Pending-request table: correlates asynchronously arriving responses to
//! the callers awaiting them.
//!
//! One table is owned by exactly one stdio transport instance. Each entry
//! is removed exactly once — by a matching response, by the caller's
//! timeout, or by [`PendingRequests::abort_all`] when the transport dies —
//! so every registered id sees exactly one outcome.

use std::collections::HashMap;

use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::protocol::JsonRpcResponse;

#[derive(Debug, Default)]
struct State {
    entries: HashMap<u64, oneshot::Sender<JsonRpcResponse>>,
    /// Set once the transport is gone; later registrations fail at once
    /// instead of waiting on a table nobody will ever complete.
    closed: bool,
}

/// Table of in-flight request ids awaiting a response.
#[derive(Debug, Default)]
pub struct PendingRequests {
    inner: Mutex<State>,
}

impl PendingRequests {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an entry for `id` and return the handle the caller awaits.
    ///
    /// If the table was already closed by [`abort_all`], the returned
    /// receiver fails immediately. The per-request timeout is composed at
    /// the await site with `tokio::time::timeout`; on elapse the caller
    /// must [`forget`] the id so a late response is dropped.
    ///
    /// [`abort_all`]: PendingRequests::abort_all
    /// [`forget`]: PendingRequests::forget
    pub fn register(&self, id: u64) -> oneshot::Receiver<JsonRpcResponse> {
        let (tx, rx) = oneshot::channel();
        let mut state = self.inner.lock();
        if !state.closed {
            state.entries.insert(id, tx);
        }
        rx
    }

    /// Deliver a response to the caller registered for its id.
    ///
    /// Unknown, late, or duplicate ids are silently dropped; no entry is
    /// created retroactively. Returns whether a caller was resolved.
    pub fn complete(&self, id: u64, response: JsonRpcResponse) -> bool {
        let Some(tx) = self.inner.lock().entries.remove(&id) else {
            tracing::debug!(id, "dropping response with no pending request");
            return false;
        };
        // Send only fails if the caller already stopped waiting; the entry
        // is gone either way.
        let _ = tx.send(response);
        true
    }

    /// Remove an entry without resolving it (timeout or failed write).
    pub fn forget(&self, id: u64) {
        self.inner.lock().entries.remove(&id);
    }

    /// Close the table and drop every entry, waking each awaiting caller
    /// with a closed-channel error. Called when the transport ends while
    /// requests are in flight.
    pub fn abort_all(&self) {
        let drained: Vec<_> = {
            let mut state = self.inner.lock();
            state.closed = true;
            state.entries.drain().collect()
        };
        if !drained.is_empty() {
            tracing::debug!(count = drained.len(), "aborting pending requests");
        }
    }

    /// Number of requests currently awaiting a response.
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().entries.is_empty()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn response(id: u64, result: &str) -> JsonRpcResponse {
        JsonRpcResponse {
            id,
            result: Some(serde_json::json!(result)),
            error: None,
        }
    }

    #[tokio::test]
    async fn out_of_order_responses_reach_their_own_callers() {
        let pending = PendingRequests::new();
        let rx1 = pending.register(1);
        let rx2 = pending.register(2);
        let rx3 = pending.register(3);

        assert!(pending.complete(3, response(3, "third")));
        assert!(pending.complete(1, response(1, "first")));
        assert!(pending.complete(2, response(2, "second")));

        assert_eq!(rx1.await.unwrap().result.unwrap(), "first");
        assert_eq!(rx2.await.unwrap().result.unwrap(), "second");
        assert_eq!(rx3.await.unwrap().result.unwrap(), "third");
        assert!(pending.is_empty());
    }

    #[tokio::test]
    async fn unknown_id_is_dropped_without_creating_an_entry() {
        let pending = PendingRequests::new();
        assert!(!pending.complete(99, response(99, "nobody asked")));
        assert!(pending.is_empty());
    }

    #[tokio::test]
    async fn duplicate_response_is_dropped() {
        let pending = PendingRequests::new();
        let rx = pending.register(5);
        assert!(pending.complete(5, response(5, "first wins")));
        assert!(!pending.complete(5, response(5, "too late")));
        assert_eq!(rx.await.unwrap().result.unwrap(), "first wins");
    }

    #[tokio::test]
    async fn forgotten_id_drops_a_late_response() {
        let pending = PendingRequests::new();
        let rx = pending.register(8);
        pending.forget(8);
        assert!(!pending.complete(8, response(8, "late")));
        assert!(rx.await.is_err());
    }

    #[tokio::test]
    async fn abort_all_wakes_every_waiter() {
        let pending = PendingRequests::new();
        let rx1 = pending.register(1);
        let rx2 = pending.register(2);
        pending.abort_all();
        assert!(rx1.await.is_err());
        assert!(rx2.await.is_err());
        assert!(pending.is_empty());
    }

    #[tokio::test]
    async fn register_after_abort_fails_immediately() {
        let pending = PendingRequests::new();
        pending.abort_all();
        let rx = pending.register(1);
        assert!(rx.await.is_err());
        assert!(!pending.complete(1, response(1, "ignored")));
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_on_one_request_leaves_the_other_pending() {
        let pending = std::sync::Arc::new(PendingRequests::new());
        let rx1 = pending.register(1);
        let rx2 = pending.register(2);

        // Request 1 times out after 100ms; request 2 is answered at 200ms.
        let p = std::sync::Arc::clone(&pending);
        let slow = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            p.complete(2, response(2, "still fine"))
        });

        let timed_out = tokio::time::timeout(Duration::from_millis(100), rx1).await;
        assert!(timed_out.is_err());
        pending.forget(1);
        assert_eq!(pending.len(), 1);

        assert!(slow.await.unwrap());
        assert_eq!(rx2.await.unwrap().result.unwrap(), "still fine");
    }

    #[tokio::test(start_paused = true)]
    async fn response_after_timeout_is_dropped() {
        let pending = PendingRequests::new();
        let rx = pending.register(4);

        let timed_out = tokio::time::timeout(Duration::from_millis(50), rx).await;
        assert!(timed_out.is_err());
        pending.forget(4);

        assert!(!pending.complete(4, response(4, "arrived too late")));
    }
}
