//! Per-kind request queue: FIFO with per-user supersede and fair dispatch.

use std::collections::{HashMap, HashSet, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{oneshot, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::engine::{EnginePool, EngineError, EngineProcess};
use crate::types::RequestState;

/// Dispatcher poll interval when the queue is empty (§4.7 step 1).
const EMPTY_POLL_INTERVAL: Duration = Duration::from_millis(50);

pub type ProcessFuture<T> = Pin<Box<dyn Future<Output = (EngineProcess, Result<T, EngineError>)> + Send>>;
pub type ProcessFn<T> = Box<dyn FnOnce(EngineProcess) -> ProcessFuture<T> + Send>;

/// A work item. `process` runs with an acquired engine and hands it back;
/// the result is delivered to `responder` — a fire-and-forget one-shot
/// channel, per the §9 redesign flag replacing "fire-and-forget promise
/// callbacks". A request whose `responder` never fires (dropped on
/// supersede/cancel) is, by construction, silently dropped: the receiving
/// end just observes a closed channel and sends nothing to the client.
pub struct Request<T> {
    pub request_id: String,
    pub user_id: String,
    generation: u64,
    process: ProcessFn<T>,
    responder: oneshot::Sender<Result<T, EngineError>>,
}

impl<T> Request<T> {
    pub fn new(
        request_id: impl Into<String>,
        user_id: impl Into<String>,
        process: ProcessFn<T>,
        responder: oneshot::Sender<Result<T, EngineError>>,
    ) -> Self {
        Self {
            request_id: request_id.into(),
            user_id: user_id.into(),
            generation: 0,
            process,
            responder,
        }
    }
}

struct QueueInner<T> {
    pending: VecDeque<Request<T>>,
    processing: HashSet<String>,
    generations: HashMap<String, u64>,
}

impl<T> Default for QueueInner<T> {
    fn default() -> Self {
        Self {
            pending: VecDeque::new(),
            processing: HashSet::new(),
            generations: HashMap::new(),
        }
    }
}

/// Read-only snapshot of queue occupancy (§4.8).
#[derive(Debug, Clone, Copy, Serialize)]
pub struct QueueStats {
    pub pending: usize,
    pub processing: usize,
}

pub struct RequestQueue<T> {
    inner: Mutex<QueueInner<T>>,
}

impl<T> Default for RequestQueue<T> {
    fn default() -> Self {
        Self {
            inner: Mutex::new(QueueInner::default()),
        }
    }
}

impl<T> RequestQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop any existing `Pending` request from the same user (supersede),
    /// then append the new one (§4.3).
    pub async fn enqueue(&self, mut req: Request<T>) {
        let mut guard = self.inner.lock().await;

        if let Some(pos) = guard.pending.iter().position(|p| p.user_id == req.user_id) {
            let superseded = guard.pending.remove(pos);
            debug!(
                request_id = superseded.map(|r| r.request_id).unwrap_or_default(),
                state = ?RequestState::Superseded,
                "request superseded"
            );
        }

        let generation = guard.generations.entry(req.user_id.clone()).or_insert(0);
        *generation += 1;
        req.generation = *generation;

        trace!(request_id = %req.request_id, state = ?RequestState::Pending, "request enqueued");
        guard.pending.push_back(req);
    }

    /// Pick the first pending request whose user isn't already `Processing`;
    /// fall back to the oldest pending request (§4.3 fairness rule).
    pub async fn dequeue(&self) -> Option<Request<T>> {
        let mut guard = self.inner.lock().await;

        let idx = guard
            .pending
            .iter()
            .position(|r| !guard.processing.contains(&r.user_id))
            .or(if guard.pending.is_empty() { None } else { Some(0) })?;

        let req = guard.pending.remove(idx)?;
        guard.processing.insert(req.user_id.clone());
        trace!(request_id = %req.request_id, state = ?RequestState::Processing, "request dequeued");
        Some(req)
    }

    /// Still valid iff no newer request from the same user has been
    /// enqueued since this one was dequeued (§4.3).
    pub async fn is_valid(&self, user_id: &str, generation: u64) -> bool {
        let guard = self.inner.lock().await;
        guard.generations.get(user_id).copied() == Some(generation)
    }

    pub async fn mark_done(&self, user_id: &str) {
        let mut guard = self.inner.lock().await;
        guard.processing.remove(user_id);
        trace!(user_id, state = ?RequestState::Done, "request marked done");
    }

    /// Remove all pending requests for a disconnected user. Any already
    /// `Processing` request is left to finish (§4.3 cancel-on-disconnect).
    pub async fn cancel_for_user(&self, user_id: &str) {
        let mut guard = self.inner.lock().await;
        let before = guard.pending.len();
        guard.pending.retain(|r| r.user_id != user_id);
        if guard.pending.len() != before {
            trace!(user_id, state = ?RequestState::Cancelled, "pending requests cancelled");
        }
    }

    pub async fn stats(&self) -> QueueStats {
        let guard = self.inner.lock().await;
        QueueStats {
            pending: guard.pending.len(),
            processing: guard.processing.len(),
        }
    }
}

/// One background loop per Request Queue (§4.7).
pub async fn run_dispatcher<T: Send + 'static>(
    queue: Arc<RequestQueue<T>>,
    pool: Arc<EnginePool>,
    cancel: CancellationToken,
) {
    loop {
        if cancel.is_cancelled() {
            return;
        }

        let Some(req) = queue.dequeue().await else {
            tokio::select! {
                () = tokio::time::sleep(EMPTY_POLL_INTERVAL) => {}
                () = cancel.cancelled() => return,
            }
            continue;
        };

        let Request {
            request_id,
            user_id,
            generation,
            process,
            responder,
        } = req;

        if !queue.is_valid(&user_id, generation).await {
            queue.mark_done(&user_id).await;
            continue;
        }

        let engine = match pool.acquire().await {
            Ok(engine) => engine,
            Err(e) => {
                queue.mark_done(&user_id).await;
                let _ = responder.send(Err(e));
                continue;
            }
        };

        if !queue.is_valid(&user_id, generation).await {
            pool.release(engine).await;
            queue.mark_done(&user_id).await;
            continue;
        }

        let (engine, result) = process(engine).await;
        if let Err(ref e) = result {
            warn!(request_id, user_id, error = %e, "request failed");
        }

        // Engine is released before the callback fires, regardless of
        // outcome (§4.7 closing note).
        pool.release(engine).await;

        let still_valid = queue.is_valid(&user_id, generation).await;
        queue.mark_done(&user_id).await;

        if still_valid {
            let _ = responder.send(result);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop_request(
        request_id: &str,
        user_id: &str,
    ) -> (Request<()>, oneshot::Receiver<Result<(), EngineError>>) {
        let (tx, rx) = oneshot::channel();
        let process: ProcessFn<()> = Box::new(|engine| Box::pin(async move { (engine, Ok(())) }));
        (Request::new(request_id, user_id, process, tx), rx)
    }

    /// Testable property 1 / scenario S1: only the latest pending request
    /// from a user survives.
    #[tokio::test]
    async fn supersede_keeps_only_latest_pending() {
        let queue: RequestQueue<()> = RequestQueue::new();
        let (r1, _rx1) = noop_request("r1", "u1");
        let (r2, _rx2) = noop_request("r2", "u1");
        let (r3, rx3) = noop_request("r3", "u1");

        queue.enqueue(r1).await;
        queue.enqueue(r2).await;
        queue.enqueue(r3).await;

        assert_eq!(queue.stats().await.pending, 1);

        let dequeued = queue.dequeue().await.expect("one request");
        assert_eq!(dequeued.request_id, "r3");
        drop(rx3);
    }

    /// Testable property 2 / scenario S2: a user with a request already
    /// `Processing` does not block a different user's pending request.
    #[tokio::test]
    async fn fairness_skips_processing_user() {
        let queue: RequestQueue<()> = RequestQueue::new();
        let (ra, _rxa) = noop_request("a1", "A");
        queue.enqueue(ra).await;
        let picked_a = queue.dequeue().await.expect("A dequeued");
        assert_eq!(picked_a.user_id, "A");
        // A is now "Processing" (tracked internally by the queue).

        let (rb, _rxb) = noop_request("b1", "B");
        queue.enqueue(rb).await;
        let (ra2, _rxa2) = noop_request("a2", "A");
        queue.enqueue(ra2).await;

        let next = queue.dequeue().await.expect("B dequeued next");
        assert_eq!(next.user_id, "B");
    }

    #[tokio::test]
    async fn cancel_for_user_drops_only_pending() {
        let queue: RequestQueue<()> = RequestQueue::new();
        let (ra, _rxa) = noop_request("a1", "A");
        queue.enqueue(ra).await;
        let _processing = queue.dequeue().await.expect("A dequeued");

        let (ra2, _rxa2) = noop_request("a2", "A");
        queue.enqueue(ra2).await;
        assert_eq!(queue.stats().await.pending, 1);

        queue.cancel_for_user("A").await;
        assert_eq!(queue.stats().await.pending, 0);
        // The already-"Processing" a1 is unaffected by cancellation.
        assert_eq!(queue.stats().await.processing, 1);
    }

    #[tokio::test]
    async fn revalidation_detects_superseding_enqueue() {
        let queue: RequestQueue<()> = RequestQueue::new();
        let (ra, _rxa) = noop_request("a1", "A");
        queue.enqueue(ra).await;
        let dequeued = queue.dequeue().await.expect("dequeued");
        assert!(queue.is_valid(&dequeued.user_id, dequeued.generation).await);

        let (ra2, _rxa2) = noop_request("a2", "A");
        queue.enqueue(ra2).await;
        assert!(!queue.is_valid(&dequeued.user_id, dequeued.generation).await);
    }
}
