//! Integration coverage of Request Queue fairness and supersede semantics
//! across more than two users, exercised through the public API only.

use engine_gateway::engine::EngineError;
use engine_gateway::queue::{ProcessFn, Request, RequestQueue};
use tokio::sync::oneshot;

fn noop_request(request_id: &str, user_id: &str) -> (Request<()>, oneshot::Receiver<Result<(), EngineError>>) {
    let (tx, rx) = oneshot::channel();
    let process: ProcessFn<()> = Box::new(|engine| Box::pin(async move { (engine, Ok(())) }));
    (Request::new(request_id, user_id, process, tx), rx)
}

#[tokio::test]
async fn round_robin_across_three_users_ignores_arrival_order_once_processing() {
    let queue: RequestQueue<()> = RequestQueue::new();

    let (a1, _ra1) = noop_request("a1", "alice");
    let (b1, _rb1) = noop_request("b1", "bob");
    let (c1, _rc1) = noop_request("c1", "carol");
    queue.enqueue(a1).await;
    queue.enqueue(b1).await;
    queue.enqueue(c1).await;

    let first = queue.dequeue().await.expect("alice's request");
    assert_eq!(first.user_id, "alice");

    // alice is now "processing"; a fresh alice request must not jump ahead
    // of bob or carol, who are still pending.
    let (a2, _ra2) = noop_request("a2", "alice");
    queue.enqueue(a2).await;

    let second = queue.dequeue().await.expect("bob's request");
    assert_eq!(second.user_id, "bob");

    let third = queue.dequeue().await.expect("carol's request");
    assert_eq!(third.user_id, "carol");

    // Only once alice's first request completes does her pending one surface.
    queue.mark_done("alice").await;
    let fourth = queue.dequeue().await.expect("alice's second request");
    assert_eq!(fourth.user_id, "alice");
    assert_eq!(fourth.request_id, "a2");
}

#[tokio::test]
async fn disconnect_cancels_pending_but_not_in_flight_requests() {
    let queue: RequestQueue<()> = RequestQueue::new();

    let (r1, _rx1) = noop_request("r1", "dana");
    queue.enqueue(r1).await;
    let in_flight = queue.dequeue().await.expect("dana's request dequeued");

    let (r2, _rx2) = noop_request("r2", "dana");
    queue.enqueue(r2).await;
    assert_eq!(queue.stats().await.pending, 1);

    queue.cancel_for_user("dana").await;
    assert_eq!(queue.stats().await.pending, 0);
    assert_eq!(queue.stats().await.processing, 1);

    queue.mark_done(&in_flight.user_id).await;
    assert_eq!(queue.stats().await.processing, 0);
}

#[tokio::test]
async fn stats_reflect_mixed_pending_and_processing_users() {
    let queue: RequestQueue<()> = RequestQueue::new();
    let (r1, _rx1) = noop_request("r1", "u1");
    let (r2, _rx2) = noop_request("r2", "u2");
    queue.enqueue(r1).await;
    queue.enqueue(r2).await;

    let _dequeued = queue.dequeue().await.expect("one of the two");
    let stats = queue.stats().await;
    assert_eq!(stats.pending, 1);
    assert_eq!(stats.processing, 1);
}
