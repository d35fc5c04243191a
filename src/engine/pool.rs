//! A fixed-size pool of ready [`EngineProcess`] instances of one kind.
//!
//! Callers `acquire()` an engine (suspending in FIFO order if none are free)
//! and `release()` it back. Matches the teacher's `llm::scheduler` shape of
//! "shared state behind a lock, waiters served through one-shot channels" —
//! specialized to FIFO since the pool carries no priority concept.

use std::collections::VecDeque;
use std::path::PathBuf;

use futures::future::join_all;
use serde::Serialize;
use tokio::sync::{oneshot, Mutex};
use tracing::{info, warn};

use super::process::{EngineError, EngineProcess};
use crate::types::EngineKind;

struct PoolInner {
    available: VecDeque<EngineProcess>,
    total: usize,
    busy: usize,
    waiters: VecDeque<oneshot::Sender<EngineProcess>>,
    shutdown: bool,
}

/// Point-in-time snapshot of pool occupancy (§4.2, §4.8).
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PoolStats {
    pub total: usize,
    pub available: usize,
    pub busy: usize,
    pub waiting: usize,
}

pub struct EnginePool {
    pub kind: EngineKind,
    inner: Mutex<PoolInner>,
}

impl EnginePool {
    /// Start `n` engines in parallel and wait for all of them to become
    /// ready. If any fails to start, the whole pool fails (§4.2).
    pub async fn init(kind: EngineKind, n: usize, binary: &PathBuf) -> Result<Self, EngineError> {
        let starts = (0..n).map(|id| EngineProcess::start(id as u32, kind, binary));
        let results = join_all(starts).await;

        let mut engines = Vec::with_capacity(n);
        let mut first_err = None;
        for result in results {
            match result {
                Ok(engine) => engines.push(engine),
                Err(e) => {
                    if first_err.is_none() {
                        first_err = Some(e);
                    }
                }
            }
        }

        if let Some(err) = first_err {
            warn!(%kind, "pool init failed, stopping partially-started engines");
            for engine in engines {
                engine.stop().await;
            }
            return Err(err);
        }

        info!(%kind, count = n, "engine pool ready");
        Ok(Self {
            kind,
            inner: Mutex::new(PoolInner {
                available: engines.into(),
                total: n,
                busy: 0,
                waiters: VecDeque::new(),
                shutdown: false,
            }),
        })
    }

    /// Suspend until an engine is available, then return it exclusively.
    pub async fn acquire(&self) -> Result<EngineProcess, EngineError> {
        let mut guard = self.inner.lock().await;
        if guard.shutdown {
            return Err(EngineError::PoolUnavailable);
        }
        if let Some(engine) = guard.available.pop_front() {
            guard.busy += 1;
            return Ok(engine);
        }
        let (tx, rx) = oneshot::channel();
        guard.waiters.push_back(tx);
        drop(guard);
        rx.await.map_err(|_| EngineError::PoolUnavailable)
    }

    /// Return an engine. If a waiter is queued, it is handed the engine
    /// directly (it never lingers in `available`); otherwise it's parked.
    ///
    /// `oneshot::Sender::send` hands the value back as `Err` when its
    /// receiver was already dropped (e.g. the waiting dispatcher iteration
    /// was cancelled) — that engine is tried against the next waiter instead
    /// of being discarded, so `|engines| = total` always holds (§4.2).
    pub async fn release(&self, engine: EngineProcess) {
        let mut guard = self.inner.lock().await;
        if guard.shutdown {
            drop(guard);
            engine.stop().await;
            return;
        }
        let mut engine = engine;
        while let Some(waiter) = guard.waiters.pop_front() {
            match waiter.send(engine) {
                Ok(()) => return,
                Err(returned) => engine = returned,
            }
        }
        guard.busy -= 1;
        guard.available.push_back(engine);
    }

    pub async fn stats(&self) -> PoolStats {
        let guard = self.inner.lock().await;
        PoolStats {
            total: guard.total,
            available: guard.available.len(),
            busy: guard.busy,
            waiting: guard.waiters.len(),
        }
    }

    /// Refuse all waiters, then stop every currently-available engine. Any
    /// engine still checked out is stopped as soon as it's `release()`d.
    pub async fn shutdown(&self) {
        let mut guard = self.inner.lock().await;
        guard.shutdown = true;
        let waiters = std::mem::take(&mut guard.waiters);
        let engines: Vec<_> = guard.available.drain(..).collect();
        drop(guard);
        drop(waiters); // dropping the senders fails pending `acquire()` awaits
        for engine in engines {
            engine.stop().await;
        }
    }
}
