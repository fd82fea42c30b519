//! Exchange state and in-flight tracking.
//!
//! # Responsibilities
//! - Generate a unique ID per exchange for log correlation
//! - Capture the request start instant the delay budget is measured from
//! - Count in-flight exchanges for shutdown draining
//! - Notice exchanges that were dropped before their response went out

use hyper::body::Bytes;
use hyper::{HeaderMap, Method, Request, StatusCode};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;

use crate::observability::metrics;

/// Unique identifier for an exchange. Only ever logged, never sent upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExchangeId(Uuid);

impl ExchangeId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ExchangeId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ExchangeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

/// Counts exchanges that have started but not yet finished.
#[derive(Debug, Clone, Default)]
pub struct ExchangeTracker {
    active: Arc<AtomicU64>,
}

impl ExchangeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new exchange. The returned guard decrements on drop.
    pub fn track(&self) -> ExchangeGuard {
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        metrics::set_in_flight(active);
        ExchangeGuard {
            active: Arc::clone(&self.active),
            id: ExchangeId::new(),
            outcome: None,
        }
    }

    pub fn active_count(&self) -> u64 {
        self.active.load(Ordering::SeqCst)
    }

    /// Wait until no exchange is in flight, or `grace` runs out.
    ///
    /// Returns the number still in flight when it gave up.
    pub async fn drain(&self, grace: Duration) -> u64 {
        let deadline = Instant::now() + grace;
        while self.active_count() > 0 && Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        self.active_count()
    }
}

/// Keeps an exchange counted for as long as it lives.
///
/// Dropping a guard that was never finished means the handling future was
/// cancelled, which hyper does when the client goes away.
#[derive(Debug)]
pub struct ExchangeGuard {
    active: Arc<AtomicU64>,
    id: ExchangeId,
    outcome: Option<&'static str>,
}

impl ExchangeGuard {
    pub fn id(&self) -> ExchangeId {
        self.id
    }

    fn finish(&mut self, outcome: &'static str) {
        self.outcome = Some(outcome);
    }
}

impl Drop for ExchangeGuard {
    fn drop(&mut self) {
        let active = self.active.fetch_sub(1, Ordering::SeqCst).saturating_sub(1);
        metrics::set_in_flight(active);

        let outcome = match self.outcome {
            Some(outcome) => outcome,
            None => {
                tracing::info!(
                    exchange_id = %self.id,
                    "Client went away before release; exchange aborted"
                );
                "client_aborted"
            }
        };
        metrics::record_exchange(outcome);
    }
}

/// One inbound request and everything learned about it so far.
///
/// Owned by the task serving the request; never shared.
#[derive(Debug)]
pub struct RelayExchange {
    pub method: Method,
    pub path: String,
    start: Instant,
    guard: ExchangeGuard,
}

impl RelayExchange {
    /// Start an exchange when the inbound request head has arrived.
    pub fn begin<B>(tracker: &ExchangeTracker, request: &Request<B>) -> Self {
        let path = request
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| "/".to_string());

        Self {
            method: request.method().clone(),
            path,
            start: Instant::now(),
            guard: tracker.track(),
        }
    }

    pub fn id(&self) -> ExchangeId {
        self.guard.id()
    }

    pub fn start(&self) -> Instant {
        self.start
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Mark the exchange as finished with `outcome`, releasing its slot.
    pub fn finish(mut self, outcome: &'static str) {
        self.guard.finish(outcome);
    }
}

/// A complete upstream response, held back until its release instant.
#[derive(Debug, Clone)]
pub struct HeldResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}
