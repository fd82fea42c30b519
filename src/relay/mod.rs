//! Request relay: forward, buffer, hold, release.
//!
//! # Data Flow
//! ```text
//! inbound request head
//!     → exchange.rs (start instant, exchange ID, in-flight guard)
//!     → upstream.rs (same method/path/headers, body streamed through)
//!     → upstream.rs collect (status + headers + whole body held in memory)
//!     → delay.rs (wait until start + delay, or not at all if already past)
//!     → response released to the client in one piece
//! ```
//!
//! # Design Decisions
//! - Nothing from the upstream response reaches the client before release
//! - Upstream failures are answered at once; a refused connection is not latency
//! - The hold is part of the handler future: a client disconnect drops the
//!   future, cancelling the timer and the outbound request together
//! - No retries

pub mod delay;
pub mod exchange;
pub mod upstream;

use axum::body::Body;
use axum::response::Response;
use hyper::Request;

use crate::config::ServerConfig;
use crate::error::{RelayError, StartupError};
use crate::http::response;
use crate::observability::metrics;

pub use delay::DelayBudget;
pub use exchange::{ExchangeId, ExchangeTracker, HeldResponse, RelayExchange};
pub use upstream::{Upstream, UpstreamTarget};

/// Per-process relay shared by every connection.
pub struct Relay {
    upstream: Upstream,
    budget: DelayBudget,
    tracker: ExchangeTracker,
}

impl Relay {
    pub fn new(config: &ServerConfig, tracker: ExchangeTracker) -> Result<Self, StartupError> {
        Ok(Self {
            upstream: Upstream::from_config(config)?,
            budget: DelayBudget::new(config.delay()),
            tracker,
        })
    }

    pub fn tracker(&self) -> &ExchangeTracker {
        &self.tracker
    }

    /// Serve one inbound request.
    pub async fn handle(&self, request: Request<Body>) -> Response {
        let exchange = RelayExchange::begin(&self.tracker, &request);
        tracing::info!(
            exchange_id = %exchange.id(),
            method = %exchange.method,
            "-> {}{}",
            self.upstream.target(),
            exchange.path
        );

        let held = match self.forward(&exchange, request).await {
            Ok(held) => held,
            Err(err) => {
                tracing::warn!(
                    exchange_id = %exchange.id(),
                    error = %err,
                    elapsed_ms = exchange.elapsed().as_millis() as u64,
                    "Upstream exchange failed; answering without delay"
                );
                let reply = response::relay_error(&err);
                exchange.finish(err.outcome());
                return reply;
            }
        };

        let upstream_latency = exchange.elapsed();
        metrics::record_upstream_latency(upstream_latency);

        let held_for = self.budget.hold_until_release(exchange.start()).await;
        metrics::record_hold(held_for);

        tracing::info!(
            exchange_id = %exchange.id(),
            status = held.status.as_u16(),
            bytes = held.body.len(),
            upstream_ms = upstream_latency.as_millis() as u64,
            held_ms = held_for.as_millis() as u64,
            "done"
        );
        exchange.finish("released");
        response::release(held)
    }

    async fn forward(
        &self,
        exchange: &RelayExchange,
        request: Request<Body>,
    ) -> Result<HeldResponse, RelayError> {
        let (parts, body) = request.into_parts();
        let upstream_response = self.upstream.send(parts, body, &exchange.path).await?;

        tracing::debug!(
            exchange_id = %exchange.id(),
            status = upstream_response.status().as_u16(),
            "Upstream head received; buffering body"
        );

        upstream::collect(upstream_response).await
    }
}
