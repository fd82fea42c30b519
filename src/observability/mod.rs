//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! relay, listener, lifecycle produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout (human text or JSON lines)
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Every log line about an exchange carries its exchange ID
//! - Metric updates are no-ops until a recorder is installed

pub mod logging;
pub mod metrics;
