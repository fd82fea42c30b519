//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! ServerConfig
//!     → tls.rs (optional: read PEM files, build rustls config)
//!     → listener.rs (bind socket)
//!     → Hand off to HTTP layer
//! ```
//!
//! # Design Decisions
//! - TLS problems are startup-fatal and reported before binding
//! - TLS is optional and handled transparently by the server

pub mod listener;
pub mod tls;

pub use listener::Listener;
