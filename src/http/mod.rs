//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, protocol detection)
//!     → relay (forward, buffer, hold)
//!     → response.rs (held response or immediate error)
//!     → Send to client
//! ```

pub mod response;
pub mod server;

pub use server::HttpServer;
