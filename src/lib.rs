//! Malinger: a forwarding proxy that holds every response until a fixed
//! delay has passed since the request arrived.

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod relay;

pub use config::ServerConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use relay::Relay;
