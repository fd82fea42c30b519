//! Responses written back to the client.
//!
//! # Responsibilities
//! - Turn a held upstream response into a client response, untouched
//! - Map relay failures to a short plain-text error with the right status
//!
//! # Design Decisions
//! - Held responses keep the upstream status, headers and body as-is;
//!   nothing is added, stripped or rewritten
//! - Error bodies are plain text so they are easy to spot in client logs

use axum::body::Body;
use axum::response::{IntoResponse, Response};

use crate::error::RelayError;
use crate::relay::HeldResponse;

/// Build the client response for a released exchange.
pub fn release(held: HeldResponse) -> Response {
    let mut response = Response::new(Body::from(held.body));
    *response.status_mut() = held.status;
    *response.headers_mut() = held.headers;
    response
}

/// Build the immediate error response for a failed exchange.
pub fn relay_error(err: &RelayError) -> Response {
    (err.status_code(), format!("Proxy Error: {}", err)).into_response()
}
