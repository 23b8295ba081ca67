//! Provider-facing HTTP API.
//!
//! Routes live under `/api/v1/`, stored label images under `/uploads/`.
//! `build_router()` returns a plain `Router` so tests can drive it without a socket.

pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod router;
pub mod server;
pub mod types;

pub use router::build_router;
pub use server::{start_server, ServerHandle, ServerSession};
pub use types::ApiContext;
