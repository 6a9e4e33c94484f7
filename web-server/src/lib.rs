//! HTTP surface of the insurance advisory backend.
//!
//! Exposed as a library so integration tests can build the router against a
//! test database; the binary in `main.rs` is a thin wrapper.

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use router::build_router;
pub use state::AppState;
