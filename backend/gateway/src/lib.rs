//! HTTP gateway.
//!
//! Terminates the LINE webhook (signature first, JSON second), serializes
//! deliveries per user, and exposes the health document and the manual
//! broadcast trigger.

pub mod handlers;
pub mod server;

pub use server::{build_router, start_server, AppState};
