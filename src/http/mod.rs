//! HTTP server module.
//!
//! The server exposes an explicit lifecycle: `start()` serves until `stop()`
//! is called on its handle. SIGTERM/SIGINT are connected to `stop()` by
//! [`shutdown::stop_on_signal`], kept separate so the server itself stays
//! signal-agnostic.

mod server;
pub mod shutdown;

pub use server::{ServerError, ServerHandle, StatusServer};
