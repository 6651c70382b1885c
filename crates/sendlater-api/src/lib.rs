//! Sendlater API - loopback REST control surface
//!
//! Exposes the worker's upward interface to the (out-of-process) UI
//! layer: scheduled email management, follow-up rules, the daily
//! budget, and the reauthentication signal.

pub mod handlers;
pub mod routes;

pub use routes::{create_router, AppState};
