//! patchbay server — HTTP wiring for the switch-facing lookup
//! endpoint and the admin REST surface.
//!
//! Split out of `main.rs` so the router can be driven directly in
//! integration tests.

pub mod admin;
pub mod config;
pub mod http;

pub use config::ServerConfig;
pub use http::{AppState, router};
