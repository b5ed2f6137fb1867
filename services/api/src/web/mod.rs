//! services/api/src/web/mod.rs
//!
//! Declares the submodules for the web layer.

pub mod analysis_task;
pub mod goals;
pub mod hub;
pub mod insights;
pub mod middleware;
pub mod protocol;
pub mod quotes;
pub mod rest;
pub mod state;
pub mod webhook;
pub mod ws_handler;

// Re-export the main handlers to make them easily accessible from the binary.
pub use middleware::require_auth;
pub use ws_handler::ws_handler;
