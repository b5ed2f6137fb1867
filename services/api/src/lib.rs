//! services/api/src/lib.rs
//!
//! The library crate for the API service: configuration, the concrete
//! adapters behind the core ports, and the Axum web layer.

pub mod adapters;
pub mod config;
pub mod error;
pub mod web;
