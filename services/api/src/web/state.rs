//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use crate::web::hub::LiveStatusHub;
use journal_core::ports::{
    AnalysisService, DatabaseService, FieldCipher, IdentityService, StatusPublisher,
    StorageService,
};
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all
/// handlers. Every external collaborator is injected as a trait object so
/// tests can swap in in-memory implementations.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn DatabaseService>,
    pub storage: Arc<dyn StorageService>,
    pub analysis: Arc<dyn AnalysisService>,
    pub identity: Arc<dyn IdentityService>,
    pub cipher: Arc<dyn FieldCipher>,
    /// Publication side of the live status channel.
    pub publisher: Arc<dyn StatusPublisher>,
    /// Subscription side; the WebSocket handler needs the concrete hub.
    pub hub: Arc<LiveStatusHub>,
    pub config: Arc<Config>,
}
