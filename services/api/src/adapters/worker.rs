//! services/api/src/adapters/worker.rs
//!
//! Adapter for the external analysis worker, implementing the
//! `AnalysisService` port. The call is one-way: the worker's synchronous
//! response only acknowledges the submission, and the actual analysis result
//! arrives later through the webhook handler.

use async_trait::async_trait;
use journal_core::analysis::AnalysisRequest;
use journal_core::ports::{AnalysisService, PortError, PortResult};
use tracing::debug;

/// Submits analysis requests to the worker's `/analyze` endpoint.
#[derive(Clone)]
pub struct AnalysisWorkerAdapter {
    client: reqwest::Client,
    base_url: String,
}

impl AnalysisWorkerAdapter {
    /// Creates a new `AnalysisWorkerAdapter`.
    pub fn new(client: reqwest::Client, base_url: String) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl AnalysisService for AnalysisWorkerAdapter {
    async fn submit_analysis(&self, request: &AnalysisRequest) -> PortResult<()> {
        let response = self
            .client
            .post(format!("{}/analyze", self.base_url))
            .json(request)
            .send()
            .await
            .map_err(|e| PortError::Unexpected(format!("analysis submit failed: {e}")))?;

        if !response.status().is_success() {
            return Err(PortError::Unexpected(format!(
                "analysis worker rejected submission with status {}",
                response.status()
            )));
        }
        debug!("analysis task dispatched for entry {}", request.entry_id);
        Ok(())
    }
}
