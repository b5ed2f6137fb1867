//! services/api/src/adapters/storage.rs
//!
//! Object-storage adapter implementing the `StorageService` port against a
//! Supabase-compatible storage REST API. Holds the audio recordings and
//! mints the time-limited signed URLs handed to the analysis worker and to
//! clients for playback.

use async_trait::async_trait;
use journal_core::ports::{PortError, PortResult, StorageService};
use serde::Deserialize;

/// An adapter that implements the `StorageService` port over the storage
/// service's HTTP API, authenticated with the service-role key.
#[derive(Clone)]
pub struct ObjectStorageAdapter {
    client: reqwest::Client,
    base_url: String,
    service_key: String,
    bucket: String,
}

#[derive(Deserialize)]
struct SignedUrlResponse {
    #[serde(rename = "signedURL")]
    signed_url: String,
}

impl ObjectStorageAdapter {
    /// Creates a new `ObjectStorageAdapter`.
    pub fn new(
        client: reqwest::Client,
        base_url: String,
        service_key: String,
        bucket: String,
    ) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key,
            bucket,
        }
    }

    fn object_url(&self, path: &str) -> String {
        format!("{}/storage/v1/object/{}/{}", self.base_url, self.bucket, path)
    }
}

#[async_trait]
impl StorageService for ObjectStorageAdapter {
    async fn upload(&self, path: &str, bytes: Vec<u8>) -> PortResult<String> {
        let response = self
            .client
            .post(self.object_url(path))
            .bearer_auth(&self.service_key)
            .header(reqwest::header::CONTENT_TYPE, "audio/wav")
            .body(bytes)
            .send()
            .await
            .map_err(|e| PortError::Unexpected(format!("storage upload failed: {e}")))?;

        if !response.status().is_success() {
            return Err(PortError::Unexpected(format!(
                "storage upload failed with status {}",
                response.status()
            )));
        }
        Ok(path.to_string())
    }

    async fn remove(&self, path: &str) -> PortResult<()> {
        let response = self
            .client
            .delete(self.object_url(path))
            .bearer_auth(&self.service_key)
            .send()
            .await
            .map_err(|e| PortError::Unexpected(format!("storage delete failed: {e}")))?;

        if !response.status().is_success() {
            return Err(PortError::Unexpected(format!(
                "storage delete failed with status {}",
                response.status()
            )));
        }
        Ok(())
    }

    async fn signed_url(&self, path: &str, expires_in_secs: u32) -> PortResult<String> {
        let sign_url = format!(
            "{}/storage/v1/object/sign/{}/{}",
            self.base_url, self.bucket, path
        );
        let response = self
            .client
            .post(sign_url)
            .bearer_auth(&self.service_key)
            .json(&serde_json::json!({ "expiresIn": expires_in_secs }))
            .send()
            .await
            .map_err(|e| PortError::Unexpected(format!("signed URL request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(PortError::Unexpected(format!(
                "signed URL request failed with status {}",
                response.status()
            )));
        }

        let body: SignedUrlResponse = response
            .json()
            .await
            .map_err(|e| PortError::Unexpected(format!("signed URL response malformed: {e}")))?;

        // The API returns a path relative to the storage root.
        Ok(format!("{}/storage/v1{}", self.base_url, body.signed_url))
    }
}
