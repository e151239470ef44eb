//! Envelope-creation API client.

use serde::Deserialize;
use tracing::{debug, info};

use crate::envelope::EnvelopeDefinition;
use crate::error::{DocuSignError, DocuSignResult};

/// Provider response for a created envelope.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvelopeSummary {
    pub envelope_id: String,
    #[serde(default)]
    pub status: Option<String>,
}

/// Client for the envelope REST API.
#[derive(Debug, Clone)]
pub struct DocuSignClient {
    http_client: reqwest::Client,
}

impl DocuSignClient {
    /// Create a new client with a shared HTTP client.
    ///
    /// # Errors
    ///
    /// Returns `DocuSignError::Internal` if the HTTP client cannot be built.
    pub fn new() -> DocuSignResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .user_agent("signrelay/0.1")
            .build()
            .map_err(|e| DocuSignError::Internal(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self { http_client })
    }

    /// Create and immediately send an envelope.
    ///
    /// # Errors
    ///
    /// Returns `DocuSignError::Provider` carrying the provider's status,
    /// reason, and raw body when the call is rejected.
    pub async fn create_envelope(
        &self,
        base_path: &str,
        account_id: &str,
        access_token: &str,
        definition: &EnvelopeDefinition,
    ) -> DocuSignResult<EnvelopeSummary> {
        let url = format!("{base_path}/v2.1/accounts/{account_id}/envelopes");
        debug!(account_id, "Creating envelope");

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(access_token)
            .json(definition)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let reason = status.canonical_reason().unwrap_or("unknown").to_string();
            let body = response.text().await.unwrap_or_default();
            return Err(DocuSignError::Provider {
                status: status.as_u16(),
                reason,
                body,
            });
        }

        let summary: EnvelopeSummary = response.json().await?;
        info!(envelope_id = %summary.envelope_id, "Envelope sent");
        Ok(summary)
    }
}
