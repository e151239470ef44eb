//! Request and response models for the signrelay API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use signrelay_db::EnvelopeTracking;
use utoipa::ToSchema;
use uuid::Uuid;

/// Response for a successful envelope submission.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SubmitResponse {
    /// Provider-issued envelope identifier.
    pub envelope_id: String,

    /// Whether the tracking row was recorded (`recorded` or `failed`).
    /// The envelope is sent provider-side either way.
    pub tracking: String,
}

/// Acknowledgment returned by the webhook endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WebhookAck {
    /// `processed` for applied events, `ignored` for unrecognized ones.
    pub status: String,
}

/// A tracked envelope as exposed over the API.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EnvelopeResponse {
    pub id: Uuid,
    pub envelope_id: String,
    pub callback_url: String,
    pub requester_host: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub signed_at: Option<DateTime<Utc>>,
    pub notified_at: Option<DateTime<Utc>>,
    pub notification_status: Option<String>,
}

impl From<EnvelopeTracking> for EnvelopeResponse {
    fn from(r: EnvelopeTracking) -> Self {
        Self {
            id: r.id,
            envelope_id: r.envelope_id,
            callback_url: r.callback_url,
            requester_host: r.requester_host,
            status: r.status,
            created_at: r.created_at,
            signed_at: r.signed_at,
            notified_at: r.notified_at,
            notification_status: r.notification_status,
        }
    }
}

/// Listing of tracked envelopes, newest first.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EnvelopeListResponse {
    pub items: Vec<EnvelopeResponse>,
    pub total: usize,
}
