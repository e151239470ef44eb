//! Envelope lifecycle updates driven by provider webhook events.
//!
//! Transitions are deliberately permissive: the provider owns the state
//! machine, so repeated and out-of-order statuses overwrite rather than
//! error. Events for envelopes this instance never tracked are
//! acknowledged and ignored — they may belong to another system or predate
//! tracking.

use signrelay_db::{EnvelopeStatus, EnvelopeTracking};
use sqlx::PgPool;

use crate::error::ApiResult;
use crate::services::decode::EnvelopeEvent;
use crate::services::notifier::NotifierHandle;

/// How a webhook event was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookDisposition {
    /// The event matched a tracked envelope and was applied.
    Processed,
    /// The event carried no tracked envelope and was dropped.
    Ignored,
}

impl WebhookDisposition {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            WebhookDisposition::Processed => "processed",
            WebhookDisposition::Ignored => "ignored",
        }
    }
}

/// Applies normalized webhook events to the tracking store.
#[derive(Clone)]
pub struct LifecycleService {
    pool: PgPool,
    notifier: NotifierHandle,
}

impl LifecycleService {
    pub fn new(pool: PgPool, notifier: NotifierHandle) -> Self {
        Self { pool, notifier }
    }

    /// Apply one envelope status event.
    ///
    /// Sets the status (first `completed` also stamps `signed_at`), and for
    /// terminal statuses enqueues an outbound notification toward the
    /// requester's callback.
    pub async fn apply_event(&self, event: &EnvelopeEvent) -> ApiResult<WebhookDisposition> {
        let updated =
            EnvelopeTracking::update_status(&self.pool, &event.envelope_id, &event.status).await?;

        let Some(record) = updated else {
            tracing::info!(
                target: "lifecycle",
                envelope_id = %event.envelope_id,
                status = %event.status,
                "Webhook event for untracked envelope, ignoring"
            );
            return Ok(WebhookDisposition::Ignored);
        };

        tracing::info!(
            target: "lifecycle",
            envelope_id = %record.envelope_id,
            status = %record.status,
            "Envelope status updated"
        );

        if EnvelopeStatus::parse(&record.status).is_terminal() {
            self.notifier.enqueue(record);
        }

        Ok(WebhookDisposition::Processed)
    }
}
