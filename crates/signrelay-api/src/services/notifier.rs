//! Outbound notification toward the requester's callback URL.
//!
//! Terminal-state webhook events enqueue one delivery job on a bounded
//! channel; a worker drains the channel, performs the callback POST, and
//! records the outcome on the tracking row. Delivery failure is
//! bookkeeping, never an error surfaced to the provider or the requester —
//! a replayed webhook event enqueues a fresh attempt, but a failed attempt
//! is not retried on its own.

use chrono::{DateTime, Utc};
use serde::Serialize;
use signrelay_db::EnvelopeTracking;
use sqlx::PgPool;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::{ApiError, ApiResult};

/// Callback request timeout.
const NOTIFY_TIMEOUT_SECS: u64 = 10;

/// Maximum length of the failure reason recorded on the tracking row.
const MAX_FAILURE_REASON_CHARS: usize = 100;

/// Default capacity of the notification queue.
pub const NOTIFIER_QUEUE_CAPACITY: usize = 256;

/// JSON body POSTed to the requester's callback URL.
#[derive(Debug, Serialize)]
pub struct NotificationPayload<'a> {
    pub envelope_id: &'a str,
    pub status: &'a str,
    pub requester_host: &'a str,
    pub signed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Outcome of one callback attempt.
///
/// Any HTTP response counts as delivered — the callback endpoint answered,
/// and its status code is recorded verbatim. Only transport-level failures
/// count as failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationOutcome {
    Delivered(u16),
    Failed(String),
}

impl NotificationOutcome {
    /// Encode the outcome for the `notification_status` column.
    #[must_use]
    pub fn status_label(&self) -> String {
        match self {
            NotificationOutcome::Delivered(code) => format!("success_{code}"),
            NotificationOutcome::Failed(reason) => {
                let truncated: String = reason.chars().take(MAX_FAILURE_REASON_CHARS).collect();
                format!("failed_{truncated}")
            }
        }
    }
}

/// POST the notification payload to the record's callback URL.
///
/// Always returns an outcome; transport errors are captured, not raised.
pub async fn attempt_delivery(
    http_client: &reqwest::Client,
    record: &EnvelopeTracking,
) -> NotificationOutcome {
    let payload = NotificationPayload {
        envelope_id: &record.envelope_id,
        status: &record.status,
        requester_host: &record.requester_host,
        signed_at: record.signed_at,
        created_at: record.created_at,
    };

    let result = http_client
        .post(&record.callback_url)
        .json(&payload)
        .send()
        .await;

    match result {
        Ok(response) => NotificationOutcome::Delivered(response.status().as_u16()),
        Err(e) => {
            let reason = if e.is_timeout() {
                format!("timeout after {NOTIFY_TIMEOUT_SECS}s")
            } else if e.is_connect() {
                format!("connection failed: {e}")
            } else {
                format!("request error: {e}")
            };
            NotificationOutcome::Failed(reason)
        }
    }
}

/// Service performing callback notifications and recording their outcome.
#[derive(Clone)]
pub struct NotifierService {
    pool: PgPool,
    http_client: reqwest::Client,
}

impl NotifierService {
    /// Create a new notifier with a shared HTTP client.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Internal` if the HTTP client cannot be built.
    pub fn new(pool: PgPool) -> ApiResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(NOTIFY_TIMEOUT_SECS))
            .build()
            .map_err(|e| ApiError::Internal(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self { pool, http_client })
    }

    /// Perform one notification attempt and persist the outcome.
    ///
    /// Never returns an error — delivery and bookkeeping failures alike are
    /// logged and recorded as state on the tracking row.
    pub async fn notify(&self, record: &EnvelopeTracking) {
        let outcome = attempt_delivery(&self.http_client, record).await;
        let label = outcome.status_label();

        match &outcome {
            NotificationOutcome::Delivered(code) => {
                tracing::info!(
                    target: "notifier",
                    envelope_id = %record.envelope_id,
                    callback_url = %record.callback_url,
                    response_code = code,
                    "Callback notification delivered"
                );
            }
            NotificationOutcome::Failed(reason) => {
                tracing::warn!(
                    target: "notifier",
                    envelope_id = %record.envelope_id,
                    callback_url = %record.callback_url,
                    error = %reason,
                    "Callback notification failed"
                );
            }
        }

        if let Err(e) =
            EnvelopeTracking::record_notification(&self.pool, &record.envelope_id, &label).await
        {
            tracing::error!(
                target: "notifier",
                envelope_id = %record.envelope_id,
                error = %e,
                "Failed to record notification outcome"
            );
        }
    }
}

/// Sending side of the notification queue.
#[derive(Clone)]
pub struct NotifierHandle {
    tx: mpsc::Sender<EnvelopeTracking>,
}

impl NotifierHandle {
    /// Enqueue one notification job. A full or closed queue drops the job
    /// with a warning; the tracking row keeps its previous notification
    /// state and a later webhook replay can enqueue again.
    pub fn enqueue(&self, record: EnvelopeTracking) {
        if let Err(e) = self.tx.try_send(record) {
            let record = match &e {
                mpsc::error::TrySendError::Full(r) | mpsc::error::TrySendError::Closed(r) => r,
            };
            tracing::warn!(
                target: "notifier",
                envelope_id = %record.envelope_id,
                "Notification queue unavailable, dropping job"
            );
        }
    }
}

/// Create the notification queue.
pub fn notifier_channel(capacity: usize) -> (NotifierHandle, mpsc::Receiver<EnvelopeTracking>) {
    let (tx, rx) = mpsc::channel(capacity);
    (NotifierHandle { tx }, rx)
}

/// Background worker draining the notification queue.
pub struct NotifierWorker {
    service: NotifierService,
    rx: mpsc::Receiver<EnvelopeTracking>,
    shutdown: CancellationToken,
}

impl NotifierWorker {
    pub fn new(
        service: NotifierService,
        rx: mpsc::Receiver<EnvelopeTracking>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            service,
            rx,
            shutdown,
        }
    }

    /// Run until the queue closes or shutdown is requested.
    pub async fn run(mut self) {
        tracing::info!(target: "notifier", "Notification worker started");
        loop {
            tokio::select! {
                () = self.shutdown.cancelled() => {
                    tracing::info!(target: "notifier", "Notification worker shutting down");
                    break;
                }
                job = self.rx.recv() => {
                    match job {
                        Some(record) => self.service.notify(&record).await,
                        None => break,
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delivered_label_keeps_any_http_code() {
        assert_eq!(NotificationOutcome::Delivered(200).status_label(), "success_200");
        assert_eq!(NotificationOutcome::Delivered(404).status_label(), "success_404");
        assert_eq!(NotificationOutcome::Delivered(500).status_label(), "success_500");
    }

    #[test]
    fn test_failed_label_truncates_reason() {
        let long_reason = "x".repeat(500);
        let label = NotificationOutcome::Failed(long_reason).status_label();
        assert!(label.starts_with("failed_"));
        assert_eq!(label.chars().count(), "failed_".len() + 100);
    }

    #[test]
    fn test_payload_serializes_timestamps_or_null() {
        let payload = NotificationPayload {
            envelope_id: "E1",
            status: "completed",
            requester_host: "10.0.0.1",
            signed_at: None,
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["envelope_id"], "E1");
        assert!(json["signed_at"].is_null());
        assert!(json["created_at"].is_string());
    }
}
