//! Envelope tracking model.
//!
//! One row per envelope submitted to the signing provider, correlating the
//! provider-issued envelope id with the requester's callback URL and the
//! envelope's lifecycle status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Envelope lifecycle status as reported by the signing provider.
///
/// The provider owns this vocabulary; statuses outside the known set are
/// preserved verbatim rather than rejected, so the database column stays a
/// plain string and this enum is a lossless view over it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvelopeStatus {
    /// Envelope dispatched to the provider, awaiting signer action.
    Sent,
    /// All signers completed. Terminal.
    Completed,
    /// A signer declined. Terminal.
    Declined,
    /// The sender voided the envelope. Terminal.
    Voided,
    /// Any other provider-reported status, kept as-is.
    #[serde(untagged)]
    Other(String),
}

impl EnvelopeStatus {
    /// Parse a provider status string. Never fails — unknown statuses are
    /// carried through lower-cased.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "sent" => EnvelopeStatus::Sent,
            "completed" => EnvelopeStatus::Completed,
            "declined" => EnvelopeStatus::Declined,
            "voided" => EnvelopeStatus::Voided,
            other => EnvelopeStatus::Other(other.to_string()),
        }
    }

    /// Check if no further provider action is expected after this status.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            EnvelopeStatus::Completed | EnvelopeStatus::Declined | EnvelopeStatus::Voided
        )
    }
}

impl std::fmt::Display for EnvelopeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EnvelopeStatus::Sent => write!(f, "sent"),
            EnvelopeStatus::Completed => write!(f, "completed"),
            EnvelopeStatus::Declined => write!(f, "declined"),
            EnvelopeStatus::Voided => write!(f, "voided"),
            EnvelopeStatus::Other(s) => write!(f, "{s}"),
        }
    }
}

/// A tracked envelope.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct EnvelopeTracking {
    /// Surrogate identifier, assigned at creation.
    pub id: Uuid,

    /// Provider-issued envelope identifier. Unique.
    pub envelope_id: String,

    /// Requester-supplied URL to notify on terminal status.
    pub callback_url: String,

    /// Best-effort origin of the submitting caller.
    pub requester_host: String,

    /// Current lifecycle status (lowercase provider vocabulary).
    pub status: String,

    /// When the envelope was submitted.
    pub created_at: DateTime<Utc>,

    /// When the envelope first reached `completed`. Set once.
    pub signed_at: Option<DateTime<Utc>>,

    /// When the last outbound notification attempt finished.
    pub notified_at: Option<DateTime<Utc>>,

    /// Outcome of the last notification attempt
    /// (`success_<code>` or `failed_<reason>`).
    pub notification_status: Option<String>,
}

/// Fields required to insert a tracking row.
#[derive(Debug, Clone)]
pub struct NewEnvelopeTracking {
    pub envelope_id: String,
    pub callback_url: String,
    pub requester_host: String,
}

impl EnvelopeTracking {
    /// Insert a new tracking row with status `sent`.
    pub async fn create(
        pool: &sqlx::PgPool,
        new: NewEnvelopeTracking,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as(
            r"
            INSERT INTO envelope_tracking
                (id, envelope_id, callback_url, requester_host, status, created_at)
            VALUES ($1, $2, $3, $4, 'sent', now())
            RETURNING *
            ",
        )
        .bind(Uuid::new_v4())
        .bind(&new.envelope_id)
        .bind(&new.callback_url)
        .bind(&new.requester_host)
        .fetch_one(pool)
        .await
    }

    /// Find a tracking row by its provider envelope id.
    pub async fn find_by_envelope_id(
        pool: &sqlx::PgPool,
        envelope_id: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as(
            r"
            SELECT * FROM envelope_tracking
            WHERE envelope_id = $1
            ",
        )
        .bind(envelope_id)
        .fetch_optional(pool)
        .await
    }

    /// Apply a status reported by the provider.
    ///
    /// Out-of-order and repeated statuses overwrite; `signed_at` is set on
    /// the first `completed` transition only and never overwritten.
    /// Returns `None` when no row matches the envelope id.
    pub async fn update_status(
        pool: &sqlx::PgPool,
        envelope_id: &str,
        status: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as(
            r"
            UPDATE envelope_tracking
            SET status = $2,
                signed_at = CASE
                    WHEN $2 = 'completed' THEN COALESCE(signed_at, now())
                    ELSE signed_at
                END
            WHERE envelope_id = $1
            RETURNING *
            ",
        )
        .bind(envelope_id)
        .bind(status)
        .fetch_optional(pool)
        .await
    }

    /// Record the outcome of an outbound notification attempt.
    pub async fn record_notification(
        pool: &sqlx::PgPool,
        envelope_id: &str,
        notification_status: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as(
            r"
            UPDATE envelope_tracking
            SET notified_at = now(),
                notification_status = $2
            WHERE envelope_id = $1
            RETURNING *
            ",
        )
        .bind(envelope_id)
        .bind(notification_status)
        .fetch_optional(pool)
        .await
    }

    /// List all tracked envelopes, newest first.
    pub async fn list_recent(pool: &sqlx::PgPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as(
            r"
            SELECT * FROM envelope_tracking
            ORDER BY created_at DESC
            ",
        )
        .fetch_all(pool)
        .await
    }

    /// Parsed view of the status column.
    #[must_use]
    pub fn status(&self) -> EnvelopeStatus {
        EnvelopeStatus::parse(&self.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_statuses() {
        assert_eq!(EnvelopeStatus::parse("sent"), EnvelopeStatus::Sent);
        assert_eq!(EnvelopeStatus::parse("completed"), EnvelopeStatus::Completed);
        assert_eq!(EnvelopeStatus::parse("declined"), EnvelopeStatus::Declined);
        assert_eq!(EnvelopeStatus::parse("voided"), EnvelopeStatus::Voided);
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!(EnvelopeStatus::parse("Completed"), EnvelopeStatus::Completed);
        assert_eq!(EnvelopeStatus::parse("VOIDED"), EnvelopeStatus::Voided);
    }

    #[test]
    fn test_parse_preserves_unknown_statuses() {
        assert_eq!(
            EnvelopeStatus::parse("Delivered"),
            EnvelopeStatus::Other("delivered".to_string())
        );
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(EnvelopeStatus::Completed.is_terminal());
        assert!(EnvelopeStatus::Declined.is_terminal());
        assert!(EnvelopeStatus::Voided.is_terminal());
        assert!(!EnvelopeStatus::Sent.is_terminal());
        assert!(!EnvelopeStatus::Other("delivered".to_string()).is_terminal());
    }

    #[test]
    fn test_display_round_trips() {
        for s in ["sent", "completed", "declined", "voided", "delivered"] {
            assert_eq!(EnvelopeStatus::parse(s).to_string(), s);
        }
    }
}
