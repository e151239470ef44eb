//! Envelope definition payloads.
//!
//! Builds the JSON body for the envelope-creation call: one base64 PDF
//! document, anchor-tab signers, and an event-notification subscription for
//! the three terminal statuses.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};

/// Display name of the single document in each envelope.
const DOCUMENT_NAME: &str = "Document à signer";

/// Subject of the signing request email sent to recipients.
const EMAIL_SUBJECT: &str = "Veuillez signer le document";

/// Fixed document id — every envelope carries exactly one document.
const DOCUMENT_ID: &str = "1";

/// Text marker inside the PDF where the signature tab is anchored.
const SIGNATURE_ANCHOR: &str = "SIGN_HERE";

/// Terminal envelope events the relay subscribes to.
const SUBSCRIBED_EVENTS: [&str; 3] = ["completed", "declined", "voided"];

/// One signing recipient, as supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignerInfo {
    pub email: String,
    pub name: String,
}

/// Envelope creation request body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvelopeDefinition {
    pub email_subject: String,
    pub documents: Vec<Document>,
    pub recipients: Recipients,
    pub event_notification: EventNotification,
    pub status: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub document_base64: String,
    pub name: String,
    pub file_extension: String,
    pub document_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipients {
    pub signers: Vec<Signer>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Signer {
    pub email: String,
    pub name: String,
    pub recipient_id: String,
    pub routing_order: String,
    pub tabs: Tabs,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tabs {
    pub sign_here_tabs: Vec<SignHere>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignHere {
    pub anchor_string: String,
    pub anchor_units: String,
    pub anchor_x_offset: String,
    pub anchor_y_offset: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventNotification {
    pub url: String,
    pub logging_enabled: String,
    pub require_acknowledgment: String,
    pub envelope_events: Vec<EnvelopeEventSubscription>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvelopeEventSubscription {
    pub envelope_event_status_code: String,
}

/// Build the envelope definition for one PDF and its signers.
///
/// Every signer gets a sequential recipient id starting at 1 and the same
/// anchor-based signature tab; all signers sign at the marker location.
/// The envelope is created with status `sent` — dispatched immediately, no
/// draft state.
#[must_use]
pub fn build_envelope_definition(
    pdf_bytes: &[u8],
    signers: &[SignerInfo],
    webhook_url: &str,
) -> EnvelopeDefinition {
    let document = Document {
        document_base64: BASE64.encode(pdf_bytes),
        name: DOCUMENT_NAME.to_string(),
        file_extension: "pdf".to_string(),
        document_id: DOCUMENT_ID.to_string(),
    };

    let signers = signers
        .iter()
        .enumerate()
        .map(|(i, s)| Signer {
            email: s.email.clone(),
            name: s.name.clone(),
            recipient_id: (i + 1).to_string(),
            routing_order: "1".to_string(),
            tabs: Tabs {
                sign_here_tabs: vec![SignHere {
                    anchor_string: SIGNATURE_ANCHOR.to_string(),
                    anchor_units: "pixels".to_string(),
                    anchor_x_offset: "100".to_string(),
                    anchor_y_offset: "100".to_string(),
                }],
            },
        })
        .collect();

    let envelope_events = SUBSCRIBED_EVENTS
        .iter()
        .map(|e| EnvelopeEventSubscription {
            envelope_event_status_code: (*e).to_string(),
        })
        .collect();

    EnvelopeDefinition {
        email_subject: EMAIL_SUBJECT.to_string(),
        documents: vec![document],
        recipients: Recipients { signers },
        event_notification: EventNotification {
            url: webhook_url.to_string(),
            logging_enabled: "true".to_string(),
            require_acknowledgment: "true".to_string(),
            envelope_events,
        },
        status: "sent".to_string(),
    }
}
