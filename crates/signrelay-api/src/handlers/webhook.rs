//! Inbound provider webhook handler.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap};
use axum::Json;

use crate::error::ApiResult;
use crate::models::WebhookAck;
use crate::router::ApiState;
use crate::services::decode::decode_event;
use crate::services::lifecycle::WebhookDisposition;

/// Receive an envelope status event from the signing provider.
///
/// The sender is trusted infrastructure; recognized events are applied,
/// unrecognized ones acknowledged and dropped so the provider never sees
/// an error it would retry. Only a body that fails to parse is a 500.
#[utoipa::path(
    post,
    path = "/webhook/docusign",
    tag = "Webhook",
    request_body(content = String, description = "Raw webhook payload"),
    responses(
        (status = 200, description = "Event processed or ignored", body = WebhookAck),
        (status = 500, description = "Malformed payload"),
    )
)]
pub async fn docusign_webhook_handler(
    State(state): State<ApiState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<WebhookAck>> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());

    let disposition = match decode_event(content_type, &body)? {
        Some(event) => state.lifecycle.apply_event(&event).await?,
        None => {
            tracing::debug!(target: "lifecycle", "Webhook payload carried no envelope id");
            WebhookDisposition::Ignored
        }
    };

    Ok(Json(WebhookAck {
        status: disposition.as_str().to_string(),
    }))
}
