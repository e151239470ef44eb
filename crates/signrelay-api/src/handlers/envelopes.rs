//! Envelope submission and status query handlers.

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Multipart, Path, State};
use axum::http::HeaderMap;
use axum::Json;
use signrelay_db::EnvelopeTracking;

use crate::error::{ApiError, ApiResult};
use crate::models::{EnvelopeListResponse, EnvelopeResponse, SubmitResponse};
use crate::router::ApiState;
use crate::services::submission::SubmissionRequest;

/// Best-effort caller origin: forwarding headers first, then the socket
/// peer address.
fn requester_host(headers: &HeaderMap, addr: &SocketAddr) -> String {
    if let Some(forwarded) = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        return forwarded.to_string();
    }

    if let Some(real_ip) = headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        return real_ip.to_string();
    }

    addr.ip().to_string()
}

/// Read the multipart form into a submission request.
async fn read_submission_form(
    mut multipart: Multipart,
    requester_host: String,
) -> ApiResult<SubmissionRequest> {
    let mut request = SubmissionRequest {
        requester_host,
        ..SubmissionRequest::default()
    };

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(format!("Invalid multipart form: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::Validation(format!("Failed to read PDF upload: {e}")))?;
                request.pdf = Some(bytes.to_vec());
            }
            _ => {
                let value = field.text().await.map_err(|e| {
                    ApiError::Validation(format!("Failed to read form field {name}: {e}"))
                })?;
                match name.as_str() {
                    "signers" => request.signers_json = Some(value),
                    "email" => request.email = Some(value),
                    "name" => request.name = Some(value),
                    "account_id" => request.account_id = Some(value),
                    "callback_url" => request.callback_url = Some(value),
                    "integrator_key" => request.integrator_key = Some(value),
                    "user_id" => request.user_id = Some(value),
                    "private_key_b64" => request.private_key_b64 = Some(value),
                    "auth_server" => request.auth_server = Some(value),
                    "base_path" => request.base_path = Some(value),
                    _ => {}
                }
            }
        }
    }

    Ok(request)
}

/// Submit a PDF for signature.
#[utoipa::path(
    post,
    path = "/send-pdf",
    tag = "Envelopes",
    responses(
        (status = 200, description = "Envelope sent", body = SubmitResponse),
        (status = 400, description = "Invalid request"),
        (status = 500, description = "Credential or provider error"),
    )
)]
pub async fn send_pdf_handler(
    State(state): State<ApiState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    multipart: Multipart,
) -> ApiResult<Json<SubmitResponse>> {
    let request = read_submission_form(multipart, requester_host(&headers, &addr)).await?;
    let outcome = state.submission.submit(request).await?;

    Ok(Json(SubmitResponse {
        envelope_id: outcome.envelope_id,
        tracking: outcome.tracking.as_str().to_string(),
    }))
}

/// Get the tracking record for one envelope.
#[utoipa::path(
    get,
    path = "/envelope/{envelope_id}/status",
    tag = "Envelopes",
    params(("envelope_id" = String, Path, description = "Provider envelope id")),
    responses(
        (status = 200, description = "Tracking record", body = EnvelopeResponse),
        (status = 404, description = "Envelope not tracked"),
    )
)]
pub async fn envelope_status_handler(
    State(state): State<ApiState>,
    Path(envelope_id): Path<String>,
) -> ApiResult<Json<EnvelopeResponse>> {
    let record = EnvelopeTracking::find_by_envelope_id(&state.pool, &envelope_id)
        .await?
        .ok_or(ApiError::EnvelopeNotFound)?;

    Ok(Json(record.into()))
}

/// List all tracked envelopes, newest first.
#[utoipa::path(
    get,
    path = "/envelopes",
    tag = "Envelopes",
    responses(
        (status = 200, description = "Tracked envelopes", body = EnvelopeListResponse),
    )
)]
pub async fn list_envelopes_handler(
    State(state): State<ApiState>,
) -> ApiResult<Json<EnvelopeListResponse>> {
    let items: Vec<EnvelopeResponse> = EnvelopeTracking::list_recent(&state.pool)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();

    let total = items.len();
    Ok(Json(EnvelopeListResponse { items, total }))
}
