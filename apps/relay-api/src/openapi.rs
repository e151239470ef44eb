//! `OpenAPI` documentation for the relay API.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::health::{self, HealthResponse};
use signrelay_api::error::ErrorResponse;
use signrelay_api::models::{
    EnvelopeListResponse, EnvelopeResponse, SubmitResponse, WebhookAck,
};

/// `OpenAPI` documentation for the relay.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "signrelay API",
        version = "0.1.0",
        description = "E-signature envelope submission and webhook relay"
    ),
    paths(
        health::health_handler,
        signrelay_api::handlers::envelopes::send_pdf_handler,
        signrelay_api::handlers::envelopes::envelope_status_handler,
        signrelay_api::handlers::envelopes::list_envelopes_handler,
        signrelay_api::handlers::webhook::docusign_webhook_handler,
    ),
    components(schemas(
        HealthResponse,
        SubmitResponse,
        WebhookAck,
        EnvelopeResponse,
        EnvelopeListResponse,
        ErrorResponse,
    )),
    tags(
        (name = "Health", description = "Service health"),
        (name = "Envelopes", description = "Envelope submission and tracking"),
        (name = "Webhook", description = "Inbound provider status events"),
    )
)]
pub struct ApiDoc;

/// Serve the generated spec.
pub fn openapi_routes() -> Router {
    Router::new().route(
        "/api-docs/openapi.json",
        get(|| async { Json(ApiDoc::openapi()) }),
    )
}
