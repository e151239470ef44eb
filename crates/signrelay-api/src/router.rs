//! Axum router setup for the relay endpoints.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use sqlx::PgPool;

use crate::handlers::{envelopes, webhook};
use crate::services::lifecycle::LifecycleService;
use crate::services::notifier::NotifierHandle;
use crate::services::submission::SubmissionService;

/// Shared state for the relay handlers.
#[derive(Clone)]
pub struct ApiState {
    pub submission: Arc<SubmissionService>,
    pub lifecycle: Arc<LifecycleService>,
    pub pool: PgPool,
}

impl ApiState {
    pub fn new(pool: PgPool, submission: SubmissionService, notifier: NotifierHandle) -> Self {
        Self {
            submission: Arc::new(submission),
            lifecycle: Arc::new(LifecycleService::new(pool.clone(), notifier)),
            pool,
        }
    }
}

/// Creates the relay router with all routes.
pub fn api_router(state: ApiState) -> Router {
    Router::new()
        .route("/send-pdf", post(envelopes::send_pdf_handler))
        .route("/webhook/docusign", post(webhook::docusign_webhook_handler))
        .route(
            "/envelope/{envelope_id}/status",
            get(envelopes::envelope_status_handler),
        )
        .route("/envelopes", get(envelopes::list_envelopes_handler))
        .with_state(state)
}
