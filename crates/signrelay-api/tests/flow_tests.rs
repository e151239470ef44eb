//! End-to-end submission and webhook relay flows.
//!
//! These require a running PostgreSQL instance and a `DATABASE_URL`
//! environment variable pointing at it.

#![cfg(feature = "integration")]

use std::sync::OnceLock;
use std::time::Duration;

use axum::body::Body;
use axum::http::Request;
use rsa::pkcs8::{EncodePrivateKey, LineEnding};
use rsa::RsaPrivateKey;
use serde_json::json;
use signrelay_api::services::submission::SubmissionRequest;
use signrelay_api::{
    api_router, notifier_channel, ApiState, NotifierService, NotifierWorker, ProviderConfig,
    SubmissionService,
};
use signrelay_db::{run_migrations, DbPool, EnvelopeTracking};
use signrelay_docusign::{DocuSignCredentials, DocuSignEnvironment, TokenCache};
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;
use wiremock::matchers::{body_partial_json, method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_private_key_pem() -> &'static str {
    static KEY: OnceLock<String> = OnceLock::new();
    KEY.get_or_init(|| {
        let mut rng = rand::thread_rng();
        let key = RsaPrivateKey::new(&mut rng, 2048).expect("generate RSA key");
        key.to_pkcs8_pem(LineEnding::LF)
            .expect("encode PEM")
            .to_string()
    })
}

async fn test_pool() -> sqlx::PgPool {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = DbPool::connect(&url).await.expect("connect");
    run_migrations(&pool).await.expect("migrations");
    pool.into_inner()
}

/// Mock provider hosting both the OAuth and envelope endpoints.
async fn mock_provider(envelope_id: &str) -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "tok-flow",
            "token_type": "Bearer",
            "expires_in": 3600,
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path_regex(r"^/v2\.1/accounts/[^/]+/envelopes$"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "envelopeId": envelope_id,
            "status": "sent",
        })))
        .mount(&server)
        .await;

    server
}

struct Harness {
    state: ApiState,
    _shutdown: CancellationToken,
}

async fn harness(pool: sqlx::PgPool, provider: &MockServer) -> Harness {
    let credentials = DocuSignCredentials {
        integrator_key: "ik-flow".to_string(),
        user_id: "11111111-2222-3333-4444-555555555555".to_string(),
        auth_host: "account-d.docusign.com".to_string(),
        private_key_pem: test_private_key_pem().to_string(),
    };

    let config = ProviderConfig {
        environment: DocuSignEnvironment::Sandbox,
        base_path: provider.uri(),
        account_id: None,
        credentials: Some(credentials),
    };

    let tokens = TokenCache::new()
        .unwrap()
        .with_auth_base_url(provider.uri());
    let submission = SubmissionService::new(
        pool.clone(),
        config,
        "https://relay.example.com/webhook/docusign".to_string(),
    )
    .unwrap()
    .with_token_cache(tokens);

    let (handle, rx) = notifier_channel(16);
    let shutdown = CancellationToken::new();
    let worker = NotifierWorker::new(NotifierService::new(pool.clone()).unwrap(), rx, shutdown.clone());
    tokio::spawn(worker.run());

    Harness {
        state: ApiState::new(pool, submission, handle),
        _shutdown: shutdown,
    }
}

fn submit_request(callback_url: &str) -> SubmissionRequest {
    SubmissionRequest {
        signers_json: Some(r#"[{"email":"a@x.com","name":"A"}]"#.to_string()),
        account_id: Some("acct-1".to_string()),
        callback_url: Some(callback_url.to_string()),
        pdf: Some(b"%PDF-1.4 flow".to_vec()),
        requester_host: "203.0.113.9".to_string(),
        ..SubmissionRequest::default()
    }
}

async fn post_webhook(state: ApiState, content_type: &str, body: String) -> u16 {
    let response = api_router(state)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/webhook/docusign")
                .header("content-type", content_type)
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    response.status().as_u16()
}

/// Poll until the record's notification bookkeeping lands.
async fn wait_for_notification(pool: &sqlx::PgPool, envelope_id: &str) -> EnvelopeTracking {
    for _ in 0..100 {
        let record = EnvelopeTracking::find_by_envelope_id(pool, envelope_id)
            .await
            .expect("query")
            .expect("record exists");
        if record.notified_at.is_some() {
            return record;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("notification outcome was never recorded for {envelope_id}");
}

#[tokio::test]
async fn test_submission_creates_sent_tracking_row() {
    let pool = test_pool().await;
    let envelope_id = format!("env-{}", uuid::Uuid::new_v4());
    let provider = mock_provider(&envelope_id).await;
    let h = harness(pool.clone(), &provider).await;

    let outcome = h
        .state
        .submission
        .submit(submit_request("https://caller.example.com/cb"))
        .await
        .expect("submit");

    assert_eq!(outcome.envelope_id, envelope_id);

    let record = EnvelopeTracking::find_by_envelope_id(&pool, &envelope_id)
        .await
        .expect("query")
        .expect("tracking row exists");
    assert_eq!(record.status, "sent");
    assert_eq!(record.requester_host, "203.0.113.9");
}

#[tokio::test]
async fn test_completed_webhook_notifies_callback() {
    let pool = test_pool().await;
    let envelope_id = format!("env-{}", uuid::Uuid::new_v4());
    let provider = mock_provider(&envelope_id).await;
    let callback = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/cb"))
        .and(body_partial_json(json!({
            "envelope_id": envelope_id,
            "status": "completed",
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&callback)
        .await;

    let h = harness(pool.clone(), &provider).await;
    h.state
        .submission
        .submit(submit_request(&format!("{}/cb", callback.uri())))
        .await
        .expect("submit");

    let status = post_webhook(
        h.state.clone(),
        "application/json",
        format!(r#"{{"envelope_id":"{envelope_id}","status":"Completed"}}"#),
    )
    .await;
    assert_eq!(status, 200);

    let record = wait_for_notification(&pool, &envelope_id).await;
    assert_eq!(record.status, "completed");
    assert!(record.signed_at.is_some());
    assert_eq!(record.notification_status.as_deref(), Some("success_200"));
}

#[tokio::test]
async fn test_replayed_webhook_is_idempotent() {
    let pool = test_pool().await;
    let envelope_id = format!("env-{}", uuid::Uuid::new_v4());
    let provider = mock_provider(&envelope_id).await;
    let callback = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/cb"))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&callback)
        .await;

    let h = harness(pool.clone(), &provider).await;
    h.state
        .submission
        .submit(submit_request(&format!("{}/cb", callback.uri())))
        .await
        .expect("submit");

    let body = format!(r#"{{"envelope_id":"{envelope_id}","status":"Completed"}}"#);
    assert_eq!(
        post_webhook(h.state.clone(), "application/json", body.clone()).await,
        200
    );
    let first = wait_for_notification(&pool, &envelope_id).await;
    let signed_at = first.signed_at.expect("signed_at set");

    assert_eq!(
        post_webhook(h.state.clone(), "application/json", body).await,
        200
    );
    tokio::time::sleep(Duration::from_millis(300)).await;

    let replayed = EnvelopeTracking::find_by_envelope_id(&pool, &envelope_id)
        .await
        .expect("query")
        .expect("record exists");
    assert_eq!(replayed.status, "completed");
    assert_eq!(replayed.signed_at, Some(signed_at));

    // Still exactly one row for the envelope.
    let all = EnvelopeTracking::list_recent(&pool).await.expect("list");
    assert_eq!(
        all.iter().filter(|r| r.envelope_id == envelope_id).count(),
        1
    );
}

#[tokio::test]
async fn test_unreachable_callback_records_failure() {
    let pool = test_pool().await;
    let envelope_id = format!("env-{}", uuid::Uuid::new_v4());
    let provider = mock_provider(&envelope_id).await;

    let h = harness(pool.clone(), &provider).await;
    h.state
        .submission
        .submit(submit_request("http://127.0.0.1:9/cb"))
        .await
        .expect("submit");

    let status = post_webhook(
        h.state.clone(),
        "application/json",
        format!(r#"{{"envelope_id":"{envelope_id}","status":"Voided"}}"#),
    )
    .await;
    assert_eq!(status, 200, "delivery failure never surfaces to the webhook");

    let record = wait_for_notification(&pool, &envelope_id).await;
    assert_eq!(record.status, "voided");
    assert!(record
        .notification_status
        .as_deref()
        .unwrap()
        .starts_with("failed_"));
    assert!(record.signed_at.is_none());
}

#[tokio::test]
async fn test_xml_webhook_drives_the_same_flow() {
    let pool = test_pool().await;
    let envelope_id = format!("env-{}", uuid::Uuid::new_v4());
    let provider = mock_provider(&envelope_id).await;
    let callback = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/cb"))
        .and(body_partial_json(json!({"status": "declined"})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&callback)
        .await;

    let h = harness(pool.clone(), &provider).await;
    h.state
        .submission
        .submit(submit_request(&format!("{}/cb", callback.uri())))
        .await
        .expect("submit");

    let xml = format!(
        "<DocuSignEnvelopeInformation><EnvelopeStatus>\
         <EnvelopeID>{envelope_id}</EnvelopeID><Status>Declined</Status>\
         </EnvelopeStatus></DocuSignEnvelopeInformation>"
    );
    assert_eq!(post_webhook(h.state.clone(), "text/xml", xml).await, 200);

    let record = wait_for_notification(&pool, &envelope_id).await;
    assert_eq!(record.status, "declined");
    assert_eq!(record.notification_status.as_deref(), Some("success_200"));
}
