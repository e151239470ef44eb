//! Envelope submission coordination.
//!
//! Validates the caller's request, builds the envelope definition, obtains
//! an access token, submits to the signing provider, and records the
//! tracking row. The tracking insert is best-effort: once the provider has
//! accepted the envelope, the submission is a success even if bookkeeping
//! fails, and the outcome says which of the two happened.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use signrelay_db::{EnvelopeTracking, NewEnvelopeTracking};
use signrelay_docusign::{
    build_envelope_definition, DocuSignClient, DocuSignCredentials, DocuSignEnvironment,
    SignerInfo, TokenCache,
};
use sqlx::PgPool;

use crate::error::{ApiError, ApiResult};
use crate::validation::validate_callback_url;

/// Provider-side configuration resolved at startup.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Sandbox or production host selection.
    pub environment: DocuSignEnvironment,

    /// Default REST base path; callers may override per request.
    pub base_path: String,

    /// Default account id when the caller supplies none.
    pub account_id: Option<String>,

    /// Externally-configured credentials when callers do not pass their own.
    pub credentials: Option<DocuSignCredentials>,
}

/// Caller request assembled from the multipart form.
#[derive(Debug, Default)]
pub struct SubmissionRequest {
    /// JSON text of `[{email, name}, ...]`; a bare object is accepted and
    /// wrapped.
    pub signers_json: Option<String>,
    /// Single-signer fallback fields.
    pub email: Option<String>,
    pub name: Option<String>,

    pub account_id: Option<String>,
    pub callback_url: Option<String>,

    /// Per-request credentials (override the configured ones).
    pub integrator_key: Option<String>,
    pub user_id: Option<String>,
    /// Base64-encoded PEM private key.
    pub private_key_b64: Option<String>,
    pub auth_server: Option<String>,
    pub base_path: Option<String>,

    /// PDF file bytes.
    pub pdf: Option<Vec<u8>>,

    /// Best-effort caller origin, derived from forwarding headers.
    pub requester_host: String,
}

/// Whether the tracking row made it into the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingOutcome {
    Recorded,
    Failed,
}

impl TrackingOutcome {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackingOutcome::Recorded => "recorded",
            TrackingOutcome::Failed => "failed",
        }
    }
}

/// Result of a successful submission.
#[derive(Debug, Clone)]
pub struct SubmissionOutcome {
    pub envelope_id: String,
    pub tracking: TrackingOutcome,
}

/// Parse the caller-supplied signers field.
///
/// Text that does not look like an array is wrapped in brackets first, so
/// a single bare `{"email": ..., "name": ...}` object is accepted.
pub fn parse_signers(raw: &str) -> ApiResult<Vec<SignerInfo>> {
    let trimmed = raw.trim();
    let wrapped;
    let json_text = if trimmed.starts_with('[') {
        trimmed
    } else {
        wrapped = format!("[{trimmed}]");
        &wrapped
    };

    let signers: Vec<SignerInfo> = serde_json::from_str(json_text)
        .map_err(|e| ApiError::Validation(format!("signers must be valid JSON: {e}")))?;

    if signers.is_empty() {
        return Err(ApiError::Validation(
            "signers must contain at least one recipient".to_string(),
        ));
    }
    for signer in &signers {
        if signer.email.trim().is_empty() || signer.name.trim().is_empty() {
            return Err(ApiError::Validation(
                "each signer needs a non-empty email and name".to_string(),
            ));
        }
    }

    Ok(signers)
}

/// Coordinates envelope submission against the signing provider.
pub struct SubmissionService {
    pool: PgPool,
    client: DocuSignClient,
    tokens: TokenCache,
    provider: ProviderConfig,
    webhook_url: String,
}

impl SubmissionService {
    /// Create a new submission service.
    ///
    /// `webhook_url` is this service's own externally-reachable webhook
    /// endpoint, handed to the provider in every envelope's
    /// event-notification subscription.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Internal` if an HTTP client cannot be built.
    pub fn new(pool: PgPool, provider: ProviderConfig, webhook_url: String) -> ApiResult<Self> {
        Ok(Self {
            pool,
            client: DocuSignClient::new()?,
            tokens: TokenCache::new()?,
            provider,
            webhook_url,
        })
    }

    /// Replace the token cache (tests point it at a mock OAuth host).
    #[must_use]
    pub fn with_token_cache(mut self, tokens: TokenCache) -> Self {
        self.tokens = tokens;
        self
    }

    /// Submit one PDF for signature.
    pub async fn submit(&self, request: SubmissionRequest) -> ApiResult<SubmissionOutcome> {
        let pdf = match request.pdf.as_deref() {
            Some(bytes) if !bytes.is_empty() => bytes,
            _ => return Err(ApiError::Validation("Missing PDF file".to_string())),
        };

        let signers = self.resolve_signers(&request)?;

        let account_id = request
            .account_id
            .clone()
            .or_else(|| self.provider.account_id.clone())
            .ok_or_else(|| ApiError::Validation("Missing account_id".to_string()))?;

        let callback_url = request
            .callback_url
            .clone()
            .ok_or_else(|| ApiError::Validation("Missing callback_url".to_string()))?;
        validate_callback_url(&callback_url)?;

        let credentials = self.resolve_credentials(&request)?;

        let definition = build_envelope_definition(pdf, &signers, &self.webhook_url);

        let access_token = self.tokens.get_token(&credentials).await?;

        let base_path = request
            .base_path
            .as_deref()
            .unwrap_or(&self.provider.base_path);

        let summary = self
            .client
            .create_envelope(base_path, &account_id, &access_token, &definition)
            .await?;

        // The envelope is already sent provider-side; a tracking failure is
        // reported in the outcome, not as an error.
        let tracking = match EnvelopeTracking::create(
            &self.pool,
            NewEnvelopeTracking {
                envelope_id: summary.envelope_id.clone(),
                callback_url,
                requester_host: request.requester_host.clone(),
            },
        )
        .await
        {
            Ok(_) => TrackingOutcome::Recorded,
            Err(e) => {
                tracing::error!(
                    target: "submission",
                    envelope_id = %summary.envelope_id,
                    error = %e,
                    "Envelope sent but tracking insert failed"
                );
                TrackingOutcome::Failed
            }
        };

        tracing::info!(
            target: "submission",
            envelope_id = %summary.envelope_id,
            signer_count = signers.len(),
            tracking = tracking.as_str(),
            "Envelope submitted"
        );

        Ok(SubmissionOutcome {
            envelope_id: summary.envelope_id,
            tracking,
        })
    }

    /// Signers come either as a JSON field or as bare email/name fields.
    fn resolve_signers(&self, request: &SubmissionRequest) -> ApiResult<Vec<SignerInfo>> {
        if let Some(ref raw) = request.signers_json {
            return parse_signers(raw);
        }

        match (&request.email, &request.name) {
            (Some(email), Some(name)) if !email.trim().is_empty() && !name.trim().is_empty() => {
                Ok(vec![SignerInfo {
                    email: email.clone(),
                    name: name.clone(),
                }])
            }
            _ => Err(ApiError::Validation(
                "Missing signer information: provide signers or email and name".to_string(),
            )),
        }
    }

    /// Per-request credentials win over the configured ones.
    fn resolve_credentials(&self, request: &SubmissionRequest) -> ApiResult<DocuSignCredentials> {
        if let (Some(integrator_key), Some(user_id), Some(private_key_b64)) = (
            &request.integrator_key,
            &request.user_id,
            &request.private_key_b64,
        ) {
            let decoded = BASE64.decode(private_key_b64.trim()).map_err(|e| {
                ApiError::Validation(format!("private_key_b64 is not valid base64: {e}"))
            })?;
            let private_key_pem = String::from_utf8(decoded).map_err(|_| {
                ApiError::Validation("private_key_b64 does not decode to UTF-8 PEM".to_string())
            })?;

            return Ok(DocuSignCredentials {
                integrator_key: integrator_key.clone(),
                user_id: user_id.clone(),
                auth_host: request
                    .auth_server
                    .clone()
                    .unwrap_or_else(|| self.provider.environment.auth_host().to_string()),
                private_key_pem,
            });
        }

        self.provider
            .credentials
            .clone()
            .ok_or_else(|| ApiError::Validation("Missing provider credentials".to_string()))
    }
}
