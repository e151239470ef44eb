//! JWT grant authentication and access token caching.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

use crate::config::DocuSignCredentials;
use crate::error::{DocuSignError, DocuSignResult};

/// Token lifetime requested in the JWT grant assertion.
const TOKEN_TTL_SECS: i64 = 3600;

/// Safety margin subtracted from the provider-stated lifetime so a token
/// never expires mid-call.
const TOKEN_EXPIRY_MARGIN_SECS: i64 = 100;

/// OAuth scopes required for envelope operations on behalf of a user.
const TOKEN_SCOPES: &str = "signature impersonation";

/// OAuth2 token response from the provider.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
    #[allow(dead_code)]
    token_type: String,
}

/// JWT grant assertion claims.
#[derive(Debug, Serialize)]
struct GrantClaims<'a> {
    iss: &'a str,
    sub: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
    scope: &'a str,
}

/// Cached access token.
#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    /// Returns true once the adjusted expiry has passed.
    fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

/// Process-wide cache for the provider access token.
///
/// A fresh token is issued only when the cache is empty or past its
/// adjusted expiry. The write lock is held across the exchange, so
/// concurrent cache misses perform a single credential exchange and the
/// losers pick up the winner's token.
#[derive(Debug, Clone)]
pub struct TokenCache {
    http_client: reqwest::Client,
    cached_token: Arc<RwLock<Option<CachedToken>>>,
    /// Overrides the `https://{auth_host}` base, for tests.
    auth_base_override: Option<String>,
}

impl TokenCache {
    /// Create a new token cache with its own HTTP client.
    ///
    /// # Errors
    ///
    /// Returns `DocuSignError::Internal` if the HTTP client cannot be built.
    pub fn new() -> DocuSignResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| DocuSignError::Internal(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            http_client,
            cached_token: Arc::new(RwLock::new(None)),
            auth_base_override: None,
        })
    }

    /// Override the OAuth base URL (normally derived from the credentials'
    /// auth host).
    #[must_use]
    pub fn with_auth_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.auth_base_override = Some(base_url.into());
        self
    }

    /// Get a valid access token, exchanging credentials if necessary.
    ///
    /// # Errors
    ///
    /// Returns `DocuSignError::Credential` when the provider rejects the
    /// exchange; a rejected attempt is never cached.
    pub async fn get_token(&self, credentials: &DocuSignCredentials) -> DocuSignResult<String> {
        {
            let cache = self.cached_token.read().await;
            if let Some(ref token) = *cache {
                if !token.is_expired() {
                    debug!("Using cached access token");
                    return Ok(token.access_token.clone());
                }
            }
        }

        // Hold the write lock across the exchange so concurrent misses
        // result in exactly one request.
        let mut cache = self.cached_token.write().await;
        if let Some(ref token) = *cache {
            if !token.is_expired() {
                debug!("Access token refreshed by a concurrent caller");
                return Ok(token.access_token.clone());
            }
        }

        debug!("Requesting new access token via JWT grant");
        let new_token = self.exchange(credentials).await?;
        let access_token = new_token.access_token.clone();
        *cache = Some(new_token);

        Ok(access_token)
    }

    /// Invalidate the cached token, forcing an exchange on next use.
    pub async fn invalidate(&self) {
        let mut cache = self.cached_token.write().await;
        *cache = None;
    }

    /// Perform the JWT grant exchange.
    async fn exchange(&self, credentials: &DocuSignCredentials) -> DocuSignResult<CachedToken> {
        let assertion = build_grant_assertion(credentials)?;

        let token_url = match &self.auth_base_override {
            Some(base) => format!("{base}/oauth/token"),
            None => format!("https://{}/oauth/token", credentials.auth_host),
        };

        let params = [
            ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
            ("assertion", assertion.as_str()),
        ];

        let response = self
            .http_client
            .post(&token_url)
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(DocuSignError::Credential { status, body });
        }

        let token_response: TokenResponse = response.json().await?;

        let expires_at = Utc::now()
            + Duration::seconds(token_response.expires_in - TOKEN_EXPIRY_MARGIN_SECS);

        debug!(expires_at = %expires_at, "Acquired new access token");

        Ok(CachedToken {
            access_token: token_response.access_token,
            expires_at,
        })
    }
}

/// Build the signed RS256 assertion for the JWT grant flow.
fn build_grant_assertion(credentials: &DocuSignCredentials) -> DocuSignResult<String> {
    let key = EncodingKey::from_rsa_pem(credentials.private_key_pem.as_bytes())
        .map_err(|e| DocuSignError::InvalidKey(format!("Invalid private key: {e}")))?;

    let now = Utc::now().timestamp();
    let claims = GrantClaims {
        iss: &credentials.integrator_key,
        sub: &credentials.user_id,
        aud: &credentials.auth_host,
        iat: now,
        exp: now + TOKEN_TTL_SECS,
        scope: TOKEN_SCOPES,
    };

    let header = Header::new(Algorithm::RS256);
    encode(&header, &claims, &key)
        .map_err(|e| DocuSignError::Internal(format!("Failed to sign grant assertion: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cached_token_expiry() {
        let token = CachedToken {
            access_token: "tok".to_string(),
            expires_at: Utc::now() + Duration::minutes(10),
        };
        assert!(!token.is_expired());

        let stale = CachedToken {
            access_token: "tok".to_string(),
            expires_at: Utc::now() - Duration::seconds(1),
        };
        assert!(stale.is_expired());
    }

    #[test]
    fn test_grant_assertion_rejects_garbage_key() {
        let creds = DocuSignCredentials {
            integrator_key: "ik".to_string(),
            user_id: "user".to_string(),
            auth_host: "account-d.docusign.com".to_string(),
            private_key_pem: "not a pem".to_string(),
        };
        let err = build_grant_assertion(&creds).unwrap_err();
        assert!(matches!(err, DocuSignError::InvalidKey(_)));
    }
}
