//! Application configuration loaded from environment variables.
//!
//! Required variables must be present and valid, or the application exits
//! with a clear error message before binding anything.

use std::env;

use signrelay_docusign::{DocuSignCredentials, DocuSignEnvironment};
use thiserror::Error;

/// Configuration errors that can occur during environment loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(String),

    #[error("Invalid value for {var}: {message}")]
    InvalidValue { var: String, message: String },

    #[error("Failed to parse port: {0}")]
    InvalidPort(#[from] std::num::ParseIntError),
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection string.
    pub database_url: String,

    /// This service's externally-reachable base URL, used to construct the
    /// webhook URL handed to the signing provider.
    pub public_base_url: String,

    /// Server bind address.
    pub host: String,

    /// Server listen port.
    pub port: u16,

    /// Tracing filter directive.
    pub rust_log: String,

    /// Signing provider environment (sandbox or production).
    pub docusign_env: DocuSignEnvironment,

    /// REST base path for envelope operations.
    pub base_path: String,

    /// Default provider account id, when callers do not supply one.
    pub account_id: Option<String>,

    /// Externally-configured JWT grant credentials, when callers do not
    /// supply their own per request.
    pub credentials: Option<DocuSignCredentials>,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or values
    /// are invalid.
    ///
    /// # Required Variables
    ///
    /// - `DATABASE_URL` — PostgreSQL connection string
    /// - `PUBLIC_BASE_URL` — externally-reachable base URL of this service
    ///
    /// # Optional Variables
    ///
    /// - `HOST` (default: "0.0.0.0"), `PORT` (default: 8080)
    /// - `RUST_LOG` (default: "info")
    /// - `DOCUSIGN_ENV` — "sandbox" (default) or "production"
    /// - `DOCUSIGN_BASE_PATH` — overrides the environment's REST host
    /// - `DOCUSIGN_ACCOUNT_ID` — default account id
    /// - `DOCUSIGN_INTEGRATOR_KEY`, `DOCUSIGN_USER_ID`,
    ///   `DOCUSIGN_PRIVATE_KEY_PATH` — externally-configured credentials
    ///   (all three together, or none)
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (development only)
        let _ = dotenvy::dotenv();

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| ConfigError::MissingVar("DATABASE_URL".to_string()))?;

        let public_base_url = env::var("PUBLIC_BASE_URL")
            .map_err(|_| ConfigError::MissingVar("PUBLIC_BASE_URL".to_string()))?;
        if !public_base_url.starts_with("http://") && !public_base_url.starts_with("https://") {
            return Err(ConfigError::InvalidValue {
                var: "PUBLIC_BASE_URL".to_string(),
                message: "Must start with http:// or https://".to_string(),
            });
        }

        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        let port: u16 = env::var("PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()?;
        if port == 0 {
            return Err(ConfigError::InvalidValue {
                var: "PORT".to_string(),
                message: "Port must be between 1 and 65535".to_string(),
            });
        }

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let docusign_env = DocuSignEnvironment::from_env_str(
            &env::var("DOCUSIGN_ENV").unwrap_or_else(|_| "sandbox".to_string()),
        );

        let base_path = env::var("DOCUSIGN_BASE_PATH")
            .unwrap_or_else(|_| docusign_env.default_base_path().to_string());

        let account_id = env::var("DOCUSIGN_ACCOUNT_ID").ok().filter(|v| !v.is_empty());

        let credentials = load_credentials(docusign_env)?;

        Ok(Config {
            database_url,
            public_base_url,
            host,
            port,
            rust_log,
            docusign_env,
            base_path,
            account_id,
            credentials,
        })
    }

    /// Socket address string to bind.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Webhook URL handed to the signing provider.
    #[must_use]
    pub fn webhook_url(&self) -> String {
        format!(
            "{}/webhook/docusign",
            self.public_base_url.trim_end_matches('/')
        )
    }
}

/// Load externally-configured credentials, if all pieces are present.
///
/// A partially-configured credential set is a configuration mistake, not a
/// fallback to per-request credentials, so it fails loudly.
fn load_credentials(
    environment: DocuSignEnvironment,
) -> Result<Option<DocuSignCredentials>, ConfigError> {
    let integrator_key = env::var("DOCUSIGN_INTEGRATOR_KEY").ok().filter(|v| !v.is_empty());
    let user_id = env::var("DOCUSIGN_USER_ID").ok().filter(|v| !v.is_empty());
    let key_path = env::var("DOCUSIGN_PRIVATE_KEY_PATH").ok().filter(|v| !v.is_empty());

    match (integrator_key, user_id, key_path) {
        (None, None, None) => Ok(None),
        (Some(integrator_key), Some(user_id), Some(key_path)) => {
            let private_key_pem =
                std::fs::read_to_string(&key_path).map_err(|e| ConfigError::InvalidValue {
                    var: "DOCUSIGN_PRIVATE_KEY_PATH".to_string(),
                    message: format!("Cannot read {key_path}: {e}"),
                })?;

            if !private_key_pem.contains("-----BEGIN") {
                return Err(ConfigError::InvalidValue {
                    var: "DOCUSIGN_PRIVATE_KEY_PATH".to_string(),
                    message: "File is not PEM (should contain -----BEGIN)".to_string(),
                });
            }

            Ok(Some(DocuSignCredentials {
                integrator_key,
                user_id,
                auth_host: environment.auth_host().to_string(),
                private_key_pem,
            }))
        }
        _ => Err(ConfigError::InvalidValue {
            var: "DOCUSIGN_INTEGRATOR_KEY".to_string(),
            message: "DOCUSIGN_INTEGRATOR_KEY, DOCUSIGN_USER_ID and \
                      DOCUSIGN_PRIVATE_KEY_PATH must be set together"
                .to_string(),
        }),
    }
}
