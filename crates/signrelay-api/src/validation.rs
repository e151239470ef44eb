//! Callback URL validation.

use crate::error::ApiError;

/// Validate a requester-supplied callback URL.
///
/// Checks the URL parses, uses http or https, and has a host. Callback
/// targets are the caller's own infrastructure, so no address filtering is
/// applied beyond the scheme.
pub fn validate_callback_url(raw: &str) -> Result<(), ApiError> {
    let parsed = url::Url::parse(raw)
        .map_err(|e| ApiError::Validation(format!("Invalid callback_url: {e}")))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(ApiError::Validation(format!(
                "Unsupported callback_url scheme: {scheme}"
            )));
        }
    }

    if parsed.host_str().is_none() {
        return Err(ApiError::Validation(
            "callback_url must have a host".to_string(),
        ));
    }

    Ok(())
}
