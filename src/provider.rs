//! API key validation for the remote service.
//!
//! A key passes when it is present, at least [`MIN_API_KEY_LEN`] characters
//! after trimming, and a session listing made with it does not fail for an
//! authorization or connectivity reason. Any other listing failure lets the
//! key through with a warning; the key may still be good.

use crate::sandbox::{classify_error, ErrorClass, StatelessClient};
use std::time::Duration;
use thiserror::Error;

pub const MIN_API_KEY_LEN: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CredentialError {
    #[error("API Key is required")]
    Missing,

    #[error("API Key format appears to be invalid")]
    Malformed,

    #[error("API Key validation failed: {0}")]
    Rejected(String),

    #[error("Network connection failed, please check network settings: {0}")]
    Network(String),

    #[error("Credential validation failed: {0}")]
    Client(String),
}

/// Outcome of a key that was not rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validation {
    /// The probe call succeeded.
    Verified,
    /// The probe failed for a reason unrelated to the key.
    Unverified { reason: String },
}

/// Local shape check; no network.
pub fn check_api_key(api_key: Option<&str>) -> Result<&str, CredentialError> {
    let key = api_key
        .filter(|k| !k.is_empty())
        .ok_or(CredentialError::Missing)?;
    if key.trim().chars().count() < MIN_API_KEY_LEN {
        return Err(CredentialError::Malformed);
    }
    Ok(key.trim())
}

/// Check the key locally, then probe the service at `endpoint` with it.
pub async fn validate_credentials(
    api_key: Option<&str>,
    endpoint: &str,
    request_timeout: Duration,
) -> Result<Validation, CredentialError> {
    let key = check_api_key(api_key)?;
    let client = StatelessClient::new(key, endpoint, request_timeout)
        .map_err(|e| CredentialError::Client(e.to_string()))?;
    probe(&client).await
}

/// List sessions and judge the key by how the call fails, if it does.
pub async fn probe(client: &StatelessClient) -> Result<Validation, CredentialError> {
    let listing = client.list_sessions().await;
    let Some(error) = listing.error() else {
        tracing::info!("API key verified");
        return Ok(Validation::Verified);
    };

    match classify_error(error) {
        ErrorClass::Credential => {
            tracing::warn!(error, "API key rejected");
            Err(CredentialError::Rejected(error.to_string()))
        }
        ErrorClass::Connectivity => {
            tracing::warn!(error, "could not reach the service to verify the API key");
            Err(CredentialError::Network(error.to_string()))
        }
        ErrorClass::Other => {
            tracing::warn!(error, "API key could not be verified; accepting it");
            Ok(Validation::Unverified {
                reason: error.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::mock::MockBackend;
    use crate::sandbox::BackendError;
    use std::sync::Arc;

    fn client(error: Option<BackendError>) -> StatelessClient {
        let mock = MockBackend::new();
        if let Some(e) = error {
            mock.fail_list(e);
        }
        StatelessClient::with_backend(Arc::new(mock))
    }

    #[test]
    fn shape_checks() {
        assert_eq!(check_api_key(None), Err(CredentialError::Missing));
        assert_eq!(check_api_key(Some("")), Err(CredentialError::Missing));
        assert_eq!(check_api_key(Some("  short   ")), Err(CredentialError::Malformed));
        assert_eq!(check_api_key(Some(" akm-1234567 ")), Ok("akm-1234567"));
    }

    #[tokio::test]
    async fn successful_probe_verifies() {
        assert_eq!(probe(&client(None)).await, Ok(Validation::Verified));
    }

    #[tokio::test]
    async fn unauthorized_is_rejected() {
        let err = probe(&client(Some(BackendError::api(
            "Unauthorized (HTTP 401 Unauthorized): bad key",
        ))))
        .await
        .unwrap_err();
        assert!(matches!(err, CredentialError::Rejected(_)));
    }

    #[tokio::test]
    async fn network_failure_is_rejected_with_network_message() {
        let err = probe(&client(Some(BackendError::Network("connection refused".into()))))
            .await
            .unwrap_err();
        assert!(matches!(err, CredentialError::Network(_)));
        assert!(err.to_string().starts_with("Network connection failed"));
    }

    #[tokio::test]
    async fn other_failures_accept_with_warning() {
        let outcome = probe(&client(Some(BackendError::api("quota exceeded"))))
            .await
            .unwrap();
        assert!(matches!(outcome, Validation::Unverified { reason } if reason.contains("quota")));
    }

    #[tokio::test]
    async fn missing_key_never_probes() {
        let err = validate_credentials(None, "http://127.0.0.1:9", Duration::from_secs(1))
            .await
            .unwrap_err();
        assert_eq!(err, CredentialError::Missing);
    }
}
