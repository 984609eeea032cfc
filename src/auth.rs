//! Credential resolution for the Google API clients.
//!
//! One token provider is built per run and shared by the storage and
//! vision clients. When the config names a service-account key file it is
//! used directly; otherwise the application-default chain applies
//! (`GOOGLE_APPLICATION_CREDENTIALS`, gcloud user credentials, metadata
//! server), matching what the official SDKs do.

use crate::config::BatchConfig;
use crate::error::BatchError;
use gcp_auth::{CustomServiceAccount, TokenProvider};
use std::sync::Arc;
use tracing::debug;

/// OAuth scope shared by the storage and vision APIs.
pub(crate) const CLOUD_SCOPE: &[&str] = &["https://www.googleapis.com/auth/cloud-platform"];

/// Resolve a token provider from the batch configuration.
pub async fn credentials_provider(
    config: &BatchConfig,
) -> Result<Arc<dyn TokenProvider>, BatchError> {
    match &config.credentials {
        Some(path) => {
            debug!("Using service-account key file: {}", path.display());
            let account = CustomServiceAccount::from_file(path).map_err(|e| BatchError::Auth {
                reason: format!("service-account key '{}': {e}", path.display()),
            })?;
            Ok(Arc::new(account))
        }
        None => {
            debug!("Using application-default credentials");
            gcp_auth::provider().await.map_err(|e| BatchError::Auth {
                reason: e.to_string(),
            })
        }
    }
}

/// Fetch a bearer token string for one API request.
pub(crate) async fn bearer(auth: &Arc<dyn TokenProvider>) -> Result<String, BatchError> {
    let token = auth
        .token(CLOUD_SCOPE)
        .await
        .map_err(|e| BatchError::Auth {
            reason: e.to_string(),
        })?;
    Ok(token.as_str().to_string())
}
