//! Credential acquisition
//!
//! Bearer tokens come from the runtime's ambient service account via the GCE
//! metadata server. The trait seam lets tests and alternative deployments
//! inject their own source.

use async_trait::async_trait;
use log::info;
use serde::Deserialize;

use crate::error::{ConvertError, Result};

const METADATA_BASE: &str = "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default";

/// Supplies bearer tokens and the identity they belong to
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Fetch a fresh access token for cloud-platform scoped calls
    async fn token(&self) -> Result<String>;

    /// Email of the service account the tokens are minted for
    async fn service_account_email(&self) -> Result<String>;
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// TokenProvider backed by the GCE metadata server
pub struct MetadataTokenProvider {
    http: reqwest::Client,
    base_url: String,
}

impl MetadataTokenProvider {
    pub fn new(http: reqwest::Client) -> Self {
        Self {
            http,
            base_url: METADATA_BASE.to_string(),
        }
    }

    /// Point at a different metadata endpoint (emulators)
    pub fn with_base_url(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    async fn metadata_get(&self, path: &str) -> Result<reqwest::Response> {
        let response = self
            .http
            .get(format!("{}/{}", self.base_url, path))
            .header("Metadata-Flavor", "Google")
            .send()
            .await?
            .error_for_status()
            .map_err(|e| ConvertError::Auth(e.to_string()))?;
        Ok(response)
    }
}

#[async_trait]
impl TokenProvider for MetadataTokenProvider {
    async fn token(&self) -> Result<String> {
        info!("Requesting access token from metadata server");
        let token: TokenResponse = self.metadata_get("token").await?.json().await?;
        Ok(token.access_token)
    }

    async fn service_account_email(&self) -> Result<String> {
        let email = self.metadata_get("email").await?.text().await?;
        Ok(email.trim().to_string())
    }
}

/// Fixed-credential provider for tests
pub struct StaticTokenProvider {
    token: String,
    email: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            email: email.into(),
        }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn token(&self) -> Result<String> {
        Ok(self.token.clone())
    }

    async fn service_account_email(&self) -> Result<String> {
        Ok(self.email.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_provider_returns_fixed_values() {
        let provider = StaticTokenProvider::new("tok-123", "svc@example.iam.gserviceaccount.com");
        assert_eq!(provider.token().await.unwrap(), "tok-123");
        assert_eq!(
            provider.service_account_email().await.unwrap(),
            "svc@example.iam.gserviceaccount.com"
        );
    }

    #[tokio::test]
    async fn test_metadata_provider_unreachable_is_auth_or_http_error() {
        let provider = MetadataTokenProvider::with_base_url(
            reqwest::Client::new(),
            "http://127.0.0.1:1/computeMetadata/v1/instance/service-accounts/default",
        );
        assert!(provider.token().await.is_err());
    }
}
