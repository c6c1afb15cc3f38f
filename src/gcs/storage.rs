//! Object storage boundary
//!
//! Upload and signed-URL minting against Google Cloud Storage. Both
//! operations are non-fatal to a request that already converted
//! successfully; the handler reports their errors in the response body.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::Utc;
use log::{error, info};
use serde_json::{Value, json};

use crate::auth::TokenProvider;
use crate::error::{ConvertError, Result};
use crate::gcs::sign;

const STORAGE_BASE: &str = "https://storage.googleapis.com";
const IAM_BASE: &str = "https://iamcredentials.googleapis.com";

/// Contract the handler depends on for storing artifacts
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload a local file, returning its `gs://bucket/key` location
    async fn upload(&self, local_path: &Path, bucket: &str, key: &str) -> Result<String>;

    /// Mint a time-limited read URL for a stored object
    async fn sign_url(&self, bucket: &str, key: &str, ttl_secs: u64) -> Result<String>;
}

/// GCS-backed implementation using the JSON API and IAM signBlob
pub struct GcsStore {
    http: reqwest::Client,
    tokens: Arc<dyn TokenProvider>,
    storage_base: String,
    iam_base: String,
}

impl GcsStore {
    pub fn new(http: reqwest::Client, tokens: Arc<dyn TokenProvider>) -> Self {
        Self {
            http,
            tokens,
            storage_base: STORAGE_BASE.to_string(),
            iam_base: IAM_BASE.to_string(),
        }
    }

    /// Point at alternative endpoints (storage emulator)
    pub fn with_base_urls(
        http: reqwest::Client,
        tokens: Arc<dyn TokenProvider>,
        storage_base: impl Into<String>,
        iam_base: impl Into<String>,
    ) -> Self {
        Self {
            http,
            tokens,
            storage_base: storage_base.into(),
            iam_base: iam_base.into(),
        }
    }

    /// Sign `payload` with the service account's key via the IAM API
    async fn sign_blob(&self, token: &str, service_account: &str, payload: &str) -> Result<Vec<u8>> {
        let url = format!(
            "{}/v1/projects/-/serviceAccounts/{}:signBlob",
            self.iam_base, service_account
        );
        let body = json!({ "payload": BASE64.encode(payload) });

        let response: Value = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?
            .error_for_status()
            .map_err(|e| ConvertError::Storage(format!("signBlob failed: {}", e)))?
            .json()
            .await?;

        let signed = response["signedBlob"]
            .as_str()
            .ok_or_else(|| ConvertError::Storage("signBlob response missing signedBlob".to_string()))?;

        BASE64
            .decode(signed)
            .map_err(|e| ConvertError::Storage(format!("signBlob returned invalid base64: {}", e)))
    }
}

#[async_trait]
impl ObjectStore for GcsStore {
    async fn upload(&self, local_path: &Path, bucket: &str, key: &str) -> Result<String> {
        info!(
            "Uploading {} to gs://{}/{}",
            local_path.display(),
            bucket,
            key
        );

        let token = self
            .tokens
            .token()
            .await
            .map_err(|e| ConvertError::Storage(e.to_string()))?;
        let bytes = tokio::fs::read(local_path).await?;

        let url = format!(
            "{}/upload/storage/v1/b/{}/o?uploadType=media&name={}",
            self.storage_base,
            bucket,
            urlencoding::encode(key)
        );

        self.http
            .post(&url)
            .bearer_auth(token)
            .header("Content-Type", "text/csv")
            .body(bytes)
            .send()
            .await?
            .error_for_status()
            .map_err(|e| ConvertError::Storage(format!("upload failed: {}", e)))?;

        let location = format!("gs://{}/{}", bucket, key);
        info!("File uploaded to {}", location);
        Ok(location)
    }

    async fn sign_url(&self, bucket: &str, key: &str, ttl_secs: u64) -> Result<String> {
        info!(
            "Generating signed URL for gs://{}/{} with expiration {} seconds",
            bucket, key, ttl_secs
        );

        let token = self
            .tokens
            .token()
            .await
            .map_err(|e| ConvertError::Storage(e.to_string()))?;
        let service_account = self
            .tokens
            .service_account_email()
            .await
            .map_err(|e| ConvertError::Storage(e.to_string()))?;

        let now = Utc::now();
        let path = sign::encoded_path(bucket, key);
        let query = sign::canonical_query(&service_account, &now, ttl_secs);
        let canonical = sign::canonical_request(&path, &query);
        let payload = sign::string_to_sign(&now, &canonical);

        let signature = self.sign_blob(&token, &service_account, &payload).await?;
        let url = sign::signed_url(&path, &query, &hex::encode(signature));

        info!("Generated signed URL with expiration {} seconds", ttl_secs);
        Ok(url)
    }
}

/// In-memory store for tests: records uploads, optionally fails on demand
pub struct MockObjectStore {
    pub fail_upload: bool,
    pub fail_sign: bool,
    uploads: std::sync::Mutex<Vec<(String, String)>>,
}

impl MockObjectStore {
    pub fn new() -> Self {
        Self {
            fail_upload: false,
            fail_sign: false,
            uploads: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn failing_upload() -> Self {
        Self {
            fail_upload: true,
            ..Self::new()
        }
    }

    pub fn failing_sign() -> Self {
        Self {
            fail_sign: true,
            ..Self::new()
        }
    }

    /// (bucket, key) pairs uploaded so far
    pub fn uploads(&self) -> Vec<(String, String)> {
        self.uploads.lock().unwrap().clone()
    }
}

impl Default for MockObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ObjectStore for MockObjectStore {
    async fn upload(&self, local_path: &Path, bucket: &str, key: &str) -> Result<String> {
        if self.fail_upload {
            error!("Mock upload failure for {}", local_path.display());
            return Err(ConvertError::Storage("mock upload failure".to_string()));
        }
        self.uploads
            .lock()
            .unwrap()
            .push((bucket.to_string(), key.to_string()));
        Ok(format!("gs://{}/{}", bucket, key))
    }

    async fn sign_url(&self, bucket: &str, key: &str, ttl_secs: u64) -> Result<String> {
        if self.fail_sign {
            return Err(ConvertError::Storage("mock sign failure".to_string()));
        }
        Ok(format!(
            "https://storage.googleapis.com/{}/{}?X-Goog-Expires={}&X-Goog-Signature=mock",
            bucket, key, ttl_secs
        ))
    }
}
