//! Service configuration
//!
//! Built once at startup from environment variables and passed by reference
//! into each component. No ambient globals.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConvertError, Result};

/// Top-level service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub log_level: String,
    pub google_cloud_project_id: String,
    pub google_cloud_region: String,
    pub ai_platform_endpoint: String,
    pub ai_model_name: String,
    pub gcs_bucket_name: String,
    pub gcs_default_folder: String,
    pub signed_url_expiration: u64,
    pub max_retry_attempts: u32,
    pub request_timeout_secs: u64,
    pub python_interpreter: String,
    pub listen_port: u16,
}

impl Default for Config {
    fn default() -> Self {
        let region = "us-central1".to_string();
        Self {
            log_level: "info".to_string(),
            google_cloud_project_id: "your-project-id".to_string(),
            ai_platform_endpoint: format!("{}-aiplatform.googleapis.com", region),
            google_cloud_region: region,
            ai_model_name: "meta/llama-3.1-405b-instruct-maas".to_string(),
            gcs_bucket_name: "your-bucket-name".to_string(),
            gcs_default_folder: "intermediatecsv".to_string(),
            signed_url_expiration: 3600,
            max_retry_attempts: 3,
            request_timeout_secs: 300,
            python_interpreter: "python3".to_string(),
            listen_port: 8080,
        }
    }
}

impl Config {
    /// Load configuration from process environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    ///
    /// Unset or unparseable values fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        let region = lookup("GOOGLE_CLOUD_REGION").unwrap_or(defaults.google_cloud_region);
        let endpoint = lookup("AI_PLATFORM_ENDPOINT")
            .unwrap_or_else(|| format!("{}-aiplatform.googleapis.com", region));

        Self {
            log_level: lookup("LOG_LEVEL").unwrap_or(defaults.log_level),
            google_cloud_project_id: lookup("GOOGLE_CLOUD_PROJECT_ID")
                .unwrap_or(defaults.google_cloud_project_id),
            google_cloud_region: region,
            ai_platform_endpoint: endpoint,
            ai_model_name: lookup("AI_MODEL_NAME").unwrap_or(defaults.ai_model_name),
            gcs_bucket_name: lookup("GCS_BUCKET_NAME").unwrap_or(defaults.gcs_bucket_name),
            gcs_default_folder: lookup("GCS_DEFAULT_FOLDER").unwrap_or(defaults.gcs_default_folder),
            signed_url_expiration: parse_or(lookup("SIGNED_URL_EXPIRATION"), defaults.signed_url_expiration),
            max_retry_attempts: parse_or(lookup("MAX_RETRY_ATTEMPTS"), defaults.max_retry_attempts),
            request_timeout_secs: parse_or(lookup("REQUEST_TIMEOUT"), defaults.request_timeout_secs),
            python_interpreter: lookup("PYTHON_INTERPRETER").unwrap_or(defaults.python_interpreter),
            listen_port: parse_or(lookup("PORT"), defaults.listen_port),
        }
    }

    /// Reject placeholder values that must be set for a real deployment
    pub fn validate(&self) -> Result<()> {
        if self.google_cloud_project_id == "your-project-id" {
            return Err(ConvertError::Config(
                "GOOGLE_CLOUD_PROJECT_ID must be set to a valid project ID".to_string(),
            ));
        }
        if self.gcs_bucket_name == "your-bucket-name" {
            return Err(ConvertError::Config(
                "GCS_BUCKET_NAME must be set to a valid bucket name".to_string(),
            ));
        }
        Ok(())
    }

    /// Wall-clock ceiling for sandboxed script execution
    pub fn sandbox_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn parse_or<T: std::str::FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|v| v.parse().ok()).unwrap_or(default)
}

/// Generation request knobs sent with every model call
#[derive(Debug, Clone)]
pub struct ModelRequestConfig {
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
}

impl Default for ModelRequestConfig {
    fn default() -> Self {
        Self {
            max_tokens: 4096,
            temperature: 1.0,
            top_p: 0.95,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from<'a>(map: &'a HashMap<&'a str, &'a str>) -> impl Fn(&str) -> Option<String> + 'a {
        move |key| map.get(key).map(|v| v.to_string())
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(|_| None);
        assert_eq!(config.google_cloud_region, "us-central1");
        assert_eq!(config.ai_platform_endpoint, "us-central1-aiplatform.googleapis.com");
        assert_eq!(config.signed_url_expiration, 3600);
        assert_eq!(config.max_retry_attempts, 3);
        assert_eq!(config.python_interpreter, "python3");
        assert_eq!(config.listen_port, 8080);
    }

    #[test]
    fn test_endpoint_follows_region() {
        let map = HashMap::from([("GOOGLE_CLOUD_REGION", "europe-west4")]);
        let config = Config::from_lookup(lookup_from(&map));
        assert_eq!(config.ai_platform_endpoint, "europe-west4-aiplatform.googleapis.com");
    }

    #[test]
    fn test_explicit_endpoint_wins() {
        let map = HashMap::from([
            ("GOOGLE_CLOUD_REGION", "europe-west4"),
            ("AI_PLATFORM_ENDPOINT", "custom.example.com"),
        ]);
        let config = Config::from_lookup(lookup_from(&map));
        assert_eq!(config.ai_platform_endpoint, "custom.example.com");
    }

    #[test]
    fn test_unparseable_numeric_falls_back() {
        let map = HashMap::from([("MAX_RETRY_ATTEMPTS", "lots")]);
        let config = Config::from_lookup(lookup_from(&map));
        assert_eq!(config.max_retry_attempts, 3);
    }

    #[test]
    fn test_validate_rejects_placeholders() {
        let config = Config::from_lookup(|_| None);
        assert!(config.validate().is_err());

        let map = HashMap::from([
            ("GOOGLE_CLOUD_PROJECT_ID", "acme-prod"),
            ("GCS_BUCKET_NAME", "acme-conversions"),
        ]);
        let config = Config::from_lookup(lookup_from(&map));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_requires_bucket() {
        let map = HashMap::from([("GOOGLE_CLOUD_PROJECT_ID", "acme-prod")]);
        let config = Config::from_lookup(lookup_from(&map));
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("GCS_BUCKET_NAME"));
    }

    #[test]
    fn test_model_request_config_default() {
        let knobs = ModelRequestConfig::default();
        assert_eq!(knobs.max_tokens, 4096);
        assert_eq!(knobs.temperature, 1.0);
        assert_eq!(knobs.top_p, 0.95);
    }
}
