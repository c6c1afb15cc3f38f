//! Response shaping for the convert endpoint

use serde::Serialize;

/// JSON body returned by the convert endpoint
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConvertResponse {
    pub run_id: String,
    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub gcs_path: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub signed_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub signed_url_expiration_seconds: Option<u64>,

    /// Upload failed after a successful conversion
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gcs_error: Option<String>,

    /// Signing failed after a successful upload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signed_url_error: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_details: Option<ErrorDetails>,
}

/// Failure classification when the conversion itself did not succeed
#[derive(Debug, Clone, Default, Serialize)]
pub struct ErrorDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_error: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation_error: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_response_omits_error_fields() {
        let response = ConvertResponse {
            run_id: "r1".to_string(),
            success: true,
            gcs_path: Some("gs://b/k.csv".to_string()),
            signed_url: Some("https://example".to_string()),
            signed_url_expiration_seconds: Some(3600),
            ..Default::default()
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["gcs_path"], "gs://b/k.csv");
        assert!(json.get("gcs_error").is_none());
        assert!(json.get("error_details").is_none());
    }

    #[test]
    fn test_failure_response_carries_error_details() {
        let response = ConvertResponse {
            run_id: "r2".to_string(),
            success: false,
            error_details: Some(ErrorDetails {
                execution_error: Some("exit 1".to_string()),
                validation_error: None,
                file_error: Some("Output CSV file was not created".to_string()),
            }),
            ..Default::default()
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["error_details"]["execution_error"], "exit 1");
        assert!(json["error_details"].get("validation_error").is_none());
    }
}
