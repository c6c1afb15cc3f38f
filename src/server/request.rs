//! Inbound request parsing
//!
//! The convert endpoint accepts three body syntaxes: multipart form-data
//! (file upload plus text fields), JSON, and urlencoded forms. All of them
//! funnel into the same field set; the file arrives either as the multipart
//! `file` part or as `file_base64` + `file_name`.

use axum::extract::{FromRequest, Multipart, Request};
use axum::http::header::CONTENT_TYPE;
use serde::{Deserialize, Deserializer};

/// Upper bound on inbound body size
pub const MAX_BODY_BYTES: usize = 32 * 1024 * 1024;

/// Optional text fields common to all body syntaxes
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawFields {
    pub project_id: Option<String>,
    pub additional_instruction: Option<String>,
    pub gcs_bucket: Option<String>,
    pub gcs_folder_path: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub signed_url_expiration: Option<String>,
    pub file_base64: Option<String>,
    pub file_name: Option<String>,
}

/// A file delivered as a multipart part
#[derive(Debug, Clone)]
pub struct NamedUpload {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Parsed convert request, body syntax already erased
#[derive(Debug, Clone, Default)]
pub struct ConvertRequest {
    pub fields: RawFields,
    pub upload: Option<NamedUpload>,
}

/// Accept `signed_url_expiration` as either a JSON number or a string
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(i64),
    }

    Ok(Option::<Raw>::deserialize(deserializer)?.map(|raw| match raw {
        Raw::Text(text) => text,
        Raw::Number(number) => number.to_string(),
    }))
}

/// Parse the request body into a ConvertRequest.
///
/// Returns the message for a 400 response on any malformed body.
pub async fn parse_request(req: Request) -> Result<ConvertRequest, String> {
    let content_type = req
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    if content_type.starts_with("multipart/form-data") {
        let multipart = Multipart::from_request(req, &())
            .await
            .map_err(|e| format!("Invalid multipart body: {}", e))?;
        return parse_multipart(multipart).await;
    }

    let bytes = axum::body::to_bytes(req.into_body(), MAX_BODY_BYTES)
        .await
        .map_err(|e| format!("Failed to read request body: {}", e))?;

    let fields = if content_type.starts_with("application/json") {
        serde_json::from_slice(&bytes).map_err(|e| format!("Invalid JSON body: {}", e))?
    } else {
        serde_urlencoded::from_bytes(&bytes).map_err(|e| format!("Invalid form body: {}", e))?
    };

    Ok(ConvertRequest {
        fields,
        upload: None,
    })
}

async fn parse_multipart(mut multipart: Multipart) -> Result<ConvertRequest, String> {
    let mut request = ConvertRequest::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| format!("Invalid multipart body: {}", e))?
    {
        let Some(name) = field.name().map(|n| n.to_string()) else {
            continue;
        };

        if name == "file" {
            let filename = field.file_name().unwrap_or("").to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| format!("Failed to read file upload: {}", e))?
                .to_vec();
            if !filename.is_empty() {
                request.upload = Some(NamedUpload { filename, bytes });
            }
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|e| format!("Failed to read field '{}': {}", name, e))?;

        match name.as_str() {
            "project_id" => request.fields.project_id = Some(value),
            "additional_instruction" => request.fields.additional_instruction = Some(value),
            "gcs_bucket" => request.fields.gcs_bucket = Some(value),
            "gcs_folder_path" => request.fields.gcs_folder_path = Some(value),
            "signed_url_expiration" => request.fields.signed_url_expiration = Some(value),
            "file_base64" => request.fields.file_base64 = Some(value),
            "file_name" => request.fields.file_name = Some(value),
            _ => {}
        }
    }

    Ok(request)
}

/// Strip path components and non-portable characters from a client filename
pub fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let trimmed = cleaned.trim_matches('.');
    if trimmed.is_empty() {
        "file".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Folder paths always end with a slash
pub fn normalize_folder_path(path: &str) -> String {
    if path.is_empty() || path.ends_with('/') {
        path.to_string()
    } else {
        format!("{}/", path)
    }
}

/// Parse the requested TTL, falling back to the configured default
pub fn parse_expiration(value: Option<&str>, default: u64) -> u64 {
    value.and_then(|v| v.parse().ok()).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_plain_name() {
        assert_eq!(sanitize_filename("data.jsonl"), "data.jsonl");
    }

    #[test]
    fn test_sanitize_strips_directories() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("C:\\temp\\data.jsonl"), "data.jsonl");
    }

    #[test]
    fn test_sanitize_replaces_odd_characters() {
        assert_eq!(sanitize_filename("my data (1).jsonl"), "my_data__1_.jsonl");
    }

    #[test]
    fn test_sanitize_degenerate_names() {
        assert_eq!(sanitize_filename(".."), "file");
        assert_eq!(sanitize_filename(""), "file");
    }

    #[test]
    fn test_normalize_folder_path() {
        assert_eq!(normalize_folder_path("runs/out"), "runs/out/");
        assert_eq!(normalize_folder_path("runs/out/"), "runs/out/");
        assert_eq!(normalize_folder_path(""), "");
    }

    #[test]
    fn test_parse_expiration() {
        assert_eq!(parse_expiration(Some("600"), 3600), 600);
        assert_eq!(parse_expiration(Some("not-a-number"), 3600), 3600);
        assert_eq!(parse_expiration(None, 3600), 3600);
    }

    #[test]
    fn test_raw_fields_from_json_with_numeric_expiration() {
        let fields: RawFields =
            serde_json::from_str(r#"{"signed_url_expiration": 900, "project_id": "p"}"#).unwrap();
        assert_eq!(fields.signed_url_expiration.as_deref(), Some("900"));
        assert_eq!(fields.project_id.as_deref(), Some("p"));
    }

    #[test]
    fn test_raw_fields_from_json_with_string_expiration() {
        let fields: RawFields = serde_json::from_str(r#"{"signed_url_expiration": "900"}"#).unwrap();
        assert_eq!(fields.signed_url_expiration.as_deref(), Some("900"));
    }

    #[test]
    fn test_raw_fields_from_urlencoded() {
        let fields: RawFields =
            serde_urlencoded::from_str("project_id=p&gcs_bucket=b&signed_url_expiration=60").unwrap();
        assert_eq!(fields.project_id.as_deref(), Some("p"));
        assert_eq!(fields.gcs_bucket.as_deref(), Some("b"));
        assert_eq!(fields.signed_url_expiration.as_deref(), Some("60"));
    }

    #[test]
    fn test_raw_fields_empty_body_defaults() {
        let fields: RawFields = serde_urlencoded::from_str("").unwrap();
        assert!(fields.project_id.is_none());
        assert!(fields.file_base64.is_none());
    }
}
