//! V4 signed URL construction
//!
//! The signature itself comes from the IAM `signBlob` API (the runtime
//! service account has no local private key), so everything here is the
//! deterministic part: canonical request, string-to-sign, and final URL
//! assembly per the GCS V4 signing scheme.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

const HOST: &str = "storage.googleapis.com";
const ALGORITHM: &str = "GOOG4-RSA-SHA256";

/// `/{bucket}/{key}` with each key segment percent-encoded
pub fn encoded_path(bucket: &str, key: &str) -> String {
    let encoded_key: Vec<String> = key
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect();
    format!("/{}/{}", bucket, encoded_key.join("/"))
}

/// Credential scope for the signing date: `{date}/auto/storage/goog4_request`
pub fn credential_scope(timestamp: &DateTime<Utc>) -> String {
    format!("{}/auto/storage/goog4_request", timestamp.format("%Y%m%d"))
}

/// Request timestamp in the compact ISO form the scheme requires
pub fn request_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.format("%Y%m%dT%H%M%SZ").to_string()
}

/// Canonical query string, alphabetically ordered, without the signature
pub fn canonical_query(service_account: &str, timestamp: &DateTime<Utc>, ttl_secs: u64) -> String {
    let credential = format!("{}/{}", service_account, credential_scope(timestamp));
    let params = [
        ("X-Goog-Algorithm", ALGORITHM.to_string()),
        ("X-Goog-Credential", credential),
        ("X-Goog-Date", request_timestamp(timestamp)),
        ("X-Goog-Expires", ttl_secs.to_string()),
        ("X-Goog-SignedHeaders", "host".to_string()),
    ];

    params
        .iter()
        .map(|(name, value)| format!("{}={}", name, urlencoding::encode(value)))
        .collect::<Vec<_>>()
        .join("&")
}

/// The canonical GET request over the signed `host` header only
pub fn canonical_request(path: &str, query: &str) -> String {
    format!(
        "GET\n{}\n{}\nhost:{}\n\nhost\nUNSIGNED-PAYLOAD",
        path, query, HOST
    )
}

/// The payload submitted to signBlob
pub fn string_to_sign(timestamp: &DateTime<Utc>, canonical_request: &str) -> String {
    let digest = Sha256::digest(canonical_request.as_bytes());
    format!(
        "{}\n{}\n{}\n{}",
        ALGORITHM,
        request_timestamp(timestamp),
        credential_scope(timestamp),
        hex::encode(digest)
    )
}

/// Assemble the final signed URL from the canonical parts and hex signature
pub fn signed_url(path: &str, query: &str, signature_hex: &str) -> String {
    format!("https://{}{}?{}&X-Goog-Signature={}", HOST, path, query, signature_hex)
}
