//! AWS Signature Version 4 request signing for the `s3` service.

use super::http::S3Credentials;
use chrono::{DateTime, Utc};
use hmac::digest::InvalidLength;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "AWS4-HMAC-SHA256";
const SERVICE: &str = "s3";

/// Request parts covered by the signature.
pub(crate) struct SigningInput<'a> {
    pub method: &'a str,
    /// Already URI-encoded path.
    pub uri: &'a str,
    /// Already encoded and sorted query string.
    pub query: &'a str,
    /// Lowercase header names with their values.
    pub headers: Vec<(&'a str, String)>,
    pub payload_hash: &'a str,
}

pub(crate) fn amz_date(at: DateTime<Utc>) -> String {
    at.format("%Y%m%dT%H%M%SZ").to_string()
}

pub(crate) fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Builds the `Authorization` header value for `input`.
pub(crate) fn authorization(
    input: &SigningInput<'_>,
    credentials: &S3Credentials,
    region: &str,
    at: DateTime<Utc>,
) -> Result<String, InvalidLength> {
    let mut headers = input.headers.clone();
    headers.sort_by(|left, right| left.0.cmp(right.0));
    let canonical_headers: String = headers
        .iter()
        .map(|(name, value)| format!("{name}:{}\n", value.trim()))
        .collect();
    let signed_headers = headers
        .iter()
        .map(|(name, _)| *name)
        .collect::<Vec<_>>()
        .join(";");

    let canonical_request = format!(
        "{}\n{}\n{}\n{canonical_headers}\n{signed_headers}\n{}",
        input.method, input.uri, input.query, input.payload_hash
    );

    let date = at.format("%Y%m%d").to_string();
    let scope = format!("{date}/{region}/{SERVICE}/aws4_request");
    let string_to_sign = format!(
        "{ALGORITHM}\n{}\n{scope}\n{}",
        amz_date(at),
        sha256_hex(canonical_request.as_bytes())
    );

    let secret = format!("AWS4{}", credentials.secret_access_key);
    let date_key = hmac(secret.as_bytes(), &date)?;
    let region_key = hmac(&date_key, region)?;
    let service_key = hmac(&region_key, SERVICE)?;
    let signing_key = hmac(&service_key, "aws4_request")?;
    let signature = hex::encode(hmac(&signing_key, &string_to_sign)?);

    Ok(format!(
        "{ALGORITHM} Credential={}/{scope}, SignedHeaders={signed_headers}, Signature={signature}",
        credentials.access_key_id
    ))
}

fn hmac(key: &[u8], data: &str) -> Result<Vec<u8>, InvalidLength> {
    let mut mac = HmacSha256::new_from_slice(key)?;
    mac.update(data.as_bytes());
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Percent-encodes everything outside the RFC 3986 unreserved set.
/// `/` is kept when `keep_slash` is set (object paths).
pub(crate) fn uri_encode(raw: &str, keep_slash: bool) -> String {
    let mut encoded = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                encoded.push(byte as char)
            }
            b'/' if keep_slash => encoded.push('/'),
            other => encoded.push_str(&format!("%{other:02X}")),
        }
    }
    encoded
}
