//! Blocking HTTP client for S3-compatible endpoints (path-style addressing).

use super::sigv4::{self, SigningInput};
use super::{ObjectClient, ObjectError, ObjectPage};
use crate::store::{StoreError, StoreResult};
use chrono::Utc;
use log::debug;
use reqwest::blocking::{Client, Response};
use reqwest::{Method, StatusCode, Url};
use std::fmt::{Debug, Formatter};
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Static access key pair.
#[derive(Clone, PartialEq, Eq)]
pub struct S3Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl Debug for S3Credentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field(
                "session_token",
                &self.session_token.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

/// Connection settings for one bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Settings {
    pub bucket: String,
    pub region: String,
    /// Base URL such as `http://localhost:9000`. Defaults to the regional
    /// AWS endpoint.
    pub endpoint: Option<String>,
    pub credentials: S3Credentials,
}

impl S3Settings {
    pub fn endpoint_url(&self) -> String {
        match &self.endpoint {
            Some(endpoint) => endpoint.trim_end_matches('/').to_string(),
            None => format!("https://s3.{}.amazonaws.com", self.region),
        }
    }
}

/// SigV4-signed object client over `reqwest`'s blocking API.
pub struct HttpObjectClient {
    http: Client,
    endpoint: Url,
    host: String,
    region: String,
    credentials: S3Credentials,
}

impl Debug for HttpObjectClient {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpObjectClient")
            .field("endpoint", &self.endpoint.as_str())
            .field("region", &self.region)
            .field("credentials", &self.credentials)
            .finish()
    }
}

impl HttpObjectClient {
    pub fn new(settings: &S3Settings) -> StoreResult<Self> {
        let raw = settings.endpoint_url();
        let endpoint = Url::parse(&raw)
            .map_err(|err| StoreError::Backend(format!("invalid s3 endpoint `{raw}`: {err}")))?;
        if endpoint.path() != "/" {
            return Err(StoreError::Backend(format!(
                "s3 endpoint `{raw}` must not carry a path"
            )));
        }
        let host = match (endpoint.host_str(), endpoint.port()) {
            (Some(host), Some(port)) => format!("{host}:{port}"),
            (Some(host), None) => host.to_string(),
            (None, _) => {
                return Err(StoreError::Backend(format!(
                    "s3 endpoint `{raw}` has no host"
                )))
            }
        };
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| StoreError::Backend(format!("failed to build http client: {err}")))?;

        Ok(Self {
            http,
            endpoint,
            host,
            region: settings.region.clone(),
            credentials: settings.credentials.clone(),
        })
    }

    fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Vec<u8>,
    ) -> Result<Response, ObjectError> {
        let mut pairs: Vec<(String, String)> = query
            .iter()
            .map(|(name, value)| (sigv4::uri_encode(name, false), sigv4::uri_encode(value, false)))
            .collect();
        pairs.sort();
        let canonical_query = pairs
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("&");

        let mut url = self.endpoint.clone();
        url.set_path(path);
        if !canonical_query.is_empty() {
            url.set_query(Some(&canonical_query));
        }

        let now = Utc::now();
        let amz_date = sigv4::amz_date(now);
        let payload_hash = sigv4::sha256_hex(&body);
        let mut headers = vec![
            ("host", self.host.clone()),
            ("x-amz-content-sha256", payload_hash.clone()),
            ("x-amz-date", amz_date.clone()),
        ];
        if let Some(token) = &self.credentials.session_token {
            headers.push(("x-amz-security-token", token.clone()));
        }
        let input = SigningInput {
            method: method.as_str(),
            uri: path,
            query: &canonical_query,
            headers,
            payload_hash: &payload_hash,
        };
        let authorization = sigv4::authorization(&input, &self.credentials, &self.region, now)
            .map_err(|err| ObjectError::new("SigningFailed", err.to_string()))?;

        let mut request = self
            .http
            .request(method.clone(), url)
            .header("x-amz-content-sha256", payload_hash)
            .header("x-amz-date", amz_date)
            .header(reqwest::header::AUTHORIZATION, authorization);
        if let Some(token) = &self.credentials.session_token {
            request = request.header("x-amz-security-token", token.as_str());
        }

        let response = request
            .body(body)
            .send()
            .map_err(|err| ObjectError::new("RequestFailed", err.to_string()))?;
        debug!(
            "event=s3_request module=store backend=s3 method={method} path={path} status={}",
            response.status().as_u16()
        );
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(error_from_response(response))
        }
    }
}

impl ObjectClient for HttpObjectClient {
    fn put_object(&self, bucket: &str, key: &str, body: &[u8]) -> Result<(), ObjectError> {
        let path = object_path(bucket, key)?;
        self.send(Method::PUT, &path, &[], body.to_vec())?;
        Ok(())
    }

    fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, ObjectError> {
        let path = object_path(bucket, key)?;
        let response = self.send(Method::GET, &path, &[], Vec::new())?;
        let bytes = response
            .bytes()
            .map_err(|err| ObjectError::new("RequestFailed", err.to_string()))?;
        Ok(bytes.to_vec())
    }

    fn delete_object(&self, bucket: &str, key: &str) -> Result<(), ObjectError> {
        let path = object_path(bucket, key)?;
        self.send(Method::DELETE, &path, &[], Vec::new())?;
        Ok(())
    }

    fn list_objects(
        &self,
        bucket: &str,
        continuation: Option<&str>,
    ) -> Result<ObjectPage, ObjectError> {
        let mut query = vec![("list-type", "2")];
        if let Some(token) = continuation {
            query.push(("continuation-token", token));
        }
        let path = format!("/{}", sigv4::uri_encode(bucket, false));
        let response = self.send(Method::GET, &path, &query, Vec::new())?;
        let body = response
            .text()
            .map_err(|err| ObjectError::new("RequestFailed", err.to_string()))?;
        Ok(parse_list_page(&body))
    }
}

/// Path-style object path. Keys that a URL parser would rewrite are refused.
fn object_path(bucket: &str, key: &str) -> Result<String, ObjectError> {
    if key.is_empty() {
        return Err(ObjectError::new("InvalidKey", "object keys must not be empty"));
    }
    if key.split('/').any(|segment| segment == "." || segment == "..") {
        return Err(ObjectError::new(
            "InvalidKey",
            format!("key `{key}` has a dot path segment and cannot be addressed"),
        ));
    }
    Ok(format!(
        "/{}/{}",
        sigv4::uri_encode(bucket, false),
        sigv4::uri_encode(key, true)
    ))
}

fn error_from_response(response: Response) -> ObjectError {
    let status = response.status();
    let body = response.text().unwrap_or_default();
    let code = xml_values(&body, "Code").into_iter().next();
    let message = xml_values(&body, "Message").into_iter().next();
    let code = match code {
        Some(code) => code,
        None if status == StatusCode::NOT_FOUND => "NotFound".to_string(),
        None => status
            .canonical_reason()
            .unwrap_or("UnexpectedStatus")
            .replace(' ', ""),
    };
    ObjectError {
        code,
        message: message.unwrap_or_else(|| status.to_string()),
        status: Some(status.as_u16()),
    }
}

fn parse_list_page(body: &str) -> ObjectPage {
    let truncated = xml_values(body, "IsTruncated")
        .first()
        .map_or(false, |value| value == "true");
    let next = if truncated {
        xml_values(body, "NextContinuationToken").into_iter().next()
    } else {
        None
    };
    ObjectPage {
        keys: xml_values(body, "Key"),
        next,
    }
}

/// Text of every `<tag>...</tag>` element, entity-decoded.
fn xml_values(body: &str, tag: &str) -> Vec<String> {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    let mut values = Vec::new();
    let mut rest = body;
    while let Some(start) = rest.find(&open) {
        let after = &rest[start + open.len()..];
        let Some(end) = after.find(&close) else {
            break;
        };
        values.push(unescape_xml(&after[..end]));
        rest = &after[end + close.len()..];
    }
    values
}

fn unescape_xml(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let entity = &rest[amp..];
        let Some(semi) = entity.find(';') else {
            out.push_str(entity);
            return out;
        };
        let decoded = match &entity[1..semi] {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            numeric => numeric
                .strip_prefix("#x")
                .map(|hex| u32::from_str_radix(hex, 16))
                .or_else(|| numeric.strip_prefix('#').map(str::parse::<u32>))
                .and_then(Result::ok)
                .and_then(char::from_u32),
        };
        match decoded {
            Some(ch) => {
                out.push(ch);
                rest = &entity[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &entity[1..];
            }
        }
    }
    out.push_str(rest);
    out
}
