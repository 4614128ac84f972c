// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! S3-compatible object storage for public uploads.
//!
//! Objects are written with a single signed `PUT` (AWS Signature V4) and
//! the `public-read` canned ACL. Without `S3_ENDPOINT` the bucket is
//! addressed virtual-host style on AWS; with it, path style against the
//! given endpoint (MinIO, R2 and similar).

use std::collections::BTreeMap;
use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use reqwest::Client;
use sha2::{Digest, Sha256};
use url::Url;

use crate::config::S3Config;

type HmacSha256 = Hmac<Sha256>;

const SIGNING_ALGORITHM: &str = "AWS4-HMAC-SHA256";
const PUBLIC_READ_ACL: &str = "public-read";

#[derive(Debug, thiserror::Error)]
pub enum ObjectStoreError {
    #[error("object storage is not configured")]
    NotConfigured,

    #[error("object storage setup failed: {0}")]
    Setup(String),

    #[error("object storage request failed: {0}")]
    Request(String),

    #[error("request signing failed: {0}")]
    Signing(String),
}

/// Destination for uploaded files.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `body` under `key` and return its public URL.
    async fn put_object(
        &self,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<String, ObjectStoreError>;
}

/// Object key for an upload:
/// `{prefix}.{stem}.{timestamp_micros}[.{tier}]{.ext}`.
pub fn object_key(prefix: &str, filename: &str, timestamp_micros: i64, tier: Option<&str>) -> String {
    let path = Path::new(filename);
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(filename);
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{e}"))
        .unwrap_or_default();

    match tier {
        Some(tier) => format!("{prefix}.{stem}.{timestamp_micros}.{tier}{extension}"),
        None => format!("{prefix}.{stem}.{timestamp_micros}{extension}"),
    }
}

// =============================================================================
// S3 client
// =============================================================================

pub struct S3Client {
    config: S3Config,
    http: Client,
}

impl S3Client {
    pub fn new(config: S3Config, timeout: std::time::Duration) -> Result<Self, ObjectStoreError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ObjectStoreError::Setup(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { config, http })
    }

    /// Request URL and host header for `key`.
    fn locate(&self, key: &str) -> Result<(String, String, String), ObjectStoreError> {
        let encoded_key = uri_encode(key, false);
        match &self.config.endpoint {
            Some(endpoint) => {
                let base = endpoint.trim_end_matches('/');
                let parsed = Url::parse(base)
                    .map_err(|e| ObjectStoreError::Setup(format!("invalid S3 endpoint {base}: {e}")))?;
                let host = match (parsed.host_str(), parsed.port()) {
                    (Some(host), Some(port)) => format!("{host}:{port}"),
                    (Some(host), None) => host.to_string(),
                    (None, _) => {
                        return Err(ObjectStoreError::Setup(format!(
                            "S3 endpoint {base} has no host"
                        )))
                    }
                };
                let path = format!("{}/{}/{}", parsed.path().trim_end_matches('/'), self.config.bucket, encoded_key);
                Ok((format!("{base}/{}/{encoded_key}", self.config.bucket), host, path))
            }
            None => {
                let host = format!("{}.s3.{}.amazonaws.com", self.config.bucket, self.config.region);
                Ok((format!("https://{host}/{encoded_key}"), host, format!("/{encoded_key}")))
            }
        }
    }
}

#[async_trait]
impl ObjectStore for S3Client {
    async fn put_object(
        &self,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<String, ObjectStoreError> {
        let (url, host, canonical_uri) = self.locate(key)?;
        let now = Utc::now();
        let amz_date = amz_timestamp(&now);
        let payload_hash = hex::encode(Sha256::digest(&body));

        let mut headers = BTreeMap::new();
        headers.insert("content-type".to_string(), content_type.to_string());
        headers.insert("host".to_string(), host);
        headers.insert("x-amz-acl".to_string(), PUBLIC_READ_ACL.to_string());
        headers.insert("x-amz-content-sha256".to_string(), payload_hash.clone());
        headers.insert("x-amz-date".to_string(), amz_date.clone());

        let authorization = authorization_header(
            &self.config.access_key_id,
            &self.config.secret_access_key,
            &self.config.region,
            &now,
            "PUT",
            &canonical_uri,
            &headers,
            &payload_hash,
        )?;

        let response = self
            .http
            .put(&url)
            .header("Authorization", authorization)
            .header("Content-Type", content_type)
            .header("x-amz-acl", PUBLIC_READ_ACL)
            .header("x-amz-content-sha256", payload_hash)
            .header("x-amz-date", amz_date)
            .body(body)
            .send()
            .await
            .map_err(|e| ObjectStoreError::Request(format!("PUT {url} failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ObjectStoreError::Request(format!(
                "PUT {url} returned {status}: {body}"
            )));
        }

        tracing::info!(key, "Object uploaded");
        Ok(url)
    }
}

/// Placeholder used when no bucket is configured. Every upload fails.
pub struct DisabledObjectStore;

#[async_trait]
impl ObjectStore for DisabledObjectStore {
    async fn put_object(&self, _key: &str, _body: Vec<u8>, _content_type: &str) -> Result<String, ObjectStoreError> {
        Err(ObjectStoreError::NotConfigured)
    }
}

// =============================================================================
// Signature V4
// =============================================================================

fn amz_timestamp(at: &DateTime<Utc>) -> String {
    at.format("%Y%m%dT%H%M%SZ").to_string()
}

/// Percent-encode everything except unreserved characters. `/` is kept
/// unless `encode_slash` is set.
fn uri_encode(input: &str, encode_slash: bool) -> String {
    let mut encoded = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                encoded.push(byte as char)
            }
            b'/' if !encode_slash => encoded.push('/'),
            _ => encoded.push_str(&format!("%{byte:02X}")),
        }
    }
    encoded
}

fn hmac_sha256(key: &[u8], data: &str) -> Result<Vec<u8>, ObjectStoreError> {
    let mut mac = HmacSha256::new_from_slice(key).map_err(|e| ObjectStoreError::Signing(e.to_string()))?;
    mac.update(data.as_bytes());
    Ok(mac.finalize().into_bytes().to_vec())
}

fn signing_key(secret: &str, date: &str, region: &str, service: &str) -> Result<Vec<u8>, ObjectStoreError> {
    let k_date = hmac_sha256(format!("AWS4{secret}").as_bytes(), date)?;
    let k_region = hmac_sha256(&k_date, region)?;
    let k_service = hmac_sha256(&k_region, service)?;
    hmac_sha256(&k_service, "aws4_request")
}

/// Canonical request and signed-header list. Header names must already be
/// lowercase; the map keeps them sorted.
fn canonical_request(
    method: &str,
    canonical_uri: &str,
    headers: &BTreeMap<String, String>,
    payload_hash: &str,
) -> (String, String) {
    let canonical_headers: String = headers
        .iter()
        .map(|(name, value)| format!("{name}:{}\n", value.trim()))
        .collect();
    let signed_headers = headers.keys().cloned().collect::<Vec<_>>().join(";");
    let request = format!(
        "{method}\n{canonical_uri}\n\n{canonical_headers}\n{signed_headers}\n{payload_hash}"
    );
    (request, signed_headers)
}

#[allow(clippy::too_many_arguments)]
fn authorization_header(
    access_key_id: &str,
    secret_access_key: &str,
    region: &str,
    at: &DateTime<Utc>,
    method: &str,
    canonical_uri: &str,
    headers: &BTreeMap<String, String>,
    payload_hash: &str,
) -> Result<String, ObjectStoreError> {
    let date = at.format("%Y%m%d").to_string();
    let scope = format!("{date}/{region}/s3/aws4_request");
    let (request, signed_headers) = canonical_request(method, canonical_uri, headers, payload_hash);

    let string_to_sign = format!(
        "{SIGNING_ALGORITHM}\n{}\n{scope}\n{}",
        amz_timestamp(at),
        hex::encode(Sha256::digest(request.as_bytes()))
    );
    let key = signing_key(secret_access_key, &date, region, "s3")?;
    let signature = hex::encode(hmac_sha256(&key, &string_to_sign)?);

    Ok(format!(
        "{SIGNING_ALGORITHM} Credential={access_key_id}/{scope}, SignedHeaders={signed_headers}, Signature={signature}"
    ))
}
