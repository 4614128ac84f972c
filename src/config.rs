// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is read from the environment once at startup into
//! [`Config`].
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8000` |
//! | `DATABASE_PATH` | redb database file | `./data/paideia.redb` |
//! | `JWT_SECRET` | HS256 signing secret for access tokens | Required |
//! | `ACCESS_TOKEN_EXPIRE_MINUTES` | Access token lifetime | `11520` (8 days) |
//! | `DANAIDES_API` | Base URL of the danaides indexer | `http://localhost:7000` |
//! | `HTTP_TIMEOUT_SECS` | Timeout for outbound HTTP calls | `15` |
//! | `S3_BUCKET` | Upload bucket | Uploads disabled when unset |
//! | `S3_KEY_PREFIX` | Prefix of every uploaded object key | `upload` |
//! | `AWS_REGION` | Bucket region | `us-east-1` |
//! | `AWS_ACCESS_KEY_ID` | Upload credentials | Required with `S3_BUCKET` |
//! | `AWS_SECRET_ACCESS_KEY` | Upload credentials | Required with `S3_BUCKET` |
//! | `S3_ENDPOINT` | Path-style S3-compatible endpoint | AWS virtual-hosted |
//! | `MAX_UPLOAD_BYTES` | Largest accepted upload request body | `20971520` (20 MiB) |
//! | `CACHE_CAPACITY` | Response cache entries | `1024` |
//! | `CACHE_TTL_SECS` | Response cache entry lifetime | `60` |
//! | `BLACKLIST_PRUNE_INTERVAL_SECS` | Revoked-token pruning period | `3600` |
//! | `TLS_CERT_PATH` / `TLS_KEY_PATH` | PEM files enabling HTTPS | Plain HTTP |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const DATABASE_PATH_ENV: &str = "DATABASE_PATH";
pub const JWT_SECRET_ENV: &str = "JWT_SECRET";
pub const ACCESS_TOKEN_EXPIRE_MINUTES_ENV: &str = "ACCESS_TOKEN_EXPIRE_MINUTES";
pub const DANAIDES_API_ENV: &str = "DANAIDES_API";
pub const HTTP_TIMEOUT_SECS_ENV: &str = "HTTP_TIMEOUT_SECS";
pub const S3_BUCKET_ENV: &str = "S3_BUCKET";
pub const S3_KEY_PREFIX_ENV: &str = "S3_KEY_PREFIX";
pub const AWS_REGION_ENV: &str = "AWS_REGION";
pub const AWS_ACCESS_KEY_ID_ENV: &str = "AWS_ACCESS_KEY_ID";
pub const AWS_SECRET_ACCESS_KEY_ENV: &str = "AWS_SECRET_ACCESS_KEY";
pub const S3_ENDPOINT_ENV: &str = "S3_ENDPOINT";
pub const MAX_UPLOAD_BYTES_ENV: &str = "MAX_UPLOAD_BYTES";
pub const CACHE_CAPACITY_ENV: &str = "CACHE_CAPACITY";
pub const CACHE_TTL_SECS_ENV: &str = "CACHE_TTL_SECS";
pub const BLACKLIST_PRUNE_INTERVAL_SECS_ENV: &str = "BLACKLIST_PRUNE_INTERVAL_SECS";
pub const TLS_CERT_PATH_ENV: &str = "TLS_CERT_PATH";
pub const TLS_KEY_PATH_ENV: &str = "TLS_KEY_PATH";

/// `json` selects JSON log lines; anything else is human-readable.
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Filter applied when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

const DEFAULT_TOKEN_EXPIRE_MINUTES: i64 = 60 * 24 * 8;
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(String),

    #[error("invalid value for {name}: {value}")]
    Invalid { name: String, value: String },
}

/// Object storage settings. Present only when a bucket is configured.
#[derive(Debug, Clone)]
pub struct S3Config {
    pub bucket: String,
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub endpoint: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TlsPaths {
    pub cert: PathBuf,
    pub key: PathBuf,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_path: PathBuf,
    pub jwt_secret: String,
    pub access_token_ttl: Duration,
    pub danaides_api: String,
    pub http_timeout: Duration,
    pub s3: Option<S3Config>,
    pub upload_key_prefix: String,
    pub max_upload_bytes: usize,
    pub cache_capacity: usize,
    pub cache_ttl: Duration,
    pub blacklist_prune_interval: Duration,
    pub tls: Option<TlsPaths>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let token_minutes: i64 =
            env_parse(ACCESS_TOKEN_EXPIRE_MINUTES_ENV, DEFAULT_TOKEN_EXPIRE_MINUTES)?;
        if token_minutes <= 0 {
            return Err(ConfigError::Invalid {
                name: ACCESS_TOKEN_EXPIRE_MINUTES_ENV.to_string(),
                value: token_minutes.to_string(),
            });
        }

        let s3 = match env_optional(S3_BUCKET_ENV) {
            Some(bucket) => Some(S3Config {
                bucket,
                region: env_or_default(AWS_REGION_ENV, "us-east-1"),
                access_key_id: env_required(AWS_ACCESS_KEY_ID_ENV)?,
                secret_access_key: env_required(AWS_SECRET_ACCESS_KEY_ENV)?,
                endpoint: env_optional(S3_ENDPOINT_ENV),
            }),
            None => None,
        };

        let tls = match (env_optional(TLS_CERT_PATH_ENV), env_optional(TLS_KEY_PATH_ENV)) {
            (Some(cert), Some(key)) => Some(TlsPaths {
                cert: cert.into(),
                key: key.into(),
            }),
            (None, None) => None,
            (Some(_), None) => return Err(ConfigError::Missing(TLS_KEY_PATH_ENV.to_string())),
            (None, Some(_)) => return Err(ConfigError::Missing(TLS_CERT_PATH_ENV.to_string())),
        };

        Ok(Self {
            host: env_or_default(HOST_ENV, "0.0.0.0"),
            port: env_parse(PORT_ENV, 8000)?,
            database_path: env_or_default(DATABASE_PATH_ENV, "./data/paideia.redb").into(),
            jwt_secret: env_required(JWT_SECRET_ENV)?,
            access_token_ttl: Duration::from_secs(token_minutes as u64 * 60),
            danaides_api: env_or_default(DANAIDES_API_ENV, "http://localhost:7000"),
            http_timeout: Duration::from_secs(env_parse(HTTP_TIMEOUT_SECS_ENV, 15)?),
            s3,
            upload_key_prefix: env_or_default(S3_KEY_PREFIX_ENV, "upload"),
            max_upload_bytes: env_parse(MAX_UPLOAD_BYTES_ENV, DEFAULT_MAX_UPLOAD_BYTES)?,
            cache_capacity: env_parse(CACHE_CAPACITY_ENV, 1024)?,
            cache_ttl: Duration::from_secs(env_parse(CACHE_TTL_SECS_ENV, 60)?),
            blacklist_prune_interval: Duration::from_secs(env_parse(
                BLACKLIST_PRUNE_INTERVAL_SECS_ENV,
                3600,
            )?),
            tls,
        })
    }
}

fn env_required(name: &str) -> Result<String, ConfigError> {
    env_optional(name).ok_or_else(|| ConfigError::Missing(name.to_string()))
}

fn env_optional(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_or_default(name: &str, default: &str) -> String {
    env_optional(name).unwrap_or_else(|| default.to_string())
}

fn env_parse<T: FromStr>(name: &str, default: T) -> Result<T, ConfigError> {
    match env_optional(name) {
        Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
            name: name.to_string(),
            value: raw,
        }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Each test touches its own variable names so they can run in parallel.

    #[test]
    fn env_parse_falls_back_to_default() {
        assert_eq!(env_parse::<u16>("PAIDEIA_TEST_UNSET_PORT", 8000).unwrap(), 8000);
    }

    #[test]
    fn env_parse_rejects_garbage() {
        std::env::set_var("PAIDEIA_TEST_BAD_PORT", "eighty");
        let err = env_parse::<u16>("PAIDEIA_TEST_BAD_PORT", 8000).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
        std::env::remove_var("PAIDEIA_TEST_BAD_PORT");
    }

    #[test]
    fn blank_values_count_as_unset() {
        std::env::set_var("PAIDEIA_TEST_BLANK", "   ");
        assert!(env_optional("PAIDEIA_TEST_BLANK").is_none());
        assert!(matches!(
            env_required("PAIDEIA_TEST_BLANK"),
            Err(ConfigError::Missing(_))
        ));
        assert_eq!(env_or_default("PAIDEIA_TEST_BLANK", "x"), "x");
        std::env::remove_var("PAIDEIA_TEST_BLANK");
    }
}
