// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Client for the danaides indexer's locked-token lookup.

use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use serde_json::Value;

/// Paideia governance token.
pub const PAIDEIA_TOKEN_ID: &str =
    "1fd6e032e8476c4aa54c18c1a308dce83940e8f4a28f576440513ed7326ad489";

/// ErgoTree of the Paideia staking contract.
pub const PAIDEIA_STAKE_TREE: &str = concat!(
    "101f040004000e2012bbef36eaa5e61b64d519196a1e8ebea360f18aba9b02d2a21b16f26208960f",
    "040204000400040001000e20b682ad9e8c56c5a0ba7fe2d3d9b2fbd40af989e8870628f4a03ae102",
    "2d36f091040204000400040204020400040005020402040204060400010004040402040201000101",
    "0100040201000100d807d601b2a4730000d6028cb2db6308720173010001d6039372027302d604e4",
    "c6a70411d605e4c6a7050ed60695ef7203ed93c5b2a4730300c5a78fb2e4c6b2a573040004117305",
    "00b2e4c6720104117306007307d6079372027308d1ecec957203d80ad608b2a5dc0c1aa402a77309",
    "00d609e4c672080411d60adb63087208d60bb2720a730a00d60cdb6308a7d60db2720c730b00d60e",
    "b2720a730c00d60fb2720c730d00d6107e8c720f0206d611e4c6720104119683090193c17208c1a7",
    "93c27208c2a793b27209730e009ab27204730f00731093e4c67208050e720593b27209731100b272",
    "04731200938c720b018c720d01938c720b028c720d02938c720e018c720f01937e8c720e02069a72",
    "109d9c7eb272117313000672107eb27211731400067315957206d801d608b2a5731600ed72079593",
    "c27208c2a7d801d609c67208050e95e67209ed93e472097205938cb2db6308b2a573170073180001",
    "72057319731a731b9595efec7206720393c5b2a4731c00c5a7731d7207731e",
);

pub const PAIDEIA_PROXY_ADDRESS: &str =
    "245957934c20285ada547aa8f2c8e6f7637be86a1985b3e4c36e4e1ad8ce97ab";

#[derive(Debug, thiserror::Error)]
pub enum DanaidesError {
    #[error("danaides client setup failed: {0}")]
    Setup(String),

    #[error("danaides request failed: {0}")]
    Request(String),

    #[error("danaides response was invalid: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct LockedTokenQuery<'a> {
    addresses: &'a [String],
    token_id: &'a str,
    stake_tree: &'a str,
    vest_tree: &'a str,
    proxy_address: &'a str,
}

#[derive(Debug, Clone)]
pub struct DanaidesClient {
    base_url: String,
    http: Client,
}

impl DanaidesClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, DanaidesError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DanaidesError::Setup(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            base_url: base_url.into(),
            http,
        })
    }

    /// Locked Paideia tokens held by `addresses`, as returned by danaides.
    pub async fn locked_tokens(&self, addresses: &[String]) -> Result<Value, DanaidesError> {
        let url = format!("{}/token/locked", self.base_url.trim_end_matches('/'));
        let query = LockedTokenQuery {
            addresses,
            token_id: PAIDEIA_TOKEN_ID,
            stake_tree: PAIDEIA_STAKE_TREE,
            vest_tree: "",
            proxy_address: PAIDEIA_PROXY_ADDRESS,
        };

        let response = self
            .http
            .post(&url)
            .json(&query)
            .send()
            .await
            .map_err(|e| DanaidesError::Request(format!("POST {url} failed: {e}")))?;

        // Error answers carrying JSON are passed through like successes.
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| DanaidesError::Request(format!("POST {url} body read failed: {e}")))?;
        match serde_json::from_slice::<Value>(&body) {
            Ok(locked) => {
                if !status.is_success() {
                    tracing::warn!(%status, "danaides answered with an error body");
                }
                Ok(locked)
            }
            Err(_) if !status.is_success() => Err(DanaidesError::Request(format!(
                "POST {url} returned {status}: {}",
                String::from_utf8_lossy(&body)
            ))),
            Err(e) => Err(DanaidesError::InvalidResponse(format!(
                "POST {url} invalid JSON: {e}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;

    use axum::{routing::post, Json, Router};
    use serde_json::json;

    use super::*;

    /// Serve `router` on an ephemeral local port.
    async fn spawn_server(router: Router) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        addr
    }

    fn client(base_url: String) -> DanaidesClient {
        DanaidesClient::new(base_url, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn forwards_addresses_with_contract_constants() {
        // Echo the request body back so the test can inspect it.
        let router = Router::new().route(
            "/token/locked",
            post(|Json(body): Json<Value>| async move { Json(body) }),
        );
        let addr = spawn_server(router).await;

        let echoed = client(format!("http://{addr}/"))
            .locked_tokens(&["9fAddr".to_string()])
            .await
            .unwrap();

        assert_eq!(echoed["addresses"], json!(["9fAddr"]));
        assert_eq!(echoed["token_id"], PAIDEIA_TOKEN_ID);
        assert_eq!(echoed["stake_tree"], PAIDEIA_STAKE_TREE);
        assert_eq!(echoed["vest_tree"], "");
        assert_eq!(echoed["proxy_address"], PAIDEIA_PROXY_ADDRESS);
    }

    #[tokio::test]
    async fn json_error_body_is_passed_through() {
        let router = Router::new().route(
            "/token/locked",
            post(|| async {
                (
                    axum::http::StatusCode::UNPROCESSABLE_ENTITY,
                    Json(json!({"detail": "unknown address"})),
                )
            }),
        );
        let addr = spawn_server(router).await;

        let body = client(format!("http://{addr}"))
            .locked_tokens(&["bogus".to_string()])
            .await
            .unwrap();
        assert_eq!(body, json!({"detail": "unknown address"}));
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let router = Router::new().route(
            "/token/locked",
            post(|| async { (axum::http::StatusCode::SERVICE_UNAVAILABLE, "down") }),
        );
        let addr = spawn_server(router).await;

        let err = client(format!("http://{addr}"))
            .locked_tokens(&[])
            .await
            .unwrap_err();
        assert!(matches!(err, DanaidesError::Request(_)));
    }

    #[tokio::test]
    async fn non_json_body_is_invalid_response() {
        let router = Router::new().route("/token/locked", post(|| async { "not json" }));
        let addr = spawn_server(router).await;

        let err = client(format!("http://{addr}"))
            .locked_tokens(&[])
            .await
            .unwrap_err();
        assert!(matches!(err, DanaidesError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn unreachable_service_is_a_request_error() {
        let err = client("http://127.0.0.1:1".to_string())
            .locked_tokens(&[])
            .await
            .unwrap_err();
        assert!(matches!(err, DanaidesError::Request(_)));
    }
}
