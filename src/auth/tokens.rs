// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HS256 access token issuance and verification.

use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use super::{AuthError, Claims};

/// Seconds past `exp` that a token is still accepted. Revocations must
/// outlive this window.
pub const CLOCK_SKEW_LEEWAY: u64 = 60;

/// A freshly signed token.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: i64,
}

/// Signs and verifies access tokens with a shared secret.
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    /// Sign a token for `alias` valid for the configured lifetime.
    pub fn issue(&self, alias: &str, permissions: Vec<String>) -> Result<IssuedToken, AuthError> {
        let iat = Utc::now().timestamp();
        let exp = iat + self.ttl.as_secs() as i64;
        let claims = Claims {
            sub: Some(alias.to_string()),
            iat,
            exp,
            permissions,
        };
        let token = self.sign(&claims)?;
        Ok(IssuedToken {
            token,
            expires_at: exp,
        })
    }

    pub fn sign(&self, claims: &Claims) -> Result<String, AuthError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| AuthError::InternalError(format!("failed to sign token: {e}")))
    }

    /// Verify signature, algorithm and expiry, returning the claims.
    ///
    /// Only HS256 is accepted.
    pub fn decode(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = CLOCK_SKEW_LEEWAY;

        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => AuthError::InvalidSignature,
            _ => AuthError::MalformedToken,
        })?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};

    fn issuer() -> TokenIssuer {
        TokenIssuer::new("test-secret", Duration::from_secs(3600))
    }

    #[test]
    fn issued_token_round_trips() {
        let issuer = issuer();
        let issued = issuer.issue("alice", vec!["read".to_string()]).unwrap();
        let claims = issuer.decode(&issued.token).unwrap();
        assert_eq!(claims.sub.as_deref(), Some("alice"));
        assert_eq!(claims.exp, issued.expires_at);
        assert_eq!(claims.permissions, vec!["read"]);
    }

    #[test]
    fn other_secret_is_rejected() {
        let token = issuer().issue("alice", Vec::new()).unwrap().token;
        let other = TokenIssuer::new("another-secret", Duration::from_secs(3600));
        assert!(matches!(other.decode(&token), Err(AuthError::InvalidSignature)));
    }

    #[test]
    fn expired_token_is_rejected() {
        let issuer = issuer();
        let now = Utc::now().timestamp();
        let token = issuer
            .sign(&Claims {
                sub: Some("alice".to_string()),
                iat: now - 7200,
                exp: now - 3600,
                permissions: Vec::new(),
            })
            .unwrap();
        assert!(matches!(issuer.decode(&token), Err(AuthError::TokenExpired)));
    }

    #[test]
    fn unsigned_token_is_rejected() {
        let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"none","typ":"JWT"}"#);
        let claims = URL_SAFE_NO_PAD.encode(r#"{"sub":"alice","iat":1,"exp":9999999999}"#);
        let token = format!("{header}.{claims}.");
        assert!(issuer().decode(&token).is_err());
    }

    #[test]
    fn garbage_is_malformed() {
        assert!(matches!(issuer().decode("not.a.jwt"), Err(AuthError::MalformedToken)));
    }
}
