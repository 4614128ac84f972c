// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JWT claims and authenticated user representation.

use serde::{Deserialize, Serialize};

use crate::storage::StoredUser;

/// Claims carried by access tokens.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    /// Subject: the user's alias. Optional on decode so a missing subject
    /// is reported as such instead of as a malformed token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    /// Issued at (unix seconds)
    pub iat: i64,

    /// Expiration (unix seconds)
    pub exp: i64,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub permissions: Vec<String>,
}

/// The caller of an authenticated request.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user: StoredUser,

    /// The raw bearer token, kept so logout can revoke it.
    pub token: String,

    /// Token expiration (unix seconds)
    pub expires_at: i64,
}

impl AuthenticatedUser {
    pub fn id(&self) -> u64 {
        self.user.id
    }

    pub fn is_superuser(&self) -> bool {
        self.user.is_superuser
    }
}
