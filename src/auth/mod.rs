// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Password login and HS256 bearer tokens.
//!
//! ## Auth Flow
//!
//! 1. A user signs up or logs in with alias + password
//! 2. The server returns a signed token whose `sub` is the alias
//! 3. Clients send `Authorization: Bearer <token>`
//! 4. The extractors:
//!    - verify signature, algorithm and expiry
//!    - reject revoked (logged out) tokens
//!    - load the user named by `sub` and check the active/superuser flags
//!
//! Logout revokes a token until its own expiry.

pub mod claims;
pub mod error;
pub mod extractor;
pub mod password;
pub mod tokens;

pub use claims::{AuthenticatedUser, Claims};
pub use error::AuthError;
pub use extractor::{Auth, CurrentUser, SuperuserOnly};
pub use tokens::{IssuedToken, TokenIssuer, CLOCK_SKEW_LEEWAY};
