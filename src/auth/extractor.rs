// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractors for authenticated users.
//!
//! ```rust,ignore
//! async fn my_handler(Auth(user): Auth) -> impl IntoResponse {
//!     // user is an active AuthenticatedUser
//! }
//! ```
//!
//! - [`CurrentUser`]: valid, unrevoked token naming an existing user
//! - [`Auth`]: additionally requires the account to be active
//! - [`SuperuserOnly`]: additionally requires the superuser flag

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use super::{AuthError, AuthenticatedUser};
use crate::state::AppState;
use crate::storage::{BlacklistRepository, UserRepository};

/// Any caller with a valid token, active or not.
pub struct CurrentUser(pub AuthenticatedUser);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or(AuthError::MissingAuthHeader)?
            .to_str()
            .map_err(|_| AuthError::InvalidAuthHeader)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(AuthError::InvalidAuthHeader)?;

        resolve_user(token, state).map(CurrentUser)
    }
}

/// Decode `token` and load the user it names.
fn resolve_user(token: &str, state: &AppState) -> Result<AuthenticatedUser, AuthError> {
    let claims = state.tokens.decode(token)?;
    let alias = claims.sub.ok_or(AuthError::MissingSubject)?;

    let revoked = BlacklistRepository::new(&state.db)
        .is_blacklisted(token)
        .map_err(|e| AuthError::InternalError(e.to_string()))?;
    if revoked {
        return Err(AuthError::TokenRevoked);
    }

    let user = UserRepository::new(&state.db)
        .get_by_alias(&alias)
        .map_err(|e| AuthError::InternalError(e.to_string()))?
        .ok_or(AuthError::UnknownUser)?;

    Ok(AuthenticatedUser {
        user,
        token: token.to_string(),
        expires_at: claims.exp,
    })
}

/// Extractor for active authenticated users.
///
/// # Example
///
/// ```rust,ignore
/// async fn me(Auth(user): Auth) -> Json<UserResponse> {
///     Json(user.user.into())
/// }
/// ```
pub struct Auth(pub AuthenticatedUser);

impl FromRequestParts<AppState> for Auth {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        if !user.user.is_active {
            return Err(AuthError::InactiveUser);
        }
        Ok(Auth(user))
    }
}

/// Extractor that requires an active superuser.
pub struct SuperuserOnly(pub AuthenticatedUser);

impl FromRequestParts<AppState> for SuperuserOnly {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Auth(user) = Auth::from_request_parts(parts, state).await?;
        if !user.is_superuser() {
            return Err(AuthError::InsufficientPermissions);
        }
        Ok(SuperuserOnly(user))
    }
}
