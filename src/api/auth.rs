// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, http::StatusCode, Json};

use crate::{
    auth::{
        password::{random_password, verify_password},
        AuthError, CurrentUser, IssuedToken,
    },
    error::ApiError,
    models::{LoginRequest, SignUpRequest, StatusResponse, TokenResponse},
    state::AppState,
    storage::{BlacklistRepository, NewUser, UserRepository},
};

fn token_response(issued: IssuedToken) -> TokenResponse {
    TokenResponse {
        access_token: issued.token,
        token_type: "bearer".to_string(),
        expires_at: issued.expires_at,
    }
}

/// Register an account bound to a wallet address and log it in.
///
/// Without a password the account gets a random one and can only be used
/// through wallet-based flows.
#[utoipa::path(
    post,
    path = "/api/auth/signup",
    request_body = SignUpRequest,
    tag = "Auth",
    responses(
        (status = 201, body = TokenResponse),
        (status = 409, description = "Alias or address already registered")
    )
)]
pub async fn sign_up(
    State(state): State<AppState>,
    Json(request): Json<SignUpRequest>,
) -> Result<(StatusCode, Json<TokenResponse>), ApiError> {
    let repo = UserRepository::new(&state.db);
    if repo.get_by_alias(&request.alias)?.is_some() {
        return Err(ApiError::Conflict(format!("Alias {} is already taken", request.alias)));
    }
    if repo.get_by_wallet_address(&request.primary_wallet_address)?.is_some() {
        return Err(ApiError::Conflict(format!(
            "Address {} is already registered",
            request.primary_wallet_address
        )));
    }

    let password = request.password.unwrap_or_else(random_password);
    let user = repo.create(NewUser {
        alias: request.alias,
        password,
        primary_wallet_address: Some(request.primary_wallet_address),
        is_active: true,
        is_superuser: false,
    })?;

    let issued = state.tokens.issue(&user.alias, Vec::new())?;
    Ok((StatusCode::CREATED, Json(token_response(issued))))
}

#[utoipa::path(
    post,
    path = "/api/auth/token",
    request_body = LoginRequest,
    tag = "Auth",
    responses(
        (status = 200, body = TokenResponse),
        (status = 401, description = "Incorrect alias or password")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let user = UserRepository::new(&state.db)
        .get_by_alias(&request.alias)?
        .filter(|user| verify_password(&request.password, &user.hashed_password))
        .ok_or(AuthError::InvalidCredentials)?;

    if !user.is_active {
        return Err(AuthError::InactiveUser.into());
    }

    tracing::info!(user_id = user.id, "User logged in");
    let issued = state.tokens.issue(&user.alias, Vec::new())?;
    Ok(Json(token_response(issued)))
}

/// Revoke the presented token until it expires.
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    tag = "Auth",
    security(("bearer" = [])),
    responses((status = 200, body = StatusResponse))
)]
pub async fn logout(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<StatusResponse>, ApiError> {
    BlacklistRepository::new(&state.db).blacklist(&user.token, user.expires_at)?;
    tracing::info!(user_id = user.id(), "Token revoked");
    Ok(Json(StatusResponse {
        status: "ok".to_string(),
    }))
}
