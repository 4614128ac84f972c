// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User endpoints: accounts, wallet addresses, DAO profiles and follows.
//!
//! Account data requires an active caller acting on itself (or a
//! superuser). Profiles, follower lists, DAO member lists and search are
//! public.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::{
    auth::{Auth, AuthenticatedUser, SuperuserOnly},
    error::ApiError,
    models::{
        AddressList, ErgoAddress, FollowUserRequest, PrimaryAddressRequest, UpdateUserDetails,
        UpdateUserProfileSettings, UserAddressConfig, UserDetails, UserEdit, UserFollowers,
        UserProfileSettings, UserResponse, UserSearchResult,
    },
    state::AppState,
    storage::{ProfileRepository, UserRepository},
};

const DEFAULT_PAGE_SIZE: usize = 100;

#[derive(Debug, Deserialize, IntoParams)]
pub struct Pagination {
    /// Number of users to skip (default 0).
    pub skip: Option<usize>,
    /// Maximum number of users returned (default 100).
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct SearchQuery {
    /// Case-insensitive fragment of an alias, address or profile name.
    pub q: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PrimaryAddressResponse {
    pub user_id: u64,
    pub address: Option<String>,
}

fn ensure_self_or_superuser(caller: &AuthenticatedUser, user_id: u64) -> Result<(), ApiError> {
    if caller.id() == user_id || caller.is_superuser() {
        Ok(())
    } else {
        Err(ApiError::forbidden("Not allowed to act on another user"))
    }
}

// =============================================================================
// Accounts
// =============================================================================

#[utoipa::path(
    get,
    path = "/api/users",
    params(Pagination),
    tag = "Users",
    security(("bearer" = [])),
    responses((status = 200, body = [UserResponse]))
)]
pub async fn list_users(
    State(state): State<AppState>,
    SuperuserOnly(_admin): SuperuserOnly,
    Query(page): Query<Pagination>,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    let users = UserRepository::new(&state.db).list(
        page.skip.unwrap_or(0),
        page.limit.unwrap_or(DEFAULT_PAGE_SIZE),
    )?;
    Ok(Json(users.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    get,
    path = "/api/users/me",
    tag = "Users",
    security(("bearer" = [])),
    responses((status = 200, body = UserResponse))
)]
pub async fn me(Auth(user): Auth) -> Json<UserResponse> {
    Json(user.user.into())
}

#[utoipa::path(
    get,
    path = "/api/users/search",
    params(SearchQuery),
    tag = "Users",
    responses((status = 200, body = [UserSearchResult]))
)]
pub async fn search_users(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<UserSearchResult>>, ApiError> {
    Ok(Json(UserRepository::new(&state.db).search(&query.q)?))
}

#[utoipa::path(
    get,
    path = "/api/users/{user_id}",
    params(("user_id" = u64, Path, description = "User id")),
    tag = "Users",
    security(("bearer" = [])),
    responses((status = 200, body = UserResponse), (status = 404))
)]
pub async fn get_user(
    State(state): State<AppState>,
    Auth(_caller): Auth,
    Path(user_id): Path<u64>,
) -> Result<Json<UserResponse>, ApiError> {
    Ok(Json(UserRepository::new(&state.db).get(user_id)?.into()))
}

/// Partial update. Only superusers may change the active or superuser flags.
#[utoipa::path(
    put,
    path = "/api/users/{user_id}",
    params(("user_id" = u64, Path, description = "User id")),
    request_body = UserEdit,
    tag = "Users",
    security(("bearer" = [])),
    responses((status = 200, body = UserResponse), (status = 403), (status = 404))
)]
pub async fn edit_user(
    State(state): State<AppState>,
    Auth(caller): Auth,
    Path(user_id): Path<u64>,
    Json(edit): Json<UserEdit>,
) -> Result<Json<UserResponse>, ApiError> {
    ensure_self_or_superuser(&caller, user_id)?;
    if !caller.is_superuser() && (edit.is_active.is_some() || edit.is_superuser.is_some()) {
        return Err(ApiError::forbidden("Only superusers may change account flags"));
    }
    Ok(Json(UserRepository::new(&state.db).edit(user_id, edit)?.into()))
}

#[utoipa::path(
    delete,
    path = "/api/users/{user_id}",
    params(("user_id" = u64, Path, description = "User id")),
    tag = "Users",
    security(("bearer" = [])),
    responses((status = 200, body = UserResponse), (status = 403), (status = 404))
)]
pub async fn delete_user(
    State(state): State<AppState>,
    Auth(caller): Auth,
    Path(user_id): Path<u64>,
) -> Result<Json<UserResponse>, ApiError> {
    ensure_self_or_superuser(&caller, user_id)?;
    let deleted = UserRepository::new(&state.db).delete(user_id)?;
    tracing::info!(user_id, deleted_by = caller.id(), "User deleted");
    Ok(Json(deleted.into()))
}

#[utoipa::path(
    get,
    path = "/api/users/by_address/{address}",
    params(("address" = String, Path, description = "Wallet address")),
    tag = "Users",
    responses((status = 200, body = UserResponse), (status = 404))
)]
pub async fn get_by_wallet_address(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = UserRepository::new(&state.db)
        .get_by_wallet_address(&address)?
        .ok_or_else(|| ApiError::not_found(format!("No user owns address {address}")))?;
    Ok(Json(user.into()))
}

/// First user owning any of the addresses, in request order.
#[utoipa::path(
    post,
    path = "/api/users/by_addresses",
    request_body = AddressList,
    tag = "Users",
    responses((status = 200, body = UserResponse), (status = 404))
)]
pub async fn get_by_wallet_addresses(
    State(state): State<AppState>,
    Json(request): Json<AddressList>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = UserRepository::new(&state.db)
        .get_by_wallet_addresses(&request.addresses)?
        .ok_or_else(|| ApiError::not_found("No user owns any of the addresses"))?;
    Ok(Json(user.into()))
}

#[utoipa::path(
    get,
    path = "/api/users/dao/{dao_id}",
    params(("dao_id" = u64, Path, description = "DAO id")),
    tag = "Users",
    responses((status = 200, body = [UserDetails]))
)]
pub async fn dao_users(
    State(state): State<AppState>,
    Path(dao_id): Path<u64>,
) -> Result<Json<Vec<UserDetails>>, ApiError> {
    Ok(Json(ProfileRepository::new(&state.db).dao_users(dao_id)?))
}

// =============================================================================
// Addresses
// =============================================================================

#[utoipa::path(
    get,
    path = "/api/users/{user_id}/addresses",
    params(("user_id" = u64, Path, description = "User id")),
    tag = "Users",
    security(("bearer" = [])),
    responses((status = 200, body = UserAddressConfig))
)]
pub async fn get_addresses(
    State(state): State<AppState>,
    Auth(caller): Auth,
    Path(user_id): Path<u64>,
) -> Result<Json<UserAddressConfig>, ApiError> {
    ensure_self_or_superuser(&caller, user_id)?;
    Ok(Json(UserRepository::new(&state.db).address_config(user_id)?))
}

/// Register any of the given addresses the user does not own yet.
#[utoipa::path(
    put,
    path = "/api/users/{user_id}/addresses",
    params(("user_id" = u64, Path, description = "User id")),
    request_body = AddressList,
    tag = "Users",
    security(("bearer" = [])),
    responses((status = 200, body = [ErgoAddress]), (status = 409))
)]
pub async fn set_addresses(
    State(state): State<AppState>,
    Auth(caller): Auth,
    Path(user_id): Path<u64>,
    Json(request): Json<AddressList>,
) -> Result<Json<Vec<ErgoAddress>>, ApiError> {
    ensure_self_or_superuser(&caller, user_id)?;
    Ok(Json(
        UserRepository::new(&state.db).set_addresses(user_id, &request.addresses)?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/users/{user_id}/primary_address",
    params(("user_id" = u64, Path, description = "User id")),
    tag = "Users",
    responses((status = 200, body = PrimaryAddressResponse), (status = 404))
)]
pub async fn get_primary_address(
    State(state): State<AppState>,
    Path(user_id): Path<u64>,
) -> Result<Json<PrimaryAddressResponse>, ApiError> {
    let address = UserRepository::new(&state.db).primary_wallet_address(user_id)?;
    Ok(Json(PrimaryAddressResponse { user_id, address }))
}

/// Make `address` primary (registering it first if needed) and use it as
/// the alias.
#[utoipa::path(
    put,
    path = "/api/users/{user_id}/primary_address",
    params(("user_id" = u64, Path, description = "User id")),
    request_body = PrimaryAddressRequest,
    tag = "Users",
    security(("bearer" = [])),
    responses((status = 200, body = UserAddressConfig), (status = 409))
)]
pub async fn update_primary_address(
    State(state): State<AppState>,
    Auth(caller): Auth,
    Path(user_id): Path<u64>,
    Json(request): Json<PrimaryAddressRequest>,
) -> Result<Json<UserAddressConfig>, ApiError> {
    ensure_self_or_superuser(&caller, user_id)?;
    Ok(Json(
        UserRepository::new(&state.db).update_primary_address(user_id, &request.address)?,
    ))
}

// =============================================================================
// Follow graph
// =============================================================================

#[utoipa::path(
    get,
    path = "/api/users/{user_id}/followers",
    params(("user_id" = u64, Path, description = "User id")),
    tag = "Users",
    responses((status = 200, body = UserFollowers))
)]
pub async fn get_followers(
    State(state): State<AppState>,
    Path(user_id): Path<u64>,
) -> Result<Json<UserFollowers>, ApiError> {
    Ok(Json(UserRepository::new(&state.db).followers(user_id)?))
}

/// Follow or unfollow `user_id` as the caller. Returns the caller's summary.
#[utoipa::path(
    put,
    path = "/api/users/follow",
    request_body = FollowUserRequest,
    tag = "Users",
    security(("bearer" = [])),
    responses((status = 200, body = UserFollowers), (status = 400), (status = 404))
)]
pub async fn update_follower(
    State(state): State<AppState>,
    Auth(caller): Auth,
    Json(request): Json<FollowUserRequest>,
) -> Result<Json<UserFollowers>, ApiError> {
    if request.user_id == caller.id() {
        return Err(ApiError::bad_request("Users cannot follow themselves"));
    }
    Ok(Json(
        UserRepository::new(&state.db).update_follower(caller.id(), &request)?,
    ))
}

// =============================================================================
// Profiles
// =============================================================================

#[utoipa::path(
    get,
    path = "/api/users/{user_id}/profile/{dao_id}",
    params(
        ("user_id" = u64, Path, description = "User id"),
        ("dao_id" = u64, Path, description = "DAO id")
    ),
    tag = "Users",
    responses((status = 200, body = UserDetails), (status = 404))
)]
pub async fn get_profile(
    State(state): State<AppState>,
    Path((user_id, dao_id)): Path<(u64, u64)>,
) -> Result<Json<UserDetails>, ApiError> {
    Ok(Json(ProfileRepository::new(&state.db).get_profile(user_id, dao_id)?))
}

/// Join a DAO. Returns the existing profile when already a member.
#[utoipa::path(
    post,
    path = "/api/users/{user_id}/profile/{dao_id}",
    params(
        ("user_id" = u64, Path, description = "User id"),
        ("dao_id" = u64, Path, description = "DAO id")
    ),
    tag = "Users",
    security(("bearer" = [])),
    responses((status = 200, body = UserDetails), (status = 403))
)]
pub async fn create_profile(
    State(state): State<AppState>,
    Auth(caller): Auth,
    Path((user_id, dao_id)): Path<(u64, u64)>,
) -> Result<Json<UserDetails>, ApiError> {
    ensure_self_or_superuser(&caller, user_id)?;
    Ok(Json(ProfileRepository::new(&state.db).create_profile(user_id, dao_id)?))
}

#[utoipa::path(
    put,
    path = "/api/users/{user_id}/profile/{dao_id}",
    params(
        ("user_id" = u64, Path, description = "User id"),
        ("dao_id" = u64, Path, description = "DAO id")
    ),
    request_body = UpdateUserDetails,
    tag = "Users",
    security(("bearer" = [])),
    responses((status = 200, body = UserDetails), (status = 403), (status = 404))
)]
pub async fn edit_profile(
    State(state): State<AppState>,
    Auth(caller): Auth,
    Path((user_id, dao_id)): Path<(u64, u64)>,
    Json(update): Json<UpdateUserDetails>,
) -> Result<Json<UserDetails>, ApiError> {
    ensure_self_or_superuser(&caller, user_id)?;
    Ok(Json(
        ProfileRepository::new(&state.db).edit_profile(user_id, dao_id, update)?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/users/{user_id}/profile/{dao_id}/settings",
    params(
        ("user_id" = u64, Path, description = "User id"),
        ("dao_id" = u64, Path, description = "DAO id")
    ),
    tag = "Users",
    security(("bearer" = [])),
    responses((status = 200, body = UserProfileSettings), (status = 404))
)]
pub async fn get_profile_settings(
    State(state): State<AppState>,
    Auth(caller): Auth,
    Path((user_id, dao_id)): Path<(u64, u64)>,
) -> Result<Json<UserProfileSettings>, ApiError> {
    ensure_self_or_superuser(&caller, user_id)?;
    Ok(Json(ProfileRepository::new(&state.db).get_settings(user_id, dao_id)?))
}

/// Merge the given keys into the stored settings.
#[utoipa::path(
    put,
    path = "/api/users/{user_id}/profile/{dao_id}/settings",
    params(
        ("user_id" = u64, Path, description = "User id"),
        ("dao_id" = u64, Path, description = "DAO id")
    ),
    request_body = UpdateUserProfileSettings,
    tag = "Users",
    security(("bearer" = [])),
    responses((status = 200, body = UserProfileSettings), (status = 404))
)]
pub async fn edit_profile_settings(
    State(state): State<AppState>,
    Auth(caller): Auth,
    Path((user_id, dao_id)): Path<(u64, u64)>,
    Json(update): Json<UpdateUserProfileSettings>,
) -> Result<Json<UserProfileSettings>, ApiError> {
    ensure_self_or_superuser(&caller, user_id)?;
    Ok(Json(
        ProfileRepository::new(&state.db).edit_settings(user_id, dao_id, update)?,
    ))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use crate::api::tests::{send, user_with_token};
    use crate::state::tests::test_state;

    #[tokio::test]
    async fn listing_users_requires_superuser() {
        let (state, _dir) = test_state();
        let (_, user_token) = user_with_token(&state, "alice", false);
        let (_, admin_token) = user_with_token(&state, "root", true);

        let (status, _) = send(&state, Method::GET, "/api/users", Some(&user_token), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) =
            send(&state, Method::GET, "/api/users?limit=1", Some(&admin_token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn users_cannot_edit_each_other() {
        let (state, _dir) = test_state();
        let (alice, alice_token) = user_with_token(&state, "alice", false);
        let (bob, _) = user_with_token(&state, "bob", false);

        let uri = format!("/api/users/{}", bob.id);
        let (status, _) = send(
            &state,
            Method::PUT,
            &uri,
            Some(&alice_token),
            Some(json!({"alias": "mallory"})),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let uri = format!("/api/users/{}", alice.id);
        let (status, _) = send(
            &state,
            Method::PUT,
            &uri,
            Some(&alice_token),
            Some(json!({"is_superuser": true})),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn partial_edit_keeps_other_fields() {
        let (state, _dir) = test_state();
        let (alice, token) = user_with_token(&state, "alice", false);

        let uri = format!("/api/users/{}", alice.id);
        let (status, body) = send(
            &state,
            Method::PUT,
            &uri,
            Some(&token),
            Some(json!({"password": "new-password"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["alias"], "alice");
        assert_eq!(body["is_active"], true);
    }

    #[tokio::test]
    async fn follow_is_directed_and_reported_for_the_caller() {
        let (state, _dir) = test_state();
        let (alice, alice_token) = user_with_token(&state, "alice", false);
        let (bob, _) = user_with_token(&state, "bob", false);

        let (status, body) = send(
            &state,
            Method::PUT,
            "/api/users/follow",
            Some(&alice_token),
            Some(json!({"user_id": bob.id, "type": "follow"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["following"], json!([bob.id]));
        assert_eq!(body["followers"], json!([]));

        let uri = format!("/api/users/{}/followers", bob.id);
        let (_, body) = send(&state, Method::GET, &uri, None, None).await;
        assert_eq!(body["followers"], json!([alice.id]));
        assert_eq!(body["following"], json!([]));

        let (status, _) = send(
            &state,
            Method::PUT,
            "/api/users/follow",
            Some(&alice_token),
            Some(json!({"user_id": bob.id, "type": "befriend"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn profile_lifecycle() {
        let (state, _dir) = test_state();
        let (alice, token) = user_with_token(&state, "alice", false);
        let uri = format!("/api/users/{}/profile/7", alice.id);

        let (status, _) = send(&state, Method::GET, &uri, None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = send(&state, Method::POST, &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "alice");

        let (status, body) = send(
            &state,
            Method::PUT,
            &uri,
            Some(&token),
            Some(json!({"bio": "hello"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["bio"], "hello");
        assert_eq!(body["name"], "alice");

        let settings_uri = format!("{uri}/settings");
        let (status, body) = send(
            &state,
            Method::PUT,
            &settings_uri,
            Some(&token),
            Some(json!({"settings": {"theme": "dark"}})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["settings"]["theme"], "dark");

        let (_, members) = send(&state, Method::GET, "/api/users/dao/7", None, None).await;
        assert_eq!(members.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn primary_address_becomes_alias() {
        let (state, _dir) = test_state();
        let (alice, token) = user_with_token(&state, "alice", false);

        let uri = format!("/api/users/{}/primary_address", alice.id);
        let (status, body) = send(
            &state,
            Method::PUT,
            &uri,
            Some(&token),
            Some(json!({"address": "9fPrimary"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["alias"], "9fPrimary");

        let (_, body) = send(&state, Method::GET, &uri, None, None).await;
        assert_eq!(body["address"], "9fPrimary");

        let (status, body) =
            send(&state, Method::GET, "/api/users/by_address/9fPrimary", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], alice.id);
    }
}
