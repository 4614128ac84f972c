// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Proposal endpoints.
//!
//! Reads are public and served from the response cache when possible.
//! Every mutation evicts the proposal and its DAO listing from the cache.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{de::DeserializeOwned, Serialize};

use crate::{
    auth::Auth,
    error::ApiError,
    models::{
        AddReferenceRequest, Addendum, Comment, CommentLikes, CreateActivity, CreateAddendum,
        CreateComment, CreateProposal, FollowAction, FollowProposalRequest, LikeAction, LikeRequest,
        Proposal, ProposalFollowers, ProposalLikes, ProposalReferences, StatusResponse,
        UpdateProposalBasic,
    },
    state::AppState,
    storage::{
        cache::{dao_proposals_key, proposal_key},
        ActivityRepository, ProfileRepository, ProposalRepository, StoreResult,
    },
};

// =============================================================================
// Helpers
// =============================================================================

/// Serve `key` from the cache or compute and store it.
fn cached<T, F>(state: &AppState, key: String, load: F) -> Result<T, ApiError>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> StoreResult<T>,
{
    if let Some(value) = state.cache.get(&key) {
        match serde_json::from_value(value) {
            Ok(hit) => return Ok(hit),
            Err(e) => tracing::warn!(%key, error = %e, "Discarding undecodable cache entry"),
        }
    }
    let fresh = load()?;
    match serde_json::to_value(&fresh) {
        Ok(value) => state.cache.put(key, value),
        Err(e) => tracing::warn!(%key, error = %e, "Response not cached"),
    }
    Ok(fresh)
}

fn invalidate(state: &AppState, proposal_id: u64, dao_id: u64) {
    state.cache.invalidate(&proposal_key(proposal_id));
    state.cache.invalidate(&dao_proposals_key(dao_id));
}

/// Evict a proposal whose DAO is not known to the caller.
fn invalidate_by_id(state: &AppState, proposal_id: u64) {
    match ProposalRepository::new(&state.db).get_basic(proposal_id) {
        Ok(row) => invalidate(state, proposal_id, row.dao_id),
        Err(_) => {
            state.cache.invalidate(&proposal_key(proposal_id));
        }
    }
}

/// Append to the author's DAO activity feed. Failures are logged only.
fn record_activity(state: &AppState, user_id: u64, dao_id: u64, action: &str, value: &str) {
    let profile = match ProfileRepository::new(&state.db).find(user_id, dao_id) {
        Ok(Some(profile)) => profile,
        Ok(None) => return,
        Err(e) => {
            tracing::warn!(user_id, dao_id, error = %e, "Activity not recorded");
            return;
        }
    };
    let activity = CreateActivity {
        user_details_id: profile.id,
        action: action.to_string(),
        value: value.to_string(),
        secondary_action: None,
        secondary_value: None,
        category: Some("Proposal".to_string()),
    };
    if let Err(e) = ActivityRepository::new(&state.db).create(activity) {
        tracing::warn!(user_id, dao_id, error = %e, "Activity not recorded");
    }
}

// =============================================================================
// Proposals
// =============================================================================

#[utoipa::path(
    get,
    path = "/api/proposals/by_dao_id/{dao_id}",
    params(("dao_id" = u64, Path, description = "DAO id")),
    tag = "Proposals",
    responses((status = 200, body = [Proposal]))
)]
pub async fn get_proposals_by_dao(
    State(state): State<AppState>,
    Path(dao_id): Path<u64>,
) -> Result<Json<Vec<Proposal>>, ApiError> {
    let proposals = cached(&state, dao_proposals_key(dao_id), || {
        ProposalRepository::new(&state.db).by_dao(dao_id)
    })?;
    Ok(Json(proposals))
}

#[utoipa::path(
    get,
    path = "/api/proposals/{proposal_id}",
    params(("proposal_id" = u64, Path, description = "Proposal id")),
    tag = "Proposals",
    responses((status = 200, body = Proposal), (status = 404))
)]
pub async fn get_proposal(
    State(state): State<AppState>,
    Path(proposal_id): Path<u64>,
) -> Result<Json<Proposal>, ApiError> {
    let proposal = cached(&state, proposal_key(proposal_id), || {
        ProposalRepository::new(&state.db).get(proposal_id)
    })?;
    Ok(Json(proposal))
}

#[utoipa::path(
    post,
    path = "/api/proposals",
    request_body = CreateProposal,
    tag = "Proposals",
    security(("bearer" = [])),
    responses((status = 201, body = Proposal), (status = 404, description = "Referenced proposal missing"))
)]
pub async fn create_proposal(
    State(state): State<AppState>,
    Auth(caller): Auth,
    Json(request): Json<CreateProposal>,
) -> Result<(StatusCode, Json<Proposal>), ApiError> {
    let proposal = ProposalRepository::new(&state.db).create(caller.id(), request)?;
    state.cache.invalidate(&dao_proposals_key(proposal.dao_id));

    let action = if proposal.is_proposal {
        "created a proposal"
    } else {
        "created a discussion"
    };
    record_activity(&state, caller.id(), proposal.dao_id, action, &proposal.name);
    Ok((StatusCode::CREATED, Json(proposal)))
}

/// Overwrite only the fields present in the body. Author only.
#[utoipa::path(
    put,
    path = "/api/proposals/{proposal_id}",
    params(("proposal_id" = u64, Path, description = "Proposal id")),
    request_body = UpdateProposalBasic,
    tag = "Proposals",
    security(("bearer" = [])),
    responses((status = 200, body = Proposal), (status = 403), (status = 404))
)]
pub async fn edit_proposal(
    State(state): State<AppState>,
    Auth(caller): Auth,
    Path(proposal_id): Path<u64>,
    Json(patch): Json<UpdateProposalBasic>,
) -> Result<Json<Proposal>, ApiError> {
    let proposal = ProposalRepository::new(&state.db).edit_basic(caller.id(), proposal_id, patch)?;
    invalidate(&state, proposal_id, proposal.dao_id);
    Ok(Json(proposal))
}

/// Delete a proposal with its likes, followers, references, comments and
/// addendums. Author or superuser.
#[utoipa::path(
    delete,
    path = "/api/proposals/{proposal_id}",
    params(("proposal_id" = u64, Path, description = "Proposal id")),
    tag = "Proposals",
    security(("bearer" = [])),
    responses((status = 200, body = StatusResponse), (status = 403), (status = 404))
)]
pub async fn delete_proposal(
    State(state): State<AppState>,
    Auth(caller): Auth,
    Path(proposal_id): Path<u64>,
) -> Result<Json<StatusResponse>, ApiError> {
    let deleted = ProposalRepository::new(&state.db).delete(&caller.user, proposal_id)?;
    invalidate(&state, proposal_id, deleted.proposal.dao_id);
    // Referrers list the deleted proposal in their cached views.
    for referrer in deleted.referrers {
        invalidate_by_id(&state, referrer);
    }
    Ok(Json(StatusResponse {
        status: "ok".to_string(),
    }))
}

// =============================================================================
// Likes and followers
// =============================================================================

#[utoipa::path(
    get,
    path = "/api/proposals/{proposal_id}/likes",
    params(("proposal_id" = u64, Path, description = "Proposal id")),
    tag = "Proposals",
    responses((status = 200, body = ProposalLikes), (status = 404))
)]
pub async fn get_likes(
    State(state): State<AppState>,
    Path(proposal_id): Path<u64>,
) -> Result<Json<ProposalLikes>, ApiError> {
    Ok(Json(ProposalRepository::new(&state.db).likes(proposal_id)?))
}

/// `type` is one of `like`, `dislike`, `remove`.
#[utoipa::path(
    put,
    path = "/api/proposals/{proposal_id}/likes",
    params(("proposal_id" = u64, Path, description = "Proposal id")),
    request_body = LikeRequest,
    tag = "Proposals",
    security(("bearer" = [])),
    responses((status = 200, body = ProposalLikes), (status = 400), (status = 404))
)]
pub async fn set_likes(
    State(state): State<AppState>,
    Auth(caller): Auth,
    Path(proposal_id): Path<u64>,
    Json(request): Json<LikeRequest>,
) -> Result<Json<ProposalLikes>, ApiError> {
    let action: LikeAction = request.action.parse().map_err(ApiError::Validation)?;
    let likes = ProposalRepository::new(&state.db).set_like(proposal_id, caller.id(), action)?;
    invalidate_by_id(&state, proposal_id);
    Ok(Json(likes))
}

#[utoipa::path(
    get,
    path = "/api/proposals/{proposal_id}/followers",
    params(("proposal_id" = u64, Path, description = "Proposal id")),
    tag = "Proposals",
    responses((status = 200, body = ProposalFollowers), (status = 404))
)]
pub async fn get_followers(
    State(state): State<AppState>,
    Path(proposal_id): Path<u64>,
) -> Result<Json<ProposalFollowers>, ApiError> {
    Ok(Json(ProposalRepository::new(&state.db).followers(proposal_id)?))
}

/// `type` is one of `follow`, `unfollow`.
#[utoipa::path(
    put,
    path = "/api/proposals/{proposal_id}/followers",
    params(("proposal_id" = u64, Path, description = "Proposal id")),
    request_body = FollowProposalRequest,
    tag = "Proposals",
    security(("bearer" = [])),
    responses((status = 200, body = ProposalFollowers), (status = 400), (status = 404))
)]
pub async fn set_followers(
    State(state): State<AppState>,
    Auth(caller): Auth,
    Path(proposal_id): Path<u64>,
    Json(request): Json<FollowProposalRequest>,
) -> Result<Json<ProposalFollowers>, ApiError> {
    let action: FollowAction = request.action.parse().map_err(ApiError::Validation)?;
    let followers =
        ProposalRepository::new(&state.db).set_follower(proposal_id, caller.id(), action)?;
    invalidate_by_id(&state, proposal_id);
    Ok(Json(followers))
}

// =============================================================================
// References, comments and addendums
// =============================================================================

#[utoipa::path(
    get,
    path = "/api/proposals/{proposal_id}/references",
    params(("proposal_id" = u64, Path, description = "Proposal id")),
    tag = "Proposals",
    responses((status = 200, body = ProposalReferences), (status = 404))
)]
pub async fn get_references(
    State(state): State<AppState>,
    Path(proposal_id): Path<u64>,
) -> Result<Json<ProposalReferences>, ApiError> {
    Ok(Json(ProposalRepository::new(&state.db).references(proposal_id)?))
}

#[utoipa::path(
    post,
    path = "/api/proposals/{proposal_id}/references",
    params(("proposal_id" = u64, Path, description = "Proposal id")),
    request_body = AddReferenceRequest,
    tag = "Proposals",
    security(("bearer" = [])),
    responses((status = 200, body = ProposalReferences), (status = 403), (status = 404))
)]
pub async fn add_reference(
    State(state): State<AppState>,
    Auth(caller): Auth,
    Path(proposal_id): Path<u64>,
    Json(request): Json<AddReferenceRequest>,
) -> Result<Json<ProposalReferences>, ApiError> {
    let references = ProposalRepository::new(&state.db).add_reference(
        caller.id(),
        proposal_id,
        request.referred_proposal_id,
    )?;
    invalidate_by_id(&state, proposal_id);
    Ok(Json(references))
}

#[utoipa::path(
    get,
    path = "/api/proposals/{proposal_id}/comments",
    params(("proposal_id" = u64, Path, description = "Proposal id")),
    tag = "Proposals",
    responses((status = 200, body = [Comment]), (status = 404))
)]
pub async fn get_comments(
    State(state): State<AppState>,
    Path(proposal_id): Path<u64>,
) -> Result<Json<Vec<Comment>>, ApiError> {
    Ok(Json(ProposalRepository::new(&state.db).comments(proposal_id)?))
}

#[utoipa::path(
    post,
    path = "/api/proposals/{proposal_id}/comments",
    params(("proposal_id" = u64, Path, description = "Proposal id")),
    request_body = CreateComment,
    tag = "Proposals",
    security(("bearer" = [])),
    responses((status = 201, body = Comment), (status = 400), (status = 404))
)]
pub async fn add_comment(
    State(state): State<AppState>,
    Auth(caller): Auth,
    Path(proposal_id): Path<u64>,
    Json(request): Json<CreateComment>,
) -> Result<(StatusCode, Json<Comment>), ApiError> {
    let repo = ProposalRepository::new(&state.db);
    let comment = repo.add_comment(proposal_id, caller.id(), request)?;
    let proposal = repo.get_basic(proposal_id)?;
    invalidate(&state, proposal_id, proposal.dao_id);
    record_activity(&state, caller.id(), proposal.dao_id, "commented on", &proposal.name);
    Ok((StatusCode::CREATED, Json(comment)))
}

/// `type` is one of `like`, `dislike`, `remove`.
#[utoipa::path(
    put,
    path = "/api/proposals/comments/{comment_id}/likes",
    params(("comment_id" = u64, Path, description = "Comment id")),
    request_body = LikeRequest,
    tag = "Proposals",
    security(("bearer" = [])),
    responses((status = 200, body = CommentLikes), (status = 400), (status = 404))
)]
pub async fn set_comment_likes(
    State(state): State<AppState>,
    Auth(caller): Auth,
    Path(comment_id): Path<u64>,
    Json(request): Json<LikeRequest>,
) -> Result<Json<CommentLikes>, ApiError> {
    let action: LikeAction = request.action.parse().map_err(ApiError::Validation)?;
    let repo = ProposalRepository::new(&state.db);
    let likes = repo.set_comment_like(comment_id, caller.id(), action)?;
    invalidate_by_id(&state, repo.comment_proposal_id(comment_id)?);
    Ok(Json(likes))
}

#[utoipa::path(
    get,
    path = "/api/proposals/{proposal_id}/addendums",
    params(("proposal_id" = u64, Path, description = "Proposal id")),
    tag = "Proposals",
    responses((status = 200, body = [Addendum]), (status = 404))
)]
pub async fn get_addendums(
    State(state): State<AppState>,
    Path(proposal_id): Path<u64>,
) -> Result<Json<Vec<Addendum>>, ApiError> {
    Ok(Json(ProposalRepository::new(&state.db).addendums(proposal_id)?))
}

#[utoipa::path(
    post,
    path = "/api/proposals/{proposal_id}/addendums",
    params(("proposal_id" = u64, Path, description = "Proposal id")),
    request_body = CreateAddendum,
    tag = "Proposals",
    security(("bearer" = [])),
    responses((status = 201, body = Addendum), (status = 403), (status = 404))
)]
pub async fn add_addendum(
    State(state): State<AppState>,
    Auth(caller): Auth,
    Path(proposal_id): Path<u64>,
    Json(request): Json<CreateAddendum>,
) -> Result<(StatusCode, Json<Addendum>), ApiError> {
    let repo = ProposalRepository::new(&state.db);
    let addendum = repo.add_addendum(caller.id(), proposal_id, request)?;
    let proposal = repo.get_basic(proposal_id)?;
    invalidate(&state, proposal_id, proposal.dao_id);
    record_activity(&state, caller.id(), proposal.dao_id, "added an addendum to", &proposal.name);
    Ok((StatusCode::CREATED, Json(addendum)))
}

#[cfg(test)]
mod tests {
    use axum::http::Method;
    use serde_json::{json, Value};

    use super::*;
    use crate::api::tests::{send, user_with_token};
    use crate::state::tests::test_state;

    async fn create(state: &AppState, token: &str, name: &str) -> Value {
        let (status, body) = send(
            state,
            Method::POST,
            "/api/proposals",
            Some(token),
            Some(json!({"dao_id": 1, "name": name, "is_proposal": true})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        body
    }

    #[tokio::test]
    async fn mutations_require_a_token() {
        let (state, _dir) = test_state();
        let (status, _) = send(
            &state,
            Method::POST,
            "/api/proposals",
            None,
            Some(json!({"dao_id": 1, "name": "p"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn likes_invalidate_the_cached_view() {
        let (state, _dir) = test_state();
        let (_, token) = user_with_token(&state, "alice", false);
        let proposal = create(&state, &token, "budget").await;
        let uri = format!("/api/proposals/{}", proposal["id"]);

        // Populate the cache.
        let (status, body) = send(&state, Method::GET, &uri, None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["likes"], json!([]));

        let (status, likes) = send(
            &state,
            Method::PUT,
            &format!("{uri}/likes"),
            Some(&token),
            Some(json!({"type": "like"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(likes["likes"].as_array().unwrap().len(), 1);

        let (_, body) = send(&state, Method::GET, &uri, None, None).await;
        assert_eq!(body["likes"], likes["likes"]);
    }

    #[tokio::test]
    async fn unknown_like_type_is_rejected() {
        let (state, _dir) = test_state();
        let (_, token) = user_with_token(&state, "alice", false);
        let proposal = create(&state, &token, "budget").await;

        let (status, body) = send(
            &state,
            Method::PUT,
            &format!("/api/proposals/{}/likes", proposal["id"]),
            Some(&token),
            Some(json!({"type": "love"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("like, dislike, remove"));
    }

    #[tokio::test]
    async fn only_author_edits_and_partial_edit_keeps_fields() {
        let (state, _dir) = test_state();
        let (_, alice) = user_with_token(&state, "alice", false);
        let (_, bob) = user_with_token(&state, "bob", false);
        let proposal = create(&state, &alice, "budget").await;
        let uri = format!("/api/proposals/{}", proposal["id"]);

        let (status, _) =
            send(&state, Method::PUT, &uri, Some(&bob), Some(json!({"name": "mine"}))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) =
            send(&state, Method::PUT, &uri, Some(&alice), Some(json!({"status": "active"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "active");
        assert_eq!(body["name"], "budget");
    }

    #[tokio::test]
    async fn dao_listing_reflects_creation_and_deletion() {
        let (state, _dir) = test_state();
        let (_, token) = user_with_token(&state, "alice", false);

        let (_, listing) = send(&state, Method::GET, "/api/proposals/by_dao_id/1", None, None).await;
        assert_eq!(listing, json!([]));

        let proposal = create(&state, &token, "budget").await;
        let (_, listing) = send(&state, Method::GET, "/api/proposals/by_dao_id/1", None, None).await;
        assert_eq!(listing.as_array().unwrap().len(), 1);

        let uri = format!("/api/proposals/{}", proposal["id"]);
        let (status, _) = send(&state, Method::DELETE, &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);

        let (_, listing) = send(&state, Method::GET, "/api/proposals/by_dao_id/1", None, None).await;
        assert_eq!(listing, json!([]));
        let (status, _) = send(&state, Method::GET, &uri, None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn deleting_a_referenced_proposal_refreshes_referrers() {
        let (state, _dir) = test_state();
        let (_, token) = user_with_token(&state, "alice", false);
        let target = create(&state, &token, "target").await;
        let referrer = create(&state, &token, "referrer").await;
        let referrer_uri = format!("/api/proposals/{}", referrer["id"]);

        let (status, _) = send(
            &state,
            Method::POST,
            &format!("{referrer_uri}/references"),
            Some(&token),
            Some(json!({"referred_proposal_id": target["id"]})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (_, view) = send(&state, Method::GET, &referrer_uri, None, None).await;
        assert_eq!(view["references"], json!([target["id"]]));
        send(&state, Method::GET, "/api/proposals/by_dao_id/1", None, None).await;

        let (status, _) = send(
            &state,
            Method::DELETE,
            &format!("/api/proposals/{}", target["id"]),
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (_, view) = send(&state, Method::GET, &referrer_uri, None, None).await;
        assert_eq!(view["references"], json!([]));
        assert_eq!(view["references_meta"], json!([]));
        let (_, listing) = send(&state, Method::GET, "/api/proposals/by_dao_id/1", None, None).await;
        assert_eq!(listing.as_array().unwrap().len(), 1);
        assert_eq!(listing[0]["references"], json!([]));
    }

    #[tokio::test]
    async fn comments_and_addendums_record_activity() {
        let (state, _dir) = test_state();
        let (alice, token) = user_with_token(&state, "alice", false);
        let profile = ProfileRepository::new(&state.db).create_profile(alice.id, 1).unwrap();
        let proposal = create(&state, &token, "budget").await;
        let uri = format!("/api/proposals/{}", proposal["id"]);

        let (status, comment) = send(
            &state,
            Method::POST,
            &format!("{uri}/comments"),
            Some(&token),
            Some(json!({"comment": "looks good"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(comment["alias"], "alice");

        let (status, likes) = send(
            &state,
            Method::PUT,
            &format!("/api/proposals/comments/{}/likes", comment["id"]),
            Some(&token),
            Some(json!({"type": "dislike"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(likes["dislikes"], json!([alice.id]));

        let (status, _) = send(
            &state,
            Method::POST,
            &format!("{uri}/addendums"),
            Some(&token),
            Some(json!({"name": "Budget", "content": "1000 ERG"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let feed = ActivityRepository::new(&state.db)
            .user_activities(profile.id, 10)
            .unwrap();
        let actions: Vec<&str> = feed.iter().map(|a| a.action.as_str()).collect();
        assert_eq!(actions.len(), 3);
        assert!(actions.contains(&"created a proposal"));
        assert!(actions.contains(&"commented on"));
        assert!(actions.contains(&"added an addendum to"));

        let (_, view) = send(&state, Method::GET, &uri, None, None).await;
        assert_eq!(view["comments"].as_array().unwrap().len(), 1);
        assert_eq!(view["addendums"].as_array().unwrap().len(), 1);
    }
}
