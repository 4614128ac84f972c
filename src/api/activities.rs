// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    auth::{Auth, SuperuserOnly},
    error::ApiError,
    models::{Activity, ActivityView, CreateActivity},
    state::AppState,
    storage::{repository::DEFAULT_ACTIVITY_LIMIT, ActivityRepository, ProfileRepository},
};

#[derive(Debug, Deserialize, IntoParams)]
pub struct FeedQuery {
    /// Maximum number of activities (default 100).
    pub limit: Option<usize>,
}

impl FeedQuery {
    fn limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_ACTIVITY_LIMIT)
    }
}

#[utoipa::path(
    get,
    path = "/api/activities/user/{user_details_id}",
    params(
        ("user_details_id" = u64, Path, description = "Profile id"),
        FeedQuery
    ),
    tag = "Activities",
    responses((status = 200, body = [ActivityView]))
)]
pub async fn user_activities(
    State(state): State<AppState>,
    Path(user_details_id): Path<u64>,
    Query(query): Query<FeedQuery>,
) -> Result<Json<Vec<ActivityView>>, ApiError> {
    Ok(Json(
        ActivityRepository::new(&state.db).user_activities(user_details_id, query.limit())?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/activities/dao/{dao_id}",
    params(("dao_id" = u64, Path, description = "DAO id"), FeedQuery),
    tag = "Activities",
    responses((status = 200, body = [ActivityView]))
)]
pub async fn dao_activities(
    State(state): State<AppState>,
    Path(dao_id): Path<u64>,
    Query(query): Query<FeedQuery>,
) -> Result<Json<Vec<ActivityView>>, ApiError> {
    Ok(Json(
        ActivityRepository::new(&state.db).dao_activities(dao_id, query.limit())?,
    ))
}

/// Record an activity for one of the caller's own profiles.
#[utoipa::path(
    post,
    path = "/api/activities",
    request_body = CreateActivity,
    tag = "Activities",
    security(("bearer" = [])),
    responses((status = 201, body = Activity), (status = 403), (status = 404))
)]
pub async fn create_activity(
    State(state): State<AppState>,
    Auth(caller): Auth,
    Json(request): Json<CreateActivity>,
) -> Result<(StatusCode, Json<Activity>), ApiError> {
    let profile = ProfileRepository::new(&state.db)
        .find_by_id(request.user_details_id)?
        .ok_or_else(|| ApiError::not_found(format!("Profile {} not found", request.user_details_id)))?;
    if profile.user_id != caller.id() && !caller.is_superuser() {
        return Err(ApiError::forbidden("Profile belongs to another user"));
    }

    let activity = ActivityRepository::new(&state.db).create(request)?;
    Ok((StatusCode::CREATED, Json(activity)))
}

#[utoipa::path(
    delete,
    path = "/api/activities/{activity_id}",
    params(("activity_id" = u64, Path, description = "Activity id")),
    tag = "Activities",
    security(("bearer" = [])),
    responses((status = 200, body = Activity), (status = 403), (status = 404))
)]
pub async fn delete_activity(
    State(state): State<AppState>,
    SuperuserOnly(admin): SuperuserOnly,
    Path(activity_id): Path<u64>,
) -> Result<Json<Activity>, ApiError> {
    let deleted = ActivityRepository::new(&state.db).delete(activity_id)?;
    tracing::info!(activity_id, deleted_by = admin.id(), "Activity deleted");
    Ok(Json(deleted))
}
