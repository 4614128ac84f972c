// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, Json};
use serde_json::Value;

use crate::{error::ApiError, models::AddressList, state::AppState};

/// Locked Paideia tokens of the given addresses, passed through from danaides.
#[utoipa::path(
    post,
    path = "/api/assets/locked/paideia",
    request_body = AddressList,
    tag = "Assets",
    responses(
        (status = 200, description = "Response of the danaides service", body = Object),
        (status = 502, description = "danaides unavailable or returned garbage")
    )
)]
pub async fn locked_paideia(
    State(state): State<AppState>,
    Json(request): Json<AddressList>,
) -> Result<Json<Value>, ApiError> {
    let locked = state.danaides.locked_tokens(&request.addresses).await?;
    Ok(Json(locked))
}
