// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::DefaultBodyLimit,
    http::HeaderName,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    models::{
        Activity, ActivityView, AddReferenceRequest, Addendum, AddressList, Comment, CommentLikes,
        CreateActivity, CreateAddendum, CreateComment, CreateProposal, ErgoAddress,
        FollowProposalRequest, FollowUserRequest, InvalidateCacheRequest, InvalidateCacheResponse,
        LikeRequest, LoginRequest, PrimaryAddressRequest, Proposal, ProposalFollowers,
        ProposalLikes, ProposalReferenceMeta, ProposalReferences, SignUpRequest, SocialLink,
        StatusResponse, TokenResponse, UpdateProposalBasic, UpdateUserDetails,
        UpdateUserProfileSettings, UploadResponse, UserAddressConfig, UserDetails, UserEdit,
        UserFollowers, UserProfileSettings, UserResponse, UserSearchResult,
    },
    state::AppState,
};

pub mod activities;
pub mod assets;
pub mod auth;
pub mod health;
pub mod proposals;
pub mod users;
pub mod util;

const REQUEST_ID_HEADER: &str = "x-request-id";

pub fn router(state: AppState) -> Router {
    let auth_routes = Router::new()
        .route("/signup", post(auth::sign_up))
        .route("/token", post(auth::login))
        .route("/logout", post(auth::logout));

    let user_routes = Router::new()
        .route("/", get(users::list_users))
        .route("/me", get(users::me))
        .route("/search", get(users::search_users))
        .route("/follow", put(users::update_follower))
        .route("/by_address/{address}", get(users::get_by_wallet_address))
        .route("/by_addresses", post(users::get_by_wallet_addresses))
        .route("/dao/{dao_id}", get(users::dao_users))
        .route(
            "/{user_id}",
            get(users::get_user).put(users::edit_user).delete(users::delete_user),
        )
        .route(
            "/{user_id}/addresses",
            get(users::get_addresses).put(users::set_addresses),
        )
        .route(
            "/{user_id}/primary_address",
            get(users::get_primary_address).put(users::update_primary_address),
        )
        .route("/{user_id}/followers", get(users::get_followers))
        .route(
            "/{user_id}/profile/{dao_id}",
            get(users::get_profile)
                .post(users::create_profile)
                .put(users::edit_profile),
        )
        .route(
            "/{user_id}/profile/{dao_id}/settings",
            get(users::get_profile_settings).put(users::edit_profile_settings),
        );

    let proposal_routes = Router::new()
        .route("/", post(proposals::create_proposal))
        .route("/by_dao_id/{dao_id}", get(proposals::get_proposals_by_dao))
        .route(
            "/comments/{comment_id}/likes",
            put(proposals::set_comment_likes),
        )
        .route(
            "/{proposal_id}",
            get(proposals::get_proposal)
                .put(proposals::edit_proposal)
                .delete(proposals::delete_proposal),
        )
        .route(
            "/{proposal_id}/likes",
            get(proposals::get_likes).put(proposals::set_likes),
        )
        .route(
            "/{proposal_id}/followers",
            get(proposals::get_followers).put(proposals::set_followers),
        )
        .route(
            "/{proposal_id}/references",
            get(proposals::get_references).post(proposals::add_reference),
        )
        .route(
            "/{proposal_id}/comments",
            get(proposals::get_comments).post(proposals::add_comment),
        )
        .route(
            "/{proposal_id}/addendums",
            get(proposals::get_addendums).post(proposals::add_addendum),
        );

    let activity_routes = Router::new()
        .route("/", post(activities::create_activity))
        .route("/user/{user_details_id}", get(activities::user_activities))
        .route("/dao/{dao_id}", get(activities::dao_activities))
        .route("/{activity_id}", delete(activities::delete_activity));

    // The limit layer covers only the upload routes above it.
    let util_routes = Router::new()
        .route("/upload_file", post(util::upload_file))
        .route("/upload_image/{compression_type}", post(util::upload_image))
        .layer(DefaultBodyLimit::max(state.max_upload_bytes))
        .route("/force_invalidate_cache", post(util::force_invalidate_cache));

    let api_routes = Router::new()
        .route("/ping", get(health::ping))
        .nest("/auth", auth_routes)
        .nest("/users", user_routes)
        .nest("/proposals", proposal_routes)
        .nest("/activities", activity_routes)
        .route("/assets/locked/paideia", post(assets::locked_paideia))
        .nest("/util", util_routes);

    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    Router::new()
        .route("/health", get(health::health))
        .nest("/api", api_routes)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(PropagateRequestIdLayer::new(request_id.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid))
        .layer(CorsLayer::permissive())
}

/// Registers the bearer scheme referenced by authenticated paths.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    paths(
        health::ping,
        health::health,
        auth::sign_up,
        auth::login,
        auth::logout,
        users::list_users,
        users::me,
        users::search_users,
        users::get_user,
        users::edit_user,
        users::delete_user,
        users::get_by_wallet_address,
        users::get_by_wallet_addresses,
        users::dao_users,
        users::get_addresses,
        users::set_addresses,
        users::get_primary_address,
        users::update_primary_address,
        users::get_followers,
        users::update_follower,
        users::get_profile,
        users::create_profile,
        users::edit_profile,
        users::get_profile_settings,
        users::edit_profile_settings,
        proposals::get_proposals_by_dao,
        proposals::create_proposal,
        proposals::get_proposal,
        proposals::edit_proposal,
        proposals::delete_proposal,
        proposals::get_likes,
        proposals::set_likes,
        proposals::get_followers,
        proposals::set_followers,
        proposals::get_references,
        proposals::add_reference,
        proposals::get_comments,
        proposals::add_comment,
        proposals::set_comment_likes,
        proposals::get_addendums,
        proposals::add_addendum,
        activities::user_activities,
        activities::dao_activities,
        activities::create_activity,
        activities::delete_activity,
        assets::locked_paideia,
        util::upload_file,
        util::upload_image,
        util::force_invalidate_cache
    ),
    components(
        schemas(
            health::PingResponse,
            health::HealthResponse,
            users::PrimaryAddressResponse,
            SignUpRequest,
            LoginRequest,
            TokenResponse,
            StatusResponse,
            UserResponse,
            UserEdit,
            ErgoAddress,
            UserAddressConfig,
            PrimaryAddressRequest,
            AddressList,
            UserSearchResult,
            SocialLink,
            UserDetails,
            UpdateUserDetails,
            UserProfileSettings,
            UpdateUserProfileSettings,
            UserFollowers,
            FollowUserRequest,
            CreateProposal,
            UpdateProposalBasic,
            LikeRequest,
            FollowProposalRequest,
            AddReferenceRequest,
            CreateComment,
            CreateAddendum,
            Comment,
            Addendum,
            ProposalReferenceMeta,
            Proposal,
            ProposalLikes,
            CommentLikes,
            ProposalFollowers,
            ProposalReferences,
            CreateActivity,
            Activity,
            ActivityView,
            UploadResponse,
            InvalidateCacheRequest,
            InvalidateCacheResponse
        )
    ),
    tags(
        (name = "Health", description = "Liveness and health checks"),
        (name = "Auth", description = "Sign-up, login and logout"),
        (name = "Users", description = "Accounts, addresses, profiles and follows"),
        (name = "Proposals", description = "Proposals and their likes, followers, references, comments and addendums"),
        (name = "Activities", description = "Activity feeds"),
        (name = "Assets", description = "Locked token lookups"),
        (name = "Util", description = "Uploads and cache maintenance")
    )
)]
pub struct ApiDoc;
