// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Request and response structures used by the REST API. All types derive
//! `Serialize`/`Deserialize` and `ToSchema` for JSON handling and the
//! OpenAPI document.
//!
//! ## Model Categories
//!
//! - **Auth**: sign-up, login and token payloads
//! - **Users**: accounts, wallet addresses, per-DAO profiles, follow graph
//! - **Proposals**: the aggregated proposal view and its sub-resources
//! - **Activities**: activity log entries and their denormalized view
//! - **Assets / Util**: locked-asset lookups, uploads, cache control
//!
//! Partial-update requests (`UserEdit`, `UpdateUserDetails`,
//! `UpdateProposalBasic`) use `Option` fields: a field that is absent from
//! the body leaves the stored column untouched.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

// =============================================================================
// Auth
// =============================================================================

/// Sign-up request: alias plus the wallet address that becomes primary.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SignUpRequest {
    pub alias: String,
    pub primary_wallet_address: String,
    /// Optional password. Wallet-first accounts omit it.
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub alias: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    /// Expiry as a unix timestamp (seconds).
    pub expires_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StatusResponse {
    pub status: String,
}

// =============================================================================
// Users
// =============================================================================

/// Public view of a user account (never includes the password hash).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct UserResponse {
    pub id: u64,
    pub alias: String,
    pub primary_wallet_address_id: Option<u64>,
    pub is_active: bool,
    pub is_superuser: bool,
}

/// Partial user update.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UserEdit {
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub primary_wallet_address_id: Option<u64>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub is_superuser: Option<bool>,
    #[serde(default)]
    pub password: Option<String>,
}

/// A wallet address registered to a user.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct ErgoAddress {
    pub id: u64,
    pub user_id: u64,
    pub address: String,
    pub is_smart_contract: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct UserAddressConfig {
    pub id: u64,
    pub alias: String,
    pub registered_addresses: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PrimaryAddressRequest {
    pub address: String,
}

/// A list of wallet addresses (asset lookups, address registration).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AddressList {
    pub addresses: Vec<String>,
}

/// One row of a user search: a (user, address, profile) combination.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct UserSearchResult {
    pub id: u64,
    pub dao_id: u64,
    pub alias: String,
    pub address: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct SocialLink {
    pub social_network: String,
    pub link_url: String,
}

/// Per-DAO user profile with derived follower lists.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct UserDetails {
    pub id: u64,
    pub user_id: u64,
    pub dao_id: u64,
    pub name: String,
    pub profile_img_url: Option<String>,
    pub bio: Option<String>,
    pub level: u32,
    pub xp: u64,
    pub followers: Vec<u64>,
    pub following: Vec<u64>,
    pub social_links: Vec<SocialLink>,
}

/// Partial profile update.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateUserDetails {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub profile_img_url: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub level: Option<u32>,
    #[serde(default)]
    pub xp: Option<u64>,
    #[serde(default)]
    pub social_links: Option<Vec<SocialLink>>,
}

/// Free-form per-DAO profile settings.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct UserProfileSettings {
    pub user_id: u64,
    pub dao_id: u64,
    #[schema(value_type = Object)]
    pub settings: Value,
}

/// Settings keys to overwrite; keys not listed are kept.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateUserProfileSettings {
    #[schema(value_type = Object)]
    pub settings: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct UserFollowers {
    pub followers: Vec<u64>,
    pub following: Vec<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FollowUserRequest {
    /// The user to follow or unfollow.
    pub user_id: u64,
    /// `follow` or `unfollow`.
    #[serde(rename = "type")]
    pub action: String,
}

// =============================================================================
// Proposals
// =============================================================================

fn default_status() -> String {
    "discussion".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateProposal {
    pub dao_id: u64,
    pub name: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub voting_system: Option<String>,
    /// Ids of proposals this one refers to.
    #[serde(default)]
    pub references: Vec<u64>,
    #[serde(default)]
    #[schema(value_type = Vec<Object>)]
    pub actions: Vec<Value>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub attachments: Vec<String>,
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default)]
    pub is_proposal: bool,
}

/// Partial proposal update.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateProposalBasic {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub voting_system: Option<String>,
    #[serde(default)]
    #[schema(value_type = Option<Vec<Object>>)]
    pub actions: Option<Vec<Value>>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub attachments: Option<Vec<String>>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub is_proposal: Option<bool>,
}

/// Like/dislike request for proposals and comments.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LikeRequest {
    /// `like`, `dislike` or `remove`.
    #[serde(rename = "type")]
    pub action: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FollowProposalRequest {
    /// `follow` or `unfollow`.
    #[serde(rename = "type")]
    pub action: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AddReferenceRequest {
    pub referred_proposal_id: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateComment {
    pub comment: String,
    /// Parent comment id for threaded replies.
    #[serde(default)]
    pub parent: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateAddendum {
    pub name: String,
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct Comment {
    pub id: u64,
    pub proposal_id: u64,
    pub user_id: u64,
    pub parent: Option<u64>,
    pub comment: String,
    pub date: DateTime<Utc>,
    pub alias: String,
    pub profile_img_url: Option<String>,
    pub likes: Vec<u64>,
    pub dislikes: Vec<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct Addendum {
    pub id: u64,
    pub proposal_id: u64,
    pub name: String,
    pub content: Option<String>,
    pub date: DateTime<Utc>,
}

/// Summary of a referenced proposal embedded in the proposal view.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct ProposalReferenceMeta {
    pub id: u64,
    pub name: String,
    pub likes: Vec<u64>,
    pub dislikes: Vec<u64>,
    pub img: String,
    pub is_proposal: bool,
}

/// The aggregated proposal view.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct Proposal {
    pub id: u64,
    pub dao_id: u64,
    pub user_id: u64,
    pub name: String,
    pub image_url: Option<String>,
    pub category: Option<String>,
    pub content: Option<String>,
    pub voting_system: Option<String>,
    pub status: String,
    pub is_proposal: bool,
    #[schema(value_type = Vec<Object>)]
    pub actions: Vec<Value>,
    pub tags: Vec<String>,
    pub attachments: Vec<String>,
    pub references: Vec<u64>,
    pub references_meta: Vec<ProposalReferenceMeta>,
    pub likes: Vec<u64>,
    pub dislikes: Vec<u64>,
    pub followers: Vec<u64>,
    pub comments: Vec<Comment>,
    pub addendums: Vec<Addendum>,
    pub alias: String,
    pub profile_img_url: Option<String>,
    pub date: DateTime<Utc>,
    /// `date` as unix seconds.
    pub created: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct ProposalLikes {
    pub proposal_id: u64,
    pub likes: Vec<u64>,
    pub dislikes: Vec<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct CommentLikes {
    pub comment_id: u64,
    pub likes: Vec<u64>,
    pub dislikes: Vec<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct ProposalFollowers {
    pub proposal_id: u64,
    pub followers: Vec<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct ProposalReferences {
    pub proposal_id: u64,
    pub references: Vec<u64>,
}

// =============================================================================
// Toggle actions
// =============================================================================

/// Parsed `type` of a like request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeAction {
    Like,
    Dislike,
    Remove,
}

impl FromStr for LikeAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "like" => Ok(LikeAction::Like),
            "dislike" => Ok(LikeAction::Dislike),
            "remove" => Ok(LikeAction::Remove),
            other => Err(format!("type must be in (like, dislike, remove), got '{other}'")),
        }
    }
}

/// Parsed `type` of a follow request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowAction {
    Follow,
    Unfollow,
}

impl FromStr for FollowAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "follow" => Ok(FollowAction::Follow),
            "unfollow" => Ok(FollowAction::Unfollow),
            other => Err(format!("type must be in (follow, unfollow), got '{other}'")),
        }
    }
}

// =============================================================================
// Activities
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateActivity {
    pub user_details_id: u64,
    pub action: String,
    pub value: String,
    #[serde(default)]
    pub secondary_action: Option<String>,
    #[serde(default)]
    pub secondary_value: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

/// Stored activity log entry.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct Activity {
    pub id: u64,
    pub user_details_id: u64,
    pub action: String,
    pub value: String,
    pub secondary_action: Option<String>,
    pub secondary_value: Option<String>,
    pub category: Option<String>,
    pub date: DateTime<Utc>,
}

/// Activity joined with its author's profile.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct ActivityView {
    pub id: u64,
    pub user_details_id: u64,
    pub name: String,
    pub img_url: Option<String>,
    pub action: String,
    pub value: String,
    pub secondary_action: Option<String>,
    pub secondary_value: Option<String>,
    pub category: Option<String>,
    pub date: DateTime<Utc>,
}

// =============================================================================
// Util
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct UploadResponse {
    pub status: String,
    pub image_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct InvalidateCacheRequest {
    pub key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct InvalidateCacheResponse {
    pub status: String,
    /// Whether the key was present in the cache.
    pub detail: bool,
}
