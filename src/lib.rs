// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Paideia API - DAO governance and social backend
//!
//! REST service for users bound to wallet addresses, proposals with likes,
//! comments and addendums, activity feeds, locked-token lookups and file
//! uploads.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Password login, HS256 tokens and request extractors
//! - `storage` - redb persistence, repositories and the response cache
//! - `providers` - danaides, S3-compatible storage and image downscaling
//! - `blacklist_pruner` - Background removal of expired revoked tokens

pub mod api;
pub mod auth;
pub mod blacklist_pruner;
pub mod config;
pub mod error;
pub mod models;
pub mod providers;
pub mod state;
pub mod storage;
