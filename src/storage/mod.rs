// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Storage Module
//!
//! Persistence for the service, built on an embedded redb database.
//!
//! - [`database`]: table definitions, the `Database` handle and row/edge helpers
//! - [`repository`]: per-entity repositories (users, profiles, proposals,
//!   activity log, token blacklist)
//! - [`cache`]: LRU cache for aggregated proposal responses

pub mod cache;
pub mod database;
pub mod repository;

pub use cache::ResponseCache;
pub use database::{Database, StoreError, StoreResult};
pub use repository::{
    ActivityRepository, BlacklistRepository, NewUser, ProfileRepository, ProposalRepository,
    StoredProposal, StoredUser, StoredUserDetails, UserRepository,
};
