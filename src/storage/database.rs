// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded relational store backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! Row tables map an integer id to a JSON-serialized row. Relations are
//! tuple-keyed edge tables so one side can be range-scanned.
//!
//! - `users`: user_id → StoredUser
//! - `user_aliases`: alias → user_id (uniqueness index)
//! - `addresses`: address_id → ErgoAddress
//! - `address_index`: address → address_id (uniqueness index)
//! - `user_addresses`: (user_id, address_id) → ()
//! - `user_details`: details_id → StoredUserDetails
//! - `user_details_index`: (user_id, dao_id) → details_id
//! - `profile_settings`: (user_id, dao_id) → JSON settings
//! - `user_followers`: (followee_id, follower_id) → ()
//! - `proposals`: proposal_id → StoredProposal
//! - `dao_proposals`: (dao_id, proposal_id) → ()
//! - `proposal_likes`: (proposal_id, user_id) → liked
//! - `proposal_followers`: (proposal_id, user_id) → ()
//! - `proposal_references`: (referring_id, referred_id) → ()
//! - `comments`: comment_id → StoredComment
//! - `proposal_comments`: (proposal_id, comment_id) → ()
//! - `comment_likes`: (comment_id, user_id) → liked
//! - `addendums`: addendum_id → Addendum
//! - `proposal_addendums`: (proposal_id, addendum_id) → ()
//! - `activity_log`: activity_id → Activity
//! - `jwt_blacklist`: token → expiry (unix seconds)
//! - `sequences`: name → last issued id

use std::path::Path;

use redb::{ReadTransaction, ReadableDatabase, ReadableTable, Table, TableDefinition, WriteTransaction};
use serde::{de::DeserializeOwned, Serialize};

// =============================================================================
// Table Definitions
// =============================================================================

pub(crate) const USERS: TableDefinition<u64, &[u8]> = TableDefinition::new("users");
pub(crate) const USER_ALIASES: TableDefinition<&str, u64> = TableDefinition::new("user_aliases");
pub(crate) const ADDRESSES: TableDefinition<u64, &[u8]> = TableDefinition::new("addresses");
pub(crate) const ADDRESS_INDEX: TableDefinition<&str, u64> = TableDefinition::new("address_index");
pub(crate) const USER_ADDRESSES: TableDefinition<(u64, u64), ()> =
    TableDefinition::new("user_addresses");
pub(crate) const USER_DETAILS: TableDefinition<u64, &[u8]> = TableDefinition::new("user_details");
pub(crate) const USER_DETAILS_INDEX: TableDefinition<(u64, u64), u64> =
    TableDefinition::new("user_details_index");
pub(crate) const PROFILE_SETTINGS: TableDefinition<(u64, u64), &[u8]> =
    TableDefinition::new("profile_settings");
pub(crate) const USER_FOLLOWERS: TableDefinition<(u64, u64), ()> =
    TableDefinition::new("user_followers");
pub(crate) const PROPOSALS: TableDefinition<u64, &[u8]> = TableDefinition::new("proposals");
pub(crate) const DAO_PROPOSALS: TableDefinition<(u64, u64), ()> =
    TableDefinition::new("dao_proposals");
pub(crate) const PROPOSAL_LIKES: TableDefinition<(u64, u64), bool> =
    TableDefinition::new("proposal_likes");
pub(crate) const PROPOSAL_FOLLOWERS: TableDefinition<(u64, u64), ()> =
    TableDefinition::new("proposal_followers");
pub(crate) const PROPOSAL_REFERENCES: TableDefinition<(u64, u64), ()> =
    TableDefinition::new("proposal_references");
pub(crate) const COMMENTS: TableDefinition<u64, &[u8]> = TableDefinition::new("comments");
pub(crate) const PROPOSAL_COMMENTS: TableDefinition<(u64, u64), ()> =
    TableDefinition::new("proposal_comments");
pub(crate) const COMMENT_LIKES: TableDefinition<(u64, u64), bool> =
    TableDefinition::new("comment_likes");
pub(crate) const ADDENDUMS: TableDefinition<u64, &[u8]> = TableDefinition::new("addendums");
pub(crate) const PROPOSAL_ADDENDUMS: TableDefinition<(u64, u64), ()> =
    TableDefinition::new("proposal_addendums");
pub(crate) const ACTIVITY_LOG: TableDefinition<u64, &[u8]> = TableDefinition::new("activity_log");
pub(crate) const JWT_BLACKLIST: TableDefinition<&str, i64> = TableDefinition::new("jwt_blacklist");
pub(crate) const SEQUENCES: TableDefinition<&str, u64> = TableDefinition::new("sequences");

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("password hashing failed: {0}")]
    Password(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Invalid(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

// =============================================================================
// Database
// =============================================================================

/// Embedded ACID database holding every table of the service.
pub struct Database {
    db: redb::Database,
}

impl Database {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let db = redb::Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(USERS)?;
            let _ = write_txn.open_table(USER_ALIASES)?;
            let _ = write_txn.open_table(ADDRESSES)?;
            let _ = write_txn.open_table(ADDRESS_INDEX)?;
            let _ = write_txn.open_table(USER_ADDRESSES)?;
            let _ = write_txn.open_table(USER_DETAILS)?;
            let _ = write_txn.open_table(USER_DETAILS_INDEX)?;
            let _ = write_txn.open_table(PROFILE_SETTINGS)?;
            let _ = write_txn.open_table(USER_FOLLOWERS)?;
            let _ = write_txn.open_table(PROPOSALS)?;
            let _ = write_txn.open_table(DAO_PROPOSALS)?;
            let _ = write_txn.open_table(PROPOSAL_LIKES)?;
            let _ = write_txn.open_table(PROPOSAL_FOLLOWERS)?;
            let _ = write_txn.open_table(PROPOSAL_REFERENCES)?;
            let _ = write_txn.open_table(COMMENTS)?;
            let _ = write_txn.open_table(PROPOSAL_COMMENTS)?;
            let _ = write_txn.open_table(COMMENT_LIKES)?;
            let _ = write_txn.open_table(ADDENDUMS)?;
            let _ = write_txn.open_table(PROPOSAL_ADDENDUMS)?;
            let _ = write_txn.open_table(ACTIVITY_LOG)?;
            let _ = write_txn.open_table(JWT_BLACKLIST)?;
            let _ = write_txn.open_table(SEQUENCES)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    pub(crate) fn begin_write(&self) -> StoreResult<WriteTransaction> {
        Ok(self.db.begin_write()?)
    }

    pub(crate) fn begin_read(&self) -> StoreResult<ReadTransaction> {
        Ok(self.db.begin_read()?)
    }

    /// Verify the database can serve a read transaction.
    pub fn health_check(&self) -> StoreResult<()> {
        let read_txn = self.begin_read()?;
        let _ = read_txn.open_table(SEQUENCES)?;
        Ok(())
    }
}

// =============================================================================
// Row Helpers
// =============================================================================

/// Issue the next id of a named sequence inside a write transaction.
pub(crate) fn next_id(txn: &WriteTransaction, sequence: &str) -> StoreResult<u64> {
    let mut table = txn.open_table(SEQUENCES)?;
    let current = table.get(sequence)?.map(|v| v.value()).unwrap_or(0);
    let next = current + 1;
    table.insert(sequence, next)?;
    Ok(next)
}

/// Read and deserialize one JSON row.
pub(crate) fn read_row<T, R>(table: &R, id: u64) -> StoreResult<Option<T>>
where
    T: DeserializeOwned,
    R: ReadableTable<u64, &'static [u8]>,
{
    match table.get(id)? {
        Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
        None => Ok(None),
    }
}

/// Serialize and store one JSON row.
pub(crate) fn write_row<T: Serialize>(
    table: &mut Table<'_, u64, &'static [u8]>,
    id: u64,
    row: &T,
) -> StoreResult<()> {
    let json = serde_json::to_vec(row)?;
    table.insert(id, json.as_slice())?;
    Ok(())
}

/// Deserialize every row of a table, in id order.
pub(crate) fn read_all_rows<T, R>(table: &R) -> StoreResult<Vec<T>>
where
    T: DeserializeOwned,
    R: ReadableTable<u64, &'static [u8]>,
{
    let mut rows = Vec::new();
    for entry in table.iter()? {
        let (_, value) = entry?;
        rows.push(serde_json::from_slice(value.value())?);
    }
    Ok(rows)
}

// =============================================================================
// Edge Helpers
// =============================================================================

/// All `b` such that `(source, b)` is present, in ascending order.
pub(crate) fn edge_targets<V, R>(table: &R, source: u64) -> StoreResult<Vec<u64>>
where
    V: redb::Value + 'static,
    R: ReadableTable<(u64, u64), V>,
{
    let mut targets = Vec::new();
    for entry in table.range((source, 0u64)..=(source, u64::MAX))? {
        let (key, _) = entry?;
        targets.push(key.value().1);
    }
    Ok(targets)
}

/// All `a` such that `(a, target)` is present. Full scan.
pub(crate) fn edge_sources<V, R>(table: &R, target: u64) -> StoreResult<Vec<u64>>
where
    V: redb::Value + 'static,
    R: ReadableTable<(u64, u64), V>,
{
    let mut sources = Vec::new();
    for entry in table.iter()? {
        let (key, _) = entry?;
        let (source, to) = key.value();
        if to == target {
            sources.push(source);
        }
    }
    Ok(sources)
}

/// Split a `(source, user) → liked` table slice into (likes, dislikes).
pub(crate) fn split_likes<R>(table: &R, source: u64) -> StoreResult<(Vec<u64>, Vec<u64>)>
where
    R: ReadableTable<(u64, u64), bool>,
{
    let mut likes = Vec::new();
    let mut dislikes = Vec::new();
    for entry in table.range((source, 0u64)..=(source, u64::MAX))? {
        let (key, liked) = entry?;
        let user_id = key.value().1;
        if liked.value() {
            likes.push(user_id);
        } else {
            dislikes.push(user_id);
        }
    }
    Ok((likes, dislikes))
}

/// Remove every `(source, *)` key. Returns the removed targets.
pub(crate) fn remove_edges_from<V>(
    table: &mut Table<'_, (u64, u64), V>,
    source: u64,
) -> StoreResult<Vec<u64>>
where
    V: redb::Value + 'static,
{
    let targets = edge_targets(&*table, source)?;
    for target in &targets {
        table.remove((source, *target))?;
    }
    Ok(targets)
}

/// Remove every `(*, target)` key. Returns the removed sources.
pub(crate) fn remove_edges_to<V>(
    table: &mut Table<'_, (u64, u64), V>,
    target: u64,
) -> StoreResult<Vec<u64>>
where
    V: redb::Value + 'static,
{
    let sources = edge_sources(&*table, target)?;
    for source in &sources {
        table.remove((*source, target))?;
    }
    Ok(sources)
}

// =============================================================================
// Tests
// =============================================================================
