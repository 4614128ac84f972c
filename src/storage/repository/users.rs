// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User repository: accounts, wallet addresses and the follow graph.
//!
//! Alias and address uniqueness are enforced here by index tables written
//! in the same transaction as the row they index.

use redb::{ReadableTable, WriteTransaction};
use serde::{Deserialize, Serialize};

use super::super::database::{
    edge_sources, edge_targets, next_id, read_all_rows, read_row, remove_edges_from,
    remove_edges_to, write_row, Database, StoreError, StoreResult, ADDRESSES, ADDRESS_INDEX,
    PROFILE_SETTINGS, USERS, USER_ADDRESSES, USER_ALIASES, USER_DETAILS, USER_DETAILS_INDEX,
    USER_FOLLOWERS,
};
use super::profiles::StoredUserDetails;
use crate::auth::password::hash_password;
use crate::models::{
    ErgoAddress, FollowAction, FollowUserRequest, UserAddressConfig, UserEdit, UserFollowers,
    UserResponse, UserSearchResult,
};

/// User row as persisted. The password hash never leaves the repository
/// layer except for verification.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredUser {
    pub id: u64,
    pub alias: String,
    pub hashed_password: String,
    pub is_active: bool,
    pub is_superuser: bool,
    pub primary_wallet_address_id: Option<u64>,
}

impl From<StoredUser> for UserResponse {
    fn from(user: StoredUser) -> Self {
        Self {
            id: user.id,
            alias: user.alias,
            primary_wallet_address_id: user.primary_wallet_address_id,
            is_active: user.is_active,
            is_superuser: user.is_superuser,
        }
    }
}

/// Input for account creation.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub alias: String,
    pub password: String,
    pub primary_wallet_address: Option<String>,
    pub is_active: bool,
    pub is_superuser: bool,
}

/// Repository for user accounts.
pub struct UserRepository<'a> {
    db: &'a Database,
}

impl<'a> UserRepository<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    pub fn find(&self, user_id: u64) -> StoreResult<Option<StoredUser>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(USERS)?;
        read_row(&table, user_id)
    }

    pub fn get(&self, user_id: u64) -> StoreResult<StoredUser> {
        self.find(user_id)?
            .ok_or_else(|| StoreError::NotFound(format!("User {user_id}")))
    }

    pub fn get_by_alias(&self, alias: &str) -> StoreResult<Option<StoredUser>> {
        let read_txn = self.db.begin_read()?;
        let aliases = read_txn.open_table(USER_ALIASES)?;
        let Some(user_id) = aliases.get(alias)?.map(|v| v.value()) else {
            return Ok(None);
        };
        let users = read_txn.open_table(USERS)?;
        read_row(&users, user_id)
    }

    pub fn get_by_wallet_address(&self, address: &str) -> StoreResult<Option<StoredUser>> {
        self.get_by_wallet_addresses(&[address.to_string()])
    }

    /// First user owning any of the given addresses, in argument order.
    pub fn get_by_wallet_addresses(&self, addresses: &[String]) -> StoreResult<Option<StoredUser>> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(ADDRESS_INDEX)?;
        let address_rows = read_txn.open_table(ADDRESSES)?;
        let users = read_txn.open_table(USERS)?;

        for address in addresses {
            let Some(address_id) = index.get(address.as_str())?.map(|v| v.value()) else {
                continue;
            };
            if let Some(row) = read_row::<ErgoAddress, _>(&address_rows, address_id)? {
                if let Some(user) = read_row(&users, row.user_id)? {
                    return Ok(Some(user));
                }
            }
        }
        Ok(None)
    }

    pub fn primary_wallet_address(&self, user_id: u64) -> StoreResult<Option<String>> {
        let user = self.get(user_id)?;
        let Some(address_id) = user.primary_wallet_address_id else {
            return Ok(None);
        };
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ADDRESSES)?;
        Ok(read_row::<ErgoAddress, _>(&table, address_id)?.map(|a| a.address))
    }

    pub fn list(&self, skip: usize, limit: usize) -> StoreResult<Vec<StoredUser>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(USERS)?;
        let users: Vec<StoredUser> = read_all_rows(&table)?;
        Ok(users.into_iter().skip(skip).take(limit).collect())
    }

    /// Case-insensitive substring search over alias, address and profile name.
    ///
    /// Emits one row per (user, address, profile) combination in which any
    /// of the three fields matches. Users without an address or a profile
    /// never match.
    pub fn search(&self, query: &str) -> StoreResult<Vec<UserSearchResult>> {
        let needle = query.to_lowercase();
        let read_txn = self.db.begin_read()?;
        let users = read_txn.open_table(USERS)?;
        let user_addresses = read_txn.open_table(USER_ADDRESSES)?;
        let address_rows = read_txn.open_table(ADDRESSES)?;
        let details_index = read_txn.open_table(USER_DETAILS_INDEX)?;
        let details_rows = read_txn.open_table(USER_DETAILS)?;

        let mut results = Vec::new();
        for user in read_all_rows::<StoredUser, _>(&users)? {
            let mut addresses = Vec::new();
            for address_id in edge_targets(&user_addresses, user.id)? {
                if let Some(row) = read_row::<ErgoAddress, _>(&address_rows, address_id)? {
                    addresses.push(row.address);
                }
            }

            let mut profiles = Vec::new();
            for entry in details_index.range((user.id, 0u64)..=(user.id, u64::MAX))? {
                let (_, details_id) = entry?;
                if let Some(details) =
                    read_row::<StoredUserDetails, _>(&details_rows, details_id.value())?
                {
                    profiles.push(details);
                }
            }

            let alias_match = user.alias.to_lowercase().contains(&needle);
            for address in &addresses {
                let address_match = address.to_lowercase().contains(&needle);
                for profile in &profiles {
                    if alias_match
                        || address_match
                        || profile.name.to_lowercase().contains(&needle)
                    {
                        results.push(UserSearchResult {
                            id: user.id,
                            dao_id: profile.dao_id,
                            alias: user.alias.clone(),
                            address: address.clone(),
                            name: profile.name.clone(),
                        });
                    }
                }
            }
        }
        Ok(results)
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Create a user, registering its primary wallet address if given.
    pub fn create(&self, new_user: NewUser) -> StoreResult<StoredUser> {
        let hashed_password =
            hash_password(&new_user.password).map_err(|e| StoreError::Password(e.to_string()))?;

        let write_txn = self.db.begin_write()?;
        let user = {
            let mut aliases = write_txn.open_table(USER_ALIASES)?;
            if aliases.get(new_user.alias.as_str())?.is_some() {
                return Err(StoreError::Conflict(format!(
                    "Alias {} is already taken",
                    new_user.alias
                )));
            }

            let id = next_id(&write_txn, "users")?;
            aliases.insert(new_user.alias.as_str(), id)?;

            let mut user = StoredUser {
                id,
                alias: new_user.alias,
                hashed_password,
                is_active: new_user.is_active,
                is_superuser: new_user.is_superuser,
                primary_wallet_address_id: None,
            };

            if let Some(address) = new_user.primary_wallet_address.as_deref() {
                let registered = register_address(&write_txn, id, address)?;
                user.primary_wallet_address_id = Some(registered.id);
            }

            let mut users = write_txn.open_table(USERS)?;
            write_row(&mut users, id, &user)?;
            user
        };
        write_txn.commit()?;

        tracing::info!(user_id = user.id, alias = %user.alias, "User created");
        Ok(user)
    }

    /// Apply a partial update. Fields absent from `edit` are left unchanged.
    pub fn edit(&self, user_id: u64, edit: UserEdit) -> StoreResult<StoredUser> {
        let new_hash = match edit.password.as_deref() {
            Some(password) => {
                Some(hash_password(password).map_err(|e| StoreError::Password(e.to_string()))?)
            }
            None => None,
        };

        let write_txn = self.db.begin_write()?;
        let user = {
            let mut users = write_txn.open_table(USERS)?;
            let mut user: StoredUser = read_row(&users, user_id)?
                .ok_or_else(|| StoreError::NotFound(format!("User {user_id}")))?;

            if let Some(alias) = edit.alias {
                if alias != user.alias {
                    rename_alias(&write_txn, user_id, &user.alias, &alias)?;
                    user.alias = alias;
                }
            }

            if let Some(address_id) = edit.primary_wallet_address_id {
                let user_addresses = write_txn.open_table(USER_ADDRESSES)?;
                if user_addresses.get((user_id, address_id))?.is_none() {
                    return Err(StoreError::Invalid(format!(
                        "Address {address_id} is not registered to user {user_id}"
                    )));
                }
                user.primary_wallet_address_id = Some(address_id);
            }

            if let Some(is_active) = edit.is_active {
                user.is_active = is_active;
            }
            if let Some(is_superuser) = edit.is_superuser {
                user.is_superuser = is_superuser;
            }
            if let Some(hash) = new_hash {
                user.hashed_password = hash;
            }

            write_row(&mut users, user_id, &user)?;
            user
        };
        write_txn.commit()?;
        Ok(user)
    }

    /// Delete a user with its addresses, profiles, settings and follow edges.
    pub fn delete(&self, user_id: u64) -> StoreResult<StoredUser> {
        let write_txn = self.db.begin_write()?;
        let user = {
            let mut users = write_txn.open_table(USERS)?;
            let user: StoredUser = read_row(&users, user_id)?
                .ok_or_else(|| StoreError::NotFound(format!("User {user_id}")))?;
            users.remove(user_id)?;

            let mut aliases = write_txn.open_table(USER_ALIASES)?;
            aliases.remove(user.alias.as_str())?;

            let mut user_addresses = write_txn.open_table(USER_ADDRESSES)?;
            let mut address_rows = write_txn.open_table(ADDRESSES)?;
            let mut address_index = write_txn.open_table(ADDRESS_INDEX)?;
            for address_id in remove_edges_from(&mut user_addresses, user_id)? {
                if let Some(row) = read_row::<ErgoAddress, _>(&address_rows, address_id)? {
                    address_index.remove(row.address.as_str())?;
                }
                address_rows.remove(address_id)?;
            }

            let mut details_index = write_txn.open_table(USER_DETAILS_INDEX)?;
            let mut details_rows = write_txn.open_table(USER_DETAILS)?;
            let mut profiles = Vec::new();
            for entry in details_index.range((user_id, 0u64)..=(user_id, u64::MAX))? {
                let (key, details_id) = entry?;
                profiles.push((key.value().1, details_id.value()));
            }
            for (dao_id, details_id) in profiles {
                details_index.remove((user_id, dao_id))?;
                details_rows.remove(details_id)?;
            }

            let mut settings = write_txn.open_table(PROFILE_SETTINGS)?;
            remove_edges_from(&mut settings, user_id)?;

            let mut followers = write_txn.open_table(USER_FOLLOWERS)?;
            remove_edges_from(&mut followers, user_id)?;
            remove_edges_to(&mut followers, user_id)?;

            user
        };
        write_txn.commit()?;

        tracing::info!(user_id, "User deleted");
        Ok(user)
    }

    // =========================================================================
    // Addresses
    // =========================================================================

    pub fn addresses(&self, user_id: u64) -> StoreResult<Vec<ErgoAddress>> {
        let read_txn = self.db.begin_read()?;
        let user_addresses = read_txn.open_table(USER_ADDRESSES)?;
        let address_rows = read_txn.open_table(ADDRESSES)?;

        let mut addresses = Vec::new();
        for address_id in edge_targets(&user_addresses, user_id)? {
            if let Some(row) = read_row(&address_rows, address_id)? {
                addresses.push(row);
            }
        }
        Ok(addresses)
    }

    pub fn address_config(&self, user_id: u64) -> StoreResult<UserAddressConfig> {
        let user = self.get(user_id)?;
        let registered_addresses = self
            .addresses(user_id)?
            .into_iter()
            .map(|a| a.address)
            .collect();
        Ok(UserAddressConfig {
            id: user.id,
            alias: user.alias,
            registered_addresses,
        })
    }

    /// Register any of `addresses` the user does not already own.
    pub fn set_addresses(&self, user_id: u64, addresses: &[String]) -> StoreResult<Vec<ErgoAddress>> {
        let write_txn = self.db.begin_write()?;
        {
            let users = write_txn.open_table(USERS)?;
            if users.get(user_id)?.is_none() {
                return Err(StoreError::NotFound(format!("User {user_id}")));
            }
        }
        for address in addresses {
            register_address(&write_txn, user_id, address)?;
        }
        write_txn.commit()?;
        self.addresses(user_id)
    }

    /// Make `address` the user's primary address and alias, registering it
    /// first if needed.
    pub fn update_primary_address(&self, user_id: u64, address: &str) -> StoreResult<UserAddressConfig> {
        let write_txn = self.db.begin_write()?;
        {
            let mut users = write_txn.open_table(USERS)?;
            let mut user: StoredUser = read_row(&users, user_id)?
                .ok_or_else(|| StoreError::NotFound(format!("User {user_id}")))?;

            let registered = register_address(&write_txn, user_id, address)?;
            if user.alias != address {
                rename_alias(&write_txn, user_id, &user.alias, address)?;
                user.alias = address.to_string();
            }
            user.primary_wallet_address_id = Some(registered.id);
            write_row(&mut users, user_id, &user)?;
        }
        write_txn.commit()?;
        self.address_config(user_id)
    }

    // =========================================================================
    // Follow graph
    // =========================================================================

    pub fn followers(&self, user_id: u64) -> StoreResult<UserFollowers> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(USER_FOLLOWERS)?;
        follower_summary(&table, user_id)
    }

    /// `follower_id` follows or unfollows `request.user_id`.
    ///
    /// Returns the follower's own summary.
    pub fn update_follower(
        &self,
        follower_id: u64,
        request: &FollowUserRequest,
    ) -> StoreResult<UserFollowers> {
        let action: FollowAction = request.action.parse().map_err(StoreError::Invalid)?;

        let write_txn = self.db.begin_write()?;
        {
            let users = write_txn.open_table(USERS)?;
            if users.get(request.user_id)?.is_none() {
                return Err(StoreError::NotFound(format!("User {}", request.user_id)));
            }
            let mut edges = write_txn.open_table(USER_FOLLOWERS)?;
            match action {
                FollowAction::Follow => {
                    edges.insert((request.user_id, follower_id), ())?;
                }
                FollowAction::Unfollow => {
                    edges.remove((request.user_id, follower_id))?;
                }
            }
        }
        write_txn.commit()?;
        self.followers(follower_id)
    }
}

/// Followers and following of a user, from the single edge table
/// `(followee, follower)` read in both directions.
pub(crate) fn follower_summary<R>(table: &R, user_id: u64) -> StoreResult<UserFollowers>
where
    R: ReadableTable<(u64, u64), ()>,
{
    Ok(UserFollowers {
        followers: edge_targets(table, user_id)?,
        following: edge_sources(table, user_id)?,
    })
}

/// Register `address` for `user_id` inside an open write transaction.
///
/// Idempotent for addresses the user already owns.
fn register_address(txn: &WriteTransaction, user_id: u64, address: &str) -> StoreResult<ErgoAddress> {
    let mut index = txn.open_table(ADDRESS_INDEX)?;
    let mut rows = txn.open_table(ADDRESSES)?;

    let existing = index.get(address)?.map(|v| v.value());
    if let Some(address_id) = existing {
        let row: ErgoAddress = read_row(&rows, address_id)?
            .ok_or_else(|| StoreError::NotFound(format!("Address {address_id}")))?;
        if row.user_id != user_id {
            return Err(StoreError::Conflict(format!(
                "Address {address} is registered to another user"
            )));
        }
        return Ok(row);
    }

    let id = next_id(txn, "addresses")?;
    let row = ErgoAddress {
        id,
        user_id,
        address: address.to_string(),
        is_smart_contract: false,
    };
    write_row(&mut rows, id, &row)?;
    index.insert(address, id)?;

    let mut user_addresses = txn.open_table(USER_ADDRESSES)?;
    user_addresses.insert((user_id, id), ())?;
    Ok(row)
}

/// Move a user's alias index entry from `old` to `new`.
fn rename_alias(txn: &WriteTransaction, user_id: u64, old: &str, new: &str) -> StoreResult<()> {
    let mut aliases = txn.open_table(USER_ALIASES)?;
    let owner = aliases.get(new)?.map(|v| v.value());
    if matches!(owner, Some(owner) if owner != user_id) {
        return Err(StoreError::Conflict(format!("Alias {new} is already taken")));
    }
    aliases.remove(old)?;
    aliases.insert(new, user_id)?;
    Ok(())
}
