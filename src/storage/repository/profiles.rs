// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Per-DAO user profiles and their free-form settings.

use redb::ReadableTable;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::super::database::{
    next_id, read_row, write_row, Database, StoreError, StoreResult, PROFILE_SETTINGS, USERS,
    USER_DETAILS, USER_DETAILS_INDEX, USER_FOLLOWERS,
};
use super::users::{follower_summary, StoredUser};
use crate::models::{
    SocialLink, UpdateUserDetails, UpdateUserProfileSettings, UserDetails, UserProfileSettings,
};

/// Profile row as persisted. Follower lists are derived on read.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredUserDetails {
    pub id: u64,
    pub user_id: u64,
    pub dao_id: u64,
    pub name: String,
    pub profile_img_url: Option<String>,
    pub bio: Option<String>,
    pub level: u32,
    pub xp: u64,
    pub social_links: Vec<SocialLink>,
}

impl StoredUserDetails {
    fn into_view(self, followers: Vec<u64>, following: Vec<u64>) -> UserDetails {
        UserDetails {
            id: self.id,
            user_id: self.user_id,
            dao_id: self.dao_id,
            name: self.name,
            profile_img_url: self.profile_img_url,
            bio: self.bio,
            level: self.level,
            xp: self.xp,
            followers,
            following,
            social_links: self.social_links,
        }
    }
}

pub struct ProfileRepository<'a> {
    db: &'a Database,
}

impl<'a> ProfileRepository<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Raw profile row for a user in a DAO, if the user joined it.
    pub fn find(&self, user_id: u64, dao_id: u64) -> StoreResult<Option<StoredUserDetails>> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(USER_DETAILS_INDEX)?;
        let Some(details_id) = index.get((user_id, dao_id))?.map(|v| v.value()) else {
            return Ok(None);
        };
        let rows = read_txn.open_table(USER_DETAILS)?;
        read_row(&rows, details_id)
    }

    pub fn find_by_id(&self, details_id: u64) -> StoreResult<Option<StoredUserDetails>> {
        let read_txn = self.db.begin_read()?;
        let rows = read_txn.open_table(USER_DETAILS)?;
        read_row(&rows, details_id)
    }

    pub fn get_profile(&self, user_id: u64, dao_id: u64) -> StoreResult<UserDetails> {
        let details = self
            .find(user_id, dao_id)?
            .ok_or_else(|| StoreError::NotFound(format!("Profile of user {user_id} in DAO {dao_id}")))?;

        let read_txn = self.db.begin_read()?;
        let edges = read_txn.open_table(USER_FOLLOWERS)?;
        let summary = follower_summary(&edges, user_id)?;
        Ok(details.into_view(summary.followers, summary.following))
    }

    /// All member profiles of a DAO.
    pub fn dao_users(&self, dao_id: u64) -> StoreResult<Vec<UserDetails>> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(USER_DETAILS_INDEX)?;
        let rows = read_txn.open_table(USER_DETAILS)?;
        let edges = read_txn.open_table(USER_FOLLOWERS)?;

        let mut members = Vec::new();
        for entry in index.iter()? {
            let (key, details_id) = entry?;
            let (user_id, member_dao) = key.value();
            if member_dao != dao_id {
                continue;
            }
            if let Some(details) = read_row::<StoredUserDetails, _>(&rows, details_id.value())? {
                let summary = follower_summary(&edges, user_id)?;
                members.push(details.into_view(summary.followers, summary.following));
            }
        }
        members.sort_by_key(|m| m.id);
        Ok(members)
    }

    /// Create the user's profile in a DAO with empty settings.
    ///
    /// Returns the existing profile when the user already joined.
    pub fn create_profile(&self, user_id: u64, dao_id: u64) -> StoreResult<UserDetails> {
        let write_txn = self.db.begin_write()?;
        {
            let users = write_txn.open_table(USERS)?;
            let user: StoredUser = read_row(&users, user_id)?
                .ok_or_else(|| StoreError::NotFound(format!("User {user_id}")))?;

            let mut index = write_txn.open_table(USER_DETAILS_INDEX)?;
            if index.get((user_id, dao_id))?.is_none() {
                let id = next_id(&write_txn, "user_details")?;
                let details = StoredUserDetails {
                    id,
                    user_id,
                    dao_id,
                    name: user.alias,
                    profile_img_url: None,
                    bio: None,
                    level: 0,
                    xp: 0,
                    social_links: Vec::new(),
                };
                let mut rows = write_txn.open_table(USER_DETAILS)?;
                write_row(&mut rows, id, &details)?;
                index.insert((user_id, dao_id), id)?;

                let mut settings = write_txn.open_table(PROFILE_SETTINGS)?;
                let empty = serde_json::to_vec(&Value::Object(Map::new()))?;
                settings.insert((user_id, dao_id), empty.as_slice())?;

                tracing::info!(user_id, dao_id, details_id = id, "DAO profile created");
            }
        }
        write_txn.commit()?;
        self.get_profile(user_id, dao_id)
    }

    /// Partial profile update. Absent fields are left unchanged.
    pub fn edit_profile(
        &self,
        user_id: u64,
        dao_id: u64,
        update: UpdateUserDetails,
    ) -> StoreResult<UserDetails> {
        let write_txn = self.db.begin_write()?;
        {
            let index = write_txn.open_table(USER_DETAILS_INDEX)?;
            let details_id = index
                .get((user_id, dao_id))?
                .map(|v| v.value())
                .ok_or_else(|| {
                    StoreError::NotFound(format!("Profile of user {user_id} in DAO {dao_id}"))
                })?;

            let mut rows = write_txn.open_table(USER_DETAILS)?;
            let mut details: StoredUserDetails = read_row(&rows, details_id)?
                .ok_or_else(|| StoreError::NotFound(format!("Profile {details_id}")))?;

            if let Some(name) = update.name {
                details.name = name;
            }
            if let Some(url) = update.profile_img_url {
                details.profile_img_url = Some(url);
            }
            if let Some(bio) = update.bio {
                details.bio = Some(bio);
            }
            if let Some(level) = update.level {
                details.level = level;
            }
            if let Some(xp) = update.xp {
                details.xp = xp;
            }
            if let Some(links) = update.social_links {
                details.social_links = links;
            }
            write_row(&mut rows, details_id, &details)?;
        }
        write_txn.commit()?;
        self.get_profile(user_id, dao_id)
    }

    pub fn get_settings(&self, user_id: u64, dao_id: u64) -> StoreResult<UserProfileSettings> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PROFILE_SETTINGS)?;
        let settings = match table.get((user_id, dao_id))? {
            Some(raw) => serde_json::from_slice(raw.value())?,
            None => {
                return Err(StoreError::NotFound(format!(
                    "Settings of user {user_id} in DAO {dao_id}"
                )))
            }
        };
        Ok(UserProfileSettings {
            user_id,
            dao_id,
            settings,
        })
    }

    /// Merge the given keys into the stored settings object.
    pub fn edit_settings(
        &self,
        user_id: u64,
        dao_id: u64,
        update: UpdateUserProfileSettings,
    ) -> StoreResult<UserProfileSettings> {
        let write_txn = self.db.begin_write()?;
        let merged = {
            let mut table = write_txn.open_table(PROFILE_SETTINGS)?;
            let current: Value = match table.get((user_id, dao_id))? {
                Some(raw) => serde_json::from_slice(raw.value())?,
                None => {
                    return Err(StoreError::NotFound(format!(
                        "Settings of user {user_id} in DAO {dao_id}"
                    )))
                }
            };

            let mut object = match current {
                Value::Object(map) => map,
                _ => Map::new(),
            };
            object.extend(update.settings);
            let merged = Value::Object(object);

            let raw = serde_json::to_vec(&merged)?;
            table.insert((user_id, dao_id), raw.as_slice())?;
            merged
        };
        write_txn.commit()?;

        Ok(UserProfileSettings {
            user_id,
            dao_id,
            settings: merged,
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::models::FollowUserRequest;
    use crate::storage::database::tests::temp_db;
    use crate::storage::repository::users::{NewUser, UserRepository};

    fn create_user(db: &Database, alias: &str) -> StoredUser {
        UserRepository::new(db)
            .create(NewUser {
                alias: alias.to_string(),
                password: "pw".to_string(),
                primary_wallet_address: None,
                is_active: true,
                is_superuser: false,
            })
            .unwrap()
    }

    #[test]
    fn create_profile_defaults_name_to_alias() {
        let (db, _dir) = temp_db();
        let user = create_user(&db, "alice");
        let repo = ProfileRepository::new(&db);

        let profile = repo.create_profile(user.id, 3).unwrap();
        assert_eq!(profile.name, "alice");
        assert_eq!(profile.dao_id, 3);
        assert!(profile.social_links.is_empty());

        // Joining twice returns the same profile.
        assert_eq!(repo.create_profile(user.id, 3).unwrap().id, profile.id);
        assert_eq!(repo.get_settings(user.id, 3).unwrap().settings, json!({}));
    }

    #[test]
    fn missing_profile_is_not_found() {
        let (db, _dir) = temp_db();
        let user = create_user(&db, "alice");
        let repo = ProfileRepository::new(&db);
        assert!(matches!(repo.get_profile(user.id, 1), Err(StoreError::NotFound(_))));
        assert!(matches!(repo.create_profile(99, 1), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn edit_profile_keeps_unset_fields() {
        let (db, _dir) = temp_db();
        let user = create_user(&db, "alice");
        let repo = ProfileRepository::new(&db);
        repo.create_profile(user.id, 1).unwrap();

        repo.edit_profile(
            user.id,
            1,
            UpdateUserDetails {
                bio: Some("gm".to_string()),
                xp: Some(10),
                ..Default::default()
            },
        )
        .unwrap();
        let edited = repo
            .edit_profile(
                user.id,
                1,
                UpdateUserDetails {
                    level: Some(2),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(edited.name, "alice");
        assert_eq!(edited.bio.as_deref(), Some("gm"));
        assert_eq!(edited.xp, 10);
        assert_eq!(edited.level, 2);
    }

    #[test]
    fn edit_settings_merges_keys() {
        let (db, _dir) = temp_db();
        let user = create_user(&db, "alice");
        let repo = ProfileRepository::new(&db);
        repo.create_profile(user.id, 1).unwrap();

        let first = json!({"theme": "dark", "notify": true});
        let second = json!({"notify": false});
        let patch = |value: Value| UpdateUserProfileSettings {
            settings: value.as_object().cloned().unwrap(),
        };

        repo.edit_settings(user.id, 1, patch(first)).unwrap();
        let merged = repo.edit_settings(user.id, 1, patch(second)).unwrap();
        assert_eq!(merged.settings, json!({"theme": "dark", "notify": false}));
    }

    #[test]
    fn dao_users_include_follower_lists() {
        let (db, _dir) = temp_db();
        let alice = create_user(&db, "alice");
        let bob = create_user(&db, "bob");
        let carol = create_user(&db, "carol");
        let repo = ProfileRepository::new(&db);
        repo.create_profile(alice.id, 1).unwrap();
        repo.create_profile(bob.id, 1).unwrap();
        repo.create_profile(carol.id, 2).unwrap();

        UserRepository::new(&db)
            .update_follower(
                bob.id,
                &FollowUserRequest {
                    user_id: alice.id,
                    action: "follow".to_string(),
                },
            )
            .unwrap();

        let members = repo.dao_users(1).unwrap();
        assert_eq!(members.len(), 2);
        let alice_profile = members.iter().find(|m| m.user_id == alice.id).unwrap();
        assert_eq!(alice_profile.followers, vec![bob.id]);
    }
}
