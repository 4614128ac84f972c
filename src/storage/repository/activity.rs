// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Append-only activity log, read through a view joined with the author's
//! DAO profile.

use chrono::Utc;

use super::super::database::{
    next_id, read_all_rows, read_row, write_row, Database, StoreError, StoreResult, ACTIVITY_LOG,
    USER_DETAILS,
};
use super::profiles::StoredUserDetails;
use crate::models::{Activity, ActivityView, CreateActivity};

/// Default page size for activity feeds.
pub const DEFAULT_ACTIVITY_LIMIT: usize = 100;

pub struct ActivityRepository<'a> {
    db: &'a Database,
}

impl<'a> ActivityRepository<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Activities of one profile, newest first.
    pub fn user_activities(&self, user_details_id: u64, limit: usize) -> StoreResult<Vec<ActivityView>> {
        self.feed(limit, |_, details| details.id == user_details_id)
    }

    /// Activities of every profile belonging to the DAO, newest first.
    pub fn dao_activities(&self, dao_id: u64, limit: usize) -> StoreResult<Vec<ActivityView>> {
        self.feed(limit, |_, details| details.dao_id == dao_id)
    }

    pub fn create(&self, activity: CreateActivity) -> StoreResult<Activity> {
        let write_txn = self.db.begin_write()?;
        let row = {
            let details = write_txn.open_table(USER_DETAILS)?;
            if read_row::<StoredUserDetails, _>(&details, activity.user_details_id)?.is_none() {
                return Err(StoreError::NotFound(format!(
                    "Profile {}",
                    activity.user_details_id
                )));
            }

            let id = next_id(&write_txn, "activity_log")?;
            let row = Activity {
                id,
                user_details_id: activity.user_details_id,
                action: activity.action,
                value: activity.value,
                secondary_action: activity.secondary_action,
                secondary_value: activity.secondary_value,
                category: activity.category,
                date: Utc::now(),
            };
            let mut log = write_txn.open_table(ACTIVITY_LOG)?;
            write_row(&mut log, id, &row)?;
            row
        };
        write_txn.commit()?;
        Ok(row)
    }

    pub fn delete(&self, activity_id: u64) -> StoreResult<Activity> {
        let write_txn = self.db.begin_write()?;
        let row = {
            let mut log = write_txn.open_table(ACTIVITY_LOG)?;
            let row: Activity = read_row(&log, activity_id)?
                .ok_or_else(|| StoreError::NotFound(format!("Activity {activity_id}")))?;
            log.remove(activity_id)?;
            row
        };
        write_txn.commit()?;
        Ok(row)
    }

    fn feed<F>(&self, limit: usize, keep: F) -> StoreResult<Vec<ActivityView>>
    where
        F: Fn(&Activity, &StoredUserDetails) -> bool,
    {
        let read_txn = self.db.begin_read()?;
        let log = read_txn.open_table(ACTIVITY_LOG)?;
        let details = read_txn.open_table(USER_DETAILS)?;

        let mut views = Vec::new();
        for activity in read_all_rows::<Activity, _>(&log)? {
            let Some(author) = read_row::<StoredUserDetails, _>(&details, activity.user_details_id)?
            else {
                continue;
            };
            if keep(&activity, &author) {
                views.push(ActivityView {
                    id: activity.id,
                    user_details_id: activity.user_details_id,
                    name: author.name,
                    img_url: author.profile_img_url,
                    action: activity.action,
                    value: activity.value,
                    secondary_action: activity.secondary_action,
                    secondary_value: activity.secondary_value,
                    category: activity.category,
                    date: activity.date,
                });
            }
        }

        views.sort_by(|a, b| b.date.cmp(&a.date).then(b.id.cmp(&a.id)));
        views.truncate(limit);
        Ok(views)
    }
}
