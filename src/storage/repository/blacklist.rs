// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Revoked access tokens.
//!
//! Each entry keeps the token's own expiry so the background pruner can
//! drop entries that `exp` validation already rejects, leeway included.

use redb::ReadableTable;

use super::super::database::{Database, StoreResult, JWT_BLACKLIST};
use crate::auth::CLOCK_SKEW_LEEWAY;

pub struct BlacklistRepository<'a> {
    db: &'a Database,
}

impl<'a> BlacklistRepository<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Revoke `token` until `expires_at` (unix seconds).
    pub fn blacklist(&self, token: &str, expires_at: i64) -> StoreResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(JWT_BLACKLIST)?;
            table.insert(token, expires_at)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    pub fn is_blacklisted(&self, token: &str) -> StoreResult<bool> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(JWT_BLACKLIST)?;
        Ok(table.get(token)?.is_some())
    }

    /// Remove entries whose token can no longer pass `exp` validation at
    /// `now`. Returns how many were removed.
    pub fn prune_expired(&self, now: i64) -> StoreResult<usize> {
        let cutoff = now - CLOCK_SKEW_LEEWAY as i64;
        let write_txn = self.db.begin_write()?;
        let removed = {
            let mut table = write_txn.open_table(JWT_BLACKLIST)?;
            let mut expired = Vec::new();
            for entry in table.iter()? {
                let (token, expires_at) = entry?;
                if expires_at.value() <= cutoff {
                    expired.push(token.value().to_string());
                }
            }
            for token in &expired {
                table.remove(token.as_str())?;
            }
            expired.len()
        };
        write_txn.commit()?;
        Ok(removed)
    }
}
