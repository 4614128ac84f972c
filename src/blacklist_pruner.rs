// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Blacklist Pruner
//!
//! Background task that drops revoked tokens once they have expired. A
//! token past `exp` plus the validation leeway fails on its own, so its
//! blacklist entry is dead weight.
//!
//! Stops when the shutdown `CancellationToken` fires.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::storage::{BlacklistRepository, Database};

pub struct BlacklistPruner {
    db: Arc<Database>,
    interval: Duration,
}

impl BlacklistPruner {
    pub fn new(db: Arc<Database>, interval: Duration) -> Self {
        Self { db, interval }
    }

    /// Run until `shutdown` is cancelled.
    ///
    /// ```rust,ignore
    /// tokio::spawn(pruner.run(shutdown.clone()));
    /// ```
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            interval_secs = self.interval.as_secs(),
            "Blacklist pruner starting"
        );

        loop {
            if shutdown.is_cancelled() {
                info!("Blacklist pruner shutting down");
                return;
            }

            self.prune_step();

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {},
                _ = shutdown.cancelled() => {
                    info!("Blacklist pruner shutting down");
                    return;
                }
            }
        }
    }

    /// Remove every entry whose token has expired. Returns how many went.
    fn prune_step(&self) -> usize {
        match BlacklistRepository::new(&self.db).prune_expired(Utc::now().timestamp()) {
            Ok(0) => 0,
            Ok(removed) => {
                debug!(removed, "Pruned expired blacklist entries");
                removed
            }
            Err(e) => {
                warn!(error = %e, "Blacklist pruning failed");
                0
            }
        }
    }
}
