// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;
use std::time::Duration;

use crate::auth::TokenIssuer;
use crate::config::DEFAULT_MAX_UPLOAD_BYTES;
use crate::providers::{DanaidesClient, DisabledObjectStore, ObjectStore};
use crate::storage::{Database, ResponseCache};

const DEFAULT_CACHE_CAPACITY: usize = 1024;
const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60);
const DEFAULT_UPLOAD_PREFIX: &str = "upload";

/// Shared handles passed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub tokens: Arc<TokenIssuer>,
    pub cache: Arc<ResponseCache>,
    pub danaides: Arc<DanaidesClient>,
    pub object_store: Arc<dyn ObjectStore>,
    /// First segment of every uploaded object key.
    pub upload_key_prefix: String,
    /// Body limit of the upload routes.
    pub max_upload_bytes: usize,
}

impl AppState {
    /// State with a default cache and uploads disabled.
    pub fn new(db: Database, tokens: TokenIssuer, danaides: DanaidesClient) -> Self {
        Self {
            db: Arc::new(db),
            tokens: Arc::new(tokens),
            cache: Arc::new(ResponseCache::new(DEFAULT_CACHE_CAPACITY, DEFAULT_CACHE_TTL)),
            danaides: Arc::new(danaides),
            object_store: Arc::new(DisabledObjectStore),
            upload_key_prefix: DEFAULT_UPLOAD_PREFIX.to_string(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    pub fn with_cache(mut self, cache: ResponseCache) -> Self {
        self.cache = Arc::new(cache);
        self
    }

    pub fn with_object_store(mut self, store: Arc<dyn ObjectStore>, key_prefix: impl Into<String>) -> Self {
        self.object_store = store;
        self.upload_key_prefix = key_prefix.into();
        self
    }

    pub fn with_upload_limit(mut self, max_bytes: usize) -> Self {
        self.max_upload_bytes = max_bytes;
        self
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::storage::database::tests::temp_db;

    /// State over a throwaway database. Keep the `TempDir` alive for the test.
    pub(crate) fn test_state() -> (AppState, TempDir) {
        let (db, dir) = temp_db();
        let tokens = TokenIssuer::new("test-secret", Duration::from_secs(3600));
        let danaides = DanaidesClient::new("http://127.0.0.1:1", Duration::from_secs(5))
            .expect("client builds");
        (AppState::new(db, tokens, danaides), dir)
    }
}
