// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! External services the API talks to.
//!
//! - [`danaides`]: locked-token lookups on the danaides indexer
//! - [`object_storage`]: S3-compatible uploads
//! - [`image`]: upload downscaling

pub mod danaides;
pub mod image;
pub mod object_storage;

pub use danaides::{DanaidesClient, DanaidesError};
pub use image::{compress, CompressionError, CompressionTier};
pub use object_storage::{object_key, DisabledObjectStore, ObjectStore, ObjectStoreError, S3Client};
