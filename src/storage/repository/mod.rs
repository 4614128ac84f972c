// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Repository layer providing typed access to the redb tables.
//!
//! Each repository borrows the [`Database`](super::Database) and exposes the
//! queries and mutations of one entity family. Every mutation runs in a
//! single write transaction.

pub mod activity;
pub mod blacklist;
pub mod profiles;
pub mod proposals;
pub mod users;

pub use activity::{ActivityRepository, DEFAULT_ACTIVITY_LIMIT};
pub use blacklist::BlacklistRepository;
pub use profiles::{ProfileRepository, StoredUserDetails};
pub use proposals::{DeletedProposal, ProposalRepository, StoredComment, StoredProposal};
pub use users::{NewUser, StoredUser, UserRepository};
