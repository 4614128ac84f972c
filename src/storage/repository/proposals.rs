// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Proposal repository.
//!
//! A proposal row holds its scalar columns. Likes, followers, references,
//! comments and addendums live in edge tables keyed by the proposal id, and
//! [`ProposalRepository::get`] stitches them into the aggregated view.
//!
//! Ownership rules:
//! - references and addendums may only be added by the author
//! - basic edits are author-only
//! - deletion is allowed for the author or a superuser

use chrono::{DateTime, Utc};
use redb::{ReadTransaction, ReadableTable, WriteTransaction};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::super::database::{
    edge_targets, next_id, read_row, remove_edges_from, remove_edges_to, split_likes, write_row,
    Database, StoreError, StoreResult, ADDENDUMS, COMMENTS, COMMENT_LIKES, DAO_PROPOSALS,
    PROPOSALS, PROPOSAL_ADDENDUMS, PROPOSAL_COMMENTS, PROPOSAL_FOLLOWERS, PROPOSAL_LIKES,
    PROPOSAL_REFERENCES, USERS, USER_DETAILS, USER_DETAILS_INDEX,
};
use super::profiles::StoredUserDetails;
use super::users::StoredUser;
use crate::models::{
    Addendum, Comment, CommentLikes, CreateAddendum, CreateComment, CreateProposal, FollowAction,
    LikeAction, Proposal, ProposalFollowers, ProposalLikes, ProposalReferenceMeta,
    ProposalReferences, UpdateProposalBasic,
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredProposal {
    pub id: u64,
    pub dao_id: u64,
    pub user_id: u64,
    pub name: String,
    pub image_url: Option<String>,
    pub category: Option<String>,
    pub content: Option<String>,
    pub voting_system: Option<String>,
    pub actions: Vec<Value>,
    pub tags: Vec<String>,
    pub attachments: Vec<String>,
    pub status: String,
    pub is_proposal: bool,
    pub date: DateTime<Utc>,
}

/// A removed proposal and the proposals that referred to it.
#[derive(Debug, Clone)]
pub struct DeletedProposal {
    pub proposal: StoredProposal,
    pub referrers: Vec<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredComment {
    pub id: u64,
    pub proposal_id: u64,
    pub user_id: u64,
    pub parent: Option<u64>,
    pub comment: String,
    pub date: DateTime<Utc>,
}

pub struct ProposalRepository<'a> {
    db: &'a Database,
}

impl<'a> ProposalRepository<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub fn get_basic(&self, proposal_id: u64) -> StoreResult<StoredProposal> {
        let read_txn = self.db.begin_read()?;
        load_proposal(&read_txn, proposal_id)
    }

    /// The aggregated proposal view.
    pub fn get(&self, proposal_id: u64) -> StoreResult<Proposal> {
        let read_txn = self.db.begin_read()?;
        let row = load_proposal(&read_txn, proposal_id)?;
        assemble(&read_txn, row)
    }

    pub fn by_dao(&self, dao_id: u64) -> StoreResult<Vec<Proposal>> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(DAO_PROPOSALS)?;
        let mut proposals = Vec::new();
        for proposal_id in edge_targets(&index, dao_id)? {
            let row = load_proposal(&read_txn, proposal_id)?;
            proposals.push(assemble(&read_txn, row)?);
        }
        Ok(proposals)
    }

    pub fn likes(&self, proposal_id: u64) -> StoreResult<ProposalLikes> {
        let read_txn = self.db.begin_read()?;
        load_proposal(&read_txn, proposal_id)?;
        let table = read_txn.open_table(PROPOSAL_LIKES)?;
        let (likes, dislikes) = split_likes(&table, proposal_id)?;
        Ok(ProposalLikes {
            proposal_id,
            likes,
            dislikes,
        })
    }

    pub fn followers(&self, proposal_id: u64) -> StoreResult<ProposalFollowers> {
        let read_txn = self.db.begin_read()?;
        load_proposal(&read_txn, proposal_id)?;
        let table = read_txn.open_table(PROPOSAL_FOLLOWERS)?;
        Ok(ProposalFollowers {
            proposal_id,
            followers: edge_targets(&table, proposal_id)?,
        })
    }

    pub fn references(&self, proposal_id: u64) -> StoreResult<ProposalReferences> {
        let read_txn = self.db.begin_read()?;
        load_proposal(&read_txn, proposal_id)?;
        let table = read_txn.open_table(PROPOSAL_REFERENCES)?;
        Ok(ProposalReferences {
            proposal_id,
            references: edge_targets(&table, proposal_id)?,
        })
    }

    pub fn comments(&self, proposal_id: u64) -> StoreResult<Vec<Comment>> {
        let read_txn = self.db.begin_read()?;
        let row = load_proposal(&read_txn, proposal_id)?;
        load_comments(&read_txn, proposal_id, row.dao_id)
    }

    pub fn addendums(&self, proposal_id: u64) -> StoreResult<Vec<Addendum>> {
        let read_txn = self.db.begin_read()?;
        load_proposal(&read_txn, proposal_id)?;
        load_addendums(&read_txn, proposal_id)
    }

    /// Proposal a comment belongs to.
    pub fn comment_proposal_id(&self, comment_id: u64) -> StoreResult<u64> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(COMMENTS)?;
        read_row::<StoredComment, _>(&table, comment_id)?
            .map(|c| c.proposal_id)
            .ok_or_else(|| StoreError::NotFound(format!("Comment {comment_id}")))
    }

    // =========================================================================
    // Toggles
    // =========================================================================

    /// Upsert `user_id`'s like flag. `remove` deletes it.
    pub fn set_like(&self, proposal_id: u64, user_id: u64, action: LikeAction) -> StoreResult<ProposalLikes> {
        let write_txn = self.db.begin_write()?;
        {
            let proposals = write_txn.open_table(PROPOSALS)?;
            if proposals.get(proposal_id)?.is_none() {
                return Err(StoreError::NotFound(format!("Proposal {proposal_id}")));
            }
            let mut table = write_txn.open_table(PROPOSAL_LIKES)?;
            apply_like(&mut table, proposal_id, user_id, action)?;
        }
        write_txn.commit()?;
        self.likes(proposal_id)
    }

    pub fn set_follower(
        &self,
        proposal_id: u64,
        user_id: u64,
        action: FollowAction,
    ) -> StoreResult<ProposalFollowers> {
        let write_txn = self.db.begin_write()?;
        {
            let proposals = write_txn.open_table(PROPOSALS)?;
            if proposals.get(proposal_id)?.is_none() {
                return Err(StoreError::NotFound(format!("Proposal {proposal_id}")));
            }
            let mut table = write_txn.open_table(PROPOSAL_FOLLOWERS)?;
            match action {
                FollowAction::Follow => {
                    table.insert((proposal_id, user_id), ())?;
                }
                FollowAction::Unfollow => {
                    table.remove((proposal_id, user_id))?;
                }
            }
        }
        write_txn.commit()?;
        self.followers(proposal_id)
    }

    pub fn set_comment_like(&self, comment_id: u64, user_id: u64, action: LikeAction) -> StoreResult<CommentLikes> {
        let write_txn = self.db.begin_write()?;
        {
            let comments = write_txn.open_table(COMMENTS)?;
            if comments.get(comment_id)?.is_none() {
                return Err(StoreError::NotFound(format!("Comment {comment_id}")));
            }
            let mut table = write_txn.open_table(COMMENT_LIKES)?;
            apply_like(&mut table, comment_id, user_id, action)?;
        }
        write_txn.commit()?;

        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(COMMENT_LIKES)?;
        let (likes, dislikes) = split_likes(&table, comment_id)?;
        Ok(CommentLikes {
            comment_id,
            likes,
            dislikes,
        })
    }

    // =========================================================================
    // Sub-resources
    // =========================================================================

    pub fn add_reference(
        &self,
        user_id: u64,
        proposal_id: u64,
        referred_proposal_id: u64,
    ) -> StoreResult<ProposalReferences> {
        if proposal_id == referred_proposal_id {
            return Err(StoreError::Invalid(
                "A proposal cannot reference itself".to_string(),
            ));
        }
        let write_txn = self.db.begin_write()?;
        {
            owned_proposal(&write_txn, proposal_id, user_id)?;
            let proposals = write_txn.open_table(PROPOSALS)?;
            if proposals.get(referred_proposal_id)?.is_none() {
                return Err(StoreError::NotFound(format!("Proposal {referred_proposal_id}")));
            }
            let mut references = write_txn.open_table(PROPOSAL_REFERENCES)?;
            references.insert((proposal_id, referred_proposal_id), ())?;
        }
        write_txn.commit()?;
        self.references(proposal_id)
    }

    pub fn add_comment(&self, proposal_id: u64, user_id: u64, comment: CreateComment) -> StoreResult<Comment> {
        let write_txn = self.db.begin_write()?;
        let (row, dao_id) = {
            let proposals = write_txn.open_table(PROPOSALS)?;
            let proposal: StoredProposal = read_row(&proposals, proposal_id)?
                .ok_or_else(|| StoreError::NotFound(format!("Proposal {proposal_id}")))?;

            let mut index = write_txn.open_table(PROPOSAL_COMMENTS)?;
            if let Some(parent) = comment.parent {
                if index.get((proposal_id, parent))?.is_none() {
                    return Err(StoreError::Invalid(format!(
                        "Parent comment {parent} does not belong to proposal {proposal_id}"
                    )));
                }
            }

            let id = next_id(&write_txn, "comments")?;
            let row = StoredComment {
                id,
                proposal_id,
                user_id,
                parent: comment.parent,
                comment: comment.comment,
                date: Utc::now(),
            };
            let mut comments = write_txn.open_table(COMMENTS)?;
            write_row(&mut comments, id, &row)?;
            index.insert((proposal_id, id), ())?;
            (row, proposal.dao_id)
        };
        write_txn.commit()?;

        let read_txn = self.db.begin_read()?;
        comment_view(&read_txn, row, dao_id)
    }

    pub fn add_addendum(&self, user_id: u64, proposal_id: u64, addendum: CreateAddendum) -> StoreResult<Addendum> {
        let write_txn = self.db.begin_write()?;
        let row = {
            owned_proposal(&write_txn, proposal_id, user_id)?;
            let id = next_id(&write_txn, "addendums")?;
            let row = Addendum {
                id,
                proposal_id,
                name: addendum.name,
                content: addendum.content,
                date: Utc::now(),
            };
            let mut addendums = write_txn.open_table(ADDENDUMS)?;
            write_row(&mut addendums, id, &row)?;
            let mut index = write_txn.open_table(PROPOSAL_ADDENDUMS)?;
            index.insert((proposal_id, id), ())?;
            row
        };
        write_txn.commit()?;
        Ok(row)
    }

    // =========================================================================
    // Proposal lifecycle
    // =========================================================================

    /// Persist a proposal and its initial references.
    pub fn create(&self, user_id: u64, proposal: CreateProposal) -> StoreResult<Proposal> {
        let write_txn = self.db.begin_write()?;
        let id = {
            let mut proposals = write_txn.open_table(PROPOSALS)?;
            for referred in &proposal.references {
                if proposals.get(*referred)?.is_none() {
                    return Err(StoreError::NotFound(format!("Proposal {referred}")));
                }
            }

            let id = next_id(&write_txn, "proposals")?;
            let row = StoredProposal {
                id,
                dao_id: proposal.dao_id,
                user_id,
                name: proposal.name,
                image_url: proposal.image_url,
                category: proposal.category,
                content: proposal.content,
                voting_system: proposal.voting_system,
                actions: proposal.actions,
                tags: proposal.tags,
                attachments: proposal.attachments,
                status: proposal.status,
                is_proposal: proposal.is_proposal,
                date: Utc::now(),
            };
            write_row(&mut proposals, id, &row)?;

            let mut dao_index = write_txn.open_table(DAO_PROPOSALS)?;
            dao_index.insert((row.dao_id, id), ())?;

            let mut references = write_txn.open_table(PROPOSAL_REFERENCES)?;
            for referred in &proposal.references {
                references.insert((id, *referred), ())?;
            }
            id
        };
        write_txn.commit()?;

        tracing::info!(proposal_id = id, user_id, "Proposal created");
        self.get(id)
    }

    /// Overwrite the columns present in `patch`. Author only.
    pub fn edit_basic(&self, user_id: u64, proposal_id: u64, patch: UpdateProposalBasic) -> StoreResult<Proposal> {
        let write_txn = self.db.begin_write()?;
        {
            let mut row = owned_proposal(&write_txn, proposal_id, user_id)?;
            if let Some(name) = patch.name {
                row.name = name;
            }
            if let Some(image_url) = patch.image_url {
                row.image_url = Some(image_url);
            }
            if let Some(category) = patch.category {
                row.category = Some(category);
            }
            if let Some(content) = patch.content {
                row.content = Some(content);
            }
            if let Some(voting_system) = patch.voting_system {
                row.voting_system = Some(voting_system);
            }
            if let Some(actions) = patch.actions {
                row.actions = actions;
            }
            if let Some(tags) = patch.tags {
                row.tags = tags;
            }
            if let Some(attachments) = patch.attachments {
                row.attachments = attachments;
            }
            if let Some(status) = patch.status {
                row.status = status;
            }
            if let Some(is_proposal) = patch.is_proposal {
                row.is_proposal = is_proposal;
            }
            let mut proposals = write_txn.open_table(PROPOSALS)?;
            write_row(&mut proposals, proposal_id, &row)?;
        }
        write_txn.commit()?;
        self.get(proposal_id)
    }

    /// Delete a proposal and everything hanging off it in one transaction.
    pub fn delete(&self, caller: &StoredUser, proposal_id: u64) -> StoreResult<DeletedProposal> {
        let write_txn = self.db.begin_write()?;
        let deleted = {
            let mut proposals = write_txn.open_table(PROPOSALS)?;
            let row: StoredProposal = read_row(&proposals, proposal_id)?
                .ok_or_else(|| StoreError::NotFound(format!("Proposal {proposal_id}")))?;
            if row.user_id != caller.id && !caller.is_superuser {
                return Err(StoreError::Forbidden(format!(
                    "Only the author can delete proposal {proposal_id}"
                )));
            }
            proposals.remove(proposal_id)?;

            let mut dao_index = write_txn.open_table(DAO_PROPOSALS)?;
            dao_index.remove((row.dao_id, proposal_id))?;

            let mut likes = write_txn.open_table(PROPOSAL_LIKES)?;
            remove_edges_from(&mut likes, proposal_id)?;

            let mut followers = write_txn.open_table(PROPOSAL_FOLLOWERS)?;
            remove_edges_from(&mut followers, proposal_id)?;

            let mut references = write_txn.open_table(PROPOSAL_REFERENCES)?;
            remove_edges_from(&mut references, proposal_id)?;
            let referrers = remove_edges_to(&mut references, proposal_id)?;

            let mut comment_index = write_txn.open_table(PROPOSAL_COMMENTS)?;
            let mut comments = write_txn.open_table(COMMENTS)?;
            let mut comment_likes = write_txn.open_table(COMMENT_LIKES)?;
            for comment_id in remove_edges_from(&mut comment_index, proposal_id)? {
                comments.remove(comment_id)?;
                remove_edges_from(&mut comment_likes, comment_id)?;
            }

            let mut addendum_index = write_txn.open_table(PROPOSAL_ADDENDUMS)?;
            let mut addendums = write_txn.open_table(ADDENDUMS)?;
            for addendum_id in remove_edges_from(&mut addendum_index, proposal_id)? {
                addendums.remove(addendum_id)?;
            }

            DeletedProposal {
                proposal: row,
                referrers,
            }
        };
        write_txn.commit()?;

        tracing::info!(proposal_id, deleted_by = caller.id, "Proposal deleted");
        Ok(deleted)
    }
}

// =============================================================================
// Transaction helpers
// =============================================================================

fn load_proposal(txn: &ReadTransaction, proposal_id: u64) -> StoreResult<StoredProposal> {
    let table = txn.open_table(PROPOSALS)?;
    read_row(&table, proposal_id)?.ok_or_else(|| StoreError::NotFound(format!("Proposal {proposal_id}")))
}

/// Load a proposal for mutation, requiring `user_id` to be its author.
fn owned_proposal(txn: &WriteTransaction, proposal_id: u64, user_id: u64) -> StoreResult<StoredProposal> {
    let table = txn.open_table(PROPOSALS)?;
    let row: StoredProposal = read_row(&table, proposal_id)?
        .ok_or_else(|| StoreError::NotFound(format!("Proposal {proposal_id}")))?;
    if row.user_id != user_id {
        return Err(StoreError::Forbidden(format!(
            "Only the author can modify proposal {proposal_id}"
        )));
    }
    Ok(row)
}

fn apply_like(
    table: &mut redb::Table<'_, (u64, u64), bool>,
    source: u64,
    user_id: u64,
    action: LikeAction,
) -> StoreResult<()> {
    match action {
        LikeAction::Like => {
            table.insert((source, user_id), true)?;
        }
        LikeAction::Dislike => {
            table.insert((source, user_id), false)?;
        }
        LikeAction::Remove => {
            table.remove((source, user_id))?;
        }
    }
    Ok(())
}

/// Alias and DAO profile image of a user. Deleted users render as an empty
/// alias.
fn author(txn: &ReadTransaction, user_id: u64, dao_id: u64) -> StoreResult<(String, Option<String>)> {
    let users = txn.open_table(USERS)?;
    let alias = read_row::<StoredUser, _>(&users, user_id)?
        .map(|u| u.alias)
        .unwrap_or_default();

    let index = txn.open_table(USER_DETAILS_INDEX)?;
    let Some(details_id) = index.get((user_id, dao_id))?.map(|v| v.value()) else {
        return Ok((alias, None));
    };
    let details = txn.open_table(USER_DETAILS)?;
    let image = read_row::<StoredUserDetails, _>(&details, details_id)?.and_then(|d| d.profile_img_url);
    Ok((alias, image))
}

fn comment_view(txn: &ReadTransaction, row: StoredComment, dao_id: u64) -> StoreResult<Comment> {
    let likes_table = txn.open_table(COMMENT_LIKES)?;
    let (likes, dislikes) = split_likes(&likes_table, row.id)?;
    let (alias, profile_img_url) = author(txn, row.user_id, dao_id)?;
    Ok(Comment {
        id: row.id,
        proposal_id: row.proposal_id,
        user_id: row.user_id,
        parent: row.parent,
        comment: row.comment,
        date: row.date,
        alias,
        profile_img_url,
        likes,
        dislikes,
    })
}

fn load_comments(txn: &ReadTransaction, proposal_id: u64, dao_id: u64) -> StoreResult<Vec<Comment>> {
    let index = txn.open_table(PROPOSAL_COMMENTS)?;
    let rows = txn.open_table(COMMENTS)?;
    let mut comments = Vec::new();
    for comment_id in edge_targets(&index, proposal_id)? {
        if let Some(row) = read_row::<StoredComment, _>(&rows, comment_id)? {
            comments.push(comment_view(txn, row, dao_id)?);
        }
    }
    Ok(comments)
}

fn load_addendums(txn: &ReadTransaction, proposal_id: u64) -> StoreResult<Vec<Addendum>> {
    let index = txn.open_table(PROPOSAL_ADDENDUMS)?;
    let rows = txn.open_table(ADDENDUMS)?;
    let mut addendums = Vec::new();
    for addendum_id in edge_targets(&index, proposal_id)? {
        if let Some(row) = read_row(&rows, addendum_id)? {
            addendums.push(row);
        }
    }
    Ok(addendums)
}

fn assemble(txn: &ReadTransaction, row: StoredProposal) -> StoreResult<Proposal> {
    let likes_table = txn.open_table(PROPOSAL_LIKES)?;
    let (likes, dislikes) = split_likes(&likes_table, row.id)?;

    let followers_table = txn.open_table(PROPOSAL_FOLLOWERS)?;
    let followers = edge_targets(&followers_table, row.id)?;

    let references_table = txn.open_table(PROPOSAL_REFERENCES)?;
    let references = edge_targets(&references_table, row.id)?;

    let proposals = txn.open_table(PROPOSALS)?;
    let mut references_meta = Vec::with_capacity(references.len());
    for referred_id in &references {
        let Some(referred) = read_row::<StoredProposal, _>(&proposals, *referred_id)? else {
            continue;
        };
        let (likes, dislikes) = split_likes(&likes_table, referred.id)?;
        references_meta.push(ProposalReferenceMeta {
            id: referred.id,
            name: referred.name,
            likes,
            dislikes,
            img: referred.image_url.unwrap_or_default(),
            is_proposal: referred.is_proposal,
        });
    }

    let comments = load_comments(txn, row.id, row.dao_id)?;
    let addendums = load_addendums(txn, row.id)?;
    let (alias, profile_img_url) = author(txn, row.user_id, row.dao_id)?;

    Ok(Proposal {
        id: row.id,
        dao_id: row.dao_id,
        user_id: row.user_id,
        name: row.name,
        image_url: row.image_url,
        category: row.category,
        content: row.content,
        voting_system: row.voting_system,
        status: row.status,
        is_proposal: row.is_proposal,
        actions: row.actions,
        tags: row.tags,
        attachments: row.attachments,
        references,
        references_meta,
        likes,
        dislikes,
        followers,
        comments,
        addendums,
        alias,
        profile_img_url,
        created: row.date.timestamp(),
        date: row.date,
    })
}

#[cfg(test)]
mod tests {
    use redb::ReadableTableMetadata;

    use super::*;
    use crate::storage::database::tests::temp_db;
    use crate::storage::repository::profiles::ProfileRepository;
    use crate::storage::repository::users::{NewUser, UserRepository};

    fn user(db: &Database, alias: &str, is_superuser: bool) -> StoredUser {
        UserRepository::new(db)
            .create(NewUser {
                alias: alias.to_string(),
                password: "pw".to_string(),
                primary_wallet_address: None,
                is_active: true,
                is_superuser,
            })
            .unwrap()
    }

    fn draft(name: &str, references: Vec<u64>) -> CreateProposal {
        serde_json::from_value(serde_json::json!({
            "dao_id": 1,
            "name": name,
            "references": references,
            "tags": ["treasury"],
        }))
        .unwrap()
    }

    fn comment(text: &str, parent: Option<u64>) -> CreateComment {
        CreateComment {
            comment: text.to_string(),
            parent,
        }
    }

    #[test]
    fn like_then_dislike_swaps_and_remove_clears() {
        let (db, _dir) = temp_db();
        let author = user(&db, "author", false);
        let repo = ProposalRepository::new(&db);
        let proposal = repo.create(author.id, draft("p", vec![])).unwrap();

        let likes = repo.set_like(proposal.id, 7, LikeAction::Like).unwrap();
        assert_eq!((likes.likes, likes.dislikes), (vec![7], vec![]));

        let likes = repo.set_like(proposal.id, 7, LikeAction::Dislike).unwrap();
        assert_eq!((likes.likes, likes.dislikes), (vec![], vec![7]));

        let likes = repo.set_like(proposal.id, 7, LikeAction::Remove).unwrap();
        assert!(likes.likes.is_empty() && likes.dislikes.is_empty());
    }

    #[test]
    fn follow_is_idempotent_and_unfollow_removes() {
        let (db, _dir) = temp_db();
        let author = user(&db, "author", false);
        let repo = ProposalRepository::new(&db);
        let proposal = repo.create(author.id, draft("p", vec![])).unwrap();

        repo.set_follower(proposal.id, 3, FollowAction::Follow).unwrap();
        let followers = repo.set_follower(proposal.id, 3, FollowAction::Follow).unwrap();
        assert_eq!(followers.followers, vec![3]);

        let followers = repo.set_follower(proposal.id, 3, FollowAction::Unfollow).unwrap();
        assert!(followers.followers.is_empty());
    }

    #[test]
    fn create_records_references_and_meta() {
        let (db, _dir) = temp_db();
        let author = user(&db, "author", false);
        let repo = ProposalRepository::new(&db);
        let base = repo.create(author.id, draft("base", vec![])).unwrap();
        repo.set_like(base.id, 9, LikeAction::Like).unwrap();

        let proposal = repo.create(author.id, draft("follow-up", vec![base.id])).unwrap();
        assert_eq!(proposal.references, vec![base.id]);
        assert_eq!(proposal.references_meta.len(), 1);
        assert_eq!(proposal.references_meta[0].name, "base");
        assert_eq!(proposal.references_meta[0].likes, vec![9]);
        assert_eq!(proposal.alias, "author");
        assert_eq!(proposal.status, "discussion");
        assert_eq!(proposal.created, proposal.date.timestamp());

        assert!(matches!(
            repo.create(author.id, draft("dangling", vec![999])),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn only_author_adds_references_and_addendums() {
        let (db, _dir) = temp_db();
        let author = user(&db, "author", false);
        let other = user(&db, "other", false);
        let repo = ProposalRepository::new(&db);
        let a = repo.create(author.id, draft("a", vec![])).unwrap();
        let b = repo.create(author.id, draft("b", vec![])).unwrap();

        assert!(matches!(
            repo.add_reference(other.id, a.id, b.id),
            Err(StoreError::Forbidden(_))
        ));
        assert!(matches!(
            repo.add_reference(author.id, a.id, 404),
            Err(StoreError::NotFound(_))
        ));
        let refs = repo.add_reference(author.id, a.id, b.id).unwrap();
        assert_eq!(refs.references, vec![b.id]);

        let addendum = CreateAddendum {
            name: "Budget".to_string(),
            content: Some("1000 ERG".to_string()),
        };
        assert!(matches!(
            repo.add_addendum(other.id, a.id, addendum.clone()),
            Err(StoreError::Forbidden(_))
        ));
        repo.add_addendum(author.id, a.id, addendum).unwrap();
        assert_eq!(repo.addendums(a.id).unwrap().len(), 1);
    }

    #[test]
    fn comments_thread_within_one_proposal() {
        let (db, _dir) = temp_db();
        let author = user(&db, "author", false);
        let repo = ProposalRepository::new(&db);
        ProfileRepository::new(&db).create_profile(author.id, 1).unwrap();
        let a = repo.create(author.id, draft("a", vec![])).unwrap();
        let b = repo.create(author.id, draft("b", vec![])).unwrap();

        let root = repo.add_comment(a.id, author.id, comment("first", None)).unwrap();
        let reply = repo.add_comment(a.id, author.id, comment("reply", Some(root.id))).unwrap();
        assert_eq!(reply.parent, Some(root.id));
        assert_eq!(reply.alias, "author");

        assert!(matches!(
            repo.add_comment(b.id, author.id, comment("cross", Some(root.id))),
            Err(StoreError::Invalid(_))
        ));

        let liked = repo.set_comment_like(root.id, 5, LikeAction::Like).unwrap();
        assert_eq!(liked.likes, vec![5]);

        let comments = repo.comments(a.id).unwrap();
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].likes, vec![5]);

        assert_eq!(repo.comment_proposal_id(reply.id).unwrap(), a.id);
        assert!(matches!(repo.comment_proposal_id(999), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn edit_basic_overwrites_only_present_fields() {
        let (db, _dir) = temp_db();
        let author = user(&db, "author", false);
        let other = user(&db, "other", false);
        let repo = ProposalRepository::new(&db);
        let created = repo.create(author.id, draft("p", vec![])).unwrap();

        let patch = UpdateProposalBasic {
            content: Some("new body".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            repo.edit_basic(other.id, created.id, patch.clone()),
            Err(StoreError::Forbidden(_))
        ));

        let edited = repo.edit_basic(author.id, created.id, patch).unwrap();
        assert_eq!(edited.content.as_deref(), Some("new body"));
        assert_eq!(edited.name, "p");
        assert_eq!(edited.tags, vec!["treasury"]);
        assert_eq!(edited.status, "discussion");
    }

    #[test]
    fn delete_cascades_every_edge() {
        let (db, _dir) = temp_db();
        let author = user(&db, "author", false);
        let repo = ProposalRepository::new(&db);
        let other = repo.create(author.id, draft("other", vec![])).unwrap();
        let target = repo.create(author.id, draft("target", vec![other.id])).unwrap();
        repo.add_reference(author.id, other.id, target.id).unwrap();
        repo.set_like(target.id, 2, LikeAction::Like).unwrap();
        repo.set_follower(target.id, 2, FollowAction::Follow).unwrap();
        let c = repo.add_comment(target.id, author.id, comment("hi", None)).unwrap();
        repo.set_comment_like(c.id, 2, LikeAction::Dislike).unwrap();
        repo.add_addendum(
            author.id,
            target.id,
            CreateAddendum {
                name: "x".to_string(),
                content: None,
            },
        )
        .unwrap();

        let deleted = repo.delete(&author, target.id).unwrap();
        assert_eq!(deleted.proposal.id, target.id);
        assert_eq!(deleted.referrers, vec![other.id]);

        assert!(matches!(repo.get(target.id), Err(StoreError::NotFound(_))));
        let read = db.begin_read().unwrap();
        assert!(edge_targets(&read.open_table(PROPOSAL_LIKES).unwrap(), target.id).unwrap().is_empty());
        assert!(edge_targets(&read.open_table(PROPOSAL_FOLLOWERS).unwrap(), target.id).unwrap().is_empty());
        assert!(edge_targets(&read.open_table(PROPOSAL_COMMENTS).unwrap(), target.id).unwrap().is_empty());
        assert!(edge_targets(&read.open_table(PROPOSAL_ADDENDUMS).unwrap(), target.id).unwrap().is_empty());
        assert!(edge_targets(&read.open_table(COMMENT_LIKES).unwrap(), c.id).unwrap().is_empty());
        assert!(read.open_table(COMMENTS).unwrap().is_empty().unwrap());
        assert!(read.open_table(ADDENDUMS).unwrap().is_empty().unwrap());

        let refs = read.open_table(PROPOSAL_REFERENCES).unwrap();
        assert!(edge_targets(&refs, target.id).unwrap().is_empty());
        assert!(edge_targets(&refs, other.id).unwrap().is_empty());

        assert_eq!(repo.by_dao(1).unwrap().len(), 1);
    }

    #[test]
    fn delete_requires_author_or_superuser() {
        let (db, _dir) = temp_db();
        let author = user(&db, "author", false);
        let stranger = user(&db, "stranger", false);
        let admin = user(&db, "admin", true);
        let repo = ProposalRepository::new(&db);
        let p = repo.create(author.id, draft("p", vec![])).unwrap();

        assert!(matches!(repo.delete(&stranger, p.id), Err(StoreError::Forbidden(_))));
        repo.delete(&admin, p.id).unwrap();
        assert!(matches!(repo.delete(&admin, p.id), Err(StoreError::NotFound(_))));
    }
}
