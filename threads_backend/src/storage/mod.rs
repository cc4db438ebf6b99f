//! Storage seams consumed by the feed core.
//!
//! The core only ever talks to [`ThreadStorage`] and [`UserProfileStorage`].
//! [`MemoryStore`] backs tests and demos; the SQLite-backed
//! [`Database`](crate::database::Database) implements both traits for the
//! daemon.

mod memory;
mod sqlite;

pub use memory::MemoryStore;

use crate::database::models::{ProfileUpdate, ThreadRecord, UserProfile};
use crate::error::FeedResult;
use async_trait::async_trait;
use std::collections::BTreeSet;

#[async_trait]
pub trait ThreadStorage: Send + Sync {
    /// Every thread, newest first.
    async fn fetch_all(&self) -> FeedResult<Vec<ThreadRecord>>;

    /// Threads owned by `owner_id`, newest first.
    async fn fetch_by_owner(&self, owner_id: &str) -> FeedResult<Vec<ThreadRecord>>;

    /// Fails with `FeedError::NotFound` when the id is unknown.
    async fn fetch_by_id(&self, thread_id: &str) -> FeedResult<ThreadRecord>;

    /// Persists a new record and returns it as stored.
    async fn create(&self, record: ThreadRecord) -> FeedResult<ThreadRecord>;

    /// Writes the like set and the like count as one update.
    async fn update_like_state(
        &self,
        thread_id: &str,
        liked_by: &BTreeSet<String>,
        like_count: u64,
    ) -> FeedResult<()>;
}

#[async_trait]
pub trait UserProfileStorage: Send + Sync {
    /// Fails with `FeedError::NotFound` when the id is unknown.
    async fn fetch_by_id(&self, user_id: &str) -> FeedResult<UserProfile>;

    /// Best effort: ids without a profile are left out of the result.
    async fn fetch_by_id_list(&self, user_ids: &[String]) -> FeedResult<Vec<UserProfile>>;

    /// Profiles that are neither `user_id` itself nor connected to it by a
    /// follow edge in either direction.
    async fn suggestions(&self, user_id: &str) -> FeedResult<Vec<UserProfile>>;

    /// Overwrites the text fields of an existing profile and returns it as
    /// stored. Fails with `FeedError::NotFound` when the id is unknown.
    async fn update_profile(
        &self,
        user_id: &str,
        update: &ProfileUpdate,
    ) -> FeedResult<UserProfile>;

    /// Whether no profile currently uses `username`.
    async fn is_username_available(&self, username: &str) -> FeedResult<bool>;

    /// Profiles whose username or display name starts with `term`
    /// (case-sensitive), ordered by username.
    async fn search(&self, term: &str) -> FeedResult<Vec<UserProfile>>;

    /// Adds the follow edge if absent, removes it if present. Returns whether
    /// `follower_id` follows `followee_id` afterwards. Both profiles must exist.
    async fn toggle_follow(&self, follower_id: &str, followee_id: &str) -> FeedResult<bool>;
}

/// Prefix match used by profile search.
pub(crate) fn matches_prefix(profile: &UserProfile, term: &str) -> bool {
    profile.username.starts_with(term) || profile.display_name.starts_with(term)
}

/// Filters `candidates` down to the suggestions for `me`.
pub(crate) fn suggestions_for(me: &UserProfile, candidates: Vec<UserProfile>) -> Vec<UserProfile> {
    candidates
        .into_iter()
        .filter(|candidate| {
            candidate.user_id != me.user_id
                && !me.followers.contains(&candidate.user_id)
                && !me.following.contains(&candidate.user_id)
        })
        .collect()
}
