mod threads;
mod users;

use super::models::{ProfileUpdate, ThreadRecord, UserProfile};
use anyhow::Result;
use rusqlite::Connection;
use std::collections::BTreeSet;

pub trait ThreadRepository {
    fn create(&self, record: &ThreadRecord) -> Result<()>;
    fn get(&self, id: &str) -> Result<Option<ThreadRecord>>;
    /// All threads, newest first.
    fn list_recent(&self) -> Result<Vec<ThreadRecord>>;
    /// Threads owned by one user, newest first.
    fn list_by_owner(&self, owner_id: &str) -> Result<Vec<ThreadRecord>>;
    /// Replaces the like set and count in one transaction. Returns `false`
    /// when no thread with that id exists.
    fn replace_likes(
        &self,
        thread_id: &str,
        liked_by: &BTreeSet<String>,
        like_count: u64,
    ) -> Result<bool>;
}

pub trait UserRepository {
    fn upsert(&self, record: &UserProfile) -> Result<()>;
    fn get(&self, id: &str) -> Result<Option<UserProfile>>;
    fn get_many(&self, ids: &[String]) -> Result<Vec<UserProfile>>;
    fn list(&self) -> Result<Vec<UserProfile>>;
    fn find_by_username(&self, username: &str) -> Result<Option<UserProfile>>;
    /// Username or display name starting with `term`, ordered by username.
    fn search_prefix(&self, term: &str) -> Result<Vec<UserProfile>>;
    /// Returns `false` when no user with that id exists.
    fn update_details(&self, id: &str, update: &ProfileUpdate) -> Result<bool>;
    fn follow(&self, follower_id: &str, followee_id: &str) -> Result<()>;
    fn unfollow(&self, follower_id: &str, followee_id: &str) -> Result<()>;
}

pub struct SqliteRepositories<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteRepositories<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    pub fn threads(&self) -> impl ThreadRepository + '_ {
        threads::SqliteThreadRepository { conn: self.conn }
    }

    pub fn users(&self) -> impl UserRepository + '_ {
        users::SqliteUserRepository { conn: self.conn }
    }
}
