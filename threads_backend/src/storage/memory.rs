use super::{matches_prefix, suggestions_for, ThreadStorage, UserProfileStorage};
use crate::database::models::{ProfileUpdate, ThreadRecord, UserProfile};
use crate::error::{FeedError, FeedResult};
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Default)]
struct MemoryState {
    /// Insertion order; listing sorts newest first.
    threads: Vec<ThreadRecord>,
    users: BTreeMap<String, UserProfile>,
}

/// Process-local store implementing both storage traits.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a profile.
    pub fn insert_user(&self, profile: UserProfile) -> FeedResult<()> {
        let mut state = self.write()?;
        state.users.insert(profile.user_id.clone(), profile);
        Ok(())
    }

    /// Inserts or replaces a thread record verbatim.
    pub fn insert_thread(&self, record: ThreadRecord) -> FeedResult<()> {
        let mut state = self.write()?;
        match state
            .threads
            .iter_mut()
            .find(|existing| existing.thread_id == record.thread_id)
        {
            Some(existing) => *existing = record,
            None => state.threads.push(record),
        }
        Ok(())
    }

    /// Records a follow edge on both profiles.
    pub fn follow(&self, follower_id: &str, followee_id: &str) -> FeedResult<()> {
        let mut state = self.write()?;
        if !state.users.contains_key(followee_id) {
            return Err(FeedError::user_not_found(followee_id));
        }
        let follower = state
            .users
            .get_mut(follower_id)
            .ok_or_else(|| FeedError::user_not_found(follower_id))?;
        follower.following.insert(followee_id.to_string());
        if let Some(followee) = state.users.get_mut(followee_id) {
            followee.followers.insert(follower_id.to_string());
        }
        Ok(())
    }

    fn read(&self) -> FeedResult<RwLockReadGuard<'_, MemoryState>> {
        self.state
            .read()
            .map_err(|_| FeedError::TransientFetchFailure("memory store lock poisoned".into()))
    }

    fn write(&self) -> FeedResult<RwLockWriteGuard<'_, MemoryState>> {
        self.state
            .write()
            .map_err(|_| FeedError::WriteFailed("memory store lock poisoned".into()))
    }

    fn newest_first<'a>(
        threads: impl DoubleEndedIterator<Item = &'a ThreadRecord>,
    ) -> Vec<ThreadRecord> {
        // later inserts win ties, matching the SQLite rowid tiebreak
        let mut listed: Vec<ThreadRecord> = threads.rev().cloned().collect();
        listed.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        listed
    }
}

#[async_trait]
impl ThreadStorage for MemoryStore {
    async fn fetch_all(&self) -> FeedResult<Vec<ThreadRecord>> {
        let state = self.read()?;
        Ok(Self::newest_first(state.threads.iter()))
    }

    async fn fetch_by_owner(&self, owner_id: &str) -> FeedResult<Vec<ThreadRecord>> {
        let state = self.read()?;
        let owned: Vec<&ThreadRecord> = state
            .threads
            .iter()
            .filter(|t| t.owner_id == owner_id)
            .collect();
        Ok(Self::newest_first(owned.into_iter()))
    }

    async fn fetch_by_id(&self, thread_id: &str) -> FeedResult<ThreadRecord> {
        let state = self.read()?;
        state
            .threads
            .iter()
            .find(|t| t.thread_id == thread_id)
            .cloned()
            .ok_or_else(|| FeedError::thread_not_found(thread_id))
    }

    async fn create(&self, record: ThreadRecord) -> FeedResult<ThreadRecord> {
        let mut state = self.write()?;
        if state.threads.iter().any(|t| t.thread_id == record.thread_id) {
            return Err(FeedError::WriteFailed(format!(
                "thread {} already exists",
                record.thread_id
            )));
        }
        state.threads.push(record.clone());
        Ok(record)
    }

    async fn update_like_state(
        &self,
        thread_id: &str,
        liked_by: &BTreeSet<String>,
        like_count: u64,
    ) -> FeedResult<()> {
        let mut state = self.write()?;
        let record = state
            .threads
            .iter_mut()
            .find(|t| t.thread_id == thread_id)
            .ok_or_else(|| FeedError::thread_not_found(thread_id))?;
        record.liked_by = liked_by.clone();
        record.like_count = like_count;
        Ok(())
    }
}

#[async_trait]
impl UserProfileStorage for MemoryStore {
    async fn fetch_by_id(&self, user_id: &str) -> FeedResult<UserProfile> {
        let state = self.read()?;
        state
            .users
            .get(user_id)
            .cloned()
            .ok_or_else(|| FeedError::user_not_found(user_id))
    }

    async fn fetch_by_id_list(&self, user_ids: &[String]) -> FeedResult<Vec<UserProfile>> {
        let state = self.read()?;
        let wanted: BTreeSet<&str> = user_ids.iter().map(String::as_str).collect();
        Ok(wanted
            .into_iter()
            .filter_map(|id| state.users.get(id).cloned())
            .collect())
    }

    async fn suggestions(&self, user_id: &str) -> FeedResult<Vec<UserProfile>> {
        let state = self.read()?;
        let me = state
            .users
            .get(user_id)
            .ok_or_else(|| FeedError::user_not_found(user_id))?;
        Ok(suggestions_for(me, state.users.values().cloned().collect()))
    }

    async fn update_profile(
        &self,
        user_id: &str,
        update: &ProfileUpdate,
    ) -> FeedResult<UserProfile> {
        let mut state = self.write()?;
        if state
            .users
            .values()
            .any(|p| p.username == update.username && p.user_id != user_id)
        {
            return Err(FeedError::WriteFailed(format!(
                "username {} already in use",
                update.username
            )));
        }
        let profile = state
            .users
            .get_mut(user_id)
            .ok_or_else(|| FeedError::user_not_found(user_id))?;
        profile.display_name = update.display_name.clone();
        profile.username = update.username.clone();
        profile.bio = update.bio.clone();
        Ok(profile.clone())
    }

    async fn is_username_available(&self, username: &str) -> FeedResult<bool> {
        let state = self.read()?;
        Ok(!state.users.values().any(|p| p.username == username))
    }

    async fn search(&self, term: &str) -> FeedResult<Vec<UserProfile>> {
        let state = self.read()?;
        let mut found: Vec<UserProfile> = state
            .users
            .values()
            .filter(|p| matches_prefix(p, term))
            .cloned()
            .collect();
        found.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(found)
    }

    async fn toggle_follow(&self, follower_id: &str, followee_id: &str) -> FeedResult<bool> {
        let mut state = self.write()?;
        for id in [follower_id, followee_id] {
            if !state.users.contains_key(id) {
                return Err(FeedError::user_not_found(id));
            }
        }
        let following = match state.users.get_mut(follower_id) {
            Some(follower) => {
                if follower.following.remove(followee_id) {
                    false
                } else {
                    follower.following.insert(followee_id.to_string());
                    true
                }
            }
            None => return Err(FeedError::user_not_found(follower_id)),
        };
        if let Some(followee) = state.users.get_mut(followee_id) {
            if following {
                followee.followers.insert(follower_id.to_string());
            } else {
                followee.followers.remove(follower_id);
            }
        }
        Ok(following)
    }
}
