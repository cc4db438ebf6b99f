mod cache;

pub use cache::ProfileJoinCache;

use crate::database::models::{ThreadRecord, UserProfile};
use crate::error::{FeedError, FeedResult};
use crate::storage::UserProfileStorage;
use chrono::{DateTime, Utc};
use futures_util::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;

/// A thread joined with its author, as seen by one viewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadEntity {
    pub thread_id: String,
    pub owner_id: String,
    pub caption: String,
    pub created_at: DateTime<Utc>,
    pub liked_by: BTreeSet<String>,
    pub like_count: u64,
    pub author: Option<UserProfile>,
    pub liked_by_current_user: bool,
}

impl ThreadEntity {
    pub fn from_record(
        record: ThreadRecord,
        author: Option<UserProfile>,
        current_user_id: &str,
    ) -> Self {
        let liked_by_current_user = record.liked_by.contains(current_user_id);
        Self {
            thread_id: record.thread_id,
            owner_id: record.owner_id,
            caption: record.caption,
            created_at: record.created_at,
            liked_by: record.liked_by,
            like_count: record.like_count,
            author,
            liked_by_current_user,
        }
    }
}

/// A thread left out of a feed because its author could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedThread {
    pub thread_id: String,
    pub owner_id: String,
    pub reason: FeedError,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HydratedFeed {
    pub threads: Vec<ThreadEntity>,
    pub skipped: Vec<SkippedThread>,
}

impl HydratedFeed {
    pub fn len(&self) -> usize {
        self.threads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.threads.is_empty()
    }

    pub fn skipped_ids(&self) -> impl Iterator<Item = &str> {
        self.skipped.iter().map(|s| s.thread_id.as_str())
    }
}

/// Attaches author profiles to raw thread records.
///
/// Every call gets its own [`ProfileJoinCache`], so an author shared by many
/// threads is fetched once per call. A thread whose author lookup fails is
/// dropped from the output and listed in [`HydratedFeed::skipped`]; the call
/// itself never fails.
#[derive(Clone)]
pub struct FeedHydrator {
    profiles: Arc<dyn UserProfileStorage>,
    concurrency: usize,
}

impl FeedHydrator {
    pub fn new(profiles: Arc<dyn UserProfileStorage>) -> Self {
        Self {
            profiles,
            concurrency: 1,
        }
    }

    /// Number of author lookups allowed in flight at once. `1` resolves the
    /// feed strictly in input order, one lookup at a time.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub async fn hydrate(
        &self,
        raw_threads: Vec<ThreadRecord>,
        current_user_id: &str,
    ) -> HydratedFeed {
        let total = raw_threads.len();
        let cache = ProfileJoinCache::new();
        let cache = &cache;

        // `buffered` yields in input order regardless of completion order
        let resolved: Vec<(ThreadRecord, FeedResult<UserProfile>)> = stream::iter(raw_threads)
            .map(|record| async move {
                let author = self.resolve_author(cache, &record.owner_id).await;
                (record, author)
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        let mut feed = HydratedFeed::default();
        for (record, author) in resolved {
            match author {
                Ok(profile) => feed.threads.push(ThreadEntity::from_record(
                    record,
                    Some(profile),
                    current_user_id,
                )),
                Err(err) => {
                    tracing::warn!(
                        thread_id = %record.thread_id,
                        owner_id = %record.owner_id,
                        error = %err,
                        "dropping thread with unresolvable author"
                    );
                    feed.skipped.push(SkippedThread {
                        thread_id: record.thread_id,
                        owner_id: record.owner_id,
                        reason: err,
                    });
                }
            }
        }

        tracing::debug!(
            total,
            hydrated = feed.threads.len(),
            skipped = feed.skipped.len(),
            distinct_authors = cache.len(),
            profile_fetches = cache.fetches(),
            "feed hydrated"
        );
        feed
    }

    async fn resolve_author(
        &self,
        cache: &ProfileJoinCache,
        owner_id: &str,
    ) -> FeedResult<UserProfile> {
        cache
            .get_or_fetch(owner_id, |user_id| async move {
                self.profiles.fetch_by_id(&user_id).await
            })
            .await
    }
}
