use crate::error::{FeedError, FeedResult};
use crate::storage::ThreadStorage;
use std::sync::Arc;

/// Whether a toggle added or removed the caller's like.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeChange {
    Liked,
    Unliked,
}

/// Applies like/unlike toggles as a read-modify-write against thread storage.
///
/// Two toggles racing on the same thread can lose an update; there is no
/// version check between the read and the write.
#[derive(Clone)]
pub struct ThreadMutationService {
    threads: Arc<dyn ThreadStorage>,
}

impl ThreadMutationService {
    pub fn new(threads: Arc<dyn ThreadStorage>) -> Self {
        Self { threads }
    }

    /// Likes the thread for `user_id`, or unlikes it if already liked.
    /// Returns `true` once the new state is persisted.
    pub async fn toggle_like(&self, thread_id: &str, user_id: &str) -> FeedResult<bool> {
        self.apply_toggle(thread_id, user_id).await.map(|_| true)
    }

    /// Fails with `NotFound` for an unknown thread. Any other failure is
    /// `WriteFailed` and nothing was applied.
    pub async fn apply_toggle(&self, thread_id: &str, user_id: &str) -> FeedResult<LikeChange> {
        let record = self
            .threads
            .fetch_by_id(thread_id)
            .await
            .map_err(not_applied)?;

        if record.like_count != record.liked_by.len() as u64 {
            tracing::warn!(
                thread_id,
                like_count = record.like_count,
                liked_by = record.liked_by.len(),
                "stored like count disagrees with like set; re-deriving"
            );
        }

        let mut liked_by = record.liked_by;
        let change = if liked_by.remove(user_id) {
            LikeChange::Unliked
        } else {
            liked_by.insert(user_id.to_string());
            LikeChange::Liked
        };
        let like_count = liked_by.len() as u64;

        self.threads
            .update_like_state(thread_id, &liked_by, like_count)
            .await
            .map_err(|err| match err {
                FeedError::WriteFailed(_) => err,
                other => FeedError::WriteFailed(other.to_string()),
            })?;

        tracing::info!(thread_id, user_id, ?change, like_count, "like toggled");
        Ok(change)
    }
}

/// Read-side mapping: an unknown thread stays `NotFound`.
fn not_applied(err: FeedError) -> FeedError {
    match err {
        FeedError::NotFound(_) | FeedError::WriteFailed(_) => err,
        other => FeedError::WriteFailed(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::ThreadRecord;
    use crate::database::Database;
    use crate::storage::MemoryStore;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::collections::BTreeSet;

    fn thread(id: &str) -> ThreadRecord {
        ThreadRecord::new(id.into(), "owner".into(), "hi".into(), Utc::now())
    }

    fn seeded(liked_by: &[&str]) -> MemoryStore {
        let store = MemoryStore::new();
        let mut record = thread("t1");
        record.liked_by = liked_by.iter().map(|u| u.to_string()).collect();
        record.like_count = record.liked_by.len() as u64;
        store.insert_thread(record).unwrap();
        store
    }

    async fn stored(store: &MemoryStore) -> ThreadRecord {
        ThreadStorage::fetch_by_id(store, "t1").await.unwrap()
    }

    #[tokio::test]
    async fn like_then_unlike_restores_original_state() {
        let store = seeded(&["u2"]);
        let service = ThreadMutationService::new(Arc::new(store.clone()));
        let before = stored(&store).await;

        let change = service.apply_toggle("t1", "u1").await.unwrap();
        assert_eq!(change, LikeChange::Liked);
        let liked = stored(&store).await;
        assert!(liked.liked_by.contains("u1"));
        assert_eq!(liked.like_count, 2);

        let change = service.apply_toggle("t1", "u1").await.unwrap();
        assert_eq!(change, LikeChange::Unliked);
        let after = stored(&store).await;
        assert_eq!(after.liked_by, before.liked_by);
        assert_eq!(after.like_count, before.like_count);
    }

    #[tokio::test]
    async fn count_matches_set_after_any_sequence() {
        let store = seeded(&[]);
        let service = ThreadMutationService::new(Arc::new(store.clone()));
        for user in ["a", "b", "a", "c", "b", "b", "d", "a"] {
            assert!(service.toggle_like("t1", user).await.unwrap());
            let record = stored(&store).await;
            assert_eq!(record.like_count, record.liked_by.len() as u64);
        }
        let record = stored(&store).await;
        let expected: BTreeSet<String> =
            ["a", "b", "c", "d"].iter().map(|s| s.to_string()).collect();
        assert_eq!(record.liked_by, expected);
    }

    #[tokio::test]
    async fn drifted_count_is_repaired() {
        let store = seeded(&["u1", "u2"]);
        let mut drifted = stored(&store).await;
        drifted.like_count = 7;
        store.insert_thread(drifted).unwrap();

        let service = ThreadMutationService::new(Arc::new(store.clone()));
        service.toggle_like("t1", "u3").await.unwrap();
        let record = stored(&store).await;
        assert_eq!(record.like_count, 3);
    }

    #[tokio::test]
    async fn unknown_thread_is_not_found() {
        let service = ThreadMutationService::new(Arc::new(MemoryStore::new()));
        let err = service.toggle_like("missing", "u1").await.unwrap_err();
        assert!(matches!(err, FeedError::NotFound(_)));
    }

    struct ReadOnlyThreads(MemoryStore);

    #[async_trait]
    impl ThreadStorage for ReadOnlyThreads {
        async fn fetch_all(&self) -> FeedResult<Vec<ThreadRecord>> {
            self.0.fetch_all().await
        }

        async fn fetch_by_owner(&self, owner_id: &str) -> FeedResult<Vec<ThreadRecord>> {
            self.0.fetch_by_owner(owner_id).await
        }

        async fn fetch_by_id(&self, thread_id: &str) -> FeedResult<ThreadRecord> {
            ThreadStorage::fetch_by_id(&self.0, thread_id).await
        }

        async fn create(&self, _record: ThreadRecord) -> FeedResult<ThreadRecord> {
            Err(FeedError::WriteFailed("read-only".into()))
        }

        async fn update_like_state(
            &self,
            _thread_id: &str,
            _liked_by: &BTreeSet<String>,
            _like_count: u64,
        ) -> FeedResult<()> {
            Err(FeedError::TransientFetchFailure("connection reset".into()))
        }
    }

    #[tokio::test]
    async fn persist_failure_is_write_failed_and_not_applied() {
        let store = seeded(&[]);
        let service = ThreadMutationService::new(Arc::new(ReadOnlyThreads(store.clone())));

        let err = service.toggle_like("t1", "u1").await.unwrap_err();
        assert!(matches!(err, FeedError::WriteFailed(_)));
        let record = stored(&store).await;
        assert!(record.liked_by.is_empty());
        assert_eq!(record.like_count, 0);
    }

    struct UnreachableThreads;

    #[async_trait]
    impl ThreadStorage for UnreachableThreads {
        async fn fetch_all(&self) -> FeedResult<Vec<ThreadRecord>> {
            Ok(Vec::new())
        }

        async fn fetch_by_owner(&self, _owner_id: &str) -> FeedResult<Vec<ThreadRecord>> {
            Ok(Vec::new())
        }

        async fn fetch_by_id(&self, _thread_id: &str) -> FeedResult<ThreadRecord> {
            Err(FeedError::TransientFetchFailure("storage read failed".into()))
        }

        async fn create(&self, record: ThreadRecord) -> FeedResult<ThreadRecord> {
            Ok(record)
        }

        async fn update_like_state(
            &self,
            _thread_id: &str,
            _liked_by: &BTreeSet<String>,
            _like_count: u64,
        ) -> FeedResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn failed_read_is_reported_as_write_failed() {
        let service = ThreadMutationService::new(Arc::new(UnreachableThreads));
        let err = service.toggle_like("t1", "u1").await.unwrap_err();
        assert!(matches!(err, FeedError::WriteFailed(_)));
    }

    #[tokio::test]
    async fn toggles_persist_through_sqlite() {
        let db = Database::open_in_memory().unwrap();
        db.create(thread("t1")).await.unwrap();

        let service = ThreadMutationService::new(Arc::new(db.clone()));
        service.toggle_like("t1", "u1").await.unwrap();
        service.toggle_like("t1", "u2").await.unwrap();
        service.toggle_like("t1", "u1").await.unwrap();

        let stored = ThreadStorage::fetch_by_id(&db, "t1").await.unwrap();
        assert_eq!(stored.like_count, 1);
        assert!(stored.liked_by.contains("u2"));
    }
}
