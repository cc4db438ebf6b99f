use crate::database::models::ThreadRecord;
use crate::error::{FeedError, FeedResult};
use crate::hydration::{FeedHydrator, HydratedFeed, ThreadEntity};
use crate::mutation::ThreadMutationService;
use crate::session::Session;
use crate::storage::{ThreadStorage, UserProfileStorage};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Use cases for reading and writing threads on behalf of a session.
#[derive(Clone)]
pub struct ThreadService {
    threads: Arc<dyn ThreadStorage>,
    hydrator: FeedHydrator,
    mutations: ThreadMutationService,
}

impl ThreadService {
    pub fn new(threads: Arc<dyn ThreadStorage>, profiles: Arc<dyn UserProfileStorage>) -> Self {
        Self {
            hydrator: FeedHydrator::new(profiles),
            mutations: ThreadMutationService::new(Arc::clone(&threads)),
            threads,
        }
    }

    pub fn with_hydration_concurrency(mut self, concurrency: usize) -> Self {
        self.hydrator = self.hydrator.with_concurrency(concurrency);
        self
    }

    /// The global feed, newest first.
    pub async fn fetch_threads(&self, session: &Session) -> FeedResult<HydratedFeed> {
        let viewer = session.require_user_id()?;
        let raw = self.threads.fetch_all().await?;
        Ok(self.hydrator.hydrate(raw, viewer).await)
    }

    /// Threads written by the session's own user.
    pub async fn fetch_own_threads(&self, session: &Session) -> FeedResult<HydratedFeed> {
        let viewer = session.require_user_id()?;
        let raw = self.threads.fetch_by_owner(viewer).await?;
        Ok(self.hydrator.hydrate(raw, viewer).await)
    }

    pub async fn fetch_threads_by_user(
        &self,
        session: &Session,
        user_id: &str,
    ) -> FeedResult<HydratedFeed> {
        let viewer = session.require_user_id()?;
        let raw = self.threads.fetch_by_owner(user_id).await?;
        Ok(self.hydrator.hydrate(raw, viewer).await)
    }

    /// Posts a new thread and returns it joined with its author, the same
    /// shape a feed read produces.
    pub async fn create_thread(
        &self,
        session: &Session,
        input: CreateThreadInput,
    ) -> FeedResult<ThreadEntity> {
        let owner_id = session.require_user_id()?;
        if input.caption.trim().is_empty() {
            return Err(FeedError::InvalidInput(
                "thread caption may not be empty".into(),
            ));
        }

        let record = ThreadRecord::new(
            Uuid::new_v4().to_string(),
            owner_id.to_string(),
            input.caption,
            input.created_at.unwrap_or_else(Utc::now),
        );
        let stored = self.threads.create(record).await?;
        let thread_id = stored.thread_id.clone();
        tracing::info!(thread_id = %thread_id, owner_id, "thread created");

        let mut feed = self.hydrator.hydrate(vec![stored], owner_id).await;
        if let Some(skipped) = feed.skipped.pop() {
            return Err(skipped.reason);
        }
        feed.threads
            .pop()
            .ok_or_else(|| FeedError::thread_not_found(&thread_id))
    }

    /// Likes or unlikes a thread as the session's user.
    pub async fn like_thread(&self, session: &Session, thread_id: &str) -> FeedResult<bool> {
        let user_id = session.require_user_id()?;
        self.mutations.toggle_like(thread_id, user_id).await
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateThreadInput {
    pub caption: String,
    /// Optional timestamp for imported threads. If None, uses current time.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl CreateThreadInput {
    pub fn new(caption: impl Into<String>) -> Self {
        Self {
            caption: caption.into(),
            created_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::UserProfile;
    use crate::database::Database;
    use crate::hydration::tests::CountingProfiles;
    use crate::storage::MemoryStore;
    use chrono::TimeZone;

    fn memory_service() -> (MemoryStore, ThreadService) {
        let store = MemoryStore::new();
        store
            .insert_user(UserProfile::new("a", "alice", "Alice"))
            .unwrap();
        store.insert_user(UserProfile::new("b", "bob", "Bob")).unwrap();
        let shared = Arc::new(store.clone());
        (store, ThreadService::new(shared.clone(), shared))
    }

    fn setup_sqlite_service() -> ThreadService {
        let db = Database::open_in_memory().expect("in-memory db");
        db.with_repositories(|repos| {
            use crate::database::repositories::UserRepository;
            repos.users().upsert(&UserProfile::new("a", "alice", "Alice"))?;
            repos.users().upsert(&UserProfile::new("b", "bob", "Bob"))?;
            Ok(())
        })
        .expect("seed users");
        let db = Arc::new(db);
        ThreadService::new(db.clone(), db)
    }

    fn at(minute: u32) -> Option<DateTime<Utc>> {
        Some(Utc.with_ymd_and_hms(2024, 2, 2, 8, minute, 0).unwrap())
    }

    #[tokio::test]
    async fn every_use_case_requires_a_user() {
        let (_, service) = memory_service();
        let anon = Session::anonymous();

        assert_eq!(
            service.fetch_threads(&anon).await.unwrap_err(),
            FeedError::Unauthenticated
        );
        assert_eq!(
            service.fetch_own_threads(&anon).await.unwrap_err(),
            FeedError::Unauthenticated
        );
        assert_eq!(
            service.fetch_threads_by_user(&anon, "a").await.unwrap_err(),
            FeedError::Unauthenticated
        );
        assert_eq!(
            service
                .create_thread(&anon, CreateThreadInput::new("hi"))
                .await
                .unwrap_err(),
            FeedError::Unauthenticated
        );
        assert_eq!(
            service.like_thread(&anon, "t").await.unwrap_err(),
            FeedError::Unauthenticated
        );
    }

    #[tokio::test]
    async fn created_thread_comes_back_hydrated() {
        let (_, service) = memory_service();
        let alice = Session::authenticated("a");

        let entity = service
            .create_thread(&alice, CreateThreadInput::new("first post"))
            .await
            .expect("create thread");
        assert_eq!(entity.owner_id, "a");
        assert_eq!(entity.caption, "first post");
        assert_eq!(entity.like_count, 0);
        assert!(entity.liked_by.is_empty());
        assert!(!entity.liked_by_current_user);
        assert_eq!(entity.author.as_ref().unwrap().username, "alice");
        assert!(Uuid::parse_str(&entity.thread_id).is_ok());
    }

    #[tokio::test]
    async fn blank_caption_is_rejected() {
        let (store, service) = memory_service();
        let err = service
            .create_thread(&Session::authenticated("a"), CreateThreadInput::new("   "))
            .await
            .unwrap_err();
        assert!(matches!(err, FeedError::InvalidInput(_)));
        assert!(store.fetch_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn creating_without_a_profile_reports_the_lookup_failure() {
        let (_, service) = memory_service();
        let err = service
            .create_thread(&Session::authenticated("ghost"), CreateThreadInput::new("boo"))
            .await
            .unwrap_err();
        assert_eq!(err, FeedError::user_not_found("ghost"));
    }

    #[tokio::test]
    async fn feeds_are_scoped_and_newest_first() {
        let service = setup_sqlite_service();
        let alice = Session::authenticated("a");
        let bob = Session::authenticated("b");

        for (session, caption, minute) in [
            (&alice, "a-old", 1),
            (&bob, "b-mid", 2),
            (&alice, "a-new", 3),
        ] {
            let mut input = CreateThreadInput::new(caption);
            input.created_at = at(minute);
            service.create_thread(session, input).await.unwrap();
        }

        let captions = |feed: HydratedFeed| -> Vec<String> {
            feed.threads.into_iter().map(|t| t.caption).collect()
        };

        let all = service.fetch_threads(&bob).await.unwrap();
        assert_eq!(captions(all), vec!["a-new", "b-mid", "a-old"]);

        let own = service.fetch_own_threads(&alice).await.unwrap();
        assert_eq!(captions(own), vec!["a-new", "a-old"]);

        let bobs = service.fetch_threads_by_user(&alice, "b").await.unwrap();
        assert_eq!(captions(bobs), vec!["b-mid"]);
    }

    #[tokio::test]
    async fn like_thread_flips_the_viewer_flag() {
        let service = setup_sqlite_service();
        let alice = Session::authenticated("a");
        let bob = Session::authenticated("b");
        let created = service
            .create_thread(&alice, CreateThreadInput::new("like me"))
            .await
            .unwrap();

        assert!(service.like_thread(&bob, &created.thread_id).await.unwrap());
        let feed = service.fetch_threads(&bob).await.unwrap();
        assert!(feed.threads[0].liked_by_current_user);
        assert_eq!(feed.threads[0].like_count, 1);

        let feed = service.fetch_threads(&alice).await.unwrap();
        assert!(!feed.threads[0].liked_by_current_user);

        service.like_thread(&bob, &created.thread_id).await.unwrap();
        let feed = service.fetch_threads(&bob).await.unwrap();
        assert!(!feed.threads[0].liked_by_current_user);
        assert_eq!(feed.threads[0].like_count, 0);
    }

    #[tokio::test]
    async fn liking_an_unknown_thread_is_not_found() {
        let service = setup_sqlite_service();
        let err = service
            .like_thread(&Session::authenticated("a"), "nope")
            .await
            .unwrap_err();
        assert!(matches!(err, FeedError::NotFound(_)));
    }

    #[tokio::test]
    async fn feed_survives_an_unresolvable_author() {
        let (store, _) = memory_service();
        for (id, owner) in [("t1", "a"), ("t2", "b"), ("t3", "a")] {
            store
                .insert_thread(ThreadRecord::new(
                    id.into(),
                    owner.into(),
                    "x".into(),
                    Utc::now(),
                ))
                .unwrap();
        }
        let profiles = Arc::new(CountingProfiles::new(store.clone()).failing("b"));
        let service = ThreadService::new(Arc::new(store), profiles.clone())
            .with_hydration_concurrency(3);

        let feed = service
            .fetch_threads(&Session::authenticated("a"))
            .await
            .unwrap();
        assert_eq!(feed.len(), 2);
        assert_eq!(feed.skipped_ids().collect::<Vec<_>>(), vec!["t2"]);
        assert_eq!(profiles.calls_for("a"), 1);
    }

    #[tokio::test]
    async fn created_entity_matches_the_feed_read() {
        let service = setup_sqlite_service();
        let alice = Session::authenticated("a");
        let mut input = CreateThreadInput::new("precise");
        input.created_at = Some(Utc.timestamp_nanos(1_700_000_000_123_456_789));

        let created = service.create_thread(&alice, input).await.unwrap();
        let feed = service.fetch_threads(&alice).await.unwrap();
        assert_eq!(created, feed.threads[0]);
    }
}
