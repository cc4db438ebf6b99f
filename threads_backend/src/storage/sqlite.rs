use super::{suggestions_for, ThreadStorage, UserProfileStorage};
use crate::database::models::{ProfileUpdate, ThreadRecord, UserProfile};
use crate::database::repositories::{ThreadRepository, UserRepository};
use crate::database::Database;
use crate::error::{FeedError, FeedResult};
use async_trait::async_trait;
use std::collections::BTreeSet;

#[async_trait]
impl ThreadStorage for Database {
    async fn fetch_all(&self) -> FeedResult<Vec<ThreadRecord>> {
        self.with_repositories(|repos| repos.threads().list_recent())
            .map_err(FeedError::read)
    }

    async fn fetch_by_owner(&self, owner_id: &str) -> FeedResult<Vec<ThreadRecord>> {
        self.with_repositories(|repos| repos.threads().list_by_owner(owner_id))
            .map_err(FeedError::read)
    }

    async fn fetch_by_id(&self, thread_id: &str) -> FeedResult<ThreadRecord> {
        self.with_repositories(|repos| repos.threads().get(thread_id))
            .map_err(FeedError::read)?
            .ok_or_else(|| FeedError::thread_not_found(thread_id))
    }

    async fn create(&self, record: ThreadRecord) -> FeedResult<ThreadRecord> {
        // timestamps are stored at microsecond precision, so hand back the row as read
        self.with_repositories(|repos| {
            let threads = repos.threads();
            threads.create(&record)?;
            threads.get(&record.thread_id)
        })
        .map_err(FeedError::write)?
        .ok_or_else(|| FeedError::thread_not_found(&record.thread_id))
    }

    async fn update_like_state(
        &self,
        thread_id: &str,
        liked_by: &BTreeSet<String>,
        like_count: u64,
    ) -> FeedResult<()> {
        let updated = self
            .with_repositories(|repos| {
                repos
                    .threads()
                    .replace_likes(thread_id, liked_by, like_count)
            })
            .map_err(FeedError::write)?;
        if updated {
            Ok(())
        } else {
            Err(FeedError::thread_not_found(thread_id))
        }
    }
}

#[async_trait]
impl UserProfileStorage for Database {
    async fn fetch_by_id(&self, user_id: &str) -> FeedResult<UserProfile> {
        self.with_repositories(|repos| repos.users().get(user_id))
            .map_err(FeedError::read)?
            .ok_or_else(|| FeedError::user_not_found(user_id))
    }

    async fn fetch_by_id_list(&self, user_ids: &[String]) -> FeedResult<Vec<UserProfile>> {
        self.with_repositories(|repos| repos.users().get_many(user_ids))
            .map_err(FeedError::read)
    }

    async fn suggestions(&self, user_id: &str) -> FeedResult<Vec<UserProfile>> {
        let (me, everyone) = self
            .with_repositories(|repos| {
                let users = repos.users();
                Ok((users.get(user_id)?, users.list()?))
            })
            .map_err(FeedError::read)?;
        let me = me.ok_or_else(|| FeedError::user_not_found(user_id))?;
        Ok(suggestions_for(&me, everyone))
    }

    async fn update_profile(
        &self,
        user_id: &str,
        update: &ProfileUpdate,
    ) -> FeedResult<UserProfile> {
        self.with_repositories(|repos| {
            let users = repos.users();
            if !users.update_details(user_id, update)? {
                return Ok(None);
            }
            users.get(user_id)
        })
        .map_err(FeedError::write)?
        .ok_or_else(|| FeedError::user_not_found(user_id))
    }

    async fn is_username_available(&self, username: &str) -> FeedResult<bool> {
        self.with_repositories(|repos| repos.users().find_by_username(username))
            .map(|found| found.is_none())
            .map_err(FeedError::read)
    }

    async fn search(&self, term: &str) -> FeedResult<Vec<UserProfile>> {
        self.with_repositories(|repos| repos.users().search_prefix(term))
            .map_err(FeedError::read)
    }

    async fn toggle_follow(&self, follower_id: &str, followee_id: &str) -> FeedResult<bool> {
        self.with_repositories(|repos| {
            let users = repos.users();
            let Some(follower) = users.get(follower_id)? else {
                return Ok(Err(FeedError::user_not_found(follower_id)));
            };
            if users.get(followee_id)?.is_none() {
                return Ok(Err(FeedError::user_not_found(followee_id)));
            }
            if follower.following.contains(followee_id) {
                users.unfollow(follower_id, followee_id)?;
                Ok(Ok(false))
            } else {
                users.follow(follower_id, followee_id)?;
                Ok(Ok(true))
            }
        })
        .map_err(FeedError::write)?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[tokio::test]
    async fn missing_rows_map_to_not_found() {
        let db = Database::open_in_memory().expect("db");

        let err = ThreadStorage::fetch_by_id(&db, "nope").await.unwrap_err();
        assert!(matches!(err, FeedError::NotFound(_)));

        let err = UserProfileStorage::fetch_by_id(&db, "nobody").await.unwrap_err();
        assert!(matches!(err, FeedError::NotFound(_)));

        let err = db
            .update_like_state("nope", &BTreeSet::new(), 0)
            .await
            .unwrap_err();
        assert!(matches!(err, FeedError::NotFound(_)));
    }

    #[tokio::test]
    async fn duplicate_thread_id_is_a_write_failure() {
        let db = Database::open_in_memory().expect("db");
        let record = ThreadRecord::new("t1".into(), "a".into(), "hi".into(), Utc::now());
        db.create(record.clone()).await.expect("first insert");

        let err = db.create(record).await.unwrap_err();
        assert!(matches!(err, FeedError::WriteFailed(_)));
    }

    #[tokio::test]
    async fn suggestions_skip_self_and_follow_edges() {
        let db = Database::open_in_memory().expect("db");
        db.with_repositories(|repos| {
            let users = repos.users();
            for id in ["me", "friend", "fan", "stranger"] {
                users.upsert(&UserProfile::new(id, id, id.to_uppercase()))?;
            }
            users.follow("me", "friend")?;
            users.follow("fan", "me")?;
            Ok(())
        })
        .expect("seed");

        let ids: Vec<_> = db
            .suggestions("me")
            .await
            .expect("suggestions")
            .into_iter()
            .map(|p| p.user_id)
            .collect();
        assert_eq!(ids, vec!["stranger"]);
    }

    #[tokio::test]
    async fn created_thread_is_returned_as_stored() {
        let db = Database::open_in_memory().expect("db");
        let record = ThreadRecord::new(
            "t1".into(),
            "a".into(),
            "hi".into(),
            Utc.timestamp_nanos(1_700_000_000_123_456_789),
        );

        let created = db.create(record).await.expect("create");
        let listed = db.fetch_all().await.expect("list");
        assert_eq!(created, listed[0]);
        assert_eq!(created.created_at.timestamp_subsec_nanos(), 123_456_000);
    }

    #[tokio::test]
    async fn profile_updates_and_follow_toggles_persist() {
        let db = Database::open_in_memory().expect("db");
        db.with_repositories(|repos| {
            repos.users().upsert(&UserProfile::new("a", "alice", "Alice"))?;
            repos.users().upsert(&UserProfile::new("b", "bob", "Bob"))
        })
        .expect("seed");

        assert!(!db.is_username_available("bob").await.unwrap());
        assert!(db.is_username_available("robert").await.unwrap());

        let update = ProfileUpdate {
            display_name: "Robert".into(),
            username: "robert".into(),
            bio: None,
        };
        let updated = db.update_profile("b", &update).await.unwrap();
        assert_eq!(updated.username, "robert");
        assert!(db.is_username_available("bob").await.unwrap());
        assert!(matches!(
            db.update_profile("ghost", &update).await.unwrap_err(),
            FeedError::NotFound(_)
        ));

        assert!(db.toggle_follow("a", "b").await.unwrap());
        let followers = UserProfileStorage::fetch_by_id(&db, "b").await.unwrap().followers;
        assert!(followers.contains("a"));
        assert!(!db.toggle_follow("a", "b").await.unwrap());
        assert_eq!(
            db.toggle_follow("a", "ghost").await.unwrap_err(),
            FeedError::user_not_found("ghost")
        );

        let found: Vec<_> = db
            .search("Rob")
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.user_id)
            .collect();
        assert_eq!(found, vec!["b"]);
    }
}
