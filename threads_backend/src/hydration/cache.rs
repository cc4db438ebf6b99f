use crate::database::models::UserProfile;
use crate::error::FeedResult;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::OnceCell;

type Slot = Arc<OnceCell<FeedResult<UserProfile>>>;

/// Memoizes author lookups for the duration of one hydration call.
///
/// Each user id owns a single claim cell. The first caller for an id runs the
/// fetch; every later or concurrent caller for the same id waits on that cell
/// and receives a clone of its outcome, failures included. A cache must not
/// outlive the call that created it, so profiles are always refetched on the
/// next feed load.
#[derive(Default)]
pub struct ProfileJoinCache {
    slots: Mutex<HashMap<String, Slot>>,
    fetches: AtomicUsize,
}

impl ProfileJoinCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get_or_fetch<F, Fut>(&self, user_id: &str, fetch: F) -> FeedResult<UserProfile>
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = FeedResult<UserProfile>>,
    {
        let slot = self.claim(user_id);
        let outcome = slot
            .get_or_init(|| async move {
                self.fetches.fetch_add(1, Ordering::Relaxed);
                fetch(user_id.to_string()).await
            })
            .await
            .clone();
        outcome
    }

    /// Number of times a fetch function actually ran.
    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::Relaxed)
    }

    /// Number of distinct user ids seen so far.
    pub fn len(&self) -> usize {
        self.lock_slots().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn claim(&self, user_id: &str) -> Slot {
        let mut slots = self.lock_slots();
        Arc::clone(slots.entry(user_id.to_string()).or_default())
    }

    fn lock_slots(&self) -> std::sync::MutexGuard<'_, HashMap<String, Slot>> {
        // the map holds no invariant a panicking holder could break
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
