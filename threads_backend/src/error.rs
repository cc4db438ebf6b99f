use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type FeedResult<T> = Result<T, FeedError>;

/// Failure taxonomy shared by the storage traits, the hydrator, the mutation
/// service and the use cases.
///
/// Variants carry plain strings so the join cache can memoize a failed lookup
/// and hand out clones of it.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum FeedError {
    #[error("no authenticated user in session")]
    Unauthenticated,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("write failed: {0}")]
    WriteFailed(String),

    #[error("transient fetch failure: {0}")]
    TransientFetchFailure(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl FeedError {
    pub fn thread_not_found(thread_id: &str) -> Self {
        FeedError::NotFound(format!("thread {thread_id}"))
    }

    pub fn user_not_found(user_id: &str) -> Self {
        FeedError::NotFound(format!("user {user_id}"))
    }

    /// Logs the storage error chain. The returned error carries only a
    /// generic message.
    pub(crate) fn read(err: anyhow::Error) -> Self {
        tracing::warn!(error = %format!("{err:#}"), "storage read failed");
        FeedError::TransientFetchFailure("storage read failed".into())
    }

    pub(crate) fn write(err: anyhow::Error) -> Self {
        tracing::error!(error = %format!("{err:#}"), "storage write failed");
        FeedError::WriteFailed("storage write failed".into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_errors_do_not_leak_driver_text() {
        let cause = anyhow::anyhow!("UNIQUE constraint failed: threads.id")
            .context("inserting thread t1");

        let read = FeedError::read(anyhow::anyhow!("disk I/O error at /var/lib/threads.db"));
        assert_eq!(
            read,
            FeedError::TransientFetchFailure("storage read failed".into())
        );

        let write = FeedError::write(cause);
        assert!(!write.to_string().contains("UNIQUE"));
        assert_eq!(write, FeedError::WriteFailed("storage write failed".into()));
    }
}
