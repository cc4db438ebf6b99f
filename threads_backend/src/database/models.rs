use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadRecord {
    pub thread_id: String,
    pub owner_id: String,
    pub caption: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub liked_by: BTreeSet<String>,
    #[serde(default)]
    pub like_count: u64,
}

impl ThreadRecord {
    /// A freshly posted thread: nobody has liked it yet.
    pub fn new(
        thread_id: String,
        owner_id: String,
        caption: String,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            thread_id,
            owner_id,
            caption,
            created_at,
            liked_by: BTreeSet::new(),
            like_count: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: String,
    pub display_name: String,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub followers: BTreeSet<String>,
    #[serde(default)]
    pub following: BTreeSet<String>,
}

impl UserProfile {
    pub fn new(
        user_id: impl Into<String>,
        username: impl Into<String>,
        display_name: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            display_name: display_name.into(),
            username: username.into(),
            email: None,
            bio: None,
            avatar_url: None,
            followers: BTreeSet::new(),
            following: BTreeSet::new(),
        }
    }
}

/// Editable text fields of a profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub display_name: String,
    pub username: String,
    #[serde(default)]
    pub bio: Option<String>,
}
