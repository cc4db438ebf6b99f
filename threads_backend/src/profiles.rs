use crate::database::models::{ProfileUpdate, UserProfile};
use crate::error::{FeedError, FeedResult};
use crate::session::Session;
use crate::storage::UserProfileStorage;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Use cases over user profiles and the follow graph, run as the session's
/// user.
#[derive(Clone)]
pub struct ProfileService {
    profiles: Arc<dyn UserProfileStorage>,
}

/// Which side of the follow graph to list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connections {
    Followers,
    Following,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateProfileInput {
    pub display_name: String,
    pub username: String,
    #[serde(default)]
    pub bio: Option<String>,
}

impl ProfileService {
    pub fn new(profiles: Arc<dyn UserProfileStorage>) -> Self {
        Self { profiles }
    }

    /// Confirms the session maps to an existing profile. A session whose
    /// profile is gone is treated as signed out.
    pub async fn verify_session(&self, session: &Session) -> FeedResult<UserProfile> {
        let user_id = session.require_user_id()?;
        match self.profiles.fetch_by_id(user_id).await {
            Ok(profile) => Ok(profile),
            Err(FeedError::NotFound(_)) => {
                tracing::info!(user_id, "session refers to a missing profile");
                Err(FeedError::Unauthenticated)
            }
            Err(err) => Err(err),
        }
    }

    pub async fn fetch_user(&self, session: &Session, user_id: &str) -> FeedResult<UserProfile> {
        session.require_user_id()?;
        self.profiles.fetch_by_id(user_id).await
    }

    /// People the session's user neither follows nor is followed by.
    pub async fn fetch_suggestions(&self, session: &Session) -> FeedResult<Vec<UserProfile>> {
        let user_id = session.require_user_id()?;
        self.profiles.suggestions(user_id).await
    }

    /// Rewrites the session user's display name, username and bio.
    pub async fn update_profile(
        &self,
        session: &Session,
        input: UpdateProfileInput,
    ) -> FeedResult<UserProfile> {
        let user_id = session.require_user_id()?;
        let update = ProfileUpdate {
            display_name: required(&input.display_name, "display name")?,
            username: required(&input.username, "username")?,
            bio: input
                .bio
                .map(|bio| bio.trim().to_string())
                .filter(|bio| !bio.is_empty()),
        };

        let current = self.profiles.fetch_by_id(user_id).await?;
        if current.username != update.username
            && !self.profiles.is_username_available(&update.username).await?
        {
            return Err(FeedError::InvalidInput(format!(
                "username {} is already taken",
                update.username
            )));
        }

        let profile = self.profiles.update_profile(user_id, &update).await?;
        tracing::info!(user_id, username = %profile.username, "profile updated");
        Ok(profile)
    }

    pub async fn check_username_availability(
        &self,
        session: &Session,
        username: &str,
    ) -> FeedResult<bool> {
        session.require_user_id()?;
        let username = required(username, "username")?;
        self.profiles.is_username_available(&username).await
    }

    /// Profiles whose username or display name starts with `term`. A blank
    /// term matches nobody.
    pub async fn search_users(
        &self,
        session: &Session,
        term: &str,
    ) -> FeedResult<Vec<UserProfile>> {
        session.require_user_id()?;
        let term = term.trim();
        if term.is_empty() {
            return Ok(Vec::new());
        }
        self.profiles.search(term).await
    }

    /// Follows `target_id` as the session's user, or unfollows if already
    /// following. Returns whether the user follows the target afterwards.
    pub async fn toggle_follow(&self, session: &Session, target_id: &str) -> FeedResult<bool> {
        let user_id = session.require_user_id()?;
        if user_id == target_id {
            return Err(FeedError::InvalidInput(
                "users cannot follow themselves".into(),
            ));
        }
        let following = self.profiles.toggle_follow(user_id, target_id).await?;
        tracing::info!(user_id, target_id, following, "follow toggled");
        Ok(following)
    }

    /// Resolves one side of a user's follow graph to profiles. Ids without a
    /// profile are left out.
    pub async fn fetch_connections(
        &self,
        session: &Session,
        user_id: &str,
        side: Connections,
    ) -> FeedResult<Vec<UserProfile>> {
        session.require_user_id()?;
        let profile = self.profiles.fetch_by_id(user_id).await?;
        let ids: Vec<String> = match side {
            Connections::Followers => profile.followers.into_iter().collect(),
            Connections::Following => profile.following.into_iter().collect(),
        };
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.profiles.fetch_by_id_list(&ids).await
    }
}

fn required(value: &str, field: &str) -> FeedResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(FeedError::InvalidInput(format!("{field} may not be empty")));
    }
    Ok(trimmed.to_string())
}
