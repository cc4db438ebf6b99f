use crate::api;
use crate::config::ThreadsConfig;
use crate::database::models::UserProfile;
use crate::database::repositories::UserRepository;
use crate::database::Database;
use crate::profiles::ProfileService;
use crate::session::Session;
use crate::threading::{CreateThreadInput, ThreadService};
use anyhow::{Context, Result};
use clap::Subcommand;
use serde::Serialize;
use std::sync::Arc;

/// One-shot commands that act on the local database as a given user.
#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Print the global feed as seen by a user
    Feed {
        #[arg(long = "as", value_name = "USER_ID")]
        as_user: String,
    },
    /// Print one user's threads as seen by another
    UserFeed {
        #[arg(long = "as", value_name = "USER_ID")]
        as_user: String,
        owner_id: String,
    },
    /// Post a new thread
    Post {
        #[arg(long = "as", value_name = "USER_ID")]
        as_user: String,
        caption: String,
    },
    /// Like a thread, or unlike it if already liked
    Like {
        #[arg(long = "as", value_name = "USER_ID")]
        as_user: String,
        thread_id: String,
    },
    /// Create or update a user profile
    AddUser {
        user_id: String,
        username: String,
        display_name: String,
    },
    /// Follow a user, or unfollow if already following
    Follow {
        #[arg(long = "as", value_name = "USER_ID")]
        as_user: String,
        target_id: String,
    },
    /// Find users by username or display name prefix
    Search {
        #[arg(long = "as", value_name = "USER_ID")]
        as_user: String,
        term: String,
    },
}

/// Run the HTTP server mode.
pub async fn run_server(config: ThreadsConfig, database: Database) -> Result<()> {
    tracing::info!(port = config.api_port, "starting threads HTTP server");
    api::serve_http(config, database).await
}

pub async fn run_command(
    config: &ThreadsConfig,
    database: Database,
    command: CliCommand,
) -> Result<()> {
    let shared = Arc::new(database.clone());
    let service = ThreadService::new(shared.clone(), shared.clone())
        .with_hydration_concurrency(config.feed.hydration_concurrency);
    let profiles = ProfileService::new(shared);

    match command {
        CliCommand::Feed { as_user } => {
            let feed = service.fetch_threads(&Session::authenticated(as_user)).await?;
            print_json(&feed)
        }
        CliCommand::UserFeed { as_user, owner_id } => {
            let feed = service
                .fetch_threads_by_user(&Session::authenticated(as_user), &owner_id)
                .await?;
            print_json(&feed)
        }
        CliCommand::Post { as_user, caption } => {
            let entity = service
                .create_thread(
                    &Session::authenticated(as_user),
                    CreateThreadInput::new(caption),
                )
                .await?;
            print_json(&entity)
        }
        CliCommand::Like { as_user, thread_id } => {
            let applied = service
                .like_thread(&Session::authenticated(as_user), &thread_id)
                .await?;
            print_json(&serde_json::json!({ "thread_id": thread_id, "applied": applied }))
        }
        CliCommand::AddUser {
            user_id,
            username,
            display_name,
        } => {
            let profile = UserProfile::new(user_id, username, display_name);
            database
                .with_repositories(|repos| repos.users().upsert(&profile))
                .with_context(|| format!("failed to save user {}", profile.user_id))?;
            print_json(&profile)
        }
        CliCommand::Follow { as_user, target_id } => {
            let following = profiles
                .toggle_follow(&Session::authenticated(as_user), &target_id)
                .await?;
            print_json(&serde_json::json!({ "target_id": target_id, "following": following }))
        }
        CliCommand::Search { as_user, term } => {
            let found = profiles
                .search_users(&Session::authenticated(as_user), &term)
                .await?;
            print_json(&found)
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("failed to render output")?;
    println!("{rendered}");
    Ok(())
}
