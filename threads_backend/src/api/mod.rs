mod threads;
mod users;

use crate::config::ThreadsConfig;
use crate::database::Database;
use crate::error::FeedError;
use crate::profiles::ProfileService;
use crate::session::Session;
use crate::threading::ThreadService;
use crate::utils::USER_ID_HEADER;
use anyhow::Result;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub config: ThreadsConfig,
    pub service: ThreadService,
    pub profiles: ProfileService,
}

impl AppState {
    pub fn new(config: ThreadsConfig, database: Database) -> Self {
        let database = Arc::new(database);
        let service = ThreadService::new(database.clone(), database.clone())
            .with_hydration_concurrency(config.feed.hydration_concurrency);
        let profiles = ProfileService::new(database);
        Self {
            config,
            service,
            profiles,
        }
    }
}

pub(crate) type ApiResult<T> = Result<Json<T>, ApiError>;

#[derive(Debug)]
pub enum ApiError {
    Unauthorized,
    BadRequest(String),
    NotFound(String),
    BadGateway(String),
    Internal(anyhow::Error),
}

impl ApiError {
    fn into_response_parts(self) -> (StatusCode, ErrorResponse) {
        match self {
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                ErrorResponse {
                    message: format!("missing or unknown {USER_ID_HEADER} header"),
                },
            ),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, ErrorResponse { message: msg }),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, ErrorResponse { message: msg }),
            ApiError::BadGateway(msg) => {
                tracing::warn!(error = %msg, "storage read failed");
                (
                    StatusCode::BAD_GATEWAY,
                    ErrorResponse {
                        message: "storage temporarily unavailable".into(),
                    },
                )
            }
            ApiError::Internal(err) => {
                tracing::error!(error = ?err, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse {
                        message: "internal server error".into(),
                    },
                )
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = self.into_response_parts();
        (status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Internal(err)
    }
}

impl From<FeedError> for ApiError {
    fn from(err: FeedError) -> Self {
        match err {
            FeedError::Unauthenticated => ApiError::Unauthorized,
            FeedError::NotFound(what) => ApiError::NotFound(format!("{what} not found")),
            FeedError::InvalidInput(msg) => ApiError::BadRequest(msg),
            FeedError::TransientFetchFailure(msg) => ApiError::BadGateway(msg),
            err @ FeedError::WriteFailed(_) => ApiError::Internal(err.into()),
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    message: String,
}

/// Builds the caller's session from the user id header. A missing or blank
/// header gives an anonymous session.
pub(crate) fn session_from_headers(headers: &HeaderMap) -> Session {
    let user_id = headers
        .get(USER_ID_HEADER)
        .and_then(|value| value.to_str().ok());
    Session::from_user_id(user_id)
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(threads::health_handler))
        .route(
            "/threads",
            get(threads::list_threads).post(threads::create_thread),
        )
        .route("/threads/:id/like", post(threads::like_thread))
        .route(
            "/users/me",
            get(users::verify_session_handler).put(users::update_profile_handler),
        )
        .route("/users/me/threads", get(users::own_threads))
        .route("/users/suggestions", get(users::suggestions))
        .route("/users/search", get(users::search_users))
        .route("/users/username-available", get(users::username_available))
        .route("/users/:id", get(users::get_user))
        .route("/users/:id/follow", post(users::toggle_follow))
        .route("/users/:id/followers", get(users::followers))
        .route("/users/:id/following", get(users::following))
        .route("/users/:id/threads", get(users::threads_by_user))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Tries to bind to the given port, or finds the next available port
async fn find_available_port(start_port: u16) -> Result<(TcpListener, u16)> {
    const MAX_PORT_ATTEMPTS: u16 = 100;

    for offset in 0..MAX_PORT_ATTEMPTS {
        let Some(port) = start_port.checked_add(offset) else {
            break;
        };
        let addr = SocketAddr::from(([0, 0, 0, 0], port));

        match TcpListener::bind(addr).await {
            Ok(listener) => return Ok((listener, port)),
            Err(e) => {
                if offset == 0 {
                    tracing::debug!(port, error = %e, "port in use, trying next port");
                }
                continue;
            }
        }
    }

    anyhow::bail!(
        "could not find available port starting at {start_port} ({MAX_PORT_ATTEMPTS} attempts)"
    )
}

pub async fn serve_http(config: ThreadsConfig, database: Database) -> Result<()> {
    let state = AppState::new(config.clone(), database);
    let router = build_router(state);

    let (listener, actual_port) = find_available_port(config.api_port).await?;
    let addr = SocketAddr::from(([0, 0, 0, 0], actual_port));

    if actual_port != config.api_port {
        tracing::warn!(
            requested_port = config.api_port,
            actual_port = actual_port,
            "configured port was in use, bound to next available port"
        );
    }

    tracing::info!(
        ?addr,
        hydration_concurrency = config.feed.hydration_concurrency,
        "HTTP server listening"
    );
    axum::serve(listener, router.into_make_service()).await?;
    Ok(())
}
