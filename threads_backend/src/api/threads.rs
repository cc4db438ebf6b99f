use super::{session_from_headers, ApiError, ApiResult, AppState};
use crate::hydration::{HydratedFeed, ThreadEntity};
use crate::threading::CreateThreadInput;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
pub(crate) struct HealthResponse {
    status: &'static str,
    version: &'static str,
    api_port: u16,
    hydration_concurrency: usize,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CreateThreadRequest {
    caption: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct LikeResponse {
    applied: bool,
}

pub(crate) async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        api_port: state.config.api_port,
        hydration_concurrency: state.config.feed.hydration_concurrency,
    })
}

pub(crate) async fn list_threads(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<HydratedFeed> {
    let session = session_from_headers(&headers);
    let feed = state.service.fetch_threads(&session).await?;
    Ok(Json(feed))
}

pub(crate) async fn create_thread(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CreateThreadRequest>,
) -> Result<(StatusCode, Json<ThreadEntity>), ApiError> {
    let session = session_from_headers(&headers);
    let entity = state
        .service
        .create_thread(&session, CreateThreadInput::new(request.caption))
        .await?;
    Ok((StatusCode::CREATED, Json(entity)))
}

pub(crate) async fn like_thread(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(thread_id): Path<String>,
) -> ApiResult<LikeResponse> {
    let session = session_from_headers(&headers);
    let applied = state.service.like_thread(&session, &thread_id).await?;
    Ok(Json(LikeResponse { applied }))
}
