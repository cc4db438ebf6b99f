use super::{session_from_headers, ApiResult, AppState};
use crate::database::models::UserProfile;
use crate::hydration::HydratedFeed;
use crate::profiles::{Connections, UpdateProfileInput};
use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub(crate) struct SearchQuery {
    #[serde(default)]
    q: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UsernameQuery {
    username: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct UsernameAvailability {
    username: String,
    available: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct FollowResponse {
    following: bool,
}

pub(crate) async fn verify_session_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<UserProfile> {
    let session = session_from_headers(&headers);
    let profile = state.profiles.verify_session(&session).await?;
    Ok(Json(profile))
}

pub(crate) async fn update_profile_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<UpdateProfileInput>,
) -> ApiResult<UserProfile> {
    let session = session_from_headers(&headers);
    let profile = state.profiles.update_profile(&session, input).await?;
    Ok(Json(profile))
}

pub(crate) async fn get_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(user_id): Path<String>,
) -> ApiResult<UserProfile> {
    let session = session_from_headers(&headers);
    let profile = state.profiles.fetch_user(&session, &user_id).await?;
    Ok(Json(profile))
}

pub(crate) async fn own_threads(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<HydratedFeed> {
    let session = session_from_headers(&headers);
    let feed = state.service.fetch_own_threads(&session).await?;
    Ok(Json(feed))
}

pub(crate) async fn threads_by_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(user_id): Path<String>,
) -> ApiResult<HydratedFeed> {
    let session = session_from_headers(&headers);
    let feed = state
        .service
        .fetch_threads_by_user(&session, &user_id)
        .await?;
    Ok(Json(feed))
}

pub(crate) async fn suggestions(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Vec<UserProfile>> {
    let session = session_from_headers(&headers);
    let profiles = state.profiles.fetch_suggestions(&session).await?;
    Ok(Json(profiles))
}

pub(crate) async fn search_users(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Vec<UserProfile>> {
    let session = session_from_headers(&headers);
    let profiles = state.profiles.search_users(&session, &query.q).await?;
    Ok(Json(profiles))
}

pub(crate) async fn username_available(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<UsernameQuery>,
) -> ApiResult<UsernameAvailability> {
    let session = session_from_headers(&headers);
    let available = state
        .profiles
        .check_username_availability(&session, &query.username)
        .await?;
    Ok(Json(UsernameAvailability {
        username: query.username.trim().to_string(),
        available,
    }))
}

pub(crate) async fn toggle_follow(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(user_id): Path<String>,
) -> ApiResult<FollowResponse> {
    let session = session_from_headers(&headers);
    let following = state.profiles.toggle_follow(&session, &user_id).await?;
    Ok(Json(FollowResponse { following }))
}

pub(crate) async fn followers(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(user_id): Path<String>,
) -> ApiResult<Vec<UserProfile>> {
    let session = session_from_headers(&headers);
    let profiles = state
        .profiles
        .fetch_connections(&session, &user_id, Connections::Followers)
        .await?;
    Ok(Json(profiles))
}

pub(crate) async fn following(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(user_id): Path<String>,
) -> ApiResult<Vec<UserProfile>> {
    let session = session_from_headers(&headers);
    let profiles = state
        .profiles
        .fetch_connections(&session, &user_id, Connections::Following)
        .await?;
    Ok(Json(profiles))
}
