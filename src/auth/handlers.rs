use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument};

use crate::{
    auth::{
        dto::CredentialsRequest,
        extractors::CurrentProfile,
        repo_types::{Profile, ProfileUpdate},
        services::{self, DeletionReport},
    },
    error::{AppError, AppResult},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/signup", post(signup))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me).patch(update_me).delete(delete_me))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<CredentialsRequest>,
) -> AppResult<Json<Profile>> {
    let profile = services::authenticate(&state.gateway, &payload.name, &payload.user_id).await?;
    Ok(Json(profile))
}

#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<CredentialsRequest>,
) -> AppResult<(StatusCode, Json<Profile>)> {
    let profile = services::create_user(&state.gateway, &payload.name, &payload.user_id).await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    CurrentProfile(profile_id): CurrentProfile,
) -> AppResult<Json<Profile>> {
    services::get_user_profile(&state.gateway, profile_id)
        .await
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Profile not found".into()))
}

#[instrument(skip(state, update))]
pub async fn update_me(
    State(state): State<AppState>,
    CurrentProfile(profile_id): CurrentProfile,
    Json(update): Json<ProfileUpdate>,
) -> AppResult<Json<Profile>> {
    let profile = services::update_profile(&state.gateway, profile_id, &update).await?;
    Ok(Json(profile))
}

#[instrument(skip(state))]
pub async fn delete_me(
    State(state): State<AppState>,
    CurrentProfile(profile_id): CurrentProfile,
) -> AppResult<Json<DeletionReport>> {
    let report = services::delete_account(&state.gateway, profile_id).await?;
    info!(%profile_id, steps = report.completed.len(), "account deleted over http");
    Ok(Json(report))
}
