use axum::{
    extract::{DefaultBodyLimit, Path, Query, State},
    http::{header::CONTENT_TYPE, HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use bytes::Bytes;
use tracing::instrument;
use uuid::Uuid;

use super::{
    dto::{UploadQuery, UploadedImage},
    repo_types::{NewRecipe, Recipe, RecipeDetails, RecipeUpdate},
    services,
};
use crate::{
    auth::extractors::CurrentProfile,
    error::AppResult,
    images::{upload_recipe_image, UploadItem},
    state::AppState,
};

pub const MAX_IMAGE_BYTES: usize = 20 * 1024 * 1024; // 20MB

pub fn recipe_routes() -> Router<AppState> {
    Router::new()
        .route("/recipes", get(get_recipes).post(create_recipe))
        .route(
            "/recipes/:id",
            get(get_recipe).patch(update_recipe).delete(delete_recipe),
        )
}

pub fn upload_routes() -> Router<AppState> {
    Router::new()
        .route("/recipes/images", post(upload_image))
        .layer(DefaultBodyLimit::max(MAX_IMAGE_BYTES))
}

#[instrument(skip(state))]
pub async fn get_recipes(
    State(state): State<AppState>,
    CurrentProfile(owner): CurrentProfile,
) -> AppResult<Json<Vec<Recipe>>> {
    Ok(Json(services::get_recipes(&state.gateway, owner).await?))
}

#[instrument(skip(state))]
pub async fn get_recipe(State(state): State<AppState>, Path(id): Path<Uuid>) -> AppResult<Json<RecipeDetails>> {
    Ok(Json(services::get_recipe(&state.gateway, id).await?))
}

#[instrument(skip(state, body))]
pub async fn create_recipe(
    State(state): State<AppState>,
    CurrentProfile(owner): CurrentProfile,
    Json(body): Json<NewRecipe>,
) -> AppResult<(StatusCode, Json<Recipe>)> {
    let recipe = services::create_recipe(&state.gateway, owner, &body).await?;
    Ok((StatusCode::CREATED, Json(recipe)))
}

#[instrument(skip(state, update))]
pub async fn update_recipe(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(update): Json<RecipeUpdate>,
) -> AppResult<Json<Recipe>> {
    Ok(Json(services::update_recipe(&state.gateway, id, &update).await?))
}

#[instrument(skip(state))]
pub async fn delete_recipe(State(state): State<AppState>, Path(id): Path<Uuid>) -> AppResult<StatusCode> {
    services::delete_recipe(&state.gateway, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /recipes/images?file_name=<name>, raw image bytes as the body.
#[instrument(skip(state, headers, body))]
pub async fn upload_image(
    State(state): State<AppState>,
    Query(q): Query<UploadQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<(StatusCode, Json<UploadedImage>)> {
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream")
        .to_string();

    let url = upload_recipe_image(
        &state.gateway,
        UploadItem {
            file_name: q.file_name,
            body,
            content_type,
        },
    )
    .await?;
    Ok((StatusCode::CREATED, Json(UploadedImage { url })))
}
