use std::convert::Infallible;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::sse::{Event, Sse},
    routing::{get, patch, put},
    Json, Router,
};
use tokio_stream::Stream;
use tracing::instrument;
use uuid::Uuid;

use super::{
    dto::{AddItemRequest, BudgetRequest, CreateListRequest, TotalResponse},
    repo_types::{ItemPatch, ListSummary, ShoppingItem, ShoppingList},
    services,
};
use crate::{
    auth::extractors::CurrentProfile,
    error::AppResult,
    sse::change_events,
    state::AppState,
};

pub fn list_routes() -> Router<AppState> {
    Router::new()
        .route("/lists", get(get_lists).post(create_list))
        .route("/lists/summary", get(list_summaries))
        .route("/lists/:id", axum::routing::delete(delete_list))
        .route("/lists/:id/budget", put(update_budget))
        .route("/lists/:id/total", get(get_total))
        .route("/lists/:id/changes", get(list_changes))
}

pub fn item_routes() -> Router<AppState> {
    Router::new()
        .route("/lists/:id/items", get(get_items).post(add_item))
        .route("/items/:id", patch(update_item).delete(delete_item))
}

#[instrument(skip(state))]
pub async fn get_lists(
    State(state): State<AppState>,
    CurrentProfile(owner): CurrentProfile,
) -> AppResult<Json<Vec<ShoppingList>>> {
    Ok(Json(services::get_lists(&state.gateway, owner).await?))
}

#[instrument(skip(state, body))]
pub async fn create_list(
    State(state): State<AppState>,
    CurrentProfile(owner): CurrentProfile,
    Json(body): Json<CreateListRequest>,
) -> AppResult<(StatusCode, Json<ShoppingList>)> {
    let list = services::create_list(&state.gateway, owner, body.name.trim(), body.budget).await?;
    Ok((StatusCode::CREATED, Json(list)))
}

#[instrument(skip(state))]
pub async fn list_summaries(
    State(state): State<AppState>,
    CurrentProfile(owner): CurrentProfile,
) -> AppResult<Json<Vec<ListSummary>>> {
    Ok(Json(services::list_summaries(&state.gateway, owner).await?))
}

#[instrument(skip(state))]
pub async fn delete_list(State(state): State<AppState>, Path(id): Path<Uuid>) -> AppResult<StatusCode> {
    services::delete_list(&state.gateway, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn update_budget(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<BudgetRequest>,
) -> AppResult<Json<ShoppingList>> {
    Ok(Json(services::update_list_budget(&state.gateway, id, body.budget).await?))
}

#[instrument(skip(state))]
pub async fn get_total(State(state): State<AppState>, Path(id): Path<Uuid>) -> AppResult<Json<TotalResponse>> {
    let total_spent = services::get_total_spent(&state.gateway, id).await?;
    Ok(Json(TotalResponse {
        list_id: id,
        total_spent,
    }))
}

pub async fn list_changes(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    change_events(services::subscribe_to_list(&state.gateway, id))
}

#[instrument(skip(state))]
pub async fn get_items(State(state): State<AppState>, Path(id): Path<Uuid>) -> AppResult<Json<Vec<ShoppingItem>>> {
    Ok(Json(services::get_items(&state.gateway, id).await?))
}

#[instrument(skip(state, body))]
pub async fn add_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<AddItemRequest>,
) -> AppResult<(StatusCode, Json<ShoppingItem>)> {
    let item = services::add_item(&state.gateway, id, body.name.trim(), body.quantity.as_deref()).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

#[instrument(skip(state))]
pub async fn update_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(patch): Json<ItemPatch>,
) -> AppResult<Json<ShoppingItem>> {
    Ok(Json(services::update_item(&state.gateway, id, &patch).await?))
}

#[instrument(skip(state))]
pub async fn delete_item(State(state): State<AppState>, Path(id): Path<Uuid>) -> AppResult<StatusCode> {
    services::delete_item(&state.gateway, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
