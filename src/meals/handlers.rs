use std::convert::Infallible;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::sse::{Event, Sse},
    routing::{delete, get},
    Json, Router,
};
use tokio_stream::Stream;
use tracing::instrument;
use uuid::Uuid;

use super::{
    dto::{AddMealRequest, DateRange},
    repo_types::MealPlan,
    services,
};
use crate::{
    auth::extractors::CurrentProfile,
    error::AppResult,
    sse::change_events,
    state::AppState,
};

pub fn meal_plan_routes() -> Router<AppState> {
    Router::new()
        .route("/meal-plans", get(get_meal_plans).post(add_meal))
        .route("/meal-plans/changes", get(meal_plan_changes))
        .route("/meal-plans/:id", delete(delete_meal))
}

#[instrument(skip(state))]
pub async fn get_meal_plans(
    State(state): State<AppState>,
    CurrentProfile(owner): CurrentProfile,
    Query(range): Query<DateRange>,
) -> AppResult<Json<Vec<MealPlan>>> {
    let plans = services::get_meal_plans(&state.gateway, owner, range.start, range.end).await?;
    Ok(Json(plans))
}

/// Creates the (date, meal type) entry or replaces the one already planned.
#[instrument(skip(state, body))]
pub async fn add_meal(
    State(state): State<AppState>,
    CurrentProfile(owner): CurrentProfile,
    Json(body): Json<AddMealRequest>,
) -> AppResult<Json<MealPlan>> {
    let plan = services::add_meal(
        &state.gateway,
        owner,
        body.date,
        body.meal_type,
        &body.note,
        body.recipe_id,
    )
    .await?;
    Ok(Json(plan))
}

#[instrument(skip(state))]
pub async fn delete_meal(State(state): State<AppState>, Path(id): Path<Uuid>) -> AppResult<StatusCode> {
    services::delete_meal(&state.gateway, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn meal_plan_changes(
    State(state): State<AppState>,
    CurrentProfile(owner): CurrentProfile,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    change_events(services::subscribe_meal_plans(&state.gateway, owner))
}
