use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::repo;
use crate::{
    auth::jwt::AuthUser,
    error::{ApiError, ApiResult},
    meals::{self, dto::MealSummary},
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/meals/:id/subscribe", post(subscribe))
        .route("/account/subscriptions", get(list_subscriptions))
}

#[instrument(skip(state))]
pub async fn subscribe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(meal_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    if !meals::repo::exists(&state.db, meal_id).await? {
        return Err(ApiError::not_found("Meal not found"));
    }
    let created = repo::subscribe(&state.db, user_id, meal_id).await?;
    info!(%user_id, %meal_id, created, "subscribed");
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn list_subscriptions(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<Json<Vec<MealSummary>>> {
    let meals = repo::list_meals_for_user(&state.db, user_id).await?;
    Ok(Json(meals.into_iter().map(MealSummary::from).collect()))
}
