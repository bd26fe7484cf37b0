use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use time::OffsetDateTime;
use tracing::{info, instrument, warn};

use super::dto::{DateRange, DinnerEntry, LogDinnerRequest};
use super::repo;
use crate::{
    auth::jwt::AuthUser,
    error::{ApiError, ApiResult},
    meals,
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new().route("/account/dinners", get(list_dinners).post(log_dinner))
}

/// Logs a dinner for today against the meal with the given name.
#[instrument(skip(state))]
pub async fn log_dinner(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<LogDinnerRequest>,
) -> ApiResult<(StatusCode, Json<DinnerEntry>)> {
    let name = payload.name.trim();
    if name.is_empty() {
        return Err(ApiError::bad_request("Name of meal is required"));
    }

    let Some(meal) = meals::repo::find_by_name(&state.db, name).await?.into_iter().next() else {
        warn!(%user_id, name, "dinner for unknown meal");
        return Err(ApiError::not_found("No meal found with such name!"));
    };

    let today = OffsetDateTime::now_utc().date();
    let dinner = repo::insert(&state.db, user_id, meal.id, today).await?;
    info!(%user_id, meal_id = %meal.id, date = %today, "dinner logged");
    Ok((StatusCode::CREATED, Json(dinner)))
}

#[instrument(skip(state))]
pub async fn list_dinners(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(range): Query<DateRange>,
) -> ApiResult<Json<Vec<DinnerEntry>>> {
    let dinners = repo::list_in_range(&state.db, user_id, range).await?;
    Ok(Json(dinners))
}
