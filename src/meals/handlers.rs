use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    routing::{get, post},
    Json, Router,
};
use tracing::{instrument, warn};
use uuid::Uuid;

use super::dto::{MealAuthor, MealDetails, MealSummary, RecentQuery, SearchQuery};
use super::{repo, services};
use crate::{
    auth::jwt::AuthUser,
    error::{ApiError, ApiResult},
    state::AppState,
    storage::meal_preview_key,
};

const PREVIEW_URL_TTL_SECS: u64 = 30 * 60;
const MAX_RECENT: i64 = 100;

// --- public routers ---

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/meals", get(list_meals))
        .route("/meals/recent", get(recent_meals))
        .route("/meals/search", get(search_meals))
        .route("/meals/:id", get(get_meal))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/meals", post(create_meal))
        .route("/meals/:id", axum::routing::patch(update_meal))
        .layer(DefaultBodyLimit::max(20 * 1024 * 1024)) // 20MB
}

// --- handlers ---

#[instrument(skip(state))]
pub async fn list_meals(State(state): State<AppState>) -> ApiResult<Json<Vec<MealSummary>>> {
    let meals = repo::list_all(&state.db).await?;
    Ok(Json(meals.into_iter().map(MealSummary::from).collect()))
}

#[instrument(skip(state))]
pub async fn recent_meals(
    State(state): State<AppState>,
    Query(q): Query<RecentQuery>,
) -> ApiResult<Json<Vec<MealSummary>>> {
    if !(1..=MAX_RECENT).contains(&q.limit) {
        return Err(ApiError::bad_request(format!(
            "limit must be between 1 and {MAX_RECENT}"
        )));
    }
    let meals = repo::list_recent(&state.db, q.limit).await?;
    Ok(Json(meals.into_iter().map(MealSummary::from).collect()))
}

#[instrument(skip(state))]
pub async fn search_meals(
    State(state): State<AppState>,
    Query(q): Query<SearchQuery>,
) -> ApiResult<Json<Vec<MealSummary>>> {
    let name = q.name.trim();
    if name.is_empty() {
        return Err(ApiError::bad_request("name is required"));
    }
    let meals = repo::find_by_name(&state.db, name).await?;
    Ok(Json(meals.into_iter().map(MealSummary::from).collect()))
}

#[instrument(skip(state))]
pub async fn get_meal(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<MealDetails>> {
    let Some(row) = repo::get_with_author(&state.db, id).await? else {
        warn!(%id, "meal not found");
        return Err(ApiError::not_found("Meal not found"));
    };
    let preview_url = state
        .storage
        .presign_get(&meal_preview_key(id), PREVIEW_URL_TTL_SECS)
        .await?;

    Ok(Json(MealDetails {
        author: MealAuthor {
            id: row.meal.author_id,
            username: row.author_username,
        },
        meal: row.meal.into(),
        preview_url,
    }))
}

fn location(meal_id: Uuid) -> HeaderMap {
    let mut headers = HeaderMap::new();
    if let Ok(v) = HeaderValue::from_str(&format!("/api/v1/meals/{}", meal_id)) {
        headers.insert(header::LOCATION, v);
    }
    headers
}

/// POST /meals (multipart): name, calories, proteins, fats, carbohydrates, about, preview
#[instrument(skip(state, mp))]
pub async fn create_meal(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    mp: Multipart,
) -> ApiResult<(StatusCode, HeaderMap, Json<MealSummary>)> {
    let (new, preview) = services::read_meal_form(mp).await?.into_new()?;
    let meal = services::create_meal(&state, user_id, new, preview).await?;
    Ok((StatusCode::CREATED, location(meal.id), Json(meal.into())))
}

/// PATCH /meals/:id (multipart): any subset of the create fields plus a new preview
#[instrument(skip(state, mp))]
pub async fn update_meal(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    mp: Multipart,
) -> ApiResult<Json<MealSummary>> {
    let (patch, preview) = services::read_meal_form(mp).await?.into_patch()?;
    let meal = services::update_meal(&state, user_id, id, patch, preview).await?;
    Ok(Json(meal.into()))
}
