use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use tracing::instrument;

use super::dto::CpfcReport;
use super::services;
use crate::{auth::jwt::AuthUser, dinners::dto::DateRange, error::ApiResult, state::AppState};

pub fn routes() -> Router<AppState> {
    Router::new().route("/account/cpfc", get(check_cpfc))
}

/// GET /account/cpfc?from=YYYY-MM-DD&to=YYYY-MM-DD
#[instrument(skip(state))]
pub async fn check_cpfc(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(range): Query<DateRange>,
) -> ApiResult<Json<CpfcReport>> {
    let report = services::build_report(&state, user_id, range).await?;
    Ok(Json(report))
}
