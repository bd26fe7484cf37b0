use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        dto::{AuthResponse, JwtKeys, LoginRequest, PublicUser, RefreshRequest, RegisterRequest},
        jwt::AuthUser,
        password::{hash_password, is_valid_email, verify_password, MIN_PASSWORD_LEN},
        repo::is_unique_violation,
        repo_types::User,
    },
    error::{ApiError, ApiResult},
    meals::dto::MealSummary,
    state::AppState,
    subscriptions,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/logout", post(logout))
}

pub fn account_routes() -> Router<AppState> {
    Router::new().route("/account", get(get_account))
}

#[derive(Debug, serde::Serialize)]
pub struct AccountResponse {
    pub user: PublicUser,
    pub subscriptions: Vec<MealSummary>,
}

/// Normalizes the email and checks everything that needs no database.
pub(crate) fn validate_register(payload: &mut RegisterRequest) -> ApiResult<()> {
    payload.email = payload.email.trim().to_lowercase();
    payload.username = payload.username.trim().to_string();

    if payload.username.is_empty() {
        return Err(ApiError::bad_request("Username is required"));
    }
    if !is_valid_email(&payload.email) {
        return Err(ApiError::bad_request("Invalid email"));
    }
    if payload.password.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::bad_request("Password too short"));
    }
    if payload.password != payload.password_check {
        return Err(ApiError::bad_request("Passwords don't match"));
    }
    if matches!(payload.age, Some(age) if !(0..=150).contains(&age)) {
        return Err(ApiError::bad_request("Invalid age"));
    }
    Ok(())
}

fn issue(state: &AppState, user: User) -> ApiResult<AuthResponse> {
    let keys = JwtKeys::from_ref(state);
    let (access_token, refresh_token) = keys.sign_pair(user.id, user.token_version)?;
    Ok(AuthResponse {
        access_token,
        refresh_token,
        user: user.into(),
    })
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    if let Err(e) = validate_register(&mut payload) {
        warn!(email = %payload.email, reason = %e, "registration rejected");
        return Err(e);
    }

    if User::find_by_username(&state.db, &payload.username).await?.is_some() {
        warn!(username = %payload.username, "username already taken");
        return Err(ApiError::Conflict("This username is already taken".into()));
    }
    if User::find_by_email(&state.db, &payload.email).await?.is_some() {
        warn!(email = %payload.email, "email already registered");
        return Err(ApiError::Conflict("User with this email already exists".into()));
    }

    let hash = hash_password(&payload.password)?;

    let user = match User::create(
        &state.db,
        &payload.username,
        &payload.email,
        payload.age,
        &hash,
    )
    .await
    {
        Ok(u) => u,
        Err(e) if is_unique_violation(&e) => {
            warn!(email = %payload.email, "concurrent registration lost the race");
            return Err(ApiError::Conflict("User already exists".into()));
        }
        Err(e) => {
            error!(error = %e, "create user failed");
            return Err(e.into());
        }
    };

    info!(user_id = %user.id, username = %user.username, "user registered");
    Ok((StatusCode::CREATED, Json(issue(&state, user)?)))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    payload.email = payload.email.trim().to_lowercase();

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(ApiError::bad_request("Invalid email"));
    }

    let Some(user) = User::find_by_email(&state.db, &payload.email).await? else {
        warn!(email = %payload.email, "login unknown email");
        return Err(ApiError::Unauthorized("Invalid login or password".into()));
    };

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(ApiError::Unauthorized("Invalid login or password".into()));
    }

    info!(user_id = %user.id, "user logged in");
    Ok(Json(issue(&state, user)?))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys
        .verify_refresh(&payload.refresh_token)
        .map_err(|e| ApiError::Unauthorized(e.to_string()))?;

    let user = User::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("User not found".into()))?;

    if user.token_version != claims.ver {
        warn!(user_id = %user.id, "refresh token revoked by logout");
        return Err(ApiError::Unauthorized("Refresh token revoked".into()));
    }

    Ok(Json(issue(&state, user)?))
}

#[instrument(skip(state))]
pub async fn logout(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<StatusCode> {
    let version = User::bump_token_version(&state.db, user_id).await?;
    info!(%user_id, version, "user logged out");
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn get_account(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<Json<AccountResponse>> {
    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("User not found".into()))?;

    let meals = subscriptions::repo::list_meals_for_user(&state.db, user_id).await?;

    Ok(Json(AccountResponse {
        user: user.into(),
        subscriptions: meals.into_iter().map(MealSummary::from).collect(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> RegisterRequest {
        RegisterRequest {
            username: "  chef ".into(),
            email: " Chef@Example.COM ".into(),
            age: Some(31),
            password: "long-enough".into(),
            password_check: "long-enough".into(),
        }
    }

    #[test]
    fn register_normalizes_identity_fields() {
        let mut req = request();
        validate_register(&mut req).unwrap();
        assert_eq!(req.email, "chef@example.com");
        assert_eq!(req.username, "chef");
    }

    #[test]
    fn register_rejects_password_mismatch() {
        let mut req = request();
        req.password_check = "something-else".into();
        let err = validate_register(&mut req).unwrap_err();
        assert_eq!(err.to_string(), "Passwords don't match");
    }

    #[test]
    fn register_rejects_short_password_and_bad_email() {
        let mut req = request();
        req.password = "short".into();
        req.password_check = "short".into();
        assert_eq!(validate_register(&mut req).unwrap_err().to_string(), "Password too short");

        let mut req = request();
        req.email = "nope".into();
        assert_eq!(validate_register(&mut req).unwrap_err().to_string(), "Invalid email");
    }

    #[test]
    fn register_rejects_blank_username_and_absurd_age() {
        let mut req = request();
        req.username = "   ".into();
        assert!(matches!(validate_register(&mut req), Err(ApiError::BadRequest(_))));

        let mut req = request();
        req.age = Some(-1);
        assert!(matches!(validate_register(&mut req), Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn public_user_serialization_has_no_hash() {
        let user = User {
            id: uuid::Uuid::new_v4(),
            username: "chef".into(),
            email: "test@example.com".into(),
            age: None,
            password_hash: "$argon2id$v=19$secret".into(),
            token_version: 0,
            created_at: time::OffsetDateTime::now_utc(),
        };
        let json = serde_json::to_string(&PublicUser::from(user)).unwrap();
        assert!(json.contains("test@example.com"));
        assert!(json.contains("registered_at"));
        assert!(!json.contains("argon2"));
    }
}
