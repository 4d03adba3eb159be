//! Account routes: registration, session login/logout and profile.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tower_sessions::Session;
use tracing::{info, instrument};

use bazaar_core::Email;

use crate::db::UserRepository;
use crate::error::{AppError, Result, clear_sentry_user, set_sentry_user};
use crate::middleware::{RequireAuth, auth_rate_limiter, clear_current_user, set_current_user};
use crate::models::{CurrentUser, User};
use crate::services::AuthService;
use crate::services::auth::Registration;
use crate::state::AppState;

/// Build the account router (mounted under `/accounts`).
///
/// Login and registration share a per-IP rate limit.
pub fn router() -> Router<AppState> {
    let limited = Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .layer(auth_rate_limiter());

    Router::new()
        .route("/logout", post(logout))
        .route("/profile", get(profile).put(update_profile))
        .merge(limited)
}

/// Profile alias kept for older clients (mounted under `/api/auth`).
pub fn profile_alias_router() -> Router<AppState> {
    Router::new().route("/profile", get(profile).put(update_profile))
}

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub message: &'static str,
    pub user: User,
}

#[instrument(skip_all, fields(username = %body.username))]
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<User>)> {
    let user = AuthService::new(state.pool())
        .register(&Registration {
            username: &body.username,
            email: body.email.as_deref().filter(|e| !e.trim().is_empty()),
            password: &body.password,
            first_name: &body.first_name,
            last_name: &body.last_name,
        })
        .await?;

    info!(user_id = %user.id, "User registered");
    Ok((StatusCode::CREATED, Json(user)))
}

/// Check credentials and start an authenticated session.
///
/// The session id is rotated; the cart token carries over so the visitor's
/// cart is claimed on the next cart request.
#[instrument(skip_all, fields(username = %body.username))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<LoginRequest>,
) -> Result<Json<SessionResponse>> {
    let user = AuthService::new(state.pool())
        .login(&body.username, &body.password)
        .await?;

    set_current_user(&session, &CurrentUser::from(&user)).await?;
    set_sentry_user(&user.id, &user.username);
    info!(user_id = %user.id, "User logged in");

    Ok(Json(SessionResponse {
        message: "Login successful",
        user,
    }))
}

#[instrument(skip_all)]
pub async fn logout(session: Session) -> Result<Json<Value>> {
    clear_current_user(&session).await?;
    clear_sentry_user();
    Ok(Json(json!({ "message": "Logged out" })))
}

#[instrument(skip_all, fields(user_id = %current.id))]
pub async fn profile(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
) -> Result<Json<User>> {
    let user = AuthService::new(state.pool()).get_user(current.id).await?;
    Ok(Json(user))
}

/// Editable profile fields; omitted fields keep their value and an empty
/// email clears it.
#[derive(Debug, Default, Deserialize)]
pub struct ProfileUpdate {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl ProfileUpdate {
    fn apply_email(&self, current: Option<Email>) -> Result<Option<Email>> {
        match self.email.as_deref().map(str::trim) {
            None => Ok(current),
            Some("") => Ok(None),
            Some(raw) => Email::parse(raw)
                .map(Some)
                .map_err(|_| AppError::BadRequest("Invalid email address".to_owned())),
        }
    }
}

#[instrument(skip_all, fields(user_id = %current.id))]
pub async fn update_profile(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    Json(body): Json<ProfileUpdate>,
) -> Result<Json<User>> {
    let user = AuthService::new(state.pool()).get_user(current.id).await?;
    let email = body.apply_email(user.email.clone())?;
    let first_name = body.first_name.as_deref().unwrap_or(&user.first_name).trim();
    let last_name = body.last_name.as_deref().unwrap_or(&user.last_name).trim();

    let updated = UserRepository::new(state.pool())
        .update_profile(user.id, email.as_ref(), first_name, last_name)
        .await?;
    Ok(Json(updated))
}
