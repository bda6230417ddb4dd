//! Authentication route handlers for admin.
//!
//! Email and password login backed by a server-side session.

use axum::{Json, Router, extract::State, routing::{get, post}};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use crate::{
    api::{ApiResponse, ApiResult},
    error::{ApiJson, AppError},
    middleware::{OptionalUser, clear_current_user, set_current_user},
    models::CurrentUser,
    services::{AuthError, AuthService},
    state::AppState,
};

const BAD_CREDENTIALS: &str = "Invalid email or password";

/// Build the auth router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/session", get(current_session))
}

/// Login request body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Who is logged in, if anyone.
#[derive(Debug, Serialize)]
pub struct SessionInfo {
    pub user: Option<CurrentUser>,
}

fn session_error(e: &tower_sessions::session::Error) -> AppError {
    AppError::Internal(format!("session error: {e}"))
}

/// Check credentials and start a session.
///
/// POST /api/auth/login
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    ApiJson(request): ApiJson<LoginRequest>,
) -> ApiResult<CurrentUser> {
    let user = AuthService::new(state.pool())
        .login(&request.email, &request.password)
        .await
        .map_err(|e| match e {
            AuthError::Repository(e) => AppError::Database(e),
            other => {
                tracing::info!(error = %other, "Login rejected");
                AppError::Unauthorized(BAD_CREDENTIALS.to_string())
            }
        })?;

    let current = CurrentUser::from(&user);
    set_current_user(&session, &current)
        .await
        .map_err(|e| session_error(&e))?;

    tracing::info!(user_id = %current.id, role = %current.role, "User logged in");
    Ok(Json(ApiResponse::ok(current).with_message("Logged in")))
}

/// End the session.
///
/// POST /api/auth/logout
#[instrument(skip_all)]
pub async fn logout(
    OptionalUser(user): OptionalUser,
    session: Session,
) -> ApiResult<()> {
    clear_current_user(&session)
        .await
        .map_err(|e| session_error(&e))?;

    if let Some(user) = user {
        tracing::info!(user_id = %user.id, "User logged out");
    }
    Ok(Json(ApiResponse::message("Logged out")))
}

/// The current session's user.
///
/// GET /api/auth/session
#[instrument(skip_all)]
pub async fn current_session(OptionalUser(user): OptionalUser) -> ApiResult<SessionInfo> {
    Ok(Json(ApiResponse::ok(SessionInfo { user })))
}
