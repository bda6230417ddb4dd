//! Authentication extractors for admin API handlers.
//!
//! Handlers opt into the gate by taking [`RequireAdmin`] as an argument.

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;

use crate::error::{AppError, clear_sentry_user, set_sentry_user};
use crate::models::{CurrentUser, session_keys};

const NOT_LOGGED_IN: &str = "Authentication required";
const NOT_ADMIN: &str = "Admin access required";

/// Extractor that requires a logged-in user with the admin role.
///
/// No session user gives 401. A user without the admin role gives 403.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAdmin(user): RequireAdmin,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", user.name)
/// }
/// ```
pub struct RequireAdmin(pub CurrentUser);

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Ok(OptionalUser(user)) = OptionalUser::from_request_parts(parts, state).await;
        let user = user.ok_or_else(|| AppError::Unauthorized(NOT_LOGGED_IN.to_string()))?;

        if !user.is_admin() {
            tracing::warn!(user_id = %user.id, role = ?user.role, "Non-admin user rejected");
            return Err(AppError::Forbidden(NOT_ADMIN.to_string()));
        }

        Ok(Self(user))
    }
}

/// Extractor that optionally gets the current user.
///
/// Unlike `RequireAdmin`, this does not reject the request when nobody is
/// logged in.
pub struct OptionalUser(pub Option<CurrentUser>);

impl<S> FromRequestParts<S> for OptionalUser
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = match parts.extensions.get::<Session>() {
            Some(session) => session
                .get::<CurrentUser>(session_keys::CURRENT_USER)
                .await
                .ok()
                .flatten(),
            None => None,
        };

        if let Some(user) = &user {
            set_sentry_user(user.id.as_i32(), Some(user.email.as_str()));
        }

        Ok(Self(user))
    }
}

/// Store the logged-in user in the session.
///
/// The session id is cycled first so a pre-login id cannot be reused.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::CURRENT_USER, user).await?;
    set_sentry_user(user.id.as_i32(), Some(user.email.as_str()));
    Ok(())
}

/// Remove the user from the session and drop the session record (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session
        .remove::<CurrentUser>(session_keys::CURRENT_USER)
        .await?;
    session.flush().await?;
    clear_sentry_user();
    Ok(())
}
