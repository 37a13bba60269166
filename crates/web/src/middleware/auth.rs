//! Authentication extractors.
//!
//! The session holds only the user id. These extractors turn it back into a
//! full [`User`] from the database on every request that asks for one.

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use delicious_core::UserId;

use crate::db::RepositoryError;
use crate::db::users::UserRepository;
use crate::error::{AppError, clear_sentry_user, set_sentry_user};
use crate::models::flash::{Flash, FlashKind};
use crate::models::session;
use crate::models::user::User;
use crate::state::AppState;

/// Extractor that requires a logged-in user.
///
/// Page requests without one are sent to `/login` with a flash; `/api/`
/// requests get a bare 401.
///
/// # Example
///
/// ```rust,ignore
/// async fn hearts(RequireUser(user): RequireUser) -> impl IntoResponse {
///     format!("{} has {} hearts", user.name, user.hearts.len())
/// }
/// ```
pub struct RequireUser(pub User);

/// Extractor that loads the user if someone is logged in.
pub struct OptionalUser(pub Option<User>);

/// Why a [`RequireUser`] extraction failed.
#[derive(Debug)]
pub enum AuthRejection {
    /// Redirect to login page (for HTML requests).
    RedirectToLogin,
    /// Unauthorized response (for API requests).
    Unauthorized,
    /// Loading the user failed.
    Failed(RepositoryError),
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin => Redirect::to("/login").into_response(),
            Self::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
            Self::Failed(e) => AppError::Database(e).into_response(),
        }
    }
}

impl FromRequestParts<AppState> for RequireUser {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let is_api = parts.uri.path().starts_with("/api/");
        let session = parts.extensions.get::<Session>().cloned();

        let user = match &session {
            Some(session) => load_user(session, state).await.map_err(AuthRejection::Failed)?,
            None => None,
        };

        match (user, session) {
            (Some(user), _) => Ok(Self(user)),
            (None, _) if is_api => Err(AuthRejection::Unauthorized),
            (None, Some(session)) => {
                Flash::push(
                    &session,
                    FlashKind::Error,
                    "Oops! You must be logged in to do that!",
                )
                .await;
                Err(AuthRejection::RedirectToLogin)
            }
            (None, None) => Err(AuthRejection::RedirectToLogin),
        }
    }
}

impl FromRequestParts<AppState> for OptionalUser {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(session) = parts.extensions.get::<Session>() else {
            return Ok(Self(None));
        };

        load_user(session, state)
            .await
            .map(Self)
            .map_err(AuthRejection::Failed)
    }
}

/// Resolve the session's user id to a user.
///
/// An id pointing at a deleted account is dropped from the session.
async fn load_user(session: &Session, state: &AppState) -> Result<Option<User>, RepositoryError> {
    let Some(user_id) = session.get::<UserId>(session::USER_ID).await.ok().flatten() else {
        return Ok(None);
    };

    let user = UserRepository::new(state.pool()).get_by_id(user_id).await?;
    if user.is_none() {
        tracing::debug!(user_id = %user_id, "Session refers to a missing user");
        if let Err(e) = session.remove::<UserId>(session::USER_ID).await {
            tracing::warn!(error = %e, "Failed to clear stale session user");
        }
    }

    Ok(user)
}

/// Record `user` as logged in, rotating the session id.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn log_in(session: &Session, user: &User) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session::USER_ID, user.id).await?;
    set_sentry_user(&user.id, Some(user.email.as_str()));
    Ok(())
}

/// Forget the logged-in user.
///
/// Pending flash messages are cleared along with everything else.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn log_out(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await?;
    clear_sentry_user();
    Ok(())
}
