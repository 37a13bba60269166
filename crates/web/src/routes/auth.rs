//! Login, registration and logout handlers.

use std::collections::HashMap;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use super::PageContext;
use crate::error::Result;
use crate::filters;
use crate::middleware::{OptionalUser, log_in, log_out};
use crate::models::flash::{Flash, FlashKind};
use crate::services::auth::{AuthError, Credentials, Registration};
use crate::state::AppState;

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub page: PageContext,
    pub username_field: String,
    pub password_field: String,
}

/// Register page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub page: PageContext,
}

/// Display the login page.
pub async fn login_page(
    State(state): State<AppState>,
    OptionalUser(user): OptionalUser,
    session: Session,
) -> impl IntoResponse {
    let config = state.auth_config();
    LoginTemplate {
        page: PageContext::new("Login", user, &session).await,
        username_field: config.username_field.clone(),
        password_field: config.password_field.clone(),
    }
}

/// Handle login form submission.
///
/// Field names come from the configured login strategy.
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<HashMap<String, String>>,
) -> Result<Response> {
    let result = match Credentials::from_form(state.auth_config(), &form) {
        Ok(credentials) => state.auth().login(&credentials).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(user) => {
            log_in(&session, &user).await?;
            tracing::info!(user_id = %user.id, "User logged in");
            Flash::push(&session, FlashKind::Success, "You are now logged in!").await;
            Ok(Redirect::to("/").into_response())
        }
        Err(e) if e.is_user_facing() => {
            tracing::warn!(error = %e, "Login failed");
            Flash::push(&session, FlashKind::Error, AuthError::InvalidCredentials.to_string())
                .await;
            Ok(Redirect::to("/login").into_response())
        }
        Err(e) => Err(e.into()),
    }
}

/// Display the registration page.
pub async fn register_page(OptionalUser(user): OptionalUser, session: Session) -> impl IntoResponse {
    RegisterTemplate {
        page: PageContext::new("Register", user, &session).await,
    }
}

/// Handle registration form submission; a new account is logged straight in.
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<Registration>,
) -> Result<Response> {
    match state.auth().register(&form).await {
        Ok(user) => {
            log_in(&session, &user).await?;
            Flash::push(
                &session,
                FlashKind::Success,
                format!("Welcome, {}! You are now logged in!", user.name),
            )
            .await;
            Ok(Redirect::to("/").into_response())
        }
        Err(e) if e.is_user_facing() => {
            Flash::push(&session, FlashKind::Error, e.to_string()).await;
            Ok(Redirect::to("/register").into_response())
        }
        Err(e) => Err(e.into()),
    }
}

/// Log out and return to the listing.
pub async fn logout(session: Session) -> Result<Redirect> {
    log_out(&session).await?;
    Flash::push(&session, FlashKind::Success, "You are now logged out!").await;
    Ok(Redirect::to("/"))
}
