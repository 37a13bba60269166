//! Top-rated stores page.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::State,
    response::{IntoResponse, Response},
};
use tower_sessions::Session;

use super::PageContext;
use crate::error::Result;
use crate::filters;
use crate::middleware::OptionalUser;
use crate::models::store::TopStore;
use crate::state::AppState;

/// Top stores template.
#[derive(Template, WebTemplate)]
#[template(path = "top.html")]
pub struct TopTemplate {
    pub page: PageContext,
    pub stores: Vec<TopStore>,
}

/// Display the highest-rated stores.
pub async fn index(
    State(state): State<AppState>,
    OptionalUser(user): OptionalUser,
    session: Session,
) -> Result<Response> {
    let stores = state.stores().top_stores().await?;

    Ok(TopTemplate {
        page: PageContext::new("Top Stores!", user, &session).await,
        stores,
    }
    .into_response())
}
