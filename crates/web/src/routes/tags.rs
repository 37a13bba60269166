//! Tag listing handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use tower_sessions::Session;

use super::{PageContext, StoreCard};
use crate::error::Result;
use crate::filters;
use crate::middleware::OptionalUser;
use crate::models::store::TagCount;
use crate::models::user::User;
use crate::state::AppState;

/// Tag page template.
#[derive(Template, WebTemplate)]
#[template(path = "tags.html")]
pub struct TagsTemplate {
    pub page: PageContext,
    pub tags: Vec<TagCount>,
    pub active: Option<String>,
    pub cards: Vec<StoreCard>,
}

impl TagsTemplate {
    /// Whether `tag` is the selected one.
    #[must_use]
    pub fn is_active(&self, tag: &str) -> bool {
        self.active.as_deref() == Some(tag)
    }
}

/// Display every tag and every tagged store.
pub async fn index(
    State(state): State<AppState>,
    OptionalUser(user): OptionalUser,
    session: Session,
) -> Result<Response> {
    render(&state, user, &session, None).await
}

/// Display every tag and the stores carrying `tag`.
pub async fn show(
    State(state): State<AppState>,
    OptionalUser(user): OptionalUser,
    session: Session,
    Path(tag): Path<String>,
) -> Result<Response> {
    render(&state, user, &session, Some(tag)).await
}

async fn render(
    state: &AppState,
    user: Option<User>,
    session: &Session,
    tag: Option<String>,
) -> Result<Response> {
    let (tags, stores) = state.stores().tags(tag.as_deref()).await?;
    let cards = StoreCard::list(&stores, user.as_ref());
    let title = tag.clone().unwrap_or_else(|| "Tags".to_string());

    Ok(TagsTemplate {
        page: PageContext::new(title, user, session).await,
        tags,
        active: tag,
        cards,
    }
    .into_response())
}
