//! Nearby stores page; results are fetched client-side from `/api/stores/near`.

use askama::Template;
use askama_web::WebTemplate;
use axum::response::IntoResponse;
use tower_sessions::Session;

use super::PageContext;
use crate::filters;
use crate::middleware::OptionalUser;

/// Map page template.
#[derive(Template, WebTemplate)]
#[template(path = "map.html")]
pub struct MapTemplate {
    pub page: PageContext,
}

/// Display the map page.
pub async fn index(OptionalUser(user): OptionalUser, session: Session) -> impl IntoResponse {
    MapTemplate {
        page: PageContext::new("Map", user, &session).await,
    }
}
