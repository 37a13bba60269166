//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                          - Store listing (page 1)
//! GET  /stores                    - Store listing (page 1)
//! GET  /stores/page/{page}        - Store listing page
//! GET  /store/{slug}              - Store detail with reviews
//! GET  /add                       - New store form (auth)
//! POST /add                       - Create store, multipart (auth)
//! GET  /stores/{id}/edit          - Edit form (auth + owner)
//! POST /add/{id}                  - Update store, multipart (auth + owner)
//! GET  /tags, /tags/{tag}         - Tag counts and tagged stores
//! GET  /top                       - Top-rated stores
//! GET  /map                       - Nearby stores map
//! GET  /hearts                    - Hearted stores (auth)
//! POST /reviews/{store_id}        - Add review (auth)
//!
//! # Auth
//! GET  /login, POST /login
//! GET  /register, POST /register
//! POST /logout
//!
//! # JSON API
//! GET  /api/search?q=             - Up to 5 stores by relevance
//! GET  /api/stores/near?lat=&lng= - Up to 10 stores within 10 km
//! POST /api/stores/{id}/heart     - Toggle heart, returns the user (auth)
//! ```

pub mod api;
pub mod auth;
pub mod hearts;
pub mod map;
pub mod reviews;
pub mod stores;
pub mod tags;
pub mod top;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use tower_sessions::Session;

use crate::filters;
use crate::middleware::OptionalUser;
use crate::models::flash::{Flash, FlashKind};
use crate::models::store::Store;
use crate::models::user::User;
use crate::state::AppState;

/// Largest accepted store form body (photo included).
const PHOTO_BODY_LIMIT: usize = 10 * 1024 * 1024;

/// Words of a description shown on a store card.
const EXCERPT_WORDS: usize = 25;

/// What every full page needs: title, current user and pending flashes.
pub struct PageContext {
    pub title: String,
    pub user: Option<User>,
    pub flashes: Vec<Flash>,
}

impl PageContext {
    /// Build the context, draining the session's flash messages.
    pub async fn new(title: impl Into<String>, user: Option<User>, session: &Session) -> Self {
        Self {
            title: title.into(),
            user,
            flashes: Flash::take(session).await,
        }
    }

    /// Number of hearts shown in the nav.
    #[must_use]
    pub fn heart_count(&self) -> usize {
        self.user.as_ref().map_or(0, |u| u.hearts.len())
    }
}

/// A store as shown in listings.
pub struct StoreCard {
    pub id: String,
    pub slug: String,
    pub name: String,
    pub excerpt: String,
    pub photo_url: String,
    pub hearted: bool,
    pub editable: bool,
}

impl StoreCard {
    /// Cards for `stores` as seen by `viewer`.
    #[must_use]
    pub fn list(stores: &[Store], viewer: Option<&User>) -> Vec<Self> {
        stores.iter().map(|s| Self::new(s, viewer)).collect()
    }

    #[must_use]
    pub fn new(store: &Store, viewer: Option<&User>) -> Self {
        Self {
            id: store.id.to_string(),
            slug: store.slug.to_string(),
            name: store.name.clone(),
            excerpt: truncate_words(&store.description, EXCERPT_WORDS),
            photo_url: store.photo_url(),
            hearted: viewer.is_some_and(|u| u.has_hearted(store.id)),
            editable: viewer.is_some_and(|u| u.id == store.author_id),
        }
    }
}

/// Cut `text` to its first `words` words, adding an ellipsis if anything was dropped.
fn truncate_words(text: &str, words: usize) -> String {
    let mut parts = text.split_whitespace();
    let mut out = parts.by_ref().take(words).collect::<Vec<_>>().join(" ");
    if parts.next().is_some() {
        out.push('…');
    }
    out
}

/// Queue every message of a failed validation as an error flash.
pub async fn flash_errors<'m>(session: &Session, messages: impl IntoIterator<Item = &'m String>) {
    for message in messages {
        Flash::push(session, FlashKind::Error, message.as_str()).await;
    }
}

/// Page not found template.
#[derive(Template, WebTemplate)]
#[template(path = "not_found.html")]
pub struct NotFoundTemplate {
    pub page: PageContext,
}

/// Fallback for unknown paths.
pub async fn not_found(OptionalUser(user): OptionalUser, session: Session) -> impl IntoResponse {
    let page = PageContext::new("Not Found", user, &session).await;
    (StatusCode::NOT_FOUND, NotFoundTemplate { page })
}

/// Store form routes, which accept photo uploads.
fn upload_routes() -> Router<AppState> {
    Router::new()
        .route("/add", get(stores::add_page).post(stores::create))
        .route("/add/{id}", post(stores::update))
        .layer(DefaultBodyLimit::max(PHOTO_BODY_LIMIT))
}

/// Create the JSON API router.
fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/search", get(api::search))
        .route("/stores/near", get(api::near))
        .route("/stores/{id}/heart", post(api::heart))
}

/// Create the auth routes router.
fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/register", get(auth::register_page).post(auth::register))
        .route("/logout", post(auth::logout))
}

/// Create all page and API routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(stores::index))
        .route("/stores", get(stores::index))
        .route("/stores/page/{page}", get(stores::page))
        .route("/stores/{id}/edit", get(stores::edit_page))
        .route("/store/{slug}", get(stores::show))
        .merge(upload_routes())
        .route("/tags", get(tags::index))
        .route("/tags/{tag}", get(tags::show))
        .route("/top", get(top::index))
        .route("/map", get(map::index))
        .route("/hearts", get(hearts::index))
        .route("/reviews/{store_id}", post(reviews::create))
        .merge(auth_routes())
        .nest("/api", api_routes())
        .fallback(not_found)
}

#[cfg(test)]
mod tests {
    use super::truncate_words;

    #[test]
    fn test_truncate_words() {
        assert_eq!(truncate_words("a b  c", 5), "a b c");
        assert_eq!(truncate_words("one two three", 2), "one two…");
        assert_eq!(truncate_words("", 3), "");
    }
}
