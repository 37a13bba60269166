//! Store listing, detail and add/edit handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Multipart, Path, State},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use delicious_core::StoreId;

use super::{PageContext, StoreCard, flash_errors};
use crate::db::RepositoryError;
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::{OptionalUser, RequireUser};
use crate::models::flash::{Flash, FlashKind};
use crate::models::review::Review;
use crate::models::store::{Store, StoreForm, TAG_CHOICES};
use crate::models::user::User;
use crate::services::stores::confirm_owner;
use crate::services::uploads::PhotoUpload;
use crate::state::AppState;

/// Links under a paginated listing.
pub struct Pager {
    pub page: u32,
    pub pages: u32,
    pub count: u64,
    pub prev: Option<u32>,
    pub next: Option<u32>,
}

/// Values shown in the add/edit form.
#[derive(Default)]
pub struct FormValues {
    pub name: String,
    pub description: String,
    pub address: String,
    pub lng: String,
    pub lat: String,
    pub tags: Vec<String>,
    pub photo_url: Option<String>,
}

impl FormValues {
    fn from_store(store: &Store) -> Self {
        Self {
            name: store.name.clone(),
            description: store.description.clone(),
            address: store.location.address.clone(),
            lng: store.location.point.lng().to_string(),
            lat: store.location.point.lat().to_string(),
            tags: store.tags.clone(),
            photo_url: store.photo.is_some().then(|| store.photo_url()),
        }
    }

    /// Whether the tag checkbox should be ticked.
    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// Store listing template (also used for hearted stores).
#[derive(Template, WebTemplate)]
#[template(path = "stores/index.html")]
pub struct StoresTemplate {
    pub page: PageContext,
    pub cards: Vec<StoreCard>,
    pub pager: Option<Pager>,
}

/// Store detail template.
#[derive(Template, WebTemplate)]
#[template(path = "stores/show.html")]
pub struct StoreShowTemplate {
    pub page: PageContext,
    pub store: Store,
    pub photo_url: String,
    pub author_name: Option<String>,
    pub reviews: Vec<Review>,
    pub card: StoreCard,
}

/// Add/edit form template.
#[derive(Template, WebTemplate)]
#[template(path = "stores/edit.html")]
pub struct StoreFormTemplate {
    pub page: PageContext,
    pub action: String,
    pub values: FormValues,
    pub tag_choices: &'static [&'static str],
}

/// Display the first listing page.
pub async fn index(
    State(state): State<AppState>,
    OptionalUser(user): OptionalUser,
    session: Session,
) -> Result<Response> {
    listing(&state, user, &session, None).await
}

/// Display a listing page.
pub async fn page(
    State(state): State<AppState>,
    OptionalUser(user): OptionalUser,
    session: Session,
    Path(page): Path<u32>,
) -> Result<Response> {
    listing(&state, user, &session, Some(page)).await
}

async fn listing(
    state: &AppState,
    user: Option<User>,
    session: &Session,
    page: Option<u32>,
) -> Result<Response> {
    let result = state.stores().list_page(page).await?;

    if let Some(last) = result.overflow_redirect() {
        Flash::push(
            session,
            FlashKind::Info,
            format!(
                "Hey! You asked for page {}. But that doesn't exist. So I put you on page {last}",
                result.pagination.page()
            ),
        )
        .await;
        return Ok(Redirect::to(&format!("/stores/page/{last}")).into_response());
    }

    let current = result.pagination.page();
    let pager = Pager {
        page: current,
        pages: result.pages,
        count: result.count,
        prev: (current > 1).then(|| current - 1),
        next: (current < result.pages).then(|| current + 1),
    };
    let cards = StoreCard::list(&result.stores, user.as_ref());

    Ok(StoresTemplate {
        page: PageContext::new("Stores", user, session).await,
        cards,
        pager: Some(pager),
    }
    .into_response())
}

/// Display a store with its author and reviews.
pub async fn show(
    State(state): State<AppState>,
    OptionalUser(user): OptionalUser,
    session: Session,
    Path(slug): Path<String>,
) -> Result<Response> {
    let service = state.stores();
    let store = service
        .get_by_slug(&slug)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("store {slug}")))?;

    let (author, reviews) = service.details(&store).await?;
    let card = StoreCard::new(&store, user.as_ref());

    Ok(StoreShowTemplate {
        page: PageContext::new(store.name.clone(), user, &session).await,
        photo_url: store.photo_url(),
        author_name: author.map(|a| a.name),
        reviews,
        card,
        store,
    }
    .into_response())
}

/// Display the new store form.
pub async fn add_page(RequireUser(user): RequireUser, session: Session) -> impl IntoResponse {
    StoreFormTemplate {
        page: PageContext::new("Add Store", Some(user), &session).await,
        action: "/add".to_string(),
        values: FormValues::default(),
        tag_choices: &TAG_CHOICES,
    }
}

/// Create a store from the multipart form.
pub async fn create(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    session: Session,
    multipart: Multipart,
) -> Result<Response> {
    let (form, photo) = read_store_form(multipart).await?;

    let mut input = match form.validate() {
        Ok(input) => input,
        Err(errors) => {
            flash_errors(&session, errors.messages()).await;
            return Ok(Redirect::to("/add").into_response());
        }
    };

    input.photo = match store_photo(&state, &session, photo).await? {
        PhotoOutcome::Stored(photo) => photo,
        PhotoOutcome::Rejected => return Ok(Redirect::to("/add").into_response()),
    };

    let store = state.stores().create(&user, &input).await;
    let store = discard_photo_on_error(&state, input.photo.as_deref(), store).await?;

    Flash::push(
        &session,
        FlashKind::Success,
        format!("Successfully Created {}. Care to leave a review?", store.name),
    )
    .await;
    Ok(Redirect::to(&format!("/store/{}", store.slug)).into_response())
}

/// Display the edit form for a store the user owns.
pub async fn edit_page(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    session: Session,
    Path(id): Path<StoreId>,
) -> Result<Response> {
    let store = owned_store(&state, &user, id).await?;

    Ok(StoreFormTemplate {
        page: PageContext::new(format!("Edit {}", store.name), Some(user), &session).await,
        action: format!("/add/{}", store.id),
        values: FormValues::from_store(&store),
        tag_choices: &TAG_CHOICES,
    }
    .into_response())
}

/// Update a store the user owns.
///
/// Ownership is checked before the body is read.
pub async fn update(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    session: Session,
    Path(id): Path<StoreId>,
    multipart: Multipart,
) -> Result<Response> {
    let store = owned_store(&state, &user, id).await?;
    let edit_url = format!("/stores/{}/edit", store.id);

    let (form, photo) = read_store_form(multipart).await?;

    let mut input = match form.validate() {
        Ok(input) => input,
        Err(errors) => {
            flash_errors(&session, errors.messages()).await;
            return Ok(Redirect::to(&edit_url).into_response());
        }
    };

    input.photo = match store_photo(&state, &session, photo).await? {
        PhotoOutcome::Stored(photo) => photo,
        PhotoOutcome::Rejected => return Ok(Redirect::to(&edit_url).into_response()),
    };

    let updated = state.stores().update(&store, &input).await;
    let updated = discard_photo_on_error(&state, input.photo.as_deref(), updated).await?;

    Flash::push(
        &session,
        FlashKind::Success,
        format!("Successfully updated {}.", updated.name),
    )
    .await;
    Ok(Redirect::to(&edit_url).into_response())
}

/// Load store `id` and fail with 403 unless `user` wrote it.
async fn owned_store(
    state: &AppState,
    user: &User,
    id: StoreId,
) -> Result<Store> {
    let store = state
        .stores()
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("store {id}")))?;
    confirm_owner(&store, user)?;
    Ok(store)
}

/// Split a store form into its text fields and the (first) photo part.
async fn read_store_form(mut multipart: Multipart) -> Result<(StoreForm, Option<PhotoUpload>)> {
    let mut form = StoreForm::default();
    let mut photo = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?
    {
        let Some(name) = field.name().map(str::to_owned) else {
            continue;
        };

        if name == "photo" {
            let content_type = field.content_type().unwrap_or_default().to_owned();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(e.body_text()))?;
            if photo.is_none() {
                photo = Some(PhotoUpload {
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| AppError::BadRequest(e.body_text()))?;
            form.set_field(&name, value);
        }
    }

    Ok((form, photo))
}

/// Delete a freshly stored photo when the store write that would reference it failed.
async fn discard_photo_on_error<T>(
    state: &AppState,
    photo: Option<&str>,
    result: std::result::Result<T, RepositoryError>,
) -> Result<T> {
    if result.is_err()
        && let Some(photo) = photo
    {
        state.uploader().discard(photo).await;
    }
    Ok(result?)
}

enum PhotoOutcome {
    Stored(Option<String>),
    Rejected,
}

/// Run the upload step, flashing a rejected file instead of failing.
async fn store_photo(
    state: &AppState,
    session: &Session,
    photo: Option<PhotoUpload>,
) -> Result<PhotoOutcome> {
    match state.uploader().store(photo).await {
        Ok(photo) => Ok(PhotoOutcome::Stored(photo)),
        Err(e) => match e.rejection_message() {
            Some(message) => {
                tracing::debug!(error = ?e, "Rejected photo upload");
                Flash::push(session, FlashKind::Error, message).await;
                Ok(PhotoOutcome::Rejected)
            }
            None => Err(e.into()),
        },
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::io::Cursor;
    use std::path::{Path, PathBuf};
    use std::sync::Arc;

    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
    use sqlx::postgres::PgPoolOptions;
    use tower_sessions::MemoryStore;

    use super::*;
    use crate::config::DirectoryConfig;

    fn state(upload_dir: &Path) -> AppState {
        let upload_dir = upload_dir.display().to_string();
        let config = DirectoryConfig::from_lookup(|key| match key {
            "DELICIOUS_DATABASE_URL" => {
                Some("postgres://delicious@localhost:1/delicious_test".to_owned())
            }
            "DELICIOUS_UPLOAD_DIR" => Some(upload_dir.clone()),
            _ => None,
        })
        .unwrap();
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://delicious@localhost:1/delicious_test")
            .unwrap();
        AppState::new(config, pool)
    }

    fn temp_dir() -> PathBuf {
        std::env::temp_dir().join(format!("delicious-routes-{}", uuid::Uuid::new_v4()))
    }

    fn session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    fn png() -> Vec<u8> {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 4, Rgb([10, 20, 30])));
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn upload(content_type: &str, bytes: Vec<u8>) -> Option<PhotoUpload> {
        Some(PhotoUpload {
            content_type: content_type.to_owned(),
            bytes,
        })
    }

    #[tokio::test]
    async fn test_unreadable_image_is_flashed_not_failed() {
        let dir = temp_dir();
        let state = state(&dir);
        let session = session();

        let outcome = store_photo(&state, &session, upload("image/heic", b"ftypheic".to_vec()))
            .await
            .unwrap();
        assert!(matches!(outcome, PhotoOutcome::Rejected));

        let flashes = Flash::take(&session).await;
        assert_eq!(flashes.len(), 1);
        assert_eq!(flashes[0].kind, FlashKind::Error);
        assert_eq!(flashes[0].message, "That image could not be read.");
        assert!(!dir.exists());
    }

    #[tokio::test]
    async fn test_wrong_filetype_is_flashed() {
        let dir = temp_dir();
        let state = state(&dir);
        let session = session();

        let outcome = store_photo(&state, &session, upload("text/plain", b"hi".to_vec()))
            .await
            .unwrap();
        assert!(matches!(outcome, PhotoOutcome::Rejected));
        assert_eq!(
            Flash::take(&session).await[0].message,
            "That filetype isn't allowed!"
        );
    }

    #[tokio::test]
    async fn test_failed_store_write_discards_photo() {
        let dir = temp_dir();
        let state = state(&dir);
        let session = session();

        let PhotoOutcome::Stored(Some(photo)) =
            store_photo(&state, &session, upload("image/png", png())).await.unwrap()
        else {
            panic!("photo was not stored");
        };
        assert!(dir.join(&photo).exists());

        let failed: std::result::Result<(), RepositoryError> =
            Err(RepositoryError::Conflict("slug already exists".to_owned()));
        let err = discard_photo_on_error(&state, Some(photo.as_str()), failed)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Database(RepositoryError::Conflict(_))));
        assert!(!dir.join(&photo).exists());

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn test_successful_store_write_keeps_photo() {
        let dir = temp_dir();
        let state = state(&dir);
        let session = session();

        let PhotoOutcome::Stored(Some(photo)) =
            store_photo(&state, &session, upload("image/png", png())).await.unwrap()
        else {
            panic!("photo was not stored");
        };

        let stored = discard_photo_on_error(&state, Some(photo.as_str()), Ok(7)).await.unwrap();
        assert_eq!(stored, 7);
        assert!(dir.join(&photo).exists());

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
