//! Review submission.

use axum::{
    Form,
    extract::{Path, State},
    response::Redirect,
};
use tower_sessions::Session;

use delicious_core::StoreId;

use super::flash_errors;
use crate::error::{AppError, Result};
use crate::middleware::RequireUser;
use crate::models::flash::{Flash, FlashKind};
use crate::models::review::ReviewForm;
use crate::state::AppState;

/// Add a review to a store, then return to the store page.
pub async fn create(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    session: Session,
    Path(store_id): Path<StoreId>,
    Form(form): Form<ReviewForm>,
) -> Result<Redirect> {
    let service = state.stores();
    let store = service
        .get_by_id(store_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("store {store_id}")))?;
    let back = Redirect::to(&format!("/store/{}", store.slug));

    match form.validate() {
        Ok(input) => {
            service.add_review(store.id, user.id, &input).await?;
            Flash::push(&session, FlashKind::Success, "Review Saved!").await;
        }
        Err(errors) => flash_errors(&session, errors.messages()).await,
    }

    Ok(back)
}
