//! Hearted stores page.

use axum::{
    extract::State,
    response::{IntoResponse, Response},
};
use tower_sessions::Session;

use super::{PageContext, StoreCard};
use super::stores::StoresTemplate;
use crate::error::Result;
use crate::middleware::RequireUser;
use crate::state::AppState;

/// Display the stores the user has hearted.
pub async fn index(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    session: Session,
) -> Result<Response> {
    let stores = state.stores().hearted(&user).await?;
    let cards = StoreCard::list(&stores, Some(&user));

    Ok(StoresTemplate {
        page: PageContext::new("Hearted Stores", Some(user), &session).await,
        cards,
        pager: None,
    }
    .into_response())
}
