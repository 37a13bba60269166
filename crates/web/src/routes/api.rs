//! JSON API handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;

use delicious_core::{GeoPoint, StoreId};

use crate::error::{AppError, Result};
use crate::middleware::RequireUser;
use crate::models::store::StoreSummary;
use crate::models::user::PublicUser;
use crate::state::AppState;

/// Search query parameters.
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

/// Coordinates for the proximity query, kept as text so bad input maps to 400.
#[derive(Debug, Deserialize)]
pub struct NearQuery {
    pub lat: Option<String>,
    pub lng: Option<String>,
}

impl NearQuery {
    fn point(&self) -> Result<GeoPoint> {
        let parse = |name: &str, raw: Option<&str>| {
            raw.map(str::trim)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| AppError::BadRequest(format!("missing {name}")))?
                .parse::<f64>()
                .map_err(|_| AppError::BadRequest(format!("invalid {name}")))
        };

        let lng = parse("lng", self.lng.as_deref())?;
        let lat = parse("lat", self.lat.as_deref())?;
        GeoPoint::new(lng, lat).map_err(|e| AppError::BadRequest(e.to_string()))
    }
}

/// Up to five stores matching `q`, most relevant first.
pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<StoreSummary>>> {
    let stores = state
        .stores()
        .search(query.q.as_deref().unwrap_or_default())
        .await?;
    Ok(Json(stores))
}

/// Up to ten stores within 10 km of `lat`/`lng`, nearest first.
pub async fn near(
    State(state): State<AppState>,
    Query(query): Query<NearQuery>,
) -> Result<Json<Vec<StoreSummary>>> {
    let point = query.point()?;
    let stores = state.stores().near(&point).await?;
    Ok(Json(stores))
}

/// Toggle the store in the current user's hearts.
pub async fn heart(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(id): Path<StoreId>,
) -> Result<Json<PublicUser>> {
    let user = state.stores().toggle_heart(user.id, id).await?;
    Ok(Json(PublicUser::from(user)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn query(lat: Option<&str>, lng: Option<&str>) -> NearQuery {
        NearQuery {
            lat: lat.map(str::to_owned),
            lng: lng.map(str::to_owned),
        }
    }

    #[test]
    fn test_near_query_parses_coordinates() {
        let point = query(Some("43.65"), Some("-79.38")).point().unwrap();
        assert!((point.lat() - 43.65).abs() < f64::EPSILON);
        assert!((point.lng() + 79.38).abs() < f64::EPSILON);
    }

    #[test]
    fn test_near_query_rejects_bad_input() {
        for (lat, lng) in [
            (None, Some("1")),
            (Some("1"), None),
            (Some(" "), Some("1")),
            (Some("abc"), Some("1")),
            (Some("91"), Some("0")),
            (Some("0"), Some("181")),
        ] {
            assert!(matches!(
                query(lat, lng).point(),
                Err(AppError::BadRequest(_))
            ));
        }
    }
}
