//! Store domain types and form validation.

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use thiserror::Error;

use delicious_core::{GeoPoint, Slug, StoreId, UserId};

/// Tags offered as checkboxes on the store form.
pub const TAG_CHOICES: [&str; 5] = [
    "Wifi",
    "Open Late",
    "Family Friendly",
    "Vegetarian",
    "Licensed",
];

/// Image shown for stores without an uploaded photo.
pub const PLACEHOLDER_PHOTO: &str = "/static/images/store.svg";

/// A store's point location plus its street address.
///
/// Serializes in GeoJSON point order: `{"type": "Point", "coordinates": [lng, lat], "address": ...}`.
#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    pub point: GeoPoint,
    pub address: String,
}

impl Serialize for Location {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct GeoJson<'a> {
            #[serde(rename = "type")]
            kind: &'static str,
            coordinates: [f64; 2],
            address: &'a str,
        }

        GeoJson {
            kind: GeoPoint::GEOJSON_TYPE,
            coordinates: self.point.coordinates(),
            address: &self.address,
        }
        .serialize(serializer)
    }
}

/// A listed store (domain type).
#[derive(Debug, Clone)]
pub struct Store {
    pub id: StoreId,
    pub name: String,
    pub slug: Slug,
    pub description: String,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub location: Location,
    /// Generated upload filename, if a photo was uploaded.
    pub photo: Option<String>,
    pub author_id: UserId,
}

impl Store {
    /// Public URL of the store photo (or the placeholder).
    #[must_use]
    pub fn photo_url(&self) -> String {
        photo_url(self.photo.as_deref())
    }
}

/// Public URL for an uploaded photo filename.
#[must_use]
pub fn photo_url(photo: Option<&str>) -> String {
    photo.map_or_else(|| PLACEHOLDER_PHOTO.to_string(), |p| format!("/uploads/{p}"))
}

/// Projection returned by the search and proximity APIs.
#[derive(Debug, Clone, Serialize)]
pub struct StoreSummary {
    pub slug: Slug,
    pub name: String,
    pub description: String,
    pub location: Location,
    pub photo: Option<String>,
}

/// How many stores carry a tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagCount {
    pub tag: String,
    pub count: u64,
}

/// A store ranked by average review rating.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopStore {
    pub id: StoreId,
    pub slug: Slug,
    pub name: String,
    pub photo: Option<String>,
    pub average_rating: f64,
    pub review_count: usize,
}

impl TopStore {
    /// Average rating rounded for display, e.g. `4.5`.
    #[must_use]
    pub fn rating_display(&self) -> String {
        format!("{:.1}", self.average_rating)
    }

    /// Public URL of the store photo (or the placeholder).
    #[must_use]
    pub fn photo_url(&self) -> String {
        photo_url(self.photo.as_deref())
    }
}

/// Field-level validation failures, in form order.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", .0.join(" "))]
pub struct ValidationErrors(pub Vec<String>);

impl ValidationErrors {
    /// The individual messages.
    #[must_use]
    pub fn messages(&self) -> &[String] {
        &self.0
    }
}

/// Raw store fields as submitted by the add/edit form.
#[derive(Debug, Clone, Default)]
pub struct StoreForm {
    pub name: String,
    pub description: String,
    pub tags: Vec<String>,
    pub address: String,
    pub lng: String,
    pub lat: String,
}

impl StoreForm {
    /// Record one submitted text field. Unknown fields are ignored.
    pub fn set_field(&mut self, field: &str, value: String) {
        match field {
            "name" => self.name = value,
            "description" => self.description = value,
            "tags" => self.tags.push(value),
            "address" => self.address = value,
            "lng" => self.lng = value,
            "lat" => self.lat = value,
            _ => {}
        }
    }

    /// Trim, normalize and validate into a [`StoreInput`].
    ///
    /// # Errors
    ///
    /// Returns every failed field at once.
    pub fn validate(self) -> Result<StoreInput, ValidationErrors> {
        let mut errors = Vec::new();

        let name = self.name.trim().to_string();
        if name.is_empty() {
            errors.push("Please enter a store name!".to_string());
        }

        let address = self.address.trim().to_string();
        if address.is_empty() {
            errors.push("You must supply an address!".to_string());
        }

        let point = match (parse_coordinate(&self.lng), parse_coordinate(&self.lat)) {
            (Some(lng), Some(lat)) => match GeoPoint::new(lng, lat) {
                Ok(point) => Some(point),
                Err(e) => {
                    errors.push(format!("Invalid coordinates: {e}."));
                    None
                }
            },
            _ => {
                errors.push("You must supply coordinates!".to_string());
                None
            }
        };

        match point {
            Some(point) if errors.is_empty() => Ok(StoreInput {
                name,
                description: self.description.trim().to_string(),
                tags: normalize_tags(self.tags),
                location: Location { point, address },
                photo: None,
            }),
            _ => Err(ValidationErrors(errors)),
        }
    }
}

fn parse_coordinate(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok()
}

/// Trim tags, drop empty ones and remove duplicates (first occurrence wins).
#[must_use]
pub fn normalize_tags(tags: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.trim();
        if !tag.is_empty() && !out.iter().any(|t| t == tag) {
            out.push(tag.to_string());
        }
    }
    out
}

/// A validated store ready to be written.
#[derive(Debug, Clone)]
pub struct StoreInput {
    pub name: String,
    pub description: String,
    pub tags: Vec<String>,
    pub location: Location,
    /// Set by the upload step when a new photo was stored.
    pub photo: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn form() -> StoreForm {
        let mut form = StoreForm::default();
        form.set_field("name", "  Wes' Tacos ".to_string());
        form.set_field("description", " Best tacos in town. ".to_string());
        form.set_field("tags", "Wifi".to_string());
        form.set_field("tags", " Open Late ".to_string());
        form.set_field("tags", "Wifi".to_string());
        form.set_field("tags", "  ".to_string());
        form.set_field("address", "123 Main St".to_string());
        form.set_field("lng", "-79.38".to_string());
        form.set_field("lat", "43.65".to_string());
        form
    }

    #[test]
    fn test_validate_trims_and_normalizes() {
        let input = form().validate().unwrap();
        assert_eq!(input.name, "Wes' Tacos");
        assert_eq!(input.description, "Best tacos in town.");
        assert_eq!(input.tags, vec!["Wifi", "Open Late"]);
        assert_eq!(input.location.point.coordinates(), [-79.38, 43.65]);
        assert!(input.photo.is_none());
    }

    #[test]
    fn test_validate_collects_all_errors() {
        let err = StoreForm::default().validate().unwrap_err();
        assert_eq!(
            err.messages(),
            &[
                "Please enter a store name!".to_string(),
                "You must supply an address!".to_string(),
                "You must supply coordinates!".to_string(),
            ]
        );
    }

    #[test]
    fn test_validate_rejects_out_of_range_coordinates() {
        let mut form = form();
        form.set_field("lat", "123".to_string());
        let err = form.validate().unwrap_err();
        assert_eq!(err.messages().len(), 1);
        assert!(err.messages().first().unwrap().starts_with("Invalid coordinates"));
    }

    #[test]
    fn test_location_serializes_as_geojson() {
        let location = Location {
            point: GeoPoint::new(-79.38, 43.65).unwrap(),
            address: "123 Main St".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&location).unwrap(),
            serde_json::json!({
                "type": "Point",
                "coordinates": [-79.38, 43.65],
                "address": "123 Main St",
            })
        );
    }

    #[test]
    fn test_photo_url() {
        assert_eq!(photo_url(Some("abc.png")), "/uploads/abc.png");
        assert_eq!(photo_url(None), PLACEHOLDER_PHOTO);
    }

    #[test]
    fn test_unknown_fields_ignored() {
        let mut form = StoreForm::default();
        form.set_field("author", "1".to_string());
        assert_eq!(form.name, "");
    }
}
