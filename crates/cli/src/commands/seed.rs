//! Seed the directory with stores from a JSON file.
//!
//! The file is an array of stores:
//!
//! ```json
//! [
//!   {
//!     "name": "Wes Bos Coffee",
//!     "description": "Espresso and pastries.",
//!     "tags": ["Wifi", "Open Late"],
//!     "location": { "address": "123 King St W, Toronto", "coordinates": [-79.38, 43.65] }
//!   }
//! ]
//! ```
//!
//! Every store goes through the same validation and slug pipeline as the
//! web form, and is owned by the seed account (created if it doesn't exist).

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use delicious_core::Email;
use delicious_web::db::users::UserRepository;
use delicious_web::models::store::{StoreForm, StoreInput, ValidationErrors};
use delicious_web::models::user::User;
use delicious_web::services::auth::{AuthService, Registration};
use delicious_web::services::stores::StoreService;

/// Errors reading a seed file.
#[derive(Debug, Error)]
pub enum SeedError {
    #[error("seed file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("store #{index} ({name:?}) is invalid: {errors}")]
    Invalid {
        index: usize,
        name: String,
        errors: ValidationErrors,
    },
}

#[derive(Debug, Deserialize)]
struct SeedStore {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    tags: Vec<String>,
    location: SeedLocation,
}

#[derive(Debug, Deserialize)]
struct SeedLocation {
    address: String,
    /// `[longitude, latitude]`
    coordinates: [f64; 2],
}

impl SeedStore {
    fn into_form(self) -> StoreForm {
        let [lng, lat] = self.location.coordinates;
        StoreForm {
            name: self.name,
            description: self.description,
            tags: self.tags,
            address: self.location.address,
            lng: lng.to_string(),
            lat: lat.to_string(),
        }
    }
}

/// Parse and validate every store in a seed document.
///
/// # Errors
///
/// Returns `SeedError::Json` for malformed JSON and `SeedError::Invalid` for
/// the first store that fails validation.
pub fn parse(content: &str) -> Result<Vec<StoreInput>, SeedError> {
    let stores: Vec<SeedStore> = serde_json::from_str(content)?;

    stores
        .into_iter()
        .enumerate()
        .map(|(index, store)| {
            let name = store.name.clone();
            store
                .into_form()
                .validate()
                .map_err(|errors| SeedError::Invalid {
                    index,
                    name,
                    errors,
                })
        })
        .collect()
}

/// Insert the stores in `file`, owned by `email`.
///
/// # Errors
///
/// Returns an error if the file can't be read or parsed, or a database write fails.
pub async fn run(file: &str, email: &str, password: &str) -> Result<(), Box<dyn std::error::Error>> {
    let path = Path::new(file);
    if !path.exists() {
        return Err(format!("File not found: {file}").into());
    }

    tracing::info!(path = %file, "Loading stores from file");
    let content = tokio::fs::read_to_string(path).await?;
    let stores = parse(&content)?;
    tracing::info!(stores = stores.len(), "Parsed seed file");

    let pool = super::connect().await?;
    let owner = seed_owner(&pool, email, password).await?;

    let service = StoreService::new(&pool);
    for input in &stores {
        let store = service.create(&owner, input).await?;
        tracing::info!(slug = %store.slug, "Seeded store");
    }

    tracing::info!(inserted = stores.len(), "Seeding complete!");
    Ok(())
}

/// Reuse the account for `email`, or register it.
async fn seed_owner(
    pool: &sqlx::PgPool,
    email: &str,
    password: &str,
) -> Result<User, Box<dyn std::error::Error>> {
    let parsed = Email::parse(email)?;
    if let Some(user) = UserRepository::new(pool).get_by_email(&parsed).await? {
        tracing::info!(user_id = %user.id, "Using existing seed account");
        return Ok(user);
    }

    let registration = Registration {
        email: email.to_owned(),
        name: "Seed".to_owned(),
        password: password.to_owned(),
        password_confirm: password.to_owned(),
    };
    let user = AuthService::new(pool).register(&registration).await?;
    tracing::info!(user_id = %user.id, "Created seed account");
    Ok(user)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_seed() {
        let stores = parse(
            r#"[
                {
                    "name": "  Wes' Café  ",
                    "tags": ["Wifi", "Wifi", " "],
                    "location": { "address": "1 King St", "coordinates": [-79.38, 43.65] }
                }
            ]"#,
        )
        .unwrap();

        let store = stores.first().unwrap();
        assert_eq!(store.name, "Wes' Café");
        assert_eq!(store.description, "");
        assert_eq!(store.tags, vec!["Wifi".to_string()]);
        assert_eq!(store.location.point.coordinates(), [-79.38, 43.65]);
    }

    #[test]
    fn test_parse_reports_invalid_store() {
        let err = parse(
            r#"[{ "name": "", "location": { "address": "x", "coordinates": [0, 0] } }]"#,
        )
        .unwrap_err();
        assert!(matches!(err, SeedError::Invalid { index: 0, .. }));

        let err = parse(
            r#"[{ "name": "Far", "location": { "address": "x", "coordinates": [200, 0] } }]"#,
        )
        .unwrap_err();
        assert!(matches!(err, SeedError::Invalid { .. }));
    }

    #[test]
    fn test_parse_rejects_malformed_json() {
        assert!(matches!(parse("{"), Err(SeedError::Json(_))));
    }

    #[test]
    fn test_bundled_seed_file_is_valid() {
        let content = include_str!("../../../../data/stores.json");
        assert!(!parse(content).unwrap().is_empty());
    }
}
