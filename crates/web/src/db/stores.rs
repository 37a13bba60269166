//! Store repository: listing, lookup, writes, search and proximity queries.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use delicious_core::{BoundingBox, GeoPoint, Slug, StoreId, UserId};

use super::{RepositoryError, conflict_on_unique};
use crate::models::store::{Location, Store, StoreInput, StoreSummary};

const STORE_COLUMNS: &str = "id, name, slug, description, tags, created_at, \
     longitude, latitude, address, photo, author_id";

const SUMMARY_COLUMNS: &str = "slug, name, description, longitude, latitude, address, photo";

#[derive(sqlx::FromRow)]
struct StoreRow {
    id: StoreId,
    name: String,
    slug: String,
    description: String,
    tags: Vec<String>,
    created_at: DateTime<Utc>,
    longitude: f64,
    latitude: f64,
    address: String,
    photo: Option<String>,
    author_id: UserId,
}

fn location(lng: f64, lat: f64, address: String) -> Result<Location, RepositoryError> {
    let point = GeoPoint::new(lng, lat).map_err(|e| {
        RepositoryError::DataCorruption(format!("invalid coordinates in database: {e}"))
    })?;
    Ok(Location { point, address })
}

impl TryFrom<StoreRow> for Store {
    type Error = RepositoryError;

    fn try_from(row: StoreRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            name: row.name,
            slug: Slug::from_stored(row.slug),
            description: row.description,
            tags: row.tags,
            created_at: row.created_at,
            location: location(row.longitude, row.latitude, row.address)?,
            photo: row.photo,
            author_id: row.author_id,
        })
    }
}

#[derive(sqlx::FromRow)]
struct SummaryRow {
    slug: String,
    name: String,
    description: String,
    longitude: f64,
    latitude: f64,
    address: String,
    photo: Option<String>,
}

impl TryFrom<SummaryRow> for StoreSummary {
    type Error = RepositoryError;

    fn try_from(row: SummaryRow) -> Result<Self, Self::Error> {
        Ok(Self {
            slug: Slug::from_stored(row.slug),
            name: row.name,
            description: row.description,
            location: location(row.longitude, row.latitude, row.address)?,
            photo: row.photo,
        })
    }
}

/// Review ratings for one store, as fed into the top-stores ranking.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StoreRatings {
    pub id: StoreId,
    pub slug: String,
    pub name: String,
    pub photo: Option<String>,
    pub ratings: Vec<i16>,
}

fn into_stores(rows: Vec<StoreRow>) -> Result<Vec<Store>, RepositoryError> {
    rows.into_iter().map(Store::try_from).collect()
}

fn into_summaries(rows: Vec<SummaryRow>) -> Result<Vec<StoreSummary>, RepositoryError> {
    rows.into_iter().map(StoreSummary::try_from).collect()
}

/// Repository for store database operations.
pub struct StoreRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> StoreRepository<'a> {
    /// Create a new store repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// One page of stores, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_page(&self, skip: i64, limit: i64) -> Result<Vec<Store>, RepositoryError> {
        let rows = sqlx::query_as::<_, StoreRow>(&format!(
            r"
            SELECT {STORE_COLUMNS}
            FROM directory.store
            ORDER BY created_at DESC, id DESC
            LIMIT $1 OFFSET $2
            "
        ))
        .bind(limit)
        .bind(skip)
        .fetch_all(self.pool)
        .await?;

        into_stores(rows)
    }

    /// Total number of stores.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count(&self) -> Result<i64, RepositoryError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM directory.store")
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }

    /// Get a store by its slug (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Store>, RepositoryError> {
        let row = sqlx::query_as::<_, StoreRow>(&format!(
            "SELECT {STORE_COLUMNS} FROM directory.store WHERE lower(slug) = lower($1)"
        ))
        .bind(slug)
        .fetch_optional(self.pool)
        .await?;

        row.map(Store::try_from).transpose()
    }

    /// Get a store by its ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: StoreId) -> Result<Option<Store>, RepositoryError> {
        let row = sqlx::query_as::<_, StoreRow>(&format!(
            "SELECT {STORE_COLUMNS} FROM directory.store WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(Store::try_from).transpose()
    }

    /// Existing slugs equal to `base` or `base-<digits>`, ignoring case.
    ///
    /// `exclude` leaves out the store being renamed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn slugs_matching(
        &self,
        base: &Slug,
        exclude: Option<StoreId>,
    ) -> Result<Vec<String>, RepositoryError> {
        let rows: Vec<(String,)> = sqlx::query_as(
            r"
            SELECT slug
            FROM directory.store
            WHERE slug ~* $1
              AND ($2::INTEGER IS NULL OR id <> $2)
            ",
        )
        .bind(base.collision_pattern())
        .bind(exclude)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(|(slug,)| slug).collect())
    }

    /// Insert a new store.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug is already taken.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn insert(
        &self,
        author: UserId,
        input: &StoreInput,
        slug: &Slug,
    ) -> Result<Store, RepositoryError> {
        let row = sqlx::query_as::<_, StoreRow>(&format!(
            r"
            INSERT INTO directory.store
                (name, slug, description, tags, longitude, latitude, address, photo, author_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {STORE_COLUMNS}
            "
        ))
        .bind(&input.name)
        .bind(slug.as_str())
        .bind(&input.description)
        .bind(&input.tags)
        .bind(input.location.point.lng())
        .bind(input.location.point.lat())
        .bind(&input.location.address)
        .bind(input.photo.as_deref())
        .bind(author)
        .fetch_one(self.pool)
        .await
        .map_err(conflict_on_unique("slug"))?;

        Store::try_from(row)
    }

    /// Overwrite a store's editable fields.
    ///
    /// The photo is only replaced when the input carries a new one.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the store doesn't exist.
    /// Returns `RepositoryError::Conflict` if the slug is already taken.
    pub async fn update(
        &self,
        id: StoreId,
        input: &StoreInput,
        slug: &Slug,
    ) -> Result<Store, RepositoryError> {
        let row = sqlx::query_as::<_, StoreRow>(&format!(
            r"
            UPDATE directory.store
            SET name = $2,
                slug = $3,
                description = $4,
                tags = $5,
                longitude = $6,
                latitude = $7,
                address = $8,
                photo = COALESCE($9, photo)
            WHERE id = $1
            RETURNING {STORE_COLUMNS}
            "
        ))
        .bind(id)
        .bind(&input.name)
        .bind(slug.as_str())
        .bind(&input.description)
        .bind(&input.tags)
        .bind(input.location.point.lng())
        .bind(input.location.point.lat())
        .bind(&input.location.address)
        .bind(input.photo.as_deref())
        .fetch_optional(self.pool)
        .await
        .map_err(conflict_on_unique("slug"))?;

        row.map(Store::try_from)
            .transpose()?
            .ok_or(RepositoryError::NotFound)
    }

    /// Tag lists of every store that has at least one tag.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn tag_lists(&self) -> Result<Vec<Vec<String>>, RepositoryError> {
        let rows: Vec<(Vec<String>,)> =
            sqlx::query_as("SELECT tags FROM directory.store WHERE cardinality(tags) > 0")
                .fetch_all(self.pool)
                .await?;
        Ok(rows.into_iter().map(|(tags,)| tags).collect())
    }

    /// Stores carrying `tag`, or every tagged store when `tag` is `None`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_by_tag(&self, tag: Option<&str>) -> Result<Vec<Store>, RepositoryError> {
        let rows = sqlx::query_as::<_, StoreRow>(&format!(
            r"
            SELECT {STORE_COLUMNS}
            FROM directory.store
            WHERE ($1::TEXT IS NULL AND cardinality(tags) > 0)
               OR $1 = ANY(tags)
            ORDER BY created_at DESC, id DESC
            "
        ))
        .bind(tag)
        .fetch_all(self.pool)
        .await?;

        into_stores(rows)
    }

    /// Stores with the given ids, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_by_ids(&self, ids: &[StoreId]) -> Result<Vec<Store>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, StoreRow>(&format!(
            r"
            SELECT {STORE_COLUMNS}
            FROM directory.store
            WHERE id = ANY($1)
            ORDER BY created_at DESC, id DESC
            "
        ))
        .bind(ids)
        .fetch_all(self.pool)
        .await?;

        into_stores(rows)
    }

    /// Ratings of every store with at least `min_reviews` reviews.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn ratings(&self, min_reviews: i64) -> Result<Vec<StoreRatings>, RepositoryError> {
        let rows = sqlx::query_as::<_, StoreRatings>(
            r"
            SELECT s.id, s.slug, s.name, s.photo, array_agg(r.rating) AS ratings
            FROM directory.store s
            JOIN directory.review r ON r.store_id = s.id
            GROUP BY s.id
            HAVING COUNT(r.id) >= $1
            ",
        )
        .bind(min_reviews)
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }

    /// Full-text search over name and description, most relevant first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn search(
        &self,
        query: &str,
        limit: i64,
    ) -> Result<Vec<StoreSummary>, RepositoryError> {
        let rows = sqlx::query_as::<_, SummaryRow>(&format!(
            r"
            SELECT {SUMMARY_COLUMNS}
            FROM directory.store, websearch_to_tsquery('english', $1) AS query
            WHERE search_document @@ query
            ORDER BY ts_rank(search_document, query) DESC, id
            LIMIT $2
            "
        ))
        .bind(query)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        into_summaries(rows)
    }

    /// Stores within `radius_m` meters of `center`, nearest first.
    ///
    /// The bounding box narrows candidates through the `(latitude, longitude)`
    /// index before the exact haversine distance is computed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn near(
        &self,
        center: &GeoPoint,
        radius_m: f64,
        limit: i64,
    ) -> Result<Vec<StoreSummary>, RepositoryError> {
        let bbox = BoundingBox::around(center, radius_m);

        let rows = sqlx::query_as::<_, SummaryRow>(&format!(
            r"
            SELECT {SUMMARY_COLUMNS}
            FROM (
                SELECT {SUMMARY_COLUMNS},
                       2 * $3 * asin(least(1.0, sqrt(
                           power(sin(radians(latitude - $2) / 2), 2)
                           + cos(radians($2)) * cos(radians(latitude))
                             * power(sin(radians(longitude - $1) / 2), 2)
                       ))) AS distance_m
                FROM directory.store
                WHERE latitude BETWEEN $4 AND $5
                  AND longitude BETWEEN $6 AND $7
            ) candidates
            WHERE distance_m <= $8
            ORDER BY distance_m
            LIMIT $9
            "
        ))
        .bind(center.lng())
        .bind(center.lat())
        .bind(delicious_core::types::geo::EARTH_RADIUS_M)
        .bind(bbox.min_lat)
        .bind(bbox.max_lat)
        .bind(bbox.min_lng)
        .bind(bbox.max_lng)
        .bind(radius_m)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        into_summaries(rows)
    }
}
