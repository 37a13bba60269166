//! Store service: the slug pipeline, listings and aggregate read models.

use std::collections::{HashMap, HashSet};

use sqlx::PgPool;
use thiserror::Error;
use tracing::instrument;

use delicious_core::{GeoPoint, Pagination, Slug, StoreId, UserId};

use crate::db::RepositoryError;
use crate::db::reviews::ReviewRepository;
use crate::db::stores::{StoreRatings, StoreRepository};
use crate::db::users::UserRepository;
use crate::models::review::{Review, ReviewInput};
use crate::models::store::{Store, StoreInput, StoreSummary, TagCount, TopStore};
use crate::models::user::User;

/// Stores per listing page.
pub const PAGE_SIZE: u32 = 4;

/// Maximum results returned by the search API.
pub const SEARCH_LIMIT: i64 = 5;

/// Maximum results returned by the proximity API.
pub const NEAR_LIMIT: i64 = 10;

/// Proximity search radius in meters.
pub const NEAR_RADIUS_M: f64 = 10_000.0;

/// Stores need at least this many reviews to be ranked.
pub const TOP_MIN_REVIEWS: usize = 2;

/// Length of the top-stores list.
pub const TOP_LIMIT: usize = 10;

/// Attempts at writing a slug before a concurrent collision is reported.
const SLUG_ATTEMPTS: u32 = 3;

/// Raised when a user tries to change a store they did not create.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PermissionError {
    #[error("You must own a store in order to edit it!")]
    NotOwner,
}

/// Fail unless `user` is the author of `store`.
///
/// # Errors
///
/// Returns [`PermissionError::NotOwner`] for anyone but the author.
pub fn confirm_owner(store: &Store, user: &User) -> Result<(), PermissionError> {
    if store.author_id == user.id {
        Ok(())
    } else {
        Err(PermissionError::NotOwner)
    }
}

/// Count tags across stores, once per store, most used first (ties by name).
///
/// ```
/// use delicious_web::services::stores::tally_tags;
///
/// let counts = tally_tags(vec![vec!["a".to_string(), "b".to_string()], vec!["a".to_string()]]);
/// assert_eq!(counts[0].tag, "a");
/// assert_eq!(counts[0].count, 2);
/// ```
pub fn tally_tags<I, T>(tag_lists: I) -> Vec<TagCount>
where
    I: IntoIterator<Item = T>,
    T: IntoIterator<Item = String>,
{
    let mut counts: HashMap<String, u64> = HashMap::new();
    for tags in tag_lists {
        let unique: HashSet<String> = tags.into_iter().collect();
        for tag in unique {
            *counts.entry(tag).or_insert(0) += 1;
        }
    }

    let mut tally: Vec<TagCount> = counts
        .into_iter()
        .map(|(tag, count)| TagCount { tag, count })
        .collect();
    tally.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.tag.cmp(&b.tag)));
    tally
}

/// Rank stores by mean rating.
///
/// Stores with fewer than `min_reviews` ratings are dropped rather than scored
/// as zero. Ties go to the store with more reviews, then by name.
#[must_use]
pub fn rank_top_stores(rows: Vec<StoreRatings>, min_reviews: usize, limit: usize) -> Vec<TopStore> {
    let mut ranked: Vec<TopStore> = rows
        .into_iter()
        .filter(|row| row.ratings.len() >= min_reviews.max(1))
        .map(|row| {
            let total: f64 = row.ratings.iter().map(|r| f64::from(*r)).sum();
            #[allow(clippy::cast_precision_loss)] // review counts stay far below 2^52
            let average_rating = total / row.ratings.len() as f64;
            TopStore {
                id: row.id,
                slug: Slug::from_stored(row.slug),
                name: row.name,
                photo: row.photo,
                average_rating,
                review_count: row.ratings.len(),
            }
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.average_rating
            .total_cmp(&a.average_rating)
            .then_with(|| b.review_count.cmp(&a.review_count))
            .then_with(|| a.name.cmp(&b.name))
    });
    ranked.truncate(limit);
    ranked
}

/// One listing page plus what the handler needs to render or redirect.
#[derive(Debug)]
pub struct StorePage {
    pub stores: Vec<Store>,
    pub pagination: Pagination,
    pub count: u64,
    pub pages: u32,
}

impl StorePage {
    /// Page to redirect to when the requested page is past the end.
    #[must_use]
    pub fn overflow_redirect(&self) -> Option<u32> {
        self.pagination
            .overflow_redirect(self.stores.len(), self.count)
    }
}

/// Which row a slug is being written for.
#[derive(Clone, Copy)]
enum SlugWrite<'i> {
    Insert { author: UserId, input: &'i StoreInput },
    Update { id: StoreId, input: &'i StoreInput },
}

impl SlugWrite<'_> {
    const fn exclude(&self) -> Option<StoreId> {
        match self {
            Self::Insert { .. } => None,
            Self::Update { id, .. } => Some(*id),
        }
    }
}

/// Store operations over the repositories.
pub struct StoreService<'a> {
    stores: StoreRepository<'a>,
    reviews: ReviewRepository<'a>,
    users: UserRepository<'a>,
}

impl<'a> StoreService<'a> {
    /// Create a new store service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            stores: StoreRepository::new(pool),
            reviews: ReviewRepository::new(pool),
            users: UserRepository::new(pool),
        }
    }

    /// Create a store authored by `author`, deriving a unique slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug kept colliding with
    /// concurrent writers, or `RepositoryError::Database` on other failures.
    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create(&self, author: &User, input: &StoreInput) -> Result<Store, RepositoryError> {
        let base = Slug::from_name(&input.name);
        let store = self
            .save_with_slug(
                &base,
                SlugWrite::Insert {
                    author: author.id,
                    input,
                },
            )
            .await?;
        tracing::info!(store_id = %store.id, slug = %store.slug, "Store created");
        Ok(store)
    }

    /// Update `existing` with `input`.
    ///
    /// The slug is only re-derived when the name changed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the store disappeared, or the
    /// same errors as [`Self::create`].
    #[instrument(skip(self, existing, input), fields(store_id = %existing.id))]
    pub async fn update(&self, existing: &Store, input: &StoreInput) -> Result<Store, RepositoryError> {
        if input.name == existing.name {
            return self.stores.update(existing.id, input, &existing.slug).await;
        }

        let base = Slug::from_name(&input.name);
        self.save_with_slug(
            &base,
            SlugWrite::Update {
                id: existing.id,
                input,
            },
        )
        .await
    }

    async fn save_with_slug(
        &self,
        base: &Slug,
        write: SlugWrite<'_>,
    ) -> Result<Store, RepositoryError> {
        let mut attempt = 1;
        loop {
            let existing = self.stores.slugs_matching(base, write.exclude()).await?;
            let slug = base.dedupe(existing.iter().map(String::as_str));

            let result = match write {
                SlugWrite::Insert { author, input } => self.stores.insert(author, input, &slug).await,
                SlugWrite::Update { id, input } => self.stores.update(id, input, &slug).await,
            };

            match result {
                Err(RepositoryError::Conflict(reason)) if attempt < SLUG_ATTEMPTS => {
                    tracing::warn!(%slug, attempt, %reason, "Slug taken concurrently, retrying");
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    /// One page of stores, newest first; the window and count load concurrently.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    #[instrument(skip(self))]
    pub async fn list_page(&self, page: Option<u32>) -> Result<StorePage, RepositoryError> {
        let pagination = Pagination::new(page, PAGE_SIZE);
        let skip = i64::try_from(pagination.skip()).unwrap_or(i64::MAX);
        let limit = i64::try_from(pagination.limit()).unwrap_or(i64::MAX);

        let (stores, count) =
            tokio::try_join!(self.stores.list_page(skip, limit), self.stores.count())?;
        let count = u64::try_from(count).unwrap_or(0);

        Ok(StorePage {
            stores,
            pagination,
            count,
            pages: Pagination::total_pages(count, PAGE_SIZE),
        })
    }

    /// Look up a store by slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Store>, RepositoryError> {
        self.stores.get_by_slug(slug).await
    }

    /// Look up a store by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: StoreId) -> Result<Option<Store>, RepositoryError> {
        self.stores.get_by_id(id).await
    }

    /// A store's author and reviews, loaded together.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn details(&self, store: &Store) -> Result<(Option<User>, Vec<Review>), RepositoryError> {
        tokio::try_join!(
            self.users.get_by_id(store.author_id),
            self.reviews.list_for_store(store.id)
        )
    }

    /// Tag counts plus the stores carrying `tag` (every tagged store if `None`).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    #[instrument(skip(self))]
    pub async fn tags(&self, tag: Option<&str>) -> Result<(Vec<TagCount>, Vec<Store>), RepositoryError> {
        let (lists, stores) =
            tokio::try_join!(self.stores.tag_lists(), self.stores.list_by_tag(tag))?;
        Ok((tally_tags(lists), stores))
    }

    /// The highest-rated stores with enough reviews.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self))]
    pub async fn top_stores(&self) -> Result<Vec<TopStore>, RepositoryError> {
        let min = i64::try_from(TOP_MIN_REVIEWS).unwrap_or(i64::MAX);
        let rows = self.stores.ratings(min).await?;
        Ok(rank_top_stores(rows, TOP_MIN_REVIEWS, TOP_LIMIT))
    }

    /// Full-text search. A blank query returns nothing without querying.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self))]
    pub async fn search(&self, query: &str) -> Result<Vec<StoreSummary>, RepositoryError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        self.stores.search(query, SEARCH_LIMIT).await
    }

    /// Stores within 10 km of `point`, nearest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self))]
    pub async fn near(&self, point: &GeoPoint) -> Result<Vec<StoreSummary>, RepositoryError> {
        self.stores.near(point, NEAR_RADIUS_M, NEAR_LIMIT).await
    }

    /// Stores the user has hearted.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn hearted(&self, user: &User) -> Result<Vec<Store>, RepositoryError> {
        self.stores.list_by_ids(user.hearts.as_slice()).await
    }

    /// Add or remove `store` from the user's hearts.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for an unknown store.
    #[instrument(skip(self))]
    pub async fn toggle_heart(&self, user: UserId, store: StoreId) -> Result<User, RepositoryError> {
        self.users.toggle_heart(user, store).await
    }

    /// Record a review on `store`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the store doesn't exist.
    #[instrument(skip(self, input))]
    pub async fn add_review(
        &self,
        store: StoreId,
        author: UserId,
        input: &ReviewInput,
    ) -> Result<(), RepositoryError> {
        let id = self.reviews.create(store, author, input).await?;
        tracing::info!(review_id = %id, "Review saved");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use delicious_core::{Email, Hearts};

    use super::*;
    use crate::models::store::Location;

    fn tags(lists: &[&[&str]]) -> Vec<Vec<String>> {
        lists
            .iter()
            .map(|l| l.iter().map(|t| (*t).to_string()).collect())
            .collect()
    }

    fn ratings(id: i32, name: &str, ratings: &[i16]) -> StoreRatings {
        StoreRatings {
            id: StoreId::new(id),
            slug: name.to_lowercase(),
            name: name.to_string(),
            photo: None,
            ratings: ratings.to_vec(),
        }
    }

    fn user(id: i32) -> User {
        User {
            id: UserId::new(id),
            email: Email::parse("owner@example.com").unwrap(),
            name: "Owner".to_string(),
            hearts: Hearts::default(),
            created_at: Utc::now(),
        }
    }

    fn store(author: i32) -> Store {
        Store {
            id: StoreId::new(1),
            name: "Tacos".to_string(),
            slug: Slug::from_name("Tacos"),
            description: String::new(),
            tags: Vec::new(),
            created_at: Utc::now(),
            location: Location {
                point: GeoPoint::new(-79.38, 43.65).unwrap(),
                address: "1 Main St".to_string(),
            },
            photo: None,
            author_id: UserId::new(author),
        }
    }

    #[test]
    fn test_tally_tags_counts_and_sorts() {
        let counts = tally_tags(tags(&[&["a", "b"], &["a"]]));
        assert_eq!(
            counts,
            vec![
                TagCount {
                    tag: "a".to_string(),
                    count: 2
                },
                TagCount {
                    tag: "b".to_string(),
                    count: 1
                },
            ]
        );
    }

    #[test]
    fn test_tally_tags_counts_once_per_store() {
        let counts = tally_tags(tags(&[&["wifi", "wifi"], &["wifi"]]));
        assert_eq!(counts.len(), 1);
        assert_eq!(counts.first().unwrap().count, 2);
    }

    #[test]
    fn test_tally_tags_ties_by_name() {
        let counts = tally_tags(tags(&[&["vegan"], &["licensed"]]));
        let names: Vec<&str> = counts.iter().map(|c| c.tag.as_str()).collect();
        assert_eq!(names, vec!["licensed", "vegan"]);
    }

    #[test]
    fn test_rank_top_stores_excludes_thin_stores() {
        let ranked = rank_top_stores(
            vec![
                ratings(1, "Low", &[1, 2, 3]),
                ratings(2, "Single", &[5]),
                ratings(3, "High", &[4, 5]),
            ],
            TOP_MIN_REVIEWS,
            TOP_LIMIT,
        );
        let summary: Vec<(&str, f64)> = ranked
            .iter()
            .map(|s| (s.name.as_str(), s.average_rating))
            .collect();
        assert_eq!(summary, vec![("High", 4.5), ("Low", 2.0)]);
    }

    #[test]
    fn test_rank_top_stores_tie_breaks() {
        let ranked = rank_top_stores(
            vec![
                ratings(1, "Beta", &[4, 4]),
                ratings(2, "Alpha", &[4, 4]),
                ratings(3, "Gamma", &[4, 4, 4]),
            ],
            TOP_MIN_REVIEWS,
            TOP_LIMIT,
        );
        let names: Vec<&str> = ranked.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Gamma", "Alpha", "Beta"]);
    }

    #[test]
    fn test_rank_top_stores_limits() {
        let rows = (0..15).map(|i| ratings(i, &format!("S{i:02}"), &[3, 4])).collect();
        assert_eq!(rank_top_stores(rows, TOP_MIN_REVIEWS, TOP_LIMIT).len(), 10);
    }

    #[test]
    fn test_confirm_owner() {
        assert!(confirm_owner(&store(1), &user(1)).is_ok());
        assert_eq!(
            confirm_owner(&store(1), &user(2)),
            Err(PermissionError::NotOwner)
        );
    }

    #[test]
    fn test_store_page_overflow() {
        let page = StorePage {
            stores: Vec::new(),
            pagination: Pagination::new(Some(9), PAGE_SIZE),
            count: 10,
            pages: 3,
        };
        assert_eq!(page.overflow_redirect(), Some(3));
    }
}
