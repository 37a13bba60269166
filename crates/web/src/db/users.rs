//! User repository for database operations.

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};

use delicious_core::{Email, Hearts, StoreId, UserId};

use super::{RepositoryError, conflict_on_unique};
use crate::models::user::User;

const USER_COLUMNS: &str = "id, email, name, hearts, created_at";

#[derive(sqlx::FromRow)]
struct UserRow {
    id: UserId,
    email: String,
    name: String,
    hearts: Vec<StoreId>,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            id: row.id,
            email,
            name: row.name,
            hearts: Hearts::from_ids(row.hearts),
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct CredentialRow {
    #[sqlx(flatten)]
    user: UserRow,
    password_hash: String,
}

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a user by their ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the email in the database is invalid.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM directory.app_user WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    /// Get a user by their email address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM directory.app_user WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    /// Create a new user with a password hash.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(
        &self,
        email: &Email,
        name: &str,
        password_hash: &str,
    ) -> Result<User, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r"
            INSERT INTO directory.app_user (email, name, password_hash)
            VALUES ($1, $2, $3)
            RETURNING {USER_COLUMNS}
            "
        ))
        .bind(email)
        .bind(name)
        .bind(password_hash)
        .fetch_one(self.pool)
        .await
        .map_err(conflict_on_unique("email"))?;

        User::try_from(row)
    }

    /// Get a user together with their password hash, for login.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_with_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let row = sqlx::query_as::<_, CredentialRow>(&format!(
            "SELECT {USER_COLUMNS}, password_hash FROM directory.app_user WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let user = User::try_from(row.user)?;
        Ok(Some((user, row.password_hash)))
    }

    /// Toggle `store` in the user's hearts and return the updated user.
    ///
    /// The user row is locked for the duration so concurrent toggles by the
    /// same user serialize instead of overwriting each other.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the store or user doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn toggle_heart(
        &self,
        user_id: UserId,
        store: StoreId,
    ) -> Result<User, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let store_exists: Option<(StoreId,)> =
            sqlx::query_as("SELECT id FROM directory.store WHERE id = $1")
                .bind(store)
                .fetch_optional(&mut *tx)
                .await?;
        if store_exists.is_none() {
            return Err(RepositoryError::NotFound);
        }

        let mut hearts = lock_hearts(&mut tx, user_id).await?;
        let change = hearts.toggle(store);
        tracing::debug!(user_id = %user_id, store_id = %store, ?change, "Toggled heart");

        let row = sqlx::query_as::<_, UserRow>(&format!(
            r"
            UPDATE directory.app_user
            SET hearts = $2
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "
        ))
        .bind(user_id)
        .bind(hearts.as_slice())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        User::try_from(row)
    }
}

/// Read a user's hearts with the row locked `FOR UPDATE`.
async fn lock_hearts(
    tx: &mut Transaction<'_, Postgres>,
    user_id: UserId,
) -> Result<Hearts, RepositoryError> {
    let row: Option<(Vec<StoreId>,)> =
        sqlx::query_as("SELECT hearts FROM directory.app_user WHERE id = $1 FOR UPDATE")
            .bind(user_id)
            .fetch_optional(&mut **tx)
            .await?;

    row.map(|(ids,)| Hearts::from_ids(ids))
        .ok_or(RepositoryError::NotFound)
}
