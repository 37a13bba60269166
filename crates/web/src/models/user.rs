//! User domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use delicious_core::{Email, Hearts, StoreId, UserId};

/// A directory account (domain type).
///
/// Never carries the password hash; that is only read during login.
#[derive(Debug, Clone)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Login email address.
    pub email: Email,
    /// Display name.
    pub name: String,
    /// Stores this user has hearted.
    pub hearts: Hearts,
    /// When the user registered.
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Whether this user has hearted `store`.
    #[must_use]
    pub fn has_hearted(&self, store: StoreId) -> bool {
        self.hearts.contains(store)
    }
}

/// JSON shape returned by the heart endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct PublicUser {
    pub id: UserId,
    pub name: String,
    pub email: Email,
    pub hearts: Vec<StoreId>,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            hearts: user.hearts.into_vec(),
        }
    }
}
