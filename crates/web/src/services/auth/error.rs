//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that can occur during authentication operations.
///
/// The `Display` text of the user-facing variants is flashed verbatim on the
/// login and register forms.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("That email address doesn't look right: {0}.")]
    InvalidEmail(#[from] delicious_core::EmailError),

    /// Invalid credentials (wrong password or user not found).
    #[error("Failed Login!")]
    InvalidCredentials,

    /// User already exists.
    #[error("An account with that email already exists.")]
    UserAlreadyExists,

    /// Password too weak or invalid.
    #[error("{0}")]
    WeakPassword(String),

    /// Password and confirmation differ.
    #[error("Oops! Your passwords do not match.")]
    PasswordMismatch,

    /// Registration without a display name.
    #[error("You must supply a name!")]
    MissingName,

    /// A configured credential field was absent from the form.
    #[error("missing form field: {0}")]
    MissingField(String),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}

impl AuthError {
    /// Whether the error is the user's to fix (flash it) rather than a server fault.
    #[must_use]
    pub const fn is_user_facing(&self) -> bool {
        !matches!(self, Self::Repository(_) | Self::PasswordHash)
    }
}
