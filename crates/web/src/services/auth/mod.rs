//! Authentication service.
//!
//! Username/password login against the `app_user` table. Which form fields
//! carry the username and password is decided by [`AuthConfig`] at startup.

mod error;

pub use error::AuthError;

use std::collections::HashMap;
use std::sync::LazyLock;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sqlx::PgPool;

use delicious_core::{Email, UserId};

use crate::config::AuthConfig;
use crate::db::RepositoryError;
use crate::db::users::UserRepository;
use crate::models::user::User;

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Hash verified against when the email is unknown, so that path costs the same Argon2 work.
static DUMMY_HASH: LazyLock<Option<String>> =
    LazyLock::new(|| hash_password("delicious-unknown-account").ok());

/// Username and password pulled out of a submitted form.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

impl Credentials {
    /// Extract credentials from form fields named by `config`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingField` if either configured field is absent.
    pub fn from_form(config: &AuthConfig, form: &HashMap<String, String>) -> Result<Self, AuthError> {
        let field = |name: &str| {
            form.get(name)
                .cloned()
                .ok_or_else(|| AuthError::MissingField(name.to_owned()))
        };

        Ok(Self {
            username: field(&config.username_field)?,
            password: field(&config.password_field)?,
        })
    }
}

/// A registration form submission.
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct Registration {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub password: String,
    #[serde(default, rename = "password-confirm")]
    pub password_confirm: String,
}

/// Authentication service.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            users: UserRepository::new(pool),
        }
    }

    /// Register a new account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingName`, `AuthError::InvalidEmail`,
    /// `AuthError::WeakPassword` or `AuthError::PasswordMismatch` for bad input.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    pub async fn register(&self, form: &Registration) -> Result<User, AuthError> {
        let name = validate_registration(form)?;
        let email = Email::parse(&form.email)?;
        let password_hash = hash_password(&form.password)?;

        let user = self
            .users
            .create(&email, name, &password_hash)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;

        tracing::info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    pub async fn login(&self, credentials: &Credentials) -> Result<User, AuthError> {
        let email = Email::parse(&credentials.username).map_err(|_| AuthError::InvalidCredentials)?;

        let found = self.users.get_with_password_hash(&email).await?;
        let (user, password_hash) = match found {
            Some((user, hash)) => (Some(user), Some(hash)),
            None => (None, None),
        };

        check_password(&credentials.password, password_hash.as_deref())?;

        user.ok_or(AuthError::InvalidCredentials)
    }

    /// Load the user a session refers to.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` if the database operation fails.
    pub async fn get_user(&self, id: UserId) -> Result<Option<User>, AuthError> {
        Ok(self.users.get_by_id(id).await?)
    }
}

/// Check the registration fields that don't need the database, returning the trimmed name.
fn validate_registration(form: &Registration) -> Result<&str, AuthError> {
    let name = form.name.trim();
    if name.is_empty() {
        return Err(AuthError::MissingName);
    }
    validate_password(&form.password)?;
    if form.password != form.password_confirm {
        return Err(AuthError::PasswordMismatch);
    }
    Ok(name)
}

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "Your password must be at least {MIN_PASSWORD_LENGTH} characters."
        )));
    }
    Ok(())
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify `password` against the stored hash, or against [`DUMMY_HASH`] when
/// there is no account. A missing account always fails.
fn check_password(password: &str, stored: Option<&str>) -> Result<(), AuthError> {
    match stored {
        Some(hash) => verify_password(password, hash),
        None => {
            if let Some(dummy) = DUMMY_HASH.as_deref() {
                let _ = verify_password(password, dummy);
            }
            Err(AuthError::InvalidCredentials)
        }
    }
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn form(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    fn registration(name: &str, password: &str, confirm: &str) -> Registration {
        Registration {
            email: "wes@example.com".to_owned(),
            name: name.to_owned(),
            password: password.to_owned(),
            password_confirm: confirm.to_owned(),
        }
    }

    #[test]
    fn test_credentials_use_default_fields() {
        let creds = Credentials::from_form(
            &AuthConfig::default(),
            &form(&[("email", "a@b.com"), ("password", "hunter22")]),
        )
        .unwrap();
        assert_eq!(creds.username, "a@b.com");
        assert_eq!(creds.password, "hunter22");
    }

    #[test]
    fn test_credentials_use_configured_fields() {
        let config = AuthConfig {
            username_field: "username".to_owned(),
            password_field: "pass".to_owned(),
        };
        let creds = Credentials::from_form(
            &config,
            &form(&[("username", "a@b.com"), ("pass", "secret!!")]),
        )
        .unwrap();
        assert_eq!(creds.username, "a@b.com");

        let missing = Credentials::from_form(&config, &form(&[("email", "a@b.com")]));
        assert!(matches!(missing, Err(AuthError::MissingField(f)) if f == "username"));
    }

    #[test]
    fn test_credentials_debug_hides_password() {
        let creds = Credentials {
            username: "a@b.com".to_owned(),
            password: "hunter22".to_owned(),
        };
        assert!(!format!("{creds:?}").contains("hunter22"));
    }

    #[test]
    fn test_registration_validation() {
        assert_eq!(
            validate_registration(&registration("  Wes ", "password1", "password1")).unwrap(),
            "Wes"
        );
        assert!(matches!(
            validate_registration(&registration(" ", "password1", "password1")),
            Err(AuthError::MissingName)
        ));
        assert!(matches!(
            validate_registration(&registration("Wes", "short", "short")),
            Err(AuthError::WeakPassword(_))
        ));
        assert!(matches!(
            validate_registration(&registration("Wes", "password1", "password2")),
            Err(AuthError::PasswordMismatch)
        ));
    }

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("correct horse", &hash).is_ok());
        assert!(matches!(
            verify_password("wrong horse", &hash),
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            verify_password("anything", "not-a-hash"),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_unknown_account_still_runs_argon2() {
        let dummy = DUMMY_HASH.as_deref().unwrap();
        assert!(PasswordHash::new(dummy).is_ok());
        assert!(dummy.starts_with("$argon2id$"));

        // Even the dummy's own password must not log anyone in.
        assert!(matches!(
            check_password("delicious-unknown-account", None),
            Err(AuthError::InvalidCredentials)
        ));

        let hash = hash_password("correct horse").unwrap();
        assert!(check_password("correct horse", Some(&hash)).is_ok());
        assert!(matches!(
            check_password("wrong horse", Some(&hash)),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_user_facing_errors() {
        assert!(AuthError::InvalidCredentials.is_user_facing());
        assert!(AuthError::PasswordMismatch.is_user_facing());
        assert!(!AuthError::PasswordHash.is_user_facing());
        assert!(!AuthError::Repository(RepositoryError::NotFound).is_user_facing());
    }
}
