//! Account management commands.

use delicious_web::services::auth::{AuthService, Registration};

/// Create an account from the command line.
///
/// # Errors
///
/// Returns an error for invalid input, a duplicate email, or database failures.
pub async fn create(email: &str, name: &str, password: &str) -> Result<(), Box<dyn std::error::Error>> {
    let pool = super::connect().await?;

    let registration = Registration {
        email: email.to_owned(),
        name: name.to_owned(),
        password: password.to_owned(),
        password_confirm: password.to_owned(),
    };
    let user = AuthService::new(&pool).register(&registration).await?;

    tracing::info!(user_id = %user.id, email = %user.email, "User created");
    Ok(())
}
