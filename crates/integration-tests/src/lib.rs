//! Live-server integration tests for the Delicious directory.
//!
//! # Running Tests
//!
//! ```bash
//! delicious migrate
//! cargo run -p delicious-web &
//! cargo test -p delicious-integration-tests -- --ignored
//! ```
//!
//! `DELICIOUS_TEST_URL` points the tests at another server
//! (default `http://localhost:7777`). Every test registers its own account,
//! so runs don't interfere with each other.

use reqwest::{Client, Response, StatusCode, header::LOCATION, redirect::Policy};
use uuid::Uuid;

/// Base URL of the server under test.
#[must_use]
pub fn base_url() -> String {
    std::env::var("DELICIOUS_TEST_URL").unwrap_or_else(|_| "http://localhost:7777".to_string())
}

/// Absolute URL for `path`.
#[must_use]
pub fn url(path: &str) -> String {
    format!("{}{path}", base_url())
}

/// A client with its own cookie jar that does not follow redirects.
///
/// # Panics
///
/// Panics if the client cannot be built.
#[must_use]
pub fn client() -> Client {
    Client::builder()
        .cookie_store(true)
        .redirect(Policy::none())
        .build()
        .expect("Failed to create HTTP client")
}

/// `Location` header of a redirect response.
///
/// # Panics
///
/// Panics if the response is not a 303 with a `Location`.
#[must_use]
pub fn location(response: &Response) -> String {
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    response
        .headers()
        .get(LOCATION)
        .and_then(|v| v.to_str().ok())
        .expect("redirect without Location")
        .to_string()
}

/// A freshly registered, logged-in account.
pub struct TestUser {
    pub client: Client,
    pub email: String,
    pub name: String,
}

impl TestUser {
    /// Register a new account on its own client.
    ///
    /// # Panics
    ///
    /// Panics if registration does not redirect home.
    pub async fn register() -> Self {
        let client = client();
        let id = Uuid::new_v4().simple().to_string();
        let email = format!("test-{id}@example.com");
        let name = format!("Tester {}", id.get(..6).unwrap_or_default());

        let response = client
            .post(url("/register"))
            .form(&[
                ("name", name.as_str()),
                ("email", email.as_str()),
                ("password", "correct horse"),
                ("password-confirm", "correct horse"),
            ])
            .send()
            .await
            .expect("register request failed");
        assert_eq!(location(&response), "/");

        Self {
            client,
            email,
            name,
        }
    }

    /// Create a store without a photo, returning its page path (`/store/<slug>`).
    ///
    /// # Panics
    ///
    /// Panics if the store is not created.
    pub async fn add_store(&self, name: &str) -> String {
        let form = reqwest::multipart::Form::new()
            .text("name", name.to_string())
            .text("description", "Integration test store with good coffee.")
            .text("address", "1 Test Street")
            .text("lng", "-79.3832")
            .text("lat", "43.6532")
            .text("tags", "Wifi");

        let response = self
            .client
            .post(url("/add"))
            .multipart(form)
            .send()
            .await
            .expect("add store request failed");
        let path = location(&response);
        assert!(path.starts_with("/store/"), "unexpected redirect {path}");
        path
    }

    /// Fetch a page body.
    ///
    /// # Panics
    ///
    /// Panics if the request fails.
    pub async fn page(&self, path: &str) -> (StatusCode, String) {
        let response = self.client.get(url(path)).send().await.expect("request failed");
        let status = response.status();
        (status, response.text().await.expect("unreadable body"))
    }
}

/// Pull the numeric store id out of a store page (from its review form action).
#[must_use]
pub fn store_id_from_page(body: &str) -> Option<String> {
    let start = body.find("/reviews/")? + "/reviews/".len();
    let rest = body.get(start..)?;
    let end = rest.find('"')?;
    rest.get(..end).map(str::to_string)
}
