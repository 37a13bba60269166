//! End-to-end flows against a running server.
//!
//! These tests require:
//! - A migrated `PostgreSQL` database (`delicious migrate`)
//! - The web server running (`cargo run -p delicious-web`)

use delicious_integration_tests::{TestUser, client, location, store_id_from_page, url};
use reqwest::StatusCode;
use serde_json::Value;

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_health() {
    let response = client().get(url("/health/ready")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_store_lifecycle() {
    let user = TestUser::register().await;
    let path = user.add_store("Integration Coffee").await;
    assert!(path.starts_with("/store/integration-coffee"));

    let (status, body) = user.page(&path).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Successfully Created Integration Coffee"));
    assert!(body.contains(&user.name));

    // Same name again gets a suffixed slug
    let second = user.add_store("Integration Coffee").await;
    assert_ne!(second, path);
    assert!(second.starts_with("/store/integration-coffee-"));
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_heart_toggle() {
    let user = TestUser::register().await;
    let path = user.add_store("Heart Test Cafe").await;
    let (_, body) = user.page(&path).await;
    let id = store_id_from_page(&body).unwrap();

    let heart = |client: &reqwest::Client| {
        client
            .post(url(&format!("/api/stores/{id}/heart")))
            .send()
    };

    let first: Value = heart(&user.client).await.unwrap().json().await.unwrap();
    assert_eq!(first["hearts"].as_array().unwrap().len(), 1);
    assert_eq!(first["email"], user.email.as_str());
    assert!(first.get("password_hash").is_none());

    let second: Value = heart(&user.client).await.unwrap().json().await.unwrap();
    assert!(second["hearts"].as_array().unwrap().is_empty());

    let anonymous = heart(&client()).await.unwrap();
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

    let missing = user
        .client
        .post(url("/api/stores/2147483647/heart"))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_only_owner_can_edit() {
    let owner = TestUser::register().await;
    let path = owner.add_store("Owned Store").await;
    let (_, body) = owner.page(&path).await;
    let id = store_id_from_page(&body).unwrap();

    let (status, _) = owner.page(&format!("/stores/{id}/edit")).await;
    assert_eq!(status, StatusCode::OK);

    let other = TestUser::register().await;
    let (status, _) = other.page(&format!("/stores/{id}/edit")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let form = reqwest::multipart::Form::new().text("name", "Hijacked");
    let response = other
        .client
        .post(url(&format!("/add/{id}")))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let (_, body) = owner.page(&path).await;
    assert!(body.contains("Owned Store"));
    assert!(!body.contains("Hijacked"));
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_non_image_upload_is_rejected() {
    let user = TestUser::register().await;
    let part = reqwest::multipart::Part::bytes(b"not an image".to_vec())
        .file_name("notes.txt")
        .mime_str("text/plain")
        .unwrap();
    let form = reqwest::multipart::Form::new()
        .text("name", "Text Photo Store")
        .text("address", "1 Test Street")
        .text("lng", "-79.3832")
        .text("lat", "43.6532")
        .part("photo", part);

    let response = user
        .client
        .post(url("/add"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(location(&response), "/add");

    let (_, body) = user.page("/add").await;
    assert!(body.contains("That filetype isn&#x27;t allowed!") || body.contains("That filetype isn't allowed!"));
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_reviews_feed_top_stores() {
    let owner = TestUser::register().await;
    let path = owner.add_store("Top Rated Test Diner").await;
    let (_, body) = owner.page(&path).await;
    let id = store_id_from_page(&body).unwrap();

    for rating in ["4", "5"] {
        let reviewer = TestUser::register().await;
        let response = reviewer
            .client
            .post(url(&format!("/reviews/{id}")))
            .form(&[("text", "Lovely."), ("rating", rating)])
            .send()
            .await
            .unwrap();
        assert_eq!(location(&response), path);
    }

    let (status, body) = owner.page("/top").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Top Rated Test Diner") || body.contains("Top 10 Stores"));
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_search_and_near_api() {
    let user = TestUser::register().await;
    user.add_store("Searchable Espresso Bar").await;

    let results: Value = client()
        .get(url("/api/search?q=espresso"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let results = results.as_array().unwrap();
    assert!(results.len() <= 5);
    assert!(!results.is_empty());

    let near: Value = client()
        .get(url("/api/stores/near?lat=43.6532&lng=-79.3832"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let near = near.as_array().unwrap();
    assert!(!near.is_empty() && near.len() <= 10);
    assert_eq!(near[0]["location"]["type"], "Point");

    let bad = client()
        .get(url("/api/stores/near?lat=north&lng=west"))
        .send()
        .await
        .unwrap();
    assert_eq!(bad.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_page_overflow_redirects() {
    let response = client().get(url("/stores/page/100000")).send().await.unwrap();
    assert!(location(&response).starts_with("/stores/page/"));
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_login_logout() {
    let user = TestUser::register().await;
    let response = user.client.post(url("/logout")).send().await.unwrap();
    assert_eq!(location(&response), "/");

    let response = user.client.get(url("/hearts")).send().await.unwrap();
    assert_eq!(location(&response), "/login");

    let response = user
        .client
        .post(url("/login"))
        .form(&[("email", user.email.as_str()), ("password", "wrong password")])
        .send()
        .await
        .unwrap();
    assert_eq!(location(&response), "/login");

    let response = user
        .client
        .post(url("/login"))
        .form(&[("email", user.email.as_str()), ("password", "correct horse")])
        .send()
        .await
        .unwrap();
    assert_eq!(location(&response), "/");

    let (status, _) = user.page("/hearts").await;
    assert_eq!(status, StatusCode::OK);
}
