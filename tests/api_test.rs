// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: (C) 2025 Cranky Kernel <crankykernel@proton.me>

//! HTTP client tests: auth gate, cached fetches, accounts and profiles.

use iptv_client::cache::ManualClock;
use iptv_client::models::NewFavourite;
use iptv_client::{
    AccountError, ApiClient, ClientError, FileStorage, LocalCache, MemoryStorage, SessionStore,
    Storage,
};
use mockito::{Matcher, Server};
use std::sync::Arc;
use std::time::Duration;

fn client_with(
    server: &Server,
    storage: Arc<dyn Storage>,
    clock: Arc<ManualClock>,
    token: Option<&str>,
) -> ApiClient {
    let session = SessionStore::new(storage.clone());
    if let Some(token) = token {
        session.set_token(token).unwrap();
    }
    ApiClient::new(
        &server.url(),
        session,
        LocalCache::with_clock(storage, clock),
        Duration::from_secs(5),
    )
    .unwrap()
}

fn client(server: &Server) -> ApiClient {
    client_with(
        server,
        Arc::new(MemoryStorage::new()),
        Arc::new(ManualClock::new(0)),
        Some("tok"),
    )
}

// =============================================================================
// Cached fetch
// =============================================================================

#[tokio::test]
async fn test_cached_fetch_issues_one_request_within_ttl() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/categories/live")
        .match_header("authorization", "Bearer tok")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"[{"category_id": 1, "category_name": "News"}]"#)
        .expect(1)
        .create_async()
        .await;

    let api = client(&server);
    let first = api
        .cached_fetch_json("/categories/live", Some(600), false)
        .await
        .unwrap();
    let second = api
        .cached_fetch_json("/categories/live", Some(600), false)
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(first, second);
    assert_eq!(first[0]["category_name"], "News");
}

#[tokio::test]
async fn test_cached_fetch_refetches_after_expiry() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/categories/vod")
        .with_status(200)
        .with_body("[]")
        .expect(2)
        .create_async()
        .await;

    let clock = Arc::new(ManualClock::new(1_000));
    let api = client_with(
        &server,
        Arc::new(MemoryStorage::new()),
        clock.clone(),
        Some("tok"),
    );

    api.cached_fetch_json("/categories/vod", Some(10), false)
        .await
        .unwrap();
    clock.advance(10_000);
    api.cached_fetch_json("/categories/vod", Some(10), false)
        .await
        .unwrap();
    clock.advance(1);
    api.cached_fetch_json("/categories/vod", Some(10), false)
        .await
        .unwrap();

    mock.assert_async().await;
}

#[tokio::test]
async fn test_bypass_skips_cache_and_error_bodies_are_not_cached() {
    let mut server = Server::new_async().await;
    let failing = server
        .mock("GET", "/streams/live/3")
        .with_status(500)
        .with_body(r#"{"error": "upstream down"}"#)
        .expect(2)
        .create_async()
        .await;

    let api = client(&server);
    let body = api
        .cached_fetch_json("/streams/live/3", None, false)
        .await
        .unwrap();
    assert_eq!(body["error"], "upstream down");
    api.cached_fetch_json("/streams/live/3", None, false)
        .await
        .unwrap();
    failing.assert_async().await;

    let ok = server
        .mock("GET", "/streams/vod/3")
        .with_status(200)
        .with_body("[]")
        .expect(2)
        .create_async()
        .await;
    api.cached_fetch_json("/streams/vod/3", None, false)
        .await
        .unwrap();
    api.cached_fetch_json("/streams/vod/3", None, true)
        .await
        .unwrap();
    ok.assert_async().await;
}

#[tokio::test]
async fn test_cache_survives_on_disk() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/info/vod/7")
        .with_status(200)
        .with_body(r#"{"info": {"plot": "On disk"}}"#)
        .expect(1)
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let clock = Arc::new(ManualClock::new(0));
    let first = client_with(
        &server,
        Arc::new(FileStorage::open(dir.path()).unwrap()),
        clock.clone(),
        Some("tok"),
    );
    first.vod_info("7", 1200).await.unwrap();

    let second = client_with(
        &server,
        Arc::new(FileStorage::open(dir.path()).unwrap()),
        clock,
        None,
    );
    let info = second.vod_info("7", 1200).await.unwrap();

    mock.assert_async().await;
    assert_eq!(info.info.unwrap().plot.as_deref(), Some("On disk"));
}

// =============================================================================
// Auth gate
// =============================================================================

#[tokio::test]
async fn test_requests_without_token_fail_locally() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let api = client_with(
        &server,
        Arc::new(MemoryStorage::new()),
        Arc::new(ManualClock::new(0)),
        None,
    );
    let err = api
        .cached_fetch_json("/categories/live", None, false)
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::NotAuthenticated));
    assert!(err.is_unauthenticated());
    mock.assert_async().await;
}

// =============================================================================
// Accounts
// =============================================================================

#[tokio::test]
async fn test_login_stores_token() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/login")
        .match_body(Matcher::Json(
            serde_json::json!({"email": "a@b.c", "password": "pw"}),
        ))
        .with_status(200)
        .with_body(r#"{"token": "fresh"}"#)
        .create_async()
        .await;

    let api = client_with(
        &server,
        Arc::new(MemoryStorage::new()),
        Arc::new(ManualClock::new(0)),
        None,
    );
    api.login(" a@b.c ", "pw").await.unwrap();

    mock.assert_async().await;
    assert_eq!(api.session().token().as_deref(), Some("fresh"));
}

#[tokio::test]
async fn test_login_errors() {
    let mut server = Server::new_async().await;
    let api = client(&server);

    assert!(matches!(
        api.login("", "pw").await,
        Err(AccountError::MissingCredentials)
    ));

    server
        .mock("POST", "/login")
        .with_status(401)
        .with_body(r#"{"error": "Bad credentials"}"#)
        .create_async()
        .await;
    let err = api.login("a@b.c", "wrong").await.unwrap_err();
    assert_eq!(err.to_string(), "Bad credentials");

    server
        .mock("POST", "/register")
        .with_status(400)
        .with_body("{}")
        .create_async()
        .await;
    let err = api.register("a@b.c", "pw").await.unwrap_err();
    assert_eq!(err.to_string(), "Registration failed");
}

#[tokio::test]
async fn test_iptv_credentials_require_all_fields() {
    let server = Server::new_async().await;
    let api = client(&server);
    let err = api
        .save_iptv_credentials("http://p.tv", "", "pw")
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "All IPTV fields are required.");
}

// =============================================================================
// Profiles and favourites
// =============================================================================

#[tokio::test]
async fn test_profiles_select_first_when_none_selected() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/profiles")
        .with_status(200)
        .with_body(r#"[{"id": 4, "name": "Kids"}, {"id": 5, "name": "Me"}]"#)
        .create_async()
        .await;

    let api = client(&server);
    let profiles = api.profiles().await.unwrap();

    assert_eq!(profiles.len(), 2);
    assert_eq!(api.session().profile_id().as_deref(), Some("4"));

    api.session().set_profile_id("5").unwrap();
    api.profiles().await.unwrap();
    assert_eq!(api.session().profile_id().as_deref(), Some("5"));
}

#[tokio::test]
async fn test_add_favourite_needs_profile() {
    let mut server = Server::new_async().await;
    let api = client(&server);
    let favourite = NewFavourite {
        content_type: "vod".to_string(),
        item_id: "42".to_string(),
        title: "Film".to_string(),
        thumbnail: String::new(),
    };

    let err = api.add_favourite(&favourite).await.unwrap_err();
    assert_eq!(err.to_string(), "Create a profile first");

    api.session().set_profile_id("4").unwrap();
    let mock = server
        .mock("POST", "/profiles/4/favourites")
        .match_body(Matcher::PartialJson(
            serde_json::json!({"content_type": "vod", "item_id": "42"}),
        ))
        .with_status(201)
        .with_body(r#"{"id": 99}"#)
        .create_async()
        .await;
    let fid = api.add_favourite(&favourite).await.unwrap();
    mock.assert_async().await;
    assert_eq!(fid, "99");

    server
        .mock("DELETE", "/profiles/4/favourites/99")
        .with_status(200)
        .with_body("{}")
        .create_async()
        .await;
    api.remove_favourite("99").await.unwrap();
}
