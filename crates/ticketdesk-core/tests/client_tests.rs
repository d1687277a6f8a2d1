//! Integration tests for the typed dashboard client

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde_json::json;
use ticketdesk_core::api::{ApiError, AuthFetch, DashboardClient, DashboardSummary};
use ticketdesk_core::auth::{
    CredentialStore, FileSessionProvider, Role, SessionProvider, UnauthorizedBridge,
};
use ticketdesk_core::models::{NewOrganizer, NewUser};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Harness {
    client: DashboardClient,
    store: CredentialStore,
    session: Arc<FileSessionProvider>,
    _dir: tempfile::TempDir,
}

fn harness(base_url: &str) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let store = CredentialStore::in_memory();
    let session = Arc::new(FileSessionProvider::new(dir.path().to_path_buf()));
    let fetch = AuthFetch::new(
        base_url,
        store.clone(),
        session.clone(),
        UnauthorizedBridge::new(),
        None,
    )
    .unwrap();

    Harness {
        client: DashboardClient::new(fetch),
        store,
        session,
        _dir: dir,
    }
}

#[tokio::test]
async fn test_login_writes_store_and_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .and(body_json(json!({ "email": "staff@example.com", "password": "hunter2" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": "jwt-abc",
            "user": {
                "id": "u-7",
                "email": "staff@example.com",
                "role": "organizer",
                "organizerId": "org-3"
            }
        })))
        .mount(&server)
        .await;

    let h = harness(&server.uri());
    let data = h.client.login("staff@example.com", "hunter2").await.unwrap();

    assert_eq!(data.role, Role::Organizer);
    assert_eq!(data.organizer_id.as_deref(), Some("org-3"));
    assert_eq!(h.store.get().unwrap().as_str(), "jwt-abc");
    assert_eq!(h.session.token().await.as_deref(), Some("jwt-abc"));
}

#[tokio::test]
async fn test_login_keeps_store_empty_when_session_cannot_be_saved() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": "jwt-abc",
            "user": { "id": "u-7", "email": "staff@example.com", "role": "staff" }
        })))
        .mount(&server)
        .await;

    // Session directory sits under a regular file, so saving the session fails
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, "").unwrap();
    let store = CredentialStore::in_memory();
    let session = Arc::new(FileSessionProvider::new(blocker.join("cache")));
    let fetch = AuthFetch::new(
        server.uri(),
        store.clone(),
        session,
        UnauthorizedBridge::new(),
        None,
    )
    .unwrap();
    let client = DashboardClient::new(fetch);

    let err = client.login("staff@example.com", "hunter2").await.unwrap_err();
    assert!(matches!(err, ApiError::Session(_)));
    assert!(store.get().is_none());
}

#[tokio::test]
async fn test_rejected_login_leaves_state_untouched() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad credentials"))
        .mount(&server)
        .await;

    let h = harness(&server.uri());
    let signals = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&signals);
    let _sub = h.client.fetch().bridge().subscribe(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    let err = h.client.login("staff@example.com", "wrong").await.unwrap_err();
    assert!(err.is_unauthorized());
    assert!(h.store.get().is_none());
    assert!(h.session.token().await.is_none());
    // A rejected password is not a session expiry
    assert_eq!(signals.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_list_organizers_uses_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/organizers"))
        .and(header("authorization", "Bearer abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": "org-1", "name": "Harbor Nights", "email": "team@harbor.example", "phone": null },
            { "id": "org-2", "name": "Dune Fest", "email": null, "phone": "+49 30 1234", "venue": "Tempelhof" }
        ])))
        .mount(&server)
        .await;

    let h = harness(&server.uri());
    h.store.set("abc123");

    let organizers = h.client.organizers().await.unwrap();
    assert_eq!(organizers.len(), 2);
    assert_eq!(organizers[1].contact(), "+49 30 1234");
    assert_eq!(organizers[1].details["venue"], "Tempelhof");
}

#[tokio::test]
async fn test_participants_filtered_by_organizer() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/participants"))
        .and(query_param("organizerId", "org 1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": "p1", "name": "Ada", "email": "ada@example.com", "organizerId": "org 1", "ticket": "VIP" }
        ])))
        .mount(&server)
        .await;

    let h = harness(&server.uri());
    let participants = h.client.participants(Some("org 1")).await.unwrap();
    assert_eq!(participants.len(), 1);
    assert_eq!(participants[0].details["ticket"], "VIP");
}

#[tokio::test]
async fn test_register_organizer_and_user() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/organizers"))
        .and(body_json(json!({ "name": "Harbor Nights", "email": "team@harbor.example" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "org-9", "name": "Harbor Nights", "email": "team@harbor.example", "phone": null
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/users"))
        .and(body_json(json!({ "email": "door@example.com", "password": "s3cret", "role": "staff", "organizerId": "org-9" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "u-1", "email": "door@example.com", "role": "staff", "organizerId": "org-9"
        })))
        .mount(&server)
        .await;

    let h = harness(&server.uri());

    let organizer = h
        .client
        .register_organizer(&NewOrganizer {
            name: "Harbor Nights".into(),
            email: "team@harbor.example".into(),
            phone: None,
        })
        .await
        .unwrap();
    assert_eq!(organizer.id, "org-9");

    let user = h
        .client
        .register_user(&NewUser {
            email: "door@example.com".into(),
            password: "s3cret".into(),
            role: Role::Staff,
            organizer_id: Some(organizer.id.clone()),
        })
        .await
        .unwrap();
    assert_eq!(user.role, Role::Staff);
}

#[tokio::test]
async fn test_status_errors_are_typed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/organizers/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string("no such organizer"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/organizers/broken/transactions"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&server)
        .await;

    let h = harness(&server.uri());

    let err = h.client.organizer("missing").await.unwrap_err();
    assert!(matches!(err, ApiError::NotFound(body) if body == "no such organizer"));

    let err = h.client.transactions("broken").await.unwrap_err();
    assert!(matches!(err, ApiError::InvalidResponse(_)));
}

#[tokio::test]
async fn test_ids_are_encoded_as_single_path_segments() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/organizers/a%2Fb%3Fc%23d"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "a/b?c#d", "name": "Odd Id"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/organizers/org%201/transactions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let h = harness(&server.uri());

    let organizer = h.client.organizer("a/b?c#d").await.unwrap();
    assert_eq!(organizer.name, "Odd Id");
    assert!(h.client.transactions("org 1").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_ids_keep_base_url_path_prefix() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/organizers/org-1/transactions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let h = harness(&format!("{}/api/", server.uri()));
    assert!(h.client.transactions("org-1").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_summary_widgets_fail_independently() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/organizers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": "org-1", "name": "Harbor Nights" }
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/participants"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let h = harness(&server.uri());
    let summary = h.client.summary().await;

    assert_eq!(
        summary,
        DashboardSummary {
            organizers: Some(1),
            participants: None,
            users: Some(0),
        }
    );
}

#[tokio::test]
async fn test_logout_clears_both_holders() {
    let h = harness("http://127.0.0.1:1");
    h.store.set("abc123");

    h.client.logout().await.unwrap();
    assert!(h.store.get().is_none());
    assert!(h.session.token().await.is_none());

    // Logging out twice is fine
    h.client.logout().await.unwrap();
}
