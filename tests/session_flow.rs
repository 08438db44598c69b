//! End-to-end flows: the real HTTP client against a mock identity API, with
//! credentials persisted to a file in a temporary directory.

use anyhow::Result;
use medsession::{
    api::ClientConfig,
    session::{credentials::CredentialStore, SessionStore, Status},
    storage::FileStore,
    Error,
};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};
use std::{net::TcpListener, path::Path, time::Duration};
use wiremock::{
    matchers::{header, method, path},
    Mock, MockServer, ResponseTemplate,
};

fn can_bind_localhost() -> bool {
    TcpListener::bind("127.0.0.1:0").is_ok()
}

type Store = SessionStore<medsession::api::ApiClient, FileStore, medsession::auth::HeaderBinder>;

fn store(uri: &str, file: &Path) -> Result<Store> {
    Ok(SessionStore::connect(
        ClientConfig::new(uri)?,
        CredentialStore::new(FileStore::new(file)),
    )?)
}

fn user_json(name: &str, image: Option<&str>) -> Value {
    let mut user = json!({
        "id": "42",
        "name": name,
        "email": "ana@clinic.test",
        "role": "patient",
    });
    if let Some(image) = image {
        user["image"] = json!(image);
    }
    user
}

fn credentials() -> medsession::api::LoginCredentials {
    medsession::api::LoginCredentials::new("ana@clinic.test", SecretString::from("pw"))
}

#[tokio::test]
async fn sign_in_survives_restart_and_refreshes() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;
    let dir = tempfile::tempdir()?;
    let file = dir.path().join("session.json");

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "user": user_json("Ana", None),
            "token": "tok-1",
            "userPic": "https://cdn.test/ana.png",
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/auth/me"))
        .and(header("authorization", "Bearer tok-1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"user": user_json("Ana Souza", None)})),
        )
        .mount(&server)
        .await;

    let first = store(&server.uri(), &file)?;
    let user = first.sign_in(&credentials()).await?;
    assert_eq!(user.image, "https://cdn.test/ana.png");
    drop(first);

    let second = store(&server.uri(), &file)?;
    let session = second.bootstrap().await;
    assert_eq!(session.status, Status::Authenticated);
    assert_eq!(session.user.as_ref().map(|u| u.name.as_str()), Some("Ana"));

    let refreshed = second.refresh().await?;
    let refreshed = refreshed.expect("refreshed user");
    assert_eq!(refreshed.name, "Ana Souza");
    assert_eq!(refreshed.image, "https://cdn.test/ana.png");

    let third = store(&server.uri(), &file)?;
    let session = third.bootstrap().await;
    assert_eq!(session.user.map(|u| u.name), Some("Ana Souza".to_string()));

    third.sign_out().await;
    assert!(third.credentials().read_pair().await?.is_none());
    assert_eq!(third.current().status, Status::Unauthenticated);

    Ok(())
}

#[tokio::test]
async fn sign_out_during_slow_sign_in_wins() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;
    let dir = tempfile::tempdir()?;
    let file = dir.path().join("session.json");

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"user": user_json("Ana", None), "token": "tok-1"}))
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&server)
        .await;

    let store = store(&server.uri(), &file)?;
    let login = credentials();
    let (signed_in, ()) = tokio::join!(store.sign_in(&login), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        store.sign_out().await;
    });

    assert!(matches!(signed_in, Err(Error::Superseded)));
    assert_eq!(store.current().status, Status::Unauthenticated);
    assert!(store.credentials().read_pair().await?.is_none());
    assert!(store.api().binder().headers().is_empty());

    Ok(())
}

#[tokio::test]
async fn rejected_refresh_signs_out() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;
    let dir = tempfile::tempdir()?;
    let file = dir.path().join("session.json");

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"user": user_json("Ana", None), "token": "tok-1"})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/auth/me"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"message": "token expired"})),
        )
        .mount(&server)
        .await;

    let store = store(&server.uri(), &file)?;
    store.sign_in(&credentials()).await?;

    let err = store.refresh().await.expect_err("refresh must fail");
    assert!(err.is_unauthorized());
    assert_eq!(store.current().status, Status::Unauthenticated);
    assert!(store.credentials().read_pair().await?.is_none());

    Ok(())
}

#[tokio::test]
async fn stored_token_is_the_bound_token() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;
    let dir = tempfile::tempdir()?;
    let file = dir.path().join("session.json");

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"user": user_json("Ana", None), "token": "tok-9"})),
        )
        .mount(&server)
        .await;

    let store = store(&server.uri(), &file)?;
    store.sign_in(&credentials()).await?;

    let (_, token) = store
        .credentials()
        .read_pair()
        .await?
        .expect("stored credentials");
    assert_eq!(token.expose_secret(), "tok-9");
    assert_eq!(
        store
            .api()
            .binder()
            .headers()
            .get("authorization")
            .and_then(|v| v.to_str().ok()),
        Some("Bearer tok-9")
    );

    Ok(())
}
