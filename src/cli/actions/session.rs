use crate::{
    api::{ApiClient, LoginCredentials, RegisterPayload},
    auth::HeaderBinder,
    session::{user::Role, user::User, Session, SessionStore, Status},
    storage::KeyValueStore,
};
use anyhow::Result;
use secrecy::SecretString;
use serde_json::{json, Value};
use tracing::info;

pub type Store<S> = SessionStore<ApiClient, S, HeaderBinder>;

#[derive(Debug)]
pub struct LoginArgs {
    pub email: String,
    pub password: SecretString,
}

#[derive(Debug)]
pub struct RegisterArgs {
    pub name: String,
    pub email: String,
    pub password: SecretString,
    pub role: Role,
}

const fn status_label(status: Status) -> &'static str {
    match status {
        Status::Idle => "idle",
        Status::Loading => "loading",
        Status::Authenticated => "authenticated",
        Status::Unauthenticated => "unauthenticated",
    }
}

pub(super) fn session_json(session: &Session) -> Value {
    json!({
        "status": status_label(session.status),
        "user": session.user,
    })
}

pub(super) fn print(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_user(user: &User) -> Result<()> {
    print(&session_json(&Session::authenticated(user.clone())))
}

/// # Errors
/// Returns an error if the credentials are rejected or cannot be persisted.
pub async fn login<S: KeyValueStore>(store: &Store<S>, args: LoginArgs) -> Result<()> {
    let credentials = LoginCredentials::new(args.email, args.password);
    let user = store.sign_in(&credentials).await?;
    info!(user = %user.id, "signed in");
    print_user(&user)
}

/// # Errors
/// Returns an error if the account cannot be created or persisted.
pub async fn register<S: KeyValueStore>(store: &Store<S>, args: RegisterArgs) -> Result<()> {
    let payload = RegisterPayload {
        name: args.name,
        email: args.email,
        password: args.password,
        role: args.role,
        extra: serde_json::Map::new(),
    };
    let user = store.register(&payload).await?;
    info!(user = %user.id, role = %user.role, "registered");
    print_user(&user)
}

/// # Errors
/// Returns an error if the result cannot be printed.
pub async fn logout<S: KeyValueStore>(store: &Store<S>) -> Result<()> {
    store.bootstrap().await;
    store.sign_out().await;
    print(&session_json(&store.current()))
}

/// Prints the persisted session, optionally revalidated against `/me`.
/// # Errors
/// Returns an error if the refresh fails.
pub async fn whoami<S: KeyValueStore>(store: &Store<S>, refresh: bool) -> Result<()> {
    let session = store.bootstrap().await;
    if refresh && session.is_authenticated() {
        store.refresh().await?;
    }
    print(&session_json(&store.current()))
}
