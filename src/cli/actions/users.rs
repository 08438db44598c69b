use crate::{
    cli::actions::session::{print, Store},
    session::user::Role,
    storage::KeyValueStore,
};
use anyhow::{bail, Result};
use serde_json::json;
use tracing::debug;

#[derive(Debug)]
pub struct Args {
    pub role: Option<Role>,
}

/// Lists users with the restored session's token.
/// # Errors
/// Returns an error if no session is stored or the request fails.
pub async fn list<S: KeyValueStore>(store: &Store<S>, args: Args) -> Result<()> {
    if !store.bootstrap().await.is_authenticated() {
        bail!("not signed in, run `medsession login` first");
    }

    let users = store.api().list_by_role(args.role).await?;
    debug!(count = users.len(), "users listed");
    print(&json!(users))
}
