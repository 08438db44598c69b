use crate::{
    api::ClientConfig,
    cli::{
        actions::{session, users, Action},
        globals::GlobalArgs,
    },
    session::{credentials::CredentialStore, SessionStore},
    storage::{FileStore, KeyValueStore, MemoryStore},
};
use anyhow::{Context, Result};
use tracing::debug;

/// Builds the session store described by `globals` and runs `action` on it.
/// # Errors
/// Returns an error if the configuration is invalid or the action fails.
pub async fn execute(action: Action, globals: &GlobalArgs) -> Result<()> {
    let config = ClientConfig::new(&globals.api_url)
        .with_context(|| format!("invalid API URL: {}", globals.api_url))?
        .with_timeout(globals.timeout);

    if globals.ephemeral {
        debug!("using in-memory credentials");
        run(action, config, MemoryStore::new()).await
    } else {
        debug!(path = %globals.store_path.display(), "using credentials file");
        run(action, config, FileStore::new(&globals.store_path)).await
    }
}

async fn run<S: KeyValueStore>(action: Action, config: ClientConfig, backend: S) -> Result<()> {
    let store = SessionStore::connect(config, CredentialStore::new(backend))?;

    match action {
        Action::Login(args) => session::login(&store, args).await,
        Action::Register(args) => session::register(&store, args).await,
        Action::Logout => session::logout(&store).await,
        Action::WhoAmI { refresh } => session::whoami(&store, refresh).await,
        Action::Users(args) => users::list(&store, args).await,
    }
}
