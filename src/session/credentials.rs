//! The persisted `(user, token)` record. Both halves live under their own key;
//! a record missing either half, or whose user does not parse, reads as absent.

use crate::{
    error::{Error, Result},
    session::user::User,
    storage::KeyValueStore,
};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, instrument, warn};

pub const USER_KEY: &str = "@MedicalApp:user";
pub const TOKEN_KEY: &str = "@MedicalApp:token";

/// Storage keys for the two halves of the record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageKeys {
    pub user: String,
    pub token: String,
}

impl Default for StorageKeys {
    fn default() -> Self {
        Self {
            user: USER_KEY.to_string(),
            token: TOKEN_KEY.to_string(),
        }
    }
}

#[derive(Debug)]
pub struct CredentialStore<S> {
    backend: S,
    keys: StorageKeys,
}

impl<S: KeyValueStore> CredentialStore<S> {
    pub fn new(backend: S) -> Self {
        Self::with_keys(backend, StorageKeys::default())
    }

    pub fn with_keys(backend: S, keys: StorageKeys) -> Self {
        Self { backend, keys }
    }

    pub fn backend(&self) -> &S {
        &self.backend
    }

    /// Persists both halves. If the token cannot be written the user entry is
    /// removed again so no half record is left behind.
    ///
    /// # Errors
    /// Returns [`Error::Storage`] if either write fails.
    #[instrument(skip_all, fields(user_id = %user.id))]
    pub async fn write(&self, user: &User, token: &SecretString) -> Result<()> {
        let serialized = serde_json::to_string(user).map_err(Error::StorageCorrupt)?;

        self.backend.set(&self.keys.user, &serialized).await?;

        if let Err(err) = self
            .backend
            .set(&self.keys.token, token.expose_secret())
            .await
        {
            warn!("token write failed, rolling back user entry: {err}");
            if let Err(rollback) = self.backend.remove(&self.keys.user).await {
                warn!("rollback of user entry failed: {rollback}");
            }
            return Err(err.into());
        }

        debug!("credentials persisted");

        Ok(())
    }

    /// Replaces the stored user, keeping the token as is.
    ///
    /// # Errors
    /// Returns [`Error::Storage`] if the write fails.
    pub async fn write_user(&self, user: &User) -> Result<()> {
        let serialized = serde_json::to_string(user).map_err(Error::StorageCorrupt)?;
        self.backend.set(&self.keys.user, &serialized).await?;
        Ok(())
    }

    /// Loads the record. Missing halves and unparseable user JSON are `None`.
    ///
    /// # Errors
    /// Returns [`Error::Storage`] only for I/O failures of the backend.
    #[instrument(skip_all)]
    pub async fn read_pair(&self) -> Result<Option<(User, SecretString)>> {
        let user_json = self.backend.get(&self.keys.user).await?;
        let token = self.backend.get(&self.keys.token).await?;

        let (Some(user_json), Some(token)) = (user_json, token) else {
            debug!("no complete credentials record stored");
            return Ok(None);
        };

        if token.is_empty() {
            debug!("stored token is empty");
            return Ok(None);
        }

        match serde_json::from_str::<User>(&user_json) {
            Ok(user) => Ok(Some((user, SecretString::from(token)))),
            Err(err) => {
                warn!("{}", Error::StorageCorrupt(err));
                Ok(None)
            }
        }
    }

    /// Removes both halves, attempting each even if the other fails.
    ///
    /// # Errors
    /// Returns [`Error::Storage`] with the first removal failure.
    #[instrument(skip_all)]
    pub async fn clear(&self) -> Result<()> {
        self.backend
            .remove_many(&[self.keys.user.as_str(), self.keys.token.as_str()])
            .await?;
        Ok(())
    }
}
