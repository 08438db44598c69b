use super::KeyValueStore;
use serde_json::{Map, Value};
use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};
use tokio::{fs, sync::Mutex};
use tracing::{debug, instrument, warn};

/// Key-value store backed by a single JSON object file.
///
/// Every mutation rewrites the whole file through a sibling temp file and an
/// atomic rename, so a crash never leaves a half-written document behind. A
/// missing file reads as an empty store.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> io::Result<Map<String, Value>> {
        let contents = match fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Map::new()),
            Err(err) => return Err(err),
        };

        if contents.trim().is_empty() {
            return Ok(Map::new());
        }

        match serde_json::from_str::<Value>(&contents) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(io::Error::new(
                ErrorKind::InvalidData,
                format!("{} is not a JSON object", self.path.display()),
            )),
            Err(err) => Err(io::Error::new(ErrorKind::InvalidData, err)),
        }
    }

    /// Document to mutate. A corrupt file reads as empty and is flagged, so
    /// the caller rewrites it instead of failing every mutation.
    async fn load_for_update(&self) -> io::Result<(Map<String, Value>, bool)> {
        match self.load().await {
            Ok(map) => Ok((map, false)),
            Err(err) if err.kind() == ErrorKind::InvalidData => {
                warn!(
                    "{} is corrupt, starting from an empty document: {err}",
                    self.path.display()
                );
                Ok((Map::new(), true))
            }
            Err(err) => Err(err),
        }
    }

    async fn save(&self, map: &Map<String, Value>) -> io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        let payload = serde_json::to_vec_pretty(map).map_err(io::Error::other)?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, payload).await?;
        fs::rename(&tmp, &self.path).await?;

        debug!("saved {} keys to {}", map.len(), self.path.display());

        Ok(())
    }
}

impl KeyValueStore for FileStore {
    #[instrument(skip(self), fields(path = %self.path.display()))]
    async fn get(&self, key: &str) -> io::Result<Option<String>> {
        let _guard = self.lock.lock().await;
        let map = self.load().await?;
        Ok(map.get(key).and_then(Value::as_str).map(str::to_string))
    }

    #[instrument(skip(self, value), fields(path = %self.path.display()))]
    async fn set(&self, key: &str, value: &str) -> io::Result<()> {
        let _guard = self.lock.lock().await;
        let (mut map, _) = self.load_for_update().await?;
        map.insert(key.to_string(), Value::String(value.to_string()));
        self.save(&map).await
    }

    #[instrument(skip(self), fields(path = %self.path.display()))]
    async fn remove(&self, key: &str) -> io::Result<()> {
        let _guard = self.lock.lock().await;
        let (mut map, corrupt) = self.load_for_update().await?;
        if map.remove(key).is_some() || corrupt {
            self.save(&map).await?;
        }
        Ok(())
    }

    #[instrument(skip(self), fields(path = %self.path.display()))]
    async fn remove_many(&self, keys: &[&str]) -> io::Result<()> {
        let _guard = self.lock.lock().await;
        let (mut map, corrupt) = self.load_for_update().await?;
        let before = map.len();
        for key in keys {
            map.remove(*key);
        }
        if map.len() != before || corrupt {
            self.save(&map).await?;
        }
        Ok(())
    }
}
