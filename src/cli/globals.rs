use std::{path::PathBuf, time::Duration};

pub const DEFAULT_STORE_PATH: &str = "medsession.json";

/// Options shared by every subcommand.
#[derive(Debug, Clone)]
pub struct GlobalArgs {
    pub api_url: String,
    pub store_path: PathBuf,
    pub ephemeral: bool,
    pub timeout: Duration,
}

impl GlobalArgs {
    #[must_use]
    pub fn new(api_url: String) -> Self {
        Self {
            api_url,
            store_path: PathBuf::from(DEFAULT_STORE_PATH),
            ephemeral: false,
            timeout: crate::api::DEFAULT_TIMEOUT,
        }
    }

    pub fn set_store_path(&mut self, path: PathBuf) {
        self.store_path = path;
    }
}
