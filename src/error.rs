use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// Transport failure or timeout reaching the identity API.
    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),
    /// The identity API answered with a non-success status.
    #[error("request rejected ({status}): {message}")]
    AuthRejected { status: u16, message: String },
    #[error("malformed response: {0}")]
    MalformedResponse(String),
    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),
    #[error("stored credentials are corrupt: {0}")]
    StorageCorrupt(#[source] serde_json::Error),
    /// A later session transition started before this call could commit.
    #[error("superseded by a later session transition")]
    Superseded,
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl Error {
    /// True when the server refused the credentials or token outright.
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::AuthRejected { status: 401 | 403, .. })
    }
}
