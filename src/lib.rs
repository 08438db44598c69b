//! # Medsession (authenticated session manager)
//!
//! `medsession` owns the client side of authentication for the medical
//! appointments app: it signs users in and out, restores the last session from
//! durable storage, revalidates it against the identity API, and keeps every
//! outgoing request authorized with the current bearer token.
//!
//! ## Components
//!
//! - [`storage`]: durable key-value backends (file and in-memory).
//! - [`session::credentials`]: the `(user, token)` record kept in storage.
//! - [`auth`]: the authorization header binder shared with the HTTP client.
//! - [`session::user`]: profile normalization (`image` vs `userPic`).
//! - [`api`]: the identity API client.
//! - [`session`]: the session store, the single writer of session state.
//!
//! Screens (or the bundled CLI) read the session through
//! [`session::SessionStore::current`] or [`session::SessionStore::subscribe`]
//! and never mutate it directly.

pub mod api;
pub mod auth;
pub mod cli;
pub mod error;
pub mod session;
pub mod storage;

pub use error::{Error, Result};

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
    }

    #[test]
    fn test_app_user_agent_format() {
        assert!(APP_USER_AGENT.starts_with("medsession/"));
        assert!(APP_USER_AGENT.contains(env!("CARGO_PKG_VERSION")));
    }
}
