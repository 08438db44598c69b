//! Authorization header binding. The binder owns the default header map that
//! the shared [`crate::api::ApiClient`] copies onto every request, so setting or
//! clearing the bearer token here changes what all subsequent requests carry.
//! Token material is only exposed when building the header value and the value
//! is flagged sensitive.

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use secrecy::{ExposeSecret, SecretString};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, warn};

/// Attaches or removes the bearer token on outgoing requests.
pub trait AuthorizationProvider: Send + Sync {
    /// Binds `token`; binding the same token twice has no further effect.
    fn set(&self, token: &SecretString);

    /// Removes the binding; a no-op when nothing is bound.
    fn clear(&self);

    fn is_bound(&self) -> bool;
}

/// Default-header map shared between the binder and the HTTP client.
#[derive(Debug, Clone, Default)]
pub struct HeaderBinder {
    headers: Arc<RwLock<HeaderMap>>,
}

impl HeaderBinder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the current default headers.
    #[must_use]
    pub fn headers(&self) -> HeaderMap {
        self.headers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl AuthorizationProvider for HeaderBinder {
    fn set(&self, token: &SecretString) {
        let mut headers = self
            .headers
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        match HeaderValue::from_str(&format!("Bearer {}", token.expose_secret())) {
            Ok(mut value) => {
                value.set_sensitive(true);
                headers.insert(AUTHORIZATION, value);
                debug!("authorization header bound");
            }
            Err(_) => {
                headers.remove(AUTHORIZATION);
                warn!("token is not a valid header value, authorization cleared");
            }
        }
    }

    fn clear(&self) {
        let removed = self
            .headers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(AUTHORIZATION);

        if removed.is_some() {
            debug!("authorization header cleared");
        }
    }

    fn is_bound(&self) -> bool {
        self.headers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(AUTHORIZATION)
    }
}
