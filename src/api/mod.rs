//! Identity API client. Every request goes through the shared `reqwest` client
//! and picks up the default headers owned by [`HeaderBinder`], which is how the
//! bearer token set by the session store reaches the backend. Non-success
//! statuses surface as [`Error::AuthRejected`] with a sanitized message; bodies
//! that do not match the expected shape surface as [`Error::MalformedResponse`].

mod types;

pub use types::{AuthResponse, LoginCredentials, RegisterPayload};

use crate::{
    auth::HeaderBinder,
    error::{Error, Result},
    session::user::{normalize, RawUser, Role, User},
    APP_USER_AGENT,
};
use reqwest::{Client, Method, RequestBuilder, Response};
use secrecy::SecretString;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::{future::Future, time::Duration};
use tracing::{debug, info_span, Instrument};
use types::{AuthResponseWire, MeResponse};
use url::Url;

/// Default request timeout applied to the shared client.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
/// Maximum number of error body characters kept in [`Error::AuthRejected`].
const MAX_ERROR_CHARS: usize = 200;

/// Remote identity operations the session store depends on.
pub trait IdentityApi: Send + Sync {
    fn login(
        &self,
        credentials: &LoginCredentials,
    ) -> impl Future<Output = Result<AuthResponse>> + Send;

    fn register(
        &self,
        payload: &RegisterPayload,
    ) -> impl Future<Output = Result<AuthResponse>> + Send;

    /// Current user for the bound token.
    fn me(&self) -> impl Future<Output = Result<RawUser>> + Send;
}

/// Paths of the identity and user endpoints, relative to the base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub login: String,
    pub register: String,
    pub me: String,
    pub users: String,
    pub doctors: String,
    pub patients: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            login: "/auth/login".to_string(),
            register: "/auth/register".to_string(),
            me: "/auth/me".to_string(),
            users: "/users".to_string(),
            doctors: "/users/doctors".to_string(),
            patients: "/users/patients".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: Url,
    pub timeout: Duration,
    pub endpoints: Endpoints,
}

impl ClientConfig {
    /// # Errors
    /// Returns [`Error::InvalidUrl`] if `base_url` does not parse.
    pub fn new(base_url: &str) -> Result<Self> {
        Ok(Self {
            base_url: Url::parse(base_url.trim())?,
            timeout: DEFAULT_TIMEOUT,
            endpoints: Endpoints::default(),
        })
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
    endpoints: Endpoints,
    binder: HeaderBinder,
}

impl ApiClient {
    /// Builds the client around `binder`, whose headers are sent on every request.
    ///
    /// # Errors
    /// Returns [`Error::Network`] if the underlying HTTP client cannot be built.
    pub fn new(config: ClientConfig, binder: HeaderBinder) -> Result<Self> {
        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(config.timeout)
            .build()
            .map_err(Error::Network)?;

        Ok(Self {
            client,
            base_url: config.base_url,
            endpoints: config.endpoints,
            binder,
        })
    }

    #[must_use]
    pub fn binder(&self) -> &HeaderBinder {
        &self.binder
    }

    /// Joins `path` onto the base URL, keeping any path prefix of the base.
    fn url(&self, path: &str) -> Result<Url> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let path = path.trim().trim_start_matches('/');
        Ok(Url::parse(&format!("{base}/{path}"))?)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.client.request(method, url).headers(self.binder.headers())
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        operation: &'static str,
    ) -> Result<T> {
        let span = info_span!("identity.request", op = operation);

        let response = request
            .send()
            .instrument(span)
            .await
            .map_err(Error::Network)?;

        debug!("{operation}: {}", response.status());

        handle_json_response(response).await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        operation: &'static str,
    ) -> Result<T> {
        let url = self.url(path)?;
        debug!("GET {url}");
        self.send(self.request(Method::GET, url), operation).await
    }

    async fn post_json<B, T>(&self, path: &str, body: &B, operation: &'static str) -> Result<T>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let url = self.url(path)?;
        debug!("POST {url}");
        self.send(self.request(Method::POST, url).json(body), operation)
            .await
    }

    /// Lists users of every role.
    ///
    /// # Errors
    /// Propagates transport, status and decoding failures.
    pub async fn list_users(&self) -> Result<Vec<User>> {
        self.list(&self.endpoints.users, "users.list").await
    }

    /// # Errors
    /// Propagates transport, status and decoding failures.
    pub async fn list_doctors(&self) -> Result<Vec<User>> {
        self.list(&self.endpoints.doctors, "users.doctors").await
    }

    /// # Errors
    /// Propagates transport, status and decoding failures.
    pub async fn list_patients(&self) -> Result<Vec<User>> {
        self.list(&self.endpoints.patients, "users.patients").await
    }

    /// Lists users filtered by role; admins come from the full listing.
    ///
    /// # Errors
    /// Propagates transport, status and decoding failures.
    pub async fn list_by_role(&self, role: Option<Role>) -> Result<Vec<User>> {
        match role {
            Some(Role::Doctor) => self.list_doctors().await,
            Some(Role::Patient) => self.list_patients().await,
            Some(Role::Admin) => Ok(self
                .list_users()
                .await?
                .into_iter()
                .filter(|user| user.role == Role::Admin)
                .collect()),
            None => self.list_users().await,
        }
    }

    /// Other users have no locally known photo, so listings normalize without
    /// a fallback.
    async fn list(&self, path: &str, operation: &'static str) -> Result<Vec<User>> {
        let raw: Vec<RawUser> = self.get_json(path, operation).await?;
        debug!("{operation}: {} users", raw.len());
        Ok(raw.iter().map(|user| normalize(user, None, None)).collect())
    }
}

impl IdentityApi for ApiClient {
    async fn login(&self, credentials: &LoginCredentials) -> Result<AuthResponse> {
        let wire: AuthResponseWire = self
            .post_json(&self.endpoints.login, credentials, "auth.login")
            .await?;
        into_auth_response(wire)
    }

    async fn register(&self, payload: &RegisterPayload) -> Result<AuthResponse> {
        let wire: AuthResponseWire = self
            .post_json(&self.endpoints.register, payload, "auth.register")
            .await?;
        into_auth_response(wire)
    }

    async fn me(&self) -> Result<RawUser> {
        let response: MeResponse = self.get_json(&self.endpoints.me, "auth.me").await?;
        Ok(response.user)
    }
}

fn into_auth_response(wire: AuthResponseWire) -> Result<AuthResponse> {
    if wire.token.trim().is_empty() {
        return Err(Error::MalformedResponse("empty token".to_string()));
    }

    Ok(AuthResponse {
        user: wire.user,
        token: SecretString::from(wire.token),
        user_pic: wire.user_pic,
    })
}

/// Decodes a success body or turns the status and body into an error.
async fn handle_json_response<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();

    if status.is_success() {
        let bytes = response.bytes().await.map_err(Error::Network)?;
        serde_json::from_slice(&bytes).map_err(|err| Error::MalformedResponse(err.to_string()))
    } else {
        let body = response.text().await.unwrap_or_default();
        Err(Error::AuthRejected {
            status: status.as_u16(),
            message: sanitize_body(&body),
        })
    }
}

/// Prefers a `message`/`error` field from a JSON error body, otherwise the
/// trimmed text, truncated either way.
fn sanitize_body(body: &str) -> String {
    let trimmed = body.trim();

    let message = serde_json::from_str::<Value>(trimmed)
        .ok()
        .and_then(|json| {
            ["message", "error", "erro", "mensagem"]
                .iter()
                .find_map(|key| json.get(key).and_then(Value::as_str).map(str::to_string))
        })
        .unwrap_or_else(|| trimmed.to_string());

    if message.trim().is_empty() {
        "Request failed.".to_string()
    } else {
        message.trim().chars().take(MAX_ERROR_CHARS).collect()
    }
}
