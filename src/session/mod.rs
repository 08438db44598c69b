//! Session store: the single writer of "who is logged in".
//!
//! The store reconciles three resources that fail independently: the identity
//! API, the durable credentials record and the in-memory session that screens
//! observe. Every transition writes storage and the authorization header
//! before the new [`Session`] is published, so observers never see a user the
//! rest of the client disagrees with.
//!
//! Overlapping calls are ordered by a logical sequence. Each operation takes a
//! ticket when it starts and may only commit while its ticket is still the
//! newest; commits run under one async lock. A sign-in that resolves after a
//! later sign-out therefore changes nothing and reports [`Error::Superseded`].

pub mod credentials;
pub mod user;


use crate::{
    api::{ApiClient, AuthResponse, ClientConfig, IdentityApi, LoginCredentials, RegisterPayload},
    auth::{AuthorizationProvider, HeaderBinder},
    error::{Error, Result},
    storage::KeyValueStore,
};
use credentials::CredentialStore;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, instrument, warn};
use user::{normalize, User};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Created, not bootstrapped yet.
    Idle,
    /// A sign-in or registration is in flight.
    Loading,
    Authenticated,
    Unauthenticated,
}

/// Snapshot published to observers.
///
/// While `Loading`, `user` still holds the last settled user (if any), which
/// remains valid until the in-flight call commits.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub user: Option<User>,
    pub status: Status,
}

impl Session {
    #[must_use]
    pub const fn idle() -> Self {
        Self {
            user: None,
            status: Status::Idle,
        }
    }

    #[must_use]
    pub const fn unauthenticated() -> Self {
        Self {
            user: None,
            status: Status::Unauthenticated,
        }
    }

    #[must_use]
    pub const fn authenticated(user: User) -> Self {
        Self {
            user: Some(user),
            status: Status::Authenticated,
        }
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.status == Status::Authenticated
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.status == Status::Loading
    }

    fn loading(self) -> Self {
        Self {
            user: self.user,
            status: Status::Loading,
        }
    }

    /// The settled state this snapshot stands for: its user if it has one.
    fn settled(self) -> Self {
        self.user
            .map_or_else(Self::unauthenticated, Self::authenticated)
    }
}

enum AuthRequest<'a> {
    Login(&'a LoginCredentials),
    Register(&'a RegisterPayload),
}

impl AuthRequest<'_> {
    const fn name(&self) -> &'static str {
        match self {
            Self::Login(_) => "sign_in",
            Self::Register(_) => "register",
        }
    }
}

pub struct SessionStore<A, S, B> {
    api: A,
    credentials: CredentialStore<S>,
    binder: B,
    state: watch::Sender<Session>,
    sequence: AtomicU64,
    commit: Mutex<()>,
}

impl<S: KeyValueStore> SessionStore<ApiClient, S, HeaderBinder> {
    /// Wires an [`ApiClient`] and the store to one shared [`HeaderBinder`].
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn connect(config: ClientConfig, credentials: CredentialStore<S>) -> Result<Self> {
        let binder = HeaderBinder::new();
        let api = ApiClient::new(config, binder.clone())?;
        Ok(Self::new(api, credentials, binder))
    }
}

impl<A, S, B> SessionStore<A, S, B>
where
    A: IdentityApi,
    S: KeyValueStore,
    B: AuthorizationProvider,
{
    pub fn new(api: A, credentials: CredentialStore<S>, binder: B) -> Self {
        let (state, _) = watch::channel(Session::idle());
        Self {
            api,
            credentials,
            binder,
            state,
            sequence: AtomicU64::new(0),
            commit: Mutex::new(()),
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn binder(&self) -> &B {
        &self.binder
    }

    pub fn credentials(&self) -> &CredentialStore<S> {
        &self.credentials
    }

    /// Current snapshot.
    pub fn current(&self) -> Session {
        self.state.borrow().clone()
    }

    /// Receiver notified on every published transition.
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    fn advance(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn is_current(&self, ticket: u64) -> bool {
        self.sequence.load(Ordering::SeqCst) == ticket
    }

    async fn begin(&self) -> u64 {
        let _guard = self.commit.lock().await;
        self.advance()
    }

    fn publish(&self, session: Session) {
        debug!(status = ?session.status, "session published");
        self.state.send_replace(session);
    }

    /// Restores the last session from durable storage. Never fails: unreadable
    /// or incomplete records leave the store untouched and yield
    /// `Unauthenticated`.
    #[instrument(skip(self))]
    pub async fn bootstrap(&self) -> Session {
        let ticket = self.begin().await;

        let stored = match self.credentials.read_pair().await {
            Ok(stored) => stored,
            Err(err) => {
                warn!("could not read stored credentials: {err}");
                None
            }
        };

        let _guard = self.commit.lock().await;
        if !self.is_current(ticket) {
            debug!("bootstrap superseded");
            return self.current();
        }

        let session = match stored {
            Some((user, token)) => {
                self.binder.set(&token);
                info!(user_id = %user.id, "session restored");
                Session::authenticated(user)
            }
            None => {
                self.binder.clear();
                Session::unauthenticated()
            }
        };

        self.publish(session.clone());
        session
    }

    /// Signs in against the identity API and persists the session.
    ///
    /// # Errors
    /// Surfaces network, rejection and decoding failures after restoring the
    /// prior session, storage failures of the write, and
    /// [`Error::Superseded`] if a later transition started meanwhile.
    #[instrument(skip_all, fields(email = %credentials.email))]
    pub async fn sign_in(&self, credentials: &LoginCredentials) -> Result<User> {
        self.authenticate(AuthRequest::Login(credentials)).await
    }

    /// Same contract as [`Self::sign_in`], against the registration endpoint.
    ///
    /// # Errors
    /// See [`Self::sign_in`].
    #[instrument(skip_all, fields(email = %payload.email, role = %payload.role))]
    pub async fn register(&self, payload: &RegisterPayload) -> Result<User> {
        self.authenticate(AuthRequest::Register(payload)).await
    }

    async fn authenticate(&self, request: AuthRequest<'_>) -> Result<User> {
        let operation = request.name();

        let (ticket, previous) = {
            let _guard = self.commit.lock().await;
            let ticket = self.advance();
            let previous = self.current();
            self.publish(previous.clone().loading());
            (ticket, previous)
        };

        let outcome = match request {
            AuthRequest::Login(credentials) => self.api.login(credentials).await,
            AuthRequest::Register(payload) => self.api.register(payload).await,
        };

        let _guard = self.commit.lock().await;

        let response = match outcome {
            Ok(response) => response,
            Err(err) => {
                if self.is_current(ticket) {
                    self.publish(previous.settled());
                }
                warn!("{operation} failed: {err}");
                return Err(err);
            }
        };

        if !self.is_current(ticket) {
            debug!("{operation} superseded, discarding response");
            return Err(Error::Superseded);
        }

        match self.commit_response(response).await {
            Ok(user) => {
                info!(user_id = %user.id, "{operation} succeeded");
                Ok(user)
            }
            Err(err) => {
                // The previous record may already be overwritten.
                warn!("{operation} could not persist session: {err}");
                self.clear_locked().await;
                Err(err)
            }
        }
    }

    /// Caller holds the commit lock.
    async fn commit_response(&self, response: AuthResponse) -> Result<User> {
        let AuthResponse {
            user,
            token,
            user_pic,
        } = response;

        let user = normalize(&user, user_pic.as_deref(), None);

        self.credentials.write(&user, &token).await?;
        self.binder.set(&token);
        self.publish(Session::authenticated(user.clone()));

        Ok(user)
    }

    /// Clears the stored record and the authorization header. Storage errors
    /// are logged; the in-memory session is cleared regardless.
    #[instrument(skip(self))]
    pub async fn sign_out(&self) {
        let _guard = self.commit.lock().await;
        self.advance();
        self.clear_locked().await;
        info!("signed out");
    }

    /// Caller holds the commit lock.
    async fn clear_locked(&self) {
        if let Err(err) = self.credentials.clear().await {
            warn!("could not remove stored credentials: {err}");
        }
        self.binder.clear();
        self.publish(Session::unauthenticated());
    }

    /// Revalidates the stored session against the identity API.
    ///
    /// Returns `None` when nothing is stored. The stored user is published as
    /// `Authenticated` together with binding its token, so the header and the
    /// session agree while `me` is in flight and on every failure path. A
    /// rejected token signs the user out; other failures keep the locally
    /// stored session.
    ///
    /// # Errors
    /// Surfaces storage read failures, API failures and failures to persist the
    /// refreshed user.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<Option<User>> {
        let ticket = self.begin().await;

        let stored = match self.credentials.read_pair().await {
            Ok(stored) => stored,
            Err(err) => {
                let _guard = self.commit.lock().await;
                if self.is_current(ticket) {
                    // A sign-in superseded by this ticket never settles itself.
                    self.publish(self.current().settled());
                }
                warn!("could not read stored credentials: {err}");
                return Err(err);
            }
        };

        let Some((local, token)) = stored else {
            let _guard = self.commit.lock().await;
            if self.is_current(ticket) {
                self.binder.clear();
                self.publish(Session::unauthenticated());
            }
            return Ok(None);
        };

        {
            let _guard = self.commit.lock().await;
            if !self.is_current(ticket) {
                debug!("refresh superseded before request");
                return Ok(self.current().user);
            }
            self.binder.set(&token);
            self.publish(Session::authenticated(local.clone()));
        }

        let outcome = self.api.me().await;

        let _guard = self.commit.lock().await;
        if !self.is_current(ticket) {
            debug!("refresh superseded, discarding response");
            return Ok(self.current().user);
        }

        // From here on `Authenticated(local)` is published and its token bound.
        match outcome {
            Ok(raw) => {
                let user = normalize(&raw, None, Some(&local.image));
                if let Err(err) = self.credentials.write_user(&user).await {
                    warn!("could not persist refreshed user, keeping local session: {err}");
                    return Err(err);
                }
                self.publish(Session::authenticated(user.clone()));
                info!(user_id = %user.id, "session refreshed");
                Ok(Some(user))
            }
            Err(err) if err.is_unauthorized() => {
                warn!("stored token rejected, signing out: {err}");
                self.clear_locked().await;
                Err(err)
            }
            Err(err) => {
                warn!("refresh failed, keeping local session: {err}");
                Err(err)
            }
        }
    }
}
