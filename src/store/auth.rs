//! Auth slice: session identity and the login/register/logout intents.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use issuedesk_api::{AuthService, CredentialStore, Credentials, Envelope, User};
use log::{debug, info, warn};
use tokio::sync::watch;

use super::AsyncPhase;
use crate::text::scrub_secrets;

const LOGIN_FAILED: &str = "Login failed. Please try again.";
const REGISTRATION_FAILED: &str = "Registration failed. Please try again.";
const SIGNED_OUT_DURING_LOGIN: &str = "Signed out before the login finished.";

/// Who the client believes it is talking as.
#[derive(Debug, Clone, PartialEq)]
pub enum Session {
    LoggedOut,
    /// Seeded from a stored credential at startup; identity unknown and validity unchecked.
    Restored { token: String },
    LoggedIn { user: User, token: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct AuthState {
    pub session: Session,
    pub loading: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AuthAction {
    Login(AsyncPhase<(User, String)>),
    Register(AsyncPhase<User>),
    SetCredentials { user: User, token: String },
    Logout,
    ClearError,
}

impl AuthState {
    /// Initial state: authenticated optimistically when a durable credential exists.
    pub fn initial(stored_token: Option<String>) -> Self {
        let session = match stored_token {
            Some(token) => Session::Restored { token },
            None => Session::LoggedOut,
        };
        Self {
            session,
            loading: false,
            error: None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        !matches!(self.session, Session::LoggedOut)
    }

    pub fn user(&self) -> Option<&User> {
        match &self.session {
            Session::LoggedIn { user, .. } => Some(user),
            _ => None,
        }
    }

    pub fn token(&self) -> Option<&str> {
        match &self.session {
            Session::LoggedIn { token, .. } | Session::Restored { token } => Some(token),
            Session::LoggedOut => None,
        }
    }

    /// Folds one action into the state. Always reports a change.
    pub fn reduce(&mut self, action: AuthAction) -> bool {
        match action {
            AuthAction::Login(AsyncPhase::Pending) | AuthAction::Register(AsyncPhase::Pending) => {
                self.loading = true;
                self.error = None;
            }
            AuthAction::Login(AsyncPhase::Fulfilled((user, token)))
            | AuthAction::SetCredentials { user, token } => {
                self.loading = false;
                self.error = None;
                self.session = Session::LoggedIn { user, token };
            }
            AuthAction::Register(AsyncPhase::Fulfilled(_)) => {
                self.loading = false;
                self.error = None;
            }
            AuthAction::Login(AsyncPhase::Rejected(message))
            | AuthAction::Register(AsyncPhase::Rejected(message)) => {
                self.loading = false;
                self.error = Some(message);
            }
            AuthAction::Logout => {
                self.session = Session::LoggedOut;
                self.loading = false;
                self.error = None;
            }
            AuthAction::ClearError => {
                self.error = None;
            }
        }
        true
    }
}

#[derive(Clone)]
pub struct AuthSlice {
    service: AuthService,
    credentials: Arc<dyn CredentialStore>,
    state: Arc<watch::Sender<AuthState>>,
    /// Bumped by every logout; a login only lands if no logout happened since it started.
    generation: Arc<AtomicU64>,
}

impl AuthSlice {
    pub fn new(service: AuthService, credentials: Arc<dyn CredentialStore>) -> Self {
        let (state, _) = watch::channel(AuthState::initial(credentials.get()));
        Self {
            service,
            credentials,
            state: Arc::new(state),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn snapshot(&self) -> AuthState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    pub fn dispatch(&self, action: AuthAction) {
        self.state.send_if_modified(|state| state.reduce(action));
    }

    fn signed_out_since(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) != generation
    }

    /// Authenticates and persists the returned credential before flipping the session.
    /// A logout issued while the request is in flight wins: nothing is stored or dispatched.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, String> {
        let generation = self.generation.load(Ordering::SeqCst);
        self.dispatch(AuthAction::Login(AsyncPhase::Pending));
        let outcome = self
            .perform_login(Credentials::new(email.trim(), password), generation)
            .await;
        if self.signed_out_since(generation) {
            debug!("auth:login dropped, signed out while in flight");
            return Err(SIGNED_OUT_DURING_LOGIN.to_string());
        }
        match &outcome {
            Ok((user, _)) => info!("auth:login ok user={}", user.id),
            Err(err) => warn!("auth:login rejected: {}", scrub_secrets(err)),
        }
        let user = outcome.as_ref().map(|(user, _)| user.clone()).map_err(Clone::clone);
        self.dispatch(AuthAction::Login(AsyncPhase::settle(outcome)));
        user
    }

    async fn perform_login(
        &self,
        credentials: Credentials,
        generation: u64,
    ) -> Result<(User, String), String> {
        let payload = self
            .service
            .login(&credentials)
            .await
            .and_then(Envelope::into_data)
            .map_err(|err| err.user_message(LOGIN_FAILED))?;
        let token = payload
            .token
            .filter(|token| !token.trim().is_empty())
            .ok_or_else(|| LOGIN_FAILED.to_string())?;
        if self.signed_out_since(generation) {
            return Err(SIGNED_OUT_DURING_LOGIN.to_string());
        }
        self.credentials
            .set(&token)
            .map_err(|err| format!("Could not store the session: {err}"))?;
        if self.signed_out_since(generation) {
            // A logout raced the write above; take the token back out.
            if let Err(err) = self.credentials.clear() {
                warn!("Failed to clear stored credential: {}", scrub_secrets(&err.to_string()));
            }
            return Err(SIGNED_OUT_DURING_LOGIN.to_string());
        }
        Ok((payload.user, token))
    }

    /// Creates an account. Success leaves the session untouched; the user logs in separately.
    pub async fn register(&self, email: &str, password: &str) -> Result<User, String> {
        self.dispatch(AuthAction::Register(AsyncPhase::Pending));
        let outcome = self
            .service
            .register(&Credentials::new(email.trim(), password))
            .await
            .and_then(Envelope::into_data)
            .map(|payload| payload.user)
            .map_err(|err| err.user_message(REGISTRATION_FAILED));
        match &outcome {
            Ok(user) => info!("auth:register ok user={}", user.id),
            Err(err) => warn!("auth:register rejected: {}", scrub_secrets(err)),
        }
        self.dispatch(AuthAction::Register(AsyncPhase::settle(outcome.clone())));
        outcome
    }

    /// Restores a known identity, e.g. after an out-of-band login.
    pub fn set_credentials(&self, user: User, token: String) -> Result<(), String> {
        self.credentials
            .set(&token)
            .map_err(|err| format!("Could not store the session: {err}"))?;
        self.dispatch(AuthAction::SetCredentials { user, token });
        Ok(())
    }

    /// Drops the session locally and from durable storage. Never fails.
    pub fn logout(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Err(err) = self.credentials.clear() {
            warn!("Failed to clear stored credential: {}", scrub_secrets(&err.to_string()));
        }
        debug!("auth:logout");
        self.dispatch(AuthAction::Logout);
    }

    pub fn clear_error(&self) {
        self.dispatch(AuthAction::ClearError);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use issuedesk_api::{ApiClient, ApiConfig, MemoryCredentialStore};

    fn slice(server: &mockito::Server, store: Arc<MemoryCredentialStore>) -> AuthSlice {
        let client = ApiClient::new(ApiConfig::new(server.url()), store.clone()).unwrap();
        AuthSlice::new(AuthService::new(client), store)
    }

    const LOGIN_OK: &str = r#"{"success":true,"message":"Login successful","data":{"user":{"id":"u1","email":"ada@example.com","name":"Ada"},"token":"jwt.one"}}"#;

    #[test]
    fn initial_state_is_seeded_from_stored_credential() {
        let restored = AuthState::initial(Some("stored".into()));
        assert!(restored.is_authenticated());
        assert!(restored.user().is_none());
        assert_eq!(restored.token(), Some("stored"));

        let fresh = AuthState::initial(None);
        assert!(!fresh.is_authenticated());
        assert_eq!(fresh.token(), None);
    }

    #[test]
    fn pending_clears_previous_error() {
        let mut state = AuthState::initial(None);
        state.reduce(AuthAction::Login(AsyncPhase::Rejected("Invalid".into())));
        assert_eq!(state.error.as_deref(), Some("Invalid"));

        state.reduce(AuthAction::Login(AsyncPhase::Pending));
        assert!(state.loading);
        assert!(state.error.is_none());
    }

    #[tokio::test]
    async fn login_success_authenticates_and_persists() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/users/login")
            .with_status(200)
            .with_body(LOGIN_OK)
            .create_async()
            .await;

        let store = Arc::new(MemoryCredentialStore::new());
        let auth = slice(&server, store.clone());
        let user = auth.login(" ada@example.com ", "hunter22").await.unwrap();

        assert_eq!(user.id, "u1");
        let state = auth.snapshot();
        assert!(state.is_authenticated());
        assert!(!state.loading);
        assert_eq!(state.user().map(|u| u.email.as_str()), Some("ada@example.com"));
        assert_eq!(state.token(), Some("jwt.one"));
        assert_eq!(store.get().as_deref(), Some("jwt.one"));
    }

    #[tokio::test]
    async fn rejected_login_keeps_session_and_sets_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/users/login")
            .with_status(401)
            .with_body(r#"{"success":false,"message":"Invalid email or password"}"#)
            .create_async()
            .await;

        let store = Arc::new(MemoryCredentialStore::new());
        let auth = slice(&server, store.clone());
        let err = auth.login("ada@example.com", "nope").await.unwrap_err();

        assert_eq!(err, "Invalid email or password");
        let state = auth.snapshot();
        assert!(!state.is_authenticated());
        assert_eq!(state.error.as_deref(), Some("Invalid email or password"));
        assert_eq!(store.get(), None);
    }

    #[tokio::test]
    async fn transport_failure_uses_generic_message() {
        let store = Arc::new(MemoryCredentialStore::new());
        let config = ApiConfig::new("http://127.0.0.1:9")
            .with_connect_timeout(std::time::Duration::from_secs(2))
            .with_timeout(std::time::Duration::from_secs(5));
        let client = ApiClient::new(config, store.clone()).unwrap();
        let auth = AuthSlice::new(AuthService::new(client), store);

        let err = auth.login("ada@example.com", "pw").await.unwrap_err();
        assert_eq!(err, LOGIN_FAILED);
        assert_eq!(auth.snapshot().error.as_deref(), Some(LOGIN_FAILED));
    }

    #[tokio::test]
    async fn register_does_not_authenticate() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/users/register")
            .with_status(201)
            .with_body(r#"{"success":true,"message":"Registered","data":{"user":{"id":"u2","email":"new@example.com"},"token":"ignored"}}"#)
            .create_async()
            .await;

        let store = Arc::new(MemoryCredentialStore::new());
        let auth = slice(&server, store.clone());
        auth.register("new@example.com", "secret1").await.unwrap();

        let state = auth.snapshot();
        assert!(!state.is_authenticated());
        assert!(!state.loading);
        assert!(state.error.is_none());
        assert_eq!(store.get(), None);
    }

    #[tokio::test]
    async fn register_failure_surfaces_server_message() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/users/register")
            .with_status(200)
            .with_body(r#"{"success":false,"message":"User already exists"}"#)
            .create_async()
            .await;

        let auth = slice(&server, Arc::new(MemoryCredentialStore::new()));
        assert_eq!(
            auth.register("dup@example.com", "secret1").await.unwrap_err(),
            "User already exists"
        );
        assert_eq!(auth.snapshot().error.as_deref(), Some("User already exists"));
    }

    #[test]
    fn logout_resets_loading() {
        let mut state = AuthState::initial(Some("stored".into()));
        state.reduce(AuthAction::Login(AsyncPhase::Pending));
        assert!(state.loading);

        state.reduce(AuthAction::Logout);
        assert_eq!(state.session, Session::LoggedOut);
        assert!(!state.loading);
        assert!(state.error.is_none());
    }

    #[tokio::test]
    async fn logout_after_login_clears_session_and_storage() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/users/login")
            .with_status(200)
            .with_body(LOGIN_OK)
            .create_async()
            .await;

        let store = Arc::new(MemoryCredentialStore::new());
        let auth = slice(&server, store.clone());
        auth.login("ada@example.com", "hunter22").await.unwrap();
        assert!(matches!(auth.snapshot().session, Session::LoggedIn { .. }));
        assert_eq!(store.get().as_deref(), Some("jwt.one"));

        auth.logout();
        let state = auth.snapshot();
        assert_eq!(state.session, Session::LoggedOut);
        assert!(!state.is_authenticated());
        assert!(state.user().is_none());
        assert!(!state.loading);
        assert!(state.error.is_none());
        assert_eq!(store.get(), None);
    }

    #[tokio::test]
    async fn logout_during_login_wins() {
        let (release, gate) = std::sync::mpsc::channel::<()>();
        let gate = std::sync::Mutex::new(gate);
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/users/login")
            .with_status(200)
            .with_body_from_request(move |_| {
                let _ = gate
                    .lock()
                    .unwrap()
                    .recv_timeout(std::time::Duration::from_secs(5));
                LOGIN_OK.as_bytes().to_vec()
            })
            .create_async()
            .await;

        let store = Arc::new(MemoryCredentialStore::new());
        let auth = slice(&server, store.clone());
        let pending = tokio::spawn({
            let auth = auth.clone();
            async move { auth.login("ada@example.com", "hunter22").await }
        });
        while !auth.snapshot().loading {
            tokio::task::yield_now().await;
        }

        auth.logout();
        assert!(!auth.snapshot().loading);
        release.send(()).unwrap();

        let err = pending.await.unwrap().unwrap_err();
        assert_eq!(err, SIGNED_OUT_DURING_LOGIN);
        let state = auth.snapshot();
        assert_eq!(state.session, Session::LoggedOut);
        assert!(!state.loading);
        assert!(state.error.is_none());
        assert_eq!(store.get(), None);
    }

    #[tokio::test]
    async fn logout_clears_memory_and_storage_from_any_state() {
        let server = mockito::Server::new_async().await;
        let store = Arc::new(MemoryCredentialStore::with_token("stored"));
        let auth = slice(&server, store.clone());
        assert!(auth.snapshot().is_authenticated());

        auth.logout();
        assert!(!auth.snapshot().is_authenticated());
        assert_eq!(store.get(), None);

        auth.logout();
        assert_eq!(auth.snapshot().session, Session::LoggedOut);
    }

    #[tokio::test]
    async fn set_credentials_logs_in_and_persists() {
        let server = mockito::Server::new_async().await;
        let store = Arc::new(MemoryCredentialStore::new());
        let auth = slice(&server, store.clone());
        let user = User {
            id: "u5".into(),
            email: "eve@example.com".into(),
            name: None,
        };

        auth.set_credentials(user.clone(), "jwt.five".into()).unwrap();
        assert_eq!(auth.snapshot().user(), Some(&user));
        assert_eq!(store.get().as_deref(), Some("jwt.five"));

        auth.clear_error();
        assert!(auth.snapshot().error.is_none());
    }
}
