//! The session state machine.
//!
//! A [`Session`] owns the only cross-call mutable state in the SDK: the
//! configured consumer identity and the committed credential record. All
//! writes (`configure`, the `authenticate` commit, `logout`) take the state
//! write lock; reads share the read lock. The OAuth handshake itself runs
//! without the lock held — a commit is refused if the session was
//! reconfigured underneath it, so a failed or raced handshake never leaves
//! partial state behind.

use std::sync::Arc;

use once_cell::sync::OnceCell;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use quillpad_common::credentials::CredentialStore;
use quillpad_common::ports::{AuthorizationOutcome, AuthorizationUi, RpcConnector};
use quillpad_domain::{
    AuthFailure, BootstrapProfile, BusinessUserInfo, Credentials, QuillpadError, Result,
    ServiceFamily,
};

use crate::rpc::ClientFactory;
use crate::session::bootstrap::BootstrapResolver;
use crate::session::config::SessionConfig;
use crate::session::oauth::OAuthFlow;
use crate::sync::note_store::NoteStoreClient;
use crate::user_store::UserStoreClient;

static SHARED: OnceCell<Session> = OnceCell::new();

#[derive(Default)]
struct SessionState {
    config: Option<SessionConfig>,
    /// Bumped by every `configure`; an in-flight handshake refuses to
    /// commit against a different generation.
    generation: u64,
    profiles: Option<Vec<BootstrapProfile>>,
    credentials: Option<Credentials>,
    business_user: Option<BusinessUserInfo>,
    known_family: Option<ServiceFamily>,
}

/// The session: explicit init/teardown state plus factories for store
/// clients bound to the current token.
///
/// Cloning is cheap and shares the same state. Embedders that want the
/// classic process-wide singleton register one with
/// [`Session::init_shared`].
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    state: RwLock<SessionState>,
    credential_store: Arc<dyn CredentialStore>,
    oauth: Arc<dyn OAuthFlow>,
    connector: Arc<dyn RpcConnector>,
}

impl Session {
    /// Create an unconfigured session over the injected capabilities.
    #[must_use]
    pub fn new(
        credential_store: Arc<dyn CredentialStore>,
        oauth: Arc<dyn OAuthFlow>,
        connector: Arc<dyn RpcConnector>,
    ) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                state: RwLock::new(SessionState::default()),
                credential_store,
                oauth,
                connector,
            }),
        }
    }

    /// Register the process-wide shared session. First registration wins.
    ///
    /// # Errors
    /// `Config` when a shared session is already registered.
    pub fn init_shared(session: Session) -> Result<()> {
        SHARED
            .set(session)
            .map_err(|_| QuillpadError::Config("shared session already initialized".into()))
    }

    /// The process-wide shared session, if one was registered.
    #[must_use]
    pub fn shared() -> Option<&'static Session> {
        SHARED.get()
    }

    /// (Re)initialize the session. Idempotent; serialized against all other
    /// state writes; last write wins.
    ///
    /// Changing the consumer identity or host discards any committed
    /// credentials, in memory and in the credential store: tokens minted
    /// for another consumer are not this session's to keep.
    ///
    /// # Errors
    /// `Config` when the configuration is incomplete; `Storage` when
    /// clearing stale persisted credentials fails.
    pub async fn configure(&self, config: SessionConfig) -> Result<()> {
        config.validate()?;

        let mut state = self.inner.state.write().await;
        let identity_changed = state.config.as_ref().is_some_and(|existing| {
            existing.consumer_key != config.consumer_key || existing.host != config.host
        });
        if identity_changed {
            self.inner.credential_store.clear()?;
            state.credentials = None;
            state.business_user = None;
            state.known_family = None;
        }
        state.profiles = None;
        state.generation += 1;
        info!(host = %config.host, "session configured");
        state.config = Some(config);
        Ok(())
    }

    /// True iff a personal authentication token is committed.
    pub async fn is_authenticated(&self) -> bool {
        self.inner.state.read().await.credentials.is_some()
    }

    /// Load previously persisted credentials into the session, making
    /// [`is_authenticated`](Self::is_authenticated) true without a fresh
    /// handshake. Returns whether anything was restored.
    ///
    /// # Errors
    /// `Config` before [`configure`](Self::configure); `Storage` when the
    /// credential store cannot be read.
    pub async fn restore(&self) -> Result<bool> {
        let mut state = self.inner.state.write().await;
        if state.config.is_none() {
            return Err(QuillpadError::Config("configure() must be called first".into()));
        }
        match self.inner.credential_store.load()? {
            Some(credentials) => {
                state.known_family = Some(BootstrapResolver::family_of_host(&credentials.host));
                state.credentials = Some(credentials);
                debug!("session restored from credential store");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Run the bootstrap + OAuth handshake and commit the resulting token
    /// and derived URLs.
    ///
    /// Bootstrap profiles are walked in resolver order; only an explicit
    /// wrong-service-family rejection moves to the next profile. User
    /// cancellation and transport failure abort immediately. On any
    /// failure the session state is exactly what it was before the call.
    /// Already-authenticated sessions return immediately.
    ///
    /// # Errors
    /// `Config` before [`configure`](Self::configure) or when the session
    /// is reconfigured mid-handshake; `Auth` for handshake rejections and
    /// cancellation; `Transport`/`Storage` for infrastructure failures.
    pub async fn authenticate(&self, ui: &dyn AuthorizationUi) -> Result<()> {
        let (config, profiles, generation) = {
            let mut state = self.inner.state.write().await;
            let config = state
                .config
                .clone()
                .ok_or_else(|| QuillpadError::Config("configure() must be called first".into()))?;
            if state.credentials.is_some() {
                debug!("authenticate called on an authenticated session");
                return Ok(());
            }
            if state.profiles.is_none() {
                state.profiles =
                    Some(BootstrapResolver::resolve(&config, state.known_family));
            }
            (config, state.profiles.clone().unwrap_or_default(), state.generation)
        };

        let mut wrong_family = None;
        for profile in &profiles {
            match self.run_handshake(&config, profile, ui).await {
                Ok(auth) => {
                    let credentials = Credentials::from_authentication(
                        &profile.settings.service_host,
                        &profile.settings.user_store_url,
                        &auth,
                    );
                    return self.commit(credentials, profile, generation).await;
                }
                Err(QuillpadError::Auth(AuthFailure::WrongServiceFamily)) => {
                    warn!(host = %profile.settings.service_host, "wrong service family, trying next profile");
                    wrong_family = Some(QuillpadError::Auth(AuthFailure::WrongServiceFamily));
                }
                Err(other) => return Err(other),
            }
        }
        Err(wrong_family
            .unwrap_or_else(|| QuillpadError::Config("no bootstrap profiles resolved".into())))
    }

    async fn run_handshake(
        &self,
        config: &SessionConfig,
        profile: &BootstrapProfile,
        ui: &dyn AuthorizationUi,
    ) -> Result<quillpad_domain::AuthenticationResult> {
        let oauth = &self.inner.oauth;
        let temporary = oauth.request_temporary_credential(profile, config).await?;
        let url = oauth.authorization_url(profile, &temporary);

        match ui.present_authorization(&url).await? {
            AuthorizationOutcome::Authorized { verifier } => {
                oauth.exchange_for_token(profile, config, &temporary, &verifier).await
            }
            AuthorizationOutcome::Cancelled => Err(QuillpadError::Auth(AuthFailure::Cancelled)),
        }
    }

    async fn commit(
        &self,
        credentials: Credentials,
        profile: &BootstrapProfile,
        generation: u64,
    ) -> Result<()> {
        let mut state = self.inner.state.write().await;
        if state.generation != generation {
            return Err(QuillpadError::Config(
                "session was reconfigured during authentication".into(),
            ));
        }
        self.inner.credential_store.store(&credentials)?;
        state.known_family = Some(profile.family());
        state.credentials = Some(credentials);
        info!(host = %profile.settings.service_host, "session authenticated");
        Ok(())
    }

    /// Clear all credential state, in memory and in the credential store.
    /// Safe to call when not authenticated. Local-only: use
    /// [`UserStoreClient::revoke_long_session`] first when the token itself
    /// should stop working.
    ///
    /// # Errors
    /// `Storage` when the credential store cannot be cleared; in-memory
    /// state is cleared regardless.
    pub async fn logout(&self) -> Result<()> {
        let mut state = self.inner.state.write().await;
        state.credentials = None;
        state.business_user = None;
        let cleared = self.inner.credential_store.clear();
        info!("session logged out");
        cleared
    }

    /// Bootstrap profiles resolved for the current configuration, once
    /// [`authenticate`](Self::authenticate) has run.
    pub async fn bootstrap_profiles(&self) -> Option<Vec<BootstrapProfile>> {
        self.inner.state.read().await.profiles.clone()
    }

    /// Snapshot of the committed credential record.
    pub async fn credentials(&self) -> Option<Credentials> {
        self.inner.state.read().await.credentials.clone()
    }

    /// The business tenancy descriptor, present after
    /// [`authenticate_to_business`](Self::authenticate_to_business).
    pub async fn business_user(&self) -> Option<BusinessUserInfo> {
        self.inner.state.read().await.business_user.clone()
    }

    fn factory(&self) -> ClientFactory {
        ClientFactory::new(Arc::clone(&self.inner.connector))
    }

    /// Open an independent user-store client bound to the current token.
    ///
    /// # Errors
    /// `Unauthenticated` before a successful authentication; `Transport`
    /// when the endpoint cannot be bound.
    pub async fn user_store_client(&self) -> Result<UserStoreClient> {
        let credentials = self.require_credentials().await?;
        self.factory().user_store(&credentials.user_store_url, &credentials.auth_token)
    }

    /// Open an independent note-store client for the personal note store.
    ///
    /// # Errors
    /// `Unauthenticated` before a successful authentication; `Transport`
    /// when the endpoint cannot be bound.
    pub async fn note_store_client(&self) -> Result<NoteStoreClient> {
        let credentials = self.require_credentials().await?;
        self.factory().note_store(&credentials.note_store_url, &credentials.auth_token)
    }

    /// Open an independent note-store client for the business note store.
    ///
    /// # Errors
    /// `Unauthenticated` before a successful personal authentication or
    /// before [`authenticate_to_business`](Self::authenticate_to_business).
    pub async fn business_note_store_client(&self) -> Result<NoteStoreClient> {
        let credentials = self.require_credentials().await?;
        let (token, url) = credentials
            .business_auth_token
            .as_deref()
            .zip(credentials.business_note_store_url.as_deref())
            .ok_or_else(|| {
                QuillpadError::Unauthenticated(
                    "business note store requires authenticate_to_business".into(),
                )
            })?;
        self.factory().note_store(url, token)
    }

    /// Open an independent note-store client for an arbitrary store URL
    /// (e.g. a linked notebook's), bound to the personal token.
    ///
    /// # Errors
    /// `Unauthenticated` before a successful authentication; `Transport`
    /// when the endpoint cannot be bound.
    pub async fn note_store_client_for_url(&self, url: &str) -> Result<NoteStoreClient> {
        let credentials = self.require_credentials().await?;
        self.factory().note_store(url, &credentials.auth_token)
    }

    /// Authenticate to the account's business tenancy: obtains a business
    /// token from the user store, folds it into the credential record and
    /// remembers the tenancy descriptor.
    ///
    /// # Errors
    /// `Unauthenticated` before a personal authentication;
    /// `Server(PermissionDenied)` when the account is not a business
    /// member; `Storage` when persisting the updated record fails.
    pub async fn authenticate_to_business(&self) -> Result<BusinessUserInfo> {
        let user_store = self.user_store_client().await?;
        let business_auth = user_store.authenticate_to_business().await?;
        let user = user_store.get_user().await?;
        let business_user = user.business_user_info.ok_or_else(|| {
            QuillpadError::Server(quillpad_domain::ServerFault::PermissionDenied(
                "user record carries no business profile".into(),
            ))
        })?;

        let mut state = self.inner.state.write().await;
        let credentials = state.credentials.clone().ok_or_else(|| {
            QuillpadError::Unauthenticated("session logged out during business handshake".into())
        })?;
        let updated = credentials.with_business(&business_auth);
        self.inner.credential_store.store(&updated)?;
        state.credentials = Some(updated);
        state.business_user = Some(business_user.clone());
        info!(business = %business_user.business_name, "business authentication committed");
        Ok(business_user)
    }

    async fn require_credentials(&self) -> Result<Credentials> {
        self.inner.state.read().await.credentials.clone().ok_or_else(|| {
            QuillpadError::Unauthenticated("authenticate() before deriving store clients".into())
        })
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for the session state machine, with a scripted OAuth
    //! flow.
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;

    use quillpad_common::credentials::MemoryCredentialStore;
    use quillpad_common::testing::{MockAuthorizationUi, ScriptedConnector};
    use quillpad_domain::constants::{REGIONAL_HOST, SANDBOX_HOST};
    use quillpad_domain::AuthenticationResult;

    use crate::session::oauth::TemporaryCredential;

    use super::*;

    /// Scripted OAuth flow: one outcome per host, optional exchange delay.
    struct StubOAuthFlow {
        outcomes: Mutex<HashMap<String, Result<AuthenticationResult>>>,
        exchange_delay: Option<Duration>,
    }

    impl StubOAuthFlow {
        fn new() -> Self {
            Self { outcomes: Mutex::new(HashMap::new()), exchange_delay: None }
        }

        fn with_delay(delay: Duration) -> Self {
            Self { outcomes: Mutex::new(HashMap::new()), exchange_delay: Some(delay) }
        }

        fn script(&self, host: &str, outcome: Result<AuthenticationResult>) {
            self.outcomes.lock().unwrap().insert(host.to_string(), outcome);
        }

        fn outcome_for(&self, host: &str) -> Result<AuthenticationResult> {
            self.outcomes
                .lock()
                .unwrap()
                .get(host)
                .cloned()
                .unwrap_or_else(|| {
                    Err(QuillpadError::Auth(AuthFailure::HandshakeFailed(format!(
                        "unscripted host {host}"
                    ))))
                })
        }
    }

    #[async_trait]
    impl OAuthFlow for StubOAuthFlow {
        async fn request_temporary_credential(
            &self,
            profile: &BootstrapProfile,
            _config: &SessionConfig,
        ) -> Result<TemporaryCredential> {
            // Wrong-service rejections surface on the first leg.
            if let Err(e) = self.outcome_for(&profile.settings.service_host) {
                if matches!(e, QuillpadError::Auth(AuthFailure::WrongServiceFamily)) {
                    return Err(e);
                }
            }
            Ok(TemporaryCredential { token: "tmp".into(), secret: "tmp-secret".into() })
        }

        fn authorization_url(
            &self,
            profile: &BootstrapProfile,
            temporary: &TemporaryCredential,
        ) -> String {
            format!("{}?oauth_token={}", profile.settings.authorize_url, temporary.token)
        }

        async fn exchange_for_token(
            &self,
            profile: &BootstrapProfile,
            _config: &SessionConfig,
            _temporary: &TemporaryCredential,
            _verifier: &str,
        ) -> Result<AuthenticationResult> {
            if let Some(delay) = self.exchange_delay {
                tokio::time::sleep(delay).await;
            }
            self.outcome_for(&profile.settings.service_host)
        }
    }

    fn auth_for(host: &str) -> AuthenticationResult {
        AuthenticationResult {
            auth_token: format!("S=s1:{host}"),
            note_store_url: format!("https://{host}/shard/s1/notestore"),
            web_api_url_prefix: format!("https://{host}/shard/s1/"),
            user_id: 7,
            expiration: 1_900_000_000_000,
        }
    }

    fn session_with(flow: StubOAuthFlow) -> (Session, Arc<MemoryCredentialStore>) {
        let store = Arc::new(MemoryCredentialStore::new());
        let session = Session::new(
            Arc::clone(&store) as Arc<dyn CredentialStore>,
            Arc::new(flow),
            Arc::new(ScriptedConnector::new()),
        );
        (session, store)
    }

    fn sandbox_config() -> SessionConfig {
        SessionConfig::sandbox("my-app", "s3cret")
    }

    /// Validates that every operation requires `configure` first.
    #[tokio::test]
    async fn operations_require_configuration() {
        let (session, _) = session_with(StubOAuthFlow::new());
        let ui = MockAuthorizationUi::authorizing("v");

        assert!(matches!(
            session.authenticate(&ui).await,
            Err(QuillpadError::Config(_))
        ));
        assert!(matches!(session.restore().await, Err(QuillpadError::Config(_))));
    }

    /// Validates the happy-path handshake: token and derived URLs are
    /// committed atomically and persisted.
    #[tokio::test]
    async fn authenticate_commits_and_persists() {
        let flow = StubOAuthFlow::new();
        flow.script(SANDBOX_HOST, Ok(auth_for(SANDBOX_HOST)));
        let (session, store) = session_with(flow);
        let ui = MockAuthorizationUi::authorizing("v-1");

        session.configure(sandbox_config()).await.unwrap();
        assert!(!session.is_authenticated().await);

        session.authenticate(&ui).await.unwrap();
        assert!(session.is_authenticated().await);

        let credentials = session.credentials().await.unwrap();
        assert_eq!(credentials.host, SANDBOX_HOST);
        assert_eq!(credentials.auth_token, format!("S=s1:{SANDBOX_HOST}"));
        assert!(credentials.note_store_url.contains("/shard/s1/"));
        assert_eq!(
            credentials.user_store_url,
            format!("https://{SANDBOX_HOST}/rpc/userstore")
        );

        let persisted = store.load().unwrap().unwrap();
        assert_eq!(persisted, credentials);

        assert_eq!(ui.presented_urls().len(), 1);
        assert!(ui.presented_urls()[0].contains("oauth_token=tmp"));
    }

    /// Validates the no-partial-writes property for the cancellation
    /// scenario: `is_authenticated` stays false and nothing is persisted.
    #[tokio::test]
    async fn cancelled_authentication_leaves_state_untouched() {
        let flow = StubOAuthFlow::new();
        flow.script(SANDBOX_HOST, Ok(auth_for(SANDBOX_HOST)));
        let (session, store) = session_with(flow);

        session.configure(sandbox_config()).await.unwrap();
        let err = session.authenticate(&MockAuthorizationUi::cancelling()).await.unwrap_err();
        assert_eq!(err, QuillpadError::Auth(AuthFailure::Cancelled));

        assert!(!session.is_authenticated().await);
        assert!(session.credentials().await.is_none());
        assert!(store.load().unwrap().is_none());
    }

    /// Validates bootstrap fallback: a wrong-service rejection from the
    /// first profile moves to the second; any other failure does not.
    #[tokio::test]
    async fn wrong_service_family_falls_back() {
        let flow = StubOAuthFlow::new();
        flow.script(
            SANDBOX_HOST,
            Err(QuillpadError::Auth(AuthFailure::WrongServiceFamily)),
        );
        flow.script(REGIONAL_HOST, Ok(auth_for(REGIONAL_HOST)));
        let (session, _) = session_with(flow);
        let ui = MockAuthorizationUi::authorizing("v");

        let config =
            SessionConfig::new(SANDBOX_HOST, "my-app", "s3cret", ServiceFamily::Both);
        session.configure(config).await.unwrap();
        session.authenticate(&ui).await.unwrap();

        let credentials = session.credentials().await.unwrap();
        assert_eq!(credentials.host, REGIONAL_HOST);
    }

    /// A transport failure aborts immediately, without trying the next
    /// profile.
    #[tokio::test]
    async fn transport_failure_does_not_fall_back() {
        let flow = StubOAuthFlow::new();
        flow.script(SANDBOX_HOST, Err(QuillpadError::Transport("offline".into())));
        flow.script(REGIONAL_HOST, Ok(auth_for(REGIONAL_HOST)));
        let (session, _) = session_with(flow);
        let ui = MockAuthorizationUi::authorizing("v");

        let config =
            SessionConfig::new(SANDBOX_HOST, "my-app", "s3cret", ServiceFamily::Both);
        session.configure(config).await.unwrap();

        let err = session.authenticate(&ui).await.unwrap_err();
        assert!(matches!(err, QuillpadError::Transport(_)));
        assert!(!session.is_authenticated().await);
    }

    /// Validates that logout clears memory and the credential store, and
    /// that it is safe to call twice.
    #[tokio::test]
    async fn logout_clears_everything() {
        let flow = StubOAuthFlow::new();
        flow.script(SANDBOX_HOST, Ok(auth_for(SANDBOX_HOST)));
        let (session, store) = session_with(flow);

        session.configure(sandbox_config()).await.unwrap();
        session.authenticate(&MockAuthorizationUi::authorizing("v")).await.unwrap();

        session.logout().await.unwrap();
        assert!(!session.is_authenticated().await);
        assert!(store.load().unwrap().is_none());

        session.logout().await.unwrap();
    }

    /// Validates the reconfigure scenario: a different consumer key wipes
    /// committed and persisted credentials.
    #[tokio::test]
    async fn reconfigure_with_new_consumer_resets_state() {
        let flow = StubOAuthFlow::new();
        flow.script(SANDBOX_HOST, Ok(auth_for(SANDBOX_HOST)));
        let (session, store) = session_with(flow);

        session.configure(sandbox_config()).await.unwrap();
        session.authenticate(&MockAuthorizationUi::authorizing("v")).await.unwrap();
        assert!(session.is_authenticated().await);

        let other = SessionConfig::new(
            SANDBOX_HOST,
            "other-app",
            "other-secret",
            ServiceFamily::International,
        );
        session.configure(other).await.unwrap();

        assert!(!session.is_authenticated().await);
        assert!(store.load().unwrap().is_none());

        // Same config again is idempotent and keeps nothing stale around.
        let restored = session.restore().await.unwrap();
        assert!(!restored);
    }

    /// Validates the mid-handshake reconfigure guard: the late commit is
    /// refused and the new configuration's state wins.
    #[tokio::test]
    async fn reconfigure_during_handshake_refuses_commit() {
        let flow = StubOAuthFlow::with_delay(Duration::from_millis(100));
        flow.script(SANDBOX_HOST, Ok(auth_for(SANDBOX_HOST)));
        let (session, _) = session_with(flow);

        session.configure(sandbox_config()).await.unwrap();

        let racing = session.clone();
        let handle = tokio::spawn(async move {
            let ui = MockAuthorizationUi::authorizing("v");
            racing.authenticate(&ui).await
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        let other = SessionConfig::new(
            SANDBOX_HOST,
            "other-app",
            "other-secret",
            ServiceFamily::International,
        );
        session.configure(other).await.unwrap();

        let result = handle.await.unwrap();
        assert!(matches!(result, Err(QuillpadError::Config(_))));
        assert!(!session.is_authenticated().await);
    }

    /// Validates that authenticate on an authenticated session is a no-op.
    #[tokio::test]
    async fn authenticate_is_idempotent_once_authenticated() {
        let flow = StubOAuthFlow::new();
        flow.script(SANDBOX_HOST, Ok(auth_for(SANDBOX_HOST)));
        let (session, _) = session_with(flow);
        let ui = MockAuthorizationUi::authorizing("v");

        session.configure(sandbox_config()).await.unwrap();
        session.authenticate(&ui).await.unwrap();
        session.authenticate(&ui).await.unwrap();

        // The authorization page was shown exactly once.
        assert_eq!(ui.presented_urls().len(), 1);
    }

    /// Validates restore round-trips persisted credentials.
    #[tokio::test]
    async fn restore_loads_persisted_credentials() {
        let flow = StubOAuthFlow::new();
        flow.script(SANDBOX_HOST, Ok(auth_for(SANDBOX_HOST)));
        let (session, store) = session_with(flow);

        session.configure(sandbox_config()).await.unwrap();
        session.authenticate(&MockAuthorizationUi::authorizing("v")).await.unwrap();
        let committed = session.credentials().await.unwrap();

        // A fresh session over the same store picks the record up.
        let fresh = Session::new(
            Arc::clone(&store) as Arc<dyn CredentialStore>,
            Arc::new(StubOAuthFlow::new()),
            Arc::new(ScriptedConnector::new()),
        );
        fresh.configure(sandbox_config()).await.unwrap();
        assert!(fresh.restore().await.unwrap());
        assert!(fresh.is_authenticated().await);
        assert_eq!(fresh.credentials().await.unwrap(), committed);
    }
}
