use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use log::{debug, error, warn};
use tokio::sync::{Mutex, Notify, RwLock, mpsc};
use tokio::time::sleep;

use crate::config::{ApiConfig, Consent};
use crate::handlers::chat::{ChatCallbacks, ChatMessageHandler};
use crate::handlers::friends::{FriendRequestHandler, FriendRequestReactionHandler};
use crate::handlers::status::StatusUpdateHandler;
use crate::handlers::{PushHandler, PushRouter};
use crate::http::HttpClient;
use crate::providers::{
    ConsentPrompt, GameSessionProof, NotificationProvider, StatusUpdateProvider,
    TranslationProvider,
};
use crate::response::Response;
use crate::socket::{SocketEvent, SocketFactory, SocketHandle};
use crate::types::{AccountSettings, Profile, User};
use crate::users::UserCache;

const RECONNECT_BACKOFF_CAP: Duration = Duration::from_secs(30);

/// Lifecycle of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    Authenticating,
    Authenticated,
    Connecting,
    Connected,
}

/// Token and socket handle change together; a single lock guards the pair
/// so no request observes a half-updated combination.
#[derive(Default)]
pub(crate) struct ConnState {
    pub(crate) token: Option<String>,
    pub(crate) socket: Option<Arc<dyn SocketHandle>>,
}

/// The session object owning the connection to the backend.
///
/// Constructed once by the application root and handed by reference to
/// every consumer; there is deliberately no global instance. At most one
/// session is live per client; a second `startup` while one is running is
/// a logged no-op.
pub struct ApiClient {
    pub(crate) http: Arc<dyn HttpClient>,
    pub(crate) socket_factory: Arc<dyn SocketFactory>,
    pub(crate) config: Arc<ApiConfig>,
    pub(crate) notifications: Arc<dyn NotificationProvider>,
    pub(crate) translations: Arc<dyn TranslationProvider>,
    pub(crate) status_provider: Arc<dyn StatusUpdateProvider>,
    pub(crate) consent_prompt: Arc<dyn ConsentPrompt>,
    pub(crate) session_proof: Arc<dyn GameSessionProof>,

    pub(crate) state: Mutex<SessionState>,
    pub(crate) conn: Mutex<ConnState>,
    pub(crate) identity: Mutex<Option<Profile>>,
    pub(crate) self_user: RwLock<Option<User>>,
    pub(crate) settings: RwLock<AccountSettings>,
    pub(crate) router: PushRouter,
    pub(crate) chat: ChatCallbacks,
    pub(crate) users: UserCache,
    pub(crate) shutdown: Notify,
    pub(crate) expected_disconnect: AtomicBool,
    pub(crate) reconnect_failures: AtomicU32,
    /// Incremented per connection; background loops carry the value they
    /// were spawned with and bail out once it goes stale.
    pub(crate) connection_generation: AtomicU64,
}

impl ApiClient {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        http: Arc<dyn HttpClient>,
        socket_factory: Arc<dyn SocketFactory>,
        config: Arc<ApiConfig>,
        notifications: Arc<dyn NotificationProvider>,
        translations: Arc<dyn TranslationProvider>,
        status_provider: Arc<dyn StatusUpdateProvider>,
        consent_prompt: Arc<dyn ConsentPrompt>,
        session_proof: Arc<dyn GameSessionProof>,
    ) -> Arc<Self> {
        Arc::new(Self {
            http,
            socket_factory,
            config,
            notifications,
            translations,
            status_provider,
            consent_prompt,
            session_proof,
            state: Mutex::new(SessionState::Unauthenticated),
            conn: Mutex::new(ConnState::default()),
            identity: Mutex::new(None),
            self_user: RwLock::new(None),
            settings: RwLock::new(AccountSettings::default()),
            router: PushRouter::new(Self::build_handlers()),
            chat: ChatCallbacks::default(),
            users: UserCache::default(),
            shutdown: Notify::new(),
            expected_disconnect: AtomicBool::new(false),
            reconnect_failures: AtomicU32::new(0),
            connection_generation: AtomicU64::new(0),
        })
    }

    fn build_handlers() -> Vec<Arc<dyn PushHandler>> {
        vec![
            Arc::new(ChatMessageHandler),
            Arc::new(FriendRequestHandler),
            Arc::new(FriendRequestReactionHandler),
            Arc::new(StatusUpdateHandler),
        ]
    }

    pub async fn state(&self) -> SessionState {
        *self.state.lock().await
    }

    pub async fn is_connected(&self) -> bool {
        self.state().await == SessionState::Connected
    }

    pub(crate) async fn token(&self) -> Option<String> {
        self.conn.lock().await.token.clone()
    }

    /// The self-user singleton, present once authentication succeeded.
    pub async fn self_user(&self) -> Option<User> {
        self.self_user.read().await.clone()
    }

    pub async fn account_settings(&self) -> AccountSettings {
        self.settings.read().await.clone()
    }

    pub(crate) fn log_detailed(&self, message: &str) {
        if self.config.detailed_logging() {
            debug!(target: "api", "[detail] {message}");
        }
    }

    /// Stores the identity and brings the session up when the feature is
    /// enabled and consent is on file. Offline-mode profiles never start a
    /// session. An unset consent asks the prompt collaborator and persists
    /// the answer before proceeding.
    pub async fn startup(self: &Arc<Self>, profile: Profile) {
        *self.identity.lock().await = Some(profile.clone());
        if !self.config.enabled() {
            return;
        }
        if profile.offline {
            debug!(target: "api", "offline-mode profile, not starting a session");
            return;
        }
        match self.config.privacy() {
            Consent::Denied => {}
            Consent::Accepted => self.startup_session().await,
            Consent::Unset => {
                let accepted = self.consent_prompt.request_consent().await;
                self.config.set_privacy(if accepted {
                    Consent::Accepted
                } else {
                    Consent::Denied
                });
                if accepted {
                    self.startup_session().await;
                }
            }
        }
    }

    async fn startup_session(self: &Arc<Self>) {
        {
            let mut state = self.state.lock().await;
            if *state != SessionState::Unauthenticated {
                warn!(target: "api", "session already running, ignoring startup");
                return;
            }
            *state = SessionState::Authenticating;
        }
        if let Err(e) = self.authenticate().await {
            error!(target: "api", "authentication failed: {e}");
            if self.config.detailed_logging() {
                let body = self
                    .translations
                    .translate("api.error.handshake", &[&e.to_string()]);
                self.notifications.add_status("api.error.handshake", &body);
            }
            self.reset_session().await;
        }
    }

    /// Drops the token/socket pair and returns to `Unauthenticated`.
    pub(crate) async fn reset_session(&self) {
        {
            let mut conn = self.conn.lock().await;
            conn.token = None;
            conn.socket = None;
        }
        *self.state.lock().await = SessionState::Unauthenticated;
    }

    /// Sends a normal-closure frame when the push channel is open; no-op
    /// otherwise.
    pub async fn close_socket(&self) {
        let socket = self.conn.lock().await.socket.take();
        if let Some(socket) = socket {
            socket.close().await;
        }
    }

    /// Tears the session down. Safe to call repeatedly; in-flight requests
    /// resolve or fail on their own.
    pub async fn shutdown(&self) {
        self.expected_disconnect.store(true, Ordering::SeqCst);
        self.shutdown.notify_waiters();
        let socket = {
            let mut conn = self.conn.lock().await;
            conn.token = None;
            conn.socket.take()
        };
        if let Some(socket) = socket {
            socket.close().await;
        }
        *self.state.lock().await = SessionState::Unauthenticated;
        debug!(target: "api", "session shut down");
    }

    /// Shutdown if connected, then re-run startup with the last known
    /// identity. Without one the feature is disabled instead.
    pub async fn restart(self: &Arc<Self>) {
        if self.is_connected().await {
            self.shutdown().await;
        }
        let identity = self.identity.lock().await.clone();
        match identity {
            Some(profile) => self.startup(profile).await,
            None => self.config.set_enabled(false),
        }
    }

    pub(crate) fn current_generation(&self) -> u64 {
        self.connection_generation.load(Ordering::SeqCst)
    }

    /// Consumes push-channel events in arrival order. One instance of this
    /// loop runs per connection; it ends on closure or shutdown. A loop
    /// whose generation went stale belongs to a replaced connection and
    /// must not touch the reconnect machinery.
    pub(crate) async fn socket_loop(
        self: Arc<Self>,
        mut events: mpsc::Receiver<SocketEvent>,
        generation: u64,
    ) {
        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.notified() => {
                    debug!(target: "api", "shutdown signaled, leaving socket loop");
                    return;
                }
                event = events.recv() => match event {
                    Some(SocketEvent::Connected) => {
                        debug!(target: "api", "push channel open");
                    }
                    Some(SocketEvent::MessageReceived(frame)) => {
                        self.log_detailed(&format!("handling push frame: {frame}"));
                        self.dispatch_push(&frame).await;
                    }
                    Some(SocketEvent::Closed) | None => {
                        let stale = generation != self.current_generation();
                        if stale || self.expected_disconnect.load(Ordering::SeqCst) {
                            debug!(target: "api", "push channel closed as requested");
                        } else {
                            self.handle_unexpected_close().await;
                        }
                        return;
                    }
                }
            }
        }
    }

    pub(crate) async fn dispatch_push(self: &Arc<Self>, frame: &str) {
        let message = Response::from_frame(frame);
        let Some(target) = message.body_str("target").map(str::to_string) else {
            error!(target: "api", "push frame without target field: {frame}");
            return;
        };
        if !self.router.dispatch(self, &target, &message).await {
            // Unknown targets are expected from newer backends.
            debug!(target: "api", "no handler for push target {target:?}, dropping");
        }
    }

    /// Reconnect policy: one full startup re-entry per closure event, with
    /// a small linear delay between repeated failures.
    ///
    /// Returns a boxed future rather than being an `async fn` to break the
    /// recursive-async `Send` inference cycle (socket_loop ->
    /// handle_unexpected_close -> startup -> authenticate ->
    /// spawn(socket_loop)); erasing this edge to a concrete `Send` type lets
    /// the solver terminate. Behaviour is unchanged.
    fn handle_unexpected_close(
        self: &Arc<Self>,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send>> {
        let this = self.clone();
        Box::pin(async move {
            warn!(target: "api", "push channel closed unexpectedly");
            this.reset_session().await;
            if !this.config.enabled() {
                return;
            }
            let identity = this.identity.lock().await.clone();
            let Some(profile) = identity else {
                return;
            };
            let failures = this.reconnect_failures.fetch_add(1, Ordering::SeqCst);
            let delay = Duration::from_secs(u64::from(failures) * 2).min(RECONNECT_BACKOFF_CAP);
            if !delay.is_zero() {
                debug!(target: "api", "waiting {delay:?} before reconnecting");
                sleep(delay).await;
            }
            this.log_detailed("restarting session after unexpected close");
            this.startup(profile).await;
        })
    }
}
