use crate::api_client::{self, AuthClient};
use crate::cache::{CachedAuthState, SecureAuthCache};
use crate::error::SyncError;
use crate::net::NetworkMonitor;
use crate::settings::Settings;
use crate::sync::SyncCoordinator;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Online-verified identity of this device. Exists only while the backend
/// has confirmed the session during this process lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: Uuid,
    pub email: String,
    pub authorized: bool,
    pub token: String,
    /// Known after a `/session` revalidation; sign-in itself does not
    /// report it.
    pub expires_at: Option<OffsetDateTime>,
}

impl Session {
    fn cached(&self) -> CachedAuthState {
        CachedAuthState {
            user_id: self.user_id,
            email: self.email.clone(),
            authorized: self.authorized,
        }
    }
}

/// Authentication lifecycle of the device.
///
/// `OfflineCached` is a degraded trust level: the identity came from the
/// encrypted cache, not from the backend, and is only good for local reads
/// and queued writes until a revalidation succeeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    Uninitialized,
    OnlineAuthenticated(Session),
    OfflineCached(CachedAuthState),
    Unauthenticated,
}

impl AuthState {
    pub fn user_id(&self) -> Option<Uuid> {
        match self {
            AuthState::OnlineAuthenticated(session) => Some(session.user_id),
            AuthState::OfflineCached(cached) => Some(cached.user_id),
            _ => None,
        }
    }
}

/// Drives every auth state transition and owns the only mutable copy of
/// [`AuthState`].
///
/// Transitions are guarded by a monotonic version: slow paths (a session
/// revalidation racing a sign-out, say) snapshot the version before their
/// first await and their result is dropped when any other transition
/// committed in between.
pub struct AuthSessionManager {
    settings: Settings,
    cache: SecureAuthCache,
    monitor: Arc<NetworkMonitor>,
    coordinator: Arc<SyncCoordinator>,
    state: RwLock<AuthState>,
    version: AtomicU64,
}

impl AuthSessionManager {
    pub fn new(
        settings: Settings,
        cache: SecureAuthCache,
        monitor: Arc<NetworkMonitor>,
        coordinator: Arc<SyncCoordinator>,
    ) -> Self {
        Self {
            settings,
            cache,
            monitor,
            coordinator,
            state: RwLock::new(AuthState::Uninitialized),
            version: AtomicU64::new(0),
        }
    }

    pub async fn current(&self) -> AuthState {
        self.state.read().await.clone()
    }

    /// Remote client for the current device session. Fails when no session
    /// token exists on this device.
    pub fn client(&self) -> Result<AuthClient, SyncError> {
        let token = self.settings.session().ok_or(SyncError::NotAuthenticated)?;
        AuthClient::new(&self.settings.server_address, &token)
    }

    fn begin(&self) -> u64 {
        self.version.load(Ordering::SeqCst)
    }

    /// Publish `next` unless another transition won the race since
    /// `started` was snapshotted; a stale result is dropped silently and
    /// the state that beat it stays. The version bump happens while the
    /// write lock is held, so publication order always matches version
    /// order.
    async fn commit(&self, started: u64, next: AuthState) -> AuthState {
        let mut state = self.state.write().await;
        let swapped = self
            .version
            .compare_exchange(started, started + 1, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok();
        if !swapped {
            debug!("stale auth transition dropped");
            return state.clone();
        }
        *state = next.clone();
        next
    }

    /// Startup path. Online: revalidate the stored session token against
    /// the backend. Offline (or backend unreachable): fall back to the
    /// encrypted cache; with no cache there is no identity to restore.
    pub async fn initialize(&self) -> Result<AuthState, SyncError> {
        let started = self.begin();
        if self.monitor.is_online() {
            self.bootstrap_online(started).await
        } else {
            self.bootstrap_offline(started).await
        }
    }

    async fn bootstrap_online(&self, started: u64) -> Result<AuthState, SyncError> {
        let Some(token) = self.settings.session() else {
            return Ok(self.commit(started, AuthState::Unauthenticated).await);
        };

        let client = AuthClient::new(&self.settings.server_address, &token)?;
        match client.get_session().await {
            Ok(res) => {
                let session = Session {
                    user_id: res.user.id,
                    email: res.user.email,
                    authorized: res.user.authorized,
                    token,
                    expires_at: Some(res.expires_at),
                };
                self.cache.write(&session.cached()).map_err(SyncError::store)?;

                let state = self
                    .commit(started, AuthState::OnlineAuthenticated(session.clone()))
                    .await;
                if session.authorized {
                    self.spawn_background_sync(&session);
                }
                Ok(state)
            }
            // the backend rejected the session outright; nothing on this
            // device may keep claiming that identity
            Err(SyncError::NotAuthenticated) => {
                info!("stored session rejected by the backend, signing out");
                self.settings.clear_session().map_err(SyncError::store)?;
                self.cache.purge().map_err(SyncError::store)?;
                Ok(self.commit(started, AuthState::Unauthenticated).await)
            }
            // unreachable is not a verdict; degrade to the cache instead
            Err(err) => {
                warn!("session revalidation unreachable, using cache: {err}");
                self.bootstrap_offline(started).await
            }
        }
    }

    async fn bootstrap_offline(&self, started: u64) -> Result<AuthState, SyncError> {
        match self.cache.read() {
            Some(cached) => Ok(self.commit(started, AuthState::OfflineCached(cached)).await),
            None => {
                self.commit(started, AuthState::Unauthenticated).await;
                Err(SyncError::CacheMiss)
            }
        }
    }

    /// Sign-in never works offline; there is no way to verify credentials
    /// without the backend.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, SyncError> {
        if !self.monitor.is_online() {
            return Err(SyncError::Offline);
        }
        let started = self.begin();

        let res = api_client::login(&self.settings.server_address, email, password).await?;
        self.establish(started, res.session, res.user).await
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> Result<Session, SyncError> {
        if !self.monitor.is_online() {
            return Err(SyncError::Offline);
        }
        let started = self.begin();

        let res = api_client::register(&self.settings.server_address, email, password).await?;
        self.establish(started, res.session, res.user).await
    }

    async fn establish(
        &self,
        started: u64,
        token: String,
        user: memry_common::api::UserResponse,
    ) -> Result<Session, SyncError> {
        let session = Session {
            user_id: user.id,
            email: user.email,
            authorized: user.authorized,
            token,
            expires_at: None,
        };

        self.settings
            .save_session(&session.token)
            .map_err(SyncError::store)?;
        self.cache.write(&session.cached()).map_err(SyncError::store)?;

        self.commit(started, AuthState::OnlineAuthenticated(session.clone()))
            .await;
        if session.authorized {
            self.spawn_background_sync(&session);
        }
        Ok(session)
    }

    pub async fn reset_password(&self, email: &str) -> Result<(), SyncError> {
        if !self.monitor.is_online() {
            return Err(SyncError::Offline);
        }
        api_client::reset_password(&self.settings.server_address, email).await?;
        Ok(())
    }

    /// Local teardown first so sign-out also works offline; the remote
    /// session revocation is best-effort.
    pub async fn sign_out(&self) -> Result<(), SyncError> {
        let started = self.begin();
        let token = self.settings.session();

        self.settings.clear_session().map_err(SyncError::store)?;
        self.cache.purge().map_err(SyncError::store)?;
        self.commit(started, AuthState::Unauthenticated).await;

        if let Some(token) = token {
            if self.monitor.is_online() {
                match AuthClient::new(&self.settings.server_address, &token) {
                    Ok(client) => {
                        if let Err(err) = client.logout().await {
                            warn!("remote logout failed: {err}");
                        }
                    }
                    Err(err) => warn!("remote logout skipped: {err}"),
                }
            }
        }

        Ok(())
    }

    /// Connectivity callback. Coming back online while running on cached
    /// trust triggers a revalidation; an explicit rejection purges the
    /// cache, mere unreachability keeps the degraded state.
    pub async fn handle_connectivity(&self, online: bool) -> Result<AuthState, SyncError> {
        if !online {
            return Ok(self.current().await);
        }

        match self.current().await {
            AuthState::OfflineCached(_) | AuthState::Uninitialized => {
                let started = self.begin();
                self.bootstrap_online(started).await
            }
            state => Ok(state),
        }
    }

    /// Platform hook for "the session file changed under us" (another
    /// process signed in or out). Re-runs the startup path.
    pub async fn handle_session_change(&self) -> Result<AuthState, SyncError> {
        self.initialize().await
    }

    fn spawn_background_sync(&self, session: &Session) {
        let coordinator = self.coordinator.clone();
        let address = self.settings.server_address.clone();
        let token = session.token.clone();
        let user_id = session.user_id;

        tokio::spawn(async move {
            let client = match AuthClient::new(&address, &token) {
                Ok(client) => client,
                Err(err) => {
                    warn!("background sync skipped: {err}");
                    return;
                }
            };
            if let Err(err) = coordinator.sync_all(&client, user_id).await {
                warn!("background sync failed ({}): {err}", err.reason_code());
            }
        });
    }
}
