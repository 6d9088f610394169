//! Process-wide view of "am I logged in, and as whom", kept eventually
//! consistent with the identity provider. Owned and injectable rather than a
//! module-level static, so tests can run isolated managers side by side.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::OnceCell;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::{EXPIRY_MIN_VALIDITY_SECS, REFRESH_INTERVAL_SECS, REFRESH_MIN_VALIDITY_SECS};

use super::claims::User;
use super::provider::{AuthEvent, IdentityError, IdentityProvider};

/// Snapshot of the authentication state. `user` is non-null only when
/// `is_authenticated`; `is_loading` is true only until initialization
/// resolves, regardless of token refresh mechanics afterwards.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    pub is_authenticated: bool,
    pub user: Option<User>,
    pub is_loading: bool,
}

impl Session {
    pub fn new() -> Self {
        Self { is_authenticated: false, user: None, is_loading: true }
    }
}

pub struct SessionManager {
    provider: Arc<dyn IdentityProvider>,
    cell: RwLock<Session>,
    init_once: OnceCell<bool>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl SessionManager {
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Arc<Self> {
        Arc::new(Self {
            provider,
            cell: RwLock::new(Session::new()),
            init_once: OnceCell::new(),
            tasks: Mutex::new(Vec::new()),
        })
    }

    pub fn snapshot(&self) -> Session {
        self.cell.read().clone()
    }

    /// Resolve the session against the provider, at most once per manager.
    /// Concurrent callers await the same in-flight initialization instead of
    /// re-invoking the provider. Provider failure resolves as unauthenticated
    /// and is never surfaced as an error.
    pub async fn init(self: &Arc<Self>) -> bool {
        let me = Arc::clone(self);
        *self
            .init_once
            .get_or_init(|| async move {
                let authenticated = match me.provider.init().await {
                    Ok(a) => a,
                    Err(e) => {
                        warn!(target: "mealtrack::session", "provider init failed, resolving unauthenticated: {}", e);
                        false
                    }
                };
                let user = if authenticated {
                    me.provider.claims().map(|c| c.to_user())
                } else {
                    None
                };
                // A token without readable claims cannot back a session.
                let authenticated = authenticated && user.is_some();
                {
                    let mut s = me.cell.write();
                    s.is_authenticated = authenticated;
                    s.user = user;
                    s.is_loading = false;
                }
                if authenticated {
                    info!(target: "mealtrack::session", "session resumed for {}",
                        me.cell.read().user.as_ref().map(|u| u.username.as_str()).unwrap_or("?"));
                    me.arm_background();
                } else {
                    debug!(target: "mealtrack::session", "no existing session");
                }
                authenticated
            })
            .await
    }

    /// Interactive login; on success populates the session and arms the
    /// refresh machinery exactly as a resumed session would.
    pub async fn login(self: &Arc<Self>, username: &str, password: &str) -> Result<(), IdentityError> {
        self.provider.login(username, password).await?;
        self.apply_claims();
        self.arm_background();
        Ok(())
    }

    /// Provider logout, then clear local state and stop background refresh.
    pub async fn logout(self: &Arc<Self>) {
        if let Err(e) = self.provider.logout().await {
            warn!(target: "mealtrack::session", "provider logout failed: {}", e);
        }
        self.clear();
    }

    /// Access token for outgoing requests; None while unauthenticated.
    pub fn bearer_token(&self) -> Option<String> {
        if !self.cell.read().is_authenticated {
            return None;
        }
        self.provider.bearer_token()
    }

    /// One refresh attempt on behalf of a 401'd request. Rotation updates the
    /// session user; failure degrades the session via the provider's
    /// refresh-failed event.
    pub async fn refresh_for_retry(&self, min_validity_secs: i64) -> Result<bool, IdentityError> {
        let refreshed = self.provider.update_token(min_validity_secs).await?;
        if refreshed {
            self.apply_claims();
        }
        Ok(refreshed)
    }

    fn apply_claims(&self) {
        let user = self.provider.claims().map(|c| c.to_user());
        let mut s = self.cell.write();
        s.is_authenticated = user.is_some();
        s.user = user;
        s.is_loading = false;
    }

    fn clear(&self) {
        {
            let mut s = self.cell.write();
            s.is_authenticated = false;
            s.user = None;
            s.is_loading = false;
        }
        // Stale handles would block re-arming on the next login.
        for h in self.tasks.lock().drain(..) {
            h.abort();
        }
    }

    /// Arm the recurring refresh mechanisms:
    /// 1. a fixed-interval refresh that keeps the token comfortably ahead of
    ///    expiry and self-cancels on failure, leaving the session as-is;
    /// 2. an expiry-driven refresh that clears the session when it fails;
    /// 3. a provider event subscription that clears the session on an
    ///    explicit refresh failure.
    /// These may race close to expiry; the provider's refresh is idempotent
    /// under its token-versioning contract.
    fn arm_background(self: &Arc<Self>) {
        let mut tasks = self.tasks.lock();
        if !tasks.is_empty() {
            return;
        }

        let me = Arc::clone(self);
        tasks.push(tokio::spawn(async move {
            loop {
                tokio::time::sleep(Duration::from_secs(REFRESH_INTERVAL_SECS)).await;
                match me.provider.update_token(REFRESH_MIN_VALIDITY_SECS).await {
                    Ok(true) => {
                        debug!(target: "mealtrack::session", "periodic refresh rotated the token");
                        me.apply_claims();
                    }
                    Ok(false) => {}
                    Err(e) => {
                        // Stop the periodic mechanism; the expiry/event paths
                        // decide whether the session degrades.
                        warn!(target: "mealtrack::session", "periodic refresh failed, cancelling timer: {}", e);
                        break;
                    }
                }
            }
        }));

        let me = Arc::clone(self);
        tasks.push(tokio::spawn(async move {
            loop {
                let Some(remaining) = me.provider.claims().and_then(|c| c.seconds_until_expiry())
                else {
                    break;
                };
                if remaining > 0 {
                    tokio::time::sleep(Duration::from_secs(remaining as u64)).await;
                }
                match me.provider.update_token(EXPIRY_MIN_VALIDITY_SECS).await {
                    Ok(_) => {
                        me.apply_claims();
                        // Bail out rather than spin if the expiry never moved.
                        let stale = me
                            .provider
                            .claims()
                            .and_then(|c| c.seconds_until_expiry())
                            .map_or(true, |r| r <= 0);
                        if stale {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(target: "mealtrack::session", "refresh at expiry failed, clearing session: {}", e);
                        me.clear();
                        break;
                    }
                }
            }
        }));

        let me = Arc::clone(self);
        let mut rx = self.provider.subscribe();
        tasks.push(tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(AuthEvent::Refreshed) => me.apply_claims(),
                    Ok(AuthEvent::RefreshFailed) => {
                        warn!(target: "mealtrack::session", "refresh error event, clearing session");
                        me.clear();
                    }
                    Err(RecvError::Lagged(_)) => continue,
                    Err(RecvError::Closed) => break,
                }
            }
        }));
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        for h in self.tasks.lock().drain(..) {
            h.abort();
        }
    }
}
