//! Scripted identity provider for exercising the session lifecycle without a
//! real Keycloak.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use tokio::sync::broadcast;

use mealtrack::identity::{AuthEvent, IdentityError, IdentityProvider, RealmAccess, TokenClaims};

pub fn claims_for(username: &str, roles: &[&str], exp_offset_secs: i64) -> TokenClaims {
    TokenClaims {
        preferred_username: Some(username.to_string()),
        email: Some(format!("{}@example.com", username)),
        realm_access: Some(RealmAccess { roles: roles.iter().map(|r| r.to_string()).collect() }),
        exp: Some(chrono::Utc::now().timestamp() + exp_offset_secs),
    }
}

pub struct MockProvider {
    authenticated_at_init: bool,
    init_delay: Duration,
    current: RwLock<Option<(String, TokenClaims)>>,
    pending_refresh: Mutex<VecDeque<(String, TokenClaims)>>,
    fail_refresh: AtomicBool,
    fail_init: AtomicBool,
    pub init_calls: AtomicUsize,
    pub update_calls: AtomicUsize,
    events: broadcast::Sender<AuthEvent>,
}

impl MockProvider {
    pub fn unauthenticated() -> Self {
        Self::build(false, None)
    }

    pub fn authenticated(token: &str, claims: TokenClaims) -> Self {
        Self::build(true, Some((token.to_string(), claims)))
    }

    /// Reports an existing session but exposes no claims.
    pub fn broken() -> Self {
        Self::build(true, None)
    }

    /// Fails the init call outright.
    pub fn unreachable_at_init() -> Self {
        let p = Self::build(false, None);
        p.fail_init.store(true, Ordering::SeqCst);
        p
    }

    fn build(authenticated_at_init: bool, current: Option<(String, TokenClaims)>) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            authenticated_at_init,
            init_delay: Duration::from_millis(0),
            current: RwLock::new(current),
            pending_refresh: Mutex::new(VecDeque::new()),
            fail_refresh: AtomicBool::new(false),
            fail_init: AtomicBool::new(false),
            init_calls: AtomicUsize::new(0),
            update_calls: AtomicUsize::new(0),
            events,
        }
    }

    pub fn with_init_delay(mut self, delay: Duration) -> Self {
        self.init_delay = delay;
        self
    }

    /// Queue a token rotation for the next refresh attempt.
    pub fn push_refresh(&self, token: &str, claims: TokenClaims) {
        self.pending_refresh.lock().push_back((token.to_string(), claims));
    }

    pub fn fail_next_refresh(&self) {
        self.fail_refresh.store(true, Ordering::SeqCst);
    }

    pub fn emit(&self, event: AuthEvent) {
        let _ = self.events.send(event);
    }
}

#[async_trait]
impl IdentityProvider for MockProvider {
    async fn init(&self) -> Result<bool, IdentityError> {
        self.init_calls.fetch_add(1, Ordering::SeqCst);
        if !self.init_delay.is_zero() {
            tokio::time::sleep(self.init_delay).await;
        }
        if self.fail_init.load(Ordering::SeqCst) {
            return Err(IdentityError::Provider { status: 503, message: "provider unreachable".into() });
        }
        Ok(self.authenticated_at_init)
    }

    async fn login(&self, username: &str, _password: &str) -> Result<(), IdentityError> {
        let next = self.pending_refresh.lock().pop_front();
        let set = next.unwrap_or_else(|| ("login-token".to_string(), claims_for(username, &["USER"], 3600)));
        *self.current.write() = Some(set);
        Ok(())
    }

    async fn update_token(&self, _min_validity_secs: i64) -> Result<bool, IdentityError> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_refresh.load(Ordering::SeqCst) {
            *self.current.write() = None;
            let _ = self.events.send(AuthEvent::RefreshFailed);
            return Err(IdentityError::Provider { status: 400, message: "session not active".into() });
        }
        match self.pending_refresh.lock().pop_front() {
            Some(set) => {
                *self.current.write() = Some(set);
                let _ = self.events.send(AuthEvent::Refreshed);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn logout(&self) -> Result<(), IdentityError> {
        *self.current.write() = None;
        Ok(())
    }

    fn claims(&self) -> Option<TokenClaims> {
        self.current.read().as_ref().map(|(_, c)| c.clone())
    }

    fn bearer_token(&self) -> Option<String> {
        self.current.read().as_ref().map(|(t, _)| t.clone())
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }
}
