//! Session lifecycle against a scripted identity provider: startup
//! resolution, the single-entry init guard, refresh-driven user updates and
//! the degrade-to-unauthenticated paths.

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use mealtrack::config::{ROLE_ADMIN, ROLE_USER};
use mealtrack::identity::{AuthEvent, IdentityProvider, SessionManager};

use common::{claims_for, MockProvider};

#[tokio::test]
async fn init_without_existing_session_resolves_unauthenticated() {
    let provider = Arc::new(MockProvider::unauthenticated());
    let mgr = SessionManager::new(provider.clone());

    let before = mgr.snapshot();
    assert!(before.is_loading);
    assert!(!before.is_authenticated);

    let authenticated = mgr.init().await;
    assert!(!authenticated);

    let after = mgr.snapshot();
    assert!(!after.is_authenticated);
    assert!(after.user.is_none());
    assert!(!after.is_loading);
}

#[tokio::test]
async fn init_with_existing_session_populates_user_from_claims() {
    let provider = Arc::new(MockProvider::authenticated(
        "token-1",
        claims_for("alice", &[ROLE_USER, ROLE_ADMIN], 3600),
    ));
    let mgr = SessionManager::new(provider.clone());

    assert!(mgr.init().await);
    let s = mgr.snapshot();
    assert!(s.is_authenticated);
    assert!(!s.is_loading);
    let user = s.user.expect("user populated");
    assert_eq!(user.username, "alice");
    assert_eq!(user.email.as_deref(), Some("alice@example.com"));
    assert!(user.roles.contains(ROLE_ADMIN) && user.roles.contains(ROLE_USER));
}

#[tokio::test]
async fn concurrent_init_invokes_provider_once_and_converges() {
    let provider = Arc::new(
        MockProvider::authenticated("token-1", claims_for("alice", &[ROLE_USER], 3600))
            .with_init_delay(Duration::from_millis(100)),
    );
    let mgr = SessionManager::new(provider.clone());

    let (a, b) = tokio::join!(mgr.init(), mgr.init());
    assert_eq!(a, b);
    assert_eq!(provider.init_calls.load(Ordering::SeqCst), 1);

    // A late call short-circuits too.
    assert!(mgr.init().await);
    assert_eq!(provider.init_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn provider_init_failure_is_swallowed_as_unauthenticated() {
    let provider = Arc::new(MockProvider::unreachable_at_init());
    let mgr = SessionManager::new(provider);
    assert!(!mgr.init().await);
    let s = mgr.snapshot();
    assert!(!s.is_authenticated && s.user.is_none() && !s.is_loading);
}

#[tokio::test]
async fn authenticated_session_without_claims_is_not_trusted() {
    let provider = Arc::new(MockProvider::broken());
    let mgr = SessionManager::new(provider);
    assert!(!mgr.init().await);
    let s = mgr.snapshot();
    assert!(!s.is_authenticated && s.user.is_none() && !s.is_loading);
}

#[tokio::test]
async fn refresh_failed_event_clears_the_session() {
    let provider = Arc::new(MockProvider::authenticated(
        "token-1",
        claims_for("alice", &[ROLE_USER], 3600),
    ));
    let mgr = SessionManager::new(provider.clone());
    assert!(mgr.init().await);

    provider.emit(AuthEvent::RefreshFailed);
    tokio::time::sleep(Duration::from_millis(50)).await;

    let s = mgr.snapshot();
    assert!(!s.is_authenticated);
    assert!(s.user.is_none());
    assert!(!s.is_loading);
}

#[tokio::test]
async fn expired_token_with_failing_refresh_degrades_to_unauthenticated() {
    // exp already in the past: the expiry task attempts one refresh and
    // clears the session when it fails.
    let provider = Arc::new(MockProvider::authenticated(
        "token-1",
        claims_for("alice", &[ROLE_USER], -1),
    ));
    provider.fail_next_refresh();
    let mgr = SessionManager::new(provider.clone());
    assert!(mgr.init().await);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(provider.update_calls.load(Ordering::SeqCst) >= 1);
    let s = mgr.snapshot();
    assert!(!s.is_authenticated);
    assert!(s.user.is_none());
}

#[tokio::test]
async fn rotation_at_expiry_recomputes_the_user() {
    let provider = Arc::new(MockProvider::authenticated(
        "token-1",
        claims_for("alice", &[ROLE_USER], 0),
    ));
    provider.push_refresh("token-2", claims_for("alice", &[ROLE_USER, ROLE_ADMIN], 3600));
    let mgr = SessionManager::new(provider.clone());
    assert!(mgr.init().await);

    tokio::time::sleep(Duration::from_millis(200)).await;
    let s = mgr.snapshot();
    assert!(s.is_authenticated);
    assert!(s.user.expect("user").roles.contains(ROLE_ADMIN));
    assert_eq!(provider.bearer_token().as_deref(), Some("token-2"));
}

#[tokio::test]
async fn relogin_after_degrade_rearms_background_refresh() {
    // Degrade via a refresh failure, log in again with a token that is
    // already past expiry: the expiry mechanism must be re-armed and rotate
    // it, not sit on the torn-down tasks from the first session.
    let provider = Arc::new(MockProvider::authenticated(
        "token-1",
        claims_for("alice", &[ROLE_USER], 3600),
    ));
    let mgr = SessionManager::new(provider.clone());
    assert!(mgr.init().await);

    provider.emit(AuthEvent::RefreshFailed);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!mgr.snapshot().is_authenticated);

    provider.push_refresh("token-2", claims_for("alice", &[ROLE_USER], -1));
    provider.push_refresh("token-3", claims_for("alice", &[ROLE_USER], 3600));
    mgr.login("alice", "pw").await.expect("relogin");
    assert!(mgr.snapshot().is_authenticated);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(provider.update_calls.load(Ordering::SeqCst) >= 1);
    assert_eq!(provider.bearer_token().as_deref(), Some("token-3"));
    assert!(mgr.snapshot().is_authenticated);
}

#[tokio::test]
async fn login_populates_session_and_logout_clears_it() {
    let provider = Arc::new(MockProvider::unauthenticated());
    let mgr = SessionManager::new(provider.clone());
    assert!(!mgr.init().await);

    mgr.login("carol", "pw").await.expect("login");
    let s = mgr.snapshot();
    assert!(s.is_authenticated);
    assert_eq!(s.user.as_ref().map(|u| u.username.as_str()), Some("carol"));
    assert!(mgr.bearer_token().is_some());

    mgr.logout().await;
    let s = mgr.snapshot();
    assert!(!s.is_authenticated);
    assert!(s.user.is_none());
    assert!(mgr.bearer_token().is_none());
}
