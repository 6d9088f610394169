use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::broadcast;

use super::claims::TokenClaims;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("identity provider rejected the request (HTTP {status}): {message}")]
    Provider { status: u16, message: String },

    #[error("no active session")]
    NotAuthenticated,

    #[error("malformed token: {0}")]
    MalformedToken(String),

    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}

/// Observable provider events, replacing per-callback hooks so the full set
/// of session triggers is enumerable and testable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEvent {
    /// The token was rotated; claims have changed.
    Refreshed,
    /// A refresh attempt failed; the underlying session is no longer usable.
    RefreshFailed,
}

/// Seam over the external identity provider. The real implementation talks
/// to Keycloak; tests substitute a scripted one.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Resolve whether an existing session is usable. Never interactive and
    /// never triggers a login; returns false when there is nothing to resume.
    async fn init(&self) -> Result<bool, IdentityError>;

    /// Interactive credential login (direct grant).
    async fn login(&self, username: &str, password: &str) -> Result<(), IdentityError>;

    /// Refresh the token if fewer than `min_validity_secs` remain before
    /// expiry. Returns true only when the token was actually rotated. Fails
    /// when the underlying session is no longer valid.
    async fn update_token(&self, min_validity_secs: i64) -> Result<bool, IdentityError>;

    /// End the provider-side session and drop the local token set.
    async fn logout(&self) -> Result<(), IdentityError>;

    /// Decoded claims of the current access token, if any.
    fn claims(&self) -> Option<TokenClaims>;

    /// Raw access token for the Authorization header, if any.
    fn bearer_token(&self) -> Option<String>;

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent>;
}
