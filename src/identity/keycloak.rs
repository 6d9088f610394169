//! Keycloak client over the OpenID Connect token endpoints. Direct-grant
//! login, refresh-token rotation and provider-side logout; claims come from
//! the access token payload, never a userinfo round-trip.

use parking_lot::RwLock;
use serde::Deserialize;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::config::KeycloakConfig;

use super::claims::{decode_claims, TokenClaims};
use super::provider::{AuthEvent, IdentityError, IdentityProvider};

#[derive(Debug, Clone)]
struct TokenSet {
    access_token: String,
    refresh_token: String,
    /// Expiry of the access token, epoch seconds, taken from its claims.
    expires_at: i64,
    claims: TokenClaims,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

pub struct KeycloakProvider {
    cfg: KeycloakConfig,
    http: reqwest::Client,
    tokens: RwLock<Option<TokenSet>>,
    events: broadcast::Sender<AuthEvent>,
}

impl KeycloakProvider {
    pub fn new(cfg: KeycloakConfig) -> Self {
        let (events, _) = broadcast::channel(16);
        Self { cfg, http: reqwest::Client::new(), tokens: RwLock::new(None), events }
    }

    fn token_endpoint(&self) -> String {
        format!("{}/realms/{}/protocol/openid-connect/token", self.cfg.url, self.cfg.realm)
    }

    fn logout_endpoint(&self) -> String {
        format!("{}/realms/{}/protocol/openid-connect/logout", self.cfg.url, self.cfg.realm)
    }

    async fn post_grant(&self, form: &[(&str, &str)]) -> Result<TokenSet, IdentityError> {
        let resp = self.http.post(self.token_endpoint()).form(form).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body: serde_json::Value = resp.json().await.unwrap_or_default();
            let message = body
                .get("error_description")
                .or_else(|| body.get("error"))
                .and_then(|v| v.as_str())
                .unwrap_or("token request rejected")
                .to_string();
            return Err(IdentityError::Provider { status: status.as_u16(), message });
        }
        let tr: TokenResponse = resp.json().await?;
        let claims = decode_claims(&tr.access_token)?;
        // Prefer the exp claim; fall back to expires_in relative to now.
        let expires_at = claims
            .exp
            .or_else(|| tr.expires_in.map(|s| chrono::Utc::now().timestamp() + s))
            .unwrap_or_else(|| chrono::Utc::now().timestamp());
        Ok(TokenSet {
            access_token: tr.access_token,
            refresh_token: tr.refresh_token,
            expires_at,
            claims,
        })
    }
}

#[async_trait::async_trait]
impl IdentityProvider for KeycloakProvider {
    async fn init(&self) -> Result<bool, IdentityError> {
        // Check-existing-session-only: a fresh process holds no token set, so
        // this resolves unauthenticated without contacting the provider.
        let now = chrono::Utc::now().timestamp();
        let alive = self.tokens.read().as_ref().is_some_and(|t| t.expires_at > now);
        debug!(target: "mealtrack::identity", "provider init: existing session = {}", alive);
        Ok(alive)
    }

    async fn login(&self, username: &str, password: &str) -> Result<(), IdentityError> {
        let set = self
            .post_grant(&[
                ("grant_type", "password"),
                ("client_id", &self.cfg.client_id),
                ("username", username),
                ("password", password),
            ])
            .await?;
        info!(target: "mealtrack::identity", "login ok user={} exp={}", username, set.expires_at);
        *self.tokens.write() = Some(set);
        Ok(())
    }

    async fn update_token(&self, min_validity_secs: i64) -> Result<bool, IdentityError> {
        let (refresh_token, remaining) = {
            let guard = self.tokens.read();
            let Some(t) = guard.as_ref() else {
                return Err(IdentityError::NotAuthenticated);
            };
            (t.refresh_token.clone(), t.expires_at - chrono::Utc::now().timestamp())
        };
        if remaining > min_validity_secs {
            return Ok(false);
        }
        let refreshed = self
            .post_grant(&[
                ("grant_type", "refresh_token"),
                ("client_id", &self.cfg.client_id),
                ("refresh_token", &refresh_token),
            ])
            .await;
        match refreshed {
            Ok(set) => {
                debug!(target: "mealtrack::identity", "token rotated, new exp={}", set.expires_at);
                *self.tokens.write() = Some(set);
                let _ = self.events.send(AuthEvent::Refreshed);
                Ok(true)
            }
            Err(e) => {
                warn!(target: "mealtrack::identity", "token refresh failed: {}", e);
                *self.tokens.write() = None;
                let _ = self.events.send(AuthEvent::RefreshFailed);
                Err(e)
            }
        }
    }

    async fn logout(&self) -> Result<(), IdentityError> {
        let refresh_token = self.tokens.write().take().map(|t| t.refresh_token);
        if let Some(rt) = refresh_token {
            let resp = self
                .http
                .post(self.logout_endpoint())
                .form(&[("client_id", self.cfg.client_id.as_str()), ("refresh_token", &rt)])
                .send()
                .await?;
            if !resp.status().is_success() {
                return Err(IdentityError::Provider {
                    status: resp.status().as_u16(),
                    message: "logout rejected".into(),
                });
            }
        }
        info!(target: "mealtrack::identity", "logged out");
        Ok(())
    }

    fn claims(&self) -> Option<TokenClaims> {
        self.tokens.read().as_ref().map(|t| t.claims.clone())
    }

    fn bearer_token(&self) -> Option<String> {
        self.tokens.read().as_ref().map(|t| t.access_token.clone())
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }
}
