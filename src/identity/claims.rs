use std::collections::HashSet;

use base64::Engine;
use serde::{Deserialize, Serialize};

use super::provider::IdentityError;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RealmAccess {
    #[serde(default)]
    pub roles: Vec<String>,
}

/// Subset of the identity token's claims this client reads. Decoded without
/// signature verification; the backend is the validating party.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TokenClaims {
    #[serde(default)]
    pub preferred_username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub realm_access: Option<RealmAccess>,
    /// Expiry instant, epoch seconds.
    #[serde(default)]
    pub exp: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct User {
    pub username: String,
    pub email: Option<String>,
    pub roles: HashSet<String>,
}

impl TokenClaims {
    /// Build the session user from the claims. Roles default to an empty set
    /// when the token carries none.
    pub fn to_user(&self) -> User {
        User {
            username: self.preferred_username.clone().unwrap_or_default(),
            email: self.email.clone(),
            roles: self
                .realm_access
                .as_ref()
                .map(|ra| ra.roles.iter().cloned().collect())
                .unwrap_or_default(),
        }
    }

    /// Seconds until expiry relative to now; negative when already expired.
    pub fn seconds_until_expiry(&self) -> Option<i64> {
        self.exp.map(|exp| exp - chrono::Utc::now().timestamp())
    }
}

/// Decode the payload segment of a JWT into claims. base64url without padding,
/// per RFC 7515.
pub fn decode_claims(token: &str) -> Result<TokenClaims, IdentityError> {
    let payload = token
        .split('.')
        .nth(1)
        .ok_or_else(|| IdentityError::MalformedToken("missing payload segment".into()))?;
    let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|e| IdentityError::MalformedToken(format!("payload not base64url: {}", e)))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| IdentityError::MalformedToken(format!("payload not claims JSON: {}", e)))
}
