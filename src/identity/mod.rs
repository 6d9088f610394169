//! Session lifecycle around an external identity provider.
//! Keep the public surface thin and split implementation across sub-modules.

mod claims;
mod keycloak;
mod provider;
mod session;

pub use claims::{decode_claims, RealmAccess, TokenClaims, User};
pub use keycloak::KeycloakProvider;
pub use provider::{AuthEvent, IdentityError, IdentityProvider};
pub use session::{Session, SessionManager};
