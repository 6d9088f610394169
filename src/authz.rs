//! Ownership-based permission predicates. Pure and evaluated fresh on every
//! call; the backend remains the real enforcement point, these only gate
//! which actions the client offers.

use crate::config::ROLE_ADMIN;
use crate::identity::Session;
use crate::model::Product;

/// True when the session holds `role`. Unauthenticated or user-less sessions
/// hold no roles.
pub fn has_role(role: &str, session: &Session) -> bool {
    session.user.as_ref().map_or(false, |u| u.roles.contains(role))
}

/// Whether the current session may edit or delete `product`. Admins modify
/// global products (no owner recorded; absent and malformed owners are
/// indistinguishable here); everyone modifies their own.
pub fn can_modify(product: &Product, session: &Session) -> bool {
    if !session.is_authenticated {
        return false;
    }
    // An unpersisted record can never be modified.
    if product.product_id.is_none() {
        return false;
    }
    let is_admin = has_role(ROLE_ADMIN, session);
    let is_global = product.owner_username.is_none();
    let is_own = match (&product.owner_username, &session.user) {
        (Some(owner), Some(user)) => owner == &user.username,
        _ => false,
    };
    (is_admin && is_global) || is_own
}
