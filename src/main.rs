//!
//! mealtrack CLI binary
//! --------------------
//! Interactive client for the meal-tracking API gateway. Resolves an existing
//! identity-provider session at startup (never forcing a login), then starts
//! the interpreter for browsing and managing products.

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use mealtrack::api::{ApiClient, ProductApi};
use mealtrack::cli::run_repl;
use mealtrack::config::AppConfig;
use mealtrack::identity::{KeycloakProvider, SessionManager};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Init logging
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info")).unwrap();
    fmt().with_env_filter(filter).init();

    let cfg = AppConfig::from_env();
    info!(
        target: "mealtrack",
        "mealtrack starting: api='{}', keycloak='{}', realm='{}', client_id='{}'",
        cfg.api_base_url, cfg.keycloak.url, cfg.keycloak.realm, cfg.keycloak.client_id
    );

    let provider = Arc::new(KeycloakProvider::new(cfg.keycloak.clone()));
    let session = SessionManager::new(provider);

    // Awaited once; check-existing-session-only, failure resolves to
    // unauthenticated without surfacing an error.
    let authenticated = session.init().await;
    info!(target: "mealtrack", "session initialized, authenticated={}", authenticated);

    let client = ApiClient::new(&cfg.api_base_url, session)?;
    run_repl(ProductApi::new(client)).await
}
