//! Runtime configuration sourced from environment variables with local-dev
//! defaults matching the docker-compose setup of the backend services.

pub const ROLE_ADMIN: &str = "ADMIN";
pub const ROLE_USER: &str = "USER";

/// Products returned per page by the gateway; a full page means more may follow.
pub const PRODUCTS_PER_PAGE: usize = 50;

/// Wall-clock interval between background refresh attempts.
pub const REFRESH_INTERVAL_SECS: u64 = 60;
/// Refresh when fewer than this many seconds remain before expiry.
pub const REFRESH_MIN_VALIDITY_SECS: i64 = 70;
/// Margin used by the expiry-driven refresh attempt.
pub const EXPIRY_MIN_VALIDITY_SECS: i64 = 30;
/// Margin used for the single refresh-and-retry after a 401.
pub const RETRY_MIN_VALIDITY_SECS: i64 = 5;

#[derive(Debug, Clone)]
pub struct KeycloakConfig {
    pub url: String,
    pub realm: String,
    pub client_id: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// API gateway base URL, without an /api suffix; the gateway routes
    /// products under /product/api/**.
    pub api_base_url: String,
    pub keycloak: KeycloakConfig,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            api_base_url: env_or("MEALTRACK_API_URL", "http://localhost:8080"),
            keycloak: KeycloakConfig {
                url: env_or("MEALTRACK_KEYCLOAK_URL", "http://localhost:7080"),
                realm: env_or("MEALTRACK_REALM", "MealTrackingApp"),
                client_id: env_or("MEALTRACK_CLIENT_ID", "mealtrackingappclient"),
            },
        }
    }
}
