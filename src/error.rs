//! Client-side error model: one enum spanning transport failures, identity
//! provider failures and structured errors returned by the backend gateway.

use serde::Deserialize;
use thiserror::Error;

/// Structured error body produced by the backend services.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorBody {
    #[serde(default)]
    pub status_code: Option<u16>,
    #[serde(default)]
    pub status_message: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub occurrence_time: Option<String>,
}

#[derive(Debug, Error)]
pub enum ClientError {
    /// 401 from the backend after the refresh-and-retry attempt, or a request
    /// that requires authentication while the session has none.
    #[error("not authenticated: {message}")]
    Auth { message: String },

    /// 403 from the backend; carries the human-readable denial message.
    #[error("{message}")]
    Forbidden { message: String },

    #[error("not found: {message}")]
    NotFound { message: String },

    /// Any other non-success status from the backend.
    #[error("backend error (HTTP {status}): {message}")]
    Backend { status: u16, message: String },

    #[error("identity provider error: {message}")]
    Identity { message: String },

    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}

impl ClientError {
    pub fn identity<S: Into<String>>(msg: S) -> Self {
        ClientError::Identity { message: msg.into() }
    }

    /// Map a non-success gateway response to an error, preferring the
    /// backend's own `message` field when the body parses.
    pub fn from_response(status: u16, body: Option<ApiErrorBody>) -> Self {
        let message = body
            .and_then(|b| b.message)
            .unwrap_or_else(|| default_message_for(status).to_string());
        match status {
            401 => ClientError::Auth { message },
            403 => ClientError::Forbidden { message },
            404 => ClientError::NotFound { message },
            _ => ClientError::Backend { status, message },
        }
    }

    pub fn message(&self) -> String {
        match self {
            ClientError::Auth { message }
            | ClientError::Forbidden { message }
            | ClientError::NotFound { message }
            | ClientError::Backend { message, .. }
            | ClientError::Identity { message } => message.clone(),
            ClientError::Transport(e) => e.to_string(),
        }
    }

    pub fn is_forbidden(&self) -> bool {
        matches!(self, ClientError::Forbidden { .. })
    }
}

fn default_message_for(status: u16) -> &'static str {
    match status {
        401 => "Authentication required",
        403 => "You do not have permission to perform this action",
        404 => "Resource not found",
        _ => "Request failed",
    }
}

pub type ClientResult<T> = Result<T, ClientError>;
