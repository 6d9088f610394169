use std::sync::Arc;

use reqwest::{Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::RETRY_MIN_VALIDITY_SECS;
use crate::error::{ApiErrorBody, ClientError, ClientResult};
use crate::identity::SessionManager;

/// Gateway client shared by the typed endpoint wrappers. Holds the base URL,
/// the reqwest client and the session manager it borrows bearer tokens from.
#[derive(Clone)]
pub struct ApiClient {
    base: Url,
    http: reqwest::Client,
    session: Arc<SessionManager>,
}

impl ApiClient {
    pub fn new(base_url: &str, session: Arc<SessionManager>) -> ClientResult<Self> {
        let base = Url::parse(base_url)
            .map_err(|e| ClientError::identity(format!("invalid API base URL: {}", e)))?;
        Ok(Self { base, http: reqwest::Client::new(), session })
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    fn url(&self, path: &str) -> ClientResult<Url> {
        self.base
            .join(path)
            .map_err(|e| ClientError::identity(format!("invalid request path: {}", e)))
    }

    fn build(
        &self,
        method: &Method,
        url: &Url,
        query: &[(&str, String)],
        body: Option<&serde_json::Value>,
    ) -> reqwest::RequestBuilder {
        let mut req = self.http.request(method.clone(), url.clone());
        if !query.is_empty() {
            req = req.query(query);
        }
        if let Some(b) = body {
            req = req.json(b);
        }
        if let Some(token) = self.session.bearer_token() {
            req = req.bearer_auth(token);
        }
        req
    }

    /// Send a request; on 401, refresh the token once and retry with the new
    /// bearer. A second failure, or any other error status, propagates as-is.
    pub async fn send<B: Serialize>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&B>,
    ) -> ClientResult<reqwest::Response> {
        let url = self.url(path)?;
        let body = match body {
            Some(b) => Some(serde_json::to_value(b).map_err(|e| ClientError::Backend {
                status: 0,
                message: format!("unserializable request body: {}", e),
            })?),
            None => None,
        };

        let resp = self.build(&method, &url, query, body.as_ref()).send().await?;
        if resp.status() != StatusCode::UNAUTHORIZED {
            return Self::check(resp).await;
        }

        debug!(target: "mealtrack::api", "401 from {}, refreshing token and retrying once", url.path());
        match self.session.refresh_for_retry(RETRY_MIN_VALIDITY_SECS).await {
            Ok(_) => {
                let retry = self.build(&method, &url, query, body.as_ref()).send().await?;
                Self::check(retry).await
            }
            Err(e) => {
                warn!(target: "mealtrack::api", "refresh before retry failed: {}", e);
                Err(ClientError::Auth { message: "Session expired, please log in again".into() })
            }
        }
    }

    /// Map non-success statuses to `ClientError`, decoding the backend's
    /// structured body when present.
    async fn check(resp: reqwest::Response) -> ClientResult<reqwest::Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.json::<ApiErrorBody>().await.ok();
        Err(ClientError::from_response(status.as_u16(), body))
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> ClientResult<T> {
        let resp = self.send::<()>(Method::GET, path, query, None).await?;
        Ok(resp.json().await?)
    }

    pub async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> ClientResult<T> {
        let resp = self.send(Method::POST, path, &[], Some(body)).await?;
        Ok(resp.json().await?)
    }

    pub async fn put_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> ClientResult<T> {
        let resp = self.send(Method::PUT, path, &[], Some(body)).await?;
        Ok(resp.json().await?)
    }

    pub async fn delete(&self, path: &str) -> ClientResult<()> {
        self.send::<()>(Method::DELETE, path, &[], None).await?;
        Ok(())
    }
}
