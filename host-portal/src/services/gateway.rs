//! Authenticated request gateway.
//!
//! Every call to the backend goes through [`ApiGateway::send`]. It attaches the
//! bearer token, and on a 401 renews the token once through `/api/refresh` and
//! replays the original request once. Refreshes are serialised: callers that
//! hit 401 while a refresh is running wait for it and reuse its token.

use bytes::Bytes;
use portal_core::observability::TracedClientExt;
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::config::BackendSettings;
use crate::error::ClientError;
use crate::models::session::TokenGrant;
use crate::services::metrics::{record_refresh, RefreshOutcome};
use crate::services::session_store::SessionStore;
use crate::utils::jwt::resolve_role;

pub const REFRESH_PATH: &str = "/api/refresh";

/// How a request uses the session's credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    /// Needs a token; fails locally without one and refreshes on 401.
    Required,
    /// Sends the token if there is one, never refreshes.
    BestEffort,
    /// Never sends the token (login, refresh).
    Anonymous,
}

#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    body: Option<serde_json::Value>,
    auth: AuthMode,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            auth: AuthMode::Required,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn json(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn auth(mut self, auth: AuthMode) -> Self {
        self.auth = auth;
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

/// A fully buffered backend response.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    status: StatusCode,
    body: Bytes,
}

impl ApiResponse {
    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn is_no_content(&self) -> bool {
        self.status == StatusCode::NO_CONTENT
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ClientError> {
        serde_json::from_slice(&self.body).map_err(|e| {
            tracing::error!(status = %self.status, error = %e, "Failed to decode backend response");
            ClientError::Decode(e.to_string())
        })
    }

    /// Decode the body if it holds a `T`. Empty or unrelated bodies give `None`.
    pub fn try_json<T: DeserializeOwned>(&self) -> Option<T> {
        serde_json::from_slice(&self.body).ok()
    }

    /// The backend's error text: `message`, then `error`, then a plain-text body.
    pub fn error_message(&self) -> Option<String> {
        if let Ok(value) = serde_json::from_slice::<serde_json::Value>(&self.body) {
            return ["message", "error"]
                .iter()
                .find_map(|key| value.get(*key).and_then(|v| v.as_str()))
                .filter(|text| !text.trim().is_empty())
                .map(str::to_string);
        }
        let text = String::from_utf8_lossy(&self.body).trim().to_string();
        (!text.is_empty() && text.len() <= 300).then_some(text)
    }

    /// Map non-success statuses onto the error taxonomy.
    pub fn into_result(self) -> Result<ApiResponse, ClientError> {
        let status = self.status;
        if status.is_success() {
            return Ok(self);
        }

        let message = self.error_message();
        Err(match status {
            StatusCode::UNAUTHORIZED => ClientError::NotAuthenticated,
            StatusCode::FORBIDDEN => ClientError::Forbidden(message.unwrap_or_else(|| {
                "You do not have permission to perform this action.".to_string()
            })),
            StatusCode::NOT_FOUND => ClientError::NotFound(
                message.unwrap_or_else(|| "The requested item was not found.".to_string()),
            ),
            StatusCode::CONFLICT => ClientError::Conflict(message.unwrap_or_else(|| {
                "The request conflicts with the current state.".to_string()
            })),
            _ => ClientError::Rejected {
                status,
                message: message.unwrap_or_else(|| {
                    format!("The server rejected the request ({}).", status)
                }),
            },
        })
    }
}

pub struct ApiGateway {
    client: Client,
    base_url: String,
    session: Arc<SessionStore>,
    refresh_guard: Mutex<()>,
}

impl ApiGateway {
    pub fn new(settings: &BackendSettings, session: Arc<SessionStore>) -> Result<Self, ClientError> {
        let client = Client::builder()
            .cookie_store(true)
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            session,
            refresh_guard: Mutex::new(()),
        })
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    pub async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, ClientError> {
        let token = match request.auth {
            AuthMode::Anonymous => None,
            AuthMode::BestEffort => self.session.access_token(),
            AuthMode::Required => Some(
                self.session
                    .access_token()
                    .ok_or(ClientError::NotAuthenticated)?,
            ),
        };

        let response = self.dispatch(request, token.as_deref()).await?;
        if response.status() != StatusCode::UNAUTHORIZED || request.auth != AuthMode::Required {
            return Ok(response);
        }
        let Some(stale) = token else {
            return Ok(response);
        };

        tracing::info!(
            method = %request.method,
            path = %request.path,
            "Access token rejected, refreshing"
        );
        let fresh = self.renew_access_token(&stale).await?;

        let retried = self.dispatch(request, Some(&fresh)).await?;
        if retried.status() == StatusCode::UNAUTHORIZED {
            tracing::warn!(
                method = %request.method,
                path = %request.path,
                "Refreshed token rejected, ending session"
            );
            self.end_session();
            return Err(ClientError::SessionExpired);
        }

        Ok(retried)
    }

    async fn dispatch(
        &self,
        request: &ApiRequest,
        token: Option<&str>,
    ) -> Result<ApiResponse, ClientError> {
        let url = format!("{}{}", self.base_url, request.path);

        let mut builder = self.client.traced(request.method.clone(), &url);
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            tracing::error!("Failed to send {} request to {}: {}", request.method, url, e);
            ClientError::Transport(e)
        })?;

        let status = response.status();
        let body = response.bytes().await?;
        tracing::debug!(method = %request.method, path = %request.path, %status, "Backend responded");

        Ok(ApiResponse { status, body })
    }

    /// Return a token newer than `stale`, calling the refresh endpoint only if
    /// no other caller has done so in the meantime.
    async fn renew_access_token(&self, stale: &str) -> Result<String, ClientError> {
        let _guard = self.refresh_guard.lock().await;

        let snapshot = self.session.snapshot();
        match snapshot.access_token.as_deref() {
            Some(current) if current != stale => {
                record_refresh(RefreshOutcome::Coalesced);
                return Ok(current.to_string());
            }
            Some(_) => {}
            None => {
                // cleared by a failed refresh or a logout while we waited
                return Err(ClientError::SessionExpired);
            }
        }

        let request = ApiRequest::post(REFRESH_PATH)
            .json(serde_json::json!({ "refreshToken": snapshot.refresh_token }))
            .auth(AuthMode::Anonymous);

        let grant = match self.dispatch(&request, None).await {
            Ok(response) if response.status().is_success() => response.json::<TokenGrant>(),
            Ok(response) => Err(ClientError::Rejected {
                status: response.status(),
                message: response
                    .error_message()
                    .unwrap_or_else(|| "refresh rejected".to_string()),
            }),
            Err(e) => Err(e),
        };

        let grant = match grant {
            Ok(grant) => grant,
            Err(e) => {
                tracing::warn!(error = %e, "Token refresh failed, ending session");
                record_refresh(RefreshOutcome::Failed);
                self.end_session();
                return Err(ClientError::SessionExpired);
            }
        };

        let role = resolve_role(grant.role.as_deref(), &grant.access_token).or(snapshot.role);
        self.session.set_session(
            grant.access_token.clone(),
            grant.refresh_token.or(snapshot.refresh_token),
            role,
            snapshot.identity,
        )?;
        record_refresh(RefreshOutcome::Refreshed);
        tracing::info!("Access token refreshed");

        Ok(grant.access_token)
    }

    fn end_session(&self) {
        if let Err(e) = self.session.clear_session() {
            tracing::error!(error = %e, "Failed to erase persisted session");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: StatusCode, body: &str) -> ApiResponse {
        ApiResponse {
            status,
            body: Bytes::from(body.to_string()),
        }
    }

    #[test]
    fn reads_message_then_error_fields() {
        assert_eq!(
            response(StatusCode::CONFLICT, r#"{"message":"already pending"}"#).error_message(),
            Some("already pending".to_string())
        );
        assert_eq!(
            response(StatusCode::BAD_REQUEST, r#"{"error":"bad input"}"#).error_message(),
            Some("bad input".to_string())
        );
        assert_eq!(response(StatusCode::BAD_GATEWAY, "").error_message(), None);
        assert_eq!(
            response(StatusCode::BAD_GATEWAY, "upstream down").error_message(),
            Some("upstream down".to_string())
        );
    }

    #[test]
    fn classifies_statuses() {
        assert!(matches!(
            response(StatusCode::FORBIDDEN, "").into_result(),
            Err(ClientError::Forbidden(_))
        ));
        assert!(matches!(
            response(StatusCode::CONFLICT, r#"{"message":"dup"}"#).into_result(),
            Err(ClientError::Conflict(m)) if m == "dup"
        ));
        assert!(matches!(
            response(StatusCode::BAD_REQUEST, "").into_result(),
            Err(ClientError::Rejected { status, .. }) if status == StatusCode::BAD_REQUEST
        ));
        assert!(response(StatusCode::NO_CONTENT, "").into_result().unwrap().is_no_content());
    }

    #[tokio::test]
    async fn required_auth_without_token_never_dispatches() {
        let session = Arc::new(SessionStore::in_memory());
        // nothing listens on this port; a dispatch would be a transport error
        let gateway =
            ApiGateway::new(&BackendSettings::new("http://127.0.0.1:9"), session).unwrap();

        let result = gateway.send(&ApiRequest::get("/api/host-requests/status")).await;
        assert!(matches!(result, Err(ClientError::NotAuthenticated)));
    }
}
