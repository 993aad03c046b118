use secrecy::ExposeSecret;
use std::sync::Arc;

use crate::error::ClientError;
use crate::models::session::{LoginForm, Role, TokenGrant};
use crate::services::gateway::{ApiGateway, ApiRequest, AuthMode};
use crate::utils::jwt::resolve_role;

pub struct AuthClient {
    gateway: Arc<ApiGateway>,
}

impl AuthClient {
    pub fn new(gateway: Arc<ApiGateway>) -> Self {
        Self { gateway }
    }

    /// Exchange credentials for a token pair and store the new session.
    pub async fn login(&self, form: LoginForm) -> Result<Role, ClientError> {
        let form = form.normalized();
        form.check()?;

        let request = ApiRequest::post("/api/login")
            .json(serde_json::json!({
                "email": form.email,
                "password": form.password.expose_secret(),
            }))
            .auth(AuthMode::Anonymous);

        let response = self.gateway.send(&request).await?;
        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            tracing::info!(email = %form.email, "Login rejected");
            return Err(ClientError::InvalidCredentials);
        }
        let grant: TokenGrant = response.into_result()?.json()?;

        let role = resolve_role(grant.role.as_deref(), &grant.access_token);
        self.gateway.session().set_session(
            grant.access_token,
            grant.refresh_token,
            role,
            Some(form.email.clone()),
        )?;

        let role = role.unwrap_or(Role::User);
        tracing::info!(email = %form.email, role = %role, "User logged in successfully");
        Ok(role)
    }

    /// Invalidate the server-side session, then clear the local one. The
    /// local clear happens whatever the backend answers.
    pub async fn logout(&self) -> Result<(), ClientError> {
        let session = self.gateway.session();
        let snapshot = session.snapshot();

        if snapshot.is_authenticated() {
            let request = ApiRequest::post("/api/logout")
                .json(serde_json::json!({ "refreshToken": snapshot.refresh_token }))
                .auth(AuthMode::BestEffort);

            match self.gateway.send(&request).await {
                Ok(response) if response.status().is_success() => {
                    tracing::info!("Server session invalidated");
                }
                Ok(response) => {
                    tracing::warn!(status = %response.status(), "Logout rejected by backend");
                }
                Err(e) => {
                    tracing::error!("Failed to invalidate server session during logout: {}", e);
                }
            }
        }

        session.clear_session()?;
        tracing::info!(email = ?snapshot.identity(), "User logged out");
        Ok(())
    }
}
