pub mod config;
pub mod controllers;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod startup;
pub mod utils;

use std::sync::Arc;

use config::BackendSettings;
use controllers::{
    accommodation::AccommodationController, admin_review::AdminReviewController,
    host_application::HostApplicationController,
};
use error::ClientError;
use handlers::NavBar;
use services::{auth_client::AuthClient, gateway::ApiGateway, session_store::SessionStore};

/// Shared application state: the session and everything that talks to the
/// backend on its behalf.
#[derive(Clone)]
pub struct AppState {
    pub session: Arc<SessionStore>,
    pub gateway: Arc<ApiGateway>,
    pub auth_client: Arc<AuthClient>,
    pub host_applications: Arc<HostApplicationController>,
    pub accommodations: Arc<AccommodationController>,
    pub admin_review: Arc<AdminReviewController>,
}

impl AppState {
    pub fn new(backend: &BackendSettings, session: Arc<SessionStore>) -> Result<Self, ClientError> {
        let gateway = Arc::new(ApiGateway::new(backend, Arc::clone(&session))?);

        Ok(Self {
            session,
            auth_client: Arc::new(AuthClient::new(Arc::clone(&gateway))),
            host_applications: Arc::new(HostApplicationController::new(Arc::clone(&gateway))),
            accommodations: Arc::new(AccommodationController::new(Arc::clone(&gateway))),
            admin_review: Arc::new(AdminReviewController::new(Arc::clone(&gateway))),
            gateway,
        })
    }

    pub fn nav(&self) -> NavBar {
        NavBar::from_session(&self.session.snapshot())
    }
}
