#![allow(dead_code)]

use host_portal::config::BackendSettings;
use host_portal::models::session::{Role, Session};
use host_portal::services::gateway::ApiGateway;
use host_portal::services::session_store::{MemoryBackend, SessionStore};
use host_portal::AppState;
use std::sync::Arc;

/// An address nothing listens on, for tests that must not reach a backend.
pub const UNREACHABLE: &str = "http://127.0.0.1:9";

pub fn signed_in(access_token: &str, role: Option<Role>) -> Session {
    Session {
        access_token: Some(access_token.to_string()),
        refresh_token: Some("refresh-1".to_string()),
        role,
        identity: Some("someone@example.com".to_string()),
    }
}

pub fn store(session: Session) -> Arc<SessionStore> {
    Arc::new(SessionStore::open(MemoryBackend::seeded(session)))
}

pub fn gateway(base_url: &str, session: Arc<SessionStore>) -> Arc<ApiGateway> {
    Arc::new(ApiGateway::new(&BackendSettings::new(base_url), session).unwrap())
}

pub fn app_state(base_url: &str, session: Session) -> AppState {
    AppState::new(&BackendSettings::new(base_url), store(session)).unwrap()
}
