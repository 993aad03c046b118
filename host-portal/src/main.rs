use dotenvy::dotenv;
use host_portal::config::get_configuration;
use host_portal::services::session_store::SessionStore;
use host_portal::startup::build_router;
use host_portal::AppState;
use portal_core::observability::init_tracing;
use std::sync::Arc;
use tracing::info;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let configuration = get_configuration().map_err(|e| {
        eprintln!("Failed to read configuration: {}", e);
        anyhow::anyhow!("Configuration error: {}", e)
    })?;

    init_tracing(
        "host-portal",
        &configuration.telemetry.log_level,
        configuration.telemetry.otlp_endpoint.as_deref(),
    );

    host_portal::services::metrics::init_metrics();

    let session = Arc::new(SessionStore::file(&configuration.session.path));
    info!(
        path = %configuration.session.path.display(),
        authenticated = session.is_authenticated(),
        "Session store ready"
    );

    let state = AppState::new(&configuration.backend, session).map_err(|e| {
        tracing::error!("Failed to build backend client: {}", e);
        anyhow::anyhow!("Backend client error: {}", e)
    })?;

    let app = build_router(state);

    let address = format!(
        "{}:{}",
        configuration.server.host, configuration.server.port
    );
    let listener = tokio::net::TcpListener::bind(&address).await.map_err(|e| {
        tracing::error!("Failed to bind TCP listener to {}: {}", address, e);
        anyhow::anyhow!("Failed to bind to address {}: {}", address, e)
    })?;

    info!(
        "Starting host-portal on {} (backend {})",
        address, configuration.backend.base_url
    );
    axum::serve(listener, app).await.map_err(|e| {
        tracing::error!("Server error: {}", e);
        anyhow::anyhow!("Server error: {}", e)
    })?;

    Ok(())
}
