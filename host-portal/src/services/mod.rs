pub mod auth_client;
pub mod gateway;
pub mod metrics;
pub mod session_store;
