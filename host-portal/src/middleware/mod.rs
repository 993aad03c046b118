pub mod metrics;
pub mod role_gate;
