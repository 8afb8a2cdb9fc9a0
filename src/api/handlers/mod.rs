pub mod agents;
pub mod commands;
pub mod connection;
pub mod events;

/// Health check endpoint
///
/// GET /health
pub async fn health_check() -> &'static str {
    "OK"
}
