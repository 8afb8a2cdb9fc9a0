// API layer module (adapters for controllers)
// Follows Hexagonal Architecture - API is an adapter

pub mod errors;
pub mod handlers;

use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::agents::CommandRouter;
use handlers::{agents, commands, connection, events};

/// All routes, with the command router as shared state
pub fn router(state: CommandRouter) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Roster
        .route("/api/agents", get(agents::list_agents).post(agents::add_agent))
        .route("/api/agents/:id", delete(agents::remove_agent))
        // Commands and queue
        .route("/api/commands", post(commands::submit_command))
        .route("/api/queue", get(commands::list_queue))
        .route("/api/queue/:id/reorder", post(commands::reorder_item))
        .route("/api/queue/:id/cancel", post(commands::cancel_item))
        // Backend connection
        .route("/api/connection", get(connection::connection_status))
        .route("/api/connection/reconnect", post(connection::reconnect))
        // Observation
        .route("/api/state", get(events::state))
        .route("/api/events", get(events::poll_events))
        .route("/ws", get(events::ws_handler))
        .with_state(state)
}
