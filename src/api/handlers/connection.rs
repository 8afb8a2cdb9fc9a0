use axum::{extract::State, Json};

use crate::agents::CommandRouter;
use crate::domain::events::ConnectionStatus;

/// GET /api/connection
pub async fn connection_status(State(router): State<CommandRouter>) -> Json<ConnectionStatus> {
    Json(router.connection_status())
}

/// Retry the session backend, then report the resulting status
///
/// POST /api/connection/reconnect
pub async fn reconnect(State(router): State<CommandRouter>) -> Json<ConnectionStatus> {
    router.reconnect().await;
    Json(router.connection_status())
}
