use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::agents::CommandRouter;
use crate::api::errors::ApiError;
use crate::domain::queue::QueueItem;

/// Request body for submitting a command
#[derive(Debug, Deserialize)]
pub struct SubmitCommandRequest {
    pub text: String,
    pub target_agent_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct QueueFilter {
    pub agent_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReorderRequest {
    pub position: usize,
}

/// Submit a command; it is queued, not executed, before this returns
///
/// POST /api/commands
pub async fn submit_command(
    State(router): State<CommandRouter>,
    Json(req): Json<SubmitCommandRequest>,
) -> Result<(StatusCode, Json<QueueItem>), ApiError> {
    let item = router
        .submit(&req.text, req.target_agent_id.as_deref())
        .await?;

    Ok((StatusCode::ACCEPTED, Json(item)))
}

/// GET /api/queue?agent_id=
pub async fn list_queue(
    State(router): State<CommandRouter>,
    Query(filter): Query<QueueFilter>,
) -> Json<Vec<QueueItem>> {
    Json(router.list_queue(filter.agent_id.as_deref()).await)
}

/// POST /api/queue/:id/reorder
pub async fn reorder_item(
    State(router): State<CommandRouter>,
    Path(id): Path<Uuid>,
    Json(req): Json<ReorderRequest>,
) -> Result<Json<Vec<QueueItem>>, ApiError> {
    Ok(Json(router.reorder(id, req.position).await?))
}

/// Cancel a pending item; other items come back unchanged
///
/// POST /api/queue/:id/cancel
pub async fn cancel_item(
    State(router): State<CommandRouter>,
    Path(id): Path<Uuid>,
) -> Result<Json<QueueItem>, ApiError> {
    Ok(Json(router.cancel(id).await?))
}
