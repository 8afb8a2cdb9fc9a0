use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::agents::CommandRouter;
use crate::api::errors::ApiError;
use crate::domain::agent::Agent;

/// Request body for adding an agent
#[derive(Debug, Deserialize)]
pub struct AddAgentRequest {
    pub name: String,
    pub role: String,
    pub emoji: Option<String>,
}

/// List the roster
///
/// GET /api/agents
pub async fn list_agents(State(router): State<CommandRouter>) -> Json<Vec<Agent>> {
    Json(router.list_agents().await)
}

/// Add an agent
///
/// POST /api/agents
pub async fn add_agent(
    State(router): State<CommandRouter>,
    Json(req): Json<AddAgentRequest>,
) -> Result<(StatusCode, Json<Agent>), ApiError> {
    let agent = router
        .add_agent(&req.name, &req.role, req.emoji.as_deref())
        .await?;

    Ok((StatusCode::CREATED, Json(agent)))
}

/// Remove an agent
///
/// DELETE /api/agents/:id
pub async fn remove_agent(
    State(router): State<CommandRouter>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    router.remove_agent(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
