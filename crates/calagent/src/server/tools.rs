use axum::Json;
use serde::Serialize;
use serde_json::Value;
use utoipa::ToSchema;

use crate::tools::{status_message, tool_definitions};

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
    /// Progress line streamed while the tool runs.
    pub status: String,
    #[schema(value_type = Object)]
    pub input_schema: Value,
}

#[utoipa::path(
    get,
    path = "/api/tools",
    tag = "tools",
    responses(
        (status = 200, description = "Tools the assistant can call", body = [ToolInfo]),
    )
)]
pub(crate) async fn list_tools() -> Json<Vec<ToolInfo>> {
    let tools = tool_definitions()
        .into_iter()
        .map(|tool| ToolInfo {
            status: status_message(&tool.name),
            name: tool.name,
            description: tool.description,
            input_schema: tool.input_schema,
        })
        .collect();
    Json(tools)
}
