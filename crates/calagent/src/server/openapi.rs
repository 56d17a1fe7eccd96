use utoipa::OpenApi;

use crate::agent::{DoneMetadata, StreamEvent};
use crate::server::chat::{ChatRequest, HistoryEntry, HistoryRole};
use crate::server::error::{ApiErrorBody, ApiErrorResponse};
use crate::server::tools::ToolInfo;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Calagent API",
        version = "0.1.0",
        description = "Natural-language calendar assistant"
    ),
    paths(
        crate::server::health,
        crate::server::chat::chat,
        crate::server::tools::list_tools,
    ),
    components(schemas(
        ApiErrorResponse,
        ApiErrorBody,
        ChatRequest,
        HistoryEntry,
        HistoryRole,
        StreamEvent,
        DoneMetadata,
        ToolInfo,
    )),
    tags(
        (name = "chat", description = "Streaming chat turns"),
        (name = "tools", description = "Tool catalog"),
        (name = "system", description = "Liveness"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_route() {
        let json = ApiDoc::openapi().to_pretty_json().expect("openapi json");
        assert!(json.contains("/api/chat"));
        assert!(json.contains("/api/tools"));
        assert!(json.contains("/health"));
        assert!(json.contains("StreamEvent"));
    }
}
