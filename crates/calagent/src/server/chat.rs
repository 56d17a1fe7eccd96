use std::convert::Infallible;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderMap};
use axum::response::{IntoResponse, Response};
use axum::Json;
use calagent_llm::{Message, Role};
use chrono::Utc;
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use utoipa::ToSchema;

use crate::agent::{ChatTurn, StreamEvent};
use crate::server::error::{ApiError, ApiErrorResponse};
use crate::server::ServerState;

pub const NDJSON_CONTENT_TYPE: &str = "application/x-ndjson";

#[derive(Debug, Deserialize, ToSchema)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct HistoryEntry {
    pub role: HistoryRole,
    pub content: String,
}

#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum HistoryRole {
    User,
    Assistant,
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then(|| token.to_string())
}

fn to_messages(history: Vec<HistoryEntry>) -> Vec<Message> {
    history
        .into_iter()
        .filter(|entry| !entry.content.trim().is_empty())
        .map(|entry| {
            let role = match entry.role {
                HistoryRole::User => Role::User,
                HistoryRole::Assistant => Role::Assistant,
            };
            Message::from_text(role, &entry.content)
        })
        .collect()
}

#[utoipa::path(
    post,
    path = "/api/chat",
    tag = "chat",
    request_body = ChatRequest,
    params(
        ("Authorization" = String, Header, description = "Bearer calendar access token"),
    ),
    responses(
        (status = 200, description = "One StreamEvent JSON object per line, ending with `done`", body = StreamEvent, content_type = "application/x-ndjson"),
        (status = 400, body = ApiErrorResponse),
        (status = 401, body = ApiErrorResponse),
    ),
    description = "Run one chat turn and stream the assistant's progress as NDJSON."
)]
#[tracing::instrument(skip_all)]
pub(crate) async fn chat(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    Json(payload): Json<ChatRequest>,
) -> Result<Response, ApiError> {
    let access_token = bearer_token(&headers)
        .ok_or_else(|| ApiError::unauthorized("missing bearer access token"))?;
    let message = payload.message.trim().to_string();
    if message.is_empty() {
        return Err(ApiError::bad_request("message must not be empty"));
    }

    let turn = ChatTurn {
        access_token,
        message,
        history: to_messages(payload.history),
        now: Utc::now().with_timezone(&state.timezone),
    };
    let (tx, rx) = mpsc::channel(state.event_channel_capacity);
    let task_state = state.clone();
    tokio::spawn(async move {
        let summary = task_state.processor.run(turn, tx).await;
        tracing::info!(
            action = %summary.action,
            end = ?summary.end,
            tools = summary.tools_called.len(),
            modified = summary.modified_events,
            "chat turn finished"
        );
    });

    let body = ReceiverStream::new(rx).map(|event| Ok::<_, Infallible>(event.to_ndjson_line()));
    Ok((
        [(header::CONTENT_TYPE, NDJSON_CONTENT_TYPE)],
        Body::from_stream(body),
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(value).expect("header"),
        );
        headers
    }

    #[test]
    fn bearer_token_is_required_and_trimmed() {
        assert_eq!(bearer_token(&headers("Bearer abc")), Some("abc".to_string()));
        assert_eq!(bearer_token(&headers("bearer  abc ")), Some("abc".to_string()));
        assert_eq!(bearer_token(&headers("Basic abc")), None);
        assert_eq!(bearer_token(&headers("Bearer ")), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }

    #[test]
    fn history_keeps_order_and_drops_blank_entries() {
        let messages = to_messages(vec![
            HistoryEntry {
                role: HistoryRole::User,
                content: "What's on Monday?".to_string(),
            },
            HistoryEntry {
                role: HistoryRole::Assistant,
                content: "  ".to_string(),
            },
            HistoryEntry {
                role: HistoryRole::Assistant,
                content: "Just standup.".to_string(),
            },
        ]);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[1].role, Role::Assistant);
        assert_eq!(messages[1].text(), "Just standup.");
    }
}
