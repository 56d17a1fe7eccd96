use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::tool::{ToolCall, ToolResult};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    Tool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TextPart {
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessagePart {
    Text(TextPart),
    ToolCall(ToolCall),
    ToolResult(ToolResult),
}

/// One entry of a conversation. The system prompt is not a message; it
/// travels on the completion request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub parts: Vec<MessagePart>,
}

impl Message {
    pub fn from_parts(role: Role, parts: Vec<MessagePart>) -> Message {
        Message {
            id: Uuid::now_v7().to_string(),
            role,
            parts,
        }
    }

    pub fn from_text(role: Role, text: &str) -> Message {
        Self::from_parts(
            role,
            vec![MessagePart::Text(TextPart {
                text: text.to_string(),
            })],
        )
    }

    pub fn user(text: &str) -> Message {
        Self::from_text(Role::User, text)
    }

    /// Assistant turn carrying the streamed text and any tool calls it made.
    pub fn assistant(text: &str, tool_calls: Vec<ToolCall>) -> Message {
        let mut parts = Vec::with_capacity(tool_calls.len() + 1);
        if !text.is_empty() {
            parts.push(MessagePart::Text(TextPart {
                text: text.to_string(),
            }));
        }
        parts.extend(tool_calls.into_iter().map(MessagePart::ToolCall));
        Self::from_parts(Role::Assistant, parts)
    }

    pub fn tool_results(results: Vec<ToolResult>) -> Message {
        Self::from_parts(
            Role::Tool,
            results.into_iter().map(MessagePart::ToolResult).collect(),
        )
    }

    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|part| match part {
                MessagePart::Text(part) => Some(part.text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("")
    }

    pub fn tool_calls(&self) -> impl Iterator<Item = &ToolCall> {
        self.parts.iter().filter_map(|part| match part {
            MessagePart::ToolCall(call) => Some(call),
            _ => None,
        })
    }

    pub fn results(&self) -> impl Iterator<Item = &ToolResult> {
        self.parts.iter().filter_map(|part| match part {
            MessagePart::ToolResult(result) => Some(result),
            _ => None,
        })
    }
}
