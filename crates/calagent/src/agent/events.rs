use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One line of the NDJSON chat response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    TextDelta {
        content: String,
    },
    /// Human-readable progress, emitted before each tool runs.
    Status {
        message: String,
    },
    Error {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        code: Option<String>,
    },
    Done {
        metadata: DoneMetadata,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DoneMetadata {
    pub modified_events: bool,
}

impl StreamEvent {
    pub fn text(content: impl Into<String>) -> Self {
        StreamEvent::TextDelta {
            content: content.into(),
        }
    }

    pub fn status(message: impl Into<String>) -> Self {
        StreamEvent::Status {
            message: message.into(),
        }
    }

    pub fn error(code: &str, message: impl Into<String>) -> Self {
        StreamEvent::Error {
            message: message.into(),
            code: Some(code.to_string()),
        }
    }

    pub fn done(modified_events: bool) -> Self {
        StreamEvent::Done {
            metadata: DoneMetadata { modified_events },
        }
    }

    /// Serialised form plus the trailing newline.
    pub fn to_ndjson_line(&self) -> String {
        let mut line = serde_json::to_string(self).unwrap_or_else(|error| {
            format!(
                r#"{{"type":"error","message":"failed to encode event: {}"}}"#,
                error.to_string().replace('"', "'")
            )
        });
        line.push('\n');
        line
    }
}
