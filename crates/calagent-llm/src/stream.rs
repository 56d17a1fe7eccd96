use std::pin::Pin;

use futures_util::Stream;

use crate::error::LlmError;
use crate::tool::ToolCall;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    ToolCalls,
    Length,
    Other(String),
}

impl FinishReason {
    pub fn from_wire(reason: &str) -> Self {
        match reason {
            "stop" => FinishReason::Stop,
            "tool_calls" | "function_call" => FinishReason::ToolCalls,
            "length" => FinishReason::Length,
            other => FinishReason::Other(other.to_string()),
        }
    }
}

/// Provider-agnostic stream event enum.
///
/// Text arrives incrementally. Tool calls are only emitted once their
/// arguments are complete, and always before `Finish`.
#[derive(Debug, Clone, PartialEq)]
pub enum LlmStreamEvent {
    TextDelta { text: String },
    ToolCall(ToolCall),
    Finish { reason: FinishReason },
}

pub type LlmStream = Pin<Box<dyn Stream<Item = Result<LlmStreamEvent, LlmError>> + Send>>;
