use async_trait::async_trait;

use crate::error::LlmError;
use crate::message::Message;
use crate::stream::LlmStream;
use crate::tool::ToolDefinition;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToolChoice {
    #[default]
    Auto,
    /// The model must call at least one tool on this turn.
    Required,
}

#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system_prompt: String,
    pub messages: Vec<Message>,
    pub tools: Vec<ToolDefinition>,
    pub tool_choice: ToolChoice,
}

#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn stream(&self, request: CompletionRequest) -> Result<LlmStream, LlmError>;
}
