pub mod error;
pub mod message;
pub mod openai;
pub mod provider;
pub mod settings;
pub mod stream;
pub mod tool;

pub use error::LlmError;
pub use message::{Message, MessagePart, Role, TextPart};
pub use openai::OpenAiCompatibleProvider;
pub use provider::{CompletionRequest, LlmProvider, ToolChoice};
pub use settings::LlmSettings;
pub use stream::{FinishReason, LlmStream, LlmStreamEvent};
pub use tool::{ToolCall, ToolDefinition, ToolResult};
