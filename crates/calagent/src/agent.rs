//! The orchestration loop and its per-request state.

pub mod cache;
pub mod context;
pub mod events;
pub mod processor;
pub mod prompt;

pub use cache::RequestCache;
pub use context::TurnContext;
pub use events::{DoneMetadata, StreamEvent};
pub use processor::{ChatTurn, Processor, ProcessorConfig, TurnEnd, TurnSummary};
pub use prompt::system_prompt;
