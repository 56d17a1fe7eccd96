pub mod agent;
pub mod calendar;
pub mod config;
pub mod error;
pub mod intent;
pub mod server;
pub mod temporal;
pub mod tools;
pub mod validation;

pub use crate::agent::{ChatTurn, Processor, ProcessorConfig, StreamEvent, TurnContext};
pub use crate::config::Settings;
pub use crate::error::{CoreError, CoreResult};
pub use crate::server::{router, Server, ServerState};
