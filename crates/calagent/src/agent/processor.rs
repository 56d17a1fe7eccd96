use std::sync::Arc;

use calagent_llm::{
    CompletionRequest, LlmError, LlmProvider, LlmStreamEvent, Message, ToolCall, ToolChoice,
    ToolDefinition, ToolResult,
};
use chrono::DateTime;
use chrono_tz::Tz;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;

use super::context::TurnContext;
use super::events::StreamEvent;
use super::prompt::system_prompt;
use crate::error::CoreError;
use crate::intent::{
    detect_action, requires_tool_call, validate_action_completed, ActionKind, Completion,
};
use crate::tools::{status_message, tool_definitions, ToolExecutor, ToolOutcome};
use crate::validation::validate_invocation;

/// Bounds for one chat turn.
#[derive(Debug, Clone, Copy)]
pub struct ProcessorConfig {
    /// Model completions allowed when the verifier finds an unfulfilled action,
    /// counting the first one.
    pub max_completion_attempts: u32,
    /// Tool-execution rounds before the turn is cut off.
    pub max_steps: usize,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            max_completion_attempts: 2,
            max_steps: 10,
        }
    }
}

/// One user message plus the prior conversation.
#[derive(Debug, Clone)]
pub struct ChatTurn {
    pub access_token: String,
    pub message: String,
    pub history: Vec<Message>,
    pub now: DateTime<Tz>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnEnd {
    Completed,
    StepLimit,
    Failed,
    /// The receiver went away; no further events were sent.
    Disconnected,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnSummary {
    pub action: ActionKind,
    pub tools_called: Vec<String>,
    pub completion_attempts: u32,
    pub modified_events: bool,
    pub end: TurnEnd,
}

#[derive(Debug)]
enum LoopState {
    AwaitingModel,
    ExecutingTools(Vec<ToolCall>),
    VerifyingCompletion,
    RetryingCompletion { attempt: u32, instruction: String },
    Done,
}

impl LoopState {
    fn name(&self) -> &'static str {
        match self {
            LoopState::AwaitingModel => "awaiting_model",
            LoopState::ExecutingTools(_) => "executing_tools",
            LoopState::VerifyingCompletion => "verifying_completion",
            LoopState::RetryingCompletion { .. } => "retrying_completion",
            LoopState::Done => "done",
        }
    }
}

struct Disconnected;

enum Interrupt {
    Disconnected,
    Fatal(CoreError),
}

impl From<Disconnected> for Interrupt {
    fn from(_: Disconnected) -> Self {
        Interrupt::Disconnected
    }
}

impl From<CoreError> for Interrupt {
    fn from(error: CoreError) -> Self {
        Interrupt::Fatal(error)
    }
}

impl From<LlmError> for Interrupt {
    fn from(error: LlmError) -> Self {
        Interrupt::Fatal(error.into())
    }
}

struct EventSink {
    tx: mpsc::Sender<StreamEvent>,
}

impl EventSink {
    async fn send(&self, event: StreamEvent) -> Result<(), Disconnected> {
        self.tx.send(event).await.map_err(|_| Disconnected)
    }
}

/// Assistant output of one model completion.
struct ModelTurn {
    text: String,
    tool_calls: Vec<ToolCall>,
}

/// Mutable state of one run of the loop.
struct Run {
    ctx: TurnContext,
    messages: Vec<Message>,
    tools_called: Vec<String>,
    last_tool_result: Option<String>,
    modified_events: bool,
    steps: usize,
    attempt: u32,
    tool_choice: ToolChoice,
}

/// Drives model completions and tool executions for one chat turn,
/// streaming progress to the caller.
pub struct Processor {
    llm: Arc<dyn LlmProvider>,
    executor: Arc<ToolExecutor>,
    tools: Vec<ToolDefinition>,
    config: ProcessorConfig,
}

impl Processor {
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        executor: Arc<ToolExecutor>,
        config: ProcessorConfig,
    ) -> Self {
        Self {
            llm,
            executor,
            tools: tool_definitions(),
            config: ProcessorConfig {
                max_completion_attempts: config.max_completion_attempts.max(1),
                max_steps: config.max_steps.max(1),
            },
        }
    }

    /// Runs the turn to completion. Unless the receiver is dropped, the last
    /// event sent is always `done`.
    #[tracing::instrument(skip_all)]
    pub async fn run(&self, turn: ChatTurn, tx: mpsc::Sender<StreamEvent>) -> TurnSummary {
        let sink = EventSink { tx };
        let action = detect_action(&turn.message);
        let forced = requires_tool_call(&turn.message);
        tracing::debug!(action = %action, forced, "classified user message");

        let mut messages = turn.history;
        messages.push(Message::user(&turn.message));
        let mut run = Run {
            ctx: TurnContext::new(turn.access_token, turn.message, turn.now),
            messages,
            tools_called: Vec::new(),
            last_tool_result: None,
            modified_events: false,
            steps: 0,
            attempt: 1,
            tool_choice: if forced {
                ToolChoice::Required
            } else {
                ToolChoice::Auto
            },
        };

        let end = match self.drive(action, &mut run, &sink).await {
            Ok(end) => end,
            Err(Interrupt::Disconnected) => TurnEnd::Disconnected,
            Err(Interrupt::Fatal(error)) => {
                tracing::warn!(error = %error, "chat turn failed");
                match sink.send(fatal_event(&error)).await {
                    Ok(()) => TurnEnd::Failed,
                    Err(Disconnected) => TurnEnd::Disconnected,
                }
            }
        };

        let end = if end == TurnEnd::Disconnected {
            tracing::info!("client disconnected, turn aborted");
            end
        } else {
            match sink.send(StreamEvent::done(run.modified_events)).await {
                Ok(()) => end,
                Err(Disconnected) => TurnEnd::Disconnected,
            }
        };

        TurnSummary {
            action,
            tools_called: run.tools_called,
            completion_attempts: run.attempt,
            modified_events: run.modified_events,
            end,
        }
    }

    async fn drive(
        &self,
        action: ActionKind,
        run: &mut Run,
        sink: &EventSink,
    ) -> Result<TurnEnd, Interrupt> {
        let mut state = LoopState::AwaitingModel;
        loop {
            tracing::debug!(
                state = state.name(),
                step = run.steps,
                attempt = run.attempt,
                "agent loop transition"
            );
            state = match state {
                LoopState::AwaitingModel => {
                    let turn = self.complete(run, sink).await?;
                    run.tool_choice = ToolChoice::Auto;
                    run.messages
                        .push(Message::assistant(&turn.text, turn.tool_calls.clone()));
                    if turn.tool_calls.is_empty() {
                        LoopState::VerifyingCompletion
                    } else {
                        LoopState::ExecutingTools(turn.tool_calls)
                    }
                }
                LoopState::ExecutingTools(calls) => {
                    if run.steps >= self.config.max_steps {
                        tracing::warn!(max_steps = self.config.max_steps, "step limit reached");
                        sink.send(StreamEvent::error(
                            "step_limit",
                            format!(
                                "Stopped after {} rounds of tool calls without finishing. Please try a simpler request.",
                                self.config.max_steps
                            ),
                        ))
                        .await?;
                        return Ok(TurnEnd::StepLimit);
                    }
                    run.steps += 1;
                    self.execute_calls(calls, run, sink).await?;
                    LoopState::AwaitingModel
                }
                LoopState::VerifyingCompletion => match validate_action_completed(
                    action,
                    &run.tools_called,
                    &run.ctx.user_message,
                    run.last_tool_result.as_deref(),
                ) {
                    Completion::Satisfied => LoopState::Done,
                    Completion::Missing { instruction }
                        if run.attempt < self.config.max_completion_attempts =>
                    {
                        tracing::info!(action = %action, attempt = run.attempt, "action not completed, retrying");
                        LoopState::RetryingCompletion {
                            attempt: run.attempt + 1,
                            instruction,
                        }
                    }
                    Completion::Missing { .. } => {
                        tracing::warn!(action = %action, attempt = run.attempt, "action still not completed, giving up");
                        LoopState::Done
                    }
                },
                LoopState::RetryingCompletion {
                    attempt,
                    instruction,
                } => {
                    run.attempt = attempt;
                    run.messages
                        .push(Message::user(&format!("IMPORTANT: {instruction}")));
                    run.tool_choice = ToolChoice::Required;
                    LoopState::AwaitingModel
                }
                LoopState::Done => return Ok(TurnEnd::Completed),
            };
        }
    }

    /// Streams one completion, forwarding text as it arrives.
    async fn complete(&self, run: &Run, sink: &EventSink) -> Result<ModelTurn, Interrupt> {
        let request = CompletionRequest {
            system_prompt: system_prompt(run.ctx.now),
            messages: run.messages.clone(),
            tools: self.tools.clone(),
            tool_choice: run.tool_choice,
        };
        let mut stream = self.llm.stream(request).await?;
        let mut turn = ModelTurn {
            text: String::new(),
            tool_calls: Vec::new(),
        };
        while let Some(event) = stream.next().await {
            match event? {
                LlmStreamEvent::TextDelta { text } => {
                    if text.is_empty() {
                        continue;
                    }
                    turn.text.push_str(&text);
                    sink.send(StreamEvent::text(text)).await?;
                }
                LlmStreamEvent::ToolCall(call) => turn.tool_calls.push(call),
                LlmStreamEvent::Finish { reason } => {
                    tracing::debug!(?reason, "model turn finished");
                }
            }
        }
        Ok(turn)
    }

    /// Runs the calls sequentially in request order and appends their results
    /// as a single tool message.
    async fn execute_calls(
        &self,
        calls: Vec<ToolCall>,
        run: &mut Run,
        sink: &EventSink,
    ) -> Result<(), Interrupt> {
        let mut results = Vec::with_capacity(calls.len());
        for call in calls {
            sink.send(StreamEvent::status(status_message(&call.name)))
                .await?;
            run.tools_called.push(call.name.clone());
            let (outcome, label) = match validate_invocation(&call, &run.ctx) {
                Ok(request) => {
                    let outcome = self.executor.execute(request, &mut run.ctx).await?;
                    let label = if outcome.is_error { "error" } else { "ok" };
                    (outcome, label)
                }
                Err(rejection) => (ToolOutcome::error(rejection.0), "rejected"),
            };
            tracing::info!(
                tool = %call.name,
                outcome = label,
                modified = outcome.modified_events,
                "tool invocation"
            );
            run.modified_events |= outcome.modified_events;
            run.last_tool_result = Some(outcome.content.clone());
            results.push(ToolResult {
                invocation_id: call.id,
                content: outcome.content,
                is_error: outcome.is_error,
            });
        }
        run.messages.push(Message::tool_results(results));
        Ok(())
    }
}

fn fatal_event(error: &CoreError) -> StreamEvent {
    if error.is_auth() {
        StreamEvent::error(
            "unauthorized",
            "Your calendar or assistant credentials were rejected. Please sign in again.",
        )
    } else {
        StreamEvent::error("upstream", format!("Something went wrong: {error}"))
    }
}
