//! Accumulation of chat-completions chunk deltas into stream events.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::LlmError;
use crate::stream::{FinishReason, LlmStreamEvent};
use crate::tool::ToolCall;

pub(crate) const DONE_SENTINEL: &str = "[DONE]";

#[derive(Debug, Default)]
struct PartialToolCall {
    id: String,
    name: String,
    arguments: String,
}

/// Accumulates chunk deltas for one completion. Text is released as it
/// arrives; tool calls are assembled by index and released by `finish`.
#[derive(Debug, Default)]
pub(crate) struct StreamState {
    tool_calls: BTreeMap<u64, PartialToolCall>,
    finish_reason: Option<String>,
}

impl StreamState {
    pub(crate) fn apply(&mut self, payload: &str) -> Result<Vec<LlmStreamEvent>, LlmError> {
        let chunk: Value =
            serde_json::from_str(payload).map_err(|error| LlmError::Decode(error.to_string()))?;
        if let Some(error) = chunk.get("error") {
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| error.to_string());
            return Err(LlmError::Internal(message));
        }

        let mut events = Vec::new();
        let Some(choice) = chunk
            .get("choices")
            .and_then(Value::as_array)
            .and_then(|choices| choices.first())
        else {
            return Ok(events);
        };

        if let Some(delta) = choice.get("delta") {
            if let Some(text) = delta.get("content").and_then(Value::as_str) {
                if !text.is_empty() {
                    events.push(LlmStreamEvent::TextDelta {
                        text: text.to_string(),
                    });
                }
            }
            if let Some(calls) = delta.get("tool_calls").and_then(Value::as_array) {
                for call in calls {
                    self.apply_tool_delta(call);
                }
            }
        }

        if let Some(reason) = choice.get("finish_reason").and_then(Value::as_str) {
            self.finish_reason = Some(reason.to_string());
        }
        Ok(events)
    }

    fn apply_tool_delta(&mut self, call: &Value) {
        let index = call.get("index").and_then(Value::as_u64).unwrap_or(0);
        let entry = self.tool_calls.entry(index).or_default();
        if let Some(id) = call.get("id").and_then(Value::as_str) {
            if !id.is_empty() {
                entry.id = id.to_string();
            }
        }
        if let Some(function) = call.get("function") {
            if let Some(name) = function.get("name").and_then(Value::as_str) {
                entry.name.push_str(name);
            }
            if let Some(arguments) = function.get("arguments").and_then(Value::as_str) {
                entry.arguments.push_str(arguments);
            }
        }
    }

    pub(crate) fn finish(self) -> Vec<LlmStreamEvent> {
        let has_calls = !self.tool_calls.is_empty();
        let mut events: Vec<LlmStreamEvent> = self
            .tool_calls
            .into_values()
            .filter(|call| !call.name.is_empty())
            .map(|call| {
                let id = if call.id.is_empty() {
                    format!("call_{}", Uuid::new_v4().simple())
                } else {
                    call.id
                };
                let arguments = parse_arguments(&call.name, &call.arguments);
                LlmStreamEvent::ToolCall(ToolCall::new(id, call.name, Value::Object(arguments)))
            })
            .collect();

        let reason = match self.finish_reason {
            Some(reason) => FinishReason::from_wire(&reason),
            None if has_calls => FinishReason::ToolCalls,
            None => FinishReason::Stop,
        };
        events.push(LlmStreamEvent::Finish { reason });
        events
    }
}

fn parse_arguments(tool_name: &str, raw: &str) -> Map<String, Value> {
    if raw.trim().is_empty() {
        return Map::new();
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => map,
        Ok(_) | Err(_) => {
            tracing::warn!(tool = tool_name, "discarding unparsable tool arguments");
            Map::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn text_deltas_are_released_immediately() {
        let mut state = StreamState::default();
        let events = state
            .apply(r#"{"choices":[{"delta":{"content":"Hel"}}]}"#)
            .expect("apply");
        assert_eq!(
            events,
            vec![LlmStreamEvent::TextDelta {
                text: "Hel".to_string()
            }]
        );
    }

    #[test]
    fn tool_call_fragments_are_assembled_by_index() {
        let mut state = StreamState::default();
        let chunks = [
            json!({"choices":[{"delta":{"tool_calls":[{"index":0,"id":"call_a","function":{"name":"resolve_date","arguments":"{\"que"}}]}}]}),
            json!({"choices":[{"delta":{"tool_calls":[{"index":1,"id":"call_b","function":{"name":"get_stats","arguments":""}}]}}]}),
            json!({"choices":[{"delta":{"tool_calls":[{"index":0,"function":{"arguments":"ry\":\"next Monday\"}"}}]}}]}),
            json!({"choices":[{"delta":{},"finish_reason":"tool_calls"}]}),
        ];
        for chunk in chunks {
            assert!(state.apply(&chunk.to_string()).expect("apply").is_empty());
        }

        let events = state.finish();
        assert_eq!(events.len(), 3);
        match &events[0] {
            LlmStreamEvent::ToolCall(call) => {
                assert_eq!(call.id, "call_a");
                assert_eq!(call.name, "resolve_date");
                assert_eq!(call.str_arg("query"), Some("next Monday"));
            }
            other => panic!("unexpected event {other:?}"),
        }
        match &events[1] {
            LlmStreamEvent::ToolCall(call) => {
                assert_eq!(call.name, "get_stats");
                assert!(call.arguments.is_empty());
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(
            events[2],
            LlmStreamEvent::Finish {
                reason: FinishReason::ToolCalls
            }
        );
    }

    #[test]
    fn malformed_arguments_become_empty_object() {
        let mut state = StreamState::default();
        state
            .apply(&json!({"choices":[{"delta":{"tool_calls":[{"index":0,"id":"c","function":{"name":"list_events","arguments":"{not json"}}]}}]}).to_string())
            .expect("apply");
        let events = state.finish();
        match &events[0] {
            LlmStreamEvent::ToolCall(call) => assert!(call.arguments.is_empty()),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn error_payload_is_surfaced() {
        let mut state = StreamState::default();
        let error = state
            .apply(r#"{"error":{"message":"rate limited"}}"#)
            .expect_err("error payload");
        assert!(error.to_string().contains("rate limited"));
    }

    #[test]
    fn finish_without_reason_defaults_to_stop() {
        let state = StreamState::default();
        assert_eq!(
            state.finish(),
            vec![LlmStreamEvent::Finish {
                reason: FinishReason::Stop
            }]
        );
    }
}
