use serde_json::{json, Value};

use crate::message::{Message, Role};
use crate::provider::{CompletionRequest, ToolChoice};
use crate::settings::LlmSettings;
use crate::tool::ToolDefinition;

pub(crate) fn build_request_body(settings: &LlmSettings, request: &CompletionRequest) -> Value {
    let mut messages = vec![json!({
        "role": "system",
        "content": request.system_prompt,
    })];
    messages.extend(request.messages.iter().flat_map(message_to_wire));

    let mut body = json!({
        "model": settings.model,
        "messages": messages,
        "stream": true,
        "temperature": settings.temperature,
        "max_tokens": settings.max_output_tokens,
    });
    if !request.tools.is_empty() {
        body["tools"] = Value::Array(request.tools.iter().map(tool_to_wire).collect());
        body["tool_choice"] = json!(match request.tool_choice {
            ToolChoice::Auto => "auto",
            ToolChoice::Required => "required",
        });
    }
    body
}

fn tool_to_wire(tool: &ToolDefinition) -> Value {
    json!({
        "type": "function",
        "function": {
            "name": tool.name,
            "description": tool.description,
            "parameters": tool.input_schema,
        }
    })
}

/// A tool message fans out into one wire message per result.
fn message_to_wire(message: &Message) -> Vec<Value> {
    match message.role {
        Role::User => vec![json!({ "role": "user", "content": message.text() })],
        Role::Assistant => {
            let text = message.text();
            let mut wire = json!({
                "role": "assistant",
                "content": if text.is_empty() { Value::Null } else { Value::String(text) },
            });
            let calls: Vec<Value> = message
                .tool_calls()
                .map(|call| {
                    json!({
                        "id": call.id,
                        "type": "function",
                        "function": {
                            "name": call.name,
                            "arguments": Value::Object(call.arguments.clone()).to_string(),
                        }
                    })
                })
                .collect();
            if !calls.is_empty() {
                wire["tool_calls"] = Value::Array(calls);
            }
            vec![wire]
        }
        Role::Tool => message
            .results()
            .map(|result| {
                let content = if result.is_error {
                    format!("ERROR: {}", result.content)
                } else {
                    result.content.clone()
                };
                json!({
                    "role": "tool",
                    "tool_call_id": result.invocation_id,
                    "content": content,
                })
            })
            .collect(),
    }
}
