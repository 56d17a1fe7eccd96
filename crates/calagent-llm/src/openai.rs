//! Streaming client for OpenAI-compatible chat-completions endpoints.

mod chunk;
mod convert;

use std::fmt::Display;
use std::pin::pin;
use std::time::Duration;

use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures_util::{Stream, StreamExt};
use reqwest::StatusCode;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::error::LlmError;
use crate::provider::{CompletionRequest, LlmProvider};
use crate::settings::LlmSettings;
use crate::stream::{LlmStream, LlmStreamEvent};

use chunk::{StreamState, DONE_SENTINEL};
use convert::build_request_body;

const EVENT_BUFFER: usize = 64;

pub struct OpenAiCompatibleProvider {
    client: reqwest::Client,
    settings: LlmSettings,
}

impl OpenAiCompatibleProvider {
    pub fn new(settings: LlmSettings) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()
            .map_err(|error| LlmError::Internal(error.to_string()))?;
        Ok(Self { client, settings })
    }

    pub fn settings(&self) -> &LlmSettings {
        &self.settings
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.settings.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl LlmProvider for OpenAiCompatibleProvider {
    async fn stream(&self, request: CompletionRequest) -> Result<LlmStream, LlmError> {
        let api_key = self
            .settings
            .api_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .ok_or(LlmError::MissingApiKey)?;
        let body = build_request_body(&self.settings, &request);
        tracing::debug!(
            model = %self.settings.model,
            messages = request.messages.len(),
            tools = request.tools.len(),
            tool_choice = ?request.tool_choice,
            "requesting completion"
        );

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|error| LlmError::Transport(error.to_string()))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(LlmError::Unauthorized);
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(LlmError::Http {
                status: status.as_u16(),
                message,
            });
        }

        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        tokio::spawn(pump_events(response.bytes_stream(), tx));
        Ok(Box::pin(ReceiverStream::new(rx)))
    }
}

/// Reads server-sent events from `body` until it ends or the receiver is
/// dropped.
async fn pump_events<S, B, E>(body: S, tx: mpsc::Sender<Result<LlmStreamEvent, LlmError>>)
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: Display,
{
    let mut messages = pin!(body.eventsource());
    let mut state = StreamState::default();

    while let Some(message) = messages.next().await {
        let message = match message {
            Ok(message) => message,
            Err(error) => {
                let _ = tx.send(Err(LlmError::Transport(error.to_string()))).await;
                return;
            }
        };
        if message.data.is_empty() {
            continue;
        }
        if message.data == DONE_SENTINEL {
            break;
        }
        match state.apply(&message.data) {
            Ok(events) => {
                for event in events {
                    if tx.send(Ok(event)).await.is_err() {
                        return;
                    }
                }
            }
            Err(error) => {
                let _ = tx.send(Err(error)).await;
                return;
            }
        }
    }

    for event in state.finish() {
        if tx.send(Ok(event)).await.is_err() {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ToolChoice;
    use crate::stream::FinishReason;

    async fn pumped(chunks: &[&'static [u8]]) -> Vec<Result<LlmStreamEvent, LlmError>> {
        let body = futures_util::stream::iter(
            chunks
                .iter()
                .copied()
                .map(Ok::<_, std::convert::Infallible>),
        );
        let (tx, mut rx) = mpsc::channel(EVENT_BUFFER);
        pump_events(body, tx).await;
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn missing_api_key_fails_before_any_request() {
        let provider = OpenAiCompatibleProvider::new(LlmSettings::default()).expect("provider");
        let request = CompletionRequest {
            system_prompt: String::new(),
            messages: Vec::new(),
            tools: Vec::new(),
            tool_choice: ToolChoice::Auto,
        };
        let error = match provider.stream(request).await {
            Ok(_) => panic!("expected an error"),
            Err(error) => error,
        };
        assert!(matches!(error, LlmError::MissingApiKey));
        assert!(error.is_auth());
    }

    #[test]
    fn endpoint_tolerates_trailing_slash() {
        let settings = LlmSettings {
            base_url: "http://localhost:11434/v1/".to_string(),
            ..LlmSettings::default()
        };
        let provider = OpenAiCompatibleProvider::new(settings).expect("provider");
        assert_eq!(provider.endpoint(), "http://localhost:11434/v1/chat/completions");
    }

    #[tokio::test]
    async fn events_split_across_chunks_are_reassembled() {
        let events = pumped(&[
            b"data: {\"choices\":[{\"delta\":{\"content\":\"caf\xc3\xa9",
            b"\"}}]}\n\n",
            b": keep-alive\n\ndata: {\"choices\":[{\"delta\":{},\"finish_reason\":\"stop\"}]}\r\n\r\n",
            b"data: [DONE]\n\n",
        ])
        .await;
        let events: Vec<LlmStreamEvent> = events
            .into_iter()
            .map(|event| event.expect("event"))
            .collect();
        assert_eq!(
            events,
            vec![
                LlmStreamEvent::TextDelta {
                    text: "caf\u{e9}".to_string()
                },
                LlmStreamEvent::Finish {
                    reason: FinishReason::Stop
                },
            ]
        );
    }

    #[tokio::test]
    async fn body_ending_without_sentinel_still_finishes() {
        let events = pumped(&[b"data: {\"choices\":[{\"delta\":{\"content\":\"hi\"}}]}\n\n"]).await;
        assert_eq!(events.len(), 2);
        assert!(matches!(
            events.last(),
            Some(Ok(LlmStreamEvent::Finish {
                reason: FinishReason::Stop
            }))
        ));
    }

    #[tokio::test]
    async fn undecodable_payload_is_reported() {
        let events = pumped(&[b"data: {not json\n\n"]).await;
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], Err(LlmError::Decode(_))));
    }
}
