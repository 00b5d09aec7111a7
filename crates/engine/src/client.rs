//! Generation client: one generate call and the reading of its response.

use recast_core::backend::{BackendTransport, CallOptions};
use recast_core::clock::{Clock, SystemClock};
use recast_core::error::{Error, Result};
use recast_core::event::{EventBus, TransformEvent};
use recast_core::model::{FinishReason, GenerateContentResponse, ModelRequest, ModelResponse};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct GenerationClient {
    transport: Arc<dyn BackendTransport>,
    options: CallOptions,
    events: Option<Arc<EventBus>>,
    clock: Arc<dyn Clock>,
}

impl GenerationClient {
    pub fn new(transport: Arc<dyn BackendTransport>, options: CallOptions) -> Self {
        Self {
            transport,
            options,
            events: None,
            clock: Arc::new(SystemClock),
        }
    }

    /// Publish `TokensUsed` to this bus after every call that reports usage.
    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = Some(events);
        self
    }

    /// Clock stamping `TokensUsed` events.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn options(&self) -> &CallOptions {
        &self.options
    }

    /// Send `request` and interpret the first candidate.
    pub async fn invoke(&self, request: &ModelRequest, model_id: &str) -> Result<ModelResponse> {
        debug!(
            transport = self.transport.name(),
            model = %model_id,
            shape = request.shape(),
            timeout_secs = self.options.timeout.as_secs(),
            "Invoking model"
        );

        let envelope = self
            .transport
            .generate(model_id, request, &self.options)
            .await?;

        if let Some(total) = envelope
            .as_ref()
            .and_then(|e| e.usage_metadata.as_ref())
            .and_then(|u| u.total_token_count)
        {
            info!(model = %model_id, total_tokens = total, "Token usage");
            if let Some(events) = &self.events {
                events.publish(TransformEvent::TokensUsed {
                    model_id: model_id.to_string(),
                    total_tokens: total,
                    timestamp: self.clock.now(),
                });
            }
        }

        interpret(envelope)
    }
}

/// Classify a response envelope.
///
/// Only `candidates[0]` is read. A finish reason other than STOP becomes
/// [`Error::IncompleteGeneration`] carrying whatever text was produced.
pub fn interpret(envelope: Option<GenerateContentResponse>) -> Result<ModelResponse> {
    let envelope = envelope.ok_or(Error::NoResponse)?;
    let token_count = envelope.usage_metadata.as_ref().and_then(|u| u.total_token_count);
    let candidate = envelope
        .candidates
        .into_iter()
        .next()
        .ok_or(Error::EmptyCandidate)?;

    let text = candidate.text();
    let finish_reason = candidate.finish_reason.unwrap_or(FinishReason::Unspecified);

    if !finish_reason.is_stop() {
        warn!(
            reason = %finish_reason,
            message = candidate.finish_message.as_deref().unwrap_or(""),
            partial_bytes = text.len(),
            "Generation did not finish normally"
        );
        return Err(Error::IncompleteGeneration {
            reason: finish_reason,
            partial_message: candidate.finish_message,
            partial_text: text,
        });
    }

    Ok(ModelResponse {
        text,
        finish_reason,
        finish_message: candidate.finish_message,
        token_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{ManualClock, MockTransport, envelope};
    use recast_core::error::ProviderError;
    use recast_core::model::{GenerationConfig, UsageMetadata};
    use std::time::Duration;

    fn options() -> CallOptions {
        CallOptions {
            generation: GenerationConfig::default(),
            timeout: Duration::from_secs(60),
        }
    }

    fn fresh() -> ModelRequest {
        ModelRequest::Fresh {
            system_instruction: "sys".into(),
            user_parts: vec!["<context></context>".into(), "migrate".into()],
        }
    }

    #[test]
    fn stop_returns_text_and_tokens() {
        let response = interpret(Some(envelope("done", "STOP"))).unwrap();
        assert_eq!(response.text, "done");
        assert_eq!(response.finish_reason, FinishReason::Stop);
        assert_eq!(response.token_count, Some(120));
    }

    #[test]
    fn missing_envelope_is_no_response() {
        assert!(matches!(interpret(None), Err(Error::NoResponse)));
    }

    #[test]
    fn zero_candidates_is_empty_candidate() {
        let empty = GenerateContentResponse {
            candidates: vec![],
            usage_metadata: Some(UsageMetadata::default()),
        };
        assert!(matches!(interpret(Some(empty)), Err(Error::EmptyCandidate)));
    }

    #[test]
    fn only_first_candidate_is_read() {
        let mut env = envelope("first", "STOP");
        env.candidates.push(envelope("second", "SAFETY").candidates.remove(0));
        assert_eq!(interpret(Some(env)).unwrap().text, "first");
    }

    #[test]
    fn non_stop_carries_partial_output() {
        let mut env = envelope("partial", "SAFETY");
        env.candidates[0].finish_message = Some("blocked".into());

        match interpret(Some(env)).unwrap_err() {
            Error::IncompleteGeneration {
                reason,
                partial_message,
                partial_text,
            } => {
                assert_eq!(reason, FinishReason::Safety);
                assert_eq!(partial_message.as_deref(), Some("blocked"));
                assert_eq!(partial_text, "partial");
            }
            other => panic!("Expected IncompleteGeneration, got {other:?}"),
        }
    }

    #[test]
    fn missing_finish_reason_is_incomplete() {
        let mut env = envelope("text", "STOP");
        env.candidates[0].finish_reason = None;
        let err = interpret(Some(env)).unwrap_err();
        assert!(matches!(
            err,
            Error::IncompleteGeneration {
                reason: FinishReason::Unspecified,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn invoke_publishes_token_usage() {
        let bus = Arc::new(EventBus::default());
        let mut rx = bus.subscribe();
        let clock = Arc::new(ManualClock::new());
        let client = GenerationClient::new(Arc::new(MockTransport::text("ok", 1)), options())
            .with_events(bus.clone())
            .with_clock(clock.clone());

        let response = client.invoke(&fresh(), "m1").await.unwrap();
        assert_eq!(response.text, "ok");

        let event = rx.recv().await.unwrap();
        match event.as_ref() {
            TransformEvent::TokensUsed {
                model_id,
                total_tokens,
                timestamp,
            } => {
                assert_eq!(model_id, "m1");
                assert_eq!(*total_tokens, 120);
                assert_eq!(*timestamp, clock.now());
            }
            other => panic!("Expected TokensUsed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn transport_error_propagates_as_provider_error() {
        let transport = Arc::new(MockTransport::new(vec![Err(ProviderError::Timeout(60))]));
        let client = GenerationClient::new(transport, options());

        let err = client.invoke(&fresh(), "m1").await.unwrap_err();
        assert!(matches!(err, Error::Provider(ProviderError::Timeout(60))));
    }
}
