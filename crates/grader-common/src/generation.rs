/// Prompt-in, text-out handle over a language model.
///
/// The grading pipeline only ever needs a single completion for a fully formed
/// prompt, so the seam is one method. Implementations must be safe to share
/// across concurrent grading calls.
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::error::GenerationError;
use crate::openai::{ChatCompletionRequest, Message, OpenAiClient};

#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}

/// Sampling settings sent with every completion request.
#[derive(Debug, Clone)]
pub struct GenerationSettings {
    pub model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

/// `TextGenerator` backed by an OpenAI-compatible chat-completions endpoint.
#[derive(Clone)]
pub struct OpenAiGenerator {
    client: Arc<OpenAiClient>,
    settings: GenerationSettings,
}

impl OpenAiGenerator {
    pub fn new(client: Arc<OpenAiClient>, settings: GenerationSettings) -> Self {
        Self { client, settings }
    }
}

#[async_trait]
impl TextGenerator for OpenAiGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let request = ChatCompletionRequest {
            model: self.settings.model.clone(),
            messages: vec![Message::user(prompt)],
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
        };
        let response = self.client.chat_completions(request, None).await?;

        if let Some(usage) = &response.usage {
            debug!(
                model = %self.settings.model,
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "completion received"
            );
        }

        response
            .first_text()
            .filter(|text| !text.trim().is_empty())
            .map(str::to_string)
            .ok_or(GenerationError::EmptyCompletion)
    }
}

/// Wraps another generator and fails any call that outlives `limit`.
///
/// Dropping the inner future on expiry cancels the in-flight request.
#[derive(Clone)]
pub struct TimeBounded {
    inner: Arc<dyn TextGenerator>,
    limit: Duration,
}

impl TimeBounded {
    pub fn new(inner: Arc<dyn TextGenerator>, limit: Duration) -> Self {
        Self { inner, limit }
    }
}

#[async_trait]
impl TextGenerator for TimeBounded {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        tokio::time::timeout(self.limit, self.inner.generate(prompt))
            .await
            .map_err(|_| GenerationError::Timeout(self.limit))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Slow(Duration);

    #[async_trait]
    impl TextGenerator for Slow {
        async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
            tokio::time::sleep(self.0).await;
            Ok(prompt.to_uppercase())
        }
    }

    #[tokio::test]
    async fn time_bounded_passes_fast_completions_through() {
        let bounded = TimeBounded::new(Arc::new(Slow(Duration::ZERO)), Duration::from_secs(5));
        assert_eq!(bounded.generate("ok").await.unwrap(), "OK");
    }

    #[tokio::test]
    async fn time_bounded_reports_timeout() {
        let limit = Duration::from_millis(20);
        let bounded = TimeBounded::new(Arc::new(Slow(Duration::from_secs(10))), limit);
        match bounded.generate("late").await {
            Err(GenerationError::Timeout(d)) => assert_eq!(d, limit),
            other => panic!("expected timeout, got {other:?}"),
        }
    }
}
