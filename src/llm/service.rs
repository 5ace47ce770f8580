use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use super::provider::LlmProvider;
use super::types::{ChatMessage, ChatRequest};
use crate::core::config::LlmSettings;
use crate::core::errors::ApiError;

/// Provider handle plus the configured model names, built once at startup.
///
/// Every call is bounded by `request_timeout_secs`; expiry surfaces as
/// [`ApiError::Timeout`] and drops the in-flight request.
#[derive(Clone)]
pub struct LlmService {
    provider: Arc<dyn LlmProvider>,
    settings: LlmSettings,
}

impl LlmService {
    pub fn new(provider: Arc<dyn LlmProvider>, settings: LlmSettings) -> Self {
        Self { provider, settings }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn embedding_model(&self) -> &str {
        &self.settings.embedding_model
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.settings.request_timeout_secs.max(1))
    }

    async fn bounded<T, F>(&self, what: &str, fut: F) -> Result<T, ApiError>
    where
        F: Future<Output = Result<T, ApiError>>,
    {
        match tokio::time::timeout(self.timeout(), fut).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    provider = self.provider.name(),
                    timeout_secs = self.timeout().as_secs(),
                    "LLM {} timed out",
                    what
                );
                Err(ApiError::Timeout(format!("LLM {} timed out", what)))
            }
        }
    }

    pub async fn is_available(&self) -> bool {
        let check = tokio::time::timeout(Duration::from_secs(5), self.provider.health_check());
        matches!(check.await, Ok(Ok(true)))
    }

    /// Single-prompt completion on the keyword model.
    pub async fn generate(&self, prompt: &str) -> Result<String, ApiError> {
        self.bounded(
            "generate",
            self.provider.generate(
                prompt,
                &self.settings.keyword_model,
                Some(self.settings.temperature),
            ),
        )
        .await
    }

    /// Chat completion on the chat model at the configured temperature.
    pub async fn chat(&self, messages: Vec<ChatMessage>) -> Result<String, ApiError> {
        let request = ChatRequest::new(messages).with_temperature(self.settings.temperature);
        self.bounded(
            "chat",
            self.provider.chat(request, &self.settings.chat_model),
        )
        .await
    }

    pub async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ApiError> {
        self.bounded(
            "embed",
            self.provider.embed(inputs, &self.settings.embedding_model),
        )
        .await
    }

    pub async fn embed_one(&self, text: &str) -> Result<Vec<f32>, ApiError> {
        self.embed(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::Upstream("Provider returned no embedding".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::mock::{histogram_embedding, MockProvider};
    use crate::llm::types::ProviderModel;
    use async_trait::async_trait;

    struct SlowProvider;

    #[async_trait]
    impl LlmProvider for SlowProvider {
        fn name(&self) -> &str {
            "slow"
        }
        async fn health_check(&self) -> Result<bool, ApiError> {
            Ok(true)
        }
        async fn list_models(&self) -> Result<Vec<ProviderModel>, ApiError> {
            Ok(Vec::new())
        }
        async fn generate(
            &self,
            _prompt: &str,
            _model_id: &str,
            _temperature: Option<f64>,
        ) -> Result<String, ApiError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(String::new())
        }
        async fn chat(&self, _request: ChatRequest, _model_id: &str) -> Result<String, ApiError> {
            Ok(String::new())
        }
        async fn embed(
            &self,
            _inputs: &[String],
            _model_id: &str,
        ) -> Result<Vec<Vec<f32>>, ApiError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn slow_provider_times_out() {
        let settings = LlmSettings {
            request_timeout_secs: 1,
            ..LlmSettings::default()
        };
        let service = LlmService::new(Arc::new(SlowProvider), settings);

        let err = service.generate("hello").await.unwrap_err();
        assert!(matches!(err, ApiError::Timeout(_)));
    }

    #[tokio::test]
    async fn embed_one_returns_first_vector() {
        let service = LlmService::new(Arc::new(MockProvider::new()), LlmSettings::default());
        let vector = service.embed_one("abc").await.unwrap();
        assert_eq!(vector, histogram_embedding("abc"));
    }

    #[tokio::test]
    async fn embed_one_errors_when_provider_returns_nothing() {
        let service = LlmService::new(Arc::new(SlowProvider), LlmSettings::default());
        assert!(matches!(
            service.embed_one("abc").await,
            Err(ApiError::Upstream(_))
        ));
    }
}
