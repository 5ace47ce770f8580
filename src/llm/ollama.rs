use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::provider::LlmProvider;
use super::types::{ChatRequest, ProviderModel};
use crate::core::errors::ApiError;

#[derive(Clone)]
pub struct OllamaProvider {
    base_url: String,
    api_key: Option<String>,
    client: Client,
}

impl OllamaProvider {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            client: Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    async fn post_json(&self, path: &str, body: &Value) -> Result<Value, ApiError> {
        let res = self
            .authorized(self.client.post(self.url(path)))
            .json(body)
            .send()
            .await
            .map_err(ApiError::upstream)?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::Upstream(format!(
                "Ollama {} failed ({}): {}",
                path, status, text
            )));
        }

        res.json().await.map_err(ApiError::upstream)
    }
}

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagInfo>,
}

#[derive(Deserialize)]
struct TagInfo {
    name: String,
    #[serde(default)]
    model: Option<String>,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: String,
}

#[derive(Deserialize)]
struct EmbedResponse {
    #[serde(default)]
    embeddings: Vec<Vec<f32>>,
}

fn options(temperature: Option<f64>, max_tokens: Option<i32>, stop: Option<&[String]>) -> Value {
    let mut opts = Map::new();
    if let Some(t) = temperature {
        opts.insert("temperature".to_string(), json!(t));
    }
    if let Some(n) = max_tokens {
        opts.insert("num_predict".to_string(), json!(n));
    }
    if let Some(s) = stop {
        opts.insert("stop".to_string(), json!(s));
    }
    Value::Object(opts)
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn health_check(&self) -> Result<bool, ApiError> {
        let res = self
            .authorized(self.client.get(self.url("/api/tags")))
            .send()
            .await;
        match res {
            Ok(resp) => Ok(resp.status().is_success()),
            Err(err) => {
                tracing::debug!("Ollama health check failed: {}", err);
                Ok(false)
            }
        }
    }

    async fn list_models(&self) -> Result<Vec<ProviderModel>, ApiError> {
        let res = self
            .authorized(self.client.get(self.url("/api/tags")))
            .send()
            .await
            .map_err(ApiError::upstream)?;

        if !res.status().is_success() {
            return Err(ApiError::Upstream(format!(
                "Failed to list models: {}",
                res.status()
            )));
        }

        let tags: TagsResponse = res.json().await.map_err(ApiError::upstream)?;
        Ok(tags
            .models
            .into_iter()
            .map(|m| ProviderModel {
                id: m.model.unwrap_or_else(|| m.name.clone()),
                name: m.name,
            })
            .collect())
    }

    async fn generate(
        &self,
        prompt: &str,
        model_id: &str,
        temperature: Option<f64>,
    ) -> Result<String, ApiError> {
        let body = json!({
            "model": model_id,
            "prompt": prompt,
            "stream": false,
            "options": options(temperature, None, None),
        });

        let payload = self.post_json("/api/generate", &body).await?;
        let parsed: GenerateResponse =
            serde_json::from_value(payload).map_err(ApiError::upstream)?;
        Ok(parsed.response)
    }

    async fn chat(&self, request: ChatRequest, model_id: &str) -> Result<String, ApiError> {
        let body = json!({
            "model": model_id,
            "messages": request.messages,
            "stream": false,
            "options": options(request.temperature, request.max_tokens, request.stop.as_deref()),
        });

        let payload = self.post_json("/api/chat", &body).await?;
        let parsed: ChatResponse = serde_json::from_value(payload).map_err(ApiError::upstream)?;
        Ok(parsed.message.content)
    }

    async fn embed(&self, inputs: &[String], model_id: &str) -> Result<Vec<Vec<f32>>, ApiError> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let body = json!({
            "model": model_id,
            "input": inputs,
        });

        let payload = self.post_json("/api/embed", &body).await?;
        let parsed: EmbedResponse = serde_json::from_value(payload).map_err(ApiError::upstream)?;

        if parsed.embeddings.len() != inputs.len() {
            return Err(ApiError::Upstream(format!(
                "Embedding count mismatch: {} != {}",
                parsed.embeddings.len(),
                inputs.len()
            )));
        }
        Ok(parsed.embeddings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_only_carry_set_fields() {
        assert_eq!(options(None, None, None), json!({}));
        assert_eq!(
            options(Some(0.1), Some(64), None),
            json!({ "temperature": 0.1, "num_predict": 64 })
        );
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let provider = OllamaProvider::new("http://localhost:11434/", Some("  ".to_string()));
        assert_eq!(provider.url("/api/tags"), "http://localhost:11434/api/tags");
        assert!(provider.api_key.is_none());
    }

    #[tokio::test]
    #[ignore]
    async fn live_ollama_roundtrip() {
        let provider = OllamaProvider::new("http://localhost:11434", None);
        let models = provider.list_models().await.unwrap();
        println!("Ollama models found: {}", models.len());

        if let Some(first) = models.first() {
            let reply = provider.generate("Say hello", &first.id, Some(0.1)).await;
            println!("Ollama reply: {:?}", reply);
        }
    }
}
