//! Scripted provider for tests and offline runs.
//!
//! Replies are chosen by the first matching prompt rule, then from a FIFO
//! queue, then a fixed default. Embeddings are deterministic character
//! histograms unless a text has a pinned vector.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::provider::LlmProvider;
use super::types::{ChatRequest, ProviderModel};
use crate::core::errors::ApiError;

pub const MOCK_EMBEDDING_DIM: usize = 27;
const DEFAULT_REPLY: &str = "mock reply";

#[derive(Clone, Default)]
pub struct MockProvider {
    rules: Arc<Mutex<Vec<(String, String)>>>,
    queue: Arc<Mutex<VecDeque<String>>>,
    pinned: Arc<Mutex<HashMap<String, Vec<f32>>>>,
    prompts: Arc<Mutex<Vec<String>>>,
    offline: Arc<AtomicBool>,
    failing: Arc<AtomicBool>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply with `reply` whenever the prompt contains `needle`.
    pub fn reply_when(&self, needle: impl Into<String>, reply: impl Into<String>) -> &Self {
        lock(&self.rules).push((needle.into(), reply.into()));
        self
    }

    pub fn push_reply(&self, reply: impl Into<String>) -> &Self {
        lock(&self.queue).push_back(reply.into());
        self
    }

    pub fn pin_embedding(&self, text: impl Into<String>, vector: Vec<f32>) -> &Self {
        lock(&self.pinned).insert(text.into(), vector);
        self
    }

    /// Health checks report unreachable.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Every completion and embedding call fails with an upstream error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Prompts seen so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        lock(&self.prompts).clone()
    }

    fn check_failing(&self) -> Result<(), ApiError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(ApiError::Upstream("mock provider failure".to_string()));
        }
        Ok(())
    }

    fn reply_for(&self, prompt: &str) -> String {
        lock(&self.prompts).push(prompt.to_string());

        if let Some((_, reply)) = lock(&self.rules)
            .iter()
            .find(|(needle, _)| prompt.contains(needle.as_str()))
        {
            return reply.clone();
        }

        lock(&self.queue)
            .pop_front()
            .unwrap_or_else(|| DEFAULT_REPLY.to_string())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Letter histogram over a-z plus one bucket for everything else.
pub fn histogram_embedding(text: &str) -> Vec<f32> {
    let mut vector = vec![0.0f32; MOCK_EMBEDDING_DIM];
    for c in text.chars().filter(|c| !c.is_whitespace()) {
        let lower = c.to_ascii_lowercase();
        let bucket = if lower.is_ascii_lowercase() {
            (lower as u8 - b'a') as usize
        } else {
            MOCK_EMBEDDING_DIM - 1
        };
        vector[bucket] += 1.0;
    }
    vector
}

#[async_trait]
impl LlmProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn health_check(&self) -> Result<bool, ApiError> {
        Ok(!self.offline.load(Ordering::SeqCst))
    }

    async fn list_models(&self) -> Result<Vec<ProviderModel>, ApiError> {
        Ok(vec![ProviderModel {
            id: "mock".to_string(),
            name: "mock".to_string(),
        }])
    }

    async fn generate(
        &self,
        prompt: &str,
        _model_id: &str,
        _temperature: Option<f64>,
    ) -> Result<String, ApiError> {
        self.check_failing()?;
        Ok(self.reply_for(prompt))
    }

    async fn chat(&self, request: ChatRequest, _model_id: &str) -> Result<String, ApiError> {
        self.check_failing()?;
        Ok(self.reply_for(&request.as_prompt()))
    }

    async fn embed(&self, inputs: &[String], _model_id: &str) -> Result<Vec<Vec<f32>>, ApiError> {
        self.check_failing()?;
        let pinned = lock(&self.pinned);
        Ok(inputs
            .iter()
            .map(|text| {
                pinned
                    .get(text)
                    .cloned()
                    .unwrap_or_else(|| histogram_embedding(text))
            })
            .collect())
    }
}
