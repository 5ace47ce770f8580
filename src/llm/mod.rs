pub mod mock;
pub mod ollama;
pub mod provider;
pub mod service;
pub mod types;

pub use mock::MockProvider;
pub use ollama::OllamaProvider;
pub use provider::LlmProvider;
pub use service::LlmService;
pub use types::{ChatMessage, ChatRequest, ProviderModel};
