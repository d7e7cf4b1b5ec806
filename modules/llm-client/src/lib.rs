pub mod ollama;
pub mod openai;
pub mod util;

pub use ollama::Ollama;
pub use openai::OpenAi;

use anyhow::Result;
use async_trait::async_trait;

/// A single-turn chat completion: system preamble + user prompt in, text out.
/// No streaming, no multi-turn state.
#[async_trait]
pub trait ChatCompletion: Send + Sync {
    async fn chat_completion(&self, system: &str, user: &str) -> Result<String>;

    /// Identifier of the underlying model, recorded for provenance.
    fn model(&self) -> &str;
}
