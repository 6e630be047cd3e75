pub mod client;
pub mod factory;
pub mod fallback;
pub mod keyword;
pub mod ollama;

use async_trait::async_trait;
use orion_core::{ExtractedCall, Result};

/// Maps free text to a single capability call.
///
/// An extractor that understood the request but found nothing to call
/// returns `ExtractedCall::none()`; `Err` is reserved for transport or
/// backend failures.
#[async_trait]
pub trait CallExtractor: Send + Sync {
    fn name(&self) -> &str;
    async fn extract(&self, text: &str, system_prompt: &str) -> Result<ExtractedCall>;
}

pub use factory::create_extractor;
pub use fallback::FallbackExtractor;
pub use keyword::KeywordExtractor;
pub use ollama::OllamaExtractor;
