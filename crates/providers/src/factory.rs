use orion_core::config::ExtractorConfig;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::{CallExtractor, FallbackExtractor, KeywordExtractor, OllamaExtractor};

/// Build the extractor chain described by the configuration.
pub fn create_extractor(config: &ExtractorConfig) -> Arc<dyn CallExtractor> {
    match config.provider.trim().to_lowercase().as_str() {
        "keyword" | "offline" => {
            info!("Using keyword extractor");
            Arc::new(KeywordExtractor::new())
        }
        other => {
            if other != "ollama" {
                warn!(provider = %other, "Unknown extractor provider, using ollama");
            }
            let ollama: Arc<dyn CallExtractor> = Arc::new(OllamaExtractor::new(
                Some(&config.api_base),
                &config.model,
                Duration::from_secs(config.timeout_secs.max(1)),
            ));
            info!(model = %config.model, fallback = config.fallback, "Using ollama extractor");
            if config.fallback {
                Arc::new(FallbackExtractor::new(ollama, Arc::new(KeywordExtractor::new())))
            } else {
                ollama
            }
        }
    }
}
