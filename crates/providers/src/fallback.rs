use async_trait::async_trait;
use orion_core::{ExtractedCall, Result};
use std::sync::Arc;
use tracing::warn;

use crate::CallExtractor;

/// Tries `primary`; when it fails (model down, HTTP error) asks `secondary`.
/// A null call from the primary is an answer, not a failure.
pub struct FallbackExtractor {
    primary: Arc<dyn CallExtractor>,
    secondary: Arc<dyn CallExtractor>,
}

impl FallbackExtractor {
    pub fn new(primary: Arc<dyn CallExtractor>, secondary: Arc<dyn CallExtractor>) -> Self {
        Self { primary, secondary }
    }
}

#[async_trait]
impl CallExtractor for FallbackExtractor {
    fn name(&self) -> &str {
        self.primary.name()
    }

    async fn extract(&self, text: &str, system_prompt: &str) -> Result<ExtractedCall> {
        match self.primary.extract(text, system_prompt).await {
            Ok(call) => Ok(call),
            Err(e) => {
                warn!(
                    primary = self.primary.name(),
                    fallback = self.secondary.name(),
                    error = %e,
                    "Extractor unavailable, using fallback"
                );
                self.secondary.extract(text, system_prompt).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::KeywordExtractor;
    use orion_core::Error;

    struct Down;

    #[async_trait]
    impl CallExtractor for Down {
        fn name(&self) -> &str {
            "down"
        }

        async fn extract(&self, _text: &str, _system_prompt: &str) -> Result<ExtractedCall> {
            Err(Error::Provider("connection refused".to_string()))
        }
    }

    struct Silent;

    #[async_trait]
    impl CallExtractor for Silent {
        fn name(&self) -> &str {
            "silent"
        }

        async fn extract(&self, _text: &str, _system_prompt: &str) -> Result<ExtractedCall> {
            Ok(ExtractedCall::none())
        }
    }

    #[tokio::test]
    async fn test_falls_back_on_error() {
        let ex = FallbackExtractor::new(Arc::new(Down), Arc::new(KeywordExtractor::new()));
        let call = ex.extract("crear carpeta fotos", "").await.unwrap();
        assert_eq!(call.call.as_deref(), Some("create_folder"));
    }

    #[tokio::test]
    async fn test_null_call_is_kept() {
        let ex = FallbackExtractor::new(Arc::new(Silent), Arc::new(KeywordExtractor::new()));
        let call = ex.extract("crear carpeta fotos", "").await.unwrap();
        assert!(call.call.is_none());
    }
}
