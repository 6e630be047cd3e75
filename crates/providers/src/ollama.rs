use async_trait::async_trait;
use orion_core::{Error, ExtractedCall, Result};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::client::build_http_client;
use crate::CallExtractor;

const DEFAULT_OLLAMA_BASE: &str = "http://localhost:11434";

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

/// Single-call extraction through Ollama's `/api/generate` in JSON mode.
pub struct OllamaExtractor {
    client: Client,
    api_base: String,
    model: String,
}

impl OllamaExtractor {
    pub fn new(api_base: Option<&str>, model: &str, timeout: Duration) -> Self {
        let resolved_base = api_base
            .filter(|b| !b.trim().is_empty())
            .unwrap_or(DEFAULT_OLLAMA_BASE)
            .trim_end_matches('/')
            .to_string();
        let client = build_http_client(&resolved_base, timeout);
        Self {
            client,
            api_base: resolved_base,
            model: model.to_string(),
        }
    }

    /// Strip "ollama/" prefix from model names.
    fn normalize_model(model: &str) -> &str {
        model.strip_prefix("ollama/").unwrap_or(model)
    }

    /// Parse the model's text reply. Anything that is not a JSON object with
    /// a call key becomes a null call.
    pub(crate) fn parse_reply(raw: &str) -> ExtractedCall {
        let text = strip_code_fence(raw);
        let value: Value = match serde_json::from_str(text) {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, raw = %raw, "Model reply is not valid JSON");
                return ExtractedCall::none();
            }
        };
        let obj = match value.as_object() {
            Some(o) => o,
            None => {
                warn!(raw = %raw, "Model reply is not a JSON object");
                return ExtractedCall::none();
            }
        };
        if !obj.contains_key("CALL") && !obj.contains_key("call") {
            warn!(keys = ?obj.keys().collect::<Vec<_>>(), "Model reply has no CALL key");
            return ExtractedCall::none();
        }
        serde_json::from_value(value.clone()).unwrap_or_else(|e| {
            warn!(error = %e, "Model reply has an unexpected shape");
            ExtractedCall::none()
        })
    }
}

fn strip_code_fence(raw: &str) -> &str {
    let text = raw.trim();
    let inner = if let Some(rest) = text.strip_prefix("```json") {
        rest
    } else if let Some(rest) = text.strip_prefix("```") {
        rest
    } else {
        return text;
    };
    inner.trim_end().trim_end_matches("```").trim()
}

#[async_trait]
impl CallExtractor for OllamaExtractor {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn extract(&self, text: &str, system_prompt: &str) -> Result<ExtractedCall> {
        let url = format!("{}/api/generate", self.api_base);
        let model = Self::normalize_model(&self.model);

        let request = serde_json::json!({
            "model": model,
            "prompt": text,
            "system": system_prompt,
            "stream": false,
            "format": "json",
        });

        info!(url = %url, model = %model, "Calling Ollama API");

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Provider(format!("Ollama request failed: {}", e)))?;

        let status = response.status();
        let raw_body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            error!(status = %status, body = %raw_body, "Ollama API error");
            return Err(Error::Provider(format!("Ollama API error {}: {}", status, raw_body)));
        }

        debug!(body_len = raw_body.len(), "Ollama raw response");

        let resp: GenerateResponse = serde_json::from_str(&raw_body)
            .map_err(|e| Error::Provider(format!("Failed to parse Ollama response: {}", e)))?;

        let call = Self::parse_reply(&resp.response);
        info!(call = ?call.call, "Model extracted call");
        Ok(call)
    }
}
