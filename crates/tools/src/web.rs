use async_trait::async_trait;
use orion_core::{ArgSchema, ArgType, Args, CapabilitySchema, Error, Result};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use crate::{required_str, Capability, CapabilityContext};

const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(30);

pub struct DownloadFileCapability;

#[async_trait]
impl Capability for DownloadFileCapability {
    fn schema(&self) -> CapabilitySchema {
        CapabilitySchema::new(
            "download_file",
            "Download a file from a URL to a local path",
            ArgSchema::new()
                .required("url", ArgType::String)
                .required("output_path", ArgType::String),
        )
    }

    async fn execute(&self, ctx: CapabilityContext, args: Args) -> Result<Value> {
        let url = required_str(&args, "url")?;
        let output = required_str(&args, "output_path")?;

        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(Error::Validation(format!("Unsupported URL: {}", url)));
        }

        let client = reqwest::Client::builder()
            .timeout(DOWNLOAD_TIMEOUT)
            .build()
            .map_err(|e| Error::Capability(format!("Failed to build HTTP client: {}", e)))?;

        debug!(url, "Downloading");
        let response = client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::Capability(format!("Request failed: {}", e)))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(Error::NotFound(format!("Remote file not found: {}", url)));
        }
        if status == reqwest::StatusCode::FORBIDDEN || status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(Error::PermissionDenied(format!("Access denied ({}): {}", status, url)));
        }
        if !status.is_success() {
            return Err(Error::Capability(format!("HTTP {} for {}", status, url)));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Capability(format!("Failed to read body: {}", e)))?;

        let path = ctx.resolve(output);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, &bytes).await?;

        Ok(json!(format!("File downloaded: {} ({} bytes)", output, bytes.len())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[tokio::test]
    async fn test_rejects_non_http_urls() {
        let args = json!({"url": "file:///etc/passwd", "output_path": "x"})
            .as_object()
            .cloned()
            .unwrap();
        let err = DownloadFileCapability
            .execute(CapabilityContext::new(PathBuf::from(".")), args)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_schema() {
        let schema = DownloadFileCapability.schema();
        assert_eq!(schema.name, "download_file");
        assert_eq!(schema.args.required_names().count(), 2);
    }
}
