use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

/// Host part of a URL, without scheme, credentials or port.
fn extract_host(url: &str) -> Option<String> {
    let without_scheme = match url.find("://") {
        Some(pos) => &url[pos + 3..],
        None => url,
    };
    let host = without_scheme.split('/').next()?.split('@').last()?;
    let host = if host.starts_with('[') {
        host.split(']').next().map(|s| s.trim_start_matches('['))?.to_string()
    } else {
        host.split(':').next()?.to_string()
    };
    Some(host)
}

fn is_loopback(host: &str) -> bool {
    matches!(host.to_lowercase().as_str(), "localhost" | "127.0.0.1" | "::1")
}

/// Build the HTTP client used to reach a model backend.
///
/// Loopback backends (the usual local Ollama) bypass any proxy configured
/// through `HTTPS_PROXY`/`HTTP_PROXY`.
pub fn build_http_client(api_base: &str, timeout: Duration) -> Client {
    let mut builder = Client::builder().timeout(timeout);

    if extract_host(api_base).map(|h| is_loopback(&h)).unwrap_or(false) {
        debug!(api_base = %api_base, "Local model backend, proxy disabled");
        builder = builder.no_proxy();
    }

    builder.build().unwrap_or_else(|e| {
        warn!(error = %e, "Failed to build HTTP client, using default");
        Client::new()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_host() {
        assert_eq!(extract_host("http://localhost:11434"), Some("localhost".to_string()));
        assert_eq!(extract_host("https://user:pw@models.lan:8080/x"), Some("models.lan".to_string()));
        assert_eq!(extract_host("http://[::1]:11434"), Some("::1".to_string()));
    }

    #[test]
    fn test_is_loopback() {
        assert!(is_loopback("LOCALHOST"));
        assert!(is_loopback("127.0.0.1"));
        assert!(!is_loopback("ollama.internal"));
    }
}
