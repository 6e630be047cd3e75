use async_trait::async_trait;
use orion_core::{ArgSchema, ArgType, Args, CapabilitySchema, Error, Result};
use orion_tools::{required_str, Capability, CapabilityContext};
use scraper::{Html, Selector};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::{Plugin, PluginRegistrar};

#[derive(Debug, Clone)]
struct ScraperSettings {
    max_results: usize,
    max_links: usize,
    timeout: Duration,
}

impl Default for ScraperSettings {
    fn default() -> Self {
        Self {
            max_results: 10,
            max_links: 50,
            timeout: Duration::from_secs(30),
        }
    }
}

/// CSS-selector extraction and link listing for web pages.
///
/// Honors `max_results`, `max_links` and `timeout_secs` from its definition's
/// `config` map.
#[derive(Default)]
pub struct WebScraperPlugin {
    settings: ScraperSettings,
}

impl Plugin for WebScraperPlugin {
    fn name(&self) -> &str {
        "web_scraper"
    }

    fn version(&self) -> &str {
        "1.0.0"
    }

    fn description(&self) -> &str {
        "Web scraping: extract content and links"
    }

    fn author(&self) -> &str {
        "ORION Team"
    }

    fn configure(&mut self, config: &Map<String, Value>) {
        let count = |key: &str| config.get(key).and_then(|v| v.as_u64()).filter(|n| *n > 0);
        if let Some(n) = count("max_results") {
            self.settings.max_results = n as usize;
        }
        if let Some(n) = count("max_links") {
            self.settings.max_links = n as usize;
        }
        if let Some(n) = count("timeout_secs") {
            self.settings.timeout = Duration::from_secs(n);
        }
    }

    fn initialize(&mut self) -> Result<()> {
        Ok(())
    }

    fn register_capabilities(&self, registrar: &mut PluginRegistrar<'_>) {
        registrar.register(Arc::new(ScrapeWebpageCapability {
            settings: self.settings.clone(),
        }));
        registrar.register(Arc::new(ExtractLinksCapability {
            settings: self.settings.clone(),
        }));
    }
}

fn parse_http_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw).map_err(|e| Error::Validation(format!("Invalid URL '{}': {}", raw, e)))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(Error::Validation(format!("Unsupported URL scheme: {}", other))),
    }
}

async fn fetch_html(url: &Url, timeout: Duration) -> Result<String> {
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| Error::Capability(format!("Failed to build HTTP client: {}", e)))?;

    debug!(url = %url, "Fetching page");
    let response = client
        .get(url.as_str())
        .send()
        .await
        .map_err(|e| Error::Capability(format!("Request failed: {}", e)))?;

    let status = response.status();
    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(Error::NotFound(format!("Page not found: {}", url)));
    }
    if status == reqwest::StatusCode::FORBIDDEN || status == reqwest::StatusCode::UNAUTHORIZED {
        return Err(Error::PermissionDenied(format!("Access denied ({}): {}", status, url)));
    }
    if !status.is_success() {
        return Err(Error::Capability(format!("HTTP {} for {}", status, url)));
    }

    response
        .text()
        .await
        .map_err(|e| Error::Capability(format!("Failed to read body: {}", e)))
}

/// Whitespace-collapsed text of every element matching `selector`.
pub fn select_texts(html: &str, selector: &str) -> Result<Vec<String>> {
    let selector = Selector::parse(selector)
        .map_err(|e| Error::Validation(format!("Invalid CSS selector '{}': {:?}", selector, e)))?;
    let document = Html::parse_document(html);
    Ok(document
        .select(&selector)
        .map(|el| el.text().flat_map(|t| t.split_whitespace()).collect::<Vec<_>>().join(" "))
        .collect())
}

/// Absolute targets of every `a[href]`, duplicates removed, document order kept.
pub fn collect_links(html: &str, base: &Url) -> (usize, Vec<String>) {
    let document = Html::parse_document(html);
    let mut total = 0;
    let mut unique: Vec<String> = Vec::new();
    if let Ok(selector) = Selector::parse("a[href]") {
        for el in document.select(&selector) {
            let Some(href) = el.value().attr("href") else {
                continue;
            };
            let Ok(link) = base.join(href.trim()) else {
                continue;
            };
            total += 1;
            let link = link.to_string();
            if !unique.contains(&link) {
                unique.push(link);
            }
        }
    }
    (total, unique)
}

// ============ scrape_webpage ============

pub struct ScrapeWebpageCapability {
    settings: ScraperSettings,
}

#[async_trait]
impl Capability for ScrapeWebpageCapability {
    fn schema(&self) -> CapabilitySchema {
        CapabilitySchema::new(
            "scrape_webpage",
            "Extract the text of the elements of a web page matching a CSS selector",
            ArgSchema::new()
                .required("url", ArgType::String)
                .required("selector", ArgType::String),
        )
    }

    async fn execute(&self, _ctx: CapabilityContext, args: Args) -> Result<Value> {
        let url = parse_http_url(required_str(&args, "url")?)?;
        let selector = required_str(&args, "selector")?;
        // Reject a bad selector before touching the network.
        Selector::parse(selector)
            .map_err(|e| Error::Validation(format!("Invalid CSS selector '{}': {:?}", selector, e)))?;

        let html = fetch_html(&url, self.settings.timeout).await?;
        let texts = select_texts(&html, selector)?;
        if texts.is_empty() {
            return Ok(json!(format!("No elements matched selector '{}'", selector)));
        }

        let mut out = format!("Extracted {} elements from {}:", texts.len(), url);
        for (i, text) in texts.iter().take(self.settings.max_results).enumerate() {
            out.push_str(&format!("\n{}. {}", i + 1, text));
        }
        Ok(json!(out))
    }
}

// ============ extract_links ============

pub struct ExtractLinksCapability {
    settings: ScraperSettings,
}

#[async_trait]
impl Capability for ExtractLinksCapability {
    fn schema(&self) -> CapabilitySchema {
        CapabilitySchema::new(
            "extract_links",
            "List the links of a web page as absolute URLs",
            ArgSchema::new().required("url", ArgType::String),
        )
    }

    async fn execute(&self, _ctx: CapabilityContext, args: Args) -> Result<Value> {
        let url = parse_http_url(required_str(&args, "url")?)?;
        let html = fetch_html(&url, self.settings.timeout).await?;
        let (total, links) = collect_links(&html, &url);

        let mut out = format!("Found {} links in {}:\n", total, url);
        for (i, link) in links.iter().take(self.settings.max_links).enumerate() {
            out.push_str(&format!("{}. {}\n", i + 1, link));
        }
        if links.len() > self.settings.max_links {
            out.push_str(&format!(
                "\n(Showing first {} of {} links)",
                self.settings.max_links,
                links.len()
            ));
        }
        Ok(json!(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const PAGE: &str = r#"
        <html><body>
          <h2 class="title">First  post</h2>
          <h2 class="title">Second
             post</h2>
          <a href="/about">About</a>
          <a href="https://other.org/x">Other</a>
          <a href="/about">About again</a>
          <a name="anchor">No href</a>
        </body></html>"#;

    #[test]
    fn test_select_texts() {
        let texts = select_texts(PAGE, "h2.title").unwrap();
        assert_eq!(texts, vec!["First post", "Second post"]);
        assert!(select_texts(PAGE, "p.missing").unwrap().is_empty());
        assert!(matches!(select_texts(PAGE, "h2[["), Err(Error::Validation(_))));
    }

    #[test]
    fn test_collect_links_resolves_and_dedupes() {
        let base = Url::parse("https://example.com/blog/").unwrap();
        let (total, links) = collect_links(PAGE, &base);
        assert_eq!(total, 3);
        assert_eq!(links, vec!["https://example.com/about", "https://other.org/x"]);
    }

    #[test]
    fn test_configure_overrides_limits() {
        let mut plugin = WebScraperPlugin::default();
        let config = json!({"max_links": 5, "timeout_secs": 0}).as_object().cloned().unwrap();
        plugin.configure(&config);
        assert_eq!(plugin.settings.max_links, 5);
        assert_eq!(plugin.settings.max_results, 10);
        assert_eq!(plugin.settings.timeout, Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_rejects_non_http_scheme() {
        let args = json!({"url": "ftp://example.com"}).as_object().cloned().unwrap();
        let err = ExtractLinksCapability {
            settings: ScraperSettings::default(),
        }
        .execute(CapabilityContext::new(PathBuf::from(".")), args)
        .await
        .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }
}
