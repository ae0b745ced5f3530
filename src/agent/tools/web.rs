//! Web tools: web_search and fetch_page.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde_json::json;
use url::Url;

use super::base::{require_str, Tool, ToolOutcome};
use crate::errors::ToolErrorKind;

/// Shared user-agent string.
const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_7_2) AppleWebKit/537.36";

/// Maximum number of redirects to follow.
const MAX_REDIRECTS: usize = 5;

/// Maximum response body size (5 MB). Prevents memory spikes on large responses.
const MAX_BODY_BYTES: usize = 5 * 1024 * 1024;

/// Default cap on extracted text returned to the model.
const DEFAULT_MAX_CHARS: usize = 20_000;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Normalize whitespace: collapse runs of spaces/tabs, limit consecutive newlines.
fn normalize_whitespace(text: &str) -> String {
    let re_spaces = Regex::new(r"[ \t]+").unwrap();
    let text = re_spaces.replace_all(text, " ");
    let re_newlines = Regex::new(r"\n{3,}").unwrap();
    re_newlines.replace_all(&text, "\n\n").trim().to_string()
}

/// Validate a URL: must be http(s) with a valid, non-private domain.
///
/// Blocks local/private addresses to prevent SSRF where the model is tricked
/// into fetching internal services.
fn validate_url(url_str: &str) -> Result<(), String> {
    let parsed = Url::parse(url_str).map_err(|e| format!("Invalid URL: {}", e))?;
    match parsed.scheme() {
        "http" | "https" => {}
        other => return Err(format!("Only http/https allowed, got '{}'", other)),
    }
    let host = parsed.host_str().ok_or("Missing domain")?;

    let lower = host.to_lowercase();
    if lower == "localhost"
        || lower == "0.0.0.0"
        || lower.ends_with(".local")
        || lower.ends_with(".internal")
    {
        return Err(format!("Access to local host '{}' is blocked", host));
    }

    // Block private/reserved IP ranges (RFC 1918, link-local, loopback, metadata).
    if let Ok(ip) = host.parse::<std::net::IpAddr>() {
        let blocked = match ip {
            std::net::IpAddr::V4(v4) => {
                v4.is_loopback()
                    || v4.is_private()
                    || v4.is_link_local()
                    || v4.is_unspecified()
            }
            std::net::IpAddr::V6(v6) => v6.is_loopback() || v6.is_unspecified(),
        };
        if blocked {
            return Err(format!("Access to private/local IP '{}' is blocked", ip));
        }
    }

    Ok(())
}

/// Extract readable text from an HTML document.
///
/// Prefers the main content containers, falling back to the whole body.
fn extract_html_text(html: &str) -> String {
    use scraper::{Html, Selector};

    let document = Html::parse_document(html);

    let title = Selector::parse("title")
        .ok()
        .and_then(|sel| document.select(&sel).next())
        .map(|el| el.text().collect::<String>())
        .unwrap_or_default();

    let selectors = ["article", "main", "[role=\"main\"]", "body"];
    let mut body_text = String::new();

    for sel_str in &selectors {
        if let Ok(sel) = Selector::parse(sel_str) {
            if let Some(el) = document.select(&sel).next() {
                body_text = el.text().collect::<Vec<_>>().join(" ");
                if !body_text.trim().is_empty() {
                    break;
                }
            }
        }
    }

    if body_text.trim().is_empty() {
        body_text = document.root_element().text().collect::<Vec<_>>().join(" ");
    }

    let decoded = html_escape::decode_html_entities(&body_text).to_string();
    let result = normalize_whitespace(&decoded);

    if title.is_empty() {
        result
    } else {
        format!("# {}\n\n{}", title.trim(), result)
    }
}

// ---------------------------------------------------------------------------
// WebSearchTool
// ---------------------------------------------------------------------------

/// Search the web using the Brave Search API.
pub struct WebSearchTool {
    api_key: String,
    max_results: u32,
    client: Client,
}

impl WebSearchTool {
    /// If `api_key` is `None`, the `BRAVE_API_KEY` environment variable is
    /// checked. Passing `Some("")` explicitly disables env fallback.
    pub fn new(api_key: Option<String>, max_results: u32) -> Self {
        let resolved_key = match api_key {
            Some(key) => key,
            None => std::env::var("BRAVE_API_KEY").unwrap_or_default(),
        };

        Self {
            api_key: resolved_key,
            max_results,
            client: Client::new(),
        }
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Search the web. Returns titles, URLs, and snippets."
    }

    fn parameters(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Search query"
                },
                "count": {
                    "type": "integer",
                    "description": "Results (1-10)",
                    "minimum": 1,
                    "maximum": 10
                }
            },
            "required": ["query"]
        })
    }

    async fn invoke(&self, args: HashMap<String, serde_json::Value>) -> ToolOutcome {
        let query = match require_str(&args, "query") {
            Ok(q) => q.to_string(),
            Err(kind) => return ToolOutcome::failure(kind),
        };

        if self.api_key.is_empty() {
            return ToolOutcome::failure(ToolErrorKind::InvalidArguments(
                "BRAVE_API_KEY not configured".to_string(),
            ));
        }

        let count = args
            .get("count")
            .and_then(|v| v.as_u64())
            .map(|n| n.clamp(1, 10) as u32)
            .unwrap_or(self.max_results);

        let response = match self
            .client
            .get("https://api.search.brave.com/res/v1/web/search")
            .query(&[("q", query.as_str()), ("count", &count.to_string())])
            .header("Accept", "application/json")
            .header("X-Subscription-Token", &self.api_key)
            .timeout(Duration::from_secs(10))
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                return ToolOutcome::failure(ToolErrorKind::UpstreamUnavailable(format!(
                    "search provider unreachable: {}",
                    e
                )));
            }
        };

        let status = response.status();
        if !status.is_success() {
            return ToolOutcome::failure(ToolErrorKind::UpstreamUnavailable(format!(
                "search provider returned HTTP {}",
                status
            )));
        }

        let data: serde_json::Value = match response.json().await {
            Ok(v) => v,
            Err(e) => {
                return ToolOutcome::failure(ToolErrorKind::MalformedResponse(format!(
                    "unparseable search payload: {}",
                    e
                )));
            }
        };

        let results = data
            .get("web")
            .and_then(|w| w.get("results"))
            .and_then(|r| r.as_array())
            .cloned()
            .unwrap_or_default();

        if results.is_empty() {
            return ToolOutcome::success(format!("No results for: {}", query));
        }

        let mut lines = vec![format!("Results for: {}\n", query)];
        for (i, item) in results.iter().take(count as usize).enumerate() {
            let title = item.get("title").and_then(|v| v.as_str()).unwrap_or("");
            let url = item.get("url").and_then(|v| v.as_str()).unwrap_or("");
            lines.push(format!("{}. {}\n   {}", i + 1, title, url));

            if let Some(desc) = item.get("description").and_then(|v| v.as_str()) {
                lines.push(format!("   {}", desc));
            }
        }
        ToolOutcome::success(lines.join("\n"))
    }
}

// ---------------------------------------------------------------------------
// PageFetchTool
// ---------------------------------------------------------------------------

/// Fetch a URL and extract readable text.
pub struct PageFetchTool {
    max_chars: usize,
    client: Client,
}

impl PageFetchTool {
    pub fn new(timeout: Duration) -> Self {
        let client = Client::builder()
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            max_chars: DEFAULT_MAX_CHARS,
            client,
        }
    }

    /// Fetch and extract after the URL has passed validation.
    async fn fetch_and_extract(&self, url: &str, max_chars: usize) -> ToolOutcome {
        let response = match self.client.get(url).send().await {
            Ok(r) => r,
            Err(e) => {
                return ToolOutcome::failure(ToolErrorKind::UpstreamUnavailable(format!(
                    "fetch failed: {}",
                    e
                )));
            }
        };

        let status = response.status();
        let final_url = response.url().to_string();
        if !status.is_success() {
            return ToolOutcome::failure(ToolErrorKind::UpstreamUnavailable(format!(
                "server returned HTTP {}",
                status
            )));
        }

        // Reject declared-oversized responses before buffering anything.
        if let Some(len) = response.content_length() {
            if len as usize > MAX_BODY_BYTES {
                return ToolOutcome::failure(ToolErrorKind::ExecutionFailed(format!(
                    "response too large ({:.1} MB, limit {:.1} MB)",
                    len as f64 / 1e6,
                    MAX_BODY_BYTES as f64 / 1e6
                )));
            }
        }

        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        // Re-check after reading: content-length can be absent or wrong.
        let body = match response.bytes().await {
            Ok(bytes) if bytes.len() > MAX_BODY_BYTES => {
                return ToolOutcome::failure(ToolErrorKind::ExecutionFailed(format!(
                    "response too large ({:.1} MB, limit {:.1} MB)",
                    bytes.len() as f64 / 1e6,
                    MAX_BODY_BYTES as f64 / 1e6
                )));
            }
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) => {
                return ToolOutcome::failure(ToolErrorKind::UpstreamUnavailable(format!(
                    "failed to read response body: {}",
                    e
                )));
            }
        };

        let text = if content_type.contains("application/json") {
            match serde_json::from_str::<serde_json::Value>(&body) {
                Ok(v) => serde_json::to_string_pretty(&v).unwrap_or(body),
                Err(_) => body,
            }
        } else if content_type.contains("text/html")
            || body.trim_start().to_lowercase().starts_with("<!doctype")
            || body.trim_start().to_lowercase().starts_with("<html")
        {
            extract_html_text(&body)
        } else {
            body
        };

        let truncated = text.len() > max_chars;
        let final_text = if truncated {
            // Find a valid char boundary at or before max_chars.
            let mut end = max_chars;
            while !text.is_char_boundary(end) && end > 0 {
                end -= 1;
            }
            text[..end].to_string()
        } else {
            text
        };

        ToolOutcome::success(
            json!({
                "url": url,
                "finalUrl": final_url,
                "status": status.as_u16(),
                "truncated": truncated,
                "text": final_text
            })
            .to_string(),
        )
    }
}

#[async_trait]
impl Tool for PageFetchTool {
    fn name(&self) -> &str {
        "fetch_page"
    }

    fn description(&self) -> &str {
        "Fetch a URL and extract readable text content."
    }

    fn parameters(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "url": {
                    "type": "string",
                    "description": "URL to fetch"
                },
                "maxChars": {
                    "type": "integer",
                    "minimum": 100
                }
            },
            "required": ["url"]
        })
    }

    async fn invoke(&self, args: HashMap<String, serde_json::Value>) -> ToolOutcome {
        let url = match require_str(&args, "url") {
            Ok(u) => u.to_string(),
            Err(kind) => return ToolOutcome::failure(kind),
        };

        let max_chars = args
            .get("maxChars")
            .and_then(|v| v.as_u64())
            .map(|n| n as usize)
            .unwrap_or(self.max_chars);

        if let Err(e) = validate_url(&url) {
            return ToolOutcome::failure(ToolErrorKind::InvalidArguments(e));
        }

        self.fetch_and_extract(&url, max_chars).await
    }
}
