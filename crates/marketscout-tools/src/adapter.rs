//! Tool adapter - provider calls folded into [`ToolCallResult`]
//!
//! [`ToolAdapter::search`] and [`ToolAdapter::scrape`] never return an
//! error. Provider faults, `success: false` bodies, empty or malformed
//! responses all become a successful zero-credit envelope with a note, so
//! the reasoning loop can keep going.
//!
//! Provider response shapes are normalized here and only here.

use crate::envelope::{SearchHit, ToolCallResult, ToolKind};
use crate::error::{Error, Result};
use crate::loop_guard::{GuardVerdict, LoopGuard};
use crate::provider::WebProvider;
use marketscout_llm::{ToolCall, ToolDefinition};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use url::Url;

// ============================================================================
// Constants
// ============================================================================

/// Tool name exposed to the model for web search
pub const SEARCH_TOOL: &str = "firecrawl_search";

/// Tool name exposed to the model for page scraping
pub const SCRAPE_TOOL: &str = "firecrawl_scrape";

/// Hard cap on requested search results
pub const MAX_SEARCH_RESULTS: usize = 20;

/// Results requested when the model does not say
pub const DEFAULT_SEARCH_LIMIT: usize = 10;

/// Scraped markdown longer than this is truncated
pub const SCRAPE_CHAR_LIMIT: usize = 5000;

/// Appended to truncated scrape content
pub const TRUNCATION_MARKER: &str = "\n\n[Content truncated for length...]";

/// Credits assumed for a successful search when the provider omits the count
pub const DEFAULT_SEARCH_CREDITS: u64 = 2;

/// Credits assumed for a successful scrape when the provider omits the count
pub const DEFAULT_SCRAPE_CREDITS: u64 = 1;

// ============================================================================
// Configuration
// ============================================================================

/// Adapter limits
#[derive(Debug, Clone)]
pub struct AdapterConfig {
    /// Cap on requested search results
    pub max_search_results: usize,
    /// Scrape truncation threshold in characters
    pub scrape_char_limit: usize,
    /// Fallback credits for a search
    pub default_search_credits: u64,
    /// Fallback credits for a scrape
    pub default_scrape_credits: u64,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            max_search_results: MAX_SEARCH_RESULTS,
            scrape_char_limit: SCRAPE_CHAR_LIMIT,
            default_search_credits: DEFAULT_SEARCH_CREDITS,
            default_scrape_credits: DEFAULT_SCRAPE_CREDITS,
        }
    }
}

// ============================================================================
// Tool requests
// ============================================================================

#[derive(Debug, Deserialize)]
struct SearchArgs {
    query: String,
    #[serde(default)]
    limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct ScrapeArgs {
    url: String,
}

/// A parsed tool call from the model
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolRequest {
    /// `firecrawl_search`
    Search {
        /// Query string, passed through verbatim
        query: String,
        /// Requested result count
        limit: usize,
    },
    /// `firecrawl_scrape`
    Scrape {
        /// Page URL
        url: String,
    },
}

impl ToolRequest {
    /// Parse a model tool call into a request
    pub fn from_call(call: &ToolCall) -> Result<Self> {
        match call.name.as_str() {
            SEARCH_TOOL => {
                let args: SearchArgs = parse_args(&call.arguments)?;
                Ok(Self::Search {
                    query: args.query,
                    limit: args.limit.unwrap_or(DEFAULT_SEARCH_LIMIT),
                })
            }
            SCRAPE_TOOL => {
                let args: ScrapeArgs = parse_args(&call.arguments)?;
                Ok(Self::Scrape { url: args.url })
            }
            other => Err(Error::InvalidInput(format!("unknown tool '{}'", other))),
        }
    }

    /// Which tool this request targets
    #[must_use]
    pub fn kind(&self) -> ToolKind {
        match self {
            Self::Search { .. } => ToolKind::Search,
            Self::Scrape { .. } => ToolKind::Scrape,
        }
    }
}

fn parse_args<T: serde::de::DeserializeOwned>(raw: &str) -> Result<T> {
    let raw = if raw.trim().is_empty() { "{}" } else { raw };
    serde_json::from_str(raw).map_err(|e| Error::InvalidInput(format!("bad arguments: {}", e)))
}

/// Tool definitions advertised to the model
#[must_use]
pub fn tool_definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition::new(
            SEARCH_TOOL,
            "Search the web. Returns URLs, titles and descriptions. Use this to find \
             sources for population counts, prevalence, competitor pricing and similar \
             market data. Costs about 2 credits per call.",
            serde_json::json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Search query, e.g. 'number of dental practices United States 2025'"
                    },
                    "limit": {
                        "type": "integer",
                        "description": "Number of results (1-20, default 10)"
                    }
                },
                "required": ["query"]
            }),
        ),
        ToolDefinition::new(
            SCRAPE_TOOL,
            "Fetch the full content of one URL as markdown. Use after search to read \
             a promising source. Long pages are truncated. Costs 1 credit per page.",
            serde_json::json!({
                "type": "object",
                "properties": {
                    "url": {
                        "type": "string",
                        "description": "Exact URL to scrape"
                    }
                },
                "required": ["url"]
            }),
        ),
    ]
}

// ============================================================================
// Adapter
// ============================================================================

/// Non-failing wrapper around a [`WebProvider`]
#[derive(Clone)]
pub struct ToolAdapter {
    provider: Arc<dyn WebProvider>,
    config: AdapterConfig,
}

impl ToolAdapter {
    /// Wrap a provider with default limits
    #[must_use]
    pub fn new(provider: Arc<dyn WebProvider>) -> Self {
        Self {
            provider,
            config: AdapterConfig::default(),
        }
    }

    /// Override limits
    #[must_use]
    pub fn with_config(mut self, config: AdapterConfig) -> Self {
        self.config = config;
        self
    }

    /// Current limits
    #[must_use]
    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    /// Run a parsed request, routing searches through `guard`
    pub async fn run(&self, guard: &mut LoopGuard, request: &ToolRequest) -> ToolCallResult {
        match request {
            ToolRequest::Search { query, limit } => self.guarded_search(guard, query, *limit).await,
            ToolRequest::Scrape { url } => self.scrape(url).await,
        }
    }

    /// Search unless `guard` flags the query as a loop
    pub async fn guarded_search(
        &self,
        guard: &mut LoopGuard,
        query: &str,
        limit: usize,
    ) -> ToolCallResult {
        match guard.check(query) {
            GuardVerdict::Loop { occurrences } => ToolCallResult::loop_detected(query, occurrences),
            GuardVerdict::Proceed { .. } => self.search(query, limit).await,
        }
    }

    /// Web search. Never fails.
    pub async fn search(&self, query: &str, limit: usize) -> ToolCallResult {
        let start = Instant::now();

        if query.trim().is_empty() {
            return ToolCallResult::empty(
                ToolKind::Search,
                query,
                "Query must not be empty.",
                start.elapsed(),
            );
        }

        let limit = limit.clamp(1, self.config.max_search_results.max(1));
        debug!(query = %query, limit, provider = self.provider.name(), "Searching");

        let body = match self.provider.search(query, limit).await {
            Ok(body) => body,
            Err(e) => {
                warn!(query = %query, error = %e, "Search call failed");
                return ToolCallResult::empty(
                    ToolKind::Search,
                    query,
                    format!("Search failed: {}. Try a different query.", short(&e.to_string())),
                    start.elapsed(),
                );
            }
        };

        if let Some(error) = reported_failure(&body) {
            warn!(query = %query, error = %error, "Search returned an error");
            return ToolCallResult::empty(
                ToolKind::Search,
                query,
                format!("Search failed: {}. Try a different query.", short(&error)),
                start.elapsed(),
            );
        }

        let Some(mut hits) = search_hits(&body) else {
            warn!(query = %query, "Search returned no data");
            return ToolCallResult::empty(
                ToolKind::Search,
                query,
                "No data returned. Try a different approach.",
                start.elapsed(),
            );
        };

        if hits.is_empty() {
            info!(query = %query, "Search found no results");
            return ToolCallResult::empty(
                ToolKind::Search,
                query,
                "No results found. Try different keywords.",
                start.elapsed(),
            );
        }

        hits.truncate(limit);
        let credits = reported_credits(&body).unwrap_or(self.config.default_search_credits);
        info!(query = %query, results = hits.len(), credits, "Search completed");
        ToolCallResult::search(query, hits, credits, start.elapsed())
    }

    /// Page scrape. Never fails.
    pub async fn scrape(&self, url: &str) -> ToolCallResult {
        let start = Instant::now();

        if let Err(e) = validate_url(url) {
            warn!(url = %url, error = %e, "Rejected scrape URL");
            return ToolCallResult::empty(
                ToolKind::Scrape,
                url,
                format!("Cannot scrape this URL: {}", e),
                start.elapsed(),
            );
        }

        let body = match self.provider.scrape(url).await {
            Ok(body) => body,
            Err(e) => {
                warn!(url = %url, error = %e, "Scrape call failed");
                return ToolCallResult::empty(
                    ToolKind::Scrape,
                    url,
                    format!("Scrape failed: {}. Try another source.", short(&e.to_string())),
                    start.elapsed(),
                );
            }
        };

        if let Some(error) = reported_failure(&body) {
            warn!(url = %url, error = %error, "Scrape returned an error");
            return ToolCallResult::empty(
                ToolKind::Scrape,
                url,
                format!("Scrape failed: {}. Try another source.", short(&error)),
                start.elapsed(),
            );
        }

        let markdown = scraped_markdown(&body).unwrap_or_default();
        if markdown.trim().is_empty() {
            info!(url = %url, "Scrape returned no content");
            return ToolCallResult::empty(
                ToolKind::Scrape,
                url,
                "Page returned no content. Try another source.",
                start.elapsed(),
            );
        }

        let (content, full_length) = truncate_content(markdown, self.config.scrape_char_limit);
        let credits = reported_credits(&body).unwrap_or(self.config.default_scrape_credits);
        info!(url = %url, chars = full_length, credits, "Scrape completed");
        ToolCallResult::scrape(url, content, full_length, credits, start.elapsed())
    }
}

// ============================================================================
// Private helpers
// ============================================================================

fn validate_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw).map_err(|e| Error::InvalidInput(format!("invalid URL: {}", e)))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(Error::PermissionDenied(format!(
            "URL scheme '{}' is not allowed",
            scheme
        ))),
    }
}

/// Error text when the body says `success: false`
fn reported_failure(body: &Value) -> Option<String> {
    if body.get("success").and_then(Value::as_bool) == Some(false) {
        let message = body
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("Unknown error");
        return Some(message.to_string());
    }
    None
}

/// Hit list from `data.web[]`, `data[]`, `web[]` or `results[]`.
/// `None` means the body carried no hit list at all.
fn search_hits(body: &Value) -> Option<Vec<SearchHit>> {
    let list = body
        .pointer("/data/web")
        .filter(|v| v.is_array())
        .or_else(|| body.get("data").filter(|v| v.is_array()))
        .or_else(|| body.get("web").filter(|v| v.is_array()))
        .or_else(|| body.get("results").filter(|v| v.is_array()))?;

    let hits = list
        .as_array()?
        .iter()
        .filter_map(|item| {
            let url = item.get("url").and_then(Value::as_str)?;
            let text = |key: &str| {
                item.get(key)
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string()
            };
            Some(SearchHit {
                url: url.to_string(),
                title: text("title"),
                description: text("description"),
            })
        })
        .collect();
    Some(hits)
}

fn reported_credits(body: &Value) -> Option<u64> {
    ["/creditsUsed", "/credits_used", "/data/creditsUsed", "/data/metadata/creditsUsed"]
        .iter()
        .find_map(|ptr| body.pointer(ptr))
        .and_then(|v| v.as_u64().or_else(|| v.as_f64().map(|f| f.max(0.0).round() as u64)))
}

fn scraped_markdown(body: &Value) -> Option<String> {
    body.pointer("/data/markdown")
        .or_else(|| body.get("markdown"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Cut `content` to `limit` characters, appending the marker when cut.
/// Returns the possibly-truncated text and the original character count.
fn truncate_content(content: String, limit: usize) -> (String, usize) {
    let full_length = content.chars().count();
    if full_length <= limit {
        return (content, full_length);
    }
    let cut = content
        .char_indices()
        .nth(limit)
        .map_or(content.len(), |(idx, _)| idx);
    let mut truncated = content[..cut].to_string();
    truncated.push_str(TRUNCATION_MARKER);
    (truncated, full_length)
}

fn short(message: &str) -> String {
    const MAX: usize = 120;
    if message.chars().count() <= MAX {
        message.to_string()
    } else {
        let head: String = message.chars().take(MAX).collect();
        format!("{}...", head)
    }
}

#[cfg(test)]
mod tests;
