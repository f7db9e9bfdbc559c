//! Uniform tool call result
//!
//! Search and scrape calls never surface an error to the reasoning loop.
//! Failures are folded into a successful [`ToolCallResult`] with zero
//! credits and a `note` the model can read and react to.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Which tool produced a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    /// Web search
    Search,
    /// Page scrape
    Scrape,
}

impl ToolKind {
    /// Name used in ledger operation keys
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Search => "search",
            Self::Scrape => "scrape",
        }
    }

    fn target_key(&self) -> &'static str {
        match self {
            Self::Search => "query",
            Self::Scrape => "url",
        }
    }
}

/// One search hit
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Result URL
    pub url: String,
    /// Page title
    #[serde(default)]
    pub title: String,
    /// Snippet / description
    #[serde(default)]
    pub description: String,
}

/// Tool-specific payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ToolPayload {
    /// Search hits
    Search {
        /// Hits in provider order
        results: Vec<SearchHit>,
    },
    /// Scraped page
    Scrape {
        /// Markdown, possibly truncated
        content: String,
        /// Character count before truncation
        full_length: usize,
    },
    /// Nothing usable came back
    Empty,
}

/// Result envelope for every search / scrape call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallResult {
    /// Always true; failures are expressed through `note`
    pub success: bool,
    /// Tool that produced this result
    pub tool: ToolKind,
    /// Query or URL
    pub target: String,
    /// Number of hits (search) or 1/0 (scrape)
    pub result_count: usize,
    /// Credits charged
    pub credits_used: u64,
    /// Elapsed time in seconds
    pub duration_seconds: f64,
    /// Explanation when the call produced nothing useful
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// Tool output
    pub payload: ToolPayload,
}

impl ToolCallResult {
    /// Successful search
    #[must_use]
    pub fn search(query: &str, results: Vec<SearchHit>, credits: u64, elapsed: Duration) -> Self {
        Self {
            success: true,
            tool: ToolKind::Search,
            target: query.to_string(),
            result_count: results.len(),
            credits_used: credits,
            duration_seconds: elapsed.as_secs_f64(),
            note: None,
            payload: ToolPayload::Search { results },
        }
    }

    /// Successful scrape
    #[must_use]
    pub fn scrape(
        url: &str,
        content: String,
        full_length: usize,
        credits: u64,
        elapsed: Duration,
    ) -> Self {
        Self {
            success: true,
            tool: ToolKind::Scrape,
            target: url.to_string(),
            result_count: 1,
            credits_used: credits,
            duration_seconds: elapsed.as_secs_f64(),
            note: None,
            payload: ToolPayload::Scrape {
                content,
                full_length,
            },
        }
    }

    /// Zero-credit result carrying only a note
    #[must_use]
    pub fn empty(tool: ToolKind, target: &str, note: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            success: true,
            tool,
            target: target.to_string(),
            result_count: 0,
            credits_used: 0,
            duration_seconds: elapsed.as_secs_f64(),
            note: Some(note.into()),
            payload: ToolPayload::Empty,
        }
    }

    /// Synthetic result for a query short-circuited by the loop guard
    #[must_use]
    pub fn loop_detected(query: &str, occurrences: usize) -> Self {
        Self::empty(
            ToolKind::Search,
            query,
            format!(
                "Query repeated {} times. Try different keywords or estimate from what you have.",
                occurrences
            ),
            Duration::ZERO,
        )
    }

    /// True when the call produced nothing usable
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self.payload, ToolPayload::Empty)
    }

    /// JSON handed back to the model as the tool observation
    #[must_use]
    pub fn to_observation(&self) -> serde_json::Value {
        let mut obs = serde_json::json!({
            "success": self.success,
            "credits_used": self.credits_used,
        });
        obs[self.tool.target_key()] = serde_json::json!(self.target);
        match &self.payload {
            ToolPayload::Search { results } => {
                obs["results_count"] = serde_json::json!(results.len());
                obs["results"] = serde_json::json!(results);
            }
            ToolPayload::Scrape {
                content,
                full_length,
            } => {
                obs["content"] = serde_json::json!(content);
                obs["full_length"] = serde_json::json!(full_length);
            }
            ToolPayload::Empty => match self.tool {
                ToolKind::Search => {
                    obs["results_count"] = serde_json::json!(0);
                    obs["results"] = serde_json::json!([]);
                }
                ToolKind::Scrape => {
                    obs["content"] = serde_json::json!("");
                    obs["full_length"] = serde_json::json!(0);
                }
            },
        }
        if let Some(note) = &self.note {
            obs["note"] = serde_json::json!(note);
        }
        obs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loop_detected_is_free_and_successful() {
        let result = ToolCallResult::loop_detected("dentists in Texas", 3);
        assert!(result.success);
        assert_eq!(result.credits_used, 0);
        assert_eq!(result.result_count, 0);
        assert!(result.is_empty());
        assert!(result.note.as_deref().unwrap().contains("3 times"));
    }

    #[test]
    fn test_search_observation_shape() {
        let hits = vec![SearchHit {
            url: "https://example.com".to_string(),
            title: "Example".to_string(),
            description: "An example".to_string(),
        }];
        let result = ToolCallResult::search("q", hits, 2, Duration::from_millis(300));
        let obs = result.to_observation();
        assert_eq!(obs["query"], "q");
        assert_eq!(obs["results_count"], 1);
        assert_eq!(obs["results"][0]["url"], "https://example.com");
        assert_eq!(obs["credits_used"], 2);
        assert!(obs.get("note").is_none());
    }

    #[test]
    fn test_empty_scrape_observation_has_note() {
        let result = ToolCallResult::empty(
            ToolKind::Scrape,
            "https://example.com",
            "Scrape failed",
            Duration::ZERO,
        );
        let obs = result.to_observation();
        assert_eq!(obs["url"], "https://example.com");
        assert_eq!(obs["content"], "");
        assert_eq!(obs["note"], "Scrape failed");
        assert_eq!(obs["success"], true);
    }

    #[test]
    fn test_payload_serializes_with_kind_tag() {
        let json = serde_json::to_value(ToolPayload::Empty).unwrap();
        assert_eq!(json["kind"], "empty");
    }
}
