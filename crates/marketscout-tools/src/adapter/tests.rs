//! Tests for the tool adapter

use super::*;
use crate::envelope::ToolPayload;
use crate::mock::MockWebProvider;
use serde_json::json;

fn adapter_with(provider: &MockWebProvider) -> ToolAdapter {
    ToolAdapter::new(Arc::new(provider.clone()))
}

/// Provider that answers with a fixed body and records the limit it saw
struct FixedBody {
    body: Value,
    seen_limit: std::sync::Mutex<Option<usize>>,
}

#[async_trait::async_trait]
impl WebProvider for FixedBody {
    fn name(&self) -> &str {
        "fixed"
    }

    async fn search(&self, _query: &str, limit: usize) -> Result<Value> {
        *self.seen_limit.lock().unwrap() = Some(limit);
        Ok(self.body.clone())
    }

    async fn scrape(&self, _url: &str) -> Result<Value> {
        Ok(self.body.clone())
    }
}

fn fixed(body: Value) -> Arc<FixedBody> {
    Arc::new(FixedBody {
        body,
        seen_limit: std::sync::Mutex::new(None),
    })
}

// ============================================================================
// search
// ============================================================================

#[tokio::test]
async fn test_search_normalizes_data_web_shape() {
    let provider = MockWebProvider::new();
    provider.set_search(
        "dental practices us",
        json!({
            "success": true,
            "data": {"web": [
                {"url": "https://ada.org", "title": "ADA", "description": "Stats"},
                {"url": "https://cdc.gov", "title": "CDC"}
            ]},
            "creditsUsed": 3
        }),
    );

    let result = adapter_with(&provider).search("dental practices us", 10).await;
    assert!(result.success);
    assert_eq!(result.result_count, 2);
    assert_eq!(result.credits_used, 3);
    assert!(result.note.is_none());
    match result.payload {
        ToolPayload::Search { results } => {
            assert_eq!(results[0].url, "https://ada.org");
            assert_eq!(results[1].description, "");
        }
        other => panic!("unexpected payload {:?}", other),
    }
}

#[tokio::test]
async fn test_search_accepts_flat_data_array_and_defaults_credits() {
    let provider = fixed(json!({
        "success": true,
        "data": [{"url": "https://a.com", "title": "A", "description": "a"}]
    }));
    let result = ToolAdapter::new(provider).search("q", 5).await;
    assert_eq!(result.result_count, 1);
    assert_eq!(result.credits_used, DEFAULT_SEARCH_CREDITS);
}

#[tokio::test]
async fn test_search_limit_is_capped_at_twenty() {
    let provider = fixed(json!({"success": true, "data": {"web": []}}));
    let adapter = ToolAdapter::new(provider.clone());
    adapter.search("q", 100).await;
    assert_eq!(*provider.seen_limit.lock().unwrap(), Some(MAX_SEARCH_RESULTS));

    adapter.search("q", 0).await;
    assert_eq!(*provider.seen_limit.lock().unwrap(), Some(1));
}

#[tokio::test]
async fn test_search_truncates_hits_to_limit() {
    let hits: Vec<Value> = (0..30)
        .map(|i| json!({"url": format!("https://x.com/{}", i)}))
        .collect();
    let provider = fixed(json!({"success": true, "data": {"web": hits}}));
    let result = ToolAdapter::new(provider).search("q", 50).await;
    assert_eq!(result.result_count, MAX_SEARCH_RESULTS);
}

#[tokio::test]
async fn test_search_provider_error_is_absorbed() {
    let provider = MockWebProvider::failing();
    let result = adapter_with(&provider).search("anything", 10).await;
    assert!(result.success);
    assert_eq!(result.credits_used, 0);
    assert!(result.is_empty());
    assert!(result.note.as_deref().unwrap().starts_with("Search failed"));
}

#[tokio::test]
async fn test_search_reported_failure_is_absorbed() {
    let provider = fixed(json!({"success": false, "error": "Insufficient credits"}));
    let result = ToolAdapter::new(provider).search("q", 10).await;
    assert!(result.success);
    assert_eq!(result.credits_used, 0);
    assert!(result.note.unwrap().contains("Insufficient credits"));
}

#[tokio::test]
async fn test_search_empty_and_malformed_bodies() {
    let empty = fixed(json!({"success": true, "data": {"web": []}, "creditsUsed": 2}));
    let result = ToolAdapter::new(empty).search("q", 10).await;
    assert!(result.success);
    assert_eq!(result.credits_used, 0);
    assert!(result.note.unwrap().contains("No results"));

    let malformed = fixed(json!("not an object"));
    let result = ToolAdapter::new(malformed).search("q", 10).await;
    assert!(result.success);
    assert_eq!(result.credits_used, 0);
    assert!(result.note.unwrap().contains("No data"));
}

#[tokio::test]
async fn test_blank_query_never_reaches_provider() {
    let provider = MockWebProvider::new();
    let result = adapter_with(&provider).search("   ", 10).await;
    assert!(result.success);
    assert!(result.is_empty());
    assert!(provider.searched().is_empty());
}

// ============================================================================
// scrape
// ============================================================================

#[tokio::test]
async fn test_scrape_short_content_is_verbatim() {
    let provider = MockWebProvider::new();
    provider.set_scrape(
        "https://example.com/a",
        json!({"success": true, "data": {"markdown": "# Title\n\nbody"}}),
    );
    let result = adapter_with(&provider).scrape("https://example.com/a").await;
    assert_eq!(result.credits_used, DEFAULT_SCRAPE_CREDITS);
    assert_eq!(
        result.payload,
        ToolPayload::Scrape {
            content: "# Title\n\nbody".to_string(),
            full_length: 13,
        }
    );
}

#[tokio::test]
async fn test_scrape_exactly_at_limit_is_not_truncated() {
    let page = "a".repeat(SCRAPE_CHAR_LIMIT);
    let provider = fixed(json!({"success": true, "data": {"markdown": page.clone()}}));
    let result = ToolAdapter::new(provider).scrape("https://example.com").await;
    match result.payload {
        ToolPayload::Scrape { content, .. } => assert_eq!(content, page),
        other => panic!("unexpected payload {:?}", other),
    }
}

#[tokio::test]
async fn test_scrape_long_content_is_truncated_with_marker() {
    let page = "é".repeat(SCRAPE_CHAR_LIMIT + 250);
    let provider = fixed(json!({"success": true, "markdown": page, "creditsUsed": 5}));
    let result = ToolAdapter::new(provider).scrape("https://example.com").await;
    assert_eq!(result.credits_used, 5);
    match result.payload {
        ToolPayload::Scrape {
            content,
            full_length,
        } => {
            assert_eq!(full_length, SCRAPE_CHAR_LIMIT + 250);
            assert!(content.ends_with(TRUNCATION_MARKER));
            let body = content.trim_end_matches(TRUNCATION_MARKER);
            assert_eq!(body.chars().count(), SCRAPE_CHAR_LIMIT);
        }
        other => panic!("unexpected payload {:?}", other),
    }
}

#[tokio::test]
async fn test_scrape_rejects_bad_urls_locally() {
    let provider = MockWebProvider::new();
    let adapter = adapter_with(&provider);

    for url in ["not a url", "file:///etc/passwd", "ftp://example.com/x"] {
        let result = adapter.scrape(url).await;
        assert!(result.success);
        assert_eq!(result.credits_used, 0);
        assert!(result.note.is_some());
    }
    assert!(provider.scraped().is_empty());
}

#[tokio::test]
async fn test_scrape_failures_are_absorbed() {
    let provider = MockWebProvider::failing();
    let result = adapter_with(&provider).scrape("https://example.com").await;
    assert!(result.success);
    assert_eq!(result.credits_used, 0);

    let empty = fixed(json!({"success": true, "data": {"markdown": ""}}));
    let result = ToolAdapter::new(empty).scrape("https://example.com").await;
    assert!(result.success);
    assert_eq!(result.credits_used, 0);
    assert!(result.note.unwrap().contains("no content"));
}

// ============================================================================
// loop guard integration
// ============================================================================

#[tokio::test]
async fn test_repeated_query_short_circuits_after_two_calls() {
    let provider = MockWebProvider::new();
    let adapter = adapter_with(&provider);
    let mut guard = LoopGuard::default();

    let mut credits = 0;
    for _ in 0..5 {
        let result = adapter.guarded_search(&mut guard, "X", 10).await;
        assert!(result.success);
        credits += result.credits_used;
    }

    assert_eq!(provider.searched(), vec!["X".to_string(), "X".to_string()]);
    assert_eq!(credits, 4);
    assert_eq!(guard.loop_hits(), 3);
}

// ============================================================================
// tool requests
// ============================================================================

#[test]
fn test_tool_request_parsing() {
    let call = ToolCall {
        id: "1".to_string(),
        name: SEARCH_TOOL.to_string(),
        arguments: r#"{"query": "vets in Ohio"}"#.to_string(),
    };
    assert_eq!(
        ToolRequest::from_call(&call).unwrap(),
        ToolRequest::Search {
            query: "vets in Ohio".to_string(),
            limit: DEFAULT_SEARCH_LIMIT,
        }
    );

    let call = ToolCall {
        id: "2".to_string(),
        name: SCRAPE_TOOL.to_string(),
        arguments: r#"{"url": "https://a.com"}"#.to_string(),
    };
    assert_eq!(
        ToolRequest::from_call(&call).unwrap().kind(),
        ToolKind::Scrape
    );

    let unknown = ToolCall {
        id: "3".to_string(),
        name: "exec".to_string(),
        arguments: "{}".to_string(),
    };
    assert!(matches!(
        ToolRequest::from_call(&unknown),
        Err(Error::InvalidInput(_))
    ));

    let missing = ToolCall {
        id: "4".to_string(),
        name: SEARCH_TOOL.to_string(),
        arguments: String::new(),
    };
    assert!(ToolRequest::from_call(&missing).is_err());
}

#[test]
fn test_tool_definitions_names() {
    let names: Vec<_> = tool_definitions().into_iter().map(|d| d.name).collect();
    assert_eq!(names, vec![SEARCH_TOOL, SCRAPE_TOOL]);
}
