//! In-memory web provider for tests and dry runs

use crate::error::{Error, Result};
use crate::provider::WebProvider;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct MockState {
    search_bodies: HashMap<String, Value>,
    scrape_bodies: HashMap<String, Value>,
    failing: bool,
    searches: Vec<String>,
    scrapes: Vec<String>,
}

/// A web provider answering from canned bodies.
///
/// Unscripted searches return two generic hits with `creditsUsed: 2`;
/// unscripted scrapes return a short markdown page.
#[derive(Clone, Default)]
pub struct MockWebProvider {
    state: Arc<Mutex<MockState>>,
    latency: Duration,
}

impl MockWebProvider {
    /// Create a provider with default canned answers
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a provider whose every call errors
    #[must_use]
    pub fn failing() -> Self {
        let provider = Self::new();
        provider.lock().failing = true;
        provider
    }

    /// Sleep this long inside every call
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Answer `query` with `body`
    pub fn set_search(&self, query: impl Into<String>, body: Value) {
        self.lock().search_bodies.insert(query.into(), body);
    }

    /// Answer scrapes of `url` with `body`
    pub fn set_scrape(&self, url: impl Into<String>, body: Value) {
        self.lock().scrape_bodies.insert(url.into(), body);
    }

    /// Queries that reached the provider, in call order
    #[must_use]
    pub fn searched(&self) -> Vec<String> {
        self.lock().searches.clone()
    }

    /// URLs that reached the provider, in call order
    #[must_use]
    pub fn scraped(&self) -> Vec<String> {
        self.lock().scrapes.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait::async_trait]
impl WebProvider for MockWebProvider {
    fn name(&self) -> &str {
        "mock-web"
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Value> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let mut state = self.lock();
        state.searches.push(query.to_string());
        if state.failing {
            return Err(Error::Network("mock network failure".to_string()));
        }
        if let Some(body) = state.search_bodies.get(query) {
            return Ok(body.clone());
        }
        let hits: Vec<Value> = (1..=limit.min(2))
            .map(|i| {
                serde_json::json!({
                    "url": format!("https://example.com/{}", i),
                    "title": format!("Result {} for {}", i, query),
                    "description": "Canned search result"
                })
            })
            .collect();
        Ok(serde_json::json!({"success": true, "data": {"web": hits}, "creditsUsed": 2}))
    }

    async fn scrape(&self, url: &str) -> Result<Value> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let mut state = self.lock();
        state.scrapes.push(url.to_string());
        if state.failing {
            return Err(Error::Network("mock network failure".to_string()));
        }
        if let Some(body) = state.scrape_bodies.get(url) {
            return Ok(body.clone());
        }
        Ok(serde_json::json!({
            "success": true,
            "data": {"markdown": format!("# Page at {}\n\nCanned content.", url)}
        }))
    }
}
