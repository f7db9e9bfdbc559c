//! Firecrawl - web search, scrape and agent extraction
//!
//! One HTTP client covers the three Firecrawl endpoints the pipeline uses:
//! - `POST /v2/search` and `POST /v2/scrape` back the [`WebProvider`] trait
//! - `POST /v2/agent` plus polling backs [`StructuredExtractor`]
//!
//! Response bodies are handed back untouched; see [`crate::adapter`] for
//! normalization.

use crate::error::{Error, Result};
use crate::provider::WebProvider;
use marketscout_llm::{mask_api_key, Extraction, StructuredExtractor};
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

// ============================================================================
// Constants
// ============================================================================

/// Firecrawl API base URL
pub const BASE_URL: &str = "https://api.firecrawl.dev";

/// Default model for agent extraction jobs
pub const DEFAULT_AGENT_MODEL: &str = "spark-1-mini";

/// HTTP timeout for search / scrape requests (seconds)
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Delay between agent status polls (seconds)
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 2;

/// Upper bound on one agent job (seconds)
pub const DEFAULT_AGENT_TIMEOUT_SECS: u64 = 600;

// ============================================================================
// Configuration
// ============================================================================

/// Firecrawl client configuration
#[derive(Clone)]
pub struct FirecrawlConfig {
    /// API key
    pub api_key: String,
    /// Base URL
    pub base_url: String,
    /// Per-request timeout
    pub timeout: Duration,
    /// Agent extraction model
    pub agent_model: String,
    /// Delay between agent status polls
    pub poll_interval: Duration,
    /// Give up on an agent job after this long
    pub agent_timeout: Duration,
}

impl fmt::Debug for FirecrawlConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FirecrawlConfig")
            .field("api_key", &mask_api_key(&self.api_key))
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("agent_model", &self.agent_model)
            .field("poll_interval", &self.poll_interval)
            .field("agent_timeout", &self.agent_timeout)
            .finish()
    }
}

impl FirecrawlConfig {
    /// Create a new configuration
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            agent_model: DEFAULT_AGENT_MODEL.to_string(),
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            agent_timeout: Duration::from_secs(DEFAULT_AGENT_TIMEOUT_SECS),
        }
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("FIRECRAWL_API_KEY")
            .map_err(|_| Error::NotConfigured("FIRECRAWL_API_KEY not set".to_string()))?;
        let mut config = Self::new(api_key);
        if let Ok(url) = std::env::var("FIRECRAWL_BASE_URL") {
            config.base_url = url;
        }
        Ok(config)
    }

    /// Set the base URL
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the per-request timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the agent model
    #[must_use]
    pub fn with_agent_model(mut self, model: impl Into<String>) -> Self {
        self.agent_model = model.into();
        self
    }

    /// Set agent polling cadence and overall deadline
    #[must_use]
    pub fn with_agent_polling(mut self, interval: Duration, deadline: Duration) -> Self {
        self.poll_interval = interval;
        self.agent_timeout = deadline;
        self
    }
}

// ============================================================================
// Request bodies
// ============================================================================

#[derive(Debug, Serialize)]
struct SearchBody<'a> {
    query: &'a str,
    limit: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ScrapeBody<'a> {
    url: &'a str,
    formats: [&'static str; 1],
    only_main_content: bool,
}

#[derive(Debug, Serialize)]
struct AgentBody<'a> {
    prompt: &'a str,
    schema: &'a Value,
    model: &'a str,
}

// ============================================================================
// Client
// ============================================================================

/// Firecrawl HTTP client
pub struct FirecrawlClient {
    client: Client,
    config: FirecrawlConfig,
}

impl FirecrawlClient {
    /// Create a new client
    pub fn new(config: FirecrawlConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Network(e.to_string()))?;
        Ok(Self { client, config })
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(FirecrawlConfig::from_env()?)
    }

    /// Client configuration
    #[must_use]
    pub fn config(&self) -> &FirecrawlConfig {
        &self.config
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/v2/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Value> {
        let response = request
            .bearer_auth(&self.config.api_key)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::Timeout(self.config.timeout.as_millis() as u64)
                } else {
                    Error::Network(e.to_string())
                }
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_str::<Value>(&text)
                .ok()
                .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_string))
                .unwrap_or(text);
            return Err(Error::Api {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str(&text).map_err(|e| Error::InvalidResponse(e.to_string()))
    }

    async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Value> {
        self.send(self.client.post(self.endpoint(path)).json(body))
            .await
    }

    async fn get(&self, path: &str) -> Result<Value> {
        self.send(self.client.get(self.endpoint(path))).await
    }

    /// Start an agent job and poll it to completion
    #[instrument(skip(self, prompt, schema), fields(model = %self.config.agent_model))]
    pub async fn run_agent(&self, prompt: &str, schema: &Value) -> Result<Extraction> {
        let started = self
            .post(
                "agent",
                &AgentBody {
                    prompt,
                    schema,
                    model: &self.config.agent_model,
                },
            )
            .await?;

        // Some deployments answer synchronously.
        if let Some(done) = finished_job(&started)? {
            return Ok(done);
        }

        let job_id = started
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::InvalidResponse("agent response missing job id".to_string()))?
            .to_string();
        info!(job_id = %job_id, "Agent job started");

        let deadline = Instant::now() + self.config.agent_timeout;
        loop {
            if Instant::now() >= deadline {
                warn!(job_id = %job_id, "Agent job timed out");
                return Err(Error::Timeout(self.config.agent_timeout.as_millis() as u64));
            }
            tokio::time::sleep(self.config.poll_interval).await;

            let status = self.get(&format!("agent/{}", job_id)).await?;
            let state = job_state(&status);
            debug!(job_id = %job_id, status = state, "Agent job polled");
            if let Some(done) = finished_job(&status)? {
                return Ok(done);
            }
        }
    }
}

/// Job status string, `unknown` when absent
fn job_state(body: &Value) -> &str {
    body.get("status").and_then(Value::as_str).unwrap_or("unknown")
}

/// `Some` when the job body is terminal and successful, `Err` when terminal
/// and failed, `None` while still running.
fn finished_job(body: &Value) -> Result<Option<Extraction>> {
    let status = body.get("status").and_then(Value::as_str);
    match status {
        Some("completed") => {}
        Some("failed") | Some("cancelled") => {
            let message = body
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("agent job failed");
            return Err(Error::Api {
                status: 200,
                message: message.to_string(),
            });
        }
        _ => return Ok(None),
    }

    let data = body.get("data").cloned().unwrap_or(Value::Null);
    let credits_used = body
        .get("creditsUsed")
        .or_else(|| body.get("credits_used"))
        .and_then(Value::as_u64)
        .unwrap_or(0);
    Ok(Some(Extraction { data, credits_used }))
}

#[async_trait::async_trait]
impl WebProvider for FirecrawlClient {
    fn name(&self) -> &str {
        "firecrawl"
    }

    #[instrument(skip(self), fields(provider = "firecrawl"))]
    async fn search(&self, query: &str, limit: usize) -> Result<Value> {
        self.post("search", &SearchBody { query, limit }).await
    }

    #[instrument(skip(self), fields(provider = "firecrawl"))]
    async fn scrape(&self, url: &str) -> Result<Value> {
        self.post(
            "scrape",
            &ScrapeBody {
                url,
                formats: ["markdown"],
                only_main_content: true,
            },
        )
        .await
    }
}

#[async_trait::async_trait]
impl StructuredExtractor for FirecrawlClient {
    fn name(&self) -> &str {
        "firecrawl-agent"
    }

    async fn extract(&self, prompt: &str, schema: &Value) -> marketscout_llm::Result<Extraction> {
        self.run_agent(prompt, schema).await.map_err(|e| match e {
            Error::NotConfigured(m) => marketscout_llm::Error::NotConfigured(m),
            Error::Timeout(ms) => marketscout_llm::Error::Timeout(ms),
            Error::Network(m) => marketscout_llm::Error::Network(m),
            Error::InvalidResponse(m) => marketscout_llm::Error::InvalidResponse(m),
            Error::Api { status: 429, .. } => marketscout_llm::Error::RateLimit,
            other => marketscout_llm::Error::Extraction(other.to_string()),
        })
    }
}
