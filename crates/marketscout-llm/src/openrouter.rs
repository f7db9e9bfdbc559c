//! OpenRouter - OpenAI-compatible chat gateway
//!
//! The research agent talks to its reasoning model through this provider.
//! Any OpenAI-compatible `/chat/completions` endpoint works by overriding
//! the base URL.

use crate::completion::{TokenUsage, ToolCompletionRequest, ToolCompletionResponse};
use crate::error::{Error, Result};
use crate::message::{Message, MessageRole};
use crate::provider::LlmProvider;
use crate::tools::{ToolCall, ToolChoice, ToolDefinition};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::{debug, instrument};

// ============================================================================
// Constants
// ============================================================================

/// OpenRouter API base URL
pub const BASE_URL: &str = "https://openrouter.ai/api/v1";

/// Default reasoning model
pub const DEFAULT_MODEL: &str = "openai/gpt-4o-mini";

/// Default request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

// ============================================================================
// Security Utilities
// ============================================================================

/// Sanitize API error messages
fn sanitize_api_error(error: &str) -> String {
    let lower = error.to_lowercase();

    if lower.contains("api key")
        || lower.contains("apikey")
        || lower.contains("invalid key")
        || lower.contains("unauthorized")
        || lower.contains("authentication")
    {
        return "API authentication error. Please check your API key configuration.".to_string();
    }

    if error.len() < 200 {
        return error.to_string();
    }

    "An API error occurred. Please try again.".to_string()
}

/// Mask a secret for safe display
#[must_use]
pub fn mask_api_key(key: &str) -> String {
    if key.len() <= 8 || !key.is_ascii() {
        return "****".to_string();
    }
    format!("{}...{}", &key[..4], &key[key.len() - 4..])
}

// ============================================================================
// Configuration
// ============================================================================

/// OpenRouter provider configuration
#[derive(Clone)]
pub struct OpenRouterConfig {
    /// API key
    pub api_key: String,
    /// Base URL
    pub base_url: String,
    /// Default model
    pub default_model: String,
    /// Request timeout
    pub timeout: Duration,
    /// App name (sent as `X-Title`)
    pub app_name: Option<String>,
}

impl fmt::Debug for OpenRouterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenRouterConfig")
            .field("api_key", &mask_api_key(&self.api_key))
            .field("base_url", &self.base_url)
            .field("default_model", &self.default_model)
            .field("timeout", &self.timeout)
            .field("app_name", &self.app_name)
            .finish()
    }
}

impl OpenRouterConfig {
    /// Create a new configuration
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: BASE_URL.to_string(),
            default_model: DEFAULT_MODEL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            app_name: Some("Marketscout".to_string()),
        }
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENROUTER_API_KEY")
            .map_err(|_| Error::NotConfigured("OPENROUTER_API_KEY not set".to_string()))?;

        let mut config = Self::new(api_key);
        if let Ok(url) = std::env::var("OPENROUTER_BASE_URL") {
            config.base_url = url;
        }
        if let Ok(model) = std::env::var("OPENROUTER_MODEL") {
            config.default_model = model;
        }
        Ok(config)
    }

    /// Set the base URL
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the default model
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    /// Set the timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

// ============================================================================
// API Types (OpenAI compatible)
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ChatTool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<serde_json::Value>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ChatToolCall>>,
}

#[derive(Debug, Serialize)]
struct ChatTool {
    r#type: &'static str,
    function: ChatFunction,
}

#[derive(Debug, Serialize)]
struct ChatFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatToolCall {
    id: String,
    #[serde(default = "function_type")]
    r#type: String,
    function: ChatFunctionCall,
}

fn function_type() -> String {
    "function".to_string()
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatFunctionCall {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: String,
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    #[serde(default)]
    total_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatError {
    error: ChatErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ChatErrorDetail {
    message: String,
}

// ============================================================================
// Provider Implementation
// ============================================================================

/// OpenRouter LLM provider
pub struct OpenRouterProvider {
    client: Client,
    config: OpenRouterConfig,
}

impl OpenRouterProvider {
    /// Create a new OpenRouter provider
    pub fn new(config: OpenRouterConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Network(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(OpenRouterConfig::from_env()?)
    }

    fn convert_message(msg: &Message) -> ChatMessage {
        let tool_calls = (!msg.tool_calls.is_empty()).then(|| {
            msg.tool_calls
                .iter()
                .map(|tc| ChatToolCall {
                    id: tc.id.clone(),
                    r#type: function_type(),
                    function: ChatFunctionCall {
                        name: tc.name.clone(),
                        arguments: tc.arguments.clone(),
                    },
                })
                .collect()
        });

        // Assistant turns that only carry tool calls send `null` content.
        let content = if msg.role == MessageRole::Assistant
            && msg.content.is_empty()
            && tool_calls.is_some()
        {
            None
        } else {
            Some(msg.content.clone())
        };

        ChatMessage {
            role: msg.role.as_str().to_string(),
            content,
            tool_call_id: msg.tool_call_id.clone(),
            tool_calls,
        }
    }

    fn convert_tool(tool: &ToolDefinition) -> ChatTool {
        ChatTool {
            r#type: "function",
            function: ChatFunction {
                name: tool.name.clone(),
                description: tool.description.clone(),
                parameters: tool.parameters.clone(),
            },
        }
    }

    fn convert_tool_choice(choice: &ToolChoice) -> serde_json::Value {
        match choice {
            ToolChoice::Auto => serde_json::json!("auto"),
            ToolChoice::None => serde_json::json!("none"),
            ToolChoice::Required => serde_json::json!("required"),
        }
    }

    async fn request(&self, body: &ChatRequest) -> Result<ChatResponse> {
        let url = format!("{}/chat/completions", self.config.base_url);

        let mut request = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .header("Content-Type", "application/json");

        if let Some(app_name) = &self.config.app_name {
            request = request.header("X-Title", app_name);
        }

        let response = request.json(body).send().await.map_err(|e| {
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

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(Error::RateLimit);
        }
        if !status.is_success() {
            let message = serde_json::from_str::<ChatError>(&text)
                .map(|e| e.error.message)
                .unwrap_or(text);
            return Err(Error::Api(sanitize_api_error(&message)));
        }

        serde_json::from_str(&text).map_err(|e| Error::InvalidResponse(e.to_string()))
    }
}

#[async_trait::async_trait]
impl LlmProvider for OpenRouterProvider {
    fn name(&self) -> &str {
        "openrouter"
    }

    fn default_model(&self) -> &str {
        &self.config.default_model
    }

    #[instrument(skip(self, request), fields(model = %request.model, tools = request.tools.len()))]
    async fn complete_with_tools(
        &self,
        request: ToolCompletionRequest,
    ) -> Result<ToolCompletionResponse> {
        let model = if request.model.is_empty() {
            self.config.default_model.clone()
        } else {
            request.model.clone()
        };

        let body = ChatRequest {
            model,
            messages: request.messages.iter().map(Self::convert_message).collect(),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            tools: request.tools.iter().map(Self::convert_tool).collect(),
            tool_choice: (!request.tools.is_empty())
                .then(|| Self::convert_tool_choice(&request.tool_choice)),
        };

        debug!(messages = body.messages.len(), "Sending tool request to OpenRouter API");

        let response = self.request(&body).await?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| Error::InvalidResponse("No choices in response".to_string()))?;

        let tool_calls: Vec<ToolCall> = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tc| ToolCall {
                id: tc.id,
                name: tc.function.name,
                arguments: tc.function.arguments,
            })
            .collect();

        let usage = response.usage.map(|u| TokenUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: if u.total_tokens == 0 {
                u.prompt_tokens + u.completion_tokens
            } else {
                u.total_tokens
            },
        });

        Ok(ToolCompletionResponse {
            content: choice.message.content.filter(|c| !c.is_empty()),
            tool_calls,
            usage,
            finish_reason: choice.finish_reason,
            model: response.model,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
