//! Scripted LLM provider for tests and dry runs

use crate::completion::{ToolCompletionRequest, ToolCompletionResponse};
use crate::error::{Error, Result};
use crate::provider::LlmProvider;

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// A mock LLM provider that replays queued responses in order.
///
/// Every request is captured so tests can assert on the conversation the
/// agent built. When the queue runs dry the provider answers with a fixed
/// text reply, or with an error if [`MockProvider::failing`] was used.
#[derive(Clone)]
pub struct MockProvider {
    responses: Arc<Mutex<VecDeque<Result<ToolCompletionResponse>>>>,
    requests: Arc<Mutex<Vec<ToolCompletionRequest>>>,
    fail_when_empty: bool,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockProvider {
    /// Create a new mock provider.
    #[must_use]
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(VecDeque::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
            fail_when_empty: false,
        }
    }

    /// Create a provider whose every call fails with an API error.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail_when_empty: true,
            ..Self::new()
        }
    }

    /// Add a response to the queue.
    pub fn add_tool_response(&self, response: ToolCompletionResponse) {
        self.responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(Ok(response));
    }

    /// Queue an error for the next call.
    pub fn add_error(&self, error: Error) {
        self.responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(Err(error));
    }

    /// Number of requests received so far.
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Snapshot of every request received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<ToolCompletionRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait::async_trait]
impl LlmProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn default_model(&self) -> &str {
        "mock-model"
    }

    async fn complete_with_tools(
        &self,
        request: ToolCompletionRequest,
    ) -> Result<ToolCompletionResponse> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request);

        let next = self
            .responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();
        match next {
            Some(resp) => resp,
            None if self.fail_when_empty => Err(Error::Api("mock provider failure".to_string())),
            None => Ok(ToolCompletionResponse::text("mock response")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_replays_in_order() {
        let mock = MockProvider::new();
        mock.add_tool_response(ToolCompletionResponse::text("first"));
        mock.add_error(Error::RateLimit);

        let first = mock
            .complete_with_tools(ToolCompletionRequest::new("m"))
            .await
            .unwrap();
        assert_eq!(first.content.as_deref(), Some("first"));

        let second = mock.complete_with_tools(ToolCompletionRequest::new("m")).await;
        assert!(matches!(second, Err(Error::RateLimit)));

        let fallback = mock
            .complete_with_tools(ToolCompletionRequest::new("m"))
            .await
            .unwrap();
        assert_eq!(fallback.content.as_deref(), Some("mock response"));
        assert_eq!(mock.request_count(), 3);
    }

    #[tokio::test]
    async fn test_failing_mock() {
        let mock = MockProvider::failing();
        let result = mock.complete_with_tools(ToolCompletionRequest::new("m")).await;
        assert!(matches!(result, Err(Error::Api(_))));
    }
}
