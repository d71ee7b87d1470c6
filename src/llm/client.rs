//! LLM client trait, error type and a scripted mock

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::types::{CompletionRequest, CompletionResponse};

/// Stateless LLM client - each call is independent (fresh context)
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Single completion request (blocking until complete)
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;
}

/// Errors that can occur during LLM operations
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Missing API key: environment variable {env_var} not set")]
    MissingApiKey { env_var: String },
}

/// Scripted client for tests: replays queued replies in order and records
/// every request it receives.
#[derive(Debug, Default)]
pub struct MockLlmClient {
    replies: Mutex<VecDeque<Result<String, LlmError>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl MockLlmClient {
    pub fn new(replies: Vec<Result<String, LlmError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Client that answers every call with the same text
    pub fn with_text(text: impl Into<String>) -> Self {
        Self::new(vec![Ok(text.into())])
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }

        let mut replies = self
            .replies
            .lock()
            .map_err(|_| LlmError::InvalidResponse("mock poisoned".to_string()))?;

        // A final text reply repeats forever; errors are consumed
        let reply = match replies.front() {
            Some(Ok(text)) if replies.len() == 1 => Some(Ok(text.clone())),
            _ => replies.pop_front(),
        };

        match reply {
            Some(Ok(text)) => Ok(CompletionResponse::text(text)),
            Some(Err(e)) => Err(e),
            None => Err(LlmError::InvalidResponse("no scripted reply".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_message_names_delay() {
        let err = LlmError::RateLimited {
            retry_after: Duration::from_secs(60),
        };
        assert!(err.to_string().contains("60s"));
    }

    #[test]
    fn test_missing_api_key_message_names_variable() {
        let err = LlmError::MissingApiKey {
            env_var: "OPENROUTER_API_KEY".to_string(),
        };
        assert!(err.to_string().contains("OPENROUTER_API_KEY"));
    }

    #[tokio::test]
    async fn test_mock_replays_in_order_then_repeats_last() {
        let mock = MockLlmClient::new(vec![Ok("first".to_string()), Ok("second".to_string())]);

        let r1 = mock.complete(CompletionRequest::new("s")).await.unwrap();
        let r2 = mock.complete(CompletionRequest::new("s")).await.unwrap();
        let r3 = mock.complete(CompletionRequest::new("s")).await.unwrap();

        assert_eq!(r1.content, "first");
        assert_eq!(r2.content, "second");
        assert_eq!(r3.content, "second");
        assert_eq!(mock.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_mock_records_requests() {
        let mock = MockLlmClient::with_text("ok");
        mock.complete(CompletionRequest::new("system").with_user_message("hello"))
            .await
            .unwrap();

        let requests = mock.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].last_user_message(), Some("hello"));
    }

    #[tokio::test]
    async fn test_mock_scripted_error() {
        let mock = MockLlmClient::new(vec![Err(LlmError::ApiError {
            status: 503,
            message: "overloaded".to_string(),
        })]);
        let result = mock.complete(CompletionRequest::new("s")).await;
        assert!(matches!(result, Err(LlmError::ApiError { status: 503, .. })));
    }

    #[tokio::test]
    async fn test_mock_without_replies_errors() {
        let mock = MockLlmClient::default();
        let result = mock.complete(CompletionRequest::new("s")).await;
        assert!(matches!(result, Err(LlmError::InvalidResponse(_))));
    }
}
