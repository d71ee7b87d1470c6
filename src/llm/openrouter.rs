//! OpenRouter chat-completions client
//!
//! Speaks the OpenAI-compatible `/chat/completions` protocol. The API key is
//! optional at construction time; calls without one fail with
//! `LlmError::MissingApiKey` so callers can degrade to local fallbacks.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};

use crate::error::{AeroforgeError, Result};
use crate::llm::client::{LlmClient, LlmError};
use crate::llm::types::{CompletionRequest, CompletionResponse, Message, Role, StopReason, Usage};

/// Default API base URL
pub const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// Environment variable holding the API key
pub const OPENROUTER_API_KEY_ENV: &str = "OPENROUTER_API_KEY";

const DEFAULT_MODEL: &str = "google/gemini-3-pro-preview";
const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Configuration for one OpenRouter-backed role
#[derive(Debug, Clone)]
pub struct OpenRouterConfig {
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout: Duration,
    pub api_key_env: String,
}

impl Default for OpenRouterConfig {
    fn default() -> Self {
        Self {
            base_url: OPENROUTER_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.7,
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout: Duration::from_secs(120),
            api_key_env: OPENROUTER_API_KEY_ENV.to_string(),
        }
    }
}

/// OpenRouter API client
pub struct OpenRouterClient {
    client: Client,
    api_key: Option<String>,
    config: OpenRouterConfig,
}

impl OpenRouterClient {
    /// Create a client with an explicit (possibly absent) API key
    pub fn with_api_key(api_key: Option<String>, config: OpenRouterConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AeroforgeError::Llm(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            config,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    /// Build the request body for the chat-completions API
    fn build_request(&self, request: &CompletionRequest) -> Value {
        let max_tokens = request.max_tokens.unwrap_or(self.config.max_tokens);

        let system = Some(Message::system(&request.system)).filter(|m| !m.content.is_empty());
        let messages: Vec<Value> = system
            .iter()
            .chain(request.messages.iter())
            .map(|m| {
                json!({
                    "role": match m.role {
                        Role::System => "system",
                        Role::User => "user",
                    },
                    "content": m.content
                })
            })
            .collect();

        json!({
            "model": self.config.model,
            "messages": messages,
            "max_tokens": max_tokens,
            "temperature": self.config.temperature
        })
    }

    /// Parse the API response into a CompletionResponse
    fn parse_response(&self, body: Value) -> std::result::Result<CompletionResponse, LlmError> {
        let choice = body["choices"]
            .get(0)
            .ok_or_else(|| LlmError::InvalidResponse("response has no choices".to_string()))?;

        let content = choice["message"]["content"]
            .as_str()
            .ok_or_else(|| LlmError::InvalidResponse("choice has no text content".to_string()))?
            .to_string();

        let stop_reason = StopReason::from_finish_reason(choice["finish_reason"].as_str());

        let usage = match body.get("usage") {
            Some(u) => Usage::new(
                u["prompt_tokens"].as_u64().unwrap_or(0),
                u["completion_tokens"].as_u64().unwrap_or(0),
            ),
            None => Usage::default(),
        };

        log::info!(
            "{}: {} tokens ({} in, {} out)",
            self.config.model,
            usage.total(),
            usage.input_tokens,
            usage.output_tokens
        );
        if stop_reason == StopReason::MaxTokens {
            log::warn!("{}: reply truncated at max_tokens", self.config.model);
        }

        Ok(CompletionResponse {
            content,
            stop_reason,
            usage,
        })
    }

    async fn send_request(&self, api_key: &str, body: Value) -> std::result::Result<Value, LlmError> {
        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(api_key)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout(self.config.timeout)
                } else {
                    LlmError::Network(e)
                }
            })?;

        let status = response.status();

        if status.as_u16() == 429 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|h| h.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(60);
            return Err(LlmError::RateLimited {
                retry_after: Duration::from_secs(retry_after),
            });
        }

        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(LlmError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl LlmClient for OpenRouterClient {
    async fn complete(&self, request: CompletionRequest) -> std::result::Result<CompletionResponse, LlmError> {
        let api_key = self.api_key.as_deref().ok_or_else(|| LlmError::MissingApiKey {
            env_var: self.config.api_key_env.clone(),
        })?;

        let body = self.build_request(&request);
        log::debug!("openrouter request: model={} messages={}", body["model"], request.messages.len());
        let response = self.send_request(api_key, body).await?;
        self.parse_response(response)
    }
}

impl std::fmt::Debug for OpenRouterClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenRouterClient")
            .field("model", &self.config.model)
            .field("base_url", &self.config.base_url)
            .field("has_key", &self.api_key.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> OpenRouterClient {
        OpenRouterClient::with_api_key(Some("test-key".to_string()), OpenRouterConfig::default()).unwrap()
    }

    #[test]
    fn test_config_default() {
        let config = OpenRouterConfig::default();
        assert_eq!(config.base_url, OPENROUTER_BASE_URL);
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.api_key_env, "OPENROUTER_API_KEY");
    }

    #[tokio::test]
    async fn test_complete_without_key_reports_missing_key() {
        let client = OpenRouterClient::with_api_key(None, OpenRouterConfig::default()).unwrap();
        let result = client
            .complete(CompletionRequest::new("system").with_user_message("hi"))
            .await;
        assert!(matches!(result, Err(LlmError::MissingApiKey { .. })));
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let mut config = OpenRouterConfig::default();
        config.base_url = "http://localhost:8080/v1/".to_string();
        let client = OpenRouterClient::with_api_key(None, config).unwrap();
        assert_eq!(client.endpoint(), "http://localhost:8080/v1/chat/completions");
    }

    #[test]
    fn test_build_request_puts_system_first() {
        let body = client().build_request(&CompletionRequest::new("You are helpful").with_user_message("Hello"));

        assert_eq!(body["model"], DEFAULT_MODEL);
        assert_eq!(body["max_tokens"], DEFAULT_MAX_TOKENS);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], "You are helpful");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][1]["content"], "Hello");
    }

    #[test]
    fn test_build_request_uses_role_model() {
        let config = OpenRouterConfig {
            model: "google/gemini-2.0-flash-exp".to_string(),
            temperature: 0.3,
            ..OpenRouterConfig::default()
        };
        let client = OpenRouterClient::with_api_key(Some("test-key".to_string()), config).unwrap();
        let request = CompletionRequest::new("").with_user_message("Hello").with_max_tokens(16);

        let body = client.build_request(&request);
        assert_eq!(body["max_tokens"], 16);
        assert_eq!(body["model"], "google/gemini-2.0-flash-exp");
        assert!((body["temperature"].as_f64().unwrap() - 0.3).abs() < 1e-6);
        // empty system prompt is omitted
        assert_eq!(body["messages"][0]["role"], "user");
    }

    #[test]
    fn test_parse_response_text() {
        let client = client();
        let response = client
            .parse_response(json!({
                "choices": [
                    { "message": { "role": "assistant", "content": "finish" }, "finish_reason": "stop" }
                ],
                "usage": { "prompt_tokens": 12, "completion_tokens": 1 }
            }))
            .unwrap();

        assert_eq!(response.content, "finish");
        assert_eq!(response.stop_reason, StopReason::EndTurn);
        assert_eq!(response.usage.input_tokens, 12);
        assert_eq!(response.usage.total(), 13);
    }

    #[test]
    fn test_parse_response_without_choices() {
        let result = client().parse_response(json!({ "choices": [] }));
        assert!(matches!(result, Err(LlmError::InvalidResponse(_))));
    }

    #[test]
    fn test_parse_response_length_stop() {
        let response = client()
            .parse_response(json!({
                "choices": [ { "message": { "content": "robot" }, "finish_reason": "length" } ]
            }))
            .unwrap();
        assert_eq!(response.stop_reason, StopReason::MaxTokens);
    }
}
