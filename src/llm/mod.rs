//! LLM client layer - OpenRouter chat-completions integration
//!
//! This module provides:
//! - Message types for LLM communication
//! - LlmClient trait for API abstraction
//! - OpenRouterClient implementation
//! - MockLlmClient for tests and offline runs

pub mod client;
pub mod openrouter;
pub mod types;

pub use client::{LlmClient, LlmError, MockLlmClient};
pub use openrouter::{OPENROUTER_API_KEY_ENV, OPENROUTER_BASE_URL, OpenRouterClient, OpenRouterConfig};
pub use types::{CompletionRequest, CompletionResponse, Message, Role, StopReason, Usage};
