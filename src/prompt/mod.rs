//! Prompt System - Template rendering
//!
//! Role prompts are Handlebars templates compiled into the binary and
//! rendered with typed context structs.

mod render;
pub mod templates;

pub use render::PromptRenderer;
pub use templates::{AnalysisPromptContext, DecisionPromptContext, DesignPromptContext};
