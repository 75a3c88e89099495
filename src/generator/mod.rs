//! Instruction generator adapter
//!
//! Turns an industry name plus collected form answers into system instructions
//! and follow-up questions. Two implementations sit behind one trait: the
//! Anthropic Messages API client and a deterministic offline template used
//! whenever no API key is configured.

mod anthropic;
mod template;

pub use anthropic::{AnthropicConfig, AnthropicGenerator};
pub use template::OfflineGenerator;

use async_trait::async_trait;
use tracing::info;

use crate::error::Result;
use crate::types::{display_value, FormData, FormField};

// ─────────────────────────────────────────────────────────────────
// Generator Trait
// ─────────────────────────────────────────────────────────────────

/// Source of persona instructions and follow-up questions
#[async_trait]
pub trait InstructionGenerator: Send + Sync {
    /// Short name used in logs and CLI output
    fn name(&self) -> &'static str;

    /// Whether this generator talks to a real model
    fn is_configured(&self) -> bool;

    /// Draft system instructions for the given industry and answers
    async fn generate_instructions(&self, industry: &str, form_data: &FormData) -> Result<String>;

    /// Suggest extra questions not already covered by the answers.
    ///
    /// Every returned field is tagged `ai_generated`.
    async fn generate_follow_up_questions(
        &self,
        industry: &str,
        form_data: &FormData,
    ) -> Result<Vec<FormField>>;
}

// ─────────────────────────────────────────────────────────────────
// Configuration & Factory
// ─────────────────────────────────────────────────────────────────

/// Which generator to build
#[derive(Debug, Clone)]
pub enum GeneratorConfig {
    /// No API key: use the offline template
    Unconfigured,
    Anthropic(AnthropicConfig),
}

impl GeneratorConfig {
    pub fn is_configured(&self) -> bool {
        matches!(self, GeneratorConfig::Anthropic(_))
    }
}

/// Build the generator selected by `config`
pub fn create_generator(config: GeneratorConfig) -> Result<Box<dyn InstructionGenerator>> {
    match config {
        GeneratorConfig::Unconfigured => {
            info!("No API key configured, using offline instruction template");
            Ok(Box::new(OfflineGenerator::new()))
        }
        GeneratorConfig::Anthropic(cfg) => Ok(Box::new(AnthropicGenerator::new(cfg)?)),
    }
}

// ─────────────────────────────────────────────────────────────────
// Shared helpers
// ─────────────────────────────────────────────────────────────────

/// `- key: value` lines for every answer, in form order
pub(crate) fn bullet_lines<'a>(entries: impl Iterator<Item = (&'a String, &'a serde_json::Value)>) -> String {
    entries
        .map(|(key, value)| format!("- {}: {}", key, display_value(value)))
        .collect::<Vec<_>>()
        .join("\n")
}
