//! Anthropic Messages API generator
//!
//! One single-turn request per call, no retries. Question output is parsed
//! leniently: anything that is not a JSON array of fields becomes an empty list.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::types::{FormData, FormField};

use super::{bullet_lines, InstructionGenerator};

// ─────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct AnthropicConfig {
    pub api_key: String,

    /// API root without the `/v1/messages` suffix
    pub base_url: String,

    pub model: String,

    /// Value of the `anthropic-version` header
    pub api_version: String,

    pub instructions_max_tokens: u32,

    pub questions_max_tokens: u32,

    pub timeout_secs: u64,
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.anthropic.com".to_string(),
            model: "claude-sonnet-4-20250514".to_string(),
            api_version: "2023-06-01".to_string(),
            instructions_max_tokens: 2000,
            questions_max_tokens: 1000,
            timeout_secs: 120,
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Messages API types (request/response)
// ─────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text { text: String },
    #[serde(other)]
    Other,
}

impl MessagesResponse {
    /// First text segment, if the response has one
    fn first_text(self) -> Option<String> {
        self.content.into_iter().find_map(|block| match block {
            ContentBlock::Text { text } => Some(text),
            ContentBlock::Other => None,
        })
    }
}

// ─────────────────────────────────────────────────────────────────
// Prompts
// ─────────────────────────────────────────────────────────────────

fn instructions_prompt(industry: &str, form_data: &FormData) -> String {
    format!(
        "You are an expert at creating AI persona system instructions. Based on the following information, generate comprehensive system instructions for an AI assistant.\n\
         \n\
         Industry: {industry}\n\
         \n\
         Configuration:\n\
         {config}\n\
         \n\
         Generate detailed system instructions that:\n\
         1. Define the persona's role and expertise\n\
         2. Set the appropriate tone and communication style\n\
         3. Establish boundaries and limitations\n\
         4. Include industry-specific knowledge and best practices\n\
         5. Define how to handle common scenarios\n\
         \n\
         Output ONLY the system instructions, no additional commentary.",
        config = bullet_lines(form_data.iter()),
    )
}

fn questions_prompt(industry: &str, form_data: &FormData) -> String {
    format!(
        "You are helping configure an AI persona for the {industry} industry.\n\
         \n\
         Current configuration:\n\
         {config}\n\
         \n\
         Generate 2-3 additional relevant questions that would help create a more tailored AI persona. These should be questions not already covered by the current configuration.\n\
         \n\
         Respond in JSON format:\n\
         [\n  {{\n    \"id\": \"unique_id\",\n    \"label\": \"Question label\",\n    \"type\": \"text|textarea|select\",\n    \"placeholder\": \"Optional placeholder\",\n    \"options\": [{{\"value\": \"val\", \"label\": \"Label\"}}]\n  }}\n]\n\
         \n\
         Only include \"options\" for select questions. Respond with the JSON array only.",
        config = bullet_lines(form_data.iter()),
    )
}

/// Strip an optional markdown code fence around a JSON payload
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Parse model output into validated, `ai_generated` form fields.
///
/// Malformed output yields an empty list; individual entries that do not
/// decode or fail validation are dropped.
pub(crate) fn parse_questions(text: &str) -> Vec<FormField> {
    let entries: Vec<Value> = match serde_json::from_str(strip_code_fence(text)) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(error = %e, "Question response is not a JSON array, ignoring");
            return Vec::new();
        }
    };

    entries
        .into_iter()
        .filter_map(|entry| match serde_json::from_value::<FormField>(entry) {
            Ok(field) => match field.validate() {
                Ok(()) => Some(field.ai_generated()),
                Err(reason) => {
                    debug!(reason = %reason, "Dropping invalid generated question");
                    None
                }
            },
            Err(e) => {
                debug!(error = %e, "Dropping undecodable generated question");
                None
            }
        })
        .collect()
}

// ─────────────────────────────────────────────────────────────────
// Anthropic Generator
// ─────────────────────────────────────────────────────────────────

/// Generator backed by the Anthropic Messages API
pub struct AnthropicGenerator {
    config: AnthropicConfig,
    client: Client,
}

impl AnthropicGenerator {
    pub fn new(config: AnthropicConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::generator_request(format!("Failed to create HTTP client: {}", e)))?;

        info!(
            base_url = %config.base_url,
            model = %config.model,
            "Anthropic generator created"
        );

        Ok(Self { config, client })
    }

    fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.config.base_url)
    }

    /// Send one user message and return the first text segment (`None` if there is none)
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<Option<String>> {
        let body = MessagesRequest {
            model: &self.config.model,
            max_tokens,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
        };

        debug!(model = %self.config.model, max_tokens, "Sending messages request");

        let response = self
            .client
            .post(self.messages_url())
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", &self.config.api_version)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::generator_request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, "Messages API returned an error");
            return Err(Error::GeneratorStatus {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: MessagesResponse =
            response.json().await.map_err(|e| Error::GeneratorResponse {
                message: e.to_string(),
            })?;

        Ok(parsed.first_text())
    }
}

#[async_trait]
impl InstructionGenerator for AnthropicGenerator {
    fn name(&self) -> &'static str {
        "anthropic"
    }

    fn is_configured(&self) -> bool {
        true
    }

    async fn generate_instructions(&self, industry: &str, form_data: &FormData) -> Result<String> {
        let prompt = instructions_prompt(industry, form_data);
        let text = self
            .complete(&prompt, self.config.instructions_max_tokens)
            .await?;
        Ok(text.unwrap_or_default())
    }

    async fn generate_follow_up_questions(
        &self,
        industry: &str,
        form_data: &FormData,
    ) -> Result<Vec<FormField>> {
        let prompt = questions_prompt(industry, form_data);
        let text = self
            .complete(&prompt, self.config.questions_max_tokens)
            .await?;

        match text {
            Some(text) if !text.trim().is_empty() => Ok(parse_questions(&text)),
            _ => Ok(Vec::new()),
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
