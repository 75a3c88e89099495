//! Offline instruction template
//!
//! Deterministic output used when no model is configured, so the whole
//! create/save flow works without network access.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{answered_text, FormData, FormField};

use super::{bullet_lines, InstructionGenerator};

/// Keys rendered in their own sections rather than as extra bullets
const SECTION_KEYS: &[&str] = &["name", "description", "tone", "targetAudience", "specialty"];

/// Fixed-text generator used when no API key is configured
#[derive(Debug, Default, Clone)]
pub struct OfflineGenerator;

impl OfflineGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Render the template for `industry` and `form_data`
    pub fn render(industry: &str, form_data: &FormData) -> String {
        let role = answered_text(form_data, "description").unwrap_or_else(|| {
            format!("You help users with {}-related questions and tasks.", industry)
        });
        let tone = answered_text(form_data, "tone")
            .unwrap_or_else(|| "Professional and helpful".to_string());
        let audience = answered_text(form_data, "targetAudience")
            .unwrap_or_else(|| "General users".to_string());
        let specialty =
            answered_text(form_data, "specialty").unwrap_or_else(|| industry.to_string());

        let extra = bullet_lines(
            form_data
                .iter()
                .filter(|(key, _)| !SECTION_KEYS.contains(&key.as_str())),
        );

        format!(
            "You are an AI assistant specialized in the {industry} industry.\n\
             \n\
             ## Role\n\
             {role}\n\
             \n\
             ## Communication Style\n\
             - Tone: {tone}\n\
             - Target Audience: {audience}\n\
             \n\
             ## Expertise\n\
             - Specialty: {specialty}\n\
             {extra}\n\
             \n\
             ## Guidelines\n\
             1. Always be helpful and informative\n\
             2. Stay within your area of expertise\n\
             3. Ask clarifying questions when needed\n\
             4. Provide actionable advice when possible\n\
             \n\
             Note: Connect your Anthropic API key to generate more detailed, customized instructions."
        )
    }

    /// The two fixed follow-up questions for `industry`
    pub fn questions(industry: &str) -> Vec<FormField> {
        vec![
            FormField::textarea(
                format!("{}-additional-1", industry),
                "What topics should this persona avoid discussing?",
            )
            .with_placeholder("e.g., Competitor products, pricing negotiations")
            .ai_generated(),
            FormField::toggle(
                format!("{}-additional-2", industry),
                "Should the persona proactively suggest related services?",
            )
            .ai_generated(),
        ]
    }
}

#[async_trait]
impl InstructionGenerator for OfflineGenerator {
    fn name(&self) -> &'static str {
        "offline"
    }

    fn is_configured(&self) -> bool {
        false
    }

    async fn generate_instructions(&self, industry: &str, form_data: &FormData) -> Result<String> {
        Ok(Self::render(industry, form_data))
    }

    async fn generate_follow_up_questions(
        &self,
        industry: &str,
        _form_data: &FormData,
    ) -> Result<Vec<FormField>> {
        Ok(Self::questions(industry))
    }
}
