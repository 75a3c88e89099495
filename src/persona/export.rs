//! Markdown export.

use crate::types::{answered_text, display_value, FormData, Persona};

/// Render the markdown document for a form submission and its instructions
pub fn to_markdown(form_data: &FormData, instructions: &str) -> String {
    let title = answered_text(form_data, "name").unwrap_or_else(|| "AI Persona".to_string());
    let description = answered_text(form_data, "description")
        .unwrap_or_else(|| "No description provided".to_string());
    let configuration = form_data
        .iter()
        .filter(|(key, _)| key.as_str() != "name" && key.as_str() != "description")
        .map(|(key, value)| format!("- **{}**: {}", key, display_value(value)))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "# {title}\n\n## Description\n{description}\n\n## System Instructions\n\n```\n{instructions}\n```\n\n## Configuration\n\n{configuration}\n"
    )
}

/// Export of a saved persona, using the version its pointer refers to
pub fn persona_markdown(persona: &Persona) -> String {
    let mut form_data = persona.current_form_data();
    if answered_text(&form_data, "name").is_none() {
        form_data.insert("name".to_string(), persona.name.clone().into());
    }
    to_markdown(&form_data, &persona.system_instructions)
}

/// Suggested file name: `<name>.md`, or `persona.md` without a name
pub fn export_file_name(form_data: &FormData) -> String {
    let stem = answered_text(form_data, "name")
        .map(|name| name.replace(['/', '\\'], "-"))
        .unwrap_or_else(|| "persona".to_string());
    format!("{}.md", stem)
}
