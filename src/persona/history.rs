//! Version history construction
//!
//! Every save appends exactly one version. Rollback never rewrites history: it
//! appends a copy of the target version under a new number.

use chrono::Utc;
use uuid::Uuid;

use crate::types::{answered_text, FormData, Industry, Persona, PersonaVersion};

/// Number the next version of `previous` gets (1 for a new persona)
pub fn next_version_number(previous: Option<&Persona>) -> u32 {
    match previous {
        Some(p) => (p.current_version + 1).max(p.highest_version() + 1),
        None => 1,
    }
}

/// Build the persona that results from saving a form submission.
///
/// When `previous` is given the persona keeps its id, attachments, owner,
/// share token and creation time, and the new version is appended to its log.
pub fn next_persona(
    previous: Option<&Persona>,
    industry: &Industry,
    form_data: FormData,
    instructions: String,
) -> Persona {
    let now = Utc::now();
    let number = next_version_number(previous);
    let id = previous
        .map(|p| p.id.clone())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let name = answered_text(&form_data, "name")
        .or_else(|| previous.map(|p| p.name.clone()))
        .unwrap_or_else(|| industry.default_persona_name());
    let description = answered_text(&form_data, "description")
        .or_else(|| previous.map(|p| p.description.clone()))
        .unwrap_or_default();

    let mut versions = previous.map(|p| p.versions.clone()).unwrap_or_default();
    versions.push(PersonaVersion {
        id: Uuid::new_v4().to_string(),
        persona_id: id.clone(),
        version: number,
        system_instructions: instructions.clone(),
        form_data,
        created_at: now,
    });

    Persona {
        id,
        name,
        industry: industry.id.clone(),
        description,
        system_instructions: instructions,
        current_version: number,
        versions,
        knowledge_sources: previous
            .map(|p| p.knowledge_sources.clone())
            .unwrap_or_default(),
        tools: previous.map(|p| p.tools.clone()).unwrap_or_default(),
        created_at: previous.map(|p| p.created_at).unwrap_or(now),
        updated_at: now,
        user_id: previous.and_then(|p| p.user_id.clone()),
        share_id: previous.and_then(|p| p.share_id.clone()),
    }
}

/// Rollback record: `target`'s content under a fresh id and `new_version`
pub fn replay_version(persona_id: &str, target: &PersonaVersion, new_version: u32) -> PersonaVersion {
    PersonaVersion {
        id: Uuid::new_v4().to_string(),
        persona_id: persona_id.to_string(),
        version: new_version,
        system_instructions: target.system_instructions.clone(),
        form_data: target.form_data.clone(),
        created_at: Utc::now(),
    }
}
