//! Database row shapes (snake_case columns) and their conversion to and from
//! the persona aggregate.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::types::{
    FormData, KnowledgeSource, KnowledgeSourceType, Persona, PersonaVersion, Tool,
};

use super::Table;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonaRow {
    pub id: String,
    pub name: String,
    pub industry: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub system_instructions: String,
    pub current_version: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub share_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonaVersionRow {
    pub id: String,
    pub persona_id: String,
    pub version: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub system_instructions: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub form_data: FormData,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeSourceRow {
    pub id: String,
    pub persona_id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub source_type: KnowledgeSourceType,
    #[serde(default, deserialize_with = "null_as_default")]
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolRow {
    pub id: String,
    pub persona_id: String,
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default)]
    pub schema: Value,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_built_in: bool,
}

/// Nullable text/JSON columns decode to their default
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl PersonaRow {
    pub fn from_persona(persona: &Persona) -> Self {
        Self {
            id: persona.id.clone(),
            name: persona.name.clone(),
            industry: persona.industry.clone(),
            description: persona.description.clone(),
            system_instructions: persona.system_instructions.clone(),
            current_version: persona.current_version,
            created_at: persona.created_at,
            updated_at: persona.updated_at,
            user_id: persona.user_id.clone(),
            share_id: persona.share_id.clone(),
        }
    }

    /// Assemble the aggregate; `versions` are put back in ascending order
    pub fn into_persona(
        self,
        versions: Vec<PersonaVersionRow>,
        knowledge_sources: Vec<KnowledgeSourceRow>,
        tools: Vec<ToolRow>,
    ) -> Persona {
        let mut persona = Persona {
            id: self.id,
            name: self.name,
            industry: self.industry,
            description: self.description,
            system_instructions: self.system_instructions,
            current_version: self.current_version,
            versions: versions.into_iter().map(PersonaVersion::from).collect(),
            knowledge_sources: knowledge_sources
                .into_iter()
                .map(KnowledgeSource::from)
                .collect(),
            tools: tools.into_iter().map(Tool::from).collect(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            user_id: self.user_id,
            share_id: self.share_id,
        };
        persona.sort_versions();
        persona
    }
}

impl From<&PersonaVersion> for PersonaVersionRow {
    fn from(v: &PersonaVersion) -> Self {
        Self {
            id: v.id.clone(),
            persona_id: v.persona_id.clone(),
            version: v.version,
            system_instructions: v.system_instructions.clone(),
            form_data: v.form_data.clone(),
            created_at: v.created_at,
        }
    }
}

impl From<PersonaVersionRow> for PersonaVersion {
    fn from(row: PersonaVersionRow) -> Self {
        Self {
            id: row.id,
            persona_id: row.persona_id,
            version: row.version,
            system_instructions: row.system_instructions,
            form_data: row.form_data,
            created_at: row.created_at,
        }
    }
}

impl KnowledgeSourceRow {
    #[cfg(test)]
    pub fn from_source(persona_id: &str, source: &KnowledgeSource) -> Self {
        Self {
            id: source.id.clone(),
            persona_id: persona_id.to_string(),
            name: source.name.clone(),
            source_type: source.source_type,
            content: source.content.clone(),
            created_at: source.created_at,
        }
    }
}

impl From<KnowledgeSourceRow> for KnowledgeSource {
    fn from(row: KnowledgeSourceRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            source_type: row.source_type,
            content: row.content,
            created_at: row.created_at,
        }
    }
}

impl ToolRow {
    #[cfg(test)]
    pub fn from_tool(persona_id: &str, tool: &Tool) -> Self {
        Self {
            id: tool.id.clone(),
            persona_id: persona_id.to_string(),
            name: tool.name.clone(),
            description: tool.description.clone(),
            schema: tool.schema.clone(),
            is_built_in: tool.is_built_in,
        }
    }
}

impl From<ToolRow> for Tool {
    fn from(row: ToolRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            description: row.description,
            schema: row.schema,
            is_built_in: row.is_built_in,
        }
    }
}

/// Decode raw rows, skipping (and logging) any that do not fit `T`
pub(crate) fn decode_rows<T: DeserializeOwned>(table: Table, rows: Vec<Value>) -> Vec<T> {
    rows.into_iter()
        .filter_map(|row| match serde_json::from_value::<T>(row) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                warn!(table = %table, error = %e, "Skipping malformed row");
                None
            }
        })
        .collect()
}
