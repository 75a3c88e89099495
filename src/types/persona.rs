//! Persona aggregate types
//!
//! A persona owns its version log, knowledge sources and tools. The version
//! log is kept oldest-first: the last element is always the newest version.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::form::FormData;

// ─────────────────────────────────────────────────────────────────
// Persona Version
// ─────────────────────────────────────────────────────────────────

/// Immutable snapshot of a persona's instructions and the form that produced them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonaVersion {
    pub id: String,
    pub persona_id: String,
    /// 1-based, unique per persona
    pub version: u32,
    pub system_instructions: String,
    pub form_data: FormData,
    pub created_at: DateTime<Utc>,
}

// ─────────────────────────────────────────────────────────────────
// Knowledge Sources & Tools
// ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KnowledgeSourceType {
    File,
    Url,
    Text,
}

impl KnowledgeSourceType {
    pub fn slug(&self) -> &'static str {
        match self {
            KnowledgeSourceType::File => "file",
            KnowledgeSourceType::Url => "url",
            KnowledgeSourceType::Text => "text",
        }
    }
}

impl fmt::Display for KnowledgeSourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.slug())
    }
}

impl FromStr for KnowledgeSourceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "file" => Ok(KnowledgeSourceType::File),
            "url" => Ok(KnowledgeSourceType::Url),
            "text" => Ok(KnowledgeSourceType::Text),
            _ => Err(format!(
                "Unknown knowledge source type '{}'. Valid: file, url, text",
                s
            )),
        }
    }
}

/// Reference content attached to a persona
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeSource {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub source_type: KnowledgeSourceType,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Callable capability descriptor attached to a persona
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Opaque parameter description
    pub schema: Value,
    pub is_built_in: bool,
}

// ─────────────────────────────────────────────────────────────────
// Persona
// ─────────────────────────────────────────────────────────────────

/// A saved AI-assistant configuration with its version history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Persona {
    pub id: String,
    pub name: String,
    /// Industry catalog id
    pub industry: String,
    pub description: String,
    /// Mirror of the current version's instructions
    pub system_instructions: String,
    pub current_version: u32,
    /// Oldest first
    pub versions: Vec<PersonaVersion>,
    pub knowledge_sources: Vec<KnowledgeSource>,
    pub tools: Vec<Tool>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub share_id: Option<String>,
}

impl Persona {
    /// The newest version in the log
    pub fn latest_version(&self) -> Option<&PersonaVersion> {
        self.versions.last()
    }

    pub fn version(&self, number: u32) -> Option<&PersonaVersion> {
        self.versions.iter().find(|v| v.version == number)
    }

    /// Highest version number present in the log (0 when empty)
    pub fn highest_version(&self) -> u32 {
        self.versions.iter().map(|v| v.version).max().unwrap_or(0)
    }

    /// Form data of the version `current_version` points at
    pub fn current_form_data(&self) -> FormData {
        self.version(self.current_version)
            .or_else(|| self.latest_version())
            .map(|v| v.form_data.clone())
            .unwrap_or_default()
    }

    pub fn versions_newest_first(&self) -> impl Iterator<Item = &PersonaVersion> {
        self.versions.iter().rev()
    }

    /// Restore oldest-first order after reading rows in arbitrary order
    pub fn sort_versions(&mut self) {
        self.versions.sort_by_key(|v| v.version);
    }

    /// Check the persisted-persona invariants
    ///
    /// - the version log is non-empty and strictly increasing
    /// - `current_version` is the newest version
    /// - `system_instructions` mirrors that version's text
    pub fn check_invariants(&self) -> Result<(), String> {
        let latest = self
            .latest_version()
            .ok_or_else(|| "persona has no versions".to_string())?;

        if self.versions.windows(2).any(|w| w[0].version >= w[1].version) {
            return Err("versions are not strictly increasing".to_string());
        }
        if latest.version != self.current_version {
            return Err(format!(
                "current_version is {} but newest version is {}",
                self.current_version, latest.version
            ));
        }
        if latest.system_instructions != self.system_instructions {
            return Err(format!(
                "system instructions differ from version {}",
                latest.version
            ));
        }
        if let Some(v) = self.versions.iter().find(|v| v.persona_id != self.id) {
            return Err(format!("version {} belongs to persona {}", v.version, v.persona_id));
        }
        Ok(())
    }
}
