//! Industry template type.

use serde::{Deserialize, Serialize};

use super::form::FormField;

/// A static industry template: display metadata plus its default questions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Industry {
    pub id: String,
    pub name: String,
    pub icon: String,
    pub description: String,
    pub suggested_fields: Vec<FormField>,
}

impl Industry {
    /// Fallback persona name when the form leaves `name` empty
    pub fn default_persona_name(&self) -> String {
        format!("{} Persona", self.name)
    }
}
