//! Form schema types
//!
//! Field definitions shared by the industry catalog, the dynamic form engine
//! and the generator adapter. `FieldType` is a closed set: every behaviour that
//! depends on the field kind is an exhaustive `match` in this file.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Collected form answers, keyed by field id, in insertion order
pub type FormData = serde_json::Map<String, Value>;

// ─────────────────────────────────────────────────────────────────
// Field Type
// ─────────────────────────────────────────────────────────────────

/// Kind of input a form field collects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// Single-line free text
    Text,
    /// Multi-line free text
    Textarea,
    /// Exactly one value from `options`
    Select,
    /// Any number of values from `options`
    Multiselect,
    /// On/off switch
    Toggle,
}

impl FieldType {
    pub fn all() -> &'static [FieldType] {
        &[
            FieldType::Text,
            FieldType::Textarea,
            FieldType::Select,
            FieldType::Multiselect,
            FieldType::Toggle,
        ]
    }

    pub fn slug(&self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Textarea => "textarea",
            FieldType::Select => "select",
            FieldType::Multiselect => "multiselect",
            FieldType::Toggle => "toggle",
        }
    }

    /// Short description of the input widget used to present this field
    pub fn widget(&self) -> &'static str {
        match self {
            FieldType::Text => "single-line input",
            FieldType::Textarea => "multi-line input",
            FieldType::Select => "choose one",
            FieldType::Multiselect => "choose any (comma separated)",
            FieldType::Toggle => "yes/no",
        }
    }

    /// Whether the field must carry an `options` list
    pub fn requires_options(&self) -> bool {
        match self {
            FieldType::Select | FieldType::Multiselect => true,
            FieldType::Text | FieldType::Textarea | FieldType::Toggle => false,
        }
    }

    /// Value shown for a field that has not been answered
    pub fn empty_value(&self) -> Value {
        match self {
            FieldType::Text | FieldType::Textarea | FieldType::Select => {
                Value::String(String::new())
            }
            FieldType::Multiselect => Value::Array(Vec::new()),
            FieldType::Toggle => Value::Bool(false),
        }
    }

    /// Convert raw user input into the value this field type stores
    pub fn coerce(&self, raw: &str) -> Value {
        match self {
            FieldType::Text | FieldType::Textarea | FieldType::Select => {
                Value::String(raw.to_string())
            }
            FieldType::Multiselect => Value::Array(
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(|s| Value::String(s.to_string()))
                    .collect(),
            ),
            FieldType::Toggle => Value::Bool(parse_toggle(raw).unwrap_or(false)),
        }
    }

    /// Whether `raw` is meaningful input for this field type.
    ///
    /// Only toggles reject text; unrecognized toggle input coerces to off.
    pub fn recognizes(&self, raw: &str) -> bool {
        match self {
            FieldType::Text | FieldType::Textarea | FieldType::Select | FieldType::Multiselect => {
                true
            }
            FieldType::Toggle => parse_toggle(raw).is_some(),
        }
    }
}

/// On/off text for toggle fields; `None` when the text is neither
fn parse_toggle(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "yes" | "y" | "1" | "on" => Some(true),
        "false" | "no" | "n" | "0" | "off" | "" => Some(false),
        _ => None,
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.slug())
    }
}

impl FromStr for FieldType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FieldType::all()
            .iter()
            .find(|t| t.slug() == s.to_lowercase())
            .copied()
            .ok_or_else(|| {
                format!(
                    "Unknown field type '{}'. Valid: text, textarea, select, multiselect, toggle",
                    s
                )
            })
    }
}

// ─────────────────────────────────────────────────────────────────
// Form Field
// ─────────────────────────────────────────────────────────────────

/// One selectable value of a select/multiselect field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldOption {
    pub value: String,
    pub label: String,
}

impl FieldOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

/// A question presented on the persona form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormField {
    pub id: String,

    pub label: String,

    #[serde(rename = "type")]
    pub field_type: FieldType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<FieldOption>,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub required: bool,

    /// Appended at runtime from the question generator
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub ai_generated: bool,
}

impl FormField {
    pub fn new(id: impl Into<String>, label: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            field_type,
            placeholder: None,
            options: Vec::new(),
            required: false,
            ai_generated: false,
        }
    }

    pub fn text(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(id, label, FieldType::Text)
    }

    pub fn textarea(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(id, label, FieldType::Textarea)
    }

    pub fn toggle(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(id, label, FieldType::Toggle)
    }

    pub fn select(
        id: impl Into<String>,
        label: impl Into<String>,
        options: &[(&str, &str)],
    ) -> Self {
        let mut field = Self::new(id, label, FieldType::Select);
        field.options = options
            .iter()
            .map(|(value, label)| FieldOption::new(*value, *label))
            .collect();
        field
    }

    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn ai_generated(mut self) -> Self {
        self.ai_generated = true;
        self
    }

    /// Structural check: non-empty id/label, options present when the type needs them
    pub fn validate(&self) -> Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("field id must not be empty".to_string());
        }
        if self.label.trim().is_empty() {
            return Err(format!("field '{}' has an empty label", self.id));
        }
        if self.field_type.requires_options() && self.options.is_empty() {
            return Err(format!(
                "field '{}' is a {} but has no options",
                self.id, self.field_type
            ));
        }
        Ok(())
    }

    /// Whether `value` is one of the declared options (always true for free-form types)
    pub fn accepts(&self, value: &Value) -> bool {
        let known = |v: &str| self.options.iter().any(|o| o.value == v);
        match self.field_type {
            FieldType::Text | FieldType::Textarea | FieldType::Toggle => true,
            FieldType::Select => match value {
                Value::String(s) => s.is_empty() || known(s),
                _ => false,
            },
            FieldType::Multiselect => match value {
                Value::Array(items) => items
                    .iter()
                    .all(|item| item.as_str().map(known).unwrap_or(false)),
                _ => false,
            },
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Value helpers
// ─────────────────────────────────────────────────────────────────

/// Render a form value as plain text for prompts, templates and exports
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Null => String::new(),
        Value::Array(items) => items
            .iter()
            .map(display_value)
            .collect::<Vec<_>>()
            .join(", "),
        Value::Object(_) => value.to_string(),
    }
}

/// Whether a form value counts as answered (empty strings, null, false and zero do not)
pub fn is_answered(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Answered text value of `key`, if any
pub fn answered_text(data: &FormData, key: &str) -> Option<String> {
    data.get(key).filter(|v| is_answered(v)).map(display_value)
}
