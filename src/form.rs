//! Dynamic form engine
//!
//! Holds the field list for one industry, collects answers, grows the list with
//! generated follow-up questions and gates submission on a persona name.

use std::sync::atomic::{AtomicBool, Ordering};

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::generator::InstructionGenerator;
use crate::types::{is_answered, FormData, FormField, Industry};

/// Field ids every persona form starts with
pub const NAME_FIELD: &str = "name";
pub const DESCRIPTION_FIELD: &str = "description";

/// Output of a successful submission
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub form_data: FormData,
    pub instructions: String,
}

/// Editable persona form for one industry
pub struct DynamicForm {
    industry: Industry,
    fields: Vec<FormField>,
    data: FormData,
    generating: AtomicBool,
}

/// Clears the in-flight flag when the submission finishes or is dropped
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl DynamicForm {
    /// Build the form for `industry`, overlaying any previously saved answers
    pub fn new(industry: &Industry, initial: &FormData) -> Self {
        let mut fields = universal_fields();
        let mut data: FormData = fields
            .iter()
            .map(|f| (f.id.clone(), f.field_type.empty_value()))
            .collect();
        fields.extend(industry.suggested_fields.iter().cloned());

        for (key, value) in initial {
            data.insert(key.clone(), value.clone());
        }

        Self {
            industry: industry.clone(),
            fields,
            data,
            generating: AtomicBool::new(false),
        }
    }

    pub fn industry(&self) -> &Industry {
        &self.industry
    }

    pub fn fields(&self) -> &[FormField] {
        &self.fields
    }

    pub fn field(&self, id: &str) -> Option<&FormField> {
        self.fields.iter().find(|f| f.id == id)
    }

    pub fn data(&self) -> &FormData {
        &self.data
    }

    pub fn value(&self, id: &str) -> Option<&Value> {
        self.data.get(id)
    }

    /// Last write wins
    pub fn set_value(&mut self, field_id: impl Into<String>, value: Value) {
        self.data.insert(field_id.into(), value);
    }

    /// Store raw text input, converted according to the field's type.
    ///
    /// Unknown field ids keep the raw string. Values outside a select's
    /// options are kept but logged.
    pub fn set_raw(&mut self, field_id: &str, raw: &str) {
        let value = match self.field(field_id) {
            Some(field) => {
                if !field.field_type.recognizes(raw) {
                    warn!(
                        field = %field_id,
                        value = %raw,
                        "Unrecognized {} input, storing it as off",
                        field.field_type
                    );
                }
                let value = field.field_type.coerce(raw);
                if !field.accepts(&value) {
                    warn!(field = %field_id, value = %raw, "Value is not one of the field's options");
                }
                value
            }
            None => {
                debug!(field = %field_id, "Setting value for a field not on the form");
                Value::String(raw.to_string())
            }
        };
        self.set_value(field_id, value);
    }

    pub fn is_generating(&self) -> bool {
        self.generating.load(Ordering::Acquire)
    }

    /// A persona name is present and no generation is running
    pub fn can_submit(&self) -> bool {
        self.has_name() && !self.is_generating()
    }

    fn has_name(&self) -> bool {
        self.data
            .get(NAME_FIELD)
            .map(|v| v.is_string() && is_answered(v))
            .unwrap_or(false)
    }

    /// Ask the generator for follow-up questions and append them.
    ///
    /// Failures leave the form untouched. Returns the number of fields added.
    pub async fn add_generated_questions(&mut self, generator: &dyn InstructionGenerator) -> usize {
        let questions = match generator
            .generate_follow_up_questions(&self.industry.name, &self.data)
            .await
        {
            Ok(questions) => questions,
            Err(e) => {
                warn!(
                    industry = %self.industry.id,
                    error = %e,
                    "Failed to generate follow-up questions"
                );
                return 0;
            }
        };

        let mut added = 0;
        for question in questions {
            if self.field(&question.id).is_some() {
                debug!(field = %question.id, "Skipping generated question with duplicate id");
                continue;
            }
            self.fields.push(question.ai_generated());
            added += 1;
        }

        info!(industry = %self.industry.id, added, "Added generated questions");
        added
    }

    /// Generate instructions from the current answers.
    ///
    /// Refuses while another submission of this form is in flight. The
    /// in-flight flag is cleared whether generation succeeds or fails.
    pub async fn submit(&self, generator: &dyn InstructionGenerator) -> Result<Submission> {
        if !self.has_name() {
            return Err(Error::form_validation(NAME_FIELD, "a persona name is required"));
        }
        if self
            .generating
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(Error::FormBusy);
        }
        let _in_flight = InFlight(&self.generating);

        let form_data = self.data.clone();
        debug!(industry = %self.industry.id, generator = generator.name(), "Generating instructions");

        let instructions = generator
            .generate_instructions(&self.industry.name, &form_data)
            .await
            .map_err(|e| {
                warn!(industry = %self.industry.id, error = %e, "Instruction generation failed");
                e
            })?;

        Ok(Submission {
            form_data,
            instructions,
        })
    }
}

fn universal_fields() -> Vec<FormField> {
    vec![
        FormField::text(NAME_FIELD, "Persona Name")
            .with_placeholder("e.g., Real Estate Assistant")
            .required(),
        FormField::textarea(DESCRIPTION_FIELD, "Brief Description")
            .with_placeholder("What should this persona help with?"),
    ]
}
