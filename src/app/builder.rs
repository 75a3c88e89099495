//! Step-by-step persona builder
//!
//! Industry selection, then the dynamic form, then a preview where the
//! generated instructions can be edited before saving.

use std::fmt;

use tracing::{debug, warn};

use crate::catalog::IndustryCatalog;
use crate::error::{Error, Result};
use crate::form::DynamicForm;
use crate::generator::InstructionGenerator;
use crate::persona::{export_file_name, next_persona, to_markdown};
use crate::types::{FormData, Industry, Persona};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Industry,
    Form,
    Preview,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Step::Industry => "industry",
            Step::Form => "form",
            Step::Preview => "preview",
        };
        write!(f, "{}", name)
    }
}

/// One create or edit flow
pub struct BuilderSession {
    editing: Option<Persona>,
    step: Step,
    industry: Option<Industry>,
    form: Option<DynamicForm>,
    form_data: FormData,
    instructions: String,
}

impl BuilderSession {
    /// Fresh persona: starts at industry selection
    pub fn create() -> Self {
        Self {
            editing: None,
            step: Step::Industry,
            industry: None,
            form: None,
            form_data: FormData::new(),
            instructions: String::new(),
        }
    }

    /// Edit an existing persona, starting at the form with its current answers.
    ///
    /// If the persona's industry is no longer in the catalog the flow starts
    /// at industry selection instead.
    pub fn edit(persona: Persona, catalog: &IndustryCatalog) -> Self {
        let form_data = persona.current_form_data();
        let instructions = persona.system_instructions.clone();
        let industry = catalog.get(&persona.industry).cloned();
        if industry.is_none() {
            warn!(
                persona_id = %persona.id,
                industry = %persona.industry,
                "Persona industry is not in the catalog"
            );
        }

        let mut session = Self {
            editing: Some(persona),
            step: Step::Industry,
            industry: None,
            form: None,
            form_data,
            instructions,
        };
        if let Some(industry) = industry {
            session.select_industry(&industry);
        }
        session
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn editing(&self) -> Option<&Persona> {
        self.editing.as_ref()
    }

    pub fn industry(&self) -> Option<&Industry> {
        self.industry.as_ref()
    }

    /// Pick the industry and move to the form, seeded with any answers so far
    pub fn select_industry(&mut self, industry: &Industry) {
        debug!(industry = %industry.id, "Industry selected");
        self.form = Some(DynamicForm::new(industry, &self.form_data));
        self.industry = Some(industry.clone());
        self.step = Step::Form;
    }

    pub fn form(&self) -> Option<&DynamicForm> {
        self.form.as_ref()
    }

    pub fn form_mut(&mut self) -> Option<&mut DynamicForm> {
        self.form.as_mut()
    }

    /// Generate instructions from the form and move to the preview
    pub async fn submit(&mut self, generator: &dyn InstructionGenerator) -> Result<()> {
        let form = self
            .form
            .as_ref()
            .ok_or_else(|| Error::form_validation("industry", "select an industry first"))?;

        let submission = form.submit(generator).await?;
        self.form_data = submission.form_data;
        self.instructions = submission.instructions;
        self.step = Step::Preview;
        Ok(())
    }

    /// Answers captured by the last submission
    pub fn form_data(&self) -> &FormData {
        &self.form_data
    }

    pub fn instructions(&self) -> &str {
        &self.instructions
    }

    /// Replace the generated instructions with a hand-edited version
    pub fn edit_instructions(&mut self, instructions: impl Into<String>) {
        self.instructions = instructions.into();
    }

    /// One step back. Leaving the form keeps the answers typed so far.
    pub fn back(&mut self) {
        self.step = match self.step {
            Step::Preview => Step::Form,
            Step::Form => {
                if let Some(form) = self.form.take() {
                    self.form_data = form.data().clone();
                }
                Step::Industry
            }
            Step::Industry => Step::Industry,
        };
    }

    pub fn export_markdown(&self) -> String {
        to_markdown(&self.form_data, &self.instructions)
    }

    pub fn export_file_name(&self) -> String {
        export_file_name(&self.form_data)
    }

    /// The persona to save: the edited one with a new version appended, or a
    /// brand-new persona at version 1
    pub fn finish(&self) -> Result<Persona> {
        if self.step != Step::Preview {
            return Err(Error::form_validation(
                "instructions",
                "generate instructions before saving",
            ));
        }
        let industry = self
            .industry
            .as_ref()
            .ok_or_else(|| Error::form_validation("industry", "select an industry first"))?;

        Ok(next_persona(
            self.editing.as_ref(),
            industry,
            self.form_data.clone(),
            self.instructions.clone(),
        ))
    }
}
