//! Top-level controller
//!
//! Owns the loaded persona list and which view is active. The list is only
//! changed after the corresponding store request has completed.

mod builder;

pub use builder::BuilderSession;

use tracing::{debug, info};

use crate::catalog::IndustryCatalog;
use crate::error::{Error, Result};
use crate::store::{PersonaRepository, RowStore};
use crate::types::Persona;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    List,
    Builder,
}

pub struct App<S: RowStore> {
    repository: PersonaRepository<S>,
    catalog: IndustryCatalog,
    personas: Vec<Persona>,
    view: View,
    selected: Option<String>,
}

impl<S: RowStore> App<S> {
    pub fn new(repository: PersonaRepository<S>, catalog: IndustryCatalog) -> Self {
        Self {
            repository,
            catalog,
            personas: Vec::new(),
            view: View::List,
            selected: None,
        }
    }

    pub fn catalog(&self) -> &IndustryCatalog {
        &self.catalog
    }

    pub fn repository(&self) -> &PersonaRepository<S> {
        &self.repository
    }

    pub fn personas(&self) -> &[Persona] {
        &self.personas
    }

    pub fn view(&self) -> View {
        self.view
    }

    /// Persona open in the builder, if editing
    pub fn selected(&self) -> Option<&Persona> {
        self.selected.as_deref().and_then(|id| self.find(id))
    }

    pub fn find(&self, id: &str) -> Option<&Persona> {
        self.personas.iter().find(|p| p.id == id)
    }

    /// Replace the list with what the store holds
    pub async fn load(&mut self) -> usize {
        self.personas = self.repository.list().await;
        self.personas.len()
    }

    pub fn create_new(&mut self) -> BuilderSession {
        self.selected = None;
        self.view = View::Builder;
        BuilderSession::create()
    }

    /// Open an existing persona for editing, fetching it if it is not loaded
    pub async fn select(&mut self, id: &str) -> Result<BuilderSession> {
        let persona = match self.find(id) {
            Some(persona) => persona.clone(),
            None => {
                let fetched = self
                    .repository
                    .fetch_by_id(id)
                    .await
                    .ok_or_else(|| Error::persona_not_found(id))?;
                self.upsert_local(fetched.clone());
                fetched
            }
        };

        self.selected = Some(persona.id.clone());
        self.view = View::Builder;
        Ok(BuilderSession::edit(persona, &self.catalog))
    }

    /// Save the builder's result and return to the list.
    ///
    /// `Ok(None)` means the store rejected the save; the list is unchanged.
    pub async fn save(&mut self, session: &BuilderSession) -> Result<Option<Persona>> {
        let persona = session.finish()?;
        let saved = self.repository.save(&persona).await;
        if let Some(saved) = &saved {
            self.upsert_local(saved.clone());
        }
        self.back();
        Ok(saved)
    }

    pub async fn delete(&mut self, id: &str) -> bool {
        let deleted = self.repository.delete(id).await;
        if deleted {
            self.personas.retain(|p| p.id != id);
            if self.selected.as_deref() == Some(id) {
                self.back();
            }
        }
        deleted
    }

    pub async fn share(&mut self, id: &str) -> Option<String> {
        let token = self.repository.generate_share_token(id).await?;
        if let Some(persona) = self.personas.iter_mut().find(|p| p.id == id) {
            persona.share_id = Some(token.clone());
        }
        Some(token)
    }

    pub async fn rollback(&mut self, id: &str, version: u32) -> Option<Persona> {
        let persona = self.repository.rollback(id, version).await?;
        self.upsert_local(persona.clone());
        Some(persona)
    }

    pub fn back(&mut self) {
        self.view = View::List;
        self.selected = None;
    }

    fn upsert_local(&mut self, persona: Persona) {
        match self.personas.iter_mut().find(|p| p.id == persona.id) {
            Some(existing) => {
                debug!(persona_id = %persona.id, "Replacing loaded persona");
                *existing = persona;
            }
            None => {
                info!(persona_id = %persona.id, "Adding persona to list");
                self.personas.push(persona);
            }
        }
    }
}
