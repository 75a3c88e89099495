//! Persona repository
//!
//! Persona-level operations over a [`RowStore`]. Store failures never escape:
//! each operation logs the failure and returns `None`, an empty list or
//! `false`. Multi-step writes are not atomic; see `save` and `rollback` for
//! the states a partial failure can leave behind.

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::persona::replay_version;
use crate::types::{Persona, PersonaVersion};

use super::rows::{decode_rows, KnowledgeSourceRow, PersonaRow, PersonaVersionRow, ToolRow};
use super::{Query, RowStore, Table};

/// Length of a public share token
pub const SHARE_TOKEN_LEN: usize = 8;

pub struct PersonaRepository<S: RowStore> {
    store: S,
}

impl<S: RowStore> PersonaRepository<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    #[cfg(test)]
    pub fn store(&self) -> &S {
        &self.store
    }

    // ─────────────────────────────────────────────────────────────
    // Reads
    // ─────────────────────────────────────────────────────────────

    /// All personas, most recently updated first, fully hydrated
    pub async fn list(&self) -> Vec<Persona> {
        let rows: Vec<PersonaRow> = match self
            .read(Table::Personas, &Query::new().order_desc("updated_at"))
            .await
        {
            Ok(rows) => rows,
            Err(e) => {
                error!(error = %e, "Failed to list personas");
                return Vec::new();
            }
        };

        let mut personas = Vec::with_capacity(rows.len());
        for row in rows {
            personas.push(self.hydrate(row).await);
        }
        info!(count = personas.len(), "Loaded personas");
        personas
    }

    pub async fn fetch_by_id(&self, id: &str) -> Option<Persona> {
        self.fetch_one(Query::new().eq("id", id).limit(1), "id", id)
            .await
    }

    /// Persona published under `token`
    pub async fn fetch_by_share_token(&self, token: &str) -> Option<Persona> {
        self.fetch_one(Query::new().eq("share_id", token).limit(1), "share_id", token)
            .await
    }

    async fn fetch_one(&self, query: Query, key: &str, value: &str) -> Option<Persona> {
        match self.read::<PersonaRow>(Table::Personas, &query).await {
            Ok(rows) => match rows.into_iter().next() {
                Some(row) => Some(self.hydrate(row).await),
                None => {
                    debug!(key, value, "No persona matched");
                    None
                }
            },
            Err(e) => {
                error!(key, value, error = %e, "Failed to fetch persona");
                None
            }
        }
    }

    /// Attach versions, knowledge sources and tools to a persona row.
    ///
    /// The three reads run concurrently; a failed read hydrates as empty.
    async fn hydrate(&self, row: PersonaRow) -> Persona {
        let by_persona = Query::new().eq("persona_id", &row.id);
        let versions_query = by_persona.clone().order_desc("version");
        let sources_query = by_persona.clone().order_asc("created_at");

        let (versions, sources, tools) = tokio::join!(
            self.read::<PersonaVersionRow>(Table::PersonaVersions, &versions_query),
            self.read::<KnowledgeSourceRow>(Table::KnowledgeSources, &sources_query),
            self.read::<ToolRow>(Table::Tools, &by_persona),
        );

        let persona_id = row.id.clone();
        row.into_persona(
            self.or_empty(versions, Table::PersonaVersions, &persona_id),
            self.or_empty(sources, Table::KnowledgeSources, &persona_id),
            self.or_empty(tools, Table::Tools, &persona_id),
        )
    }

    fn or_empty<T>(&self, result: Result<Vec<T>>, table: Table, persona_id: &str) -> Vec<T> {
        result.unwrap_or_else(|e| {
            warn!(table = %table, persona_id, error = %e, "Hydration read failed, using empty list");
            Vec::new()
        })
    }

    async fn read<T: DeserializeOwned>(&self, table: Table, query: &Query) -> Result<Vec<T>> {
        let rows = self.store.select(table, query).await?;
        Ok(decode_rows(table, rows))
    }

    // ─────────────────────────────────────────────────────────────
    // Writes
    // ─────────────────────────────────────────────────────────────

    /// Persist a persona and its newest version, then re-read it.
    ///
    /// Only the newest version row is written: earlier versions are immutable
    /// and already stored. If the persona row cannot be written nothing is
    /// saved and `None` is returned. A failed version write is logged and the
    /// re-read state is returned as-is.
    pub async fn save(&self, persona: &Persona) -> Option<Persona> {
        if let Err(reason) = persona.check_invariants() {
            warn!(persona_id = %persona.id, reason = %reason, "Saving persona with inconsistent history");
        }

        let mut row = PersonaRow::from_persona(persona);
        row.updated_at = Utc::now();

        if let Err(e) = self.write_upsert(Table::Personas, &row).await {
            error!(persona_id = %persona.id, error = %e, "Failed to save persona");
            return None;
        }

        match persona.latest_version() {
            Some(version) => {
                let version_row = PersonaVersionRow::from(version);
                if let Err(e) = self.write_upsert(Table::PersonaVersions, &version_row).await {
                    error!(
                        persona_id = %persona.id,
                        version = version.version,
                        error = %e,
                        "Failed to save persona version"
                    );
                }
            }
            None => warn!(persona_id = %persona.id, "Persona has no versions to save"),
        }

        info!(persona_id = %persona.id, version = persona.current_version, "Saved persona");
        self.fetch_by_id(&persona.id).await
    }

    async fn write_upsert<T: serde::Serialize>(&self, table: Table, row: &T) -> Result<()> {
        let value = serde_json::to_value(row)?;
        self.store.upsert(table, value).await
    }

    /// Delete a persona and everything attached to it.
    ///
    /// Child rows are removed concurrently first; their failures are only
    /// logged. Returns whether the persona row itself was removed.
    pub async fn delete(&self, id: &str) -> bool {
        let by_persona = Query::new().eq("persona_id", id);
        let (versions, sources, tools) = tokio::join!(
            self.store.delete(Table::PersonaVersions, &by_persona),
            self.store.delete(Table::KnowledgeSources, &by_persona),
            self.store.delete(Table::Tools, &by_persona),
        );
        for (table, result) in [
            (Table::PersonaVersions, versions),
            (Table::KnowledgeSources, sources),
            (Table::Tools, tools),
        ] {
            if let Err(e) = result {
                warn!(table = %table, persona_id = id, error = %e, "Failed to delete child rows");
            }
        }

        match self
            .store
            .delete(Table::Personas, &Query::new().eq("id", id))
            .await
        {
            Ok(0) => {
                warn!(persona_id = id, "No persona row to delete");
                false
            }
            Ok(_) => {
                info!(persona_id = id, "Deleted persona");
                true
            }
            Err(e) => {
                error!(persona_id = id, error = %e, "Failed to delete persona");
                false
            }
        }
    }

    /// Assign a new share token to a persona, replacing any previous one
    pub async fn generate_share_token(&self, id: &str) -> Option<String> {
        let token: String = Uuid::new_v4()
            .to_string()
            .chars()
            .take(SHARE_TOKEN_LEN)
            .collect();

        match self
            .store
            .update(
                Table::Personas,
                &Query::new().eq("id", id),
                json!({ "share_id": token }),
            )
            .await
        {
            Ok(0) => {
                warn!(persona_id = id, "Cannot share unknown persona");
                None
            }
            Ok(_) => {
                info!(persona_id = id, "Generated share token");
                Some(token)
            }
            Err(e) => {
                error!(persona_id = id, error = %e, "Failed to store share token");
                None
            }
        }
    }

    /// Restore `target` by appending a copy of it as the newest version.
    ///
    /// Steps: read the target version, read the persona's current pointer,
    /// insert the replay row, move the pointer. The last two are not atomic:
    /// if the pointer update fails the new row exists but is not current, which
    /// is logged as an inconsistency and returned as re-read.
    pub async fn rollback(&self, id: &str, target: u32) -> Option<Persona> {
        let target_version = match self.read_version(id, target).await {
            Ok(version) => version,
            Err(e) => {
                error!(persona_id = id, target, error = %e, "Rollback target unavailable");
                return None;
            }
        };

        let next = match self.next_version_number(id).await {
            Ok(next) => next,
            Err(e) => {
                error!(persona_id = id, error = %e, "Failed to read current version");
                return None;
            }
        };

        let replay = replay_version(id, &target_version, next);
        let replay_row = match serde_json::to_value(PersonaVersionRow::from(&replay)) {
            Ok(row) => row,
            Err(e) => {
                error!(persona_id = id, error = %e, "Failed to encode rollback version");
                return None;
            }
        };
        if let Err(e) = self.store.insert(Table::PersonaVersions, replay_row).await {
            error!(persona_id = id, version = next, error = %e, "Failed to insert rollback version");
            return None;
        }

        let pointer = json!({
            "current_version": next,
            "system_instructions": replay.system_instructions,
            "updated_at": Utc::now(),
        });
        match self
            .store
            .update(Table::Personas, &Query::new().eq("id", id), pointer)
            .await
        {
            Ok(n) if n > 0 => {
                info!(persona_id = id, from = target, to = next, "Rolled back persona");
            }
            Ok(_) => error!(
                persona_id = id,
                version = next,
                "Rollback version stored but persona row vanished"
            ),
            Err(e) => {
                let inconsistent = Error::PersonaInconsistent {
                    id: id.to_string(),
                    reason: format!("version {} stored but not made current: {}", next, e),
                };
                error!(persona_id = id, version = next, "{}", inconsistent.format_for_log());
            }
        }

        self.fetch_by_id(id).await
    }

    async fn read_version(&self, id: &str, version: u32) -> Result<PersonaVersion> {
        let query = Query::new()
            .eq("persona_id", id)
            .eq("version", version)
            .limit(1);
        self.read::<PersonaVersionRow>(Table::PersonaVersions, &query)
            .await?
            .into_iter()
            .next()
            .map(PersonaVersion::from)
            .ok_or(Error::VersionNotFound {
                persona_id: id.to_string(),
                version,
            })
    }

    /// One past both the persona's pointer and the highest stored version
    async fn next_version_number(&self, id: &str) -> Result<u32> {
        let persona_query = Query::new().eq("id", id).limit(1);
        let newest_query = Query::new()
            .eq("persona_id", id)
            .order_desc("version")
            .limit(1);

        let (persona, newest) = tokio::join!(
            self.read::<PersonaRow>(Table::Personas, &persona_query),
            self.read::<PersonaVersionRow>(Table::PersonaVersions, &newest_query),
        );

        let current = persona?
            .into_iter()
            .next()
            .map(|row| row.current_version)
            .ok_or_else(|| Error::persona_not_found(id))?;
        let highest = newest?.into_iter().next().map(|v| v.version).unwrap_or(0);

        Ok(current.max(highest) + 1)
    }

    /// Raw rows of `table` referencing `persona_id`
    #[cfg(test)]
    pub async fn count_rows(&self, table: Table, persona_id: &str) -> Result<usize> {
        let column = match table {
            Table::Personas => "id",
            Table::PersonaVersions | Table::KnowledgeSources | Table::Tools => "persona_id",
        };
        let rows: Vec<serde_json::Value> = self
            .store
            .select(table, &Query::new().eq(column, persona_id))
            .await?;
        Ok(rows.len())
    }
}
