//! Persona persistence
//!
//! `RowStore` is the table-level seam: JSON rows in, JSON rows out, with
//! equality filters and ordering. `RestStore` implements it against a
//! PostgREST endpoint; `PersonaRepository` builds the persona operations on
//! top of any implementation.

mod repository;
mod rest;
mod rows;

#[cfg(test)]
mod memory;

pub use repository::PersonaRepository;
pub use rest::{RestStore, RestStoreConfig};

#[cfg(test)]
pub use memory::{MemoryStore, StoreOp};

use std::fmt;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

// ─────────────────────────────────────────────────────────────────
// Tables
// ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Personas,
    PersonaVersions,
    KnowledgeSources,
    Tools,
}

impl Table {
    #[cfg(test)]
    pub fn all() -> &'static [Table] {
        &[
            Table::Personas,
            Table::PersonaVersions,
            Table::KnowledgeSources,
            Table::Tools,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Table::Personas => "personas",
            Table::PersonaVersions => "persona_versions",
            Table::KnowledgeSources => "knowledge_sources",
            Table::Tools => "tools",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ─────────────────────────────────────────────────────────────────
// Query
// ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Asc => "asc",
            Direction::Desc => "desc",
        }
    }
}

/// Row filter: column equality, optional ordering and limit
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<(String, String)>,
    pub order: Option<(String, Direction)>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: impl Into<String>, value: impl ToString) -> Self {
        self.filters.push((column.into(), value.to_string()));
        self
    }

    pub fn order_desc(mut self, column: impl Into<String>) -> Self {
        self.order = Some((column.into(), Direction::Desc));
        self
    }

    pub fn order_asc(mut self, column: impl Into<String>) -> Self {
        self.order = Some((column.into(), Direction::Asc));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

// ─────────────────────────────────────────────────────────────────
// Row Store Trait
// ─────────────────────────────────────────────────────────────────

/// Table-level CRUD over JSON rows
#[async_trait]
pub trait RowStore: Send + Sync {
    /// Rows matching `query`, in the requested order
    async fn select(&self, table: Table, query: &Query) -> Result<Vec<Value>>;

    /// Insert a new row; fails if the primary key exists
    async fn insert(&self, table: Table, row: Value) -> Result<()>;

    /// Insert or merge into the row with the same `id`
    async fn upsert(&self, table: Table, row: Value) -> Result<()>;

    /// Merge `patch` into every matching row, returning the number of rows changed
    async fn update(&self, table: Table, query: &Query, patch: Value) -> Result<usize>;

    /// Delete every matching row, returning the number of rows removed
    async fn delete(&self, table: Table, query: &Query) -> Result<usize>;
}
