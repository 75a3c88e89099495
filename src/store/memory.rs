//! In-memory row store for tests, with per-table fault injection and a log of
//! every write it accepted.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::DateTime;
use parking_lot::RwLock;
use serde_json::Value;

use crate::error::{Error, Result};

use super::{Direction, Query, RowStore, Table};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Select,
    Insert,
    Upsert,
    Update,
    Delete,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<Table, Vec<Value>>>,
    failures: RwLock<HashSet<(Table, StoreOp)>>,
    writes: RwLock<Vec<(Table, StoreOp, Value)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every `op` on `table` fail until cleared
    pub fn fail_on(&self, table: Table, op: StoreOp) {
        self.failures.write().insert((table, op));
    }

    pub fn clear_failures(&self) {
        self.failures.write().clear();
    }

    /// Payloads of the accepted `op` writes to `table`, oldest first
    pub fn writes(&self, table: Table, op: StoreOp) -> Vec<Value> {
        self.writes
            .read()
            .iter()
            .filter(|(t, o, _)| *t == table && *o == op)
            .map(|(_, _, payload)| payload.clone())
            .collect()
    }

    pub fn clear_writes(&self) {
        self.writes.write().clear();
    }

    fn record(&self, table: Table, op: StoreOp, payload: &Value) {
        self.writes.write().push((table, op, payload.clone()));
    }

    pub fn rows(&self, table: Table) -> Vec<Value> {
        self.tables.read().get(&table).cloned().unwrap_or_default()
    }

    /// Rows in `table` whose `column` equals `value`
    pub fn count_where(&self, table: Table, column: &str, value: &str) -> usize {
        self.rows(table)
            .iter()
            .filter(|row| column_equals(row, column, value))
            .count()
    }

    pub fn seed(&self, table: Table, row: Value) {
        self.tables.write().entry(table).or_default().push(row);
    }

    fn check(&self, table: Table, op: StoreOp) -> Result<()> {
        if self.failures.read().contains(&(table, op)) {
            return Err(Error::store_request(
                table.name(),
                format!("injected {:?} failure", op),
            ));
        }
        Ok(())
    }
}

fn column_equals(row: &Value, column: &str, expected: &str) -> bool {
    match row.get(column) {
        Some(Value::String(s)) => s == expected,
        Some(Value::Null) | None => false,
        Some(other) => other.to_string() == expected,
    }
}

fn matches(row: &Value, query: &Query) -> bool {
    query
        .filters
        .iter()
        .all(|(column, value)| column_equals(row, column, value))
}

fn compare(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => {
            match (DateTime::parse_from_rfc3339(x), DateTime::parse_from_rfc3339(y)) {
                (Ok(x), Ok(y)) => x.cmp(&y),
                _ => x.cmp(y),
            }
        }
        _ => Ordering::Equal,
    }
}

fn merge(target: &mut Value, patch: &Value) {
    if let (Some(target), Some(patch)) = (target.as_object_mut(), patch.as_object()) {
        for (key, value) in patch {
            target.insert(key.clone(), value.clone());
        }
    }
}

fn row_id(row: &Value) -> Option<&str> {
    row.get("id").and_then(Value::as_str)
}

#[async_trait]
impl RowStore for MemoryStore {
    async fn select(&self, table: Table, query: &Query) -> Result<Vec<Value>> {
        self.check(table, StoreOp::Select)?;
        let mut rows: Vec<Value> = self
            .rows(table)
            .into_iter()
            .filter(|row| matches(row, query))
            .collect();

        if let Some((column, direction)) = &query.order {
            rows.sort_by(|a, b| {
                let ord = compare(a.get(column), b.get(column));
                match direction {
                    Direction::Asc => ord,
                    Direction::Desc => ord.reverse(),
                }
            });
        }
        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }
        Ok(rows)
    }

    async fn insert(&self, table: Table, row: Value) -> Result<()> {
        self.check(table, StoreOp::Insert)?;
        self.record(table, StoreOp::Insert, &row);
        let mut tables = self.tables.write();
        let rows = tables.entry(table).or_default();
        if let Some(id) = row_id(&row) {
            if rows.iter().any(|r| row_id(r) == Some(id)) {
                return Err(Error::StoreStatus {
                    table: table.name().to_string(),
                    status: 409,
                    body: format!("duplicate key value: {}", id),
                });
            }
        }
        rows.push(row);
        Ok(())
    }

    async fn upsert(&self, table: Table, row: Value) -> Result<()> {
        self.check(table, StoreOp::Upsert)?;
        self.record(table, StoreOp::Upsert, &row);
        let mut tables = self.tables.write();
        let rows = tables.entry(table).or_default();
        let existing = row_id(&row).and_then(|id| rows.iter().position(|r| row_id(r) == Some(id)));
        match existing {
            Some(index) => merge(&mut rows[index], &row),
            None => rows.push(row),
        }
        Ok(())
    }

    async fn update(&self, table: Table, query: &Query, patch: Value) -> Result<usize> {
        self.check(table, StoreOp::Update)?;
        self.record(table, StoreOp::Update, &patch);
        let mut tables = self.tables.write();
        let rows = tables.entry(table).or_default();
        let mut changed = 0;
        for row in rows.iter_mut().filter(|row| matches(row, query)) {
            merge(row, &patch);
            changed += 1;
        }
        Ok(changed)
    }

    async fn delete(&self, table: Table, query: &Query) -> Result<usize> {
        self.check(table, StoreOp::Delete)?;
        let mut tables = self.tables.write();
        let rows = tables.entry(table).or_default();
        let before = rows.len();
        rows.retain(|row| !matches(row, query));
        Ok(before - rows.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_select_filters_and_orders() {
        let store = MemoryStore::new();
        for n in [1, 3, 2] {
            store.seed(
                Table::PersonaVersions,
                json!({"id": format!("v{}", n), "persona_id": "p1", "version": n}),
            );
        }
        store.seed(
            Table::PersonaVersions,
            json!({"id": "other", "persona_id": "p2", "version": 9}),
        );

        let rows = store
            .select(
                Table::PersonaVersions,
                &Query::new().eq("persona_id", "p1").order_desc("version"),
            )
            .await
            .unwrap();
        let versions: Vec<i64> = rows.iter().map(|r| r["version"].as_i64().unwrap()).collect();
        assert_eq!(versions, vec![3, 2, 1]);

        let rows = store
            .select(
                Table::PersonaVersions,
                &Query::new().eq("persona_id", "p1").order_asc("version"),
            )
            .await
            .unwrap();
        let versions: Vec<i64> = rows.iter().map(|r| r["version"].as_i64().unwrap()).collect();
        assert_eq!(versions, vec![1, 2, 3]);

        let one = store
            .select(Table::PersonaVersions, &Query::new().eq("version", 2))
            .await
            .unwrap();
        assert_eq!(one.len(), 1);
    }

    #[tokio::test]
    async fn test_upsert_merges_by_id() {
        let store = MemoryStore::new();
        store
            .upsert(Table::Personas, json!({"id": "p1", "name": "A", "share_id": "x"}))
            .await
            .unwrap();
        store
            .upsert(Table::Personas, json!({"id": "p1", "name": "B"}))
            .await
            .unwrap();

        let rows = store.rows(Table::Personas);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["name"], "B");
        assert_eq!(rows[0]["share_id"], "x");
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicate_id() {
        let store = MemoryStore::new();
        store.insert(Table::Tools, json!({"id": "t1"})).await.unwrap();
        assert!(store.insert(Table::Tools, json!({"id": "t1"})).await.is_err());
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let store = MemoryStore::new();
        store.fail_on(Table::Tools, StoreOp::Delete);
        assert!(store.delete(Table::Tools, &Query::new()).await.is_err());
        store.clear_failures();
        assert_eq!(store.delete(Table::Tools, &Query::new()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_write_log_skips_rejected_writes() {
        let store = MemoryStore::new();
        store.upsert(Table::Tools, json!({"id": "t1"})).await.unwrap();
        store.fail_on(Table::Tools, StoreOp::Upsert);
        assert!(store.upsert(Table::Tools, json!({"id": "t2"})).await.is_err());

        assert_eq!(store.writes(Table::Tools, StoreOp::Upsert), vec![json!({"id": "t1"})]);
        assert!(store.writes(Table::Tools, StoreOp::Insert).is_empty());
        store.clear_writes();
        assert!(store.writes(Table::Tools, StoreOp::Upsert).is_empty());
    }
}
