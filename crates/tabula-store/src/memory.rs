//! In-memory storage backend
//!
//! HashMap-of-tables store for tests and `--memory` sessions. Rows keep their
//! insertion order. Operations on a store that has not been opened fail, so
//! callers must go through `open` exactly as they would with SQLite.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tabula_core::record::{merge_records, record_key, Record};
use tabula_core::schema::SchemaModel;
use tabula_core::storage::{Storage, StorageResult, StoreLayout};

use crate::errors::{duplicate_key, storage_failure, unknown_table, Result};

pub const BACKEND_NAME: &str = "memory";

/// In-memory store keyed by the layout's tables
#[derive(Debug)]
pub struct MemoryStorage {
    layout: StoreLayout,
    tables: Mutex<HashMap<String, Vec<Record>>>,
    open: AtomicBool,
    open_count: AtomicUsize,
    fail_next: Mutex<Option<String>>,
}

impl MemoryStorage {
    /// Create a closed store with one empty table per layout entry
    pub fn new(layout: StoreLayout) -> Self {
        let tables = layout
            .table_names()
            .into_iter()
            .map(|name| (name, Vec::new()))
            .collect();
        Self {
            layout,
            tables: Mutex::new(tables),
            open: AtomicBool::new(false),
            open_count: AtomicUsize::new(0),
            fail_next: Mutex::new(None),
        }
    }

    /// Make the next table operation fail with `StorageFailure`
    pub fn fail_next(&self, reason: impl Into<String>) {
        *self
            .fail_next
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(reason.into());
    }

    /// Number of times `open` actually transitioned the store to open
    pub fn open_count(&self) -> usize {
        self.open_count.load(Ordering::SeqCst)
    }

    fn rows(&self) -> MutexGuard<'_, HashMap<String, Vec<Record>>> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Common gate for every table operation: open, fault injection, known table
    fn check(&self, op: &str, table: &str) -> Result<&str> {
        if !self.is_open() {
            return Err(storage_failure(op, table, "store is not open"));
        }
        if let Some(reason) = self
            .fail_next
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            return Err(storage_failure(op, table, &reason));
        }
        self.layout
            .key_field(table)
            .ok_or_else(|| unknown_table(op, table))
    }
}

/// Position of the row whose key matches `id`
fn find_row(rows: &[Record], key_field: &str, id: &str) -> Option<usize> {
    rows.iter()
        .position(|row| record_key(row, key_field).as_deref() == Some(id))
}

#[async_trait]
impl Storage for MemoryStorage {
    fn backend_name(&self) -> &'static str {
        BACKEND_NAME
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    async fn open(&self) -> StorageResult<()> {
        if self
            .open
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            self.open_count.fetch_add(1, Ordering::SeqCst);
            tracing::debug!(backend = BACKEND_NAME, "storage opened");
        }
        Ok(())
    }

    fn table_names(&self) -> Vec<String> {
        self.layout.table_names()
    }

    async fn get(&self, table: &str, id: &str) -> StorageResult<Option<Record>> {
        let key_field = self.check("get", table)?;
        let tables = self.rows();
        let rows = tables.get(table).map(Vec::as_slice).unwrap_or_default();
        Ok(find_row(rows, key_field, id).map(|pos| rows[pos].clone()))
    }

    async fn to_array(&self, table: &str) -> StorageResult<Vec<Record>> {
        self.check("to_array", table)?;
        Ok(self.rows().get(table).cloned().unwrap_or_default())
    }

    async fn count(&self, table: &str) -> StorageResult<usize> {
        self.check("count", table)?;
        Ok(self.rows().get(table).map(Vec::len).unwrap_or(0))
    }

    async fn add(&self, table: &str, mut record: Record) -> StorageResult<String> {
        let key_field = self.check("add", table)?;
        let id = match record_key(&record, key_field) {
            Some(id) => id,
            None => {
                let id = uuid::Uuid::now_v7().to_string();
                record.insert(key_field.to_string(), id.clone().into());
                id
            }
        };

        let mut tables = self.rows();
        let rows = tables.entry(table.to_string()).or_default();
        if find_row(rows, key_field, &id).is_some() {
            return Err(duplicate_key(table, &id));
        }
        rows.push(record);
        Ok(id)
    }

    async fn update(&self, table: &str, id: &str, changes: Record) -> StorageResult<usize> {
        let key_field = self.check("update", table)?;
        let mut tables = self.rows();
        let Some(rows) = tables.get_mut(table) else {
            return Ok(0);
        };
        let Some(pos) = find_row(rows, key_field, id) else {
            return Ok(0);
        };

        let mut merged = merge_records(&rows[pos], &changes);
        // The identity is fixed once assigned
        if let Some(original) = rows[pos].get(key_field) {
            merged.insert(key_field.to_string(), original.clone());
        }
        rows[pos] = merged;
        Ok(1)
    }
}

impl From<&SchemaModel> for MemoryStorage {
    fn from(schema: &SchemaModel) -> Self {
        Self::new(StoreLayout::from_schema(schema))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use tabula_core::errors::ExErrorKind;

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    fn layout() -> StoreLayout {
        StoreLayout::default()
            .with_table("realms", "realmId")
            .with_table("members", "id")
    }

    async fn opened() -> MemoryStorage {
        let store = MemoryStorage::new(layout());
        store.open().await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_operations_require_open() {
        let store = MemoryStorage::new(layout());
        let err = store.count("members").await.unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::StorageFailure);
    }

    #[tokio::test]
    async fn test_open_is_idempotent() {
        let store = MemoryStorage::new(layout());
        store.open().await.unwrap();
        store.open().await.unwrap();
        assert!(store.is_open());
        assert_eq!(store.open_count(), 1);
    }

    #[tokio::test]
    async fn test_add_assigns_uuid_when_key_missing() {
        let store = opened().await;
        let id = store
            .add("members", record(json!({"name": "Ann"})))
            .await
            .unwrap();

        assert!(uuid::Uuid::parse_str(&id).is_ok());
        let stored = store.get("members", &id).await.unwrap().unwrap();
        assert_eq!(stored["id"], json!(id));
        assert_eq!(stored["name"], json!("Ann"));
    }

    #[tokio::test]
    async fn test_add_respects_declared_key_field() {
        let store = opened().await;
        let id = store
            .add("realms", record(json!({"realmId": "r1", "name": "Home"})))
            .await
            .unwrap();
        assert_eq!(id, "r1");
        assert!(store.get("realms", "r1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_add_rejects_duplicate_key() {
        let store = opened().await;
        store
            .add("members", record(json!({"id": "m1"})))
            .await
            .unwrap();
        let err = store
            .add("members", record(json!({"id": "m1"})))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::StorageFailure);
        assert_eq!(store.count("members").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_update_merges_and_keeps_identity() {
        let store = opened().await;
        store
            .add("members", record(json!({"id": "m1", "name": "Ann", "realmId": "r1"})))
            .await
            .unwrap();

        let changed = store
            .update("members", "m1", record(json!({"name": "Bo", "id": "forged"})))
            .await
            .unwrap();
        assert_eq!(changed, 1);

        let stored = store.get("members", "m1").await.unwrap().unwrap();
        assert_eq!(
            Value::Object(stored),
            json!({"id": "m1", "name": "Bo", "realmId": "r1"})
        );
    }

    #[tokio::test]
    async fn test_update_missing_returns_zero() {
        let store = opened().await;
        let changed = store
            .update("members", "nope", record(json!({"name": "x"})))
            .await
            .unwrap();
        assert_eq!(changed, 0);
        assert_eq!(store.count("members").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unknown_table() {
        let store = opened().await;
        let err = store.to_array("ghosts").await.unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::UnknownTable);
        assert_eq!(err.table(), Some("ghosts"));
    }

    #[tokio::test]
    async fn test_fail_next_affects_one_call() {
        let store = opened().await;
        store.fail_next("disk full");

        let err = store.to_array("members").await.unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::StorageFailure);
        assert!(err.message().contains("disk full"));

        assert!(store.to_array("members").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rows_keep_insertion_order() {
        let store = opened().await;
        for id in ["c", "a", "b"] {
            store
                .add("members", record(json!({"id": id})))
                .await
                .unwrap();
        }
        let ids: Vec<String> = store
            .table("members")
            .to_array()
            .await
            .unwrap()
            .iter()
            .filter_map(|r| record_key(r, "id"))
            .collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }
}
