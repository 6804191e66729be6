//! Generic record engine
//!
//! Table-agnostic get/list/create/update over a storage backend, driven by the
//! schema model. The schema only orders fields for presentation: unknown
//! fields pass through to storage untouched and storage decides what it keeps.
//!
//! Every operation re-checks that storage is open and opens it if not. Two
//! near-simultaneous first calls may both reach `open`; backends make that
//! idempotent.
//!
//! Concurrent `update`s of one record are not serialised here. The second
//! merge reads whatever the first left behind, or may not, depending on how
//! the calls interleave. Callers that care serialise at the call site (the
//! editor does so by taking `&mut self` for `submit`).

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use serde_json::Value;
use tabula_core::errors::{ExError, TabulaError};
use tabula_core::record::{display_label, merge_records, record_key, value_text, Record};
use tabula_core::relations::{infer_edges, neighbors, target_table_for};
use tabula_core::storage::{is_system_table, Storage};
use tabula_core::{log_op_end, log_op_error, log_op_start};
use tabula_core::{IrregularPlurals, RelationshipEdge, SchemaModel};

use crate::Result;

/// Fields that contribute to a record link besides the identity
const LINK_FIELDS: [&str; 2] = ["realmId", "name"];

/// Which field set a caller wants from `fields_for`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldView {
    /// Form fields: the primary key is system-assigned and left out
    Editable,
    /// Every declared field, primary key included
    Displayable,
}

/// One selectable value for a foreign-key field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ForeignKeyOption {
    pub id: String,
    pub label: String,
}

pub struct RecordEngine<S: Storage + ?Sized = dyn Storage> {
    schema: Arc<SchemaModel>,
    storage: Arc<S>,
    plurals: IrregularPlurals,
}

impl<S: Storage + ?Sized> Clone for RecordEngine<S> {
    fn clone(&self) -> Self {
        Self {
            schema: self.schema.clone(),
            storage: self.storage.clone(),
            plurals: self.plurals.clone(),
        }
    }
}

impl<S: Storage + ?Sized> RecordEngine<S> {
    pub fn new(schema: Arc<SchemaModel>, storage: Arc<S>) -> Self {
        Self {
            schema,
            storage,
            plurals: IrregularPlurals::default(),
        }
    }

    /// Replace the irregular plural table used for foreign-key targets
    pub fn with_plurals(mut self, plurals: IrregularPlurals) -> Self {
        self.plurals = plurals;
        self
    }

    pub fn schema(&self) -> &SchemaModel {
        &self.schema
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn plurals(&self) -> &IrregularPlurals {
        &self.plurals
    }

    /// Field names of `table` in declaration order; empty for unknown tables
    pub fn fields_for(&self, table: &str, view: FieldView) -> Vec<String> {
        let descriptor = self.schema.parse_table(table);
        match view {
            FieldView::Editable => descriptor.editable_field_names(),
            FieldView::Displayable => descriptor.field_names(),
        }
    }

    pub fn editable_fields(&self, table: &str) -> Vec<String> {
        self.fields_for(table, FieldView::Editable)
    }

    pub fn displayable_fields(&self, table: &str) -> Vec<String> {
        self.fields_for(table, FieldView::Displayable)
    }

    /// Identifying field of `table` (declared primary key, else `id`)
    pub fn key_field(&self, table: &str) -> String {
        self.schema.parse_table(table).key_field().to_string()
    }

    pub fn edges(&self) -> Vec<RelationshipEdge> {
        infer_edges(&self.schema, &self.plurals)
    }

    /// Edges touching `table`, outgoing first
    pub fn neighbors(&self, table: &str) -> Vec<RelationshipEdge> {
        let edges = self.edges();
        neighbors(&edges, table).into_iter().cloned().collect()
    }

    /// Storage tables without the reserved system prefix, in storage order
    pub fn user_tables(&self) -> Vec<String> {
        self.storage
            .table_names()
            .into_iter()
            .filter(|name| !is_system_table(name))
            .collect()
    }

    /// Open storage unless it already is
    ///
    /// # Errors
    ///
    /// `StorageFailure` when the backend cannot be opened.
    pub async fn ensure_open(&self) -> Result<()> {
        if !self.storage.is_open() {
            self.storage.open().await?;
        }
        Ok(())
    }

    /// Fetch one record; `Ok(None)` when the id is absent
    ///
    /// # Errors
    ///
    /// `UnknownTable` when storage does not know `table`, `StorageFailure` on
    /// backend errors.
    pub async fn get(&self, table: &str, id: &str) -> Result<Option<Record>> {
        log_op_start!("get", table = table, record_id = id);
        let start = Instant::now();

        let result = self.get_impl(table, id).await.map_err(|e| {
            log_op_error!(
                "get",
                e.clone(),
                duration_ms = start.elapsed().as_millis() as u64,
                table = table,
                record_id = id
            );
            e
        })?;

        log_op_end!(
            "get",
            duration_ms = start.elapsed().as_millis() as u64,
            table = table,
            record_id = id,
            found = result.is_some()
        );
        Ok(result)
    }

    async fn get_impl(&self, table: &str, id: &str) -> Result<Option<Record>> {
        self.ensure_open().await?;
        self.storage.get(table, id).await
    }

    /// All records of `table`; empty (not an error) when there are none
    ///
    /// # Errors
    ///
    /// `UnknownTable` when storage does not know `table`, `StorageFailure` on
    /// backend errors.
    pub async fn list(&self, table: &str) -> Result<Vec<Record>> {
        log_op_start!("list", table = table);
        let start = Instant::now();

        let rows = self.list_impl(table).await.map_err(|e| {
            log_op_error!(
                "list",
                e.clone(),
                duration_ms = start.elapsed().as_millis() as u64,
                table = table
            );
            e
        })?;

        log_op_end!(
            "list",
            duration_ms = start.elapsed().as_millis() as u64,
            table = table,
            row_count = rows.len() as u64
        );
        Ok(rows)
    }

    async fn list_impl(&self, table: &str) -> Result<Vec<Record>> {
        self.ensure_open().await?;
        self.storage.to_array(table).await
    }

    /// Persist a new record and return it with its assigned identity
    ///
    /// Only requires `table` to be declared in the schema; the fields of
    /// `data` are not checked against it.
    ///
    /// # Errors
    ///
    /// `UnknownTable` for tables absent from the schema, `StorageFailure` when
    /// storage rejects the record.
    pub async fn create(&self, table: &str, data: Record) -> Result<Record> {
        log_op_start!("create", table = table);
        let start = Instant::now();

        let record = self.create_impl(table, data).await.map_err(|e| {
            log_op_error!(
                "create",
                e.clone(),
                duration_ms = start.elapsed().as_millis() as u64,
                table = table
            );
            e
        })?;

        let record_id = record_key(&record, &self.key_field(table)).unwrap_or_default();
        log_op_end!(
            "create",
            duration_ms = start.elapsed().as_millis() as u64,
            table = table,
            record_id = record_id.as_str()
        );
        Ok(record)
    }

    async fn create_impl(&self, table: &str, data: Record) -> Result<Record> {
        if !self.schema.contains(table) {
            return Err(TabulaError::UnknownTable {
                table: table.to_string(),
            }
            .into());
        }
        self.ensure_open().await?;

        let id = self.storage.add(table, data.clone()).await?;
        match self.storage.get(table, &id).await? {
            Some(stored) => Ok(stored),
            None => {
                let mut record = data;
                record.insert(self.key_field(table), Value::String(id));
                Ok(record)
            }
        }
    }

    /// Merge `data` over an existing record and persist the result
    ///
    /// Fields absent from `data` are kept; the identity never changes.
    ///
    /// # Errors
    ///
    /// `NotFound` when `id` does not resolve (nothing is written),
    /// `UnknownTable` or `StorageFailure` from storage.
    pub async fn update(&self, table: &str, id: &str, data: Record) -> Result<Record> {
        log_op_start!("update", table = table, record_id = id);
        let start = Instant::now();

        let record = self.update_impl(table, id, data).await.map_err(|e| {
            log_op_error!(
                "update",
                e.clone(),
                duration_ms = start.elapsed().as_millis() as u64,
                table = table,
                record_id = id
            );
            e
        })?;

        log_op_end!(
            "update",
            duration_ms = start.elapsed().as_millis() as u64,
            table = table,
            record_id = id
        );
        Ok(record)
    }

    async fn update_impl(&self, table: &str, id: &str, data: Record) -> Result<Record> {
        self.ensure_open().await?;

        let existing = self
            .storage
            .get(table, id)
            .await?
            .ok_or_else(|| record_not_found(table, id))?;

        let changed = self.storage.update(table, id, data.clone()).await?;
        if changed == 0 {
            // Removed between the read and the write
            return Err(record_not_found(table, id));
        }

        let key_field = self.key_field(table);
        let mut merged = merge_records(&existing, &data);
        if let Some(original) = existing.get(&key_field) {
            merged.insert(key_field, original.clone());
        }
        Ok(merged)
    }

    /// Number of records in `table`
    ///
    /// # Errors
    ///
    /// `UnknownTable` or `StorageFailure` from storage.
    pub async fn count(&self, table: &str) -> Result<usize> {
        self.ensure_open().await?;
        self.storage.count(table).await
    }

    /// Choices for a foreign-key field: the target table's records
    ///
    /// Fields that are not foreign keys, and targets storage does not know,
    /// yield no options.
    ///
    /// # Errors
    ///
    /// `StorageFailure` when listing the target table fails.
    pub async fn foreign_key_options(&self, field: &str) -> Result<Vec<ForeignKeyOption>> {
        let Some(target) = target_table_for(field, &self.plurals) else {
            return Ok(Vec::new());
        };
        if !self.storage.table_names().contains(&target) {
            tracing::debug!(field, target = %target, "foreign key target not in storage");
            return Ok(Vec::new());
        }

        let key_field = self.key_field(&target);
        let rows = self.list(&target).await?;
        Ok(rows
            .iter()
            .filter_map(|row| {
                let id = record_key(row, &key_field)?;
                Some(ForeignKeyOption {
                    label: display_label(row, &key_field),
                    id,
                })
            })
            .collect())
    }

    /// Navigation link to a single record: `?id=..&realmId=..&name=..#record/<table>`
    ///
    /// Only parameters the record carries are included. Values are written as
    /// they are, without escaping.
    pub fn record_link(&self, table: &str, record: &Record) -> String {
        let key_field = self.key_field(table);
        let mut params = Vec::new();

        if let Some(id) = record_key(record, &key_field) {
            params.push(format!("id={}", id));
        }
        for field in LINK_FIELDS {
            if field == key_field {
                continue;
            }
            let text = record.get(field).map(value_text).unwrap_or_default();
            if !text.is_empty() {
                params.push(format!("{}={}", field, text));
            }
        }

        let query = if params.is_empty() {
            String::new()
        } else {
            format!("?{}", params.join("&"))
        };
        format!("{}#record/{}", query, table)
    }
}

fn record_not_found(table: &str, id: &str) -> ExError {
    TabulaError::RecordNotFound {
        table: table.to_string(),
        record_id: id.to_string(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tabula_core::errors::ExErrorKind;
    use tabula_core::SchemaConfig;
    use tabula_store::MemoryStorage;

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    fn engine() -> RecordEngine<MemoryStorage> {
        let schema = Arc::new(SchemaConfig::builtin().schema_model());
        let storage = Arc::new(MemoryStorage::from(schema.as_ref()));
        RecordEngine::new(schema, storage)
    }

    #[test]
    fn test_field_views() {
        let engine = engine();
        assert_eq!(engine.displayable_fields("members"), vec!["id", "name", "realmId"]);
        assert_eq!(engine.editable_fields("members"), vec!["name", "realmId"]);
        assert_eq!(engine.editable_fields("roles"), vec!["realmId", "name"]);
        assert!(engine.fields_for("ghosts", FieldView::Displayable).is_empty());
    }

    #[test]
    fn test_key_field_defaults_to_id() {
        let engine = engine();
        assert_eq!(engine.key_field("realms"), "realmId");
        assert_eq!(engine.key_field("roles"), "id");
        assert_eq!(engine.key_field("ghosts"), "id");
    }

    #[test]
    fn test_record_link() {
        let engine = engine();
        let member = record(json!({"id": "m1", "name": "Ann", "realmId": "r1"}));
        assert_eq!(
            engine.record_link("members", &member),
            "?id=m1&realmId=r1&name=Ann#record/members"
        );

        let realm = record(json!({"realmId": "r1", "name": "Home"}));
        assert_eq!(
            engine.record_link("realms", &realm),
            "?id=r1&name=Home#record/realms"
        );

        assert_eq!(engine.record_link("roles", &Record::new()), "#record/roles");
    }

    #[tokio::test]
    async fn test_operations_open_storage_lazily() {
        let engine = engine();
        assert!(!engine.storage().is_open());

        assert!(engine.list("members").await.unwrap().is_empty());
        engine.get("members", "m1").await.unwrap();
        assert_eq!(engine.storage().open_count(), 1);
    }

    #[tokio::test]
    async fn test_create_unknown_table() {
        let engine = engine();
        let err = engine
            .create("ghosts", record(json!({"name": "x"})))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::UnknownTable);
        // Rejected before storage was touched
        assert!(!engine.storage().is_open());
    }

    #[tokio::test]
    async fn test_update_not_found_writes_nothing() {
        let engine = engine();
        let err = engine
            .update("members", "ghost", record(json!({"name": "x"})))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::NotFound);
        assert_eq!(err.record_id(), Some("ghost"));
        assert_eq!(engine.count("members").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_foreign_key_options() {
        let engine = engine();
        engine
            .create("realms", record(json!({"realmId": "r1", "name": "Home"})))
            .await
            .unwrap();
        engine
            .create("realms", record(json!({"realmId": "r2"})))
            .await
            .unwrap();

        let options = engine.foreign_key_options("realmId").await.unwrap();
        assert_eq!(
            options,
            vec![
                ForeignKeyOption {
                    id: "r1".to_string(),
                    label: "Home".to_string()
                },
                ForeignKeyOption {
                    id: "r2".to_string(),
                    label: "r2".to_string()
                },
            ]
        );

        assert!(engine.foreign_key_options("name").await.unwrap().is_empty());
        assert!(engine.foreign_key_options("teamId").await.unwrap().is_empty());
    }
}
