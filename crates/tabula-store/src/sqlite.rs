//! SQLite storage backend
//!
//! Every schema table shares one `records` table: rows are keyed by
//! `(table_name, record_id)` and carry the record as a JSON body. The
//! connection is created on the first `open`; later calls reuse it.

#![allow(clippy::result_large_err)]

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use rusqlite::{Connection, OptionalExtension};
use serde_json::Value;
use tabula_core::record::{merge_records, record_key, Record};
use tabula_core::storage::{Storage, StorageResult, StoreLayout};

use crate::db;
use crate::errors::{
    corrupt_body, duplicate_key, from_rusqlite, storage_failure, unknown_table, Result,
};
use crate::migrations::apply_migrations;

pub const BACKEND_NAME: &str = "sqlite";

#[derive(Debug, Clone, PartialEq, Eq)]
enum DbTarget {
    File(PathBuf),
    Memory,
}

pub struct SqliteStorage {
    target: DbTarget,
    layout: StoreLayout,
    conn: Mutex<Option<Connection>>,
}

impl SqliteStorage {
    /// Store backed by a database file (created on open)
    pub fn at_path(path: impl AsRef<Path>, layout: StoreLayout) -> Self {
        Self::with_target(DbTarget::File(path.as_ref().to_path_buf()), layout)
    }

    /// Store backed by a private in-memory database
    pub fn in_memory(layout: StoreLayout) -> Self {
        Self::with_target(DbTarget::Memory, layout)
    }

    fn with_target(target: DbTarget, layout: StoreLayout) -> Self {
        Self {
            target,
            layout,
            conn: Mutex::new(None),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        match &self.target {
            DbTarget::File(path) => Some(path),
            DbTarget::Memory => None,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<Connection>> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` against the open connection for a declared table
    fn with_conn<T>(
        &self,
        op: &str,
        table: &str,
        f: impl FnOnce(&mut Connection, &str) -> Result<T>,
    ) -> Result<T> {
        let key_field = self
            .layout
            .key_field(table)
            .ok_or_else(|| unknown_table(op, table))?;
        let mut guard = self.lock();
        let conn = guard
            .as_mut()
            .ok_or_else(|| storage_failure(op, table, "store is not open"))?;
        f(conn, key_field)
    }

    fn connect(&self) -> Result<Connection> {
        let mut conn = match &self.target {
            DbTarget::File(path) => db::open(path)?,
            DbTarget::Memory => db::open_in_memory()?,
        };
        db::configure(&conn)?;
        apply_migrations(&mut conn)?;
        Ok(conn)
    }
}

impl std::fmt::Debug for SqliteStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStorage")
            .field("target", &self.target)
            .field("open", &self.is_open())
            .finish()
    }
}

fn decode_body(table: &str, record_id: &str, body: &str) -> Result<Record> {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(corrupt_body(table, record_id, "record body is not an object")),
        Err(e) => Err(corrupt_body(table, record_id, &e.to_string())),
    }
}

fn encode_body(record: &Record) -> Result<String> {
    serde_json::to_string(record).map_err(Into::into)
}

fn load_body(conn: &Connection, table: &str, record_id: &str) -> Result<Option<Record>> {
    let body: Option<String> = conn
        .query_row(
            "SELECT body FROM records WHERE table_name = ?1 AND record_id = ?2",
            rusqlite::params![table, record_id],
            |row| row.get(0),
        )
        .optional()
        .map_err(from_rusqlite)?;

    body.map(|b| decode_body(table, record_id, &b)).transpose()
}

#[async_trait]
impl Storage for SqliteStorage {
    fn backend_name(&self) -> &'static str {
        BACKEND_NAME
    }

    fn is_open(&self) -> bool {
        self.lock().is_some()
    }

    async fn open(&self) -> StorageResult<()> {
        let mut guard = self.lock();
        if guard.is_some() {
            return Ok(());
        }
        *guard = Some(self.connect()?);
        tracing::debug!(backend = BACKEND_NAME, path = ?self.path(), "storage opened");
        Ok(())
    }

    fn table_names(&self) -> Vec<String> {
        self.layout.table_names()
    }

    async fn get(&self, table: &str, id: &str) -> StorageResult<Option<Record>> {
        self.with_conn("get", table, |conn, _| load_body(conn, table, id))
    }

    async fn to_array(&self, table: &str) -> StorageResult<Vec<Record>> {
        self.with_conn("to_array", table, |conn, _| {
            let mut stmt = conn
                .prepare(
                    "SELECT record_id, body FROM records
                     WHERE table_name = ?1 ORDER BY position",
                )
                .map_err(from_rusqlite)?;
            let rows = stmt
                .query_map([table], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
                })
                .map_err(from_rusqlite)?
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(from_rusqlite)?;

            rows.iter()
                .map(|(record_id, body)| decode_body(table, record_id, body))
                .collect()
        })
    }

    async fn count(&self, table: &str) -> StorageResult<usize> {
        self.with_conn("count", table, |conn, _| {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM records WHERE table_name = ?1",
                    [table],
                    |row| row.get(0),
                )
                .map_err(from_rusqlite)?;
            Ok(usize::try_from(count).unwrap_or(0))
        })
    }

    async fn add(&self, table: &str, mut record: Record) -> StorageResult<String> {
        self.with_conn("add", table, |conn, key_field| {
            let id = match record_key(&record, key_field) {
                Some(id) => id,
                None => {
                    let id = uuid::Uuid::now_v7().to_string();
                    record.insert(key_field.to_string(), id.clone().into());
                    id
                }
            };
            let body = encode_body(&record)?;

            let tx = conn.transaction().map_err(from_rusqlite)?;
            if load_body(&tx, table, &id)?.is_some() {
                return Err(duplicate_key(table, &id));
            }
            let now = chrono::Utc::now().timestamp();
            tx.execute(
                "INSERT INTO records (table_name, record_id, position, body, created_at, updated_at)
                 VALUES (?1, ?2,
                    (SELECT COALESCE(MAX(position), 0) + 1 FROM records WHERE table_name = ?1),
                    ?3, ?4, ?4)",
                rusqlite::params![table, id, body, now],
            )
            .map_err(from_rusqlite)?;
            tx.commit().map_err(from_rusqlite)?;

            Ok(id)
        })
    }

    async fn update(&self, table: &str, id: &str, changes: Record) -> StorageResult<usize> {
        self.with_conn("update", table, |conn, key_field| {
            let tx = conn.transaction().map_err(from_rusqlite)?;
            let Some(existing) = load_body(&tx, table, id)? else {
                return Ok(0);
            };

            let mut merged = merge_records(&existing, &changes);
            if let Some(original) = existing.get(key_field) {
                merged.insert(key_field.to_string(), original.clone());
            }
            let body = encode_body(&merged)?;

            let changed = tx
                .execute(
                    "UPDATE records SET body = ?1, updated_at = ?2
                     WHERE table_name = ?3 AND record_id = ?4",
                    rusqlite::params![body, chrono::Utc::now().timestamp(), table, id],
                )
                .map_err(from_rusqlite)?;
            tx.commit().map_err(from_rusqlite)?;

            Ok(changed)
        })
    }
}
