//! Storage collaborator interface
//!
//! The persistence engine is external; this is the surface the record engine
//! needs from it. Every operation is an await point. `open` must be idempotent:
//! two callers racing to open the same store both succeed against one
//! connection.

use async_trait::async_trait;

use crate::errors::ExError;
use crate::record::Record;
use crate::schema::SchemaModel;

pub type StorageResult<T> = std::result::Result<T, ExError>;

/// Tables whose names start with this prefix are internal to the store
pub const SYSTEM_TABLE_PREFIX: char = '$';

pub fn is_system_table(name: &str) -> bool {
    name.starts_with(SYSTEM_TABLE_PREFIX)
}

#[async_trait]
pub trait Storage: Send + Sync {
    /// Backend name for logging/debugging
    fn backend_name(&self) -> &'static str;

    fn is_open(&self) -> bool;

    /// Open the store; a no-op when already open
    async fn open(&self) -> StorageResult<()>;

    /// Every table the store knows, system tables included
    fn table_names(&self) -> Vec<String>;

    /// Fetch one record; `Ok(None)` when the id is absent
    async fn get(&self, table: &str, id: &str) -> StorageResult<Option<Record>>;

    /// All records in insertion order
    async fn to_array(&self, table: &str) -> StorageResult<Vec<Record>>;

    async fn count(&self, table: &str) -> StorageResult<usize>;

    /// Persist a new record and return its identity
    ///
    /// The store assigns an identity when the record lacks one.
    async fn add(&self, table: &str, record: Record) -> StorageResult<String>;

    /// Merge `changes` into an existing record
    ///
    /// Returns the number of records changed: 0 when `id` is absent.
    async fn update(&self, table: &str, id: &str, changes: Record) -> StorageResult<usize>;

    fn table(&self, name: &str) -> TableHandle<'_, Self>
    where
        Self: Sized,
    {
        TableHandle::new(self, name)
    }
}

/// Per-table view over a storage backend
pub struct TableHandle<'a, S: Storage + ?Sized> {
    storage: &'a S,
    name: String,
}

impl<'a, S: Storage + ?Sized> TableHandle<'a, S> {
    pub fn new(storage: &'a S, name: impl Into<String>) -> Self {
        Self {
            storage,
            name: name.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn get(&self, id: &str) -> StorageResult<Option<Record>> {
        self.storage.get(&self.name, id).await
    }

    pub async fn to_array(&self) -> StorageResult<Vec<Record>> {
        self.storage.to_array(&self.name).await
    }

    pub async fn count(&self) -> StorageResult<usize> {
        self.storage.count(&self.name).await
    }

    pub async fn add(&self, record: Record) -> StorageResult<String> {
        self.storage.add(&self.name, record).await
    }

    pub async fn update(&self, id: &str, changes: Record) -> StorageResult<usize> {
        self.storage.update(&self.name, id, changes).await
    }
}

/// Declared tables and the field each one is keyed by
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreLayout {
    tables: Vec<(String, String)>,
}

impl StoreLayout {
    /// One store table per schema table, keyed by its identifying field
    pub fn from_schema(schema: &SchemaModel) -> Self {
        Self {
            tables: schema
                .tables()
                .iter()
                .map(|t| (t.name.clone(), t.key_field().to_string()))
                .collect(),
        }
    }

    /// Add (or re-key) a table
    pub fn with_table(mut self, name: impl Into<String>, key_field: impl Into<String>) -> Self {
        let name = name.into();
        let key_field = key_field.into();
        match self.tables.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = key_field,
            None => self.tables.push((name, key_field)),
        }
        self
    }

    pub fn key_field(&self, table: &str) -> Option<&str> {
        self.tables
            .iter()
            .find(|(n, _)| n == table)
            .map(|(_, k)| k.as_str())
    }

    pub fn table_names(&self) -> Vec<String> {
        self.tables.iter().map(|(n, _)| n.clone()).collect()
    }

    pub fn tables(&self) -> impl Iterator<Item = (&str, &str)> {
        self.tables.iter().map(|(n, k)| (n.as_str(), k.as_str()))
    }
}
