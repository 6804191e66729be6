#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use tabula_core::{Record, SchemaConfig, SchemaModel, Storage, StorageResult, StoreLayout};
use tabula_engine::RecordEngine;
use tabula_store::MemoryStorage;

type Hook = Box<dyn FnOnce() + Send>;

/// Memory store that can run a callback in the middle of `to_array`
///
/// Stands in for another event being handled while a list fetch is suspended.
pub struct InterleavingStorage {
    inner: MemoryStorage,
    on_list: Mutex<Option<Hook>>,
}

impl InterleavingStorage {
    pub fn new(layout: StoreLayout) -> Self {
        Self {
            inner: MemoryStorage::new(layout),
            on_list: Mutex::new(None),
        }
    }

    pub fn inner(&self) -> &MemoryStorage {
        &self.inner
    }

    /// Run `hook` during the next `to_array`, before rows are read
    pub fn during_next_list(&self, hook: impl FnOnce() + Send + 'static) {
        *self.on_list.lock().unwrap() = Some(Box::new(hook));
    }
}

#[async_trait]
impl Storage for InterleavingStorage {
    fn backend_name(&self) -> &'static str {
        "interleaving"
    }

    fn is_open(&self) -> bool {
        self.inner.is_open()
    }

    async fn open(&self) -> StorageResult<()> {
        self.inner.open().await
    }

    fn table_names(&self) -> Vec<String> {
        self.inner.table_names()
    }

    async fn get(&self, table: &str, id: &str) -> StorageResult<Option<Record>> {
        self.inner.get(table, id).await
    }

    async fn to_array(&self, table: &str) -> StorageResult<Vec<Record>> {
        let hook = self.on_list.lock().unwrap().take();
        if let Some(hook) = hook {
            hook();
        }
        self.inner.to_array(table).await
    }

    async fn count(&self, table: &str) -> StorageResult<usize> {
        self.inner.count(table).await
    }

    async fn add(&self, table: &str, record: Record) -> StorageResult<String> {
        self.inner.add(table, record).await
    }

    async fn update(&self, table: &str, id: &str, changes: Record) -> StorageResult<usize> {
        self.inner.update(table, id, changes).await
    }
}

pub fn sample_schema() -> Arc<SchemaModel> {
    Arc::new(SchemaConfig::builtin().schema_model())
}

/// Engine over a fresh memory store holding the sample tables plus `$sync`
pub fn memory_engine() -> RecordEngine<MemoryStorage> {
    let schema = sample_schema();
    let layout = StoreLayout::from_schema(&schema).with_table("$sync", "id");
    RecordEngine::new(schema, Arc::new(MemoryStorage::new(layout)))
}

pub fn interleaving_engine() -> RecordEngine<InterleavingStorage> {
    let schema = sample_schema();
    let layout = StoreLayout::from_schema(&schema);
    RecordEngine::new(schema, Arc::new(InterleavingStorage::new(layout)))
}

pub fn record(value: Value) -> Record {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {}", other),
    }
}
