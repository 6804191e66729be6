use serde_json::Value;
use tabula_core::{Record, SchemaConfig, StoreLayout};

/// Layout for the bundled sample schema plus one system table
#[allow(dead_code)]
pub fn sample_layout() -> StoreLayout {
    StoreLayout::from_schema(&SchemaConfig::builtin().schema_model()).with_table("$sync", "id")
}

#[allow(dead_code)]
pub fn record(value: Value) -> Record {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {}", other),
    }
}
