#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{record, sample_layout};
use serde_json::json;
use tabula_core::Storage;
use tabula_store::migrations::applied_migrations;
use tabula_store::{db, SqliteStorage};
use tempfile::TempDir;

#[tokio::test]
async fn test_records_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("store.db");

    {
        let store = SqliteStorage::at_path(&path, sample_layout());
        store.open().await.unwrap();
        store
            .add("realms", record(json!({"realmId": "r1", "name": "Home"})))
            .await
            .unwrap();
    }

    let store = SqliteStorage::at_path(&path, sample_layout());
    store.open().await.unwrap();
    let realm = store.get("realms", "r1").await.unwrap().unwrap();
    assert_eq!(realm["name"], json!("Home"));
}

#[tokio::test]
async fn test_open_applies_migrations_once() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("store.db");

    for _ in 0..2 {
        let store = SqliteStorage::at_path(&path, sample_layout());
        store.open().await.unwrap();
    }

    let conn = db::open(&path).unwrap();
    assert_eq!(
        applied_migrations(&conn).unwrap(),
        vec!["001_records", "002_records_position_index"]
    );
}
