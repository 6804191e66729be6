//! Tabula Store - storage backends for the record engine
//!
//! Provides:
//! - `MemoryStorage`: in-process tables for tests and throwaway sessions
//! - `SqliteStorage`: JSON record bodies in SQLite with a migrations framework

pub mod db;
pub mod errors;
pub mod memory;
pub mod migrations;
pub mod sqlite;

// Re-export key types
pub use errors::Result;
pub use memory::MemoryStorage;
pub use sqlite::SqliteStorage;
