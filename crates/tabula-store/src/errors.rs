//! Error handling for tabula-store
//!
//! Wraps tabula-core ExError with store-specific helpers

use tabula_core::errors::{ExError, ExErrorKind};

/// Result type alias using ExError
pub type Result<T> = std::result::Result<T, ExError>;

/// Create a database error from rusqlite::Error
pub fn from_rusqlite(err: rusqlite::Error) -> ExError {
    ExError::new(ExErrorKind::StorageFailure)
        .with_op("sqlite")
        .with_message(err.to_string())
}

/// Table not declared in the store layout
pub fn unknown_table(op: &str, table: &str) -> ExError {
    ExError::new(ExErrorKind::UnknownTable)
        .with_op(op.to_string())
        .with_table(table.to_string())
        .with_message(format!("Unknown table: {}", table))
}

/// Generic storage failure for a table operation
pub fn storage_failure(op: &str, table: &str, reason: &str) -> ExError {
    ExError::new(ExErrorKind::StorageFailure)
        .with_op(op.to_string())
        .with_table(table.to_string())
        .with_message(reason.to_string())
}

/// `add` with an identity already present in the table
pub fn duplicate_key(table: &str, record_id: &str) -> ExError {
    ExError::new(ExErrorKind::StorageFailure)
        .with_op("add")
        .with_table(table.to_string())
        .with_record_id(record_id.to_string())
        .with_message(format!("Key already exists: {}/{}", table, record_id))
}

/// Create a migration error
pub fn migration_error(migration_id: &str, reason: &str) -> ExError {
    ExError::new(ExErrorKind::StorageFailure)
        .with_op("migration")
        .with_message(format!("Migration {} failed: {}", migration_id, reason))
}

/// Create a checksum mismatch error
pub fn checksum_mismatch(migration_id: &str, expected: &str, actual: &str) -> ExError {
    ExError::new(ExErrorKind::StorageFailure)
        .with_op("migration_checksum")
        .with_message(format!(
            "Checksum mismatch for migration {}: expected {}, got {}",
            migration_id, expected, actual
        ))
}

/// Create an IO error
pub fn io_error(operation: &str, err: std::io::Error) -> ExError {
    ExError::new(ExErrorKind::Io)
        .with_op(operation.to_string())
        .with_message(err.to_string())
}

/// Stored body that is not a JSON object
pub fn corrupt_body(table: &str, record_id: &str, reason: &str) -> ExError {
    ExError::new(ExErrorKind::Serialization)
        .with_op("decode_record")
        .with_table(table.to_string())
        .with_record_id(record_id.to_string())
        .with_message(reason.to_string())
}
