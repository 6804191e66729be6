//! Schema Model
//!
//! Turns the compact per-table schema notation into normalized field lists.
//! Pure and total: malformed or missing notation degrades to empty field lists.

pub mod model;
pub mod notation;

pub use model::{FieldDescriptor, SchemaModel, TableDescriptor, DEFAULT_KEY_FIELD};
pub use notation::parse_notation;
