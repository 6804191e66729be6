//! Tabula Core - schema introspection and reactive navigation kernel
//!
//! This crate provides the pure building blocks of the Tabula data explorer:
//! - Schema notation parsing into normalized table descriptors
//! - Relationship inference from foreign-key naming conventions
//! - A synchronous publish/subscribe channel and the navigation state slot
//! - The open record shape and the storage collaborator interface
//! - Error and logging facilities shared by every crate in the workspace

pub mod channel;
pub mod config;
pub mod errors;
pub mod logging_facility;
pub mod navigation;
pub mod record;
pub mod relations;
pub mod schema;
pub mod storage;

// Used by the logging macros
pub use tabula_core_types as core_types;

// Re-export commonly used types
pub use channel::{Channel, SubscriptionId};
pub use config::SchemaConfig;
pub use errors::{ExError, ExErrorKind, Result, TabulaError};
pub use navigation::{NavigationEvent, NavigationState, StateChannel};
pub use record::Record;
pub use relations::{infer_edges, IrregularPlurals, RelationshipEdge};
pub use schema::{FieldDescriptor, SchemaModel, TableDescriptor};
pub use storage::{Storage, StorageResult, StoreLayout, TableHandle};
