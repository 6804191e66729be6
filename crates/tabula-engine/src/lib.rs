//! Tabula Engine - record operations and view models
//!
//! Coordinates the schema model, relationship inference and a storage
//! backend into the operations views use:
//! - Generic get/list/create/update over any declared table
//! - The record editor lifecycle and save notifications
//! - Graph and records-list view models fed by the navigation channel
//!
//! ## Logging Ownership
//!
//! The engine owns lifecycle logging for record operations (`log_op_start!`,
//! `log_op_end!`, `log_op_error!`). Storage backends and core only use
//! `tracing::debug!()` for internal details.

pub mod editor;
pub mod graph;
pub mod notify;
pub mod records;
pub mod viewer;

use tabula_core::errors::ExError;

/// Result type alias using ExError
pub type Result<T> = std::result::Result<T, ExError>;

pub use editor::{EditorState, RecordEditor};
pub use graph::{TableGraph, TableNode};
pub use notify::{SaveNotice, SaveNotifier};
pub use records::{FieldView, ForeignKeyOption, RecordEngine};
pub use viewer::{Generation, GenerationTicket, RecordLink, RecordsViewer};
