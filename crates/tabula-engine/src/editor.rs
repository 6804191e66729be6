//! Record editor lifecycle
//!
//! ```text
//! Uninitialized -> FieldsBuilt -> Idle
//!                             \-> Loading -> Populated
//! Idle | Populated -> Submitting -> Saved -> Hidden
//!                               \-> SaveFailed -> Populated
//! any state but Hidden -> Hidden (cancel)
//! Uninitialized | Hidden -> FieldsBuilt (open)
//! ```
//!
//! Save routing is structural: a working copy that carries the table's
//! identifying field is updated, anything else is created. A failed save
//! passes through `SaveFailed` back to `Populated` with the working copy
//! untouched, so the caller can edit or retry.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tabula_core::errors::{ExError, ExErrorKind, TabulaError};
use tabula_core::record::{record_key, Record};
use tabula_core::storage::Storage;

use crate::notify::{SaveNotice, SaveNotifier};
use crate::records::RecordEngine;
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorState {
    Uninitialized,
    FieldsBuilt,
    /// Blank form ready for input
    Idle,
    Loading,
    /// Form filled from a stored record
    Populated,
    Submitting,
    Saved,
    SaveFailed,
    Hidden,
}

impl EditorState {
    pub fn as_str(&self) -> &'static str {
        match self {
            EditorState::Uninitialized => "uninitialized",
            EditorState::FieldsBuilt => "fields_built",
            EditorState::Idle => "idle",
            EditorState::Loading => "loading",
            EditorState::Populated => "populated",
            EditorState::Submitting => "submitting",
            EditorState::Saved => "saved",
            EditorState::SaveFailed => "save_failed",
            EditorState::Hidden => "hidden",
        }
    }

    fn accepts_input(&self) -> bool {
        matches!(self, EditorState::Idle | EditorState::Populated)
    }
}

impl fmt::Display for EditorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub struct RecordEditor<S: Storage + ?Sized = dyn Storage> {
    engine: RecordEngine<S>,
    notifier: Arc<SaveNotifier>,
    table: String,
    key_field: String,
    state: EditorState,
    fields: Vec<String>,
    working: Record,
    last_error: Option<ExError>,
    history: Vec<EditorState>,
}

impl<S: Storage + ?Sized> RecordEditor<S> {
    pub fn new(engine: RecordEngine<S>, notifier: Arc<SaveNotifier>, table: impl Into<String>) -> Self {
        let table = table.into();
        let key_field = engine.key_field(&table);
        Self {
            engine,
            notifier,
            table,
            key_field,
            state: EditorState::Uninitialized,
            fields: Vec::new(),
            working: Record::new(),
            last_error: None,
            history: vec![EditorState::Uninitialized],
        }
    }

    pub fn state(&self) -> EditorState {
        self.state
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Editable fields built by the last `open`
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn working_copy(&self) -> &Record {
        &self.working
    }

    /// Error from the last failed load or save
    pub fn last_error(&self) -> Option<&ExError> {
        self.last_error.as_ref()
    }

    /// Every state entered since construction, in order
    pub fn history(&self) -> &[EditorState] {
        &self.history
    }

    fn transition(&mut self, next: EditorState) {
        tracing::trace!(table = %self.table, from = %self.state, to = %next, "editor transition");
        self.state = next;
        self.history.push(next);
    }

    fn invalid(&self, action: &str) -> ExError {
        TabulaError::InvalidTransition {
            action: action.to_string(),
            state: self.state.to_string(),
        }
        .into()
    }

    /// Show the editor, blank or loaded with `record_id`
    ///
    /// A record that cannot be loaded (absent, or storage failed) leaves a
    /// blank form; the failure is kept in `last_error`.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` unless the editor is uninitialized or hidden.
    pub async fn open(&mut self, record_id: Option<&str>) -> Result<EditorState> {
        if !matches!(self.state, EditorState::Uninitialized | EditorState::Hidden) {
            return Err(self.invalid("open"));
        }

        self.fields = self.engine.editable_fields(&self.table);
        self.working = Record::new();
        self.last_error = None;
        self.transition(EditorState::FieldsBuilt);

        let Some(id) = record_id else {
            self.transition(EditorState::Idle);
            return Ok(self.state);
        };

        self.transition(EditorState::Loading);
        match self.engine.get(&self.table, id).await {
            Ok(Some(record)) => {
                self.working = record;
                self.transition(EditorState::Populated);
            }
            Ok(None) => self.transition(EditorState::Idle),
            Err(e) => {
                self.last_error = Some(e);
                self.transition(EditorState::Idle);
            }
        }
        Ok(self.state)
    }

    /// Set one field of the working copy
    ///
    /// # Errors
    ///
    /// `InvalidTransition` when the form is not accepting input,
    /// `InvalidInput` for the identifying field.
    pub fn set_field(&mut self, name: impl Into<String>, value: Value) -> Result<()> {
        if !self.state.accepts_input() {
            return Err(self.invalid("edit"));
        }
        let name = name.into();
        if name == self.key_field {
            return Err(ExError::new(ExErrorKind::InvalidInput)
                .with_op("set_field")
                .with_table(self.table.clone())
                .with_message(format!("'{}' is assigned by storage", name)));
        }

        self.working.insert(name, value);
        Ok(())
    }

    /// Save the working copy and hide the editor
    ///
    /// # Errors
    ///
    /// `InvalidTransition` when there is nothing to submit; otherwise the
    /// engine's error, with the editor back in `Populated`.
    pub async fn submit(&mut self) -> Result<Record> {
        if !self.state.accepts_input() {
            return Err(self.invalid("submit"));
        }
        self.transition(EditorState::Submitting);

        let data = self.working.clone();
        let result = match record_key(&data, &self.key_field) {
            Some(id) => self.engine.update(&self.table, &id, data).await,
            None => self.engine.create(&self.table, data).await,
        };

        match result {
            Ok(record) => {
                self.last_error = None;
                self.working = record.clone();
                self.transition(EditorState::Saved);
                self.notifier.notify(&SaveNotice {
                    table: self.table.clone(),
                    record: record.clone(),
                });
                self.transition(EditorState::Hidden);
                Ok(record)
            }
            Err(e) => {
                self.last_error = Some(e.clone());
                self.transition(EditorState::SaveFailed);
                self.transition(EditorState::Populated);
                Err(e)
            }
        }
    }

    /// Hide the editor without saving
    ///
    /// # Errors
    ///
    /// `InvalidTransition` when already hidden.
    pub fn cancel(&mut self) -> Result<()> {
        if self.state == EditorState::Hidden {
            return Err(self.invalid("cancel"));
        }
        self.transition(EditorState::Hidden);
        Ok(())
    }
}
