//! Records list view model
//!
//! A `RecordsViewer` follows the navigation channel: a `table/<name>` event
//! selects a table, and a save notice for that table marks the rows stale.
//! Each of these bumps a generation counter. `refresh` takes a ticket before
//! its fetch and only applies the rows if no newer event arrived while the
//! fetch was suspended.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tabula_core::record::{display_label, Record};
use tabula_core::storage::Storage;
use tabula_core::{StateChannel, SubscriptionId};

use crate::notify::SaveNotifier;
use crate::records::RecordEngine;
use crate::Result;

/// Monotonic counter shared by a view and its pending fetches
#[derive(Debug, Clone, Default)]
pub struct Generation {
    current: Arc<AtomicU64>,
}

impl Generation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> u64 {
        self.current.load(Ordering::SeqCst)
    }

    /// Invalidate every outstanding ticket and issue a fresh one
    pub fn advance(&self) -> GenerationTicket {
        let value = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        GenerationTicket {
            value,
            current: self.current.clone(),
        }
    }

    /// Ticket for the current generation
    pub fn ticket(&self) -> GenerationTicket {
        GenerationTicket {
            value: self.current(),
            current: self.current.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GenerationTicket {
    value: u64,
    current: Arc<AtomicU64>,
}

impl GenerationTicket {
    pub fn value(&self) -> u64 {
        self.value
    }

    pub fn is_current(&self) -> bool {
        self.current.load(Ordering::SeqCst) == self.value
    }
}

/// Link to one record as shown in a list
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordLink {
    pub label: String,
    pub href: String,
}

#[derive(Debug, Default)]
struct ViewerState {
    selected: Option<String>,
    rows: Vec<Record>,
    stale: bool,
}

pub struct RecordsViewer<S: Storage + ?Sized = dyn Storage> {
    engine: RecordEngine<S>,
    generation: Generation,
    state: Arc<Mutex<ViewerState>>,
    navigation: Arc<StateChannel>,
    navigation_sub: SubscriptionId,
    saves: Arc<SaveNotifier>,
    saves_sub: SubscriptionId,
}

fn lock(state: &Mutex<ViewerState>) -> MutexGuard<'_, ViewerState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<S: Storage + ?Sized> RecordsViewer<S> {
    /// Create a viewer subscribed to navigation and save events
    ///
    /// Subscriptions end when the viewer is dropped.
    pub fn new(
        engine: RecordEngine<S>,
        navigation: Arc<StateChannel>,
        saves: Arc<SaveNotifier>,
    ) -> Self {
        let generation = Generation::new();
        let state = Arc::new(Mutex::new(ViewerState::default()));

        let nav_state = state.clone();
        let nav_generation = generation.clone();
        let navigation_sub = navigation.subscribe(move |nav| {
            if !nav.is_table_view() {
                return;
            }
            let Some(table) = nav.table_name() else {
                return;
            };
            let mut state = lock(&nav_state);
            if state.selected.as_deref() != Some(table) {
                state.selected = Some(table.to_string());
                state.rows.clear();
            }
            state.stale = true;
            nav_generation.advance();
        });

        let save_state = state.clone();
        let save_generation = generation.clone();
        let saves_sub = saves.subscribe(move |notice| {
            let mut state = lock(&save_state);
            if state.selected.as_deref() == Some(notice.table.as_str()) {
                state.stale = true;
                save_generation.advance();
            }
        });

        Self {
            engine,
            generation,
            state,
            navigation,
            navigation_sub,
            saves,
            saves_sub,
        }
    }

    pub fn generation(&self) -> &Generation {
        &self.generation
    }

    pub fn selected_table(&self) -> Option<String> {
        lock(&self.state).selected.clone()
    }

    /// True when rows may not reflect the latest navigation or save
    pub fn is_stale(&self) -> bool {
        lock(&self.state).stale
    }

    pub fn rows(&self) -> Vec<Record> {
        lock(&self.state).rows.clone()
    }

    /// Labelled record links for the current rows
    pub fn links(&self) -> Vec<RecordLink> {
        let state = lock(&self.state);
        let Some(table) = state.selected.as_deref() else {
            return Vec::new();
        };
        let key_field = self.engine.key_field(table);
        state
            .rows
            .iter()
            .map(|row| RecordLink {
                label: display_label(row, &key_field),
                href: self.engine.record_link(table, row),
            })
            .collect()
    }

    /// Fetch rows for the selected table
    ///
    /// Returns `Ok(false)` without touching the rows when no table is
    /// selected or the fetch was overtaken by a newer event.
    ///
    /// # Errors
    ///
    /// Storage errors from listing the table.
    pub async fn refresh(&self) -> Result<bool> {
        let (table, ticket) = {
            let state = lock(&self.state);
            match state.selected.clone() {
                Some(table) => (table, self.generation.ticket()),
                None => return Ok(false),
            }
        };

        let rows = self.engine.list(&table).await?;

        // Handlers advance the generation while holding this lock
        let mut state = lock(&self.state);
        if !ticket.is_current() {
            tracing::debug!(
                table = %table,
                ticket = ticket.value(),
                current = self.generation.current(),
                "discarding stale fetch"
            );
            return Ok(false);
        }

        state.rows = rows;
        state.stale = false;
        Ok(true)
    }
}

impl<S: Storage + ?Sized> Drop for RecordsViewer<S> {
    fn drop(&mut self) {
        self.navigation.unsubscribe(self.navigation_sub);
        self.saves.unsubscribe(self.saves_sub);
    }
}
