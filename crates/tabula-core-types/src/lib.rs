//! Core types shared across Tabula facilities
//!
//! This crate holds the canonical field keys and event names used by the
//! structured logging facility and by error reporting, so every crate in the
//! workspace emits the same vocabulary.

pub mod schema;
