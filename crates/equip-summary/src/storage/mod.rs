//! Storage module for persistent data storage
//!
//! Provides SQLite-based persistence for the bounded upload history.

mod database;

pub use database::{AppendOutcome, HistoryStore, DEFAULT_HISTORY_CAPACITY, MAX_HISTORY_CAPACITY};
