//! # Phrasedrop Store
//!
//! SQLite persistence: the phrase pool, the per-recipient consumption
//! ledger, and the recipient directory. One file, three tables, no ORM.

pub mod sqlite;

pub use sqlite::SqliteStore;
