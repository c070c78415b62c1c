//! # Previously, on rowdrop...
//!
//! 🎬 The rows were trapped. Stranded in a database nobody wanted to spin up for a
//! unit test. Someone had to fake it. Someone had to write a backend so simple it
//! lives entirely in RAM, gone the moment you blink.
//!
//! That someone was this module.
//!
//! `in_mem` provides an in-memory [`Database`](crate::backends::Database) and
//! [`ObjectStore`](crate::backends::ObjectStore) for tests and dry runs.
//! [`InMemoryDatabase`] serves canned tables keyed by query text, and can be told
//! to fall over on a specific row. [`InMemoryStore`] keeps every object it receives
//! behind an `Arc<Mutex<...>>` so tests can read them back, and can be told to
//! refuse specific keys.
//!
//! 🦆
//!
//! ⚠️ This is NOT for production. If you're deploying this to prod, please also
//! deploy a therapist.

mod in_mem_database;
mod in_mem_store;

pub use in_mem_database::{InMemoryCursor, InMemoryDatabase, InMemoryTable};
pub use in_mem_store::{InMemoryStore, StoredObject};
