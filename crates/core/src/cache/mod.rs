//! Cache generation storage.
//!
//! A generation is a named key-value store mapping request identity to a
//! stored response. Two backends share the [`CacheStore`] contract:
//!
//! - [`SqliteCacheStore`]: persistent, WAL-mode SQLite via tokio-rusqlite,
//!   with numbered migrations and cascading generation deletes
//! - [`MemoryCacheStore`]: process-local, for tests and ephemeral hosts

pub mod connection;
pub mod entries;
pub mod hash;
pub mod memory;
pub mod migrations;
pub mod store;

pub use crate::Error;

pub use connection::SqliteCacheStore;
pub use memory::MemoryCacheStore;
pub use store::{CacheHandle, CacheStore, EntryInfo};
