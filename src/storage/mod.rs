//! # Storage and Persistence
//!
//! Persistence layer for datasource records: the narrow [`KvStore`]
//! contract the core consumes, its embedded SQLite and in-memory backends,
//! and the [`DatasourceRepository`] that applies the secret boundary around
//! everything it reads and writes.

pub mod datasource;
pub mod sqlite;
pub mod store;

pub use datasource::DatasourceRepository;
pub use sqlite::{DbPool, SqliteStore};
pub use store::{KvStore, MemoryStore};
