//! Durable key/value storage for Monokit.
//!
//! Values are JSON documents addressed by `(namespace, key)` with an optional
//! expiry. The SQLite backend is shared by concurrent CLI invocations and the
//! daemon; the in-memory backend is used by tests.

mod cache;
mod error;
mod memory;
mod schema;
mod sqlite;
mod store;

pub use cache::{CachedEntry, ResultCache};
pub use error::StoreError;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use store::{KvStore, StoredValue, get_json, put_json};
