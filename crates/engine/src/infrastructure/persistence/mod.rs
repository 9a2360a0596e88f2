//! Storage adapters for the element catalog, combination store and inventory.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
