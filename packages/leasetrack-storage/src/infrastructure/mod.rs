//! Infrastructure layer - OrderStore adapters

pub mod memory;
pub use memory::InMemoryOrderStore;

#[cfg(feature = "sqlite")]
pub mod sqlite;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteOrderStore;
