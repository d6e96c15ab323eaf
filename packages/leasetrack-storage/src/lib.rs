//! Order row storage for lease-tracking collections
//!
//! The ordering core talks to persistence through one narrow port,
//! [`OrderStore`]: read a collection pre-sorted by its order field, and write
//! order values back in single all-or-nothing batches.
//!
//! ## Adapters
//!
//! - [`InMemoryOrderStore`]: tests and local development (failure/latency injection)
//! - [`SqliteOrderStore`]: SQLite, feature `sqlite` (default)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use leasetrack_storage::{CollectionKind, CollectionRef, KeyRow, OrderField, OrderStore, SqliteOrderStore};
//!
//! let store = SqliteOrderStore::new("leasetrack.db")?;
//! let props = CollectionRef::new(CollectionKind::Properties, "project-7");
//!
//! // One batch, applied entirely or not at all
//! store.upsert_order_keys(&props, &[KeyRow::new("prop-1", "a0"), KeyRow::new("prop-2", "a1")]).await?;
//!
//! let rows = store.fetch_ordered(&props, OrderField::Key).await?;
//! ```

pub mod domain;
pub mod error;
pub mod infrastructure;

pub use error::{ErrorKind, Result, StorageError};

pub use domain::{CollectionKind, CollectionRef, IndexRow, KeyRow, OrderField, OrderRow, OrderStore};

pub use infrastructure::InMemoryOrderStore;
#[cfg(feature = "sqlite")]
pub use infrastructure::SqliteOrderStore;
