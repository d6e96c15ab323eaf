//! Order maintenance for user-sortable lists
//!
//! Roadmap steps, properties of interest and documents are ordered by the
//! user with drag and drop. This crate keeps that order durable:
//!
//! - [`key`]: fractional keys, `key_between` / `keys_between`
//! - [`health`]: key length threshold and consistency report
//! - [`reindex`]: fresh evenly spaced keys
//! - [`safe_key`]: key for a move, falling back to reindexing
//! - [`persistence`]: single-batch writes through `OrderStore`
//! - [`controller`]: optimistic reorder state machine with rollback
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use leasetrack_ordering::{FractionalScheme, OrderingConfig, ReorderController, ReorderOutcome};
//! use leasetrack_storage::{CollectionKind, CollectionRef, SqliteOrderStore};
//!
//! let store = Arc::new(SqliteOrderStore::new("leasetrack.db")?);
//! let documents = CollectionRef::new(CollectionKind::Documents, "project-7");
//! let controller =
//!     ReorderController::load(FractionalScheme::new(store), documents, OrderingConfig::default()).await?;
//!
//! match controller.handle_reorder(0, 2).await? {
//!     ReorderOutcome::RolledBack => eprintln!("{}", controller.reorder_error().unwrap_or_default()),
//!     _ => {}
//! }
//! ```

pub mod config;
pub mod controller;
pub mod dense;
pub mod error;
pub mod health;
pub mod item;
pub mod key;
pub mod persistence;
pub mod reindex;
pub mod safe_key;

pub use config::{ConfigError, OrderingConfig};
pub use controller::{
    DenseScheme, FractionalScheme, ListPlan, ListWrite, OrderScheme, ReorderController, ReorderOp,
    ReorderOutcome, ReorderPhase, ReorderStateMachine,
};
pub use dense::{plan_dense_move, reassign_indices};
pub use error::{OrderError, Result};
pub use health::{needs_reindexing, KeyHealthReport, DEFAULT_MAX_KEY_LENGTH};
pub use item::{move_in_place, move_item, IndexedItem, Orderable, OrderedItem};
pub use key::{key_between, keys_between, KeyError, OrderKey};
pub use persistence::{batch_update_order_keys, update_item_order};
pub use reindex::reindex;
pub use safe_key::{append_key, apply_assignment, generate_safe_key, KeyAssignment};
