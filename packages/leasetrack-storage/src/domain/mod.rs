//! Domain layer for the order row store
//!
//! # Domain Models
//!
//! - `CollectionRef`: one orderable list (a project's roadmap, properties or documents)
//! - `KeyRow` / `IndexRow`: write payloads for the fractional and dense schemes
//! - `OrderRow`: what a fetch returns
//!
//! # Port Trait
//!
//! - `OrderStore`: the narrow read/write contract the ordering core depends on
//!
//! The order field is metadata on the ownership edge between a parent and an
//! item, so rows carry nothing but the item id and its order values.
//!
//! # Examples
//!
//! ```rust,ignore
//! use leasetrack_storage::{CollectionKind, CollectionRef, KeyRow, OrderField, OrderStore};
//!
//! async fn example(store: impl OrderStore) -> Result<()> {
//!     let roadmap = CollectionRef::new(CollectionKind::RoadmapSteps, "project-7");
//!     store
//!         .upsert_order_keys(&roadmap, &[KeyRow::new("step-1", "a0"), KeyRow::new("step-2", "a1")])
//!         .await?;
//!
//!     let rows = store.fetch_ordered(&roadmap, OrderField::Key).await?;
//!     assert_eq!(rows[0].item_id, "step-1");
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::Result;

// ═══════════════════════════════════════════════════════════════════════════
// Domain Models
// ═══════════════════════════════════════════════════════════════════════════

/// Kind of user-sortable list owned by a project
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionKind {
    RoadmapSteps,
    Properties,
    Documents,
}

impl CollectionKind {
    /// Table name of the backing collection
    pub fn table_name(&self) -> &'static str {
        match self {
            CollectionKind::RoadmapSteps => "roadmap_steps",
            CollectionKind::Properties => "properties",
            CollectionKind::Documents => "documents",
        }
    }
}

impl fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.table_name())
    }
}

/// One orderable list: a collection kind scoped to its parent project
///
/// # Examples
///
/// ```rust
/// use leasetrack_storage::domain::{CollectionKind, CollectionRef};
///
/// let docs = CollectionRef::new(CollectionKind::Documents, "project-7");
/// assert_eq!(docs.to_string(), "documents:project-7");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CollectionRef {
    /// Which list of the parent
    pub kind: CollectionKind,
    /// Parent (project) identifier
    pub parent_id: String,
}

impl CollectionRef {
    pub fn new(kind: CollectionKind, parent_id: impl Into<String>) -> Self {
        Self {
            kind,
            parent_id: parent_id.into(),
        }
    }
}

impl fmt::Display for CollectionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.parent_id)
    }
}

/// Which order field a fetch sorts by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderField {
    /// Fractional `order_key` (string)
    Key,
    /// Dense `order_index` (integer)
    Index,
}

/// `{id, order_key}` write payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyRow {
    pub item_id: String,
    pub order_key: String,
}

impl KeyRow {
    pub fn new(item_id: impl Into<String>, order_key: impl Into<String>) -> Self {
        Self {
            item_id: item_id.into(),
            order_key: order_key.into(),
        }
    }
}

/// `{id, order_index}` write payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexRow {
    pub item_id: String,
    pub order_index: i64,
}

impl IndexRow {
    pub fn new(item_id: impl Into<String>, order_index: i64) -> Self {
        Self {
            item_id: item_id.into(),
            order_index,
        }
    }
}

/// Stored order metadata of one item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRow {
    pub item_id: String,
    pub order_key: Option<String>,
    pub order_index: Option<i64>,
    pub updated_at: DateTime<Utc>,
}

// ═══════════════════════════════════════════════════════════════════════════
// Port Trait: OrderStore
// ═══════════════════════════════════════════════════════════════════════════

/// Order row storage abstraction
///
/// # Core Operations
///
/// 1. **Read**
///    - `fetch_ordered`: all rows of a collection, pre-sorted by the order field
///
/// 2. **Write** (each call is a single all-or-nothing batch)
///    - `upsert_order_keys`: fractional scheme
///    - `upsert_order_indices`: dense scheme
///    - `delete_item`: removes a row, siblings are not renumbered
///
/// # Implementations
///
/// - `InMemoryOrderStore`: tests and local development
/// - `SqliteOrderStore`: SQLite adapter (feature `sqlite`)
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Fetch all rows of a collection sorted ascending by `field`
    ///
    /// Rows without a value for `field` sort last; item id breaks ties so the
    /// result is deterministic even for damaged data.
    async fn fetch_ordered(&self, collection: &CollectionRef, field: OrderField)
        -> Result<Vec<OrderRow>>;

    /// Insert or update `order_key` for every row in one batch
    ///
    /// # Errors
    ///
    /// Returns `StorageError` with kind `Conflict` if the batch would leave two
    /// items of the collection with the same key. Nothing is applied then.
    async fn upsert_order_keys(&self, collection: &CollectionRef, rows: &[KeyRow]) -> Result<()>;

    /// Insert or update `order_index` for every row in one batch
    async fn upsert_order_indices(&self, collection: &CollectionRef, rows: &[IndexRow])
        -> Result<()>;

    /// Delete one item's row
    ///
    /// # Returns
    ///
    /// `true` if a row was removed
    async fn delete_item(&self, collection: &CollectionRef, item_id: &str) -> Result<bool>;
}

/// Sort rows the way every adapter must return them
pub(crate) fn sort_rows(rows: &mut [OrderRow], field: OrderField) {
    match field {
        OrderField::Key => rows.sort_by(|a, b| {
            (a.order_key.is_none(), &a.order_key, &a.item_id).cmp(&(
                b.order_key.is_none(),
                &b.order_key,
                &b.item_id,
            ))
        }),
        OrderField::Index => rows.sort_by(|a, b| {
            (a.order_index.is_none(), a.order_index, &a.item_id).cmp(&(
                b.order_index.is_none(),
                b.order_index,
                &b.item_id,
            ))
        }),
    }
}
