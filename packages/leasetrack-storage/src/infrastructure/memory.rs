//! In-Memory Order Store (for testing)
//!
//! BTreeMap-based implementation for unit tests and local development.
//! Supports injected write failures and artificial write latency so callers
//! can exercise rollback and timeout paths.
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use crate::domain::{
    sort_rows, CollectionRef, IndexRow, KeyRow, OrderField, OrderRow, OrderStore,
};
use crate::{Result, StorageError};

type Rows = BTreeMap<String, OrderRow>;

#[derive(Clone, Default)]
pub struct InMemoryOrderStore {
    collections: Arc<RwLock<HashMap<CollectionRef, Rows>>>,
    write_failure: Arc<Mutex<Option<String>>>,
    write_delay: Arc<Mutex<Option<Duration>>>,
    write_count: Arc<Mutex<usize>>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail with `Unavailable`
    pub fn fail_writes(&self, message: impl Into<String>) {
        *self.write_failure.lock() = Some(message.into());
    }

    pub fn clear_write_failure(&self) {
        *self.write_failure.lock() = None;
    }

    /// Delay every write by `delay` before it is applied
    pub fn set_write_delay(&self, delay: Option<Duration>) {
        *self.write_delay.lock() = delay;
    }

    /// Number of write batches that were applied
    pub fn write_count(&self) -> usize {
        *self.write_count.lock()
    }

    async fn before_write(&self) -> Result<()> {
        let delay = *self.write_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(message) = self.write_failure.lock().clone() {
            return Err(StorageError::unavailable(message));
        }
        Ok(())
    }

    fn empty_row(item_id: &str) -> OrderRow {
        OrderRow {
            item_id: item_id.to_string(),
            order_key: None,
            order_index: None,
            updated_at: Utc::now(),
        }
    }
}

/// Reject a batch that would leave two rows with the same key
fn ensure_unique_keys(collection: &CollectionRef, rows: &Rows) -> Result<()> {
    let mut seen = HashSet::new();
    for row in rows.values() {
        if let Some(key) = &row.order_key {
            if !seen.insert(key.as_str()) {
                return Err(StorageError::conflict(format!(
                    "duplicate order_key '{}' in {}",
                    key, collection
                )));
            }
        }
    }
    Ok(())
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn fetch_ordered(
        &self,
        collection: &CollectionRef,
        field: OrderField,
    ) -> Result<Vec<OrderRow>> {
        let mut rows: Vec<OrderRow> = self
            .collections
            .read()
            .get(collection)
            .map(|rows| rows.values().cloned().collect())
            .unwrap_or_default();
        sort_rows(&mut rows, field);
        Ok(rows)
    }

    async fn upsert_order_keys(&self, collection: &CollectionRef, rows: &[KeyRow]) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }
        self.before_write().await?;

        let mut collections = self.collections.write();
        // Stage the batch on a copy so a conflict leaves the collection untouched.
        let mut staged = collections.get(collection).cloned().unwrap_or_default();
        let now = Utc::now();
        for row in rows {
            let entry = staged
                .entry(row.item_id.clone())
                .or_insert_with(|| Self::empty_row(&row.item_id));
            entry.order_key = Some(row.order_key.clone());
            entry.updated_at = now;
        }
        ensure_unique_keys(collection, &staged)?;

        collections.insert(collection.clone(), staged);
        *self.write_count.lock() += 1;
        Ok(())
    }

    async fn upsert_order_indices(
        &self,
        collection: &CollectionRef,
        rows: &[IndexRow],
    ) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }
        self.before_write().await?;

        let mut collections = self.collections.write();
        let staged = collections.entry(collection.clone()).or_default();
        let now = Utc::now();
        for row in rows {
            let entry = staged
                .entry(row.item_id.clone())
                .or_insert_with(|| Self::empty_row(&row.item_id));
            entry.order_index = Some(row.order_index);
            entry.updated_at = now;
        }
        *self.write_count.lock() += 1;
        Ok(())
    }

    async fn delete_item(&self, collection: &CollectionRef, item_id: &str) -> Result<bool> {
        self.before_write().await?;

        let removed = self
            .collections
            .write()
            .get_mut(collection)
            .map(|rows| rows.remove(item_id).is_some())
            .unwrap_or(false);
        if removed {
            *self.write_count.lock() += 1;
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CollectionKind;
    use crate::ErrorKind;

    fn roadmap() -> CollectionRef {
        CollectionRef::new(CollectionKind::RoadmapSteps, "project-1")
    }

    fn ids(rows: &[OrderRow]) -> Vec<&str> {
        rows.iter().map(|r| r.item_id.as_str()).collect()
    }

    #[tokio::test]
    async fn test_upsert_and_fetch_sorted() {
        let store = InMemoryOrderStore::new();
        store
            .upsert_order_keys(
                &roadmap(),
                &[
                    KeyRow::new("z", "a2"),
                    KeyRow::new("x", "a0"),
                    KeyRow::new("y", "a1"),
                ],
            )
            .await
            .unwrap();

        let rows = store.fetch_ordered(&roadmap(), OrderField::Key).await.unwrap();
        assert_eq!(ids(&rows), vec!["x", "y", "z"]);
        assert_eq!(store.write_count(), 1);
    }

    #[tokio::test]
    async fn test_conflicting_batch_is_not_applied() {
        let store = InMemoryOrderStore::new();
        store
            .upsert_order_keys(&roadmap(), &[KeyRow::new("x", "a0"), KeyRow::new("y", "a1")])
            .await
            .unwrap();

        let err = store
            .upsert_order_keys(&roadmap(), &[KeyRow::new("z", "a2"), KeyRow::new("x", "a1")])
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);

        let rows = store.fetch_ordered(&roadmap(), OrderField::Key).await.unwrap();
        assert_eq!(ids(&rows), vec!["x", "y"]);
        assert_eq!(rows[0].order_key.as_deref(), Some("a0"));
    }

    #[tokio::test]
    async fn test_swapping_keys_in_one_batch() {
        let store = InMemoryOrderStore::new();
        store
            .upsert_order_keys(&roadmap(), &[KeyRow::new("x", "a0"), KeyRow::new("y", "a1")])
            .await
            .unwrap();
        store
            .upsert_order_keys(&roadmap(), &[KeyRow::new("x", "a1"), KeyRow::new("y", "a0")])
            .await
            .unwrap();

        let rows = store.fetch_ordered(&roadmap(), OrderField::Key).await.unwrap();
        assert_eq!(ids(&rows), vec!["y", "x"]);
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let store = InMemoryOrderStore::new();
        store.fail_writes("network down");

        let err = store
            .upsert_order_keys(&roadmap(), &[KeyRow::new("x", "a0")])
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unavailable);
        assert!(store
            .fetch_ordered(&roadmap(), OrderField::Key)
            .await
            .unwrap()
            .is_empty());

        store.clear_write_failure();
        store
            .upsert_order_keys(&roadmap(), &[KeyRow::new("x", "a0")])
            .await
            .unwrap();
        assert_eq!(store.write_count(), 1);
    }

    #[tokio::test]
    async fn test_indices_and_delete() {
        let store = InMemoryOrderStore::new();
        let props = CollectionRef::new(CollectionKind::Properties, "project-1");
        store
            .upsert_order_indices(
                &props,
                &[IndexRow::new("p1", 1), IndexRow::new("p2", 0), IndexRow::new("p3", 2)],
            )
            .await
            .unwrap();

        assert!(store.delete_item(&props, "p2").await.unwrap());
        assert!(!store.delete_item(&props, "p2").await.unwrap());

        let rows = store.fetch_ordered(&props, OrderField::Index).await.unwrap();
        assert_eq!(ids(&rows), vec!["p1", "p3"]);
        assert_eq!(rows[0].order_index, Some(1));
    }

    #[tokio::test]
    async fn test_collections_are_isolated() {
        let store = InMemoryOrderStore::new();
        let other = CollectionRef::new(CollectionKind::RoadmapSteps, "project-2");
        store
            .upsert_order_keys(&roadmap(), &[KeyRow::new("x", "a0")])
            .await
            .unwrap();
        store
            .upsert_order_keys(&other, &[KeyRow::new("q", "a0")])
            .await
            .unwrap();

        let rows = store.fetch_ordered(&other, OrderField::Key).await.unwrap();
        assert_eq!(ids(&rows), vec!["q"]);
    }
}
