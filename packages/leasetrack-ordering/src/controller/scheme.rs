//! Ordering schemes
//!
//! A scheme decides how a list change maps to stored order values. Planning is
//! pure and synchronous; only `persist` and `load` touch the store.
use async_trait::async_trait;
use leasetrack_storage::{CollectionRef, OrderField, OrderStore};
use std::fmt::Debug;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::OrderingConfig;
use crate::dense::plan_dense_move;
use crate::error::{OrderError, Result};
use crate::health::{KeyHealthReport, DEFAULT_MAX_KEY_LENGTH};
use crate::item::{position_of, IndexedItem, Orderable, OrderedItem};
use crate::persistence::{batch_update_order_keys, write_indices};
use crate::safe_key::{append_key, apply_assignment, generate_safe_key, KeyAssignment};

/// Store mutation required by a plan
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListWrite<T> {
    /// Nothing changed
    None,
    /// Write the order values of these items in one batch
    Upsert(Vec<T>),
    /// Delete one row; siblings keep their values
    Delete(String),
}

impl<T> ListWrite<T> {
    pub fn is_none(&self) -> bool {
        matches!(self, ListWrite::None)
    }
}

/// New list contents plus the write that makes them durable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListPlan<T> {
    pub items: Vec<T>,
    pub write: ListWrite<T>,
}

#[async_trait]
pub trait OrderScheme: Send + Sync {
    type Item: Orderable + Clone + Debug + Send + Sync + 'static;

    /// Pick up tunables; called once by the controller
    fn configure(&mut self, _config: &OrderingConfig) {}

    fn plan_move(
        &self,
        items: &[Self::Item],
        old_index: usize,
        new_index: usize,
    ) -> Result<ListPlan<Self::Item>>;

    fn plan_append(&self, items: &[Self::Item], item_id: &str) -> Result<ListPlan<Self::Item>>;

    fn plan_remove(&self, items: &[Self::Item], item_id: &str) -> Result<ListPlan<Self::Item>> {
        let index =
            position_of(items, item_id).ok_or_else(|| OrderError::ItemNotFound(item_id.to_string()))?;
        let mut remaining = items.to_vec();
        remaining.remove(index);
        Ok(ListPlan {
            items: remaining,
            write: ListWrite::Delete(item_id.to_string()),
        })
    }

    async fn persist(&self, collection: &CollectionRef, write: &ListWrite<Self::Item>) -> Result<()>;

    /// Current list, sorted by the stored order values
    async fn load(&self, collection: &CollectionRef) -> Result<Vec<Self::Item>>;
}

async fn delete_row<S>(store: &S, collection: &CollectionRef, item_id: &str) -> Result<()>
where
    S: OrderStore + ?Sized,
{
    if !store.delete_item(collection, item_id).await? {
        warn!("Collection {}: item {} had no stored row", collection, item_id);
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════
// Fractional keys
// ═══════════════════════════════════════════════════════════════════════════

/// `order_key` scheme: a move writes one row, or every row after a reindex
pub struct FractionalScheme<S: ?Sized> {
    store: Arc<S>,
    max_key_length: usize,
}

impl<S: OrderStore + ?Sized> FractionalScheme<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            max_key_length: DEFAULT_MAX_KEY_LENGTH,
        }
    }

    pub fn max_key_length(&self) -> usize {
        self.max_key_length
    }
}

#[async_trait]
impl<S: OrderStore + ?Sized + 'static> OrderScheme for FractionalScheme<S> {
    type Item = OrderedItem;

    fn configure(&mut self, config: &OrderingConfig) {
        self.max_key_length = config.max_key_length;
    }

    fn plan_move(
        &self,
        items: &[OrderedItem],
        old_index: usize,
        new_index: usize,
    ) -> Result<ListPlan<OrderedItem>> {
        let assignment = generate_safe_key(items, old_index, new_index, self.max_key_length)?;
        let mut planned = items.to_vec();
        apply_assignment(&mut planned, old_index, new_index, &assignment)?;
        let write = match assignment {
            KeyAssignment::Unchanged { .. } => ListWrite::None,
            changed => ListWrite::Upsert(changed.changed_rows()),
        };
        Ok(ListPlan {
            items: planned,
            write,
        })
    }

    fn plan_append(&self, items: &[OrderedItem], item_id: &str) -> Result<ListPlan<OrderedItem>> {
        let assignment = append_key(items, item_id, self.max_key_length)?;
        let write = ListWrite::Upsert(assignment.changed_rows());
        let planned = match assignment {
            KeyAssignment::Reindexed { items, .. } => items,
            other => {
                let mut planned = items.to_vec();
                planned.push(other.item().clone());
                planned
            }
        };
        Ok(ListPlan {
            items: planned,
            write,
        })
    }

    async fn persist(&self, collection: &CollectionRef, write: &ListWrite<OrderedItem>) -> Result<()> {
        match write {
            ListWrite::None => Ok(()),
            ListWrite::Upsert(rows) => batch_update_order_keys(&*self.store, collection, rows).await,
            ListWrite::Delete(item_id) => delete_row(&*self.store, collection, item_id).await,
        }
    }

    async fn load(&self, collection: &CollectionRef) -> Result<Vec<OrderedItem>> {
        let rows = self.store.fetch_ordered(collection, OrderField::Key).await?;
        let items: Vec<OrderedItem> = rows.into_iter().map(OrderedItem::from_row).collect();

        let report = KeyHealthReport::inspect(&items, self.max_key_length);
        if report.is_consistent() {
            debug!(
                "Collection {}: {} items, longest key {}",
                collection, report.item_count, report.longest_key
            );
        } else {
            warn!(
                "Collection {}: inconsistent keys ({} duplicates, {} inversions, {} invalid), next move will reindex",
                collection,
                report.duplicate_keys.len(),
                report.inversions,
                report.invalid_keys.len()
            );
        }
        Ok(items)
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Dense indices
// ═══════════════════════════════════════════════════════════════════════════

/// `order_index` scheme: every move rewrites the whole list in one batch
pub struct DenseScheme<S: ?Sized> {
    store: Arc<S>,
}

impl<S: OrderStore + ?Sized> DenseScheme<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl<S: OrderStore + ?Sized + 'static> OrderScheme for DenseScheme<S> {
    type Item = IndexedItem;

    fn plan_move(
        &self,
        items: &[IndexedItem],
        old_index: usize,
        new_index: usize,
    ) -> Result<ListPlan<IndexedItem>> {
        let planned = plan_dense_move(items, old_index, new_index)?;
        let write = if old_index == new_index {
            ListWrite::None
        } else {
            ListWrite::Upsert(planned.clone())
        };
        Ok(ListPlan {
            items: planned,
            write,
        })
    }

    fn plan_append(&self, items: &[IndexedItem], item_id: &str) -> Result<ListPlan<IndexedItem>> {
        if position_of(items, item_id).is_some() {
            return Err(OrderError::DuplicateItem(item_id.to_string()));
        }
        // Removals leave gaps, so the list length may already be taken.
        let next = items
            .iter()
            .filter_map(|item| item.order_index)
            .max()
            .map_or(0, |max| max + 1)
            .max(items.len() as i64);
        let item = IndexedItem::new(item_id, Some(next));
        let mut planned = items.to_vec();
        planned.push(item.clone());
        Ok(ListPlan {
            items: planned,
            write: ListWrite::Upsert(vec![item]),
        })
    }

    async fn persist(&self, collection: &CollectionRef, write: &ListWrite<IndexedItem>) -> Result<()> {
        match write {
            ListWrite::None => Ok(()),
            ListWrite::Upsert(rows) => write_indices(&*self.store, collection, rows).await,
            ListWrite::Delete(item_id) => delete_row(&*self.store, collection, item_id).await,
        }
    }

    async fn load(&self, collection: &CollectionRef) -> Result<Vec<IndexedItem>> {
        let rows = self.store.fetch_ordered(collection, OrderField::Index).await?;
        Ok(rows.into_iter().map(IndexedItem::from_row).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::OrderKey;
    use leasetrack_storage::InMemoryOrderStore;

    fn keyed(keys: &[&str]) -> Vec<OrderedItem> {
        keys.iter()
            .enumerate()
            .map(|(i, k)| OrderedItem::new(format!("doc-{i}"), OrderKey::from_raw(*k)))
            .collect()
    }

    #[test]
    fn test_fractional_plan_move_writes_one_row() {
        let scheme = FractionalScheme::new(Arc::new(InMemoryOrderStore::new()));
        let plan = scheme.plan_move(&keyed(&["a0", "a1", "a2"]), 0, 2).unwrap();
        let keys: Vec<_> = plan.items.iter().map(|i| i.order_key.as_str()).collect();
        assert_eq!(keys, vec!["a1", "a2", "a3"]);
        assert_eq!(
            plan.write,
            ListWrite::Upsert(vec![OrderedItem::new("doc-0", OrderKey::from_raw("a3"))])
        );

        let plan = scheme.plan_move(&keyed(&["a0", "a1"]), 1, 1).unwrap();
        assert!(plan.write.is_none());
    }

    #[test]
    fn test_fractional_configure() {
        let mut scheme = FractionalScheme::new(Arc::new(InMemoryOrderStore::new()));
        scheme.configure(&OrderingConfig::default().max_key_length(12));
        assert_eq!(scheme.max_key_length(), 12);
    }

    #[test]
    fn test_plan_remove() {
        let scheme = FractionalScheme::new(Arc::new(InMemoryOrderStore::new()));
        let plan = scheme.plan_remove(&keyed(&["a0", "a1", "a2"]), "doc-1").unwrap();
        let keys: Vec<_> = plan.items.iter().map(|i| i.order_key.as_str()).collect();
        assert_eq!(keys, vec!["a0", "a2"]);
        assert_eq!(plan.write, ListWrite::Delete("doc-1".to_string()));

        assert!(matches!(
            scheme.plan_remove(&keyed(&["a0"]), "doc-9"),
            Err(OrderError::ItemNotFound(_))
        ));
    }

    #[test]
    fn test_dense_append_after_gap() {
        let scheme = DenseScheme::new(Arc::new(InMemoryOrderStore::new()));
        let items = vec![IndexedItem::new("s1", Some(0)), IndexedItem::new("s3", Some(2))];
        let plan = scheme.plan_append(&items, "s4").unwrap();
        assert_eq!(
            plan.write,
            ListWrite::Upsert(vec![IndexedItem::new("s4", Some(3))])
        );
        assert_eq!(plan.items.len(), 3);
    }

    #[tokio::test]
    async fn test_fractional_persist_and_load() {
        let store = Arc::new(InMemoryOrderStore::new());
        let scheme = FractionalScheme::new(store.clone());
        let collection = CollectionRef::new(
            leasetrack_storage::CollectionKind::Documents,
            "project-5",
        );

        let plan = scheme.plan_append(&[], "lease.pdf").unwrap();
        scheme.persist(&collection, &plan.write).await.unwrap();
        let plan = scheme.plan_append(&plan.items, "loi.pdf").unwrap();
        scheme.persist(&collection, &plan.write).await.unwrap();

        let loaded = scheme.load(&collection).await.unwrap();
        assert_eq!(loaded, plan.items);
        assert_eq!(store.write_count(), 2);

        scheme
            .persist(&collection, &ListWrite::Delete("lease.pdf".to_string()))
            .await
            .unwrap();
        assert_eq!(scheme.load(&collection).await.unwrap().len(), 1);
    }
}
