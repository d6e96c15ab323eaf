//! Persistence adapter
//!
//! Thin layer between planned order changes and the [`OrderStore`] port. Each
//! function issues exactly one batch call, so a failure leaves the stored
//! collection as it was.
use leasetrack_storage::{CollectionRef, IndexRow, KeyRow, OrderStore};
use tracing::debug;

use crate::dense::plan_dense_move;
use crate::error::Result;
use crate::item::{IndexedItem, OrderedItem};

/// Write the keys of `items` in one atomic batch
///
/// Empty input is a no-op and does not touch the store.
pub async fn batch_update_order_keys<S>(
    store: &S,
    collection: &CollectionRef,
    items: &[OrderedItem],
) -> Result<()>
where
    S: OrderStore + ?Sized,
{
    if items.is_empty() {
        return Ok(());
    }
    let rows: Vec<KeyRow> = items.iter().map(OrderedItem::to_row).collect();
    debug!("Collection {}: writing {} order keys", collection, rows.len());
    store.upsert_order_keys(collection, &rows).await?;
    Ok(())
}

/// Move an item in a densely indexed collection and persist every index
///
/// Returns the renumbered list. All rows are written in a single batch.
pub async fn update_item_order<S>(
    store: &S,
    collection: &CollectionRef,
    items: &[IndexedItem],
    old_index: usize,
    new_index: usize,
) -> Result<Vec<IndexedItem>>
where
    S: OrderStore + ?Sized,
{
    let renumbered = plan_dense_move(items, old_index, new_index)?;
    if old_index != new_index {
        write_indices(store, collection, &renumbered).await?;
    }
    Ok(renumbered)
}

pub(crate) async fn write_indices<S>(
    store: &S,
    collection: &CollectionRef,
    items: &[IndexedItem],
) -> Result<()>
where
    S: OrderStore + ?Sized,
{
    let rows: Vec<IndexRow> = items.iter().filter_map(IndexedItem::to_row).collect();
    debug!("Collection {}: writing {} order indices", collection, rows.len());
    store.upsert_order_indices(collection, &rows).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OrderError;
    use crate::key::OrderKey;
    use leasetrack_storage::{CollectionKind, InMemoryOrderStore, OrderField};

    fn properties() -> CollectionRef {
        CollectionRef::new(CollectionKind::Properties, "project-3")
    }

    #[tokio::test]
    async fn test_batch_update_writes_once() {
        let store = InMemoryOrderStore::new();
        let items = vec![
            OrderedItem::new("p1", OrderKey::from_raw("a0")),
            OrderedItem::new("p2", OrderKey::from_raw("a1")),
        ];
        batch_update_order_keys(&store, &properties(), &items).await.unwrap();
        assert_eq!(store.write_count(), 1);

        batch_update_order_keys(&store, &properties(), &[]).await.unwrap();
        assert_eq!(store.write_count(), 1);
    }

    #[tokio::test]
    async fn test_batch_update_failure_applies_nothing() {
        let store = InMemoryOrderStore::new();
        let items = vec![
            OrderedItem::new("p1", OrderKey::from_raw("a0")),
            OrderedItem::new("p2", OrderKey::from_raw("a0")),
        ];
        let err = batch_update_order_keys(&store, &properties(), &items)
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::Persistence(_)));
        assert!(store
            .fetch_ordered(&properties(), OrderField::Key)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_update_item_order_renumbers_all() {
        let store = InMemoryOrderStore::new();
        let items = vec![
            IndexedItem::new("p1", Some(0)),
            IndexedItem::new("p2", Some(1)),
            IndexedItem::new("p3", Some(2)),
        ];
        let updated = update_item_order(&store, &properties(), &items, 0, 2)
            .await
            .unwrap();
        let ids: Vec<_> = updated.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["p2", "p3", "p1"]);
        assert_eq!(store.write_count(), 1);

        let rows = store
            .fetch_ordered(&properties(), OrderField::Index)
            .await
            .unwrap();
        let stored: Vec<_> = rows.iter().map(|r| (r.item_id.as_str(), r.order_index)).collect();
        assert_eq!(stored, vec![("p2", Some(0)), ("p3", Some(1)), ("p1", Some(2))]);
    }

    #[tokio::test]
    async fn test_update_item_order_failure() {
        let store = InMemoryOrderStore::new();
        store.fail_writes("timeout talking to backend");
        let items = vec![IndexedItem::new("p1", Some(0)), IndexedItem::new("p2", Some(1))];
        assert!(update_item_order(&store, &properties(), &items, 1, 0)
            .await
            .is_err());
        assert_eq!(store.write_count(), 0);
    }
}
