//! Shared helpers for integration tests
#![allow(dead_code)]

use leasetrack_ordering::{keys_between, OrderedItem};
use leasetrack_storage::{CollectionKind, CollectionRef, KeyRow, OrderStore};
use tracing_subscriber::EnvFilter;

/// Log to the test output; `RUST_LOG=leasetrack_ordering=debug` for detail
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_test_writer()
        .try_init();
}

pub fn roadmap() -> CollectionRef {
    CollectionRef::new(CollectionKind::RoadmapSteps, "project-42")
}

/// Store `ids` in order with keys `a0, a1, …`
pub async fn seed_keys<S: OrderStore + ?Sized>(
    store: &S,
    collection: &CollectionRef,
    ids: &[&str],
) -> Vec<OrderedItem> {
    let keys = keys_between(None, None, ids.len()).unwrap();
    let items: Vec<OrderedItem> = ids
        .iter()
        .zip(keys)
        .map(|(id, key)| OrderedItem::new(*id, key))
        .collect();
    let rows: Vec<KeyRow> = items.iter().map(OrderedItem::to_row).collect();
    store.upsert_order_keys(collection, &rows).await.unwrap();
    items
}

pub fn ids<T: leasetrack_ordering::Orderable>(items: &[T]) -> Vec<String> {
    items.iter().map(|item| item.id().to_string()).collect()
}

pub fn keys(items: &[OrderedItem]) -> Vec<String> {
    items.iter().map(|item| item.order_key.to_string()).collect()
}
