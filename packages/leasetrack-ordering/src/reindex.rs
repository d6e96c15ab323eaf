//! Reindexer
use crate::error::{OrderError, Result};
use crate::item::OrderedItem;
use crate::key::keys_between;

/// Assign fresh, evenly spaced keys in the current list order
///
/// Keys are consecutive integers from `a0`, so they stay short for any
/// realistic list size. Ids and list order are preserved.
pub fn reindex(items: &[OrderedItem]) -> Result<Vec<OrderedItem>> {
    let keys = keys_between(None, None, items.len())
        .map_err(|e| OrderError::KeyGenerationExhausted(e.to_string()))?;

    Ok(items
        .iter()
        .zip(keys)
        .map(|(item, key)| OrderedItem::new(item.id.clone(), key))
        .collect())
}
