//! Safe key generator
//!
//! Computes the key of a moved item from its new neighbours and falls back to
//! reindexing the whole list when the algebra fails (duplicate or malformed
//! neighbour keys) or the result exceeds the length threshold. Callers never
//! see a key error; the worst case is a plan that rewrites every row.
use tracing::{debug, warn};

use crate::error::{OrderError, Result};
use crate::item::{check_move, move_in_place, move_item, position_of, OrderedItem};
use crate::key::{key_between, KeyError, OrderKey};
use crate::reindex::reindex;

/// Outcome of planning a move or insertion
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyAssignment {
    /// The item stays where it is; nothing to write
    Unchanged { item: OrderedItem },

    /// Only the moved item gets a new key
    Moved(OrderedItem),

    /// The list was reindexed; every row must be written
    Reindexed {
        moved: OrderedItem,
        items: Vec<OrderedItem>,
    },
}

impl KeyAssignment {
    /// Final key of the item that was moved or inserted
    pub fn key(&self) -> &OrderKey {
        match self {
            Self::Unchanged { item } | Self::Moved(item) => &item.order_key,
            Self::Reindexed { moved, .. } => &moved.order_key,
        }
    }

    pub fn item(&self) -> &OrderedItem {
        match self {
            Self::Unchanged { item } | Self::Moved(item) => item,
            Self::Reindexed { moved, .. } => moved,
        }
    }

    /// Rows that must be persisted for this plan
    pub fn changed_rows(&self) -> Vec<OrderedItem> {
        match self {
            Self::Unchanged { .. } => Vec::new(),
            Self::Moved(item) => vec![item.clone()],
            Self::Reindexed { items, .. } => items.clone(),
        }
    }

    pub fn is_reindexed(&self) -> bool {
        matches!(self, Self::Reindexed { .. })
    }
}

/// Plan moving `items[old_index]` to `new_index`
///
/// # Errors
///
/// - `OrderError::IndexOutOfBounds` if either index is outside the list
/// - `OrderError::KeyGenerationExhausted` / `OrderError::KeyTooLong` if even a
///   freshly reindexed list cannot satisfy `max_key_length`
pub fn generate_safe_key(
    items: &[OrderedItem],
    old_index: usize,
    new_index: usize,
    max_key_length: usize,
) -> Result<KeyAssignment> {
    check_move(items.len(), old_index, new_index)?;
    if old_index == new_index {
        return Ok(KeyAssignment::Unchanged {
            item: items[old_index].clone(),
        });
    }

    let simulated = move_item(items, old_index, new_index)?;
    let moved_id = simulated[new_index].id.clone();
    let prev = new_index.checked_sub(1).map(|i| &simulated[i].order_key);
    let next = simulated.get(new_index + 1).map(|item| &item.order_key);

    match key_between(prev, next) {
        Ok(key) if key.len() <= max_key_length => {
            debug!("Item {}: new key {} at {}", moved_id, key, new_index);
            Ok(KeyAssignment::Moved(OrderedItem::new(moved_id, key)))
        }
        Ok(key) => {
            debug!(
                "Item {}: key length {} exceeds {}, reindexing {} items",
                moved_id,
                key.len(),
                max_key_length,
                simulated.len()
            );
            reindex_plan(simulated, new_index, max_key_length)
        }
        Err(e) => {
            warn!("Item {}: key generation failed ({}), reindexing", moved_id, e);
            reindex_plan(simulated, new_index, max_key_length)
        }
    }
}

/// Plan appending a new item with id `id` after the last item
pub fn append_key(items: &[OrderedItem], id: &str, max_key_length: usize) -> Result<KeyAssignment> {
    if position_of(items, id).is_some() {
        return Err(OrderError::DuplicateItem(id.to_string()));
    }

    let last = items.last().map(|item| &item.order_key);
    let mut extended = items.to_vec();
    match key_between(last, None) {
        Ok(key) if key.len() <= max_key_length => Ok(KeyAssignment::Moved(OrderedItem::new(id, key))),
        outcome => {
            if let Err(e) = &outcome {
                warn!("Item {}: append key failed ({}), reindexing", id, e);
            }
            extended.push(OrderedItem::new(id, OrderKey::from_raw("")));
            let index = extended.len() - 1;
            reindex_plan(extended, index, max_key_length)
        }
    }
}

/// Apply a move plan to `items` in place
///
/// `items`, `old_index` and `new_index` must be the ones the plan was made from.
pub fn apply_assignment(
    items: &mut Vec<OrderedItem>,
    old_index: usize,
    new_index: usize,
    assignment: &KeyAssignment,
) -> Result<()> {
    match assignment {
        KeyAssignment::Unchanged { .. } => Ok(()),
        KeyAssignment::Moved(item) => {
            move_in_place(items, old_index, new_index)?;
            items[new_index] = item.clone();
            Ok(())
        }
        KeyAssignment::Reindexed { items: reindexed, .. } => {
            *items = reindexed.clone();
            Ok(())
        }
    }
}

fn reindex_plan(
    simulated: Vec<OrderedItem>,
    moved_index: usize,
    max_key_length: usize,
) -> Result<KeyAssignment> {
    let items = reindex(&simulated)?;
    if let Some(longest) = items.iter().map(|item| item.order_key.len()).max() {
        if longest > max_key_length {
            return Err(OrderError::KeyTooLong {
                len: longest,
                max: max_key_length,
            });
        }
    }
    let moved = items
        .get(moved_index)
        .cloned()
        .ok_or_else(|| OrderError::KeyGenerationExhausted(KeyError::Exhausted.to_string()))?;
    Ok(KeyAssignment::Reindexed { moved, items })
}
