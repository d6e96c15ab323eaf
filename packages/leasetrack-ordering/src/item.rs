//! Orderable items and list moves
use leasetrack_storage::{IndexRow, KeyRow, OrderRow};
use serde::{Deserialize, Serialize};

use crate::error::{OrderError, Result};
use crate::key::OrderKey;

/// Anything that occupies a slot in a user-sorted list
pub trait Orderable {
    fn id(&self) -> &str;
}

/// Item of a fractionally indexed collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderedItem {
    pub id: String,
    pub order_key: OrderKey,
}

impl OrderedItem {
    pub fn new(id: impl Into<String>, order_key: OrderKey) -> Self {
        Self {
            id: id.into(),
            order_key,
        }
    }

    /// Rows loaded from storage keep their keys unvalidated; rows without a
    /// key get an empty one, which is invalid and triggers a reindex on use.
    pub fn from_row(row: OrderRow) -> Self {
        Self {
            id: row.item_id,
            order_key: OrderKey::from_raw(row.order_key.unwrap_or_default()),
        }
    }

    pub fn to_row(&self) -> KeyRow {
        KeyRow::new(self.id.clone(), self.order_key.as_str())
    }
}

impl Orderable for OrderedItem {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Item of a densely indexed collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexedItem {
    pub id: String,
    pub order_index: Option<i64>,
}

impl IndexedItem {
    pub fn new(id: impl Into<String>, order_index: Option<i64>) -> Self {
        Self {
            id: id.into(),
            order_index,
        }
    }

    pub fn from_row(row: OrderRow) -> Self {
        Self {
            id: row.item_id,
            order_index: row.order_index,
        }
    }

    /// `None` for items that were never numbered
    pub fn to_row(&self) -> Option<IndexRow> {
        self.order_index
            .map(|index| IndexRow::new(self.id.clone(), index))
    }
}

impl Orderable for IndexedItem {
    fn id(&self) -> &str {
        &self.id
    }
}

pub(crate) fn check_move(len: usize, old_index: usize, new_index: usize) -> Result<()> {
    for index in [old_index, new_index] {
        if index >= len {
            return Err(OrderError::out_of_bounds(index, len));
        }
    }
    Ok(())
}

/// Copy of `items` with the element at `old_index` moved to `new_index`
///
/// Splice semantics: remove first, then insert, so `new_index` is a position
/// in the resulting list.
pub fn move_item<T: Clone>(items: &[T], old_index: usize, new_index: usize) -> Result<Vec<T>> {
    let mut moved = items.to_vec();
    move_in_place(&mut moved, old_index, new_index)?;
    Ok(moved)
}

pub fn move_in_place<T>(items: &mut Vec<T>, old_index: usize, new_index: usize) -> Result<()> {
    check_move(items.len(), old_index, new_index)?;
    let item = items.remove(old_index);
    items.insert(new_index, item);
    Ok(())
}

pub(crate) fn position_of<T: Orderable>(items: &[T], id: &str) -> Option<usize> {
    items.iter().position(|item| item.id() == id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_move_forward_and_back() {
        let items = vec!['a', 'b', 'c', 'd'];
        assert_eq!(move_item(&items, 0, 2).unwrap(), vec!['b', 'c', 'a', 'd']);
        assert_eq!(move_item(&items, 3, 1).unwrap(), vec!['a', 'd', 'b', 'c']);
        assert_eq!(move_item(&items, 2, 2).unwrap(), items);
    }

    #[test]
    fn test_move_out_of_bounds() {
        let mut items = vec![1, 2, 3];
        let err = move_in_place(&mut items, 0, 3).unwrap_err();
        assert!(matches!(err, OrderError::IndexOutOfBounds { index: 3, len: 3 }));
        assert_eq!(items, vec![1, 2, 3]);
        assert!(move_item::<u8>(&[], 0, 0).is_err());
    }

    #[test]
    fn test_from_row_without_key() {
        let item = OrderedItem::from_row(OrderRow {
            item_id: "doc-1".into(),
            order_key: None,
            order_index: Some(3),
            updated_at: Utc::now(),
        });
        assert!(item.order_key.is_empty());
        assert!(!item.order_key.is_valid());
    }

    #[test]
    fn test_indexed_item_row() {
        assert_eq!(
            IndexedItem::new("s1", Some(4)).to_row(),
            Some(IndexRow::new("s1", 4))
        );
        assert_eq!(IndexedItem::new("s1", None).to_row(), None);
    }
}
