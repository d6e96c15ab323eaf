//! Dense integer ordering
//!
//! Legacy scheme where `order_index` is the item's position. Every move
//! renumbers the whole list, so the rewrite must be persisted as one batch.
use crate::error::Result;
use crate::item::{move_item, IndexedItem};

/// Number `items` `0..n` in their current order
pub fn reassign_indices(items: &[IndexedItem]) -> Vec<IndexedItem> {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| IndexedItem::new(item.id.clone(), Some(i as i64)))
        .collect()
}

/// Move `items[old_index]` to `new_index` and renumber the result
pub fn plan_dense_move(
    items: &[IndexedItem],
    old_index: usize,
    new_index: usize,
) -> Result<Vec<IndexedItem>> {
    Ok(reassign_indices(&move_item(items, old_index, new_index)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_plan_dense_move() {
        let items = vec![
            IndexedItem::new("s1", Some(0)),
            IndexedItem::new("s2", Some(1)),
            IndexedItem::new("s3", None),
        ];
        let planned = plan_dense_move(&items, 2, 0).unwrap();
        assert_eq!(
            planned,
            vec![
                IndexedItem::new("s3", Some(0)),
                IndexedItem::new("s1", Some(1)),
                IndexedItem::new("s2", Some(2)),
            ]
        );
    }

    #[test]
    fn test_reassign_closes_gaps() {
        let items = vec![IndexedItem::new("a", Some(4)), IndexedItem::new("b", Some(9))];
        let indices: Vec<_> = reassign_indices(&items)
            .into_iter()
            .map(|i| i.order_index)
            .collect();
        assert_eq!(indices, vec![Some(0), Some(1)]);
    }
}
