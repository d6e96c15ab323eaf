//! Key health monitor
//!
//! Repeated insertion into the same gap makes keys grow. These checks decide
//! when a collection should be reindexed and summarize key quality for
//! telemetry. Nothing here mutates or logs.
use serde::Serialize;
use std::collections::HashSet;

use crate::item::OrderedItem;

/// Keys longer than this are considered degenerate
pub const DEFAULT_MAX_KEY_LENGTH: usize = 40;

/// True iff any key is longer than `max_key_length`
pub fn needs_reindexing(items: &[OrderedItem], max_key_length: usize) -> bool {
    items.iter().any(|item| item.order_key.len() > max_key_length)
}

/// Snapshot of key quality for one collection
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyHealthReport {
    pub item_count: usize,
    pub longest_key: usize,
    pub mean_key_length: f64,
    pub over_threshold: usize,
    /// Keys shared by more than one item
    pub duplicate_keys: Vec<String>,
    /// Adjacent pairs (in list order) whose keys are not strictly increasing
    pub inversions: usize,
    /// Ids of items whose keys fail validation
    pub invalid_keys: Vec<String>,
}

impl KeyHealthReport {
    pub fn inspect(items: &[OrderedItem], max_key_length: usize) -> Self {
        let lengths: Vec<usize> = items.iter().map(|item| item.order_key.len()).collect();
        let total: usize = lengths.iter().sum();

        let mut seen = HashSet::new();
        let mut duplicate_keys = Vec::new();
        for item in items {
            let key = item.order_key.as_str();
            if !seen.insert(key) && !duplicate_keys.iter().any(|d| d == key) {
                duplicate_keys.push(key.to_string());
            }
        }

        Self {
            item_count: items.len(),
            longest_key: lengths.iter().copied().max().unwrap_or(0),
            mean_key_length: if items.is_empty() {
                0.0
            } else {
                total as f64 / items.len() as f64
            },
            over_threshold: lengths.iter().filter(|&&len| len > max_key_length).count(),
            duplicate_keys,
            inversions: items
                .windows(2)
                .filter(|pair| pair[0].order_key >= pair[1].order_key)
                .count(),
            invalid_keys: items
                .iter()
                .filter(|item| !item.order_key.is_valid())
                .map(|item| item.id.clone())
                .collect(),
        }
    }

    /// No duplicates, inversions or malformed keys
    pub fn is_consistent(&self) -> bool {
        self.duplicate_keys.is_empty() && self.inversions == 0 && self.invalid_keys.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::OrderKey;

    fn items(keys: &[&str]) -> Vec<OrderedItem> {
        keys.iter()
            .enumerate()
            .map(|(i, k)| OrderedItem::new(format!("item-{i}"), OrderKey::from_raw(*k)))
            .collect()
    }

    #[test]
    fn test_needs_reindexing_threshold() {
        let at_limit = "a".to_string() + &"V".repeat(39);
        assert_eq!(at_limit.len(), 40);
        assert!(!needs_reindexing(&items(&["a0", &at_limit]), DEFAULT_MAX_KEY_LENGTH));

        let over = at_limit + "V";
        assert!(needs_reindexing(&items(&["a0", &over]), DEFAULT_MAX_KEY_LENGTH));
        assert!(!needs_reindexing(&[], DEFAULT_MAX_KEY_LENGTH));
    }

    #[test]
    fn test_healthy_report() {
        let report = KeyHealthReport::inspect(&items(&["a0", "a0V", "a1"]), 40);
        assert_eq!(report.item_count, 3);
        assert_eq!(report.longest_key, 3);
        assert!((report.mean_key_length - 7.0 / 3.0).abs() < f64::EPSILON);
        assert!(report.is_consistent());
    }

    #[test]
    fn test_damaged_report() {
        let report = KeyHealthReport::inspect(&items(&["a1", "a1", "a0", "bad key"]), 2);
        assert_eq!(report.duplicate_keys, vec!["a1".to_string()]);
        assert_eq!(report.inversions, 2);
        assert_eq!(report.invalid_keys, vec!["item-3".to_string()]);
        assert_eq!(report.over_threshold, 1);
        assert!(!report.is_consistent());
    }
}
