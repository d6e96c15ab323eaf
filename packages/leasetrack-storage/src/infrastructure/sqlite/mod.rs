//! SQLite adapter for OrderStore
//!
//! One `order_entries` table holds the order metadata of every collection.
//! A unique index on `(collection, parent_id, order_key)` enforces the
//! collection ordering invariant at the database level; each batch runs in a
//! single transaction so a rejected row rolls the whole batch back.
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::Arc;

use crate::domain::{sort_rows, CollectionRef, IndexRow, KeyRow, OrderField, OrderRow, OrderStore};
use crate::Result;

/// SQLite-based OrderStore implementation
#[derive(Clone)]
pub struct SqliteOrderStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteOrderStore {
    /// Open (or create) a store at the given path
    pub fn new(db_path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(db_path)?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory SQLite store (for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.conn.lock();

        conn.execute(
            "CREATE TABLE IF NOT EXISTS order_entries (
                collection TEXT NOT NULL,
                parent_id TEXT NOT NULL,
                item_id TEXT NOT NULL,
                order_key TEXT,
                order_index INTEGER,
                updated_at INTEGER NOT NULL,
                PRIMARY KEY (collection, parent_id, item_id)
            )",
            [],
        )?;

        // NULL keys are distinct, which lets a batch park rows while it rewrites them.
        conn.execute(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_order_entries_key
             ON order_entries(collection, parent_id, order_key)",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_order_entries_index
             ON order_entries(collection, parent_id, order_index)",
            [],
        )?;

        Ok(())
    }
}

#[async_trait]
impl OrderStore for SqliteOrderStore {
    async fn fetch_ordered(
        &self,
        collection: &CollectionRef,
        field: OrderField,
    ) -> Result<Vec<OrderRow>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT item_id, order_key, order_index, updated_at
             FROM order_entries WHERE collection = ?1 AND parent_id = ?2",
        )?;
        let mut rows = stmt
            .query_map(
                params![collection.kind.table_name(), &collection.parent_id],
                |row| {
                    Ok(OrderRow {
                        item_id: row.get(0)?,
                        order_key: row.get(1)?,
                        order_index: row.get(2)?,
                        updated_at: chrono::DateTime::from_timestamp(row.get(3)?, 0)
                            .unwrap_or_default(),
                    })
                },
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        // Sorted in Rust so both adapters share one definition of byte-wise key order.
        sort_rows(&mut rows, field);
        Ok(rows)
    }

    async fn upsert_order_keys(&self, collection: &CollectionRef, rows: &[KeyRow]) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let table = collection.kind.table_name();
        let now = Utc::now().timestamp();

        // Clear the keys being rewritten first; the unique index is checked per
        // statement, so a permutation of existing keys would otherwise collide.
        for row in rows {
            tx.execute(
                "UPDATE order_entries SET order_key = NULL
                 WHERE collection = ?1 AND parent_id = ?2 AND item_id = ?3",
                params![table, &collection.parent_id, &row.item_id],
            )?;
        }

        for row in rows {
            tx.execute(
                "INSERT INTO order_entries (collection, parent_id, item_id, order_key, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(collection, parent_id, item_id)
                 DO UPDATE SET order_key = excluded.order_key, updated_at = excluded.updated_at",
                params![table, &collection.parent_id, &row.item_id, &row.order_key, now],
            )?;
        }

        tx.commit()?;
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
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let table = collection.kind.table_name();
        let now = Utc::now().timestamp();

        for row in rows {
            tx.execute(
                "INSERT INTO order_entries (collection, parent_id, item_id, order_index, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(collection, parent_id, item_id)
                 DO UPDATE SET order_index = excluded.order_index, updated_at = excluded.updated_at",
                params![table, &collection.parent_id, &row.item_id, row.order_index, now],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    async fn delete_item(&self, collection: &CollectionRef, item_id: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let removed = conn.execute(
            "DELETE FROM order_entries WHERE collection = ?1 AND parent_id = ?2 AND item_id = ?3",
            params![collection.kind.table_name(), &collection.parent_id, item_id],
        )?;
        Ok(removed > 0)
    }
}
