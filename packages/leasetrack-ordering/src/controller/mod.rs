//! Reorder controller
//!
//! Owns one user-sortable list and reconciles optimistic local changes with
//! the store. Every command runs the same cycle:
//!
//! 1. reject if another command is in flight
//! 2. plan the change and apply it locally
//! 3. persist, bounded by `persist_timeout_ms`
//! 4. on success optionally refetch, on failure restore the snapshot and
//!    expose `reorder_error`
//!
//! The list lives behind a mutex that is never held across a store call, so
//! `items()` reflects the optimistic state while a write is pending.
//!
//! A command future dropped mid-flight (caller timeout, `select!`, aborted
//! task) still settles: an unconfirmed change is rolled back with the error
//! `"cancelled"`, a confirmed one is committed.

mod scheme;
mod state;

pub use scheme::{DenseScheme, FractionalScheme, ListPlan, ListWrite, OrderScheme};
pub use state::{ReorderOp, ReorderPhase, ReorderStateMachine};

use leasetrack_storage::CollectionRef;
use parking_lot::Mutex;
use std::future::Future;
use tracing::{debug, info, warn};

use crate::config::OrderingConfig;
use crate::error::{OrderError, Result};

/// What happened to a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReorderOutcome {
    /// Persisted; the new order is in effect
    Committed,
    /// The write failed or timed out; the previous order was restored
    RolledBack,
    /// Nothing to do (`old_index == new_index`)
    Unchanged,
    /// Another command was in flight; nothing was changed
    Rejected,
}

type CommitCallback = Box<dyn Fn(&ReorderOp) + Send + Sync>;

const CANCELLED: &str = "cancelled";

struct ListState<T> {
    items: Vec<T>,
    machine: ReorderStateMachine,
    error: Option<String>,
    /// Bumped whenever a command starts; a refresh that spans a bump is stale
    generation: u64,
}

/// Settles a started command if its future is dropped before it finishes
struct InFlight<'a, T> {
    state: &'a Mutex<ListState<T>>,
    collection: &'a CollectionRef,
    op: &'a ReorderOp,
    error_message: &'a str,
    snapshot: Option<Vec<T>>,
    persisted: bool,
}

impl<T> InFlight<'_, T> {
    /// Hand the snapshot back to the normal completion path
    fn disarm(mut self) -> Vec<T> {
        self.snapshot.take().unwrap_or_default()
    }
}

impl<T> Drop for InFlight<'_, T> {
    fn drop(&mut self) {
        let Some(snapshot) = self.snapshot.take() else {
            return;
        };
        let mut state = self.state.lock();
        let result = if self.persisted {
            // The write is durable; keep the optimistic list.
            state.machine.commit()
        } else {
            state.items = snapshot;
            state.error = Some(self.error_message.to_string());
            state.machine.roll_back(CANCELLED)
        };
        match result.and_then(|()| state.machine.settle()) {
            Ok(()) => warn!(
                "Collection {}: {} dropped before settling, {}",
                self.collection,
                self.op,
                if self.persisted { "committed" } else { "rolled back" }
            ),
            Err(e) => warn!("Collection {}: {} could not settle: {}", self.collection, self.op, e),
        }
    }
}

pub struct ReorderController<S: OrderScheme> {
    scheme: S,
    collection: CollectionRef,
    config: OrderingConfig,
    state: Mutex<ListState<S::Item>>,
    on_committed: Option<CommitCallback>,
}

impl<S: OrderScheme> ReorderController<S> {
    /// Controller over an already loaded list
    pub fn new(
        mut scheme: S,
        collection: CollectionRef,
        items: Vec<S::Item>,
        config: OrderingConfig,
    ) -> Result<Self> {
        config.validate()?;
        scheme.configure(&config);
        Ok(Self {
            scheme,
            collection,
            config,
            state: Mutex::new(ListState {
                items,
                machine: ReorderStateMachine::new(),
                error: None,
                generation: 0,
            }),
            on_committed: None,
        })
    }

    /// Controller over the list currently stored for `collection`
    pub async fn load(scheme: S, collection: CollectionRef, config: OrderingConfig) -> Result<Self> {
        let controller = Self::new(scheme, collection, Vec::new(), config)?;
        let items = controller.bounded("load", controller.scheme.load(&controller.collection)).await?;
        info!("Collection {}: loaded {} items", controller.collection, items.len());
        controller.state.lock().items = items;
        Ok(controller)
    }

    /// Run `callback` after every committed command
    pub fn with_on_committed(mut self, callback: impl Fn(&ReorderOp) + Send + Sync + 'static) -> Self {
        self.on_committed = Some(Box::new(callback));
        self
    }

    pub fn collection(&self) -> &CollectionRef {
        &self.collection
    }

    pub fn config(&self) -> &OrderingConfig {
        &self.config
    }

    pub fn items(&self) -> Vec<S::Item> {
        self.state.lock().items.clone()
    }

    pub fn is_reordering(&self) -> bool {
        self.state.lock().machine.is_reordering()
    }

    /// User-visible message of the last rolled back command
    pub fn reorder_error(&self) -> Option<String> {
        self.state.lock().error.clone()
    }

    pub fn dismiss_error(&self) {
        self.state.lock().error = None;
    }

    pub fn phase(&self) -> ReorderPhase {
        self.state.lock().machine.phase().clone()
    }

    pub fn last_settled(&self) -> Option<ReorderPhase> {
        self.state.lock().machine.last_settled().cloned()
    }

    /// Move the item at `old_index` to `new_index`
    ///
    /// # Errors
    ///
    /// `OrderError::IndexOutOfBounds` for indices outside the list. Backend
    /// failures (`OrderError::Persistence`, `OrderError::Timeout`) are not
    /// errors: they roll back and return `ReorderOutcome::RolledBack`. Any
    /// other failure while persisting also rolls back, then is returned.
    pub async fn handle_reorder(&self, old_index: usize, new_index: usize) -> Result<ReorderOutcome> {
        let op = ReorderOp::Move {
            old_index,
            new_index,
        };
        self.execute(op, |scheme, items| scheme.plan_move(items, old_index, new_index))
            .await
    }

    /// Add a new item at the end of the list
    pub async fn append(&self, item_id: &str) -> Result<ReorderOutcome> {
        let op = ReorderOp::Append {
            item_id: item_id.to_string(),
        };
        self.execute(op, |scheme, items| scheme.plan_append(items, item_id))
            .await
    }

    /// Remove an item; siblings keep their order values
    ///
    /// Confirmation is the caller's job.
    pub async fn remove(&self, item_id: &str) -> Result<ReorderOutcome> {
        let op = ReorderOp::Remove {
            item_id: item_id.to_string(),
        };
        self.execute(op, |scheme, items| scheme.plan_remove(items, item_id))
            .await
    }

    /// Reload the list from the store
    ///
    /// Returns `false` without changing anything if a command is in flight,
    /// or if one started while the rows were loading.
    pub async fn refresh(&self) -> Result<bool> {
        let started = {
            let state = self.state.lock();
            if state.machine.is_reordering() {
                debug!("Collection {}: refresh skipped, reorder in flight", self.collection);
                return Ok(false);
            }
            state.generation
        };
        let items = self.bounded("refresh", self.scheme.load(&self.collection)).await?;

        let mut state = self.state.lock();
        if state.generation != started {
            debug!("Collection {}: refresh discarded, list changed while loading", self.collection);
            return Ok(false);
        }
        state.items = items;
        Ok(true)
    }

    async fn execute<P>(&self, op: ReorderOp, plan: P) -> Result<ReorderOutcome>
    where
        P: FnOnce(&S, &[S::Item]) -> Result<ListPlan<S::Item>>,
    {
        let (mut pending, write) = {
            let mut state = self.state.lock();
            if state.machine.is_reordering() {
                info!(
                    "Collection {}: {} rejected, reorder already in flight",
                    self.collection, op
                );
                return Ok(ReorderOutcome::Rejected);
            }

            let planned = plan(&self.scheme, state.items.as_slice())?;
            if planned.write.is_none() {
                return Ok(ReorderOutcome::Unchanged);
            }

            state.error = None;
            state.machine.begin(op.clone())?;
            state.generation += 1;
            let snapshot = std::mem::replace(&mut state.items, planned.items);
            let pending = InFlight {
                state: &self.state,
                collection: &self.collection,
                op: &op,
                error_message: &self.config.error_message,
                snapshot: Some(snapshot),
                persisted: false,
            };
            (pending, planned.write)
        };
        debug!("Collection {}: {} applied optimistically", self.collection, op);

        let result = self
            .bounded("persist", self.scheme.persist(&self.collection, &write))
            .await;
        pending.persisted = result.is_ok();
        let refreshed = match &result {
            Ok(()) if self.config.refetch_on_commit => {
                match self.bounded("refetch", self.scheme.load(&self.collection)).await {
                    Ok(items) => Some(items),
                    Err(e) => {
                        // The write is durable; keep the optimistic list.
                        warn!("Collection {}: refetch after {} failed: {}", self.collection, op, e);
                        None
                    }
                }
            }
            _ => None,
        };

        let outcome = {
            let mut state = self.state.lock();
            let snapshot = pending.disarm();
            match result {
                Ok(()) => {
                    if let Some(items) = refreshed {
                        state.items = items;
                    }
                    state.machine.commit()?;
                    state.machine.settle()?;
                    ReorderOutcome::Committed
                }
                Err(e) => {
                    state.items = snapshot;
                    state.error = Some(self.config.error_message.clone());
                    state.machine.roll_back(e.to_string())?;
                    state.machine.settle()?;
                    warn!("Collection {}: {} rolled back: {}", self.collection, op, e);
                    if !e.is_backend_failure() {
                        return Err(e);
                    }
                    ReorderOutcome::RolledBack
                }
            }
        };

        if outcome == ReorderOutcome::Committed {
            info!("Collection {}: {} committed", self.collection, op);
            if let Some(callback) = &self.on_committed {
                callback(&op);
            }
        }
        Ok(outcome)
    }

    /// Await a store call under the configured timeout
    async fn bounded<T, F>(&self, what: &str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match self.config.persist_timeout() {
            Some(limit) => tokio::time::timeout(limit, fut).await.map_err(|_| {
                OrderError::Timeout(format!(
                    "{} on {} exceeded {}ms",
                    what, self.collection, self.config.persist_timeout_ms
                ))
            })?,
            None => fut.await,
        }
    }
}
