use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{OrderError, Result};

/// Command being applied to a list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReorderOp {
    Move { old_index: usize, new_index: usize },
    Append { item_id: String },
    Remove { item_id: String },
}

impl std::fmt::Display for ReorderOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReorderOp::Move {
                old_index,
                new_index,
            } => write!(f, "move {} -> {}", old_index, new_index),
            ReorderOp::Append { item_id } => write!(f, "append {}", item_id),
            ReorderOp::Remove { item_id } => write!(f, "remove {}", item_id),
        }
    }
}

/// Reorder phase
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReorderPhase {
    Idle,
    Reordering {
        op: ReorderOp,
        started_at: DateTime<Utc>,
    },
    Committed {
        op: ReorderOp,
        started_at: DateTime<Utc>,
        committed_at: DateTime<Utc>,
    },
    RolledBack {
        op: ReorderOp,
        started_at: DateTime<Utc>,
        rolled_back_at: DateTime<Utc>,
        error: String,
    },
}

impl ReorderPhase {
    pub fn phase_name(&self) -> &'static str {
        match self {
            ReorderPhase::Idle => "idle",
            ReorderPhase::Reordering { .. } => "reordering",
            ReorderPhase::Committed { .. } => "committed",
            ReorderPhase::RolledBack { .. } => "rolled_back",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ReorderPhase::Committed { .. } | ReorderPhase::RolledBack { .. }
        )
    }
}

/// Phase transitions of one list
///
/// ```text
/// Idle ──begin──▶ Reordering ──commit────▶ Committed ──settle──▶ Idle
///                            └─roll_back─▶ RolledBack ─settle──▶ Idle
/// ```
#[derive(Debug, Clone)]
pub struct ReorderStateMachine {
    phase: ReorderPhase,
    last_settled: Option<ReorderPhase>,
}

impl Default for ReorderStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl ReorderStateMachine {
    pub fn new() -> Self {
        Self {
            phase: ReorderPhase::Idle,
            last_settled: None,
        }
    }

    pub fn phase(&self) -> &ReorderPhase {
        &self.phase
    }

    /// Terminal phase of the most recently settled operation
    pub fn last_settled(&self) -> Option<&ReorderPhase> {
        self.last_settled.as_ref()
    }

    pub fn is_reordering(&self) -> bool {
        matches!(self.phase, ReorderPhase::Reordering { .. })
    }

    /// Transition: IDLE → REORDERING
    pub fn begin(&mut self, op: ReorderOp) -> Result<()> {
        match &self.phase {
            ReorderPhase::Idle => {
                self.phase = ReorderPhase::Reordering {
                    op,
                    started_at: Utc::now(),
                };
                Ok(())
            }
            _ => Err(self.invalid("reordering")),
        }
    }

    /// Transition: REORDERING → COMMITTED
    pub fn commit(&mut self) -> Result<()> {
        match &self.phase {
            ReorderPhase::Reordering { op, started_at } => {
                self.phase = ReorderPhase::Committed {
                    op: op.clone(),
                    started_at: *started_at,
                    committed_at: Utc::now(),
                };
                Ok(())
            }
            _ => Err(self.invalid("committed")),
        }
    }

    /// Transition: REORDERING → ROLLED_BACK
    pub fn roll_back(&mut self, error: impl Into<String>) -> Result<()> {
        match &self.phase {
            ReorderPhase::Reordering { op, started_at } => {
                self.phase = ReorderPhase::RolledBack {
                    op: op.clone(),
                    started_at: *started_at,
                    rolled_back_at: Utc::now(),
                    error: error.into(),
                };
                Ok(())
            }
            _ => Err(self.invalid("rolled_back")),
        }
    }

    /// Transition: COMMITTED | ROLLED_BACK → IDLE
    pub fn settle(&mut self) -> Result<()> {
        if !self.phase.is_terminal() {
            return Err(self.invalid("idle"));
        }
        let terminal = std::mem::replace(&mut self.phase, ReorderPhase::Idle);
        self.last_settled = Some(terminal);
        Ok(())
    }

    fn invalid(&self, to: &str) -> OrderError {
        OrderError::InvalidStateTransition {
            from: self.phase.phase_name().to_string(),
            to: to.to_string(),
        }
    }
}
