//! Transaction coordinator for the file store
//!
//! Owns the store's transaction state machine:
//!
//! ```text
//!            begin                    commit (write ok)
//!   Idle ─────────────▶ InTransaction ──────────────────▶ Idle
//!    ▲                      │   │
//!    │      rollback        │   │ commit (write failed)
//!    └──────────────────────┘   └──▶ InTransaction (unchanged)
//! ```
//!
//! `InTransaction` carries the state the store had at `begin`, which is what
//! `rollback` restores. At most one transaction is active per coordinator.

use eventfile_core::{Error, Result};
use eventfile_memory::StoreSnapshot;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

/// Transaction state of a store
#[derive(Debug, Clone, Default, PartialEq)]
pub enum TransactionState {
    /// No transaction is active
    #[default]
    Idle,
    /// A transaction is active
    InTransaction {
        /// Store state when the transaction began
        snapshot: StoreSnapshot,
    },
}

impl TransactionState {
    /// Whether a transaction is active
    pub fn is_active(&self) -> bool {
        matches!(self, TransactionState::InTransaction { .. })
    }
}

/// Tracks the active transaction and lifecycle counters
///
/// The counters use Relaxed ordering; they are observational only.
#[derive(Debug, Default)]
pub struct TransactionCoordinator {
    state: Mutex<TransactionState>,
    total_started: AtomicU64,
    total_committed: AtomicU64,
    total_rolled_back: AtomicU64,
    failed_commits: AtomicU64,
}

impl TransactionCoordinator {
    /// Coordinator in the `Idle` state
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a transaction is active
    pub fn in_transaction(&self) -> bool {
        self.state.lock().is_active()
    }

    /// Start a transaction
    ///
    /// `snapshot` is only taken if no transaction is active.
    ///
    /// # Errors
    ///
    /// `InvalidState` if a transaction is already active; the existing
    /// transaction is left untouched.
    pub fn begin(&self, snapshot: impl FnOnce() -> StoreSnapshot) -> Result<()> {
        let mut state = self.state.lock();
        if state.is_active() {
            return Err(Error::invalid_state("Transaction already started"));
        }
        *state = TransactionState::InTransaction {
            snapshot: snapshot(),
        };
        self.total_started.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Close the active transaction once `write` succeeds
    ///
    /// The state lock is held while `write` runs, so no other transaction can
    /// begin in between. If `write` fails the transaction stays open.
    pub fn commit_with<T>(&self, write: impl FnOnce() -> Result<T>) -> Result<T> {
        let mut state = self.state.lock();
        if !state.is_active() {
            return Err(Error::invalid_state("Transaction not started"));
        }
        match write() {
            Ok(value) => {
                *state = TransactionState::Idle;
                self.total_committed.fetch_add(1, Ordering::Relaxed);
                Ok(value)
            }
            Err(e) => {
                self.failed_commits.fetch_add(1, Ordering::Relaxed);
                Err(e)
            }
        }
    }

    /// Close the active transaction and hand back its starting state
    pub fn rollback(&self) -> Result<StoreSnapshot> {
        let mut state = self.state.lock();
        match std::mem::take(&mut *state) {
            TransactionState::InTransaction { snapshot } => {
                self.total_rolled_back.fetch_add(1, Ordering::Relaxed);
                Ok(snapshot)
            }
            TransactionState::Idle => Err(Error::invalid_state("Transaction not started")),
        }
    }

    /// Current counters
    pub fn metrics(&self) -> TransactionMetrics {
        TransactionMetrics {
            active: self.in_transaction(),
            total_started: self.total_started.load(Ordering::Relaxed),
            total_committed: self.total_committed.load(Ordering::Relaxed),
            total_rolled_back: self.total_rolled_back.load(Ordering::Relaxed),
            failed_commits: self.failed_commits.load(Ordering::Relaxed),
        }
    }
}

/// Transaction statistics of a store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransactionMetrics {
    /// Whether a transaction is currently active
    pub active: bool,
    /// Transactions started
    pub total_started: u64,
    /// Transactions committed
    pub total_committed: u64,
    /// Transactions rolled back
    pub total_rolled_back: u64,
    /// Commit attempts whose write failed
    pub failed_commits: u64,
}

impl TransactionMetrics {
    /// Transactions that ended (committed + rolled back)
    pub fn total_completed(&self) -> u64 {
        self.total_committed + self.total_rolled_back
    }
}
