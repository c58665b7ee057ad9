//! Transaction pool
//!
//! Application transactions wait here until the event creator pulls them
//! into a new self event.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tipset_core::Transaction;
use tipset_creator::TransactionSupplier;
use tracing::trace;

/// Shared FIFO of pending transactions
#[derive(Clone, Default)]
pub struct TransactionPool {
    pending: Arc<Mutex<VecDeque<Transaction>>>,
}

impl TransactionPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a transaction for the next events
    pub fn submit(&self, transaction: Transaction) {
        self.pending.lock().push_back(transaction);
    }

    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }

    /// Whether transactions are still waiting to be put into events
    pub fn has_buffered_transactions(&self) -> bool {
        !self.is_empty()
    }

    /// Supplier handle that drains at most `max_bytes` per event
    pub fn supplier(&self, max_bytes: usize) -> PoolSupplier {
        PoolSupplier {
            pool: self.clone(),
            max_bytes,
        }
    }

    /// Take transactions in FIFO order up to `max_bytes`. The first
    /// transaction is always taken, even if it alone exceeds the limit.
    fn drain(&self, max_bytes: usize) -> Vec<Transaction> {
        let mut pending = self.pending.lock();
        let mut taken = Vec::new();
        let mut bytes = 0usize;

        while let Some(next) = pending.front() {
            if !taken.is_empty() && bytes + next.len() > max_bytes {
                break;
            }
            bytes += next.len();
            if let Some(transaction) = pending.pop_front() {
                taken.push(transaction);
            }
        }

        trace!("Drained {} transactions ({} bytes), {} remain", taken.len(), bytes, pending.len());
        taken
    }
}

/// [`TransactionSupplier`] backed by a [`TransactionPool`]
#[derive(Clone)]
pub struct PoolSupplier {
    pool: TransactionPool,
    max_bytes: usize,
}

impl TransactionSupplier for PoolSupplier {
    fn get_transactions(&self) -> Vec<Transaction> {
        self.pool.drain(self.max_bytes)
    }
}
