//! Transaction supplier seam

use tipset_core::Transaction;

/// Provides the transactions to embed in the next self event
pub trait TransactionSupplier: Send + Sync {
    /// Take the transactions for one event; may be empty
    fn get_transactions(&self) -> Vec<Transaction>;
}

/// Supplier that never has anything to offer
#[derive(Clone, Copy, Debug, Default)]
pub struct NoTransactions;

impl TransactionSupplier for NoTransactions {
    fn get_transactions(&self) -> Vec<Transaction> {
        Vec::new()
    }
}

impl<F> TransactionSupplier for F
where
    F: Fn() -> Vec<Transaction> + Send + Sync,
{
    fn get_transactions(&self) -> Vec<Transaction> {
        self()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closure_supplier() {
        let supplier = || vec![Transaction::new(vec![1u8, 2])];
        assert_eq!(supplier.get_transactions().len(), 1);
        assert!(NoTransactions.get_transactions().is_empty());
    }
}
