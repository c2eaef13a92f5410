//! Pending transaction pool

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::types::*;

/// Not-yet-confirmed transactions keyed by hash. Nothing is validated on insertion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionPool {
    transactions: HashMap<Hash, Transaction>,
}

impl TransactionPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `tx`, replacing any entry with the same hash. Returns the hash.
    pub fn add_transaction(&mut self, tx: Transaction) -> Hash {
        let hash = tx.hash();
        self.transactions.insert(hash, tx);
        hash
    }

    pub fn remove_transaction(&mut self, hash: &Hash) -> Option<Transaction> {
        self.transactions.remove(hash)
    }

    pub fn get(&self, hash: &Hash) -> Option<&Transaction> {
        self.transactions.get(hash)
    }

    pub fn contains(&self, hash: &Hash) -> bool {
        self.transactions.contains_key(hash)
    }

    /// All pending transactions, ordered by hash
    pub fn transactions(&self) -> Vec<Transaction> {
        let mut entries: Vec<(&Hash, &Transaction)> = self.transactions.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries.into_iter().map(|(_, tx)| tx.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }
}
