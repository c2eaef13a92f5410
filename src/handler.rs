//! Stateful transaction handlers that carry a UTXO set across epochs

use serde::{Deserialize, Serialize};

use crate::block::{apply_in_order, BatchOutcome};
use crate::crypto::{Secp256k1Verifier, SignatureVerifier};
use crate::error::Result;
use crate::selection::select_max_fee;
use crate::types::*;
use crate::utxo::UtxoSet;

/// How a handler reduces an epoch's candidates to an accepted batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BatchPolicy {
    /// Accept in the given order, skipping invalid candidates
    InOrder,
    /// Exhaustive fee-maximizing search, bounded by `max_candidates`
    MaxFee { max_candidates: usize },
}

impl BatchPolicy {
    pub fn run<V: SignatureVerifier + ?Sized>(
        &self,
        utxo_set: &UtxoSet,
        candidates: &[Transaction],
        verifier: &V,
    ) -> Result<BatchOutcome> {
        match *self {
            BatchPolicy::InOrder => Ok(apply_in_order(utxo_set.clone(), candidates, verifier)),
            BatchPolicy::MaxFee { max_candidates } => {
                select_max_fee(utxo_set, candidates, verifier, max_candidates)
            }
        }
    }
}

/// Public ledger whose current state is the UTXO set left by the last epoch
pub struct TxHandler<V = Secp256k1Verifier> {
    utxo_set: UtxoSet,
    policy: BatchPolicy,
    verifier: V,
}

impl TxHandler<Secp256k1Verifier> {
    pub fn new(utxo_set: UtxoSet, policy: BatchPolicy) -> Self {
        Self::with_verifier(utxo_set, policy, Secp256k1Verifier::new())
    }
}

impl<V: SignatureVerifier> TxHandler<V> {
    pub fn with_verifier(utxo_set: UtxoSet, policy: BatchPolicy, verifier: V) -> Self {
        Self { utxo_set, policy, verifier }
    }

    /// Run one epoch: accept a mutually valid subset of `candidates` and adopt the
    /// resulting state. On error the state is unchanged.
    pub fn handle_txs(&mut self, candidates: &[Transaction]) -> Result<Vec<Transaction>> {
        let outcome = self.policy.run(&self.utxo_set, candidates, &self.verifier)?;
        self.utxo_set = outcome.utxo_set;
        Ok(outcome.accepted)
    }

    pub fn is_valid_tx(&self, tx: &Transaction) -> bool {
        crate::transaction::is_valid_tx(&self.utxo_set, tx, &self.verifier)
    }

    pub fn utxo_set(&self) -> &UtxoSet {
        &self.utxo_set
    }

    pub fn policy(&self) -> BatchPolicy {
        self.policy
    }
}
