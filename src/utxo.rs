//! Unspent output set: 𝒰𝒮 = 𝒪 → 𝒯

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::types::*;

/// Mapping from out-point to the unspent output it names.
///
/// Each branch owns its own copy; two sets never share mutable state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtxoSet {
    utxos: HashMap<OutPoint, TransactionOutput>,
}

impl UtxoSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_utxo(&mut self, outpoint: OutPoint, output: TransactionOutput) {
        self.utxos.insert(outpoint, output);
    }

    pub fn remove_utxo(&mut self, outpoint: &OutPoint) -> Option<TransactionOutput> {
        self.utxos.remove(outpoint)
    }

    pub fn get(&self, outpoint: &OutPoint) -> Option<&TransactionOutput> {
        self.utxos.get(outpoint)
    }

    pub fn contains(&self, outpoint: &OutPoint) -> bool {
        self.utxos.contains_key(outpoint)
    }

    pub fn len(&self) -> usize {
        self.utxos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.utxos.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&OutPoint, &TransactionOutput)> {
        self.utxos.iter()
    }

    /// Out-points in ascending order
    pub fn outpoints(&self) -> Vec<OutPoint> {
        let mut outpoints: Vec<OutPoint> = self.utxos.keys().copied().collect();
        outpoints.sort();
        outpoints
    }

    /// Sum of all unspent values, `None` on overflow
    pub fn total_value(&self) -> Option<Amount> {
        self.utxos.values().try_fold(0i64, |acc, o| acc.checked_add(o.value))
    }
}

impl FromIterator<(OutPoint, TransactionOutput)> for UtxoSet {
    fn from_iter<I: IntoIterator<Item = (OutPoint, TransactionOutput)>>(iter: I) -> Self {
        Self { utxos: iter.into_iter().collect() }
    }
}
