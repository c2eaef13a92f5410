//! Fee-maximizing batch selection by exhaustive search over orderings
//!
//! Every ordering of the candidates is run through [`apply_in_order`] on a fresh copy of
//! the entry state. The ordering whose accepted subset pays the strictly greatest total
//! fee wins; among equal fees the earliest ordering in lexicographic enumeration wins,
//! so replicas given the same candidates agree.
//!
//! Cost is factorial in the candidate count; callers pass an explicit bound, itself
//! capped at [`MAX_FEE_CANDIDATES_LIMIT`].

use tracing::trace;

use crate::block::{apply_in_order, BatchOutcome};
use crate::constants::MAX_FEE_CANDIDATES_LIMIT;
use crate::crypto::SignatureVerifier;
use crate::error::{LedgerError, Result};
use crate::types::*;
use crate::utxo::UtxoSet;

/// SelectMaxFee: 𝒰𝒮 × 𝒯𝒳* → 𝒯𝒳* × 𝒰𝒮
pub fn select_max_fee<V: SignatureVerifier + ?Sized>(
    utxo_set: &UtxoSet,
    candidates: &[Transaction],
    verifier: &V,
    max_candidates: usize,
) -> Result<BatchOutcome> {
    let max = max_candidates.min(MAX_FEE_CANDIDATES_LIMIT);
    if candidates.len() > max {
        return Err(LedgerError::CandidateSetTooLarge { count: candidates.len(), max });
    }

    if candidates.is_empty() {
        return Ok(BatchOutcome { accepted: vec![], utxo_set: utxo_set.clone(), total_fee: 0 });
    }

    let best = search(utxo_set, candidates, verifier);
    trace!(
        candidates = candidates.len(),
        accepted = best.accepted.len(),
        total_fee = best.total_fee,
        "max fee selection done"
    );
    Ok(best)
}

fn evaluate<V: SignatureVerifier + ?Sized>(
    utxo_set: &UtxoSet,
    candidates: &[Transaction],
    order: &[usize],
    verifier: &V,
) -> BatchOutcome {
    let ordered: Vec<Transaction> = order.iter().map(|&i| candidates[i].clone()).collect();
    apply_in_order(utxo_set.clone(), &ordered, verifier)
}

#[cfg(not(feature = "parallel"))]
fn search<V: SignatureVerifier + ?Sized>(
    utxo_set: &UtxoSet,
    candidates: &[Transaction],
    verifier: &V,
) -> BatchOutcome {
    search_sequential(utxo_set, candidates, verifier)
}

#[cfg(feature = "parallel")]
fn search<V: SignatureVerifier + ?Sized>(
    utxo_set: &UtxoSet,
    candidates: &[Transaction],
    verifier: &V,
) -> BatchOutcome {
    search_parallel(utxo_set, candidates, verifier)
}

#[cfg_attr(all(feature = "parallel", not(test)), allow(dead_code))]
fn search_sequential<V: SignatureVerifier + ?Sized>(
    utxo_set: &UtxoSet,
    candidates: &[Transaction],
    verifier: &V,
) -> BatchOutcome {
    let mut orders = Permutations::new(candidates.len());
    // Always yields at least the identity ordering
    let first = orders.next().unwrap_or_default();
    let mut best = evaluate(utxo_set, candidates, &first, verifier);

    for order in orders {
        let outcome = evaluate(utxo_set, candidates, &order, verifier);
        if outcome.total_fee > best.total_fee {
            best = outcome;
        }
    }
    best
}

#[cfg(feature = "parallel")]
fn search_parallel<V: SignatureVerifier + ?Sized>(
    utxo_set: &UtxoSet,
    candidates: &[Transaction],
    verifier: &V,
) -> BatchOutcome {
    use rayon::prelude::*;

    let orders: Vec<Vec<usize>> = Permutations::new(candidates.len()).collect();
    let best = orders
        .par_iter()
        .enumerate()
        .map(|(rank, order)| (rank, evaluate(utxo_set, candidates, order, verifier)))
        .reduce_with(|a, b| {
            // Greatest fee, then earliest rank
            if b.1.total_fee > a.1.total_fee || (b.1.total_fee == a.1.total_fee && b.0 < a.0) {
                b
            } else {
                a
            }
        });

    match best {
        Some((_, outcome)) => outcome,
        None => BatchOutcome { accepted: vec![], utxo_set: utxo_set.clone(), total_fee: 0 },
    }
}

/// Permutations of `0..n` in lexicographic order
pub struct Permutations {
    current: Option<Vec<usize>>,
}

impl Permutations {
    pub fn new(n: usize) -> Self {
        Self { current: Some((0..n).collect()) }
    }
}

impl Iterator for Permutations {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Vec<usize>> {
        let current = self.current.take()?;
        let mut next = current.clone();

        // Rightmost ascent, then swap with the rightmost larger element and reverse the tail
        if let Some(i) = (1..next.len()).rev().find(|&i| next[i - 1] < next[i]) {
            let pivot = i - 1;
            if let Some(j) = (i..next.len()).rev().find(|&j| next[j] > next[pivot]) {
                next.swap(pivot, j);
                next[i..].reverse();
                self.current = Some(next);
            }
        }

        Some(current)
    }
}
