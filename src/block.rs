//! Transaction application and block replay

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::crypto::{sha256, SignatureVerifier};
use crate::error::{hex_prefix, BlockRejection};
use crate::transaction::{check_tx_inputs, is_coinbase};
use crate::types::*;
use crate::utxo::UtxoSet;

impl Block {
    pub fn new(
        prev_block_hash: Option<Hash>,
        coinbase: Transaction,
        transactions: Vec<Transaction>,
        nonce: Natural,
    ) -> Self {
        Self { prev_block_hash, coinbase, transactions, nonce }
    }

    /// Hash over parent link, nonce, coinbase hash and every transaction hash
    pub fn hash(&self) -> Hash {
        let mut buf = Vec::with_capacity(1 + 32 + 8 + 32 * (1 + self.transactions.len()));
        match &self.prev_block_hash {
            Some(prev) => {
                buf.push(1);
                buf.extend_from_slice(prev);
            }
            None => buf.push(0),
        }
        buf.extend_from_slice(&self.nonce.to_le_bytes());
        buf.extend_from_slice(&self.coinbase.hash());
        for tx in &self.transactions {
            buf.extend_from_slice(&tx.hash());
        }
        sha256(&buf)
    }
}

/// Outcome of running a batch policy over candidate transactions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOutcome {
    /// Accepted transactions in application order
    pub accepted: Vec<Transaction>,
    /// State after applying `accepted`
    pub utxo_set: UtxoSet,
    /// Σ fee over `accepted`
    pub total_fee: Amount,
}

/// ApplyTransaction: 𝒯𝒳 × 𝒰𝒮 → 𝒰𝒮
///
/// us' = (us \ {i.prevout : i ∈ tx.inputs}) ∪ {(tx.id, i) ↦ tx.outputs[i]}
///
/// The caller must have validated tx against `utxo_set`.
pub fn apply_transaction(utxo_set: &mut UtxoSet, tx: &Transaction) {
    for input in &tx.inputs {
        utxo_set.remove_utxo(&input.prevout);
    }
    insert_outputs(utxo_set, tx);
}

/// ApplyCoinbase: us' = us ∪ {(cb.id, i) ↦ cb.outputs[i]}
///
/// The marker input claims nothing, so nothing is removed.
pub fn apply_coinbase(utxo_set: &mut UtxoSet, coinbase: &Transaction) {
    insert_outputs(utxo_set, coinbase);
}

fn insert_outputs(utxo_set: &mut UtxoSet, tx: &Transaction) {
    let tx_id = tx.hash();
    for (i, output) in tx.outputs.iter().enumerate() {
        utxo_set.add_utxo(OutPoint { hash: tx_id, index: i as u32 }, output.clone());
    }
}

/// Accept candidates in the given order.
///
/// Each candidate is validated against the state left by the ones before it, so a
/// transaction may spend an output created earlier in the batch but never one created
/// later. Invalid candidates are skipped.
pub fn apply_in_order<V: SignatureVerifier + ?Sized>(
    mut utxo_set: UtxoSet,
    candidates: &[Transaction],
    verifier: &V,
) -> BatchOutcome {
    let mut accepted = Vec::with_capacity(candidates.len());
    let mut total_fee = 0i64;

    for tx in candidates {
        let (result, fee) = check_tx_inputs(&utxo_set, tx, verifier);
        match result {
            ValidationResult::Valid => {
                apply_transaction(&mut utxo_set, tx);
                total_fee = total_fee.saturating_add(fee);
                accepted.push(tx.clone());
            }
            ValidationResult::Invalid(reason) => {
                debug!(tx = %hex_prefix(&tx.hash()), %reason, "skipping transaction");
            }
        }
    }

    BatchOutcome { accepted, utxo_set, total_fee }
}

/// ConnectBlock: ℬ × 𝒰𝒮 → {valid, invalid} × 𝒰𝒮
///
/// For block b = (coinbase, txs) on parent state us:
/// 1. Apply each tx ∈ txs in order, each validated against the evolving state;
///    any invalid tx rejects the whole block
/// 2. Let fees = Σ fee(tx)
/// 3. The coinbase must spend the parent's marker out-point, have non-negative
///    outputs and Σ coinbase outputs ≤ reward + fees
/// 4. Insert the coinbase outputs
///
/// `parent_state` is never touched; the returned set is a fresh copy.
pub fn connect_block<V: SignatureVerifier + ?Sized>(
    parent_state: &UtxoSet,
    block: &Block,
    reward: Amount,
    verifier: &V,
) -> Result<UtxoSet, BlockRejection> {
    let (mut utxo_set, total_fees) = replay_transactions(parent_state, block, verifier)?;

    check_coinbase(block, reward, total_fees)?;
    apply_coinbase(&mut utxo_set, &block.coinbase);

    Ok(utxo_set)
}

/// ConnectGenesis: like [`connect_block`], but the coinbase is trusted.
///
/// Regular transactions are still validated in order; the coinbase outputs are
/// inserted whatever they mint and whatever parent they name.
pub fn connect_genesis<V: SignatureVerifier + ?Sized>(
    initial_state: &UtxoSet,
    genesis: &Block,
    verifier: &V,
) -> Result<UtxoSet, BlockRejection> {
    let mut utxo_set = replay_transactions(initial_state, genesis, verifier)?.0;
    apply_coinbase(&mut utxo_set, &genesis.coinbase);
    Ok(utxo_set)
}

/// Apply `block.transactions` in order onto a copy of `parent_state`, returning the
/// new state and the total fee
fn replay_transactions<V: SignatureVerifier + ?Sized>(
    parent_state: &UtxoSet,
    block: &Block,
    verifier: &V,
) -> Result<(UtxoSet, Amount), BlockRejection> {
    let mut utxo_set = parent_state.clone();
    let mut total_fees = 0i64;

    for (index, tx) in block.transactions.iter().enumerate() {
        let (result, fee) = check_tx_inputs(&utxo_set, tx, verifier);
        if let ValidationResult::Invalid(reason) = result {
            return Err(BlockRejection::InvalidTransaction { index, reason });
        }
        apply_transaction(&mut utxo_set, tx);
        total_fees = total_fees.checked_add(fee).ok_or_else(|| {
            BlockRejection::InvalidCoinbase("total fees overflow".to_string())
        })?;
    }

    Ok((utxo_set, total_fees))
}

fn check_coinbase(block: &Block, reward: Amount, total_fees: Amount) -> Result<(), BlockRejection> {
    let coinbase = &block.coinbase;
    if !is_coinbase(coinbase) {
        return Err(BlockRejection::InvalidCoinbase("not a coinbase transaction".to_string()));
    }

    let expected = block.prev_block_hash.unwrap_or(crate::constants::ZERO_HASH);
    if coinbase.inputs[0].prevout.hash != expected {
        return Err(BlockRejection::InvalidCoinbase(
            "coinbase does not commit to the parent block".to_string(),
        ));
    }

    let mut minted = 0i64;
    for (i, output) in coinbase.outputs.iter().enumerate() {
        if output.value < 0 {
            return Err(BlockRejection::InvalidCoinbase(format!(
                "negative output value {} at index {}",
                output.value, i
            )));
        }
        minted = minted.checked_add(output.value).ok_or_else(|| {
            BlockRejection::InvalidCoinbase("output sum overflow".to_string())
        })?;
    }

    let allowance = reward.saturating_add(total_fees);
    if minted > allowance {
        return Err(BlockRejection::InvalidCoinbase(format!(
            "coinbase mints {} but only {} is allowed",
            minted, allowance
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{Secp256k1Verifier, SigningKey};
    use crate::error::TxRejection;

    fn genesis_state(key: &SigningKey, values: &[Amount]) -> (UtxoSet, Transaction) {
        let mut funding = Transaction::coinbase(None, vec![]);
        for value in values {
            funding.add_output(*value, key.public_key());
        }
        let mut utxo_set = UtxoSet::new();
        apply_coinbase(&mut utxo_set, &funding);
        (utxo_set, funding)
    }

    struct AcceptAll;

    impl SignatureVerifier for AcceptAll {
        fn verify(&self, _public_key: &[u8], _message: &[u8], _signature: &[u8]) -> bool {
            true
        }
    }

    fn spend(key: &SigningKey, prevouts: &[OutPoint], value: Amount) -> Transaction {
        let mut tx = Transaction::new();
        for prevout in prevouts {
            tx.add_input(*prevout);
        }
        tx.add_output(value, key.public_key());
        for i in 0..prevouts.len() {
            tx.sign_input(i, key).unwrap();
        }
        tx
    }

    #[test]
    fn test_apply_transaction_moves_outputs() {
        let key = SigningKey::from_seed(1).unwrap();
        let (mut utxo_set, funding) = genesis_state(&key, &[100]);
        let tx = spend(&key, &[funding.outpoint(0)], 90);

        apply_transaction(&mut utxo_set, &tx);

        assert!(!utxo_set.contains(&funding.outpoint(0)));
        assert_eq!(utxo_set.get(&tx.outpoint(0)).map(|o| o.value), Some(90));
        assert_eq!(utxo_set.len(), 1);
    }

    #[test]
    fn test_apply_in_order_respects_dependencies() {
        let key = SigningKey::from_seed(1).unwrap();
        let (utxo_set, funding) = genesis_state(&key, &[100]);
        let parent = spend(&key, &[funding.outpoint(0)], 90);
        let child = spend(&key, &[parent.outpoint(0)], 80);
        let verifier = Secp256k1Verifier::new();

        let forward = apply_in_order(utxo_set.clone(), &[parent.clone(), child.clone()], &verifier);
        assert_eq!(forward.accepted, vec![parent.clone(), child.clone()]);
        assert_eq!(forward.total_fee, 20);

        let backward = apply_in_order(utxo_set, &[child, parent.clone()], &verifier);
        assert_eq!(backward.accepted, vec![parent]);
        assert_eq!(backward.total_fee, 10);
    }

    #[test]
    fn test_double_spend_in_batch() {
        let key = SigningKey::from_seed(1).unwrap();
        let (utxo_set, funding) = genesis_state(&key, &[100]);
        let first = spend(&key, &[funding.outpoint(0)], 90);
        let second = spend(&key, &[funding.outpoint(0)], 50);

        let outcome = apply_in_order(utxo_set, &[first.clone(), second], &Secp256k1Verifier::new());
        assert_eq!(outcome.accepted, vec![first]);
    }

    #[test]
    fn test_spend_twice_fails() {
        let key = SigningKey::from_seed(1).unwrap();
        let (utxo_set, funding) = genesis_state(&key, &[100]);
        let tx = spend(&key, &[funding.outpoint(0)], 100);
        let verifier = Secp256k1Verifier::new();

        let once = apply_in_order(utxo_set, &[tx.clone()], &verifier);
        assert_eq!(once.accepted.len(), 1);

        let twice = apply_in_order(once.utxo_set, &[tx], &verifier);
        assert!(twice.accepted.is_empty());
    }

    #[test]
    fn test_marker_shaped_outpoint_spent_once() {
        // A real entry whose index happens to equal the coinbase marker index
        let key = SigningKey::from_seed(1).unwrap();
        let marked = OutPoint { hash: [3; 32], index: crate::constants::COINBASE_INDEX };
        let utxo_set: UtxoSet =
            [(marked, TransactionOutput { value: 10, owner: key.public_key() })].into_iter().collect();

        let mut first = Transaction::new();
        first.add_input(marked).add_output(10, key.public_key());
        let mut second = Transaction::new();
        second.add_input(marked).add_output(9, key.public_key());

        let outcome = apply_in_order(utxo_set, &[first.clone(), second], &AcceptAll);
        assert_eq!(outcome.accepted, vec![first.clone()]);
        assert!(!outcome.utxo_set.contains(&marked));
        assert_eq!(outcome.utxo_set.len(), 1);
        assert!(outcome.utxo_set.contains(&first.outpoint(0)));
    }

    #[test]
    fn test_apply_coinbase_keeps_existing_entries() {
        let key = SigningKey::from_seed(1).unwrap();
        let (mut utxo_set, funding) = genesis_state(&key, &[100]);
        let coinbase = Transaction::coinbase(
            Some([5; 32]),
            vec![TransactionOutput { value: 25, owner: key.public_key() }],
        );

        apply_coinbase(&mut utxo_set, &coinbase);

        assert!(utxo_set.contains(&funding.outpoint(0)));
        assert!(utxo_set.contains(&coinbase.outpoint(0)));
        assert_eq!(utxo_set.len(), 2);
    }

    #[test]
    fn test_connect_genesis_trusts_coinbase() {
        let key = SigningKey::from_seed(1).unwrap();
        let premine = Transaction::coinbase(
            Some([7; 32]),
            vec![TransactionOutput { value: 1_000_000, owner: key.public_key() }],
        );
        let genesis = Block::new(None, premine.clone(), vec![], 0);

        let state = connect_genesis(&UtxoSet::new(), &genesis, &Secp256k1Verifier::new()).unwrap();
        assert_eq!(state.get(&premine.outpoint(0)).map(|o| o.value), Some(1_000_000));
    }

    #[test]
    fn test_connect_genesis_validates_transactions() {
        let key = SigningKey::from_seed(1).unwrap();
        let bad = spend(&key, &[OutPoint { hash: [8; 32], index: 0 }], 10);
        let genesis = Block::new(None, Transaction::coinbase(None, vec![]), vec![bad], 0);

        let result = connect_genesis(&UtxoSet::new(), &genesis, &Secp256k1Verifier::new());
        assert_eq!(
            result,
            Err(BlockRejection::InvalidTransaction {
                index: 0,
                reason: TxRejection::MissingInput { index: 0 },
            })
        );
    }

    #[test]
    fn test_connect_block_valid() {
        let key = SigningKey::from_seed(1).unwrap();
        let (utxo_set, funding) = genesis_state(&key, &[100]);
        let tx = spend(&key, &[funding.outpoint(0)], 70);
        let parent = [4u8; 32];
        let coinbase = Transaction::coinbase(
            Some(parent),
            vec![TransactionOutput { value: 55, owner: key.public_key() }],
        );
        let block = Block::new(Some(parent), coinbase.clone(), vec![tx.clone()], 0);

        let state = connect_block(&utxo_set, &block, 25, &Secp256k1Verifier::new()).unwrap();

        assert!(utxo_set.contains(&funding.outpoint(0)));
        assert!(state.contains(&tx.outpoint(0)));
        assert!(state.contains(&coinbase.outpoint(0)));
        assert!(!state.contains(&funding.outpoint(0)));
    }

    #[test]
    fn test_connect_block_rejects_atomically() {
        let key = SigningKey::from_seed(1).unwrap();
        let (utxo_set, funding) = genesis_state(&key, &[100]);
        let good = spend(&key, &[funding.outpoint(0)], 70);
        let bad = spend(&key, &[OutPoint { hash: [8; 32], index: 0 }], 10);
        let block = Block::new(None, Transaction::coinbase(None, vec![]), vec![good, bad], 0);

        let result = connect_block(&utxo_set, &block, 25, &Secp256k1Verifier::new());
        assert_eq!(
            result,
            Err(BlockRejection::InvalidTransaction {
                index: 1,
                reason: TxRejection::MissingInput { index: 0 },
            })
        );
    }

    #[test]
    fn test_connect_block_coinbase_over_allowance() {
        let key = SigningKey::from_seed(1).unwrap();
        let coinbase = Transaction::coinbase(
            None,
            vec![TransactionOutput { value: 26, owner: key.public_key() }],
        );
        let block = Block::new(None, coinbase, vec![], 0);

        let result = connect_block(&UtxoSet::new(), &block, 25, &Secp256k1Verifier::new());
        assert!(matches!(result, Err(BlockRejection::InvalidCoinbase(_))));
    }

    #[test]
    fn test_connect_block_coinbase_wrong_parent() {
        let coinbase = Transaction::coinbase(Some([1; 32]), vec![]);
        let block = Block::new(Some([2; 32]), coinbase, vec![], 0);

        let result = connect_block(&UtxoSet::new(), &block, 25, &Secp256k1Verifier::new());
        assert!(matches!(result, Err(BlockRejection::InvalidCoinbase(_))));
    }

    #[test]
    fn test_block_hash_depends_on_nonce_and_parent() {
        let a = Block::new(None, Transaction::coinbase(None, vec![]), vec![], 0);
        let b = Block::new(None, Transaction::coinbase(None, vec![]), vec![], 1);
        let c = Block::new(Some([0; 32]), Transaction::coinbase(None, vec![]), vec![], 0);

        assert_eq!(a.hash(), a.clone().hash());
        assert_ne!(a.hash(), b.hash());
        assert_ne!(a.hash(), c.hash());
    }
}
