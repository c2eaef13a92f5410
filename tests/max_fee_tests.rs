//! Fee-maximizing selection against the in-order policy

use branch_ledger::block::apply_coinbase;
use branch_ledger::crypto::SigningKey;
use branch_ledger::*;

fn spend(key: &SigningKey, prevout: OutPoint, value: Amount) -> Transaction {
    let mut tx = Transaction::new();
    tx.add_input(prevout).add_output(value, key.public_key());
    tx.sign_input(0, key).unwrap();
    tx
}

fn funded(key: &SigningKey, values: &[Amount]) -> (UtxoSet, Transaction) {
    let funding = Transaction::coinbase(
        None,
        values
            .iter()
            .map(|v| TransactionOutput { value: *v, owner: key.public_key() })
            .collect(),
    );
    let mut utxo_set = UtxoSet::new();
    apply_coinbase(&mut utxo_set, &funding);
    (utxo_set, funding)
}

#[test]
fn test_dependent_pair_beats_conflict() {
    let key = SigningKey::from_seed(21).unwrap();
    let (utxo_set, funding) = funded(&key, &[100]);
    let a = spend(&key, funding.outpoint(0), 90);
    let b = spend(&key, a.outpoint(0), 80);
    let c = spend(&key, funding.outpoint(0), 95);
    let engine = LedgerEngine::new();

    let candidates = vec![b.clone(), c.clone(), a.clone()];
    let outcome = engine.select_max_fee(&utxo_set, &candidates).unwrap();

    assert_eq!(outcome.accepted, vec![a.clone(), b.clone()]);
    assert_eq!(outcome.total_fee, 20);
    assert!(outcome.utxo_set.contains(&b.outpoint(0)));
    assert!(!outcome.utxo_set.contains(&a.outpoint(0)));
    assert!(!outcome.utxo_set.contains(&funding.outpoint(0)));

    // The same candidates in order only manage C
    let naive = engine.apply_in_order(utxo_set.clone(), &candidates);
    assert_eq!(naive.accepted, vec![c]);
    assert_eq!(naive.total_fee, 5);

    // The entry state is untouched
    assert!(utxo_set.contains(&funding.outpoint(0)));
}

#[test]
fn test_single_conflict_beats_cheaper_chain() {
    let key = SigningKey::from_seed(21).unwrap();
    let (utxo_set, funding) = funded(&key, &[100]);
    let a = spend(&key, funding.outpoint(0), 90);
    let b = spend(&key, a.outpoint(0), 80);
    let c = spend(&key, funding.outpoint(0), 75);

    let outcome = LedgerEngine::new().select_max_fee(&utxo_set, &[a, b, c.clone()]).unwrap();
    assert_eq!(outcome.accepted, vec![c]);
    assert_eq!(outcome.total_fee, 25);
}

#[test]
fn test_independent_transactions_all_accepted() {
    let key = SigningKey::from_seed(21).unwrap();
    let (utxo_set, funding) = funded(&key, &[10, 20, 30, 40]);
    let candidates: Vec<Transaction> =
        (0..4).map(|i| spend(&key, funding.outpoint(i), 5)).collect();

    let outcome = LedgerEngine::new().select_max_fee(&utxo_set, &candidates).unwrap();
    assert_eq!(outcome.accepted, candidates);
    assert_eq!(outcome.total_fee, 80);
}

#[test]
fn test_selection_is_deterministic() {
    let key = SigningKey::from_seed(21).unwrap();
    let (utxo_set, funding) = funded(&key, &[100, 100]);
    let candidates = vec![
        spend(&key, funding.outpoint(0), 90),
        spend(&key, funding.outpoint(0), 90),
        spend(&key, funding.outpoint(1), 50),
        spend(&key, funding.outpoint(1), 50),
    ];
    let engine = LedgerEngine::new();

    let first = engine.select_max_fee(&utxo_set, &candidates).unwrap();
    let second = engine.select_max_fee(&utxo_set, &candidates).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.accepted, vec![candidates[0].clone(), candidates[2].clone()]);
    assert_eq!(first.total_fee, 60);
}

#[test]
fn test_engine_enforces_candidate_bound() {
    let key = SigningKey::from_seed(21).unwrap();
    let (utxo_set, funding) = funded(&key, &[1; 9]);
    let candidates: Vec<Transaction> =
        (0..9).map(|i| spend(&key, funding.outpoint(i), 1)).collect();

    let result = LedgerEngine::new().select_max_fee(&utxo_set, &candidates);
    assert!(matches!(
        result,
        Err(LedgerError::CandidateSetTooLarge { count: 9, max: MAX_FEE_CANDIDATES })
    ));
}
