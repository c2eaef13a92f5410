//! Proposal assembly on top of the current best branch
//!
//! No proof-of-work is searched for: the nonce is whatever the caller supplies.

use tracing::debug;

use crate::block::BatchOutcome;
use crate::chain::BranchingLedger;
use crate::constants::MAX_FEE_CANDIDATES_LIMIT;
use crate::crypto::SignatureVerifier;
use crate::error::Result;
use crate::handler::BatchPolicy;
use crate::types::*;

/// Pick transactions from the pending pool against the best state. `MaxFee` falls
/// back to in-order selection when the pool exceeds its bound or
/// [`MAX_FEE_CANDIDATES_LIMIT`].
pub fn select_pending<V: SignatureVerifier>(
    ledger: &BranchingLedger<V>,
    policy: BatchPolicy,
) -> Result<BatchOutcome> {
    let candidates = ledger.transaction_pool().transactions();
    let policy = match policy {
        BatchPolicy::MaxFee { max_candidates }
            if candidates.len() > max_candidates.min(MAX_FEE_CANDIDATES_LIMIT) =>
        {
            debug!(
                pending = candidates.len(),
                max_candidates, "pool exceeds max fee bound, selecting in order"
            );
            BatchPolicy::InOrder
        }
        policy => policy,
    };

    policy.run(ledger.max_height_utxo_set(), &candidates, ledger.verifier())
}

/// CreateNewBlock: build a block extending the best block, paying `reward + fees` to
/// `proposer`
pub fn assemble_block<V: SignatureVerifier>(
    ledger: &BranchingLedger<V>,
    proposer: ByteString,
    policy: BatchPolicy,
    nonce: Natural,
) -> Result<Block> {
    let outcome = select_pending(ledger, policy)?;
    let parent = ledger.max_height_block().hash();
    let payout = ledger.config().coinbase_reward.saturating_add(outcome.total_fee);

    let coinbase =
        Transaction::coinbase(Some(parent), vec![TransactionOutput { value: payout, owner: proposer }]);

    Ok(Block::new(Some(parent), coinbase, outcome.accepted, nonce))
}
