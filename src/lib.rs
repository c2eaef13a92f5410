//! # Branch-Ledger
//!
//! A UTXO ledger engine that validates proposed blocks against a running unspent-output
//! state while tracking several competing branches at once.
//!
//! ## Architecture
//!
//! Leaves first:
//! - [`utxo`]: the unspent output set each branch owns
//! - [`transaction`]: hashing and the validity rules for one transaction
//! - [`block`]: applying transactions in order and replaying whole blocks
//! - [`selection`]: fee-maximizing search over orderings of a small batch
//! - [`mempool`]: pending transactions awaiting a block
//! - [`chain`]: the branching ledger with its retention window
//! - [`handler`], [`mining`]: stateful epoch handling and proposal assembly
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: validation and replay never mutate their inputs
//! 2. **Atomic Blocks**: a block is linked in full or not at all
//! 3. **Bounded Memory**: only blocks within the cutoff window are retained
//! 4. **Opaque Crypto**: signatures are checked through [`crypto::SignatureVerifier`]
//!
//! ## Usage
//!
//! ```rust
//! use branch_ledger::LedgerEngine;
//! use branch_ledger::crypto::SigningKey;
//! use branch_ledger::types::*;
//!
//! let engine = LedgerEngine::new();
//! let key = SigningKey::from_seed(1).unwrap();
//! let genesis = Block::new(
//!     None,
//!     Transaction::coinbase(None, vec![TransactionOutput { value: 1000, owner: key.public_key() }]),
//!     vec![],
//!     0,
//! );
//! let ledger = engine.new_ledger(genesis.clone()).unwrap();
//! assert_eq!(ledger.max_height(), 1);
//! assert!(ledger.max_height_utxo_set().contains(&genesis.coinbase.outpoint(0)));
//! ```

pub mod types;
pub mod constants;
pub mod error;
pub mod config;
pub mod crypto;
pub mod utxo;
pub mod transaction;
pub mod block;
pub mod selection;
pub mod handler;
pub mod mempool;
pub mod chain;
pub mod mining;

// Re-export commonly used types
pub use types::*;
pub use constants::*;
pub use error::{BlockRejection, LedgerError, Result, TxRejection};
pub use block::BatchOutcome;
pub use chain::{BranchNode, BranchSnapshot, BranchingLedger};
pub use config::LedgerConfig;
pub use mempool::TransactionPool;
pub use utxo::UtxoSet;

use crypto::{Secp256k1Verifier, SignatureVerifier};

/// Entry point bundling a verifier and configuration
///
/// # Examples
///
/// ```
/// use branch_ledger::LedgerEngine;
/// use branch_ledger::crypto::SigningKey;
/// use branch_ledger::types::*;
/// use branch_ledger::UtxoSet;
///
/// let engine = LedgerEngine::new();
/// let key = SigningKey::from_seed(1).unwrap();
///
/// let mut utxo_set = UtxoSet::new();
/// let outpoint = OutPoint { hash: [1; 32], index: 0 };
/// utxo_set.add_utxo(outpoint, TransactionOutput { value: 1000, owner: key.public_key() });
///
/// let mut tx = Transaction::new();
/// tx.add_input(outpoint).add_output(900, key.public_key());
/// tx.sign_input(0, &key).unwrap();
///
/// assert!(engine.is_valid_tx(&utxo_set, &tx));
/// assert_eq!(engine.validate_tx_inputs(&utxo_set, &tx), (ValidationResult::Valid, 100));
/// ```
pub struct LedgerEngine<V = Secp256k1Verifier> {
    verifier: V,
    config: LedgerConfig,
}

impl LedgerEngine<Secp256k1Verifier> {
    /// Engine with the secp256k1 verifier and default configuration
    pub fn new() -> Self {
        Self { verifier: Secp256k1Verifier::new(), config: LedgerConfig::default() }
    }
}

impl Default for LedgerEngine<Secp256k1Verifier> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: SignatureVerifier + Clone> LedgerEngine<V> {
    pub fn with_verifier(verifier: V, config: LedgerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { verifier, config })
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Validate a transaction against a UTXO set
    pub fn is_valid_tx(&self, utxo_set: &UtxoSet, tx: &Transaction) -> bool {
        transaction::is_valid_tx(utxo_set, tx, &self.verifier)
    }

    /// Validate a transaction and report its fee
    pub fn validate_tx_inputs(&self, utxo_set: &UtxoSet, tx: &Transaction) -> (ValidationResult, Amount) {
        transaction::check_tx_inputs(utxo_set, tx, &self.verifier)
    }

    /// Accept candidates in the given order
    ///
    /// # Examples
    ///
    /// ```
    /// use branch_ledger::LedgerEngine;
    /// use branch_ledger::UtxoSet;
    ///
    /// let engine = LedgerEngine::new();
    /// let outcome = engine.apply_in_order(UtxoSet::new(), &[]);
    /// assert!(outcome.accepted.is_empty());
    /// ```
    pub fn apply_in_order(&self, utxo_set: UtxoSet, candidates: &[Transaction]) -> BatchOutcome {
        block::apply_in_order(utxo_set, candidates, &self.verifier)
    }

    /// Fee-maximizing selection bounded by `config().max_fee_candidates`
    pub fn select_max_fee(&self, utxo_set: &UtxoSet, candidates: &[Transaction]) -> Result<BatchOutcome> {
        selection::select_max_fee(utxo_set, candidates, &self.verifier, self.config.max_fee_candidates)
    }

    /// Replay a block onto its parent's state without touching it
    pub fn connect_block(&self, parent_state: &UtxoSet, block: &Block) -> std::result::Result<UtxoSet, BlockRejection> {
        block::connect_block(parent_state, block, self.config.coinbase_reward, &self.verifier)
    }

    /// Branching ledger rooted at `genesis`
    pub fn new_ledger(&self, genesis: Block) -> Result<BranchingLedger<V>> {
        BranchingLedger::with_initial_state(genesis, UtxoSet::new(), self.config.clone(), self.verifier.clone())
    }

    /// Branching ledger rooted at `genesis` on a pre-funded state
    pub fn new_ledger_with_state(&self, genesis: Block, initial_state: UtxoSet) -> Result<BranchingLedger<V>> {
        BranchingLedger::with_initial_state(genesis, initial_state, self.config.clone(), self.verifier.clone())
    }
}
