//! Branch-aware ledger over a bounded window of recent blocks
//!
//! Every retained block is a [`BranchNode`] carrying its height and the UTXO set that
//! results from replaying it onto its parent's set. Nodes live in one arena keyed by
//! [`NodeId`]; the hash and height indexes only point into it.
//!
//! A block is accepted iff its parent is retained, its height is above
//! `max_height - cutoff_age`, and every transaction in it is valid in order. When an
//! accepted block raises the maximum height, nodes at
//! `max_height - cutoff_age - 1` are pruned. That is the only eviction path.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tracing::{debug, info};

use crate::block::{connect_block, connect_genesis};
use crate::config::LedgerConfig;
use crate::constants::GENESIS_HEIGHT;
use crate::crypto::{Secp256k1Verifier, SignatureVerifier};
use crate::error::{hex_prefix, BlockRejection, LedgerError, Result};
use crate::mempool::TransactionPool;
use crate::types::*;
use crate::utxo::UtxoSet;

/// Opaque arena key of a retained node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

/// A retained block and the state after applying it. Immutable once created.
#[derive(Debug, Clone)]
pub struct BranchNode {
    block: Arc<Block>,
    hash: Hash,
    height: Natural,
    utxo_set: Arc<UtxoSet>,
}

impl BranchNode {
    fn new(block: Block, hash: Hash, height: Natural, utxo_set: UtxoSet) -> Self {
        Self { block: Arc::new(block), hash, height, utxo_set: Arc::new(utxo_set) }
    }

    pub fn block(&self) -> &Block {
        &self.block
    }

    pub fn hash(&self) -> Hash {
        self.hash
    }

    pub fn height(&self) -> Natural {
        self.height
    }

    pub fn utxo_set(&self) -> &UtxoSet {
        &self.utxo_set
    }

    /// Handle that stays valid after the node is pruned
    pub fn snapshot(&self) -> BranchSnapshot {
        BranchSnapshot {
            block: Arc::clone(&self.block),
            height: self.height,
            utxo_set: Arc::clone(&self.utxo_set),
        }
    }
}

/// Immutable, cheaply cloned view of one branch tip
#[derive(Debug, Clone)]
pub struct BranchSnapshot {
    pub block: Arc<Block>,
    pub height: Natural,
    pub utxo_set: Arc<UtxoSet>,
}

/// Ledger tracking several competing branches at once
pub struct BranchingLedger<V = Secp256k1Verifier> {
    nodes: HashMap<NodeId, BranchNode>,
    by_hash: HashMap<Hash, NodeId>,
    by_height: BTreeMap<Natural, Vec<NodeId>>,
    next_id: u64,
    /// First node inserted at the maximum height; never pruned
    tip: BranchNode,
    transaction_pool: TransactionPool,
    config: LedgerConfig,
    verifier: V,
}

impl BranchingLedger<Secp256k1Verifier> {
    /// Ledger holding only `genesis`, on an empty initial state
    pub fn new(genesis: Block) -> Result<Self> {
        Self::with_config(genesis, LedgerConfig::default())
    }

    pub fn with_config(genesis: Block, config: LedgerConfig) -> Result<Self> {
        Self::with_initial_state(genesis, UtxoSet::new(), config, Secp256k1Verifier::new())
    }
}

impl<V: SignatureVerifier> BranchingLedger<V> {
    /// Ledger holding only `genesis`, replayed onto `initial_state`.
    ///
    /// The genesis block is trusted as configuration. Its coinbase may mint any amount
    /// and name any parent, and that parent is never looked up. Its regular
    /// transactions must still replay cleanly or the ledger is not built.
    pub fn with_initial_state(
        genesis: Block,
        initial_state: UtxoSet,
        config: LedgerConfig,
        verifier: V,
    ) -> Result<Self> {
        config.validate()?;

        let utxo_set =
            connect_genesis(&initial_state, &genesis, &verifier).map_err(LedgerError::InvalidGenesis)?;

        let hash = genesis.hash();
        let tip = BranchNode::new(genesis, hash, GENESIS_HEIGHT, utxo_set);
        let mut ledger = Self {
            nodes: HashMap::new(),
            by_hash: HashMap::new(),
            by_height: BTreeMap::new(),
            next_id: 0,
            tip: tip.clone(),
            transaction_pool: TransactionPool::new(),
            config,
            verifier,
        };
        ledger.insert_node(tip);
        info!(genesis = %hex_prefix(&hash), "ledger initialised");

        Ok(ledger)
    }

    /// Add `block` if valid, returning whether it was linked
    pub fn add_block(&mut self, block: Block) -> bool {
        match self.try_add_block(block) {
            Ok(_) => true,
            Err(reason) => {
                debug!(%reason, "block rejected");
                false
            }
        }
    }

    /// Add `block` if valid, returning its height.
    ///
    /// On rejection no index, state or pool entry changes.
    pub fn try_add_block(&mut self, block: Block) -> std::result::Result<Natural, BlockRejection> {
        let prev_hash = block.prev_block_hash.ok_or(BlockRejection::MissingParentHash)?;

        let parent = self
            .by_hash
            .get(&prev_hash)
            .and_then(|id| self.nodes.get(id))
            .ok_or(BlockRejection::UnknownParent(prev_hash))?;

        let hash = block.hash();
        if self.by_hash.contains_key(&hash) {
            return Err(BlockRejection::DuplicateBlock(hash));
        }

        let max_height = self.max_height();
        let height = parent.height + 1;
        if height <= max_height.saturating_sub(self.config.cutoff_age) {
            return Err(BlockRejection::TooDeep { height, max_height });
        }

        let utxo_set =
            connect_block(&parent.utxo_set, &block, self.config.coinbase_reward, &self.verifier)?;

        for tx in &block.transactions {
            self.transaction_pool.remove_transaction(&tx.hash());
        }
        let tx_count = block.transactions.len();
        let node = BranchNode::new(block, hash, height, utxo_set);
        if height > max_height {
            self.tip = node.clone();
        }
        self.insert_node(node);

        if height > max_height {
            info!(block = %hex_prefix(&hash), height, txs = tx_count, "new max height");
            self.prune(height);
        } else {
            debug!(block = %hex_prefix(&hash), height, txs = tx_count, "block added to side branch");
        }

        Ok(height)
    }

    /// Queue `tx` for a future block. No validation happens here.
    pub fn add_transaction(&mut self, tx: Transaction) -> Hash {
        self.transaction_pool.add_transaction(tx)
    }

    pub fn max_height(&self) -> Natural {
        self.tip.height
    }

    /// First node inserted at the maximum height
    pub fn max_height_node(&self) -> &BranchNode {
        &self.tip
    }

    pub fn max_height_block(&self) -> &Block {
        self.max_height_node().block()
    }

    /// UTXO set to build the next block on
    pub fn max_height_utxo_set(&self) -> &UtxoSet {
        self.max_height_node().utxo_set()
    }

    pub fn max_height_snapshot(&self) -> BranchSnapshot {
        self.max_height_node().snapshot()
    }

    pub fn transaction_pool(&self) -> &TransactionPool {
        &self.transaction_pool
    }

    pub fn contains_block(&self, hash: &Hash) -> bool {
        self.by_hash.contains_key(hash)
    }

    pub fn node(&self, hash: &Hash) -> Option<&BranchNode> {
        self.by_hash.get(hash).and_then(|id| self.nodes.get(id))
    }

    pub fn block(&self, hash: &Hash) -> Option<&Block> {
        self.node(hash).map(BranchNode::block)
    }

    pub fn height_of(&self, hash: &Hash) -> Option<Natural> {
        self.node(hash).map(BranchNode::height)
    }

    /// Retained nodes at `height`, in insertion order
    pub fn blocks_at_height(&self, height: Natural) -> Vec<&BranchNode> {
        self.by_height
            .get(&height)
            .map(|ids| ids.iter().filter_map(|id| self.nodes.get(id)).collect())
            .unwrap_or_default()
    }

    /// Number of retained nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn cutoff_age(&self) -> Natural {
        self.config.cutoff_age
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn verifier(&self) -> &V {
        &self.verifier
    }

    fn insert_node(&mut self, node: BranchNode) {
        let id = NodeId(self.next_id);
        self.next_id += 1;

        self.by_hash.insert(node.hash, id);
        self.by_height.entry(node.height).or_default().push(id);
        self.nodes.insert(id, node);
    }

    fn prune(&mut self, new_max_height: Natural) {
        let Some(stale_height) = new_max_height.checked_sub(self.config.cutoff_age.saturating_add(1)) else {
            return;
        };

        if let Some(ids) = self.by_height.remove(&stale_height) {
            for id in &ids {
                if let Some(node) = self.nodes.remove(id) {
                    self.by_hash.remove(&node.hash);
                }
            }
            info!(height = stale_height, pruned = ids.len(), "pruned stale branches");
        }
    }
}
