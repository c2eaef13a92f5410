//! Ledger constants

/// Base units per coin
pub const UNITS_PER_COIN: i64 = 100_000_000;

/// Default reward a proposer may claim in its coinbase: 25 coins
pub const DEFAULT_COINBASE_REWARD: i64 = 25 * UNITS_PER_COIN;

/// Blocks at or below `max_height - CUTOFF_AGE` are rejected
pub const DEFAULT_CUTOFF_AGE: u64 = 10;

/// Height of the genesis block
pub const GENESIS_HEIGHT: u64 = 1;

/// Out-point index marking the single input of a coinbase transaction
pub const COINBASE_INDEX: u32 = u32::MAX;

/// Largest candidate set the fee-maximizing selector enumerates (8! = 40320 orderings)
pub const MAX_FEE_CANDIDATES: usize = 8;

/// Hard ceiling on any configured selector bound (10! = 3628800 orderings)
pub const MAX_FEE_CANDIDATES_LIMIT: usize = 10;

/// Zero hash, used as the coinbase out-point hash of a parentless block
pub const ZERO_HASH: [u8; 32] = [0u8; 32];
