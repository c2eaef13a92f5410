//! Ledger configuration

use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::error::{LedgerError, Result};
use crate::types::{Amount, Natural};

/// Tunables of a [`BranchingLedger`](crate::chain::BranchingLedger)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Maximum height distance below the best branch at which blocks are still accepted
    pub cutoff_age: Natural,
    /// Value a proposer may mint in its coinbase on top of the block's fees
    pub coinbase_reward: Amount,
    /// Bound on the candidate set handed to the fee-maximizing selector
    pub max_fee_candidates: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            cutoff_age: DEFAULT_CUTOFF_AGE,
            coinbase_reward: DEFAULT_COINBASE_REWARD,
            max_fee_candidates: MAX_FEE_CANDIDATES,
        }
    }
}

impl LedgerConfig {
    /// Parse a JSON document; absent fields take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: LedgerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.cutoff_age == 0 {
            return Err(LedgerError::InvalidConfig("cutoff_age must be positive".to_string()));
        }
        if self.max_fee_candidates == 0 {
            return Err(LedgerError::InvalidConfig(
                "max_fee_candidates must be positive".to_string(),
            ));
        }
        if self.max_fee_candidates > MAX_FEE_CANDIDATES_LIMIT {
            return Err(LedgerError::InvalidConfig(format!(
                "max_fee_candidates {} exceeds limit {}",
                self.max_fee_candidates, MAX_FEE_CANDIDATES_LIMIT
            )));
        }
        if self.coinbase_reward < 0 {
            return Err(LedgerError::InvalidConfig(format!(
                "coinbase_reward {} is negative",
                self.coinbase_reward
            )));
        }
        Ok(())
    }
}
