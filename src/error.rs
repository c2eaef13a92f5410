//! Error types for ledger validation

use thiserror::Error;

use crate::types::{Hash, Natural};

/// Faults that are not per-block rejections: bad setup or misuse of the selector
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Invalid genesis block: {0}")]
    InvalidGenesis(BlockRejection),

    #[error("Invalid ledger configuration: {0}")]
    InvalidConfig(String),

    #[error("Candidate set of {count} transactions exceeds selector bound {max}")]
    CandidateSetTooLarge { count: usize, max: usize },

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Input index {index} out of range for transaction with {inputs} inputs")]
    InputOutOfRange { index: usize, inputs: usize },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Reason a transaction failed validation against a UTXO set
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TxRejection {
    #[error("negative output value {value} at index {index}")]
    NegativeOutput { index: usize, value: i64 },

    #[error("input {index} claims an out-point already claimed by this transaction")]
    DuplicateInput { index: usize },

    #[error("input {index} not found in UTXO set")]
    MissingInput { index: usize },

    #[error("invalid signature on input {index}")]
    InvalidSignature { index: usize },

    #[error("inputs {inputs} less than outputs {outputs}")]
    InsufficientInputs { inputs: i64, outputs: i64 },

    #[error("value sum overflow")]
    ValueOverflow,
}

/// Reason a block was not linked into the ledger
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BlockRejection {
    #[error("block declares no previous block hash")]
    MissingParentHash,

    #[error("parent block {} is not retained", hex_prefix(.0))]
    UnknownParent(Hash),

    #[error("block {} is already retained", hex_prefix(.0))]
    DuplicateBlock(Hash),

    #[error("height {height} is too far below max height {max_height}")]
    TooDeep { height: Natural, max_height: Natural },

    #[error("transaction {index} invalid: {reason}")]
    InvalidTransaction { index: usize, reason: TxRejection },

    #[error("invalid coinbase: {0}")]
    InvalidCoinbase(String),
}

pub type Result<T> = std::result::Result<T, LedgerError>;

pub(crate) fn hex_prefix(hash: &Hash) -> String {
    hash[..4].iter().map(|b| format!("{:02x}", b)).collect()
}
