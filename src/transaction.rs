//! Transaction hashing and validation against a UTXO set

use std::collections::HashSet;

use crate::constants::*;
use crate::crypto::{sha256, SignatureVerifier, SigningKey};
use crate::error::{LedgerError, Result, TxRejection};
use crate::types::*;
use crate::utxo::UtxoSet;

impl Transaction {
    pub fn new() -> Self {
        Self::default()
    }

    /// Coinbase spending the marker out-point of `parent` into `outputs`
    pub fn coinbase(parent: Option<Hash>, outputs: Vec<TransactionOutput>) -> Self {
        Self {
            inputs: vec![TransactionInput {
                prevout: OutPoint { hash: parent.unwrap_or(ZERO_HASH), index: COINBASE_INDEX },
                signature: vec![],
            }],
            outputs,
        }
    }

    pub fn add_input(&mut self, prevout: OutPoint) -> &mut Self {
        self.inputs.push(TransactionInput { prevout, signature: vec![] });
        self
    }

    pub fn add_output(&mut self, value: Amount, owner: ByteString) -> &mut Self {
        self.outputs.push(TransactionOutput { value, owner });
        self
    }

    /// Sign input `index` with `key`
    pub fn sign_input(&mut self, index: usize, key: &SigningKey) -> Result<&mut Self> {
        if index >= self.inputs.len() {
            return Err(LedgerError::InputOutOfRange { index, inputs: self.inputs.len() });
        }
        let signature = key.sign(&raw_data_to_sign(self, index))?;
        self.inputs[index].signature = signature;
        Ok(self)
    }

    /// Hash over the full canonical encoding, signatures included
    pub fn hash(&self) -> Hash {
        sha256(&raw_tx(self))
    }

    /// Out-point of this transaction's output `index`
    pub fn outpoint(&self, index: u32) -> OutPoint {
        OutPoint { hash: self.hash(), index }
    }
}

/// Payload signed by input `index`: the index, every out-point and every output.
/// Signatures are excluded so collecting them never changes what signers agreed on.
pub fn raw_data_to_sign(tx: &Transaction, index: usize) -> ByteString {
    let mut buf = Vec::with_capacity(8 + tx.inputs.len() * 36 + tx.outputs.len() * 45);
    buf.extend_from_slice(&(index as u32).to_le_bytes());
    buf.extend_from_slice(&(tx.inputs.len() as u32).to_le_bytes());
    for input in &tx.inputs {
        encode_outpoint(&mut buf, &input.prevout);
    }
    encode_outputs(&mut buf, &tx.outputs);
    buf
}

/// Canonical encoding hashed into the transaction id
fn raw_tx(tx: &Transaction) -> ByteString {
    let mut buf = Vec::new();
    buf.extend_from_slice(&(tx.inputs.len() as u32).to_le_bytes());
    for input in &tx.inputs {
        encode_outpoint(&mut buf, &input.prevout);
        buf.extend_from_slice(&(input.signature.len() as u32).to_le_bytes());
        buf.extend_from_slice(&input.signature);
    }
    encode_outputs(&mut buf, &tx.outputs);
    buf
}

fn encode_outpoint(buf: &mut ByteString, outpoint: &OutPoint) {
    buf.extend_from_slice(&outpoint.hash);
    buf.extend_from_slice(&outpoint.index.to_le_bytes());
}

fn encode_outputs(buf: &mut ByteString, outputs: &[TransactionOutput]) {
    buf.extend_from_slice(&(outputs.len() as u32).to_le_bytes());
    for output in outputs {
        buf.extend_from_slice(&output.value.to_le_bytes());
        buf.extend_from_slice(&(output.owner.len() as u32).to_le_bytes());
        buf.extend_from_slice(&output.owner);
    }
}

/// CheckTxInputs: 𝒯𝒳 × 𝒰𝒮 → {valid, invalid} × ℤ
///
/// A transaction tx is valid against us iff:
/// 1. ∀o ∈ outs: o.value ≥ 0
/// 2. no out-point is claimed twice by tx
/// 3. ∀i ∈ ins: i.prevout ∈ us
/// 4. ∀i ∈ ins: verify(us(i.prevout).owner, payload(tx, i), i.signature)
/// 5. Σ us(i.prevout).value ≥ Σ o.value
///
/// Rules 2-4 run per input in declaration order; the first failure rejects.
/// Returns the fee (inputs - outputs) when valid, 0 otherwise.
pub fn check_tx_inputs<V: SignatureVerifier + ?Sized>(
    utxo_set: &UtxoSet,
    tx: &Transaction,
    verifier: &V,
) -> (ValidationResult, Amount) {
    let mut total_output_value = 0i64;
    for (index, output) in tx.outputs.iter().enumerate() {
        if output.value < 0 {
            return invalid(TxRejection::NegativeOutput { index, value: output.value });
        }
        total_output_value = match total_output_value.checked_add(output.value) {
            Some(sum) => sum,
            None => return invalid(TxRejection::ValueOverflow),
        };
    }

    let mut claimed = HashSet::with_capacity(tx.inputs.len());
    let mut total_input_value = 0i64;
    for (index, input) in tx.inputs.iter().enumerate() {
        if !claimed.insert(input.prevout) {
            return invalid(TxRejection::DuplicateInput { index });
        }

        let utxo = match utxo_set.get(&input.prevout) {
            Some(utxo) => utxo,
            None => return invalid(TxRejection::MissingInput { index }),
        };
        total_input_value = match total_input_value.checked_add(utxo.value) {
            Some(sum) => sum,
            None => return invalid(TxRejection::ValueOverflow),
        };

        if !verifier.verify(&utxo.owner, &raw_data_to_sign(tx, index), &input.signature) {
            return invalid(TxRejection::InvalidSignature { index });
        }
    }

    if total_input_value < total_output_value {
        return invalid(TxRejection::InsufficientInputs {
            inputs: total_input_value,
            outputs: total_output_value,
        });
    }

    (ValidationResult::Valid, total_input_value - total_output_value)
}

/// CheckTransaction: the validity half of [`check_tx_inputs`]
pub fn check_transaction<V: SignatureVerifier + ?Sized>(
    utxo_set: &UtxoSet,
    tx: &Transaction,
    verifier: &V,
) -> ValidationResult {
    check_tx_inputs(utxo_set, tx, verifier).0
}

pub fn is_valid_tx<V: SignatureVerifier + ?Sized>(
    utxo_set: &UtxoSet,
    tx: &Transaction,
    verifier: &V,
) -> bool {
    check_transaction(utxo_set, tx, verifier).is_valid()
}

/// Inputs minus outputs valued against `utxo_set`, `None` if an input is absent.
/// Does not check signatures.
pub fn tx_fee(utxo_set: &UtxoSet, tx: &Transaction) -> Option<Amount> {
    let inputs = tx.inputs.iter().try_fold(0i64, |acc, input| {
        utxo_set.get(&input.prevout).and_then(|utxo| acc.checked_add(utxo.value))
    })?;
    let outputs = tx.outputs.iter().try_fold(0i64, |acc, o| acc.checked_add(o.value))?;
    inputs.checked_sub(outputs)
}

/// Check if transaction is coinbase
pub fn is_coinbase(tx: &Transaction) -> bool {
    tx.inputs.len() == 1
        && tx.inputs[0].prevout.index == COINBASE_INDEX
        && tx.inputs[0].signature.is_empty()
}

fn invalid(reason: TxRejection) -> (ValidationResult, Amount) {
    (ValidationResult::Invalid(reason), 0)
}
