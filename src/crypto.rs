//! Signature verification and signing over secp256k1

use secp256k1::{ecdsa::Signature, All, Message, PublicKey, Secp256k1, SecretKey, VerifyOnly};
use sha2::{Digest, Sha256};

use crate::error::{LedgerError, Result};
use crate::types::{ByteString, Hash};

/// Authoritative, side-effect-free signature check
pub trait SignatureVerifier: Send + Sync {
    fn verify(&self, public_key: &[u8], message: &[u8], signature: &[u8]) -> bool;
}

/// ECDSA verifier: DER signatures over SHA-256 of the message
#[derive(Clone)]
pub struct Secp256k1Verifier {
    secp: Secp256k1<VerifyOnly>,
}

impl Secp256k1Verifier {
    pub fn new() -> Self {
        Self { secp: Secp256k1::verification_only() }
    }
}

impl Default for Secp256k1Verifier {
    fn default() -> Self {
        Self::new()
    }
}

impl SignatureVerifier for Secp256k1Verifier {
    fn verify(&self, public_key: &[u8], message: &[u8], signature: &[u8]) -> bool {
        let pubkey = match PublicKey::from_slice(public_key) {
            Ok(pk) => pk,
            Err(_) => return false,
        };

        let signature = match Signature::from_der(signature) {
            Ok(sig) => sig,
            Err(_) => return false,
        };

        let message = match Message::from_digest_slice(&sha256(message)) {
            Ok(msg) => msg,
            Err(_) => return false,
        };

        self.secp.verify_ecdsa(&message, &signature, &pubkey).is_ok()
    }
}

/// Secret key paired with its context, for signing inputs and proposals
pub struct SigningKey {
    secp: Secp256k1<All>,
    secret: SecretKey,
    public: PublicKey,
}

impl SigningKey {
    pub fn from_secret_bytes(bytes: &[u8; 32]) -> Result<Self> {
        let secp = Secp256k1::new();
        let secret = SecretKey::from_slice(bytes)
            .map_err(|e| LedgerError::InvalidKey(e.to_string()))?;
        let public = PublicKey::from_secret_key(&secp, &secret);
        Ok(Self { secp, secret, public })
    }

    /// Deterministic key derived from a one-byte seed
    pub fn from_seed(seed: u8) -> Result<Self> {
        let mut hasher = Sha256::new();
        hasher.update(b"branch-ledger/seed");
        hasher.update([seed]);
        let bytes: [u8; 32] = hasher.finalize().into();
        Self::from_secret_bytes(&bytes)
    }

    /// Compressed SEC1 encoding of the public key
    pub fn public_key(&self) -> ByteString {
        self.public.serialize().to_vec()
    }

    /// DER signature over SHA-256 of `message`
    pub fn sign(&self, message: &[u8]) -> Result<ByteString> {
        let message = Message::from_digest_slice(&sha256(message))
            .map_err(|e| LedgerError::InvalidKey(e.to_string()))?;
        Ok(self.secp.sign_ecdsa(&message, &self.secret).serialize_der().to_vec())
    }
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKey").field("public", &self.public).finish_non_exhaustive()
    }
}

pub fn sha256(data: &[u8]) -> Hash {
    Sha256::digest(data).into()
}
