//! Event hash signing
//!
//! The event creator never touches key material directly: it hands the
//! hash of a freshly built event to a [`HashSigner`] and embeds whatever
//! signature comes back.

use crate::error::{CryptoError, Result};
use ed25519_dalek::{Signature as Ed25519Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use rand::RngCore;
use tipset_core::{EventHash, NodeId, Signature};

/// Context string for deriving per-node signing seeds
const NODE_SEED_CONTEXT: &str = "tipset 2024 node signing seed v1";

/// Signs event hashes on behalf of the local node
pub trait HashSigner: Send + Sync {
    fn sign(&self, hash: &EventHash) -> Signature;
}

/// Ed25519 signer over event hashes
pub struct Ed25519HashSigner {
    signing_key: SigningKey,
}

impl Ed25519HashSigner {
    /// Generate a new random signer
    pub fn generate() -> Self {
        let mut secret_bytes = [0u8; 32];
        OsRng.fill_bytes(&mut secret_bytes);
        Self::from_seed(&secret_bytes)
    }

    /// Deterministic signer from a 32-byte seed
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    /// Deterministic signer for `node_id` derived from a shared master seed
    pub fn for_node(master_seed: &[u8; 32], node_id: NodeId) -> Self {
        let mut material = Vec::with_capacity(40);
        material.extend_from_slice(master_seed);
        material.extend_from_slice(&node_id.id().to_le_bytes());
        Self::from_seed(&blake3::derive_key(NODE_SEED_CONTEXT, &material))
    }

    /// Public half of the signing key
    pub fn public_key(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes()
    }
}

impl HashSigner for Ed25519HashSigner {
    fn sign(&self, hash: &EventHash) -> Signature {
        let signature = self.signing_key.sign(hash.as_bytes());
        Signature::new(signature.to_bytes().to_vec())
    }
}

impl std::fmt::Debug for Ed25519HashSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Ed25519HashSigner({})", hex::encode(&self.public_key()[..8]))
    }
}

/// Verify an event hash signature against an Ed25519 public key
pub fn verify(public_key: &[u8; 32], hash: &EventHash, signature: &Signature) -> Result<()> {
    let verifying_key = VerifyingKey::from_bytes(public_key)
        .map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))?;

    let sig_bytes: [u8; 64] = signature
        .as_bytes()
        .try_into()
        .map_err(|_| CryptoError::InvalidSignature("Invalid Ed25519 signature length".to_string()))?;
    let sig = Ed25519Signature::from_bytes(&sig_bytes);

    verifying_key.verify(hash.as_bytes(), &sig).map_err(|_| {
        tracing::debug!("Signature check failed for event {}", hash);
        CryptoError::VerificationFailed
    })
}
