//! Core type definitions for the tipset event creator
//!
//! Identifiers and scalar types shared by every crate in the workspace.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Non-deterministic generation assigned by the ordering layer.
///
/// The undefined sentinel is `None` of `Option<Generation>`, which orders
/// below every real generation.
pub type Generation = u64;

/// Consensus round number
pub type Round = u64;

/// The generation of a parentless event
pub const FIRST_GENERATION: Generation = 0;

/// Round number used before any round has reached consensus
pub const ROUND_NEGATIVE_INFINITY: Round = 0;

/// The first round of consensus
pub const ROUND_FIRST: Round = 1;

/// NodeId - Identifier of a network participant
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct NodeId(u64);

impl NodeId {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

impl From<u64> for NodeId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node-{}", self.0)
    }
}

/// EventHash - BLAKE3 digest of an unsigned event
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct EventHash {
    hash: [u8; 32],
}

impl EventHash {
    /// Create a new EventHash from raw bytes
    pub fn new(hash: [u8; 32]) -> Self {
        Self { hash }
    }

    /// Hash arbitrary content with BLAKE3
    pub fn from_content(content: &[u8]) -> Self {
        Self {
            hash: *blake3::hash(content).as_bytes(),
        }
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.hash
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.hash)
    }
}

impl fmt::Debug for EventHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventHash({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for EventHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.to_hex()[..12])
    }
}

/// Signature over an event hash, produced by the external signer
#[derive(Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Signature(Vec<u8>);

impl Signature {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shown = self.0.len().min(8);
        write!(f, "Signature({}..)", hex::encode(&self.0[..shown]))
    }
}

/// Opaque application transaction embedded in an event
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct Transaction(Bytes);

impl Transaction {
    pub fn new(payload: impl Into<Bytes>) -> Self {
        Self(payload.into())
    }

    pub fn payload(&self) -> &Bytes {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Transaction({} bytes)", self.0.len())
    }
}
