//! Events and event descriptors
//!
//! ```text
//!   self-parent ──┐
//!                 ├──► event (creator, birth round, time, transactions)
//!   other-parents ┘
//! ```
//!
//! An [`EventDescriptor`] is the lightweight handle used as a map key
//! everywhere; a [`PlatformEvent`] carries the full payload plus the
//! non-deterministic generation assigned later by the ordering layer.

use crate::types::{EventHash, Generation, NodeId, Round, Signature, Transaction, FIRST_GENERATION};
use crate::window::AncientMode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Descriptor
// ============================================================================

/// Handle to an event: hash, creator and both ancient indicators
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventDescriptor {
    hash: EventHash,
    creator: NodeId,
    birth_round: Round,
    generation: Generation,
}

impl EventDescriptor {
    pub fn new(hash: EventHash, creator: NodeId, birth_round: Round, generation: Generation) -> Self {
        Self {
            hash,
            creator,
            birth_round,
            generation,
        }
    }

    pub fn hash(&self) -> &EventHash {
        &self.hash
    }

    pub fn creator(&self) -> NodeId {
        self.creator
    }

    pub fn birth_round(&self) -> Round {
        self.birth_round
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// The value compared against the ancient threshold
    pub fn ancient_indicator(&self, mode: AncientMode) -> u64 {
        mode.select_indicator(self)
    }
}

impl fmt::Debug for EventDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({} gen:{} br:{} {})",
            self.creator, self.generation, self.birth_round, self.hash
        )
    }
}

impl fmt::Display for EventDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

// ============================================================================
// Unsigned event
// ============================================================================

/// An event that has been assembled and hashed but not yet signed
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnsignedEvent {
    descriptor: EventDescriptor,
    self_parent: Option<EventDescriptor>,
    other_parents: Vec<EventDescriptor>,
    time_created: DateTime<Utc>,
    transactions: Vec<Transaction>,
}

/// Generation of an event with the given parents: one more than the highest
/// parent generation, or `FIRST_GENERATION` without parents
pub fn next_generation<'a>(parents: impl IntoIterator<Item = &'a EventDescriptor>) -> Generation {
    parents
        .into_iter()
        .map(|parent| parent.generation())
        .max()
        .map_or(FIRST_GENERATION, |max| max + 1)
}

impl UnsignedEvent {
    /// Assemble an event, deriving its generation from the parents and
    /// hashing its content
    pub fn new(
        creator: NodeId,
        self_parent: Option<EventDescriptor>,
        other_parents: Vec<EventDescriptor>,
        birth_round: Round,
        time_created: DateTime<Utc>,
        transactions: Vec<Transaction>,
    ) -> Self {
        let generation = next_generation(self_parent.iter().chain(other_parents.iter()));

        let hash = Self::compute_hash(
            creator,
            self_parent.as_ref(),
            &other_parents,
            birth_round,
            &time_created,
            &transactions,
        );

        Self {
            descriptor: EventDescriptor::new(hash, creator, birth_round, generation),
            self_parent,
            other_parents,
            time_created,
            transactions,
        }
    }

    fn compute_hash(
        creator: NodeId,
        self_parent: Option<&EventDescriptor>,
        other_parents: &[EventDescriptor],
        birth_round: Round,
        time_created: &DateTime<Utc>,
        transactions: &[Transaction],
    ) -> EventHash {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&creator.id().to_le_bytes());
        match self_parent {
            Some(parent) => {
                hasher.update(&[1]);
                hasher.update(parent.hash().as_bytes());
            }
            None => {
                hasher.update(&[0]);
            }
        }
        hasher.update(&(other_parents.len() as u64).to_le_bytes());
        for parent in other_parents {
            hasher.update(parent.hash().as_bytes());
        }
        hasher.update(&birth_round.to_le_bytes());
        hasher.update(&time_created.timestamp().to_le_bytes());
        hasher.update(&time_created.timestamp_subsec_nanos().to_le_bytes());
        hasher.update(&(transactions.len() as u64).to_le_bytes());
        for transaction in transactions {
            hasher.update(&(transaction.len() as u64).to_le_bytes());
            hasher.update(transaction.payload());
        }
        EventHash::new(*hasher.finalize().as_bytes())
    }

    pub fn descriptor(&self) -> &EventDescriptor {
        &self.descriptor
    }

    pub fn hash(&self) -> &EventHash {
        self.descriptor.hash()
    }

    pub fn creator(&self) -> NodeId {
        self.descriptor.creator()
    }

    pub fn self_parent(&self) -> Option<&EventDescriptor> {
        self.self_parent.as_ref()
    }

    pub fn other_parents(&self) -> &[EventDescriptor] {
        &self.other_parents
    }

    /// Self-parent first, then other-parents
    pub fn all_parents(&self) -> Vec<EventDescriptor> {
        self.self_parent
            .iter()
            .chain(self.other_parents.iter())
            .copied()
            .collect()
    }

    pub fn birth_round(&self) -> Round {
        self.descriptor.birth_round()
    }

    pub fn generation(&self) -> Generation {
        self.descriptor.generation()
    }

    pub fn time_created(&self) -> DateTime<Utc> {
        self.time_created
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }
}

// ============================================================================
// Platform event
// ============================================================================

/// A signed event, optionally carrying its non-deterministic generation
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlatformEvent {
    unsigned: UnsignedEvent,
    signature: Signature,
    n_gen: Option<Generation>,
}

impl PlatformEvent {
    /// Wrap a signed event; nGen is undefined until the ordering layer sets it
    pub fn new(unsigned: UnsignedEvent, signature: Signature) -> Self {
        Self {
            unsigned,
            signature,
            n_gen: None,
        }
    }

    /// Builder-style nGen assignment
    pub fn with_n_gen(mut self, n_gen: Generation) -> Self {
        self.n_gen = Some(n_gen);
        self
    }

    /// Assign the non-deterministic generation
    pub fn set_n_gen(&mut self, n_gen: Generation) {
        self.n_gen = Some(n_gen);
    }

    pub fn n_gen(&self) -> Option<Generation> {
        self.n_gen
    }

    pub fn has_n_gen(&self) -> bool {
        self.n_gen.is_some()
    }

    pub fn unsigned(&self) -> &UnsignedEvent {
        &self.unsigned
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn descriptor(&self) -> &EventDescriptor {
        self.unsigned.descriptor()
    }

    pub fn hash(&self) -> &EventHash {
        self.unsigned.hash()
    }

    pub fn creator(&self) -> NodeId {
        self.unsigned.creator()
    }

    pub fn self_parent(&self) -> Option<&EventDescriptor> {
        self.unsigned.self_parent()
    }

    pub fn other_parents(&self) -> &[EventDescriptor] {
        self.unsigned.other_parents()
    }

    pub fn all_parents(&self) -> Vec<EventDescriptor> {
        self.unsigned.all_parents()
    }

    pub fn birth_round(&self) -> Round {
        self.unsigned.birth_round()
    }

    pub fn generation(&self) -> Generation {
        self.unsigned.generation()
    }

    pub fn time_created(&self) -> DateTime<Utc> {
        self.unsigned.time_created()
    }

    pub fn transactions(&self) -> &[Transaction] {
        self.unsigned.transactions()
    }

    pub fn transaction_count(&self) -> usize {
        self.unsigned.transactions().len()
    }
}

impl fmt::Display for PlatformEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.n_gen {
            Some(n_gen) => write!(f, "{} ngen:{}", self.descriptor(), n_gen),
            None => write!(f, "{} ngen:-", self.descriptor()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn make_time(nanos: u32) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, nanos).unwrap()
    }

    #[test]
    fn test_parentless_event_generation() {
        let event = UnsignedEvent::new(NodeId::new(1), None, vec![], 1, make_time(0), vec![]);
        assert_eq!(event.generation(), FIRST_GENERATION);
        assert!(event.all_parents().is_empty());
    }

    #[test]
    fn test_generation_from_parents() {
        let low = EventDescriptor::new(EventHash::from_content(b"a"), NodeId::new(1), 1, 3);
        let high = EventDescriptor::new(EventHash::from_content(b"b"), NodeId::new(2), 1, 8);

        let event = UnsignedEvent::new(NodeId::new(1), Some(low), vec![high], 1, make_time(0), vec![]);
        assert_eq!(event.generation(), 9);
        assert_eq!(event.all_parents(), vec![low, high]);
    }

    #[test]
    fn test_next_generation_matches_event() {
        let parent = EventDescriptor::new(EventHash::from_content(b"p"), NodeId::new(2), 1, 4);
        assert_eq!(next_generation(std::iter::empty()), FIRST_GENERATION);
        assert_eq!(next_generation(&[parent]), 5);

        let event = UnsignedEvent::new(NodeId::new(1), None, vec![parent], 1, make_time(0), vec![]);
        assert_eq!(event.generation(), next_generation(event.all_parents().iter()));
    }

    #[test]
    fn test_hash_covers_time_and_transactions() {
        let a = UnsignedEvent::new(NodeId::new(1), None, vec![], 1, make_time(0), vec![]);
        let b = UnsignedEvent::new(NodeId::new(1), None, vec![], 1, make_time(1), vec![]);
        let c = UnsignedEvent::new(
            NodeId::new(1),
            None,
            vec![],
            1,
            make_time(0),
            vec![Transaction::new(vec![1u8, 2, 3])],
        );
        assert_ne!(a.hash(), b.hash());
        assert_ne!(a.hash(), c.hash());
    }

    #[test]
    fn test_n_gen_assignment() {
        let unsigned = UnsignedEvent::new(NodeId::new(1), None, vec![], 1, make_time(0), vec![]);
        let mut event = PlatformEvent::new(unsigned, Signature::default());
        assert!(!event.has_n_gen());

        event.set_n_gen(5);
        assert_eq!(event.n_gen(), Some(5));
        assert!(format!("{}", event).contains("ngen:5"));
    }
}
