//! Shared fixtures for unit tests

use chrono::{TimeZone, Utc};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tipset_core::{
    EventDescriptor, Generation, NodeId, PlatformEvent, Roster, RosterEntry, Round, Signature, UnsignedEvent,
    ROUND_FIRST,
};

static NEXT_NANOS: AtomicU32 = AtomicU32::new(0);

/// Roster with node ids `0..weights.len()`
pub fn make_roster(weights: &[u64]) -> Arc<Roster> {
    let entries = weights
        .iter()
        .enumerate()
        .map(|(id, weight)| RosterEntry::new(NodeId::new(id as u64), *weight))
        .collect();
    Arc::new(Roster::new(entries).unwrap())
}

/// Parentless event with a unique hash
pub fn make_event(creator: NodeId, n_gen: Generation, birth_round: Round) -> PlatformEvent {
    EventFactory::new().build(creator, None, vec![], n_gen, birth_round)
}

/// Builds events with unique hashes and explicit nGen values
#[derive(Default)]
pub struct EventFactory;

impl EventFactory {
    pub fn new() -> Self {
        Self
    }

    /// Event with birth round `ROUND_FIRST`
    pub fn event(
        &mut self,
        creator: NodeId,
        self_parent: Option<&PlatformEvent>,
        other_parents: Vec<EventDescriptor>,
        n_gen: Generation,
    ) -> PlatformEvent {
        self.build(creator, self_parent, other_parents, n_gen, ROUND_FIRST)
    }

    pub fn build(
        &self,
        creator: NodeId,
        self_parent: Option<&PlatformEvent>,
        other_parents: Vec<EventDescriptor>,
        n_gen: Generation,
        birth_round: Round,
    ) -> PlatformEvent {
        let nanos = NEXT_NANOS.fetch_add(1, Ordering::Relaxed) % 1_000_000_000;
        let time = Utc.timestamp_opt(1_700_000_000, nanos).unwrap();
        let unsigned = UnsignedEvent::new(
            creator,
            self_parent.map(|parent| *parent.descriptor()),
            other_parents,
            birth_round,
            time,
            vec![],
        );
        PlatformEvent::new(unsigned, Signature::default()).with_n_gen(n_gen)
    }
}
