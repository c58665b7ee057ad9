//! Shared fixtures for unit tests

use chrono::{TimeZone, Utc};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tipset_core::{ManualClock, NodeId, PlatformEvent, Roster, Round, Signature, UnsignedEvent};
use tipset_creator::EventCreationConfig;

static NEXT_NANOS: AtomicU32 = AtomicU32::new(0);

/// Parentless peer event with nGen 0 and a unique hash
pub fn make_event(creator: NodeId, birth_round: Round) -> PlatformEvent {
    let nanos = NEXT_NANOS.fetch_add(1, Ordering::Relaxed) % 1_000_000_000;
    let time = Utc.timestamp_opt(1_600_000_000, nanos).unwrap();
    let unsigned = UnsignedEvent::new(creator, None, vec![], birth_round, time, vec![]);
    PlatformEvent::new(unsigned, Signature::default()).with_n_gen(0)
}

pub fn make_roster(size: u64) -> Arc<Roster> {
    Arc::new(Roster::with_equal_weights(size).unwrap())
}

/// Config without a rate limit, for clocks that never move
pub fn unlimited_config() -> EventCreationConfig {
    EventCreationConfig {
        max_creation_rate: 0.0,
        ..EventCreationConfig::default()
    }
}

pub fn make_clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(Utc.timestamp_opt(1_700_000_000, 0).unwrap()))
}
