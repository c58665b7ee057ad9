//! Stand-in for the ordering layer and consensus
//!
//! Assigns nGen to created events and moves the event window forward one
//! round at a time. The window keeps `ROUNDS_NON_ANCIENT` rounds (or that
//! many generations per node) behind the latest consensus round, and nGen
//! entries of events that fall behind it are dropped.
//!
//! ```text
//!   created event ──► nGen = max(parent nGen) + 1 ──► n_gens
//!   advance_round ──► latest round + 1
//!                 ├─► threshold = latest - ROUNDS_NON_ANCIENT
//!                 └─► prune n_gens below threshold
//! ```

use std::collections::HashMap;
use tipset_core::{AncientMode, EventDescriptor, EventHash, EventWindow, Generation, PlatformEvent, FIRST_GENERATION};
use tracing::debug;

/// Rounds kept non-ancient behind the latest consensus round
pub const ROUNDS_NON_ANCIENT: u64 = 26;

pub struct OrderingLayer {
    n_gens: HashMap<EventHash, (EventDescriptor, Generation)>,
    event_window: EventWindow,
    max_generation: Generation,
    roster_size: u64,
}

impl OrderingLayer {
    pub fn new(ancient_mode: AncientMode, roster_size: u64) -> Self {
        Self {
            n_gens: HashMap::new(),
            event_window: EventWindow::genesis(ancient_mode),
            max_generation: FIRST_GENERATION,
            roster_size,
        }
    }

    /// Record `event` and return it with its nGen set. Parents already
    /// pruned as ancient do not count.
    pub fn order(&mut self, event: PlatformEvent) -> PlatformEvent {
        let n_gen = event
            .all_parents()
            .iter()
            .filter_map(|parent| self.n_gens.get(parent.hash()).map(|(_, n_gen)| *n_gen))
            .max()
            .map_or(FIRST_GENERATION, |max| max + 1);
        self.n_gens.insert(*event.hash(), (*event.descriptor(), n_gen));
        self.max_generation = self.max_generation.max(event.generation());
        event.with_n_gen(n_gen)
    }

    /// Move consensus forward by one round and return the new window
    pub fn advance_round(&mut self) -> tipset_core::Result<EventWindow> {
        let latest_round = self.event_window.latest_consensus_round() + 1;
        let mode = self.event_window.ancient_mode();
        let threshold = match mode {
            AncientMode::BirthRoundThreshold => latest_round.saturating_sub(ROUNDS_NON_ANCIENT),
            AncientMode::GenerationThreshold => self
                .max_generation
                .saturating_sub(ROUNDS_NON_ANCIENT * self.roster_size),
        }
        .max(mode.first_indicator());

        self.event_window = EventWindow::new(latest_round, latest_round + 1, threshold, mode)?;

        let before = self.n_gens.len();
        let window = self.event_window;
        self.n_gens.retain(|_, (descriptor, _)| !window.is_ancient(descriptor));
        debug!(
            "Advancing to {}, pruned {} nGen entries",
            self.event_window,
            before - self.n_gens.len()
        );
        Ok(self.event_window)
    }

    pub fn event_window(&self) -> &EventWindow {
        &self.event_window
    }

    pub fn max_generation(&self) -> Generation {
        self.max_generation
    }

    /// Events whose nGen is still tracked
    pub fn len(&self) -> usize {
        self.n_gens.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tipset_core::{NodeId, Round, Signature, UnsignedEvent, ROUND_FIRST};

    fn make_event(self_parent: Option<&PlatformEvent>, birth_round: Round) -> PlatformEvent {
        let time = Utc.timestamp_opt(1_700_000_000, birth_round as u32).unwrap();
        let unsigned = UnsignedEvent::new(
            NodeId::new(0),
            self_parent.map(|parent| *parent.descriptor()),
            vec![],
            birth_round,
            time,
            vec![],
        );
        PlatformEvent::new(unsigned, Signature::default())
    }

    #[test]
    fn test_n_gen_from_parents() {
        let mut ordering = OrderingLayer::new(AncientMode::BirthRoundThreshold, 1);
        let first = ordering.order(make_event(None, ROUND_FIRST));
        let second = ordering.order(make_event(Some(&first), ROUND_FIRST));

        assert_eq!(first.n_gen(), Some(FIRST_GENERATION));
        assert_eq!(second.n_gen(), Some(FIRST_GENERATION + 1));
        assert_eq!(ordering.len(), 2);
    }

    #[test]
    fn test_birth_round_threshold_moves_and_prunes() {
        let mut ordering = OrderingLayer::new(AncientMode::BirthRoundThreshold, 1);
        let old = ordering.order(make_event(None, ROUND_FIRST));

        for _ in 0..ROUNDS_NON_ANCIENT {
            ordering.advance_round().unwrap();
        }
        assert_eq!(ordering.event_window().ancient_threshold(), ROUND_FIRST);
        let recent = ordering.order(make_event(Some(&old), ROUNDS_NON_ANCIENT + 1));
        assert_eq!(ordering.len(), 2);

        ordering.advance_round().unwrap();
        let window = ordering.advance_round().unwrap();
        assert_eq!(window.latest_consensus_round(), ROUNDS_NON_ANCIENT + 2);
        assert_eq!(window.ancient_threshold(), 2);
        assert!(window.is_event_ancient(&old));
        assert_eq!(ordering.len(), 1);

        // The pruned self-parent no longer contributes to nGen
        let orphan = ordering.order(make_event(Some(&old), ROUNDS_NON_ANCIENT + 3));
        assert_eq!(orphan.n_gen(), Some(FIRST_GENERATION));
        assert!(!window.is_event_ancient(&recent));
    }

    #[test]
    fn test_generation_threshold_follows_max_generation() {
        let roster_size = 2;
        let mut ordering = OrderingLayer::new(AncientMode::GenerationThreshold, roster_size);
        let mut previous: Option<PlatformEvent> = None;
        for _ in 0..100 {
            let event = ordering.order(make_event(previous.as_ref(), ROUND_FIRST));
            previous = Some(event);
        }
        assert_eq!(ordering.max_generation(), 99);

        let window = ordering.advance_round().unwrap();
        assert_eq!(window.ancient_threshold(), 99 - ROUNDS_NON_ANCIENT * roster_size);
        assert_eq!(ordering.len(), (ROUNDS_NON_ANCIENT * roster_size + 1) as usize);
    }
}
