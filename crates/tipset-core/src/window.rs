//! Event window: the boundary below which events are ancient
//!
//! The ancient indicator is either an event's generation or its birth round,
//! depending on the configured [`AncientMode`].

use crate::error::{CoreError, Result};
use crate::event::{EventDescriptor, PlatformEvent};
use crate::types::{Round, FIRST_GENERATION, ROUND_FIRST, ROUND_NEGATIVE_INFINITY};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which event property decides whether an event is ancient
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AncientMode {
    /// Ancient by generation
    GenerationThreshold,
    /// Ancient by birth round
    #[default]
    BirthRoundThreshold,
}

impl AncientMode {
    /// Select the ancient indicator of a descriptor
    pub fn select_indicator(&self, descriptor: &EventDescriptor) -> u64 {
        match self {
            AncientMode::GenerationThreshold => descriptor.generation(),
            AncientMode::BirthRoundThreshold => descriptor.birth_round(),
        }
    }

    /// Lowest legal indicator value in this mode
    pub fn first_indicator(&self) -> u64 {
        match self {
            AncientMode::GenerationThreshold => FIRST_GENERATION,
            AncientMode::BirthRoundThreshold => ROUND_FIRST,
        }
    }
}

/// Current window of non-ancient events
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventWindow {
    latest_consensus_round: Round,
    new_event_birth_round: Round,
    ancient_threshold: u64,
    ancient_mode: AncientMode,
}

impl EventWindow {
    /// Create a validated event window
    pub fn new(
        latest_consensus_round: Round,
        new_event_birth_round: Round,
        ancient_threshold: u64,
        ancient_mode: AncientMode,
    ) -> Result<Self> {
        if new_event_birth_round < ROUND_FIRST {
            return Err(CoreError::InvalidBirthRound(new_event_birth_round));
        }

        let minimum = ancient_mode.first_indicator();
        if ancient_threshold < minimum {
            return Err(CoreError::InvalidAncientThreshold {
                threshold: ancient_threshold,
                minimum,
            });
        }

        Ok(Self {
            latest_consensus_round,
            new_event_birth_round,
            ancient_threshold,
            ancient_mode,
        })
    }

    /// The window in effect before any round reaches consensus
    pub fn genesis(ancient_mode: AncientMode) -> Self {
        Self {
            latest_consensus_round: ROUND_NEGATIVE_INFINITY,
            new_event_birth_round: ROUND_FIRST,
            ancient_threshold: ancient_mode.first_indicator(),
            ancient_mode,
        }
    }

    pub fn is_genesis(&self) -> bool {
        self.latest_consensus_round == ROUND_NEGATIVE_INFINITY
    }

    pub fn latest_consensus_round(&self) -> Round {
        self.latest_consensus_round
    }

    /// The round that will come to consensus next
    pub fn pending_consensus_round(&self) -> Round {
        self.latest_consensus_round + 1
    }

    pub fn new_event_birth_round(&self) -> Round {
        self.new_event_birth_round
    }

    pub fn ancient_threshold(&self) -> u64 {
        self.ancient_threshold
    }

    pub fn ancient_mode(&self) -> AncientMode {
        self.ancient_mode
    }

    pub fn is_ancient(&self, descriptor: &EventDescriptor) -> bool {
        self.is_ancient_indicator(self.ancient_mode.select_indicator(descriptor))
    }

    pub fn is_event_ancient(&self, event: &PlatformEvent) -> bool {
        self.is_ancient(event.descriptor())
    }

    pub fn is_ancient_indicator(&self, indicator: u64) -> bool {
        indicator < self.ancient_threshold
    }
}

impl Default for EventWindow {
    fn default() -> Self {
        Self::genesis(AncientMode::default())
    }
}

impl fmt::Debug for EventWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventWindow")
            .field("latest_consensus_round", &self.latest_consensus_round)
            .field("new_event_birth_round", &self.new_event_birth_round)
            .field("ancient_mode", &self.ancient_mode)
            .field("ancient_threshold", &self.ancient_threshold)
            .finish()
    }
}

impl fmt::Display for EventWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "latest_round={} birth_round={} threshold={} mode={:?}",
            self.latest_consensus_round, self.new_event_birth_round, self.ancient_threshold, self.ancient_mode
        )
    }
}
