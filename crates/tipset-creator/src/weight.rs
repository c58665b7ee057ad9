//! Tipset weight calculator
//!
//! Measures how much each self event advances the hashgraph relative to a
//! snapshot tipset. Once the cumulative advancement plus the local node's
//! own weight reaches a supermajority, the snapshot moves up to the tipset
//! of the latest self event and measurement restarts from zero.
//!
//! ```text
//!   snapshot ──(self events accumulate advancement)──► supermajority?
//!       ▲                                                  │ yes
//!       └──────────── replace with latest tipset ◄─────────┘
//! ```
//!
//! The calculator also keeps a selfishness score per peer: how many snapshot
//! advances in a row passed over a usable event from that peer.

use crate::advancement::TipsetAdvancementWeight;
use crate::childless::ChildlessEventTracker;
use crate::error::{CreatorError, Result};
use crate::tipset::Tipset;
use crate::tracker::TipsetTracker;
use std::fmt;
use std::sync::Arc;
use tipset_core::{EventDescriptor, NodeId, Roster, Threshold};
use tracing::{debug, warn};

/// Computes advancement weight and selfishness for the local node
pub struct TipsetWeightCalculator {
    self_id: NodeId,
    roster: Arc<Roster>,
    self_weight: u64,
    total_weight: u64,

    /// Baseline that advancement is measured against; replaced, never mutated
    snapshot: Arc<Tipset>,

    /// Advancement of the latest self event over the current snapshot
    previous_advancement_weight: TipsetAdvancementWeight,

    /// Indexed by roster position
    selfishness_scores: Vec<u64>,
}

impl TipsetWeightCalculator {
    pub fn new(self_id: NodeId, roster: Arc<Roster>) -> Result<Self> {
        if !roster.contains(&self_id) {
            return Err(CreatorError::SelfNotInRoster(self_id));
        }

        Ok(Self {
            self_id,
            self_weight: roster.weight_of(&self_id),
            total_weight: roster.total_weight(),
            snapshot: Arc::new(Tipset::new(roster.clone())),
            previous_advancement_weight: TipsetAdvancementWeight::ZERO,
            selfishness_scores: vec![0; roster.len()],
            roster,
        })
    }

    /// Record a self event and return how much it advanced on top of the
    /// previous self event.
    ///
    /// The event must already have been added to `tracker`.
    pub fn add_event_and_get_advancement_weight(
        &mut self,
        tracker: &TipsetTracker,
        childless: &ChildlessEventTracker,
        descriptor: &EventDescriptor,
    ) -> Result<TipsetAdvancementWeight> {
        if descriptor.creator() != self.self_id {
            warn!(
                "Advancement weight requested for {} which is not a self event",
                descriptor
            );
        }

        let event_tipset = tracker
            .get_tipset(descriptor)
            .cloned()
            .ok_or(CreatorError::UntrackedEvent(*descriptor))?;

        let advancement_weight = self
            .snapshot
            .tip_advancement_weight(self.self_id, &event_tipset);
        let improvement = advancement_weight - self.previous_advancement_weight;

        let progress = advancement_weight
            .advancement_weight
            .saturating_add(self.self_weight);
        if Threshold::SuperMajority.is_satisfied_by(progress, self.total_weight) {
            self.update_selfishness_scores(childless, &event_tipset);
            debug!(
                "Snapshot advanced by {} with weight {} of {}",
                descriptor, progress, self.total_weight
            );
            self.snapshot = event_tipset;
            self.previous_advancement_weight = TipsetAdvancementWeight::ZERO;
        } else {
            self.previous_advancement_weight = advancement_weight;
        }

        Ok(improvement)
    }

    /// Advancement an event with these parents would add, without side effects
    pub fn get_theoretical_advancement_weight(
        &self,
        tracker: &TipsetTracker,
        parents: &[EventDescriptor],
    ) -> TipsetAdvancementWeight {
        if parents.is_empty() {
            return TipsetAdvancementWeight::ZERO;
        }

        let mut parent_tipsets = Vec::with_capacity(parents.len());
        for parent in parents {
            match tracker.get_tipset(parent) {
                Some(tipset) => parent_tipsets.push(tipset.clone()),
                None => {
                    // A self parent may legitimately be ancient; an other parent never should be
                    if parent.creator() != self.self_id {
                        warn!(
                            "Ancient or unknown parent {} considered as an other parent. Window: {}",
                            parent,
                            tracker.event_window()
                        );
                    }
                }
            }
        }

        let merged = Tipset::merge_all(self.roster.clone(), parent_tipsets.iter().map(|t| t.as_ref()));
        self.snapshot.tip_advancement_weight(self.self_id, &merged) - self.previous_advancement_weight
    }

    /// Increment scores of peers whose usable events were passed over by the
    /// snapshot advance, reset scores of peers that advanced
    fn update_selfishness_scores(&mut self, childless: &ChildlessEventTracker, new_snapshot: &Tipset) {
        for (position, node_id) in self.roster.node_ids().enumerate() {
            if node_id == self.self_id {
                continue;
            }

            let previous_tip = self.snapshot.tip_generation_for_node(&node_id);
            let new_tip = new_snapshot.tip_generation_for_node(&node_id);

            if new_tip > previous_tip {
                self.selfishness_scores[position] = 0;
            } else if childless
                .childless_event_for(&node_id)
                .is_some_and(|event| event.n_gen() > previous_tip)
            {
                self.selfishness_scores[position] += 1;
            }
        }
    }

    /// Selfishness score of a node, zero for unknown nodes
    pub fn get_selfishness_score_for_node(&self, node_id: &NodeId) -> u64 {
        self.roster
            .index_of(node_id)
            .map(|position| self.selfishness_scores[position])
            .unwrap_or(0)
    }

    pub fn get_max_selfishness_score(&self) -> u64 {
        self.selfishness_scores.iter().copied().max().unwrap_or(0)
    }

    /// Weight of every node except the local one
    pub fn maximum_possible_advancement_weight(&self) -> u64 {
        self.total_weight - self.self_weight
    }

    /// Current snapshot; identity only changes when the snapshot advances
    pub fn snapshot(&self) -> &Arc<Tipset> {
        &self.snapshot
    }

    pub fn previous_advancement_weight(&self) -> TipsetAdvancementWeight {
        self.previous_advancement_weight
    }

    pub fn clear(&mut self) {
        self.snapshot = Arc::new(Tipset::new(self.roster.clone()));
        self.previous_advancement_weight = TipsetAdvancementWeight::ZERO;
        self.selfishness_scores.iter_mut().for_each(|score| *score = 0);
    }
}

impl fmt::Display for TipsetWeightCalculator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Snapshot: {}", self.snapshot)?;
        writeln!(f, "Previous advancement weight: {}", self.previous_advancement_weight)?;
        write!(f, "Selfishness scores:")?;
        for (node_id, score) in self.roster.node_ids().zip(self.selfishness_scores.iter()) {
            write!(f, " {}={}", node_id, score)?;
        }
        writeln!(f)
    }
}
