//! Roster snapshot and weight thresholds
//!
//! A roster is the immutable set of participants for a consensus period,
//! each with a relative weight (stake). Zero-weight nodes still create events
//! but contribute nothing to advancement or consensus weight.

use crate::error::{CoreError, Result};
use crate::types::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single roster member
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub node_id: NodeId,
    pub weight: u64,
}

impl RosterEntry {
    pub fn new(node_id: NodeId, weight: u64) -> Self {
        Self { node_id, weight }
    }
}

/// Immutable roster snapshot
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Roster {
    entries: Vec<RosterEntry>,
    index: HashMap<NodeId, usize>,
    total_weight: u64,
}

impl Roster {
    /// Build a roster, rejecting empty rosters, duplicate ids and weight overflow
    pub fn new(entries: Vec<RosterEntry>) -> Result<Self> {
        if entries.is_empty() {
            return Err(CoreError::EmptyRoster);
        }

        let mut index = HashMap::with_capacity(entries.len());
        let mut total_weight: u64 = 0;
        for (position, entry) in entries.iter().enumerate() {
            if index.insert(entry.node_id, position).is_some() {
                return Err(CoreError::DuplicateNode(entry.node_id));
            }
            total_weight = total_weight
                .checked_add(entry.weight)
                .ok_or(CoreError::WeightOverflow)?;
        }

        tracing::debug!(
            "Built roster with {} nodes and total weight {}",
            entries.len(),
            total_weight
        );

        Ok(Self {
            entries,
            index,
            total_weight,
        })
    }

    /// Roster where every node in `0..size` has weight 1
    pub fn with_equal_weights(size: u64) -> Result<Self> {
        Self::new(
            (0..size)
                .map(|id| RosterEntry::new(NodeId::new(id), 1))
                .collect(),
        )
    }

    pub fn entries(&self) -> &[RosterEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Position of a node within the roster
    pub fn index_of(&self, node_id: &NodeId) -> Option<usize> {
        self.index.get(node_id).copied()
    }

    pub fn contains(&self, node_id: &NodeId) -> bool {
        self.index.contains_key(node_id)
    }

    /// Weight of a node, zero if the node is not in the roster
    pub fn weight_of(&self, node_id: &NodeId) -> u64 {
        self.index_of(node_id)
            .map(|position| self.entries[position].weight)
            .unwrap_or(0)
    }

    pub fn total_weight(&self) -> u64 {
        self.total_weight
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.entries.iter().map(|entry| entry.node_id)
    }
}

/// Weight thresholds used by consensus
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Threshold {
    /// Strictly more than two thirds
    SuperMajority,
}

impl Threshold {
    /// Check whether `part` out of `total` satisfies the threshold
    pub fn is_satisfied_by(&self, part: u64, total: u64) -> bool {
        let part = part as u128;
        let total = total as u128;
        match self {
            Threshold::SuperMajority => part * 3 > total * 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_roster_rejected() {
        assert!(matches!(Roster::new(vec![]), Err(CoreError::EmptyRoster)));
    }

    #[test]
    fn test_duplicate_node_rejected() {
        let entries = vec![
            RosterEntry::new(NodeId::new(1), 5),
            RosterEntry::new(NodeId::new(1), 7),
        ];
        assert!(matches!(
            Roster::new(entries),
            Err(CoreError::DuplicateNode(id)) if id == NodeId::new(1)
        ));
    }

    #[test]
    fn test_weight_overflow_rejected() {
        let entries = vec![
            RosterEntry::new(NodeId::new(1), u64::MAX),
            RosterEntry::new(NodeId::new(2), 1),
        ];
        assert!(matches!(Roster::new(entries), Err(CoreError::WeightOverflow)));
    }

    #[test]
    fn test_roster_lookup() {
        let roster = Roster::new(vec![
            RosterEntry::new(NodeId::new(10), 3),
            RosterEntry::new(NodeId::new(20), 0),
            RosterEntry::new(NodeId::new(30), 7),
        ])
        .unwrap();

        assert_eq!(roster.len(), 3);
        assert_eq!(roster.total_weight(), 10);
        assert_eq!(roster.index_of(&NodeId::new(30)), Some(2));
        assert_eq!(roster.weight_of(&NodeId::new(20)), 0);
        assert_eq!(roster.weight_of(&NodeId::new(99)), 0);
        assert!(!roster.contains(&NodeId::new(99)));
    }

    #[test]
    fn test_super_majority() {
        // 4 equal nodes: 3 of 4 is enough, 2 of 4 is not
        assert!(Threshold::SuperMajority.is_satisfied_by(3, 4));
        assert!(!Threshold::SuperMajority.is_satisfied_by(2, 4));
        // Exactly two thirds is not a supermajority
        assert!(!Threshold::SuperMajority.is_satisfied_by(2, 3));
        assert!(Threshold::SuperMajority.is_satisfied_by(u64::MAX, u64::MAX));
    }

    mod prop {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn super_majority_is_monotonic(part in 0u64..10_000, more in 0u64..10_000, extra in 0u64..10_000) {
                let total = part + more + extra;
                if Threshold::SuperMajority.is_satisfied_by(part, total) {
                    prop_assert!(Threshold::SuperMajority.is_satisfied_by(part + more, total));
                }
            }

            #[test]
            fn total_weight_is_sum(weights in proptest::collection::vec(0u64..1_000, 1..20)) {
                let entries = weights
                    .iter()
                    .enumerate()
                    .map(|(id, weight)| RosterEntry::new(NodeId::new(id as u64), *weight))
                    .collect();
                let roster = Roster::new(entries).unwrap();
                prop_assert_eq!(roster.total_weight(), weights.iter().sum::<u64>());
            }
        }
    }
}
