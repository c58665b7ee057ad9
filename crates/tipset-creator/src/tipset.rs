//! Tipsets
//!
//! A tipset records, for every node in the roster, the highest
//! non-deterministic generation reachable through an event's ancestry.
//!
//! ```text
//!   roster index:   0      1      2      3
//!   tipset(E):   [  4  ,  -   ,  7   ,  2  ]     (- = never observed)
//! ```
//!
//! Entries only ever grow: `advance` takes the max and `merge` takes the
//! per-creator max across its inputs.

use crate::advancement::TipsetAdvancementWeight;
use std::fmt;
use std::sync::Arc;
use tipset_core::{Generation, NodeId, Roster};

/// Highest generation observed per roster member
#[derive(Clone)]
pub struct Tipset {
    roster: Arc<Roster>,
    /// Indexed by roster position; `None` is the undefined sentinel
    tips: Vec<Option<Generation>>,
}

impl Tipset {
    /// Empty tipset, every entry undefined
    pub fn new(roster: Arc<Roster>) -> Self {
        let tips = vec![None; roster.len()];
        Self { roster, tips }
    }

    /// Merge any number of tipsets sharing the same roster
    pub fn merge_all<'a, I>(roster: Arc<Roster>, tipsets: I) -> Self
    where
        I: IntoIterator<Item = &'a Tipset>,
    {
        Self::new(roster).merge(tipsets)
    }

    /// New tipset holding the per-creator max of `self` and every input.
    /// Merging an empty list returns a copy of `self`.
    pub fn merge<'a, I>(&self, others: I) -> Self
    where
        I: IntoIterator<Item = &'a Tipset>,
    {
        let mut merged = self.clone();
        for other in others {
            for (tip, other_tip) in merged.tips.iter_mut().zip(other.tips.iter()) {
                *tip = (*tip).max(*other_tip);
            }
        }
        merged
    }

    /// Raise the entry for `creator` to at least `generation`.
    /// Unknown creators are ignored.
    pub fn advance(&mut self, creator: NodeId, generation: Generation) -> &mut Self {
        if let Some(position) = self.roster.index_of(&creator) {
            let tip = &mut self.tips[position];
            *tip = (*tip).max(Some(generation));
        }
        self
    }

    /// Copy of this tipset with the entry for `node_id` reset to undefined
    pub fn excluding(&self, node_id: &NodeId) -> Self {
        let mut copy = self.clone();
        if let Some(position) = self.roster.index_of(node_id) {
            copy.tips[position] = None;
        }
        copy
    }

    /// Entry for a node, `None` if unknown or never observed
    pub fn tip_generation_for_node(&self, node_id: &NodeId) -> Option<Generation> {
        self.roster
            .index_of(node_id)
            .and_then(|position| self.tips[position])
    }

    /// Advancement gained by moving from `self` to `other`, as seen by `self_id`.
    ///
    /// Every creator except `self_id` whose entry in `other` is strictly
    /// higher counts: its weight if non-zero, otherwise one zero-weight tick.
    pub fn tip_advancement_weight(&self, self_id: NodeId, other: &Tipset) -> TipsetAdvancementWeight {
        let self_position = self.roster.index_of(&self_id);
        let mut advancement = TipsetAdvancementWeight::ZERO;

        for (position, entry) in self.roster.entries().iter().enumerate() {
            if Some(position) == self_position {
                continue;
            }
            let Some(other_tip) = other.tips.get(position) else {
                continue;
            };
            if self.tips[position] < *other_tip {
                if entry.weight == 0 {
                    advancement.zero_weight_advancement_count += 1;
                } else {
                    advancement.advancement_weight += entry.weight;
                }
            }
        }

        advancement
    }

    pub fn roster(&self) -> &Arc<Roster> {
        &self.roster
    }

    /// Number of roster members tracked
    pub fn len(&self) -> usize {
        self.tips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tips.is_empty()
    }

    /// Iterate `(node, tip)` in roster order
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, Option<Generation>)> + '_ {
        self.roster
            .node_ids()
            .zip(self.tips.iter().copied())
    }
}

impl PartialEq for Tipset {
    fn eq(&self, other: &Self) -> bool {
        self.tips == other.tips
    }
}

impl Eq for Tipset {}

impl fmt::Display for Tipset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, (node_id, tip)) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            match tip {
                Some(generation) => write!(f, "{}:{}", node_id, generation)?,
                None => write!(f, "{}:-", node_id)?,
            }
        }
        write!(f, ")")
    }
}

impl fmt::Debug for Tipset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tipset{}", self)
    }
}
