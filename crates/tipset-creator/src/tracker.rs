//! Tipset tracker
//!
//! Computes and stores the tipset of every non-ancient event. Peer event
//! tipsets are the merge of the parents' tipsets advanced by the creator's
//! nGen; self event tipsets are the plain merge, so the local node's own
//! entry stays undefined.

use crate::tipset::Tipset;
use std::collections::HashMap;
use std::sync::Arc;
use tipset_core::{AncientMode, EventDescriptor, EventWindow, Generation, NodeId, PlatformEvent, Roster};
use tracing::{debug, warn};

/// Stores the tipset of every live event
pub struct TipsetTracker {
    self_id: NodeId,
    roster: Arc<Roster>,
    ancient_mode: AncientMode,
    event_window: EventWindow,

    /// Tipset of every non-ancient event
    tipsets: HashMap<EventDescriptor, Arc<Tipset>>,

    /// Highest nGen ever observed per peer creator
    latest_generations: Tipset,
}

impl TipsetTracker {
    pub fn new(self_id: NodeId, roster: Arc<Roster>, ancient_mode: AncientMode) -> Self {
        Self {
            self_id,
            latest_generations: Tipset::new(roster.clone()),
            roster,
            ancient_mode,
            event_window: EventWindow::genesis(ancient_mode),
            tipsets: HashMap::new(),
        }
    }

    /// Install a new event window and drop every tipset that became ancient
    pub fn set_event_window(&mut self, event_window: EventWindow) {
        self.event_window = event_window;
        let before = self.tipsets.len();
        self.tipsets
            .retain(|descriptor, _| !event_window.is_ancient(descriptor));
        debug!(
            "Pruned {} ancient tipsets, {} remain",
            before - self.tipsets.len(),
            self.tipsets.len()
        );
    }

    pub fn event_window(&self) -> &EventWindow {
        &self.event_window
    }

    /// Track a self event. The local node's own entry is never advanced.
    pub fn add_self_event(&mut self, descriptor: EventDescriptor, parents: &[EventDescriptor]) -> Arc<Tipset> {
        if descriptor.creator() != self.self_id {
            warn!(
                "Attempt to add peer event as self event. Self id: {}, event creator: {}",
                self.self_id,
                descriptor.creator()
            );
        }

        let tipset = Arc::new(self.merge_parents(parents).excluding(&descriptor.creator()));
        self.store(descriptor, tipset.clone());
        tipset
    }

    /// Track a peer event, advancing its creator's entry to the event's nGen
    pub fn add_peer_event(&mut self, event: &PlatformEvent) -> Arc<Tipset> {
        let descriptor = *event.descriptor();
        if descriptor.creator() == self.self_id {
            warn!(
                "Attempt to add self event as peer event. Self id: {}, event creator: {}",
                self.self_id,
                descriptor.creator()
            );
        }

        let mut tipset = self.merge_parents(&event.all_parents());
        match event.n_gen() {
            Some(n_gen) => {
                tipset.advance(descriptor.creator(), n_gen);
                self.latest_generations.advance(descriptor.creator(), n_gen);
            }
            None => warn!("Peer event {} has no nGen assigned", descriptor),
        }

        let tipset = Arc::new(tipset);
        self.store(descriptor, tipset.clone());
        tipset
    }

    /// Tipset of an event, `None` if unknown or ancient
    pub fn get_tipset(&self, descriptor: &EventDescriptor) -> Option<&Arc<Tipset>> {
        self.tipsets.get(descriptor)
    }

    /// Highest nGen observed for a peer, `None` if never observed
    pub fn latest_generation_for_node(&self, node_id: &NodeId) -> Option<Generation> {
        self.latest_generations.tip_generation_for_node(node_id)
    }

    pub fn roster(&self) -> &Arc<Roster> {
        &self.roster
    }

    pub fn len(&self) -> usize {
        self.tipsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tipsets.is_empty()
    }

    /// Forget everything and return to the genesis window
    pub fn clear(&mut self) {
        self.event_window = EventWindow::genesis(self.ancient_mode);
        self.latest_generations = Tipset::new(self.roster.clone());
        self.tipsets.clear();
    }

    /// Merge the tracked tipsets of `parents`; untracked parents are skipped
    fn merge_parents(&self, parents: &[EventDescriptor]) -> Tipset {
        Tipset::merge_all(
            self.roster.clone(),
            parents
                .iter()
                .filter_map(|parent| self.tipsets.get(parent))
                .map(|tipset| tipset.as_ref()),
        )
    }

    fn store(&mut self, descriptor: EventDescriptor, tipset: Arc<Tipset>) {
        if self.event_window.is_ancient(&descriptor) {
            warn!(
                "Rejecting ancient event from {} with indicator {}. Current event window is {}",
                descriptor.creator(),
                descriptor.ancient_indicator(self.event_window.ancient_mode()),
                self.event_window
            );
            return;
        }
        self.tipsets.insert(descriptor, tipset);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{make_event, make_roster, EventFactory};

    #[test]
    fn test_self_event_never_advances_self() {
        let roster = make_roster(&[1, 1, 1, 1]);
        let self_id = NodeId::new(0);
        let mut tracker = TipsetTracker::new(self_id, roster.clone(), AncientMode::BirthRoundThreshold);
        let mut factory = EventFactory::new();

        // A peer event that already knows about a self event at nGen 4
        let self_parent = factory.event(self_id, None, vec![], 4);
        let peer = factory.event(NodeId::new(1), None, vec![*self_parent.descriptor()], 5);
        tracker.add_peer_event(&self_parent);
        tracker.add_peer_event(&peer);
        assert_eq!(
            tracker.get_tipset(peer.descriptor()).unwrap().tip_generation_for_node(&self_id),
            Some(4)
        );

        // Our own event citing it does not inherit our own ancestor's generation
        let own = factory.event(self_id, Some(&self_parent), vec![*peer.descriptor()], 6);
        let tipset = tracker.add_self_event(*own.descriptor(), &own.all_parents());
        assert_eq!(tipset.tip_generation_for_node(&NodeId::new(1)), Some(5));
        assert_eq!(tipset.tip_generation_for_node(&self_id), None);
    }

    #[test]
    fn test_self_entry_stays_undefined_for_self_chain() {
        let roster = make_roster(&[1, 1]);
        let self_id = NodeId::new(0);
        let mut tracker = TipsetTracker::new(self_id, roster, AncientMode::BirthRoundThreshold);
        let mut factory = EventFactory::new();

        let e4 = factory.event(self_id, None, vec![], 4);
        tracker.add_self_event(*e4.descriptor(), &e4.all_parents());
        let e5 = factory.event(self_id, Some(&e4), vec![], 5);
        let tipset = tracker.add_self_event(*e5.descriptor(), &e5.all_parents());

        assert_eq!(tipset.tip_generation_for_node(&self_id), None);
    }

    #[test]
    fn test_peer_event_merges_parents() {
        let roster = make_roster(&[1, 1, 1]);
        let mut tracker = TipsetTracker::new(NodeId::new(0), roster, AncientMode::BirthRoundThreshold);
        let mut factory = EventFactory::new();

        let b1 = factory.event(NodeId::new(1), None, vec![], 1);
        let c3 = factory.event(NodeId::new(2), None, vec![], 3);
        let b2 = factory.event(NodeId::new(1), Some(&b1), vec![*c3.descriptor()], 2);

        tracker.add_peer_event(&b1);
        tracker.add_peer_event(&c3);
        let tipset = tracker.add_peer_event(&b2);

        assert_eq!(tipset.tip_generation_for_node(&NodeId::new(1)), Some(2));
        assert_eq!(tipset.tip_generation_for_node(&NodeId::new(2)), Some(3));
        assert_eq!(tipset.tip_generation_for_node(&NodeId::new(0)), None);
        assert_eq!(tracker.latest_generation_for_node(&NodeId::new(1)), Some(2));
        assert_eq!(tracker.latest_generation_for_node(&NodeId::new(0)), None);
        assert_eq!(tracker.len(), 3);
    }

    #[test]
    fn test_unknown_parents_are_skipped() {
        let roster = make_roster(&[1, 1]);
        let mut tracker = TipsetTracker::new(NodeId::new(0), roster, AncientMode::BirthRoundThreshold);
        let mut factory = EventFactory::new();

        let never_seen = factory.event(NodeId::new(0), None, vec![], 7);
        let peer = factory.event(NodeId::new(1), None, vec![*never_seen.descriptor()], 2);

        let tipset = tracker.add_peer_event(&peer);
        assert_eq!(tipset.tip_generation_for_node(&NodeId::new(0)), None);
        assert_eq!(tipset.tip_generation_for_node(&NodeId::new(1)), Some(2));
    }

    #[test]
    fn test_ancient_pruning() {
        let roster = make_roster(&[1, 1]);
        let mut tracker = TipsetTracker::new(NodeId::new(0), roster, AncientMode::BirthRoundThreshold);

        let old = make_event(NodeId::new(1), 1, 1);
        let current = make_event(NodeId::new(1), 2, 2);
        let newer = make_event(NodeId::new(1), 3, 3);
        for event in [&old, &current, &newer] {
            tracker.add_peer_event(event);
        }

        let expected = tracker.get_tipset(current.descriptor()).cloned();
        tracker.set_event_window(EventWindow::new(1, 3, 2, AncientMode::BirthRoundThreshold).unwrap());

        assert!(tracker.get_tipset(old.descriptor()).is_none());
        assert_eq!(tracker.get_tipset(current.descriptor()).cloned(), expected);
        assert!(tracker.get_tipset(newer.descriptor()).is_some());
        assert_eq!(tracker.len(), 2);
    }

    #[test]
    fn test_ancient_event_not_stored() {
        let roster = make_roster(&[1, 1]);
        let mut tracker = TipsetTracker::new(NodeId::new(0), roster, AncientMode::BirthRoundThreshold);
        tracker.set_event_window(EventWindow::new(4, 5, 3, AncientMode::BirthRoundThreshold).unwrap());

        let ancient = make_event(NodeId::new(1), 1, 2);
        let tipset = tracker.add_peer_event(&ancient);

        assert_eq!(tipset.tip_generation_for_node(&NodeId::new(1)), Some(1));
        assert!(tracker.get_tipset(ancient.descriptor()).is_none());
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_clear() {
        let roster = make_roster(&[1, 1]);
        let mut tracker = TipsetTracker::new(NodeId::new(0), roster, AncientMode::GenerationThreshold);
        tracker.add_peer_event(&make_event(NodeId::new(1), 3, 1));
        tracker.set_event_window(EventWindow::new(2, 3, 0, AncientMode::GenerationThreshold).unwrap());

        tracker.clear();
        assert!(tracker.is_empty());
        assert!(tracker.event_window().is_genesis());
        assert_eq!(tracker.event_window().ancient_mode(), AncientMode::GenerationThreshold);
        assert_eq!(tracker.latest_generation_for_node(&NodeId::new(1)), None);
    }
}
