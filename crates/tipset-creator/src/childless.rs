//! Childless event tracker
//!
//! Keeps the peer events that have no known children yet, at most one per
//! creator. These are the candidate other-parents for the next self event.
//!
//! Branching creators are resolved by keeping only the highest-nGen event
//! ever seen from them; an event with an equal or lower nGen is ignored.

use std::collections::HashMap;
use std::fmt;
use tipset_core::{EventDescriptor, EventWindow, NodeId, PlatformEvent};
use tracing::trace;

/// Tracks events that are not yet the parent of any known event
#[derive(Default)]
pub struct ChildlessEventTracker {
    /// Events with no known children
    childless_events: HashMap<EventDescriptor, PlatformEvent>,

    /// Highest-nGen event tracked per creator
    events_by_creator: HashMap<NodeId, PlatformEvent>,
}

impl ChildlessEventTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a new event. Parents of the event are no longer childless.
    pub fn add_event(&mut self, event: &PlatformEvent) {
        let creator = event.creator();
        if let Some(existing) = self.events_by_creator.get(&creator) {
            if existing.n_gen() >= event.n_gen() {
                trace!(
                    "Ignoring {} from {}, already tracking {}",
                    event.descriptor(),
                    creator,
                    existing.descriptor()
                );
                return;
            }
            let existing = *existing.descriptor();
            self.remove_event(&existing);
        }

        self.insert_event(event.clone());

        for parent in event.all_parents() {
            self.remove_event(&parent);
        }
    }

    /// Retire the parents of a self event just created.
    ///
    /// Only the childless set is touched, so lower branches of a retired
    /// creator keep being ignored.
    pub fn register_self_event_parents(&mut self, parents: &[EventDescriptor]) {
        for parent in parents {
            self.childless_events.remove(parent);
        }
    }

    /// Drop every event that is ancient under the new window
    pub fn prune_old_events(&mut self, event_window: &EventWindow) {
        let ancient: Vec<EventDescriptor> = self
            .childless_events
            .keys()
            .filter(|descriptor| event_window.is_ancient(descriptor))
            .copied()
            .collect();
        for descriptor in &ancient {
            self.remove_event(descriptor);
        }
    }

    /// Current childless events, in no particular order
    pub fn childless_events(&self) -> impl Iterator<Item = &PlatformEvent> {
        self.childless_events.values()
    }

    /// The childless event of a creator, if it still has one
    pub fn childless_event_for(&self, node_id: &NodeId) -> Option<&PlatformEvent> {
        self.events_by_creator
            .get(node_id)
            .filter(|event| self.childless_events.contains_key(event.descriptor()))
    }

    pub fn len(&self) -> usize {
        self.childless_events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.childless_events.is_empty()
    }

    pub fn clear(&mut self) {
        self.childless_events.clear();
        self.events_by_creator.clear();
    }

    fn insert_event(&mut self, event: PlatformEvent) {
        self.childless_events.insert(*event.descriptor(), event.clone());
        self.events_by_creator.insert(event.creator(), event);
    }

    fn remove_event(&mut self, descriptor: &EventDescriptor) {
        if self.childless_events.remove(descriptor).is_some() {
            self.events_by_creator.remove(&descriptor.creator());
        }
    }
}

impl fmt::Display for ChildlessEventTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.childless_events.is_empty() {
            return writeln!(f, "Childless events: none");
        }
        writeln!(f, "Childless events:")?;
        for descriptor in self.childless_events.keys() {
            writeln!(f, "  - {}", descriptor)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{make_event, EventFactory};
    use std::collections::HashSet;
    use tipset_core::AncientMode;

    fn childless_set(tracker: &ChildlessEventTracker) -> HashSet<EventDescriptor> {
        tracker.childless_events().map(|event| *event.descriptor()).collect()
    }

    #[test]
    fn test_basic_behavior() {
        let mut tracker = ChildlessEventTracker::new();
        let mut factory = EventFactory::new();

        // Four independent genesis events
        let genesis: Vec<PlatformEvent> = (0..4)
            .map(|id| factory.event(NodeId::new(id), None, vec![], 0))
            .collect();
        for event in &genesis {
            tracker.add_event(event);
        }
        assert_eq!(tracker.len(), 4);

        // Node 0 builds on node 1; both of node 0's parents lose their tip status
        let next = factory.event(NodeId::new(0), Some(&genesis[0]), vec![*genesis[1].descriptor()], 1);
        tracker.add_event(&next);

        let expected: HashSet<EventDescriptor> = [
            *next.descriptor(),
            *genesis[2].descriptor(),
            *genesis[3].descriptor(),
        ]
        .into_iter()
        .collect();
        assert_eq!(childless_set(&tracker), expected);
        assert!(tracker.childless_event_for(&NodeId::new(1)).is_none());
        assert_eq!(
            tracker.childless_event_for(&NodeId::new(0)).map(|e| *e.descriptor()),
            Some(*next.descriptor())
        );
    }

    #[test]
    fn test_branch_equal_generation_keeps_first() {
        let mut tracker = ChildlessEventTracker::new();
        let first = make_event(NodeId::new(1), 3, 1);
        let sibling = make_event(NodeId::new(1), 3, 1);

        tracker.add_event(&first);
        tracker.add_event(&sibling);

        assert_eq!(tracker.len(), 1);
        assert!(childless_set(&tracker).contains(first.descriptor()));
    }

    #[test]
    fn test_branch_higher_generation_replaces() {
        let mut tracker = ChildlessEventTracker::new();
        let low = make_event(NodeId::new(1), 3, 1);
        let high = make_event(NodeId::new(1), 5, 1);

        tracker.add_event(&low);
        tracker.add_event(&high);
        assert_eq!(childless_set(&tracker), [*high.descriptor()].into_iter().collect());

        // And the lower one can never come back
        tracker.add_event(&low);
        assert_eq!(childless_set(&tracker), [*high.descriptor()].into_iter().collect());
    }

    #[test]
    fn test_register_self_event_parents() {
        let mut tracker = ChildlessEventTracker::new();
        let b = make_event(NodeId::new(1), 4, 1);
        let c = make_event(NodeId::new(2), 4, 1);
        let untracked = make_event(NodeId::new(3), 1, 1);
        tracker.add_event(&b);
        tracker.add_event(&c);

        tracker.register_self_event_parents(&[*b.descriptor(), *untracked.descriptor()]);
        assert_eq!(childless_set(&tracker), [*c.descriptor()].into_iter().collect());

        // The high-water mark for node 1 is still in place
        tracker.add_event(&make_event(NodeId::new(1), 4, 1));
        assert_eq!(tracker.len(), 1);
        tracker.add_event(&make_event(NodeId::new(1), 5, 1));
        assert_eq!(tracker.len(), 2);
    }

    #[test]
    fn test_prune_old_events() {
        let mut tracker = ChildlessEventTracker::new();
        let old = make_event(NodeId::new(1), 1, 1);
        let recent = make_event(NodeId::new(2), 1, 3);
        tracker.add_event(&old);
        tracker.add_event(&recent);

        let window = EventWindow::new(2, 3, 2, AncientMode::BirthRoundThreshold).unwrap();
        tracker.prune_old_events(&window);

        assert_eq!(childless_set(&tracker), [*recent.descriptor()].into_iter().collect());

        // A pruned creator may be tracked again from any nGen
        let again = make_event(NodeId::new(1), 0, 3);
        tracker.add_event(&again);
        assert_eq!(tracker.len(), 2);
    }

    #[test]
    fn test_clear_and_display() {
        let mut tracker = ChildlessEventTracker::new();
        tracker.add_event(&make_event(NodeId::new(1), 1, 1));
        assert!(format!("{}", tracker).contains("node-1"));

        tracker.clear();
        assert!(tracker.is_empty());
        assert_eq!(format!("{}", tracker), "Childless events: none\n");
    }
}
