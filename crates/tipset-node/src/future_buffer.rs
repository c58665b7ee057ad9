//! Future event buffer
//!
//! Events born in a round the node has not reached yet are held back until
//! the event window catches up, then released oldest birth round first.
//!
//! ```text
//!   birth round ≤ pending round ──► released immediately
//!   birth round > pending round ──► buffered[birth round]
//!   window advances             ──► release every round ≤ new pending round
//! ```

use prometheus::IntGauge;
use std::collections::BTreeMap;
use tipset_core::{AncientMode, EventWindow, PlatformEvent, Round};
use tracing::debug;

/// Buffers events whose birth round is in the future
pub struct FutureEventBuffer {
    event_window: EventWindow,
    future_events: BTreeMap<Round, Vec<PlatformEvent>>,
    buffered_count: usize,
    /// Mirrors `buffered_count`
    buffered_gauge: IntGauge,
}

impl FutureEventBuffer {
    pub fn new(ancient_mode: AncientMode, buffered_gauge: IntGauge) -> Self {
        buffered_gauge.set(0);
        Self {
            event_window: EventWindow::genesis(ancient_mode),
            future_events: BTreeMap::new(),
            buffered_count: 0,
            buffered_gauge,
        }
    }

    fn set_buffered_count(&mut self, count: usize) {
        self.buffered_count = count;
        self.buffered_gauge.set(i64::try_from(count).unwrap_or(i64::MAX));
    }

    /// The event if it can be used now, `None` if it was buffered or dropped
    /// as ancient
    pub fn add_event(&mut self, event: PlatformEvent) -> Option<PlatformEvent> {
        if self.event_window.is_event_ancient(&event) {
            return None;
        }
        if event.birth_round() <= self.event_window.pending_consensus_round() {
            return Some(event);
        }

        self.future_events
            .entry(event.birth_round())
            .or_default()
            .push(event);
        self.set_buffered_count(self.buffered_count + 1);
        None
    }

    /// Install a new window and release the events no longer in the future,
    /// in birth round order. Events that went ancient while buffered are
    /// dropped.
    pub fn update_event_window(&mut self, event_window: EventWindow) -> Vec<PlatformEvent> {
        self.event_window = event_window;

        let still_future = self
            .future_events
            .split_off(&(event_window.pending_consensus_round() + 1));
        let ready = std::mem::replace(&mut self.future_events, still_future);

        let mut released = Vec::new();
        let mut dropped = 0usize;
        for event in ready.into_values().flatten() {
            if event_window.is_event_ancient(&event) {
                dropped += 1;
            } else {
                released.push(event);
            }
        }
        self.set_buffered_count(self.buffered_count - (released.len() + dropped));

        if !released.is_empty() || dropped > 0 {
            debug!(
                "Released {} buffered events, dropped {} ancient, {} still buffered",
                released.len(),
                dropped,
                self.buffered_count
            );
        }
        released
    }

    pub fn event_window(&self) -> &EventWindow {
        &self.event_window
    }

    /// Number of events currently buffered
    pub fn len(&self) -> usize {
        self.buffered_count
    }

    pub fn is_empty(&self) -> bool {
        self.buffered_count == 0
    }

    /// Drop everything and return to the genesis window
    pub fn clear(&mut self) {
        self.future_events.clear();
        self.set_buffered_count(0);
        self.event_window = EventWindow::genesis(self.event_window.ancient_mode());
    }
}
