//! Tipset event creator
//!
//! Decides when to create a self event and which other-parent to use.
//!
//! ```text
//!   register_event ──► TipsetTracker ──┐
//!                  └─► Childless ──────┤
//!                                      ▼
//!   maybe_create_event ──► pity parent? ──► best parent? ──► genesis?
//!                               │               │               │
//!                               └──────► build, sign, track ◄───┘
//! ```
//!
//! The creator prefers the childless peer event that advances the
//! hashgraph the most relative to the weight calculator's snapshot. With a
//! probability that grows with the worst selfishness score, it instead
//! picks a parent from a peer it has been ignoring.

use crate::advancement::TipsetAdvancementWeight;
use crate::childless::ChildlessEventTracker;
use crate::config::EventCreationConfig;
use crate::error::Result;
use crate::metrics::{CreationStats, TipsetMetrics};
use crate::supplier::TransactionSupplier;
use crate::tracker::TipsetTracker;
use crate::weight::TipsetWeightCalculator;
use chrono::{DateTime, Duration, Utc};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use prometheus::Registry;
use rand_chacha::ChaCha8Rng;
use std::fmt;
use std::sync::Arc;
use tipset_core::{
    next_generation, AncientMode, EventDescriptor, EventWindow, NodeId, PlatformEvent, Roster, Round, UnsignedEvent,
    WallClock, ROUND_FIRST,
};
use tipset_crypto::HashSigner;
use tracing::{debug, info, warn};

// ============================================================================
// EventCreator trait
// ============================================================================

/// Creates self events from the stream of observed events
pub trait EventCreator: Send {
    /// Feed an event that passed validation and has its nGen assigned
    fn register_event(&mut self, event: &PlatformEvent);

    /// Install a new event window; the window only ever moves forward
    fn set_event_window(&mut self, event_window: EventWindow);

    /// Create a self event if there is something useful to say.
    ///
    /// `Ok(None)` is the normal outcome when no parent would advance the
    /// hashgraph.
    fn maybe_create_event(&mut self) -> Result<Option<PlatformEvent>>;

    /// Forget all history, e.g. after a reconnect
    fn clear(&mut self);
}

// ============================================================================
// TipsetEventCreator
// ============================================================================

/// Event creator driven by tipset advancement weight
pub struct TipsetEventCreator {
    self_id: NodeId,
    roster: Arc<Roster>,
    ancient_mode: AncientMode,
    anti_selfishness_factor: f64,

    clock: Arc<dyn WallClock>,
    signer: Arc<dyn HashSigner>,
    transaction_supplier: Arc<dyn TransactionSupplier>,

    /// Shuffles candidates and rolls the pity dice
    rng: ChaCha8Rng,

    tipset_tracker: TipsetTracker,
    childless_events: ChildlessEventTracker,
    weight_calculator: TipsetWeightCalculator,

    /// Self-parent of the next event
    last_self_event: Option<PlatformEvent>,

    metrics: TipsetMetrics,
}

impl TipsetEventCreator {
    /// Creator with metrics in a registry of its own
    pub fn new(
        config: &EventCreationConfig,
        self_id: NodeId,
        roster: Arc<Roster>,
        ancient_mode: AncientMode,
        clock: Arc<dyn WallClock>,
        signer: Arc<dyn HashSigner>,
        transaction_supplier: Arc<dyn TransactionSupplier>,
    ) -> Result<Self> {
        Self::with_registry(
            config,
            self_id,
            roster,
            ancient_mode,
            clock,
            signer,
            transaction_supplier,
            Registry::new(),
        )
    }

    /// Creator registering its metrics in `registry`
    #[allow(clippy::too_many_arguments)]
    pub fn with_registry(
        config: &EventCreationConfig,
        self_id: NodeId,
        roster: Arc<Roster>,
        ancient_mode: AncientMode,
        clock: Arc<dyn WallClock>,
        signer: Arc<dyn HashSigner>,
        transaction_supplier: Arc<dyn TransactionSupplier>,
        registry: Registry,
    ) -> Result<Self> {
        let weight_calculator = TipsetWeightCalculator::new(self_id, roster.clone())?;
        info!(
            "Event creator for {} ready: {} nodes, ancient mode {:?}",
            self_id,
            roster.len(),
            ancient_mode
        );

        Ok(Self {
            self_id,
            tipset_tracker: TipsetTracker::new(self_id, roster.clone(), ancient_mode),
            roster,
            ancient_mode,
            anti_selfishness_factor: config.effective_anti_selfishness_factor(),
            clock,
            signer,
            transaction_supplier,
            rng: ChaCha8Rng::seed_from_u64(config.rng_seed),
            childless_events: ChildlessEventTracker::new(),
            weight_calculator,
            last_self_event: None,
            metrics: TipsetMetrics::new(registry)?,
        })
    }

    pub fn self_id(&self) -> NodeId {
        self.self_id
    }

    pub fn roster(&self) -> &Arc<Roster> {
        &self.roster
    }

    pub fn event_window(&self) -> &EventWindow {
        self.tipset_tracker.event_window()
    }

    /// The self-parent the next event will use
    pub fn last_self_event(&self) -> Option<&PlatformEvent> {
        self.last_self_event.as_ref()
    }

    pub fn metrics(&self) -> &TipsetMetrics {
        &self.metrics
    }

    /// Current metric values
    pub fn stats(&self) -> CreationStats {
        self.metrics.snapshot(&self.roster)
    }

    pub fn tipset_tracker(&self) -> &TipsetTracker {
        &self.tipset_tracker
    }

    pub fn childless_events(&self) -> &ChildlessEventTracker {
        &self.childless_events
    }

    pub fn weight_calculator(&self) -> &TipsetWeightCalculator {
        &self.weight_calculator
    }

    /// Childless events in a reproducible order
    fn sorted_candidates(&self) -> Vec<PlatformEvent> {
        let mut candidates: Vec<PlatformEvent> = self.childless_events.childless_events().cloned().collect();
        candidates.sort_by(|a, b| a.creator().cmp(&b.creator()).then_with(|| a.hash().cmp(b.hash())));
        candidates
    }

    /// Parents the next event would have with `other_parent`
    fn candidate_parents(&self, other_parent: &PlatformEvent) -> Vec<EventDescriptor> {
        let mut parents = vec![*other_parent.descriptor()];
        parents.extend(self.last_self_event.as_ref().map(|event| *event.descriptor()));
        parents
    }

    /// Childless event with the greatest advancement weight.
    ///
    /// Ties go to the higher selfishness score, then to the earlier
    /// candidate in shuffled order. `None` if nothing advances.
    fn choose_best_parent(&mut self) -> Option<PlatformEvent> {
        let mut candidates = self.sorted_candidates();
        candidates.shuffle(&mut self.rng);

        let mut best: Option<(PlatformEvent, TipsetAdvancementWeight, u64)> = None;
        for candidate in candidates {
            let weight = self
                .weight_calculator
                .get_theoretical_advancement_weight(&self.tipset_tracker, &self.candidate_parents(&candidate));
            if !weight.is_non_zero() {
                continue;
            }

            let selfishness = self
                .weight_calculator
                .get_selfishness_score_for_node(&candidate.creator());
            let better = match &best {
                None => true,
                Some((_, best_weight, best_selfishness)) => {
                    weight.is_greater_than(best_weight)
                        || (weight == *best_weight && selfishness > *best_selfishness)
                }
            };
            if better {
                best = Some((candidate, weight, selfishness));
            }
        }

        best.map(|(candidate, _, _)| candidate)
    }

    /// Pick a parent from a node we have been ignoring, weighted by how
    /// long it has been ignored
    fn choose_pity_parent(&mut self) -> Option<PlatformEvent> {
        let mut ignored = Vec::new();
        let mut total_score = 0u64;

        for candidate in self.sorted_candidates() {
            let selfishness = self
                .weight_calculator
                .get_selfishness_score_for_node(&candidate.creator());
            if selfishness <= 1 {
                continue;
            }

            let weight = self
                .weight_calculator
                .get_theoretical_advancement_weight(&self.tipset_tracker, &self.candidate_parents(&candidate));
            if weight.is_non_zero() {
                total_score += selfishness;
                ignored.push((candidate, selfishness));
            } else {
                debug!(
                    "Ignoring {} though it has selfishness {}, its event {} adds nothing",
                    candidate.creator(),
                    selfishness,
                    candidate.descriptor()
                );
            }
        }

        if ignored.is_empty() {
            return None;
        }

        let mut choice = self.rng.gen_range(0..total_score);
        for (candidate, selfishness) in ignored {
            if choice < selfishness {
                return Some(candidate);
            }
            choice -= selfishness;
        }
        None
    }

    /// Birth round of the next event under the current window
    fn next_birth_round(&self) -> Round {
        match self.ancient_mode {
            AncientMode::BirthRoundThreshold => self.event_window().new_event_birth_round(),
            AncientMode::GenerationThreshold => ROUND_FIRST,
        }
    }

    /// Creation time for the next event. Every transaction of every self
    /// event gets its own nanosecond, so the next event starts at least
    /// one nanosecond per transaction after the self-parent.
    fn next_creation_time(&self) -> DateTime<Utc> {
        let now = self.clock.now();
        match &self.last_self_event {
            None => now,
            Some(self_parent) => {
                let spacing = self_parent.transaction_count().max(1) as i64;
                now.max(self_parent.time_created() + Duration::nanoseconds(spacing))
            }
        }
    }

    /// Assemble, sign and track a self event
    fn build_and_process_event(&mut self, other_parent: Option<&PlatformEvent>) -> Result<Option<PlatformEvent>> {
        let self_parent = self.last_self_event.as_ref().map(|event| *event.descriptor());
        let other_parents: Vec<EventDescriptor> = other_parent.map(|event| *event.descriptor()).into_iter().collect();

        let birth_round = self.next_birth_round();
        let generation = next_generation(self_parent.iter().chain(other_parents.iter()));
        let indicator = match self.ancient_mode {
            AncientMode::GenerationThreshold => generation,
            AncientMode::BirthRoundThreshold => birth_round,
        };
        if self.event_window().is_ancient_indicator(indicator) {
            self.metrics.record_refused_ancient();
            debug!(
                "Not creating event with ancient indicator {}, window is {}",
                indicator,
                self.event_window()
            );
            return Ok(None);
        }

        let time_created = self.next_creation_time();
        let transactions = self.transaction_supplier.get_transactions();
        let unsigned = UnsignedEvent::new(
            self.self_id,
            self_parent,
            other_parents,
            birth_round,
            time_created,
            transactions,
        );
        let signature = self.signer.sign(unsigned.hash());
        let event = PlatformEvent::new(unsigned, signature);

        self.tipset_tracker
            .add_self_event(*event.descriptor(), &event.all_parents());
        let advancement = self.weight_calculator.add_event_and_get_advancement_weight(
            &self.tipset_tracker,
            &self.childless_events,
            event.descriptor(),
        )?;
        self.childless_events
            .register_self_event_parents(event.other_parents());

        let maximum = self.weight_calculator.maximum_possible_advancement_weight();
        let ratio = if maximum == 0 {
            0.0
        } else {
            advancement.advancement_weight as f64 / maximum as f64
        };

        let genesis = self_parent.is_none() && event.other_parents().is_empty();
        self.metrics.record_event_created(genesis, ratio);

        debug!(
            "Created {} with {} transactions, advancement {} ({:.2} of maximum)",
            event.descriptor(),
            event.transaction_count(),
            advancement,
            ratio
        );

        self.last_self_event = Some(event.clone());
        Ok(Some(event))
    }

    /// Whether a replayed self event should replace the current self-parent
    fn is_newer_self_event(&self, event: &PlatformEvent) -> bool {
        match &self.last_self_event {
            None => true,
            // A freshly created event has no nGen yet and always wins
            Some(last) => last.n_gen().is_some_and(|n_gen| Some(n_gen) < event.n_gen()),
        }
    }
}

impl EventCreator for TipsetEventCreator {
    fn register_event(&mut self, event: &PlatformEvent) {
        if self.event_window().is_event_ancient(event) {
            return;
        }

        let creator = event.creator();
        if !self.roster.contains(&creator) {
            warn!("Ignoring event {} from {} which is not in the roster", event.descriptor(), creator);
            return;
        }

        if creator == self.self_id {
            if self.is_newer_self_event(event) {
                self.childless_events
                    .register_self_event_parents(event.other_parents());
                self.tipset_tracker
                    .add_self_event(*event.descriptor(), &event.all_parents());
                debug!("Self-parent is now {}", event);
                self.last_self_event = Some(event.clone());
            }
            return;
        }

        self.tipset_tracker.add_peer_event(event);
        self.childless_events.add_event(event);
    }

    fn set_event_window(&mut self, event_window: EventWindow) {
        self.tipset_tracker.set_event_window(event_window);
        self.childless_events.prune_old_events(&event_window);
    }

    fn maybe_create_event(&mut self) -> Result<Option<PlatformEvent>> {
        if self.roster.len() == 1 {
            // Nobody to wait for, the previous self event is also the other-parent
            let other_parent = self.last_self_event.clone();
            return self.build_and_process_event(other_parent.as_ref());
        }

        let max_selfishness = self.weight_calculator.get_max_selfishness_score();
        self.metrics.set_max_selfishness(max_selfishness);

        let be_nice_chance = max_selfishness.saturating_sub(1) as f64 / self.anti_selfishness_factor;
        if be_nice_chance > 0.0 && self.rng.gen::<f64>() < be_nice_chance {
            if let Some(other_parent) = self.choose_pity_parent() {
                let event = self.build_and_process_event(Some(&other_parent))?;
                if event.is_some() {
                    self.metrics.record_pity_parent(other_parent.creator());
                }
                return Ok(event);
            }
        }

        match self.choose_best_parent() {
            Some(other_parent) => {
                let event = self.build_and_process_event(Some(&other_parent))?;
                if event.is_some() {
                    self.metrics.record_tipset_parent(other_parent.creator());
                }
                Ok(event)
            }
            None if self.last_self_event.is_none() && self.event_window().is_genesis() => {
                self.build_and_process_event(None)
            }
            None => {
                self.metrics.record_refused_no_parent();
                Ok(None)
            }
        }
    }

    fn clear(&mut self) {
        self.tipset_tracker.clear();
        self.childless_events.clear();
        self.weight_calculator.clear();
        self.last_self_event = None;
        info!("Event creator for {} cleared", self.self_id);
    }
}

impl fmt::Display for TipsetEventCreator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Event window: {}", self.event_window())?;
        match &self.last_self_event {
            Some(event) => writeln!(f, "Latest self event: {}", event)?,
            None => writeln!(f, "Latest self event: none")?,
        }
        write!(f, "{}", self.weight_calculator)?;
        write!(f, "{}", self.childless_events)
    }
}
