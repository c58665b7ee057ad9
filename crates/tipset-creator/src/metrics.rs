//! Prometheus metrics for the tipset event creator
//!
//! Every creator registers its metrics into one [`Registry`]. Nodes pass
//! in a registry they share with the rest of the node; simulations give
//! each creator its own.
//!
//! ```text
//!   tipset_events_created_total        counter
//!   tipset_genesis_events_total        counter
//!   tipset_refused_no_parent_total     counter
//!   tipset_refused_ancient_total       counter
//!   tipset_parent_total{node}          counter, best-parent picks per creator
//!   tipset_pity_parent_total{node}     counter, pity-parent picks per creator
//!   tipset_max_selfishness             gauge
//!   tipset_advancement_ratio           gauge
//! ```

use crate::error::Result;
use prometheus::{Gauge, IntCounter, IntCounterVec, IntGauge, Opts, Registry};
use serde::Serialize;
use tipset_core::{NodeId, Roster};

const NODE_LABEL: &str = "node";

fn node_label(node_id: NodeId) -> String {
    node_id.id().to_string()
}

/// Metrics updated by the event creator
#[derive(Clone)]
pub struct TipsetMetrics {
    registry: Registry,

    events_created: IntCounter,
    genesis_events: IntCounter,
    refused_no_parent: IntCounter,
    refused_ancient: IntCounter,

    /// Keyed by the creator of the chosen other-parent
    tipset_parents: IntCounterVec,
    pity_parents: IntCounterVec,

    max_selfishness: IntGauge,
    /// Advancement of the latest self event over the maximum possible
    advancement_ratio: Gauge,
}

impl TipsetMetrics {
    /// Create the metrics and register them in `registry`
    pub fn new(registry: Registry) -> Result<Self> {
        let metrics = Self {
            events_created: IntCounter::new("tipset_events_created_total", "Self events created")?,
            genesis_events: IntCounter::new("tipset_genesis_events_total", "Parentless self events created")?,
            refused_no_parent: IntCounter::new(
                "tipset_refused_no_parent_total",
                "Creation attempts without a parent that advances the hashgraph",
            )?,
            refused_ancient: IntCounter::new(
                "tipset_refused_ancient_total",
                "Creation attempts whose event would have been ancient",
            )?,
            tipset_parents: IntCounterVec::new(
                Opts::new("tipset_parent_total", "Other-parents chosen by advancement weight"),
                &[NODE_LABEL],
            )?,
            pity_parents: IntCounterVec::new(
                Opts::new("tipset_pity_parent_total", "Other-parents chosen to reduce selfishness"),
                &[NODE_LABEL],
            )?,
            max_selfishness: IntGauge::new("tipset_max_selfishness", "Highest selfishness score")?,
            advancement_ratio: Gauge::new(
                "tipset_advancement_ratio",
                "Advancement of the latest self event over the maximum possible",
            )?,
            registry,
        };

        metrics.registry.register(Box::new(metrics.events_created.clone()))?;
        metrics.registry.register(Box::new(metrics.genesis_events.clone()))?;
        metrics.registry.register(Box::new(metrics.refused_no_parent.clone()))?;
        metrics.registry.register(Box::new(metrics.refused_ancient.clone()))?;
        metrics.registry.register(Box::new(metrics.tipset_parents.clone()))?;
        metrics.registry.register(Box::new(metrics.pity_parents.clone()))?;
        metrics.registry.register(Box::new(metrics.max_selfishness.clone()))?;
        metrics.registry.register(Box::new(metrics.advancement_ratio.clone()))?;

        Ok(metrics)
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_event_created(&self, genesis: bool, advancement_ratio: f64) {
        self.events_created.inc();
        if genesis {
            self.genesis_events.inc();
        }
        self.advancement_ratio.set(advancement_ratio);
    }

    pub fn record_refused_no_parent(&self) {
        self.refused_no_parent.inc();
    }

    pub fn record_refused_ancient(&self) {
        self.refused_ancient.inc();
    }

    pub fn record_tipset_parent(&self, creator: NodeId) {
        self.tipset_parents
            .with_label_values(&[node_label(creator).as_str()])
            .inc();
    }

    pub fn record_pity_parent(&self, creator: NodeId) {
        self.pity_parents
            .with_label_values(&[node_label(creator).as_str()])
            .inc();
    }

    pub fn set_max_selfishness(&self, score: u64) {
        self.max_selfishness
            .set(i64::try_from(score).unwrap_or(i64::MAX));
    }

    /// Times an event by `creator` was picked as best other-parent
    pub fn tipset_parent_count(&self, creator: NodeId) -> u64 {
        self.tipset_parents
            .with_label_values(&[node_label(creator).as_str()])
            .get()
    }

    /// Times an event by `creator` was picked as pity other-parent
    pub fn pity_parent_count(&self, creator: NodeId) -> u64 {
        self.pity_parents
            .with_label_values(&[node_label(creator).as_str()])
            .get()
    }

    /// Current values, summed over the roster for per-node counters
    pub fn snapshot(&self, roster: &Roster) -> CreationStats {
        CreationStats {
            events_created: self.events_created.get(),
            genesis_events: self.genesis_events.get(),
            pity_parents_used: roster.node_ids().map(|id| self.pity_parent_count(id)).sum(),
            refused_no_parent: self.refused_no_parent.get(),
            refused_ancient: self.refused_ancient.get(),
            last_advancement_ratio: self.advancement_ratio.get(),
            max_selfishness: self.max_selfishness.get().max(0) as u64,
        }
    }
}

/// Point-in-time view of [`TipsetMetrics`], for reports
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct CreationStats {
    pub events_created: u64,
    pub genesis_events: u64,
    pub pity_parents_used: u64,
    pub refused_no_parent: u64,
    pub refused_ancient: u64,
    pub last_advancement_ratio: f64,
    pub max_selfishness: u64,
}
