//! Prometheus metrics of the event creation manager
//!
//! The manager shares one [`Registry`] with its creator, so a single
//! gather covers both.
//!
//! ```text
//!   tipset_creation_status_total{status}   counter, one per status change
//!   tipset_future_buffered_events          gauge, events held for later rounds
//! ```

use crate::status::EventCreationStatus;
use prometheus::{Encoder, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

/// Metrics updated by the manager and its future buffer
#[derive(Clone)]
pub struct EventCreationMetrics {
    statuses: IntCounterVec,
    buffered_events: IntGauge,
}

impl EventCreationMetrics {
    /// Create the metrics and register them in `registry`
    pub fn new(registry: &Registry) -> prometheus::Result<Self> {
        let statuses = IntCounterVec::new(
            Opts::new("tipset_creation_status_total", "Statuses reached by creation attempts"),
            &["status"],
        )?;
        let buffered_events = IntGauge::new(
            "tipset_future_buffered_events",
            "Events buffered until their birth round is reached",
        )?;

        registry.register(Box::new(statuses.clone()))?;
        registry.register(Box::new(buffered_events.clone()))?;

        Ok(Self {
            statuses,
            buffered_events,
        })
    }

    pub fn record_status(&self, status: EventCreationStatus) {
        self.statuses.with_label_values(&[status.label()]).inc();
    }

    /// Times `status` has been reached
    pub fn status_count(&self, status: EventCreationStatus) -> u64 {
        self.statuses.with_label_values(&[status.label()]).get()
    }

    /// Gauge handed to the future buffer
    pub fn buffered_events(&self) -> IntGauge {
        self.buffered_events.clone()
    }
}

/// Render every metric in `registry` in the Prometheus text format
pub fn encode_text(registry: &Registry) -> anyhow::Result<String> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&registry.gather(), &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}
