//! Event creation manager
//!
//! Wraps an [`EventCreator`] with the rules that gate creation and the
//! future event buffer that holds back events from rounds not reached yet.
//!
//! ```text
//!   register_event ──► FutureEventBuffer ──► EventCreator
//!   set_event_window ─────────┴── releases ──┘
//!
//!   maybe_create_event ──► rules permit? ──► EventCreator::maybe_create_event
//! ```
//!
//! Every status an attempt reaches is counted in the manager's registry,
//! which [`EventCreationManager::for_node`] shares with the creator.

use crate::config::NodeConfig;
use crate::future_buffer::FutureEventBuffer;
use crate::metrics::EventCreationMetrics;
use crate::pool::TransactionPool;
use crate::rules::{
    AggregateEventCreationRules, EventCreationRule, MaximumRateRule, PlatformHealthRule, PlatformStatusRule,
    RuleContext,
};
use crate::status::{EventCreationStatus, PlatformStatus};
use prometheus::Registry;
use std::sync::Arc;
use std::time::Duration;
use tipset_core::{AncientMode, EventWindow, PlatformEvent, Roster, WallClock};
use tipset_creator::{EventCreationConfig, EventCreator, TipsetEventCreator};
use tipset_crypto::HashSigner;
use tracing::{debug, info, warn};

/// Gates an event creator behind the creation rules
pub struct EventCreationManager {
    creator: Box<dyn EventCreator>,
    rules: AggregateEventCreationRules,
    future_buffer: FutureEventBuffer,
    pool: TransactionPool,

    platform_status: PlatformStatus,
    unhealthy_duration: Duration,

    /// Outcome of the latest creation attempt
    status: EventCreationStatus,

    registry: Registry,
    metrics: EventCreationMetrics,
}

impl EventCreationManager {
    /// Manager with the standard rate, status and health rules
    pub fn new(
        config: &EventCreationConfig,
        creator: Box<dyn EventCreator>,
        pool: TransactionPool,
        clock: Arc<dyn WallClock>,
        ancient_mode: AncientMode,
        registry: Registry,
    ) -> tipset_creator::Result<Self> {
        let rules: Vec<Box<dyn EventCreationRule>> = vec![
            Box::new(MaximumRateRule::new(config.max_creation_rate, clock)),
            Box::new(PlatformStatusRule),
            Box::new(PlatformHealthRule::new(config.maximum_permissible_unhealthy_duration())),
        ];
        Self::with_rules(creator, AggregateEventCreationRules::new(rules), pool, ancient_mode, registry)
    }

    /// Manager with custom rules, registering its metrics in `registry`
    pub fn with_rules(
        creator: Box<dyn EventCreator>,
        rules: AggregateEventCreationRules,
        pool: TransactionPool,
        ancient_mode: AncientMode,
        registry: Registry,
    ) -> tipset_creator::Result<Self> {
        let metrics = EventCreationMetrics::new(&registry)?;
        Ok(Self {
            creator,
            rules,
            future_buffer: FutureEventBuffer::new(ancient_mode, metrics.buffered_events()),
            pool,
            platform_status: PlatformStatus::default(),
            unhealthy_duration: Duration::ZERO,
            status: EventCreationStatus::Idle,
            registry,
            metrics,
        })
    }

    /// Build the tipset creator and its manager for a node
    pub fn for_node(
        config: &NodeConfig,
        roster: Arc<Roster>,
        signer: Arc<dyn HashSigner>,
        clock: Arc<dyn WallClock>,
        pool: TransactionPool,
    ) -> tipset_creator::Result<Self> {
        let supplier = pool.supplier(config.event_creation.max_transaction_bytes_per_event);
        let registry = Registry::new();
        let creator = TipsetEventCreator::with_registry(
            &config.event_creation,
            config.node.self_id,
            roster,
            config.node.ancient_mode,
            clock.clone(),
            signer,
            Arc::new(supplier),
            registry.clone(),
        )?;

        info!("Event creation manager ready for {}", config.node.name);
        Self::new(
            &config.event_creation,
            Box::new(creator),
            pool,
            clock,
            config.node.ancient_mode,
            registry,
        )
    }

    fn set_status(&mut self, status: EventCreationStatus) {
        self.status = status;
        self.metrics.record_status(status);
    }

    fn rule_context(&self) -> RuleContext {
        RuleContext {
            platform_status: self.platform_status,
            unhealthy_duration: self.unhealthy_duration,
            has_buffered_transactions: self.pool.has_buffered_transactions(),
        }
    }

    /// Create an event if the rules permit it and the creator has parents
    pub fn maybe_create_event(&mut self) -> tipset_creator::Result<Option<PlatformEvent>> {
        if let Some(status) = self.rules.blocking_status(&self.rule_context()) {
            self.set_status(status);
            return Ok(None);
        }

        self.set_status(EventCreationStatus::AttemptingCreation);
        match self.creator.maybe_create_event()? {
            Some(event) => {
                self.rules.event_was_created();
                self.set_status(EventCreationStatus::RateLimited);
                Ok(Some(event))
            }
            None => {
                self.set_status(EventCreationStatus::NoEligibleParents);
                Ok(None)
            }
        }
    }

    /// Pass an event to the creator, unless it belongs to a future round
    pub fn register_event(&mut self, event: PlatformEvent) {
        if let Some(event) = self.future_buffer.add_event(event) {
            self.creator.register_event(&event);
        }
    }

    pub fn set_event_window(&mut self, event_window: EventWindow) {
        self.creator.set_event_window(event_window);
        for event in self.future_buffer.update_event_window(event_window) {
            self.creator.register_event(&event);
        }
    }

    pub fn clear(&mut self) {
        self.creator.clear();
        self.future_buffer.clear();
        self.status = EventCreationStatus::Idle;
        debug!("Event creation manager cleared");
    }

    pub fn update_platform_status(&mut self, platform_status: PlatformStatus) {
        if platform_status != self.platform_status {
            info!("Platform status {:?} -> {:?}", self.platform_status, platform_status);
        }
        self.platform_status = platform_status;
    }

    pub fn report_unhealthy_duration(&mut self, duration: Duration) {
        if duration > Duration::ZERO && self.unhealthy_duration == Duration::ZERO {
            warn!("Node reported unhealthy");
        }
        self.unhealthy_duration = duration;
    }

    pub fn status(&self) -> EventCreationStatus {
        self.status
    }

    pub fn platform_status(&self) -> PlatformStatus {
        self.platform_status
    }

    /// Events held back for future rounds
    pub fn buffered_event_count(&self) -> usize {
        self.future_buffer.len()
    }

    pub fn pool(&self) -> &TransactionPool {
        &self.pool
    }

    /// Registry holding the manager's metrics, and the creator's when
    /// built with [`for_node`](Self::for_node)
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Times a creation attempt reached `status`
    pub fn status_count(&self, status: EventCreationStatus) -> u64 {
        self.metrics.status_count(status)
    }
}
