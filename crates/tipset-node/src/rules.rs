//! Event creation rules
//!
//! Every rule must permit creation before the manager asks the creator for
//! an event. The first rule that refuses decides the reported status.

use crate::status::{EventCreationStatus, PlatformStatus};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tipset_core::WallClock;
use tracing::trace;

/// Node state the rules are evaluated against
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RuleContext {
    pub platform_status: PlatformStatus,
    /// How long the node has been reporting itself unhealthy
    pub unhealthy_duration: Duration,
    pub has_buffered_transactions: bool,
}

/// A condition on event creation
pub trait EventCreationRule: Send {
    fn is_event_creation_permitted(&self, context: &RuleContext) -> bool;

    /// Called after every successful creation
    fn event_was_created(&mut self) {}

    /// Status to report while this rule refuses
    fn event_creation_status(&self) -> EventCreationStatus;
}

// ============================================================================
// Maximum rate
// ============================================================================

/// Limits creation to a maximum number of events per second
pub struct MaximumRateRule {
    /// `None` disables the limit
    minimum_period: Option<chrono::Duration>,
    clock: Arc<dyn WallClock>,
    last_event_time: Option<DateTime<Utc>>,
}

impl MaximumRateRule {
    pub fn new(max_creation_rate: f64, clock: Arc<dyn WallClock>) -> Self {
        let minimum_period = (max_creation_rate > 0.0 && max_creation_rate.is_finite())
            .then(|| chrono::Duration::nanoseconds((1_000_000_000.0 / max_creation_rate) as i64));
        Self {
            minimum_period,
            clock,
            last_event_time: None,
        }
    }
}

impl EventCreationRule for MaximumRateRule {
    fn is_event_creation_permitted(&self, _context: &RuleContext) -> bool {
        match (self.minimum_period, self.last_event_time) {
            (Some(period), Some(last)) => self.clock.now() - last >= period,
            _ => true,
        }
    }

    fn event_was_created(&mut self) {
        self.last_event_time = Some(self.clock.now());
    }

    fn event_creation_status(&self) -> EventCreationStatus {
        EventCreationStatus::RateLimited
    }
}

// ============================================================================
// Platform status
// ============================================================================

/// Permits creation only while the platform status allows it
#[derive(Clone, Copy, Debug, Default)]
pub struct PlatformStatusRule;

impl EventCreationRule for PlatformStatusRule {
    fn is_event_creation_permitted(&self, context: &RuleContext) -> bool {
        match context.platform_status {
            PlatformStatus::Active | PlatformStatus::Checking => true,
            // Keep creating until every pending transaction made it into an event
            PlatformStatus::Freezing => context.has_buffered_transactions,
            _ => false,
        }
    }

    fn event_creation_status(&self) -> EventCreationStatus {
        EventCreationStatus::PlatformStatusPreventsCreation
    }
}

// ============================================================================
// Platform health
// ============================================================================

/// Stops creation once the node has been unhealthy for too long
#[derive(Clone, Copy, Debug)]
pub struct PlatformHealthRule {
    maximum_permissible_unhealthy_duration: Duration,
}

impl PlatformHealthRule {
    pub fn new(maximum_permissible_unhealthy_duration: Duration) -> Self {
        Self {
            maximum_permissible_unhealthy_duration,
        }
    }
}

impl EventCreationRule for PlatformHealthRule {
    fn is_event_creation_permitted(&self, context: &RuleContext) -> bool {
        context.unhealthy_duration <= self.maximum_permissible_unhealthy_duration
    }

    fn event_creation_status(&self) -> EventCreationStatus {
        EventCreationStatus::Overloaded
    }
}

// ============================================================================
// Aggregate
// ============================================================================

/// All rules combined
#[derive(Default)]
pub struct AggregateEventCreationRules {
    rules: Vec<Box<dyn EventCreationRule>>,
}

impl AggregateEventCreationRules {
    pub fn new(rules: Vec<Box<dyn EventCreationRule>>) -> Self {
        Self { rules }
    }

    /// Status of the first refusing rule, `None` if creation is permitted
    pub fn blocking_status(&self, context: &RuleContext) -> Option<EventCreationStatus> {
        let status = self
            .rules
            .iter()
            .find(|rule| !rule.is_event_creation_permitted(context))
            .map(|rule| rule.event_creation_status());
        if let Some(status) = status {
            trace!("Event creation refused: {}", status);
        }
        status
    }

    pub fn event_was_created(&mut self) {
        self.rules
            .iter_mut()
            .for_each(|rule| rule.event_was_created());
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
