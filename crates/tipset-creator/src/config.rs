//! Event creation configuration
//!
//! Deserialised from the `[event_creation]` table of the node configuration.
//! Every field has a default so partial tables are valid.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tunables for event creation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventCreationConfig {
    /// Maximum events created per second, 0 disables the limit
    pub max_creation_rate: f64,

    /// How often the creation loop attempts to create an event, per second
    pub creation_attempt_rate: f64,

    /// Larger values make the creator less eager to pick ignored nodes as parents
    pub anti_selfishness_factor: f64,

    /// Creation is paused once the node has been unhealthy for longer than this
    pub maximum_permissible_unhealthy_duration_ms: u64,

    /// Upper bound on transaction bytes embedded in one event
    pub max_transaction_bytes_per_event: usize,

    /// Seed for parent shuffling and pity parent selection
    pub rng_seed: u64,
}

impl Default for EventCreationConfig {
    fn default() -> Self {
        Self {
            max_creation_rate: 20.0,
            creation_attempt_rate: 100.0,
            anti_selfishness_factor: 10.0,
            maximum_permissible_unhealthy_duration_ms: 1_000,
            max_transaction_bytes_per_event: 245_760,
            rng_seed: 0,
        }
    }
}

impl EventCreationConfig {
    /// Anti-selfishness factor clamped to at least 1
    pub fn effective_anti_selfishness_factor(&self) -> f64 {
        self.anti_selfishness_factor.max(1.0)
    }

    pub fn maximum_permissible_unhealthy_duration(&self) -> Duration {
        Duration::from_millis(self.maximum_permissible_unhealthy_duration_ms)
    }

    /// Interval between creation attempts, `None` if attempts are disabled
    pub fn creation_attempt_interval(&self) -> Option<Duration> {
        if self.creation_attempt_rate > 0.0 && self.creation_attempt_rate.is_finite() {
            Some(Duration::from_secs_f64(1.0 / self.creation_attempt_rate))
        } else {
            None
        }
    }
}
