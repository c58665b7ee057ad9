//! Platform and event creation status

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of the platform, reported by the embedding node
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlatformStatus {
    #[default]
    StartingUp,
    ReplayingEvents,
    Observing,
    /// Caught up and checking that own events reach consensus
    Checking,
    Active,
    /// Fallen behind peers, waiting for a reconnect
    Behind,
    /// Freeze round reached, draining pending transactions
    Freezing,
    FreezeComplete,
    ReconnectComplete,
    CatastrophicFailure,
}

/// What the event creation manager did on its latest attempt
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventCreationStatus {
    #[default]
    Idle,
    AttemptingCreation,
    /// An event was just created, the rate limit applies
    RateLimited,
    NoEligibleParents,
    PlatformStatusPreventsCreation,
    /// The node has been unhealthy for too long
    Overloaded,
}

impl EventCreationStatus {
    /// Metric label value
    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::AttemptingCreation => "attempting_creation",
            Self::RateLimited => "rate_limited",
            Self::NoEligibleParents => "no_eligible_parents",
            Self::PlatformStatusPreventsCreation => "platform_status_prevents_creation",
            Self::Overloaded => "overloaded",
        }
    }
}

impl fmt::Display for EventCreationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::AttemptingCreation => "attempting creation",
            Self::RateLimited => "rate limited",
            Self::NoEligibleParents => "no eligible parents",
            Self::PlatformStatusPreventsCreation => "platform status prevents creation",
            Self::Overloaded => "overloaded",
        };
        write!(f, "{}", name)
    }
}
