//! Error types for tipset core operations

use crate::types::{NodeId, Round};
use thiserror::Error;

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors that can occur while building core structures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    // === Roster ===
    /// Roster has no members
    #[error("Roster must contain at least one node")]
    EmptyRoster,

    /// Same node listed twice
    #[error("Duplicate node in roster: {0}")]
    DuplicateNode(NodeId),

    /// Total weight does not fit in 64 bits
    #[error("Total roster weight overflows u64")]
    WeightOverflow,

    // === Event window ===
    /// Birth round for new events precedes the first round
    #[error("New event birth round {0} is below the first round")]
    InvalidBirthRound(Round),

    /// Ancient threshold below the first indicator for the mode
    #[error("Ancient threshold {threshold} is below the minimum {minimum}")]
    InvalidAncientThreshold { threshold: u64, minimum: u64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CoreError::DuplicateNode(NodeId::new(4));
        assert!(format!("{}", err).contains("node-4"));

        let err = CoreError::InvalidAncientThreshold {
            threshold: 0,
            minimum: 1,
        };
        assert!(format!("{}", err).contains("below the minimum 1"));
    }
}
