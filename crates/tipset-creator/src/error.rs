//! Error types for event creation

use thiserror::Error;
use tipset_core::{CoreError, EventDescriptor, NodeId};

/// Result type alias for event creation operations
pub type Result<T> = std::result::Result<T, CreatorError>;

/// Errors raised by the event creator.
///
/// Refusing to create an event is not an error; those paths return
/// `Ok(None)`. Errors here mean a caller broke a contract.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CreatorError {
    /// Self event was never added to the tipset tracker
    #[error("No tipset tracked for self event {0}")]
    UntrackedEvent(EventDescriptor),

    /// The local node is not part of the roster
    #[error("Self node {0} is not in the roster")]
    SelfNotInRoster(NodeId),

    /// Invalid core structure
    #[error("Core error: {0}")]
    Core(#[from] CoreError),

    /// Metric could not be created or registered
    #[error("Metrics error: {0}")]
    Metrics(String),
}

impl From<prometheus::Error> for CreatorError {
    fn from(err: prometheus::Error) -> Self {
        Self::Metrics(err.to_string())
    }
}
