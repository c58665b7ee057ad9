//! # Tipset Node
//!
//! Node-side plumbing around the tipset event creator: configuration,
//! logging, the rules that gate creation, the future event buffer and a
//! tokio service that drives creation on a timer.
//!
//! ```text
//!   NodeConfig ──► EventCreationManager ──► EventCreationService
//!                    ├─ AggregateEventCreationRules
//!                    ├─ FutureEventBuffer
//!                    ├─ TransactionPool
//!                    ├─ EventCreationMetrics ─┐
//!                    └─ TipsetEventCreator ───┴─► prometheus Registry
//! ```

pub mod config;
pub mod future_buffer;
pub mod logging;
pub mod manager;
pub mod metrics;
pub mod pool;
pub mod rules;
pub mod service;
pub mod status;

#[cfg(test)]
mod test_utils;

pub use config::{LogFormat, LoggingConfig, NodeConfig, NodeSettings};
pub use future_buffer::FutureEventBuffer;
pub use logging::init_logging;
pub use manager::EventCreationManager;
pub use metrics::{encode_text, EventCreationMetrics};
pub use pool::{PoolSupplier, TransactionPool};
pub use service::{CreationCommand, EventCreationService, ServiceError, ServiceHandle};
pub use status::{EventCreationStatus, PlatformStatus};
