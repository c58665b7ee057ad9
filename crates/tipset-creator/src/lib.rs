//! # Tipset Event Creator
//!
//! Decides when a node creates its own events and which parents they get.
//!
//! Every event's tipset records the highest generation it can reach from
//! each creator. A self event is only worth creating if its tipset advances
//! past a snapshot for enough of the network's weight; once a supermajority
//! has been reached the snapshot moves forward.
//!
//! ## Components
//!
//! ```text
//!   PlatformEvent ─► TipsetTracker ────────┐
//!                └─► ChildlessEventTracker ┤
//!                                          ▼
//!                          TipsetWeightCalculator
//!                                          │
//!                                          ▼
//!                          TipsetEventCreator ─► signed self event
//! ```
//!
//! - `Tipset` / `TipsetAdvancementWeight` - the value types
//! - `TipsetTracker` - tipset of every non-ancient event
//! - `ChildlessEventTracker` - candidate other-parents
//! - `TipsetWeightCalculator` - advancement and selfishness bookkeeping
//! - `TipsetEventCreator` - the `EventCreator` tying them together
//! - `TipsetMetrics` - prometheus counters and gauges of the creator

pub mod advancement;
pub mod childless;
pub mod config;
pub mod creator;
pub mod error;
pub mod metrics;
pub mod supplier;
pub mod tipset;
pub mod tracker;
pub mod weight;

#[cfg(test)]
mod test_utils;

pub use advancement::*;
pub use childless::*;
pub use config::*;
pub use creator::*;
pub use error::*;
pub use metrics::*;
pub use supplier::*;
pub use tipset::*;
pub use tracker::*;
pub use weight::*;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::advancement::TipsetAdvancementWeight;
    pub use crate::config::EventCreationConfig;
    pub use crate::creator::{EventCreator, TipsetEventCreator};
    pub use crate::error::{CreatorError, Result};
    pub use crate::metrics::{CreationStats, TipsetMetrics};
    pub use crate::supplier::{NoTransactions, TransactionSupplier};
    pub use crate::tipset::Tipset;
}
