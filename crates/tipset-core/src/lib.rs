//! # Tipset Core
//!
//! Shared data model for tipset-based event creation.
//!
//! This crate provides the building blocks every other crate speaks:
//! - `NodeId`, `EventHash`, `Transaction` - identifiers and payloads
//! - `Roster` - participants and their consensus weight
//! - `EventDescriptor` / `PlatformEvent` - events in the hashgraph
//! - `EventWindow` - which events are ancient
//! - `WallClock` - injectable time source
//!
//! ## Architecture
//!
//! ```text
//!   ┌────────────┐    ┌────────────────┐    ┌─────────────┐
//!   │   Roster   │    │ PlatformEvent  │    │ EventWindow │
//!   │ (weights)  │    │  descriptor ───┼───►│ is_ancient  │
//!   └────────────┘    └────────────────┘    └─────────────┘
//! ```

pub mod clock;
pub mod error;
pub mod event;
pub mod roster;
pub mod types;
pub mod window;

pub use clock::*;
pub use error::*;
pub use event::*;
pub use roster::*;
pub use types::*;
pub use window::*;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::clock::{ManualClock, SystemClock, WallClock};
    pub use crate::error::{CoreError, Result};
    pub use crate::event::{EventDescriptor, PlatformEvent, UnsignedEvent};
    pub use crate::roster::{Roster, RosterEntry, Threshold};
    pub use crate::types::*;
    pub use crate::window::{AncientMode, EventWindow};
}
