//! Foundation types shared across the replication core.
//!
//! `cg-core` has no knowledge of storage, transports, or constraints — it
//! only defines the causal clock, identifiers, and wire envelopes that the
//! rest of the workspace builds on.
//!
//! ```
//! use cg_core::clock::TreeClock;
//!
//! let genesis = TreeClock::genesis();
//! let ticked = genesis.tick();
//! assert_eq!(ticked.ticks(), 1);
//! ```

#![forbid(unsafe_code)]

pub mod clock;
pub mod error;
pub mod ids;
pub mod wire;

pub use clock::{AnyLtMode, Side, TreeClock};
pub use error::{CoreError, Result};
pub use ids::{CloneId, Tid, TripleId};
pub use wire::{DeltaMessage, Envelope, ReifiedDelete, WIRE_VERSION};
