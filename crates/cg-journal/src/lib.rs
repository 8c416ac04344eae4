//! Append-only journal and TID index backing the replication core's
//! dedup and causal-resume machinery.

#![forbid(unsafe_code)]

pub mod error;
pub mod journal;
pub mod tid_index;

pub use error::JournalError;
pub use journal::{Journal, JournalEntry};
pub use tid_index::TidIndex;
