//! The SU-SET transactional dataset: the CRDT algorithm that makes local
//! writes and remote deltas commute, over pluggable graph and key/value
//! storage.

#![forbid(unsafe_code)]

pub mod dataset;
pub mod error;
pub mod graph_store;
pub mod kv_store;
pub mod patch;
pub mod snapshot;

pub use dataset::{ApplyOutcome, SuSetDataset};
pub use error::DatasetError;
pub use graph_store::{GraphStore, MemoryGraphStore};
pub use kv_store::{KvStore, MemoryKv};
pub use patch::{MeldUpdate, Patch};
pub use snapshot::Snapshot;
