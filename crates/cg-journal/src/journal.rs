//! Append-only, hash-chained transaction log.
//!
//! Each entry's hash covers the previous entry's hash and the entry's own
//! canonical payload bytes, so the sequence can't be reordered or spliced
//! without the break being detectable by recomputing the chain.

use crate::error::{JournalError, Result};
use cg_core::TreeClock;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One journal entry: a clock time, the canonical delta bytes that produced
/// it, and the running hash-chain digest.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JournalEntry {
    pub ticks: u64,
    pub time: TreeClock,
    pub payload: Vec<u8>,
    pub hash: [u8; 32],
    pub prev_hash: Option<[u8; 32]>,
}

impl JournalEntry {
    fn compute_hash(prev_hash: Option<[u8; 32]>, payload: &[u8]) -> [u8; 32] {
        let mut hasher = blake3::Hasher::new();
        if let Some(prev) = prev_hash {
            hasher.update(&prev);
        }
        hasher.update(payload);
        *hasher.finalize().as_bytes()
    }
}

/// An append-only sequence of [`JournalEntry`] values, indexed by tick count
/// of the local identity leaf at append time.
#[derive(Debug, Default)]
pub struct Journal {
    entries: Vec<JournalEntry>,
}

impl Journal {
    /// An empty journal, ready for the first entry.
    pub fn initialize() -> Self {
        Journal { entries: Vec::new() }
    }

    /// Append a new entry recording `time` and its canonical `payload`
    /// bytes, chaining its hash onto the previous entry (if any).
    pub fn append(&mut self, ticks: u64, time: TreeClock, payload: Vec<u8>) -> &JournalEntry {
        let prev_hash = self.entries.last().map(|e| e.hash);
        let hash = JournalEntry::compute_hash(prev_hash, &payload);
        let entry = JournalEntry {
            ticks,
            time,
            payload,
            hash,
            prev_hash,
        };
        debug!(ticks, hash = %hex::encode(hash), "journal entry appended");
        self.entries.push(entry);
        self.entries.last().expect("just pushed")
    }

    /// Look up the entry recorded at exactly `ticks`.
    pub fn find_entry_by_ticks(&self, ticks: u64) -> Option<&JournalEntry> {
        // entries are appended in increasing tick order, so this could
        // binary search; a linear scan is fine until real persistence backs
        // this with something that needs one.
        self.entries.iter().find(|e| e.ticks == ticks)
    }

    /// A restartable iterator over every entry strictly after `ticks`, in
    /// append order, lazily enumerable from wherever a caller resumes.
    pub fn entries_from(&self, ticks: u64) -> impl Iterator<Item = &JournalEntry> {
        self.entries.iter().filter(move |e| e.ticks > ticks)
    }

    /// The most recent entry, if any have been appended.
    pub fn latest(&self) -> Option<&JournalEntry> {
        self.entries.last()
    }

    /// Recompute the chain from scratch and confirm every stored hash
    /// matches, surfacing the first mismatch found.
    pub fn verify(&self) -> Result<()> {
        let mut prev_hash = None;
        for entry in &self.entries {
            let expected = JournalEntry::compute_hash(prev_hash, &entry.payload);
            if expected != entry.hash {
                return Err(JournalError::HashChainBroken {
                    ticks: entry.ticks,
                    expected: hex::encode(expected),
                    found: hex::encode(entry.hash),
                });
            }
            prev_hash = Some(entry.hash);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cg_core::TreeClock;

    #[test]
    fn append_chains_hashes() {
        let mut j = Journal::initialize();
        let t = TreeClock::genesis().tick();
        j.append(1, t.clone(), b"delta-1".to_vec());
        j.append(2, t.tick(), b"delta-2".to_vec());
        assert!(j.verify().is_ok());
        assert_eq!(j.entries_from(0).count(), 2);
        assert_eq!(j.entries_from(1).count(), 1);
    }

    #[test]
    fn find_entry_by_ticks_locates_exact_match() {
        let mut j = Journal::initialize();
        let t = TreeClock::genesis().tick();
        j.append(5, t, b"payload".to_vec());
        assert!(j.find_entry_by_ticks(5).is_some());
        assert!(j.find_entry_by_ticks(6).is_none());
    }

    #[test]
    fn tampering_with_an_entry_breaks_verification() {
        let mut j = Journal::initialize();
        let t = TreeClock::genesis().tick();
        j.append(1, t.clone(), b"a".to_vec());
        j.append(2, t.tick(), b"b".to_vec());
        j.entries[0].payload = b"tampered".to_vec();
        assert!(j.verify().is_err());
    }
}
