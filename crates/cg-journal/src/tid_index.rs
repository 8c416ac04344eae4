//! TID index: which transactions contributed each live triple, and the
//! global set of every TID ever applied (for redelivery dedup).

use cg_core::{Tid, TripleId};
use std::collections::{HashMap, HashSet};

/// Tracks, per triple, the set of TIDs that asserted it, and globally, every
/// TID this clone has ever applied — including ones whose triple has since
/// been fully retracted.
#[derive(Debug, Default)]
pub struct TidIndex {
    by_triple: HashMap<TripleId, HashSet<Tid>>,
    all_tids: HashSet<Tid>,
}

impl TidIndex {
    pub fn new() -> Self {
        TidIndex::default()
    }

    /// Record that `tid` asserted `triple`.
    pub fn add_triple(&mut self, triple: TripleId, tid: Tid) {
        self.by_triple.entry(triple).or_default().insert(tid);
        self.all_tids.insert(tid);
    }

    /// Remove the given `tids` from `triple`'s contributor set. Returns
    /// `true` if the triple now has no remaining contributors (it should be
    /// deleted from the dataset).
    pub fn remove_tids(&mut self, triple: TripleId, tids: &[Tid]) -> bool {
        let Some(contributors) = self.by_triple.get_mut(&triple) else {
            return true;
        };
        for tid in tids {
            contributors.remove(tid);
        }
        let now_empty = contributors.is_empty();
        if now_empty {
            self.by_triple.remove(&triple);
        }
        now_empty
    }

    /// Whether `tid` has ever been applied by this clone, regardless of
    /// whether the triple(s) it contributed to are still live.
    pub fn knows_tid(&self, tid: Tid) -> bool {
        self.all_tids.contains(&tid)
    }

    /// Record `tid` as seen without attributing it to any triple — used
    /// when a delta is entirely a delete whose triples are already gone.
    pub fn record_tid(&mut self, tid: Tid) {
        self.all_tids.insert(tid);
    }

    /// Current contributors of `triple`, if it is still live.
    pub fn contributors(&self, triple: TripleId) -> Option<&HashSet<Tid>> {
        self.by_triple.get(&triple)
    }

    /// Dump the full index for snapshotting: per-triple contributors, and
    /// every TID ever seen (including ones whose triple is now fully gone).
    pub fn dump(&self) -> (Vec<(TripleId, Vec<Tid>)>, Vec<Tid>) {
        let contributors = self
            .by_triple
            .iter()
            .map(|(triple, tids)| (*triple, tids.iter().copied().collect()))
            .collect();
        let all_tids = self.all_tids.iter().copied().collect();
        (contributors, all_tids)
    }

    /// Rebuild an index from a prior [`TidIndex::dump`].
    pub fn restore(contributors: Vec<(TripleId, Vec<Tid>)>, all_tids: Vec<Tid>) -> Self {
        TidIndex {
            by_triple: contributors
                .into_iter()
                .map(|(triple, tids)| (triple, tids.into_iter().collect()))
                .collect(),
            all_tids: all_tids.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn triple_survives_while_any_contributor_remains() {
        let mut idx = TidIndex::new();
        let t = TripleId::compute("s", "p", "o");
        let tid_a = Tid::new();
        let tid_b = Tid::new();
        idx.add_triple(t, tid_a);
        idx.add_triple(t, tid_b);

        assert!(!idx.remove_tids(t, &[tid_a]));
        assert!(idx.contributors(t).is_some());
        assert!(idx.remove_tids(t, &[tid_b]));
        assert!(idx.contributors(t).is_none());
    }

    #[test]
    fn known_tids_persist_after_triple_removal() {
        let mut idx = TidIndex::new();
        let t = TripleId::compute("s", "p", "o");
        let tid = Tid::new();
        idx.add_triple(t, tid);
        idx.remove_tids(t, &[tid]);
        assert!(idx.knows_tid(tid));
    }

    #[test]
    fn removing_unknown_triple_is_a_no_op_success() {
        let mut idx = TidIndex::new();
        let t = TripleId::compute("s", "p", "o");
        assert!(idx.remove_tids(t, &[Tid::new()]));
    }

    #[test]
    fn dump_and_restore_round_trips() {
        let mut idx = TidIndex::new();
        let t = TripleId::compute("s", "p", "o");
        let tid = Tid::new();
        idx.add_triple(t, tid);
        idx.record_tid(Tid::new());

        let (contributors, all_tids) = idx.dump();
        let restored = TidIndex::restore(contributors, all_tids);
        assert!(restored.knows_tid(tid));
        assert_eq!(restored.contributors(t).unwrap().len(), 1);
    }
}
