//! The SU-SET (set-union/set-difference) transactional dataset: the core
//! CRDT algorithm that makes local writes and remote deltas commute.

use crate::error::{DatasetError, Result};
use crate::graph_store::GraphStore;
use crate::kv_store::KvStore;
use crate::patch::{MeldUpdate, Patch};
use crate::snapshot::Snapshot;
use cg_constraint::{Constraint, ConstraintUpdate, SubjectGraph, Triple};
use cg_core::{CloneId, DeltaMessage, ReifiedDelete, Tid, TreeClock, TripleId};
use cg_journal::{Journal, JournalEntry, TidIndex};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

fn triple_to_doc(triple: &Triple) -> serde_json::Value {
    serde_json::json!({ "@id": triple.0, triple.1.clone(): triple.2 })
}

fn reified_of(triple: &Triple, tids: Vec<Tid>) -> ReifiedDelete {
    ReifiedDelete {
        subject: triple.0.clone(),
        predicate: triple.1.clone(),
        object: triple.2.clone(),
        tids,
    }
}

/// A read-only view of `base` overlaid with a pending insert/delete set, so a
/// constraint can be checked against the tentative post-update state without
/// committing anything to the underlying graph first.
struct PendingView<'a, G: SubjectGraph> {
    base: &'a G,
    inserts: &'a [Triple],
    deletes: &'a [Triple],
}

impl<'a, G: SubjectGraph> SubjectGraph for PendingView<'a, G> {
    fn values(&self, subject: &str, predicate: &str) -> Vec<String> {
        let mut values = self.base.values(subject, predicate);
        for (s, p, o) in self.deletes {
            if s == subject && p == predicate {
                values.retain(|v| v != o);
            }
        }
        for (s, p, o) in self.inserts {
            if s == subject && p == predicate && !values.contains(o) {
                values.push(o.clone());
            }
        }
        values
    }
}

/// The outcome of applying a remote delta: the net local effect, and — if a
/// constraint violation had to be repaired — the repair delta the caller
/// must publish in place of an echo of the original message.
#[derive(Debug)]
pub struct ApplyOutcome {
    pub update: MeldUpdate,
    pub repair: Option<DeltaMessage>,
}

/// A SU-SET dataset: a `GraphStore`, a `TidIndex`, a hash-chained `Journal`,
/// and the tree-clock time of this clone, all serialized behind a single
/// per-dataset transaction lock.
pub struct SuSetDataset<G: GraphStore, C: Constraint, K: KvStore> {
    clone_id: CloneId,
    time: TreeClock,
    graph: G,
    constraint: C,
    tid_index: TidIndex,
    journal: Journal,
    kv: K,
    lock: Mutex<()>,
}

impl<G: GraphStore, C: Constraint, K: KvStore> SuSetDataset<G, C, K> {
    pub fn new(clone_id: CloneId, time: TreeClock, graph: G, constraint: C, kv: K) -> Self {
        SuSetDataset {
            clone_id,
            time,
            graph,
            constraint,
            tid_index: TidIndex::new(),
            journal: Journal::initialize(),
            kv,
            lock: Mutex::new(()),
        }
    }

    pub fn time(&self) -> &TreeClock {
        &self.time
    }

    /// Overwrite this clone's identity, for the bootstrap path only: a
    /// joining clone has no data yet, so there's no causal history to
    /// reconcile before adopting the forked identity an online peer hands
    /// it.
    pub fn set_time(&mut self, time: TreeClock) {
        self.time = time;
    }

    pub fn kv(&self) -> &K {
        &self.kv
    }

    /// Read-only access to the underlying graph, for querying committed
    /// state outside of a transaction.
    pub fn graph(&self) -> &G {
        &self.graph
    }

    /// Check a remote delta already merged into `self.graph`, repairing in
    /// place if it violates the constraint. Only the remote path auto-repairs
    /// — there's no author on hand to fix a peer's already-published write.
    fn check_and_repair(&mut self, update: &ConstraintUpdate) -> cg_constraint::Repair {
        match self.constraint.check(update, &self.graph) {
            Ok(()) => cg_constraint::Repair::default(),
            Err(err) => {
                warn!(error = %err, "constraint violated, computing repair");
                let repair = self.constraint.apply(update, &self.graph);
                self.graph.insert(&repair.inserts);
                self.graph.remove(&repair.deletes);
                repair
            }
        }
    }

    fn record_inserts(&mut self, triples: &[Triple], tid: Tid) {
        for t in triples {
            self.tid_index.add_triple(TripleId::compute(&t.0, &t.1, &t.2), tid);
        }
    }

    /// Remove `triples` under `tid`'s contribution, returning one
    /// [`ReifiedDelete`] per triple carrying every TID that ever asserted
    /// it (not just this transaction's).
    fn record_deletes(&mut self, triples: &[Triple]) -> Vec<ReifiedDelete> {
        let mut out = Vec::with_capacity(triples.len());
        for t in triples {
            let id = TripleId::compute(&t.0, &t.1, &t.2);
            let tids: Vec<Tid> = self
                .tid_index
                .contributors(id)
                .map(|set| set.iter().copied().collect())
                .unwrap_or_default();
            if self.tid_index.remove_tids(id, &tids) {
                self.graph.remove(std::slice::from_ref(t));
            }
            out.push(reified_of(t, tids));
        }
        out
    }

    /// Apply a local write: flatten inserts, check the constraint against
    /// the tentative post-update state, and only then commit — a violation
    /// fails the transaction outright, with no graph mutation and no journal
    /// entry. Unlike a remote delta, a local write always has an author
    /// still at the keyboard to fix it, so there's no reason to auto-repair.
    pub fn transact(&mut self, patch: Patch) -> Result<DeltaMessage> {
        let _guard = self.lock.lock();

        if patch.inserts.iter().any(|doc| doc.get("@id").and_then(|v| v.as_str()).is_none()) {
            return Err(DatasetError::bad_update("insert document missing @id"));
        }
        let insert_triples: Vec<Triple> = patch.inserts.iter().flat_map(|doc| self.graph.flatten(doc)).collect();

        let update = ConstraintUpdate {
            inserts: insert_triples.clone(),
            deletes: patch.deletes.clone(),
        };
        let view = PendingView {
            base: &self.graph,
            inserts: &insert_triples,
            deletes: &patch.deletes,
        };
        self.constraint.check(&update, &view)?;

        self.graph.insert(&insert_triples);
        self.graph.remove(&patch.deletes);

        let tid = Tid::new();
        self.time = self.time.tick();

        self.record_inserts(&insert_triples, tid);
        let reified = self.record_deletes(&patch.deletes);

        let insert_docs: Vec<serde_json::Value> = insert_triples.iter().map(triple_to_doc).collect();
        let delta = DeltaMessage::new(tid, self.clone_id.clone(), self.time.clone(), insert_docs, reified);

        let payload = delta.encode()?;
        self.journal.append(self.time.ticks(), self.time.clone(), payload);
        info!(ticks = self.time.ticks(), tid = %tid, "transaction committed");

        Ok(delta)
    }

    /// Apply a remote delta: self-echo and TID-dedup guard, causal merge,
    /// repair, journal in the prescribed order (remote delta at arrival
    /// time, repair at local time), and return what to notify/publish.
    pub fn apply(&mut self, msg: DeltaMessage) -> Result<Option<ApplyOutcome>> {
        let _guard = self.lock.lock();

        if msg.time.same_identity(&self.time) {
            debug!(tid = %msg.tid, "ignoring self-echoed delta");
            return Ok(None);
        }
        if self.tid_index.knows_tid(msg.tid) {
            debug!(tid = %msg.tid, "ignoring already-applied delta");
            return Ok(None);
        }

        self.time = TreeClock::merge(&self.time, &msg.time);
        let arrival_time = self.time.clone();

        let mut inserts = Vec::new();
        for doc in &msg.inserts {
            inserts.extend(self.graph.flatten(doc));
        }
        self.graph.insert(&inserts);
        self.record_inserts(&inserts, msg.tid);

        let mut deletes = Vec::new();
        for rd in &msg.deletes {
            let triple = (rd.subject.clone(), rd.predicate.clone(), rd.object.clone());
            let id = TripleId::compute(&triple.0, &triple.1, &triple.2);
            for &t in &rd.tids {
                self.tid_index.record_tid(t);
            }
            if self.tid_index.remove_tids(id, &rd.tids) {
                self.graph.remove(std::slice::from_ref(&triple));
            }
            deletes.push(triple);
        }
        self.tid_index.record_tid(msg.tid);

        let update = ConstraintUpdate {
            inserts: inserts.clone(),
            deletes: deletes.clone(),
        };
        let repair = self.check_and_repair(&update);

        let payload = msg.encode()?;
        self.journal.append(arrival_time.ticks(), arrival_time, payload);

        let mut net_inserts = inserts;
        let mut net_deletes = deletes;

        let repair_delta = if repair.is_empty() {
            None
        } else {
            let repair_tid = Tid::new();
            self.time = self.time.tick();
            self.record_inserts(&repair.inserts, repair_tid);
            let reified = self.record_deletes(&repair.deletes);

            net_inserts.extend(repair.inserts.iter().cloned());
            net_deletes.extend(repair.deletes.iter().cloned());

            let insert_docs: Vec<serde_json::Value> = repair.inserts.iter().map(triple_to_doc).collect();
            let delta = DeltaMessage::new(repair_tid, self.clone_id.clone(), self.time.clone(), insert_docs, reified);
            let payload = delta.encode()?;
            self.journal.append(self.time.ticks(), self.time.clone(), payload);
            info!(ticks = self.time.ticks(), "remote delta repaired locally");
            Some(delta)
        };

        Ok(Some(ApplyOutcome {
            update: MeldUpdate {
                inserts: net_inserts,
                deletes: net_deletes,
            },
            repair: repair_delta,
        }))
    }

    /// A full snapshot of current state, for bootstrapping a new clone.
    pub fn take_snapshot(&self) -> Snapshot {
        let (tid_contributors, all_tids) = self.tid_index.dump();
        Snapshot {
            time: self.time.clone(),
            triples: self.graph.snapshot(),
            tid_contributors,
            all_tids,
        }
    }

    /// Replace all local state with `snapshot`, discarding the journal —
    /// the standard bootstrap path for a clone with no useful history.
    pub fn apply_snapshot(&mut self, snapshot: Snapshot) {
        let _guard = self.lock.lock();
        self.graph.restore(snapshot.triples);
        self.tid_index = TidIndex::restore(snapshot.tid_contributors, snapshot.all_tids);
        self.time = snapshot.time;
        self.journal = Journal::initialize();
        info!(ticks = self.time.ticks(), "snapshot applied");
    }

    /// Journal entries not yet known to a peer whose clock is `requester`,
    /// for a revup stream. `None` means this clone has never learned of
    /// that peer's identity, so a revup can't resume — a snapshot is
    /// required instead.
    pub fn operations_since(&self, requester: &TreeClock) -> Option<impl Iterator<Item = &JournalEntry>> {
        let ticks = requester.get_ticks(&self.time)?;
        Some(self.journal.entries_from(ticks))
    }
}
