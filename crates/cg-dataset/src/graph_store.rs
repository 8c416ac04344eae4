//! The `GraphStore` boundary: the external triple/quad store `cg-dataset`
//! consumes, plus an in-memory reference implementation good enough to
//! drive the SU-SET algorithms and the seed test scenarios.
//!
//! The real JSON-graph query front-end flattens/expands JSON-LD and compiles
//! match patterns; that's out of scope here (§1's `compile(pattern) ->
//! {match, apply}` boundary). `cg-dataset` only ever sees already-flattened
//! triples.

use cg_constraint::{SubjectGraph, Triple};
use std::collections::BTreeSet;

/// Read/write access to the underlying triple store. `cg-dataset` never
/// reaches for a concrete store directly — only through this trait — so a
/// real persistent quad store can be substituted without touching the
/// replication logic.
pub trait GraphStore: SubjectGraph + Send + Sync {
    /// Flatten a JSON-LD-ish subject map (`{"@id": ..., "pred": value |
    /// [values]}`) into triples.
    fn flatten(&self, subject: &serde_json::Value) -> Vec<Triple>;

    fn insert(&mut self, triples: &[Triple]);

    fn remove(&mut self, triples: &[Triple]);

    /// Every triple currently held, for snapshotting.
    fn snapshot(&self) -> Vec<Triple>;

    /// Replace all content with `triples`, for bootstrapping from a
    /// snapshot.
    fn restore(&mut self, triples: Vec<Triple>);
}

fn value_to_object(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// In-memory `GraphStore`. Not the storage product — only a reference
/// implementation the replication core can run and test against, the same
/// role the teacher's `MemoryStorage` plays until a real backend exists.
#[derive(Debug, Default)]
pub struct MemoryGraphStore {
    triples: BTreeSet<Triple>,
}

impl MemoryGraphStore {
    pub fn new() -> Self {
        MemoryGraphStore::default()
    }
}

impl SubjectGraph for MemoryGraphStore {
    fn values(&self, subject: &str, predicate: &str) -> Vec<String> {
        self.triples
            .iter()
            .filter(|(s, p, _)| s == subject && p == predicate)
            .map(|(_, _, o)| o.clone())
            .collect()
    }
}

impl GraphStore for MemoryGraphStore {
    fn flatten(&self, subject: &serde_json::Value) -> Vec<Triple> {
        let Some(obj) = subject.as_object() else {
            return Vec::new();
        };
        let Some(id) = obj.get("@id").and_then(|v| v.as_str()) else {
            return Vec::new();
        };
        let mut triples = Vec::new();
        for (predicate, value) in obj {
            if predicate == "@id" {
                continue;
            }
            match value {
                serde_json::Value::Array(items) => {
                    for item in items {
                        triples.push((id.to_string(), predicate.clone(), value_to_object(item)));
                    }
                }
                other => triples.push((id.to_string(), predicate.clone(), value_to_object(other))),
            }
        }
        triples
    }

    fn insert(&mut self, triples: &[Triple]) {
        for t in triples {
            self.triples.insert(t.clone());
        }
    }

    fn remove(&mut self, triples: &[Triple]) {
        for t in triples {
            self.triples.remove(t);
        }
    }

    fn snapshot(&self) -> Vec<Triple> {
        self.triples.iter().cloned().collect()
    }

    fn restore(&mut self, triples: Vec<Triple>) {
        self.triples = triples.into_iter().collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flatten_expands_arrays_and_skips_id() {
        let store = MemoryGraphStore::new();
        let doc = serde_json::json!({"@id": "s1", "tag": ["a", "b"], "name": "alice"});
        let mut triples = store.flatten(&doc);
        triples.sort();
        assert_eq!(
            triples,
            vec![
                ("s1".to_string(), "name".to_string(), "alice".to_string()),
                ("s1".to_string(), "tag".to_string(), "a".to_string()),
                ("s1".to_string(), "tag".to_string(), "b".to_string()),
            ]
        );
    }

    #[test]
    fn insert_remove_and_snapshot_round_trip() {
        let mut store = MemoryGraphStore::new();
        let t = ("s1".to_string(), "p".to_string(), "o".to_string());
        store.insert(&[t.clone()]);
        assert_eq!(store.snapshot(), vec![t.clone()]);
        store.remove(&[t.clone()]);
        assert!(store.snapshot().is_empty());

        store.insert(&[t.clone()]);
        let snap = store.snapshot();
        let mut restored = MemoryGraphStore::new();
        restored.restore(snap);
        assert_eq!(restored.values("s1", "p"), vec!["o".to_string()]);
    }
}
