//! Pluggable constraint engine: a `check`/`apply` gate that runs over every
//! pending update before it commits.
//!
//! A constraint only ever sees the triple-level shape of an update (subject,
//! predicate, object strings) and a read-only view of the graph the update
//! would land in — it has no idea it's running inside a CRDT dataset, a
//! test, or a single-process demo. That boundary is what lets `SingleValued`
//! repair deterministically on every clone without coordinating with the
//! others: each clone computes the exact same repair from the exact same
//! inputs.

#![forbid(unsafe_code)]

mod checklist;
mod error;
mod single_valued;

pub use checklist::CheckList;
pub use error::ConstraintError;
pub use single_valued::SingleValued;

/// A single (subject, predicate, object) fact, triple-level only — no
/// knowledge of JSON-LD shape or graph name.
pub type Triple = (String, String, String);

/// The net effect a pending transaction would have on the dataset, as seen
/// by a constraint.
#[derive(Debug, Clone, Default)]
pub struct ConstraintUpdate {
    pub inserts: Vec<Triple>,
    pub deletes: Vec<Triple>,
}

impl ConstraintUpdate {
    /// Every subject touched by this update, deduplicated.
    pub fn affected_subjects(&self) -> Vec<String> {
        let mut subjects: Vec<String> = self
            .inserts
            .iter()
            .chain(self.deletes.iter())
            .map(|(s, _, _)| s.clone())
            .collect();
        subjects.sort();
        subjects.dedup();
        subjects
    }
}

/// Read-only access to the graph a constraint checks against. Implementors
/// are expected to reflect the *tentative* post-update state, not the
/// pre-update one.
pub trait SubjectGraph {
    /// Every object value currently held for `subject`/`predicate`.
    fn values(&self, subject: &str, predicate: &str) -> Vec<String>;
}

/// A repair: the extra inserts/deletes needed to bring a violating update
/// back into compliance. Empty if nothing needed repairing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Repair {
    pub inserts: Vec<Triple>,
    pub deletes: Vec<Triple>,
}

impl Repair {
    pub fn is_empty(&self) -> bool {
        self.inserts.is_empty() && self.deletes.is_empty()
    }

    fn merge(mut self, other: Repair) -> Repair {
        self.inserts.extend(other.inserts);
        self.deletes.extend(other.deletes);
        self
    }
}

/// A domain invariant over the dataset, checked against every pending
/// update and capable of producing a deterministic repair when violated.
pub trait Constraint: Send + Sync {
    /// Validate `update` against `graph`. `Err` means the update as given
    /// violates the constraint; callers should fall back to [`apply`].
    ///
    /// [`apply`]: Constraint::apply
    fn check(&self, update: &ConstraintUpdate, graph: &dyn SubjectGraph) -> error::Result<()>;

    /// Compute the repair needed to bring `update` into compliance. Must be
    /// a pure, deterministic function of `update` and `graph` alone, so
    /// every clone that observes the same state converges on the same
    /// repair without coordinating.
    fn apply(&self, update: &ConstraintUpdate, graph: &dyn SubjectGraph) -> Repair;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedGraph(std::collections::HashMap<(String, String), Vec<String>>);

    impl SubjectGraph for FixedGraph {
        fn values(&self, subject: &str, predicate: &str) -> Vec<String> {
            self.0
                .get(&(subject.to_string(), predicate.to_string()))
                .cloned()
                .unwrap_or_default()
        }
    }

    #[test]
    fn affected_subjects_is_sorted_and_deduped() {
        let update = ConstraintUpdate {
            inserts: vec![("b".into(), "p".into(), "1".into()), ("a".into(), "p".into(), "2".into())],
            deletes: vec![("a".into(), "p".into(), "3".into())],
        };
        assert_eq!(update.affected_subjects(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn fixed_graph_reads_back_values() {
        let mut map = std::collections::HashMap::new();
        map.insert(("s".to_string(), "p".to_string()), vec!["v".to_string()]);
        let g = FixedGraph(map);
        assert_eq!(g.values("s", "p"), vec!["v".to_string()]);
        assert!(g.values("s", "missing").is_empty());
    }
}
