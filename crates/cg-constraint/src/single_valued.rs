use crate::{Constraint, ConstraintError, ConstraintUpdate, Repair, SubjectGraph};
use tracing::warn;

/// Enforces that every subject has at most one value for a given predicate.
/// When two clones concurrently write different values, both survive the
/// merge (set-union semantics) and this constraint repairs the duplicate by
/// keeping the lexicographically smallest value and retracting the rest —
/// every clone computes the same winner from the same candidate set, so no
/// further coordination is needed.
pub struct SingleValued {
    predicate: String,
}

impl SingleValued {
    pub fn new(predicate: impl Into<String>) -> Self {
        SingleValued {
            predicate: predicate.into(),
        }
    }

    fn violations(&self, update: &ConstraintUpdate, graph: &dyn SubjectGraph) -> Vec<(String, Vec<String>)> {
        let mut out = Vec::new();
        for subject in update.affected_subjects() {
            let values = graph.values(&subject, &self.predicate);
            if values.len() > 1 {
                out.push((subject, values));
            }
        }
        out
    }
}

impl Constraint for SingleValued {
    fn check(&self, update: &ConstraintUpdate, graph: &dyn SubjectGraph) -> Result<(), ConstraintError> {
        let violations = self.violations(update, graph);
        if let Some((subject, values)) = violations.into_iter().next() {
            return Err(ConstraintError::violation(
                subject,
                format!("predicate {:?} has {} values, expected at most 1", self.predicate, values.len()),
            ));
        }
        Ok(())
    }

    fn apply(&self, update: &ConstraintUpdate, graph: &dyn SubjectGraph) -> Repair {
        let mut repair = Repair::default();
        for (subject, mut values) in self.violations(update, graph) {
            values.sort();
            let (keep, rest) = values.split_first().expect("violations only recorded when len > 1");
            warn!(subject = %subject, predicate = %self.predicate, keep = %keep, dropped = rest.len(), "repairing single-valued violation");
            for value in rest {
                repair.deletes.push((subject.clone(), self.predicate.clone(), value.clone()));
            }
        }
        repair
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct FixedGraph(HashMap<(String, String), Vec<String>>);

    impl SubjectGraph for FixedGraph {
        fn values(&self, subject: &str, predicate: &str) -> Vec<String> {
            self.0
                .get(&(subject.to_string(), predicate.to_string()))
                .cloned()
                .unwrap_or_default()
        }
    }

    fn graph_with(subject: &str, predicate: &str, values: &[&str]) -> FixedGraph {
        let mut map = HashMap::new();
        map.insert(
            (subject.to_string(), predicate.to_string()),
            values.iter().map(|v| v.to_string()).collect(),
        );
        FixedGraph(map)
    }

    #[test]
    fn single_value_passes_check() {
        let c = SingleValued::new("name");
        let g = graph_with("s1", "name", &["alice"]);
        let update = ConstraintUpdate {
            inserts: vec![("s1".into(), "name".into(), "alice".into())],
            deletes: vec![],
        };
        assert!(c.check(&update, &g).is_ok());
    }

    #[test]
    fn multiple_values_fail_check_and_repair_keeps_lexicographic_min() {
        let c = SingleValued::new("name");
        let g = graph_with("s1", "name", &["zoe", "alice"]);
        let update = ConstraintUpdate {
            inserts: vec![("s1".into(), "name".into(), "zoe".into())],
            deletes: vec![],
        };
        assert!(c.check(&update, &g).is_err());

        let repair = c.apply(&update, &g);
        assert_eq!(repair.deletes, vec![("s1".to_string(), "name".to_string(), "zoe".to_string())]);
        assert!(repair.inserts.is_empty());
    }

    #[test]
    fn repair_is_deterministic_regardless_of_candidate_order() {
        let c = SingleValued::new("name");
        let g1 = graph_with("s1", "name", &["zoe", "alice", "bob"]);
        let g2 = graph_with("s1", "name", &["bob", "zoe", "alice"]);
        let update = ConstraintUpdate {
            inserts: vec![("s1".into(), "name".into(), "zoe".into())],
            deletes: vec![],
        };
        assert_eq!(c.apply(&update, &g1), c.apply(&update, &g2));
    }
}
