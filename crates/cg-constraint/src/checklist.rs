use crate::{Constraint, ConstraintError, ConstraintUpdate, Repair, SubjectGraph};

/// A read-only view of `base` overlaid with a repair accumulated so far, so
/// each constraint in a `CheckList` sees the previous ones' repairs already
/// applied rather than the original pre-repair state.
struct RepairedGraph<'a> {
    base: &'a dyn SubjectGraph,
    repair: &'a Repair,
}

impl<'a> SubjectGraph for RepairedGraph<'a> {
    fn values(&self, subject: &str, predicate: &str) -> Vec<String> {
        let mut values = self.base.values(subject, predicate);
        for (s, p, o) in &self.repair.deletes {
            if s == subject && p == predicate {
                values.retain(|v| v != o);
            }
        }
        for (s, p, o) in &self.repair.inserts {
            if s == subject && p == predicate && !values.contains(o) {
                values.push(o.clone());
            }
        }
        values
    }
}

/// Composes several constraints into one, run in registration order.
/// `check` short-circuits on the first violation; `apply` threads each
/// constraint's repair into the next one's view of the graph, so a repair
/// that trips a later constraint gets caught and fixed too.
#[derive(Default)]
pub struct CheckList {
    constraints: Vec<Box<dyn Constraint>>,
}

impl CheckList {
    pub fn new() -> Self {
        CheckList::default()
    }

    pub fn push(mut self, constraint: impl Constraint + 'static) -> Self {
        self.constraints.push(Box::new(constraint));
        self
    }
}

impl Constraint for CheckList {
    fn check(&self, update: &ConstraintUpdate, graph: &dyn SubjectGraph) -> Result<(), ConstraintError> {
        for constraint in &self.constraints {
            constraint.check(update, graph)?;
        }
        Ok(())
    }

    fn apply(&self, update: &ConstraintUpdate, graph: &dyn SubjectGraph) -> Repair {
        let mut repair = Repair::default();
        for constraint in &self.constraints {
            let view = RepairedGraph { base: graph, repair: &repair };
            let next = constraint.apply(update, &view);
            repair = repair.merge(next);
        }
        repair
    }
}
