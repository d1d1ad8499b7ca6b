//! Andersen's inclusion-based points-to analysis (C5).
//!
//! Flow-insensitive, subset-constraint, worklist fixpoint. Operates entirely
//! over an owned `Vec<Constraint>` handed to it by the slicer: nothing here
//! holds a reference to the store, and nothing computed here persists across
//! queries (spec §4.3.A).

use pointercore_core::{Constraint, StmtOption, StmtSide};
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, warn};

/// A variable's resolved points-to set, keyed by the hash of the entity it
/// points at (not the pointer's own hash).
#[derive(Debug, Default, Clone)]
pub struct PointsToSet {
    sets: HashMap<u64, BTreeSet<u64>>,
}

impl PointsToSet {
    pub fn of(&self, hash: u64) -> &BTreeSet<u64> {
        static EMPTY: BTreeSet<u64> = BTreeSet::new();
        self.sets.get(&hash).unwrap_or(&EMPTY)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&u64, &BTreeSet<u64>)> {
        self.sets.iter()
    }

    fn insert(&mut self, hash: u64, target: u64) -> bool {
        self.sets.entry(hash).or_default().insert(target)
    }
}

/// Result of a run: the points-to map plus whether it is complete.
/// `partial` is set when a caller-supplied cancellation flag fired before
/// the worklist reached its fixpoint (spec §5: cooperative cancellation,
/// checked between worklist iterations, yielding a documented partial
/// result rather than an error).
#[derive(Debug, Default)]
pub struct AndersenResult {
    pub points_to: PointsToSet,
    pub partial: bool,
}

/// Runs Andersen's algorithm over `constraints` and returns the resulting
/// points-to sets.
pub struct AndersenSolver {
    constraints: Vec<Constraint>,
}

impl AndersenSolver {
    pub fn new(constraints: Vec<Constraint>) -> Self {
        Self { constraints }
    }

    /// Spec §4.3: simple constraints (`lhs.operators == ""`, `rhs.operators
    /// == "&"`) seed `PT` directly; every other constraint is complex and is
    /// iterated to a fixpoint via `evalLHS`/`evalRHS`.
    pub fn run(&self) -> PointsToSet {
        self.run_cancellable(None).points_to
    }

    /// Same as `run`, but checks `cancelled` between worklist iterations and
    /// returns early with `partial: true` if it is set. No suspension point
    /// exists inside a single iteration (spec §5: "no suspension points
    /// exist inside a solver").
    pub fn run_cancellable(&self, cancelled: Option<&AtomicBool>) -> AndersenResult {
        let mut points_to = PointsToSet::default();
        let mut complex: Vec<&Constraint> = Vec::new();

        for c in &self.constraints {
            if c.is_simple() {
                points_to.insert(c.lhs.hash, c.rhs.hash);
            } else {
                complex.push(c);
            }
        }

        let mut changed = true;
        let mut partial = false;
        while changed {
            if cancelled.is_some_and(|f| f.load(Ordering::Relaxed)) {
                warn!("andersen solver cancelled before fixpoint; returning partial result");
                partial = true;
                break;
            }
            changed = false;
            for c in &complex {
                let direct = c.is_direct_points_to();
                for l in eval_lhs(&c.lhs, &points_to) {
                    for r in eval_rhs(&c.rhs, direct, &points_to) {
                        if points_to.insert(l, r) {
                            changed = true;
                        }
                    }
                }
            }
        }

        debug!(
            constraints = self.constraints.len(),
            variables = points_to.sets.len(),
            partial,
            "andersen fixpoint reached"
        );
        AndersenResult { points_to, partial }
    }
}

/// `evalLHS(side)`: the locations `side` denotes as an l-value. A leading
/// `*` is peeled and delegated to `evalRHS` with `isDirect = false` — one
/// level of dereference only (Open Question (b): deeper LHS indirections
/// are intentionally not iterated).
fn eval_lhs(side: &StmtSide, pts: &PointsToSet) -> Vec<u64> {
    match side.operators.strip_prefix('*') {
        Some(rest) => {
            let stripped = StmtSide::new(side.hash, rest, side.options.clone());
            eval_rhs(&stripped, false, pts)
        }
        None => vec![side.hash],
    }
}

/// `evalRHS(side, isDirect)`: the locations `side` points to.
fn eval_rhs(side: &StmtSide, is_direct: bool, pts: &PointsToSet) -> Vec<u64> {
    if let Some(rest) = side.operators.strip_prefix('&') {
        return if rest.is_empty() {
            vec![side.hash]
        } else {
            let stripped = StmtSide::new(side.hash, rest, side.options.clone());
            eval_rhs(&stripped, true, pts)
        };
    }
    if let Some(rest) = side.operators.strip_prefix('*') {
        return pts
            .of(side.hash)
            .iter()
            .flat_map(|&e| {
                let next = StmtSide::new(e, rest, side.options.clone());
                eval_rhs(&next, is_direct, pts)
            })
            .collect();
    }
    if is_direct {
        vec![side.hash]
    } else {
        pts.of(side.hash).iter().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet as Set;

    fn side(hash: u64, operators: &str, options: &[StmtOption]) -> StmtSide {
        StmtSide::new(hash, operators, options.iter().copied().collect::<Set<_>>())
    }

    #[test]
    fn direct_assignment_resolves_points_to() {
        // p = &a
        let c = Constraint::new(side(1, "", &[]), side(2, "&", &[]));
        let solver = AndersenSolver::new(vec![c]);
        let pts = solver.run();
        assert!(pts.of(1).contains(&2));
    }

    #[test]
    fn copy_propagates_through_chain() {
        // p = &a; q = p;  => q points to a
        let c1 = Constraint::new(side(1, "", &[]), side(2, "&", &[]));
        let c2 = Constraint::new(side(3, "", &[]), side(1, "", &[]));
        let solver = AndersenSolver::new(vec![c1, c2]);
        let pts = solver.run();
        assert!(pts.of(3).contains(&2));
    }

    #[test]
    fn deref_store_and_load_round_trip() {
        // p = &a; q = &p; *q = &b (store through q reaches p); a = &c;
        // r = *p (load: r should see whatever p's pointees point to, i.e. c,
        // by way of a — not a/b themselves).
        let p_eq_addr_a = Constraint::new(side(1, "", &[]), side(2, "&", &[]));
        let q_eq_addr_p = Constraint::new(side(3, "", &[]), side(1, "&", &[]));
        let deref_q_eq_addr_b = Constraint::new(side(3, "*", &[]), side(4, "&", &[]));
        let a_eq_addr_c = Constraint::new(side(2, "", &[]), side(6, "&", &[]));
        let r_eq_deref_p = Constraint::new(side(5, "", &[]), side(1, "*", &[]));
        let solver = AndersenSolver::new(vec![
            p_eq_addr_a,
            q_eq_addr_p,
            deref_q_eq_addr_b,
            a_eq_addr_c,
            r_eq_deref_p,
        ]);
        let pts = solver.run();
        // *q = &b stores through q's pointee (p), so p gains b too.
        assert!(pts.of(1).contains(&4));
        // r = *p loads through p's pointees (a, b); only a has its own
        // points-to set ({c}), so r sees c.
        assert!(pts.of(5).contains(&6));
    }

    #[test]
    fn null_and_heap_are_direct_points_to() {
        let p_null = Constraint::new(side(1, "", &[]), side(2, "", &[StmtOption::NullPtr]));
        let q_heap = Constraint::new(side(3, "", &[]), side(4, "", &[StmtOption::HeapObj]));
        let solver = AndersenSolver::new(vec![p_null, q_heap]);
        let pts = solver.run();
        assert!(pts.of(1).contains(&2));
        assert!(pts.of(3).contains(&4));
    }

    #[test]
    fn pre_cancelled_flag_yields_partial_result_without_iterating() {
        // p = &a; q = p;  (complex constraint would normally propagate a into q's set)
        let c1 = Constraint::new(side(1, "", &[]), side(2, "&", &[]));
        let c2 = Constraint::new(side(3, "", &[]), side(1, "", &[]));
        let solver = AndersenSolver::new(vec![c1, c2]);
        let cancelled = AtomicBool::new(true);
        let result = solver.run_cancellable(Some(&cancelled));
        assert!(result.partial);
        // the simple constraint still seeded PT before the worklist began
        assert!(result.points_to.of(1).contains(&2));
    }
}
