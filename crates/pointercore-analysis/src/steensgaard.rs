//! Steensgaard's equality-based points-to analysis (C6).
//!
//! Near-linear time via union-find: every entity belongs to an equivalence
//! class, and each class has at most one "pointee" class, merged in whenever
//! two different pointees are asserted to be the same thing. Less precise
//! than Andersen but orders of magnitude cheaper on large translation units.

use pointercore_core::{Constraint, StmtSide};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, warn};

/// Hand-rolled union-find over entity hashes plus lazily-allocated synthetic
/// nodes standing in for "the location a pointer points to" when nothing has
/// named that location yet. No crate pulled in for this: the pack's closest
/// analogues (petgraph et al.) model general graphs, not the weighted-union
/// + path-compression discipline this needs, and the structure is small
/// enough to keep as a private implementation detail.
struct Arena {
    parent: HashMap<u64, u64>,
    rank: HashMap<u64, u32>,
    pointee: HashMap<u64, u64>,
    next_synthetic: u64,
}

impl Arena {
    fn new() -> Self {
        Self {
            parent: HashMap::new(),
            rank: HashMap::new(),
            pointee: HashMap::new(),
            next_synthetic: u64::MAX,
        }
    }

    fn find(&mut self, x: u64) -> u64 {
        let p = *self.parent.entry(x).or_insert(x);
        if p == x {
            x
        } else {
            let root = self.find(p);
            self.parent.insert(x, root);
            root
        }
    }

    fn fresh_synthetic(&mut self) -> u64 {
        let id = self.next_synthetic;
        self.next_synthetic -= 1;
        self.parent.insert(id, id);
        id
    }

    /// The representative of the class `x`'s pointee belongs to, allocating
    /// a fresh unconstrained class the first time `x` is dereferenced.
    fn loc(&mut self, x: u64) -> u64 {
        let root = self.find(x);
        if let Some(&p) = self.pointee.get(&root) {
            self.find(p)
        } else {
            let fresh = self.fresh_synthetic();
            self.pointee.insert(root, fresh);
            fresh
        }
    }

    /// Union the classes of `a` and `b`. When both already have a pointee,
    /// the pointees are unioned too, maintaining "at most one pointee per
    /// class" after the merge.
    fn union(&mut self, a: u64, b: u64) {
        let mut ra = self.find(a);
        let mut rb = self.find(b);
        if ra == rb {
            return;
        }
        let rank_a = *self.rank.get(&ra).unwrap_or(&0);
        let rank_b = *self.rank.get(&rb).unwrap_or(&0);
        if rank_a < rank_b {
            std::mem::swap(&mut ra, &mut rb);
        }
        self.parent.insert(rb, ra);
        if rank_a == rank_b {
            self.rank.insert(ra, rank_a + 1);
        }

        let pa = self.pointee.get(&ra).copied();
        let pb = self.pointee.remove(&rb);
        match (pa, pb) {
            (Some(x), Some(y)) => {
                self.pointee.insert(ra, x);
                if self.find(x) != self.find(y) {
                    self.union(x, y);
                }
            }
            (None, Some(y)) => {
                self.pointee.insert(ra, y);
            }
            _ => {}
        }
    }

    /// `n.pointsTo`: sets it if unset, otherwise merges the two pointees
    /// (spec §4.4 step 3).
    fn set_or_merge_pointee(&mut self, n: u64, m: u64) {
        let root = self.find(n);
        let m = self.find(m);
        match self.pointee.get(&root).copied() {
            None => {
                self.pointee.insert(root, m);
            }
            Some(p) => {
                if self.find(p) != m {
                    self.union(p, m);
                }
            }
        }
    }
}

/// `evalRhs` (spec §4.4): mirrors Andersen's `evalRHS` but resolves to a
/// union-find class instead of a hash-keyed points-to set. Empty operators
/// return the node itself when `is_direct`, else its pointee class; a
/// leading `&` peels and raises `is_direct` for the remainder; a leading `*`
/// descends through the node's pointee and re-evaluates the tail.
fn eval_rhs_class(arena: &mut Arena, side: &StmtSide, is_direct: bool) -> u64 {
    if let Some(rest) = side.operators.strip_prefix('&') {
        return if rest.is_empty() {
            arena.find(side.hash)
        } else {
            let stripped = StmtSide::new(side.hash, rest, side.options.clone());
            eval_rhs_class(arena, &stripped, true)
        };
    }
    if let Some(rest) = side.operators.strip_prefix('*') {
        let base = arena.find(side.hash);
        let target = arena.loc(base);
        let stripped = StmtSide::new(target, rest, side.options.clone());
        return eval_rhs_class(arena, &stripped, is_direct);
    }
    let base = arena.find(side.hash);
    if is_direct {
        base
    } else {
        arena.loc(base)
    }
}

/// Finalized equivalence classes and their pointees, ready for presentation.
#[derive(Debug, Default)]
pub struct SteensgaardResult {
    /// Every observed hash mapped to its class representative.
    classes: HashMap<u64, u64>,
    /// Class representative mapped to the representative of what it points
    /// to, when known.
    pointee: HashMap<u64, u64>,
    /// Set when a caller-supplied cancellation flag fired before every
    /// constraint was unified (spec §5: cooperative cancellation yields a
    /// documented partial result, not an error).
    pub partial: bool,
}

impl SteensgaardResult {
    pub fn class_of(&self, hash: u64) -> u64 {
        *self.classes.get(&hash).unwrap_or(&hash)
    }

    pub fn points_to(&self, hash: u64) -> Option<u64> {
        self.pointee.get(&self.class_of(hash)).copied()
    }

    pub fn classes(&self) -> impl Iterator<Item = (&u64, &u64)> {
        self.classes.iter()
    }
}

pub struct SteensgaardSolver {
    constraints: Vec<Constraint>,
}

impl SteensgaardSolver {
    pub fn new(constraints: Vec<Constraint>) -> Self {
        Self { constraints }
    }

    pub fn run(&self) -> SteensgaardResult {
        self.run_cancellable(None)
    }

    /// Same as `run`, but checks `cancelled` between constraints — the
    /// union-find pass's analogue of Andersen's between-iteration check,
    /// since Steensgaard has no separate worklist loop (spec §5). Unified
    /// constraints up to the cancellation point are still canonicalized and
    /// returned, tagged `partial: true`.
    pub fn run_cancellable(&self, cancelled: Option<&AtomicBool>) -> SteensgaardResult {
        let mut arena = Arena::new();
        let mut partial = false;

        for c in &self.constraints {
            if cancelled.is_some_and(|f| f.load(Ordering::Relaxed)) {
                warn!("steensgaard solver cancelled before unifying all constraints; returning partial result");
                partial = true;
                break;
            }
            // `evalLhs` (spec §4.4 step 1): strips all operators and
            // resolves to the bare node's own class — Steensgaard never
            // dereferences the LHS. A differing previously-known pointee
            // is reconciled by `set_or_merge_pointee`'s union below, which
            // is how a store through a pointer still ends up unifying the
            // right classes.
            let n = arena.find(c.lhs.hash);

            let m = eval_rhs_class(&mut arena, &c.rhs, c.is_direct_points_to());
            arena.set_or_merge_pointee(n, m);
        }

        // Canonicalization: flatten every touched hash (real entities, not
        // synthetic location placeholders) to its final representative.
        let mut seen = std::collections::HashSet::new();
        for c in &self.constraints {
            seen.insert(c.lhs.hash);
            seen.insert(c.rhs.hash);
        }

        let mut classes = HashMap::new();
        for &hash in &seen {
            classes.insert(hash, arena.find(hash));
        }

        let mut pointee = HashMap::new();
        for &rep in classes.values() {
            if let Some(&p) = arena.pointee.get(&rep) {
                pointee.insert(rep, arena.find(p));
            }
        }

        debug!(
            constraints = self.constraints.len(),
            classes = classes.len(),
            partial,
            "steensgaard fixpoint reached"
        );
        SteensgaardResult {
            classes,
            pointee,
            partial,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pointercore_core::StmtOption;
    use std::collections::BTreeSet as Set;

    fn side(hash: u64, operators: &str, options: &[StmtOption]) -> StmtSide {
        StmtSide::new(hash, operators, options.iter().copied().collect::<Set<_>>())
    }

    #[test]
    fn direct_assignment_unifies_pointee() {
        // p = &a
        let c = Constraint::new(side(1, "", &[]), side(2, "&", &[]));
        let solver = SteensgaardSolver::new(vec![c]);
        let result = solver.run();
        assert_eq!(result.points_to(1), Some(result.class_of(2)));
    }

    #[test]
    fn copy_assignment_merges_pointees() {
        // p = &a; q = p;  => p and q's pointees are the same class
        let c1 = Constraint::new(side(1, "", &[]), side(2, "&", &[]));
        let c2 = Constraint::new(side(3, "", &[]), side(1, "", &[]));
        let solver = SteensgaardSolver::new(vec![c1, c2]);
        let result = solver.run();
        assert_eq!(result.points_to(1), result.points_to(3));
    }

    #[test]
    fn store_and_load_unify_through_one_level() {
        // p = &a; q = &p; a = &c; *q = &b (q already points to p, so storing
        // through q unifies p's and b's own classes — not their pointees);
        // r = *p (load: p, now merged with b, still points to a, so r's
        // pointee is a's own pointee, c).
        let p_eq_addr_a = Constraint::new(side(1, "", &[]), side(2, "&", &[]));
        let q_eq_addr_p = Constraint::new(side(3, "", &[]), side(1, "&", &[]));
        let a_eq_addr_c = Constraint::new(side(2, "", &[]), side(6, "&", &[]));
        let deref_q_eq_addr_b = Constraint::new(side(3, "*", &[]), side(4, "&", &[]));
        let r_eq_deref_p = Constraint::new(side(5, "", &[]), side(1, "*", &[]));
        let solver = SteensgaardSolver::new(vec![
            p_eq_addr_a,
            q_eq_addr_p,
            a_eq_addr_c,
            deref_q_eq_addr_b,
            r_eq_deref_p,
        ]);
        let result = solver.run();
        // *q = &b: q already points to p, so b is unified into p's class.
        assert_eq!(result.class_of(1), result.class_of(4));
        // p (now merged with b) still points to a.
        assert_eq!(result.points_to(1), Some(result.class_of(2)));
        // r = *p loads through p's pointee: c, via a's own assignment.
        assert_eq!(result.points_to(5), Some(result.class_of(6)));
    }

    #[test]
    fn pre_cancelled_flag_yields_partial_result_without_unifying() {
        let c = Constraint::new(side(1, "", &[]), side(2, "&", &[]));
        let solver = SteensgaardSolver::new(vec![c]);
        let cancelled = AtomicBool::new(true);
        let result = solver.run_cancellable(Some(&cancelled));
        assert!(result.partial);
        assert_eq!(result.points_to(1), None);
    }
}
