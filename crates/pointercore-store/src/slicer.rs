//! The slicer (C4): given a seed hash, performs bounded graph traversal to
//! collect all constraints connected to it, in the deterministic two-ended
//! order spec §4.2 describes.

use crate::graph_backend::GraphBackend;
use crate::store::ConstraintStore;
use pointercore_core::{Constraint, StmtSide};
use std::collections::{HashSet, VecDeque};
use tracing::{debug, warn};

/// Runs the slicer against the local store.
///
/// ```text
/// queue ← [seed as bare side]
/// result ← []
/// loop:
///   current ← queue.pop_front()
///   for each stmt in store where stmt.lhs.hash = current.hash
///                              ∨ stmt.rhs.hash = current.hash:
///     if stmt ∉ result:
///       queue.push_back(stmt.lhs.hash = current.hash ? stmt.rhs : stmt.lhs)
///       if stmt.rhs.hash = current.hash
///          ∨ "*" appears in stmt.lhs.operators
///          ∨ "*" appears in stmt.rhs.operators:
///         result.append(stmt)          // defer
///       else:
///         result.prepend(stmt)         // direct definitions to the front
/// until queue empty
/// ```
///
/// The two-ended insertion brings direct definitions of the seed to the
/// front of the result, which the solvers rely on for faster convergence.
/// This is exactly spec.md's pseudocode; the reference C++ collector this
/// system was distilled from instead appends every newly-discovered
/// constraint unconditionally (no prepend/defer distinction) — that simpler
/// historical behavior is not what is implemented here, because the
/// prepend/defer discipline is explicitly load-bearing for invariant I7 and
/// solver convergence.
pub fn slice(store: &ConstraintStore, seed: u64) -> crate::store::Result<Vec<Constraint>> {
    let mut queue: VecDeque<StmtSide> = VecDeque::new();
    queue.push_back(StmtSide::bare(seed));

    let mut result: Vec<Constraint> = Vec::new();
    let mut seen_ids: HashSet<u64> = HashSet::new();

    while let Some(current) = queue.pop_front() {
        let touching = store.constraints_touching(current.hash)?;
        for stmt in touching {
            if seen_ids.contains(&stmt.id) {
                continue;
            }
            seen_ids.insert(stmt.id);

            let next = if stmt.lhs.hash == current.hash {
                stmt.rhs.clone()
            } else {
                stmt.lhs.clone()
            };
            queue.push_back(next);

            let defer = stmt.rhs.hash == current.hash
                || stmt.lhs.operators.contains('*')
                || stmt.rhs.operators.contains('*');

            if defer {
                result.push(stmt);
            } else {
                result.insert(0, stmt);
            }
        }
    }

    debug!(seed, collected = result.len(), "slicer finished");
    Ok(result)
}

/// Slices via the configured graph backend if present, falling back to the
/// local store on a transient connection failure (spec §7: transient errors
/// fall back rather than failing the query).
pub fn slice_with_backend(
    store: &ConstraintStore,
    backend: Option<&dyn GraphBackend>,
    seed: u64,
) -> crate::store::Result<Vec<Constraint>> {
    if let Some(backend) = backend {
        match backend.reachable_from(seed) {
            Ok(constraints) => return Ok(constraints),
            Err(e) => {
                warn!(error = %e, "graph backend unavailable, falling back to local store");
            }
        }
    }
    slice(store, seed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pointercore_core::{Constraint, StmtOption, StmtSide};
    use std::collections::BTreeSet;

    fn side(hash: u64, operators: &str, options: &[StmtOption]) -> StmtSide {
        StmtSide::new(hash, operators, options.iter().copied().collect::<BTreeSet<_>>())
    }

    #[test]
    fn collects_a_simple_chain() {
        let store = ConstraintStore::in_memory().unwrap();
        // int a; int* p = &a; int** q = &p;
        let p_eq_addr_a = Constraint::new(side(10, "", &[]), side(1, "&", &[]));
        let q_eq_addr_p = Constraint::new(side(20, "", &[]), side(10, "&", &[]));
        store.persist_constraint(&p_eq_addr_a).unwrap();
        store.persist_constraint(&q_eq_addr_p).unwrap();

        let sliced = slice(&store, 10).unwrap();
        assert_eq!(sliced.len(), 2);
    }

    #[test]
    fn direct_definitions_precede_uses() {
        let store = ConstraintStore::in_memory().unwrap();
        // p's own definition: p = &a
        let def = Constraint::new(side(1, "", &[]), side(2, "&", &[]));
        // a use of p through a dereference elsewhere: *p = &b (defers, contains '*')
        let use_via_deref = Constraint::new(side(1, "*", &[]), side(3, "&", &[]));
        store.persist_constraint(&use_via_deref).unwrap();
        store.persist_constraint(&def).unwrap();

        let sliced = slice(&store, 1).unwrap();
        assert_eq!(sliced[0].id, def.id);
    }
}
