//! pointercore-query
//!
//! A thin facade composing the constraint store, slicer, and solvers into a
//! single `query(seed) -> PresentedGraph` entry point, so a caller (the CLI,
//! or any other embedder) does not need to know about slicing, solver
//! selection, or presentation as separate steps.

use pointercore_analysis::{
    present_andersen, present_steensgaard, AndersenSolver, PresentedGraph, SteensgaardSolver,
};
use pointercore_core::{AnalysisConfig, Result};
use pointercore_store::{slice_with_backend, ConstraintStore, GraphBackend};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use tracing::{info, warn};

/// Which points-to algorithm a query should run. Andersen is more precise
/// (subset-based inclusion); Steensgaard is near-linear (equality-based
/// union-find). Both consume the same sliced constraint set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    Andersen,
    Steensgaard,
}

/// Composes C4 (slice) with C5/C6 (solve) and C7 (present) for one seed
/// hash. Mirrors spec §2's data flow: "On query: seed hash → C4 (slice) →
/// C5 or C6 → C7."
pub struct QueryEngine<'s> {
    store: &'s ConstraintStore,
    backend: Option<&'s dyn GraphBackend>,
    analysis: AnalysisConfig,
}

impl<'s> QueryEngine<'s> {
    pub fn new(store: &'s ConstraintStore) -> Self {
        Self {
            store,
            backend: None,
            analysis: AnalysisConfig::default(),
        }
    }

    /// Configures an optional remote graph backend (spec §6's `neo4j=`
    /// option); a connection failure during slicing falls back to the local
    /// store per spec §7.
    pub fn with_backend(mut self, backend: &'s dyn GraphBackend) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Applies analysis-time knobs (currently just `cancel_after`, spec §5).
    /// The core has no internal deadline; this is how a caller supplies one.
    pub fn with_config(mut self, analysis: AnalysisConfig) -> Self {
        self.analysis = analysis;
        self
    }

    /// Runs one query: slice from `seed`, solve with `algorithm`, and
    /// present the result. If `cancel_after` is configured, a background
    /// timer flips a shared flag once the budget elapses; the solver
    /// notices it cooperatively (between worklist iterations) and returns a
    /// partial result rather than being preempted mid-iteration.
    pub fn query(&self, seed: u64, algorithm: Algorithm) -> Result<PresentedGraph> {
        let constraints = slice_with_backend(self.store, self.backend, seed)
            .map_err(|e| pointercore_core::Error::Store(e.to_string()))?;
        info!(seed, algorithm = ?algorithm, sliced = constraints.len(), "running query");

        let cancelled = Arc::new(AtomicBool::new(false));
        let timer = self.analysis.cancel_after.map(|budget| {
            let flag = Arc::clone(&cancelled);
            thread::spawn(move || {
                thread::sleep(budget);
                flag.store(true, Ordering::Relaxed);
            })
        });

        let graph = match algorithm {
            Algorithm::Andersen => {
                let result = AndersenSolver::new(constraints.clone()).run_cancellable(Some(&*cancelled));
                if result.partial {
                    warn!(seed, "andersen query cancelled before reaching a fixpoint");
                }
                present_andersen(self.store, &constraints, &result.points_to, seed)
            }
            Algorithm::Steensgaard => {
                let result = SteensgaardSolver::new(constraints.clone()).run_cancellable(Some(&*cancelled));
                if result.partial {
                    warn!(seed, "steensgaard query cancelled before unifying all constraints");
                }
                present_steensgaard(self.store, &constraints, &result, seed)
            }
        };

        // The query itself has already finished; nothing more for a live
        // timer to cancel. Detach rather than join so a still-sleeping
        // timer thread never blocks the caller.
        drop(timer);

        graph
    }
}
