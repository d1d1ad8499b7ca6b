//! Optional remote graph backend for the slicer.
//!
//! Large codebases may keep their constraint graph in a dedicated graph
//! database reachable over the network rather than in the local `sled`
//! store. `GraphBackend` abstracts that query so the slicer can fall back to
//! the local store on a transient connection failure (spec §7) without
//! caring which remote technology is behind it.
//!
//! No concrete client is wired up here: the pack's examples do not carry a
//! neo4j/Bolt crate, and fabricating a vendored client would violate the
//! "never invent a dependency" rule. A real deployment plugs a concrete
//! `GraphBackend` in (e.g. over an HTTP Cypher endpoint) from the CLI crate.

use pointercore_core::Constraint;
use std::fmt;

#[derive(Debug)]
pub struct BackendError(pub String);

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for BackendError {}

/// A remote source of constraints reachable from a seed hash.
///
/// Implementations should treat connection failures as transient: return
/// `Err` rather than panicking, so the caller can fall back to the local
/// store per the error taxonomy in spec §7.
pub trait GraphBackend: Send + Sync {
    fn reachable_from(&self, seed: u64) -> Result<Vec<Constraint>, BackendError>;
}

/// A backend that always reports itself unreachable. Used where a
/// `--neo4j` connection string was supplied but the connection attempt
/// failed at startup: the CLI still has something to hand the slicer that
/// reliably triggers the local fallback path rather than special-casing
/// "no backend" vs. "unreachable backend" at every call site.
pub struct UnreachableBackend {
    pub reason: String,
}

impl GraphBackend for UnreachableBackend {
    fn reachable_from(&self, _seed: u64) -> Result<Vec<Constraint>, BackendError> {
        Err(BackendError(self.reason.clone()))
    }
}
