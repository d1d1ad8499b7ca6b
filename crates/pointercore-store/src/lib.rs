//! pointercore-store
//!
//! Persistent storage for the points-to constraint graph (C4), the
//! mangled-name/AST-node dedup cache (C2), and the reachability slicer that
//! seeds both solvers and the result presenter.

pub mod cache;
pub mod graph_backend;
pub mod slicer;
pub mod store;

pub use cache::MangledNameCache;
pub use graph_backend::{BackendError, GraphBackend, UnreachableBackend};
pub use slicer::{slice, slice_with_backend};
pub use store::{ConstraintStore, StoreError};
