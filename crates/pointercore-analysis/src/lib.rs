//! pointercore-analysis
//!
//! Extracts constraints from a parsed translation unit (C3) and resolves
//! points-to information from them with two interchangeable solvers (C5,
//! C6), then renders either solver's output for presentation (C7).

pub mod andersen;
pub mod extractor;
pub mod parallel;
pub mod presenter;
pub mod steensgaard;

pub use andersen::{AndersenResult, AndersenSolver, PointsToSet};
pub use extractor::{extract, ExtractionOutput};
pub use parallel::{extract_parallel, UnitResult};
pub use presenter::{
    present_andersen, present_steensgaard, NodeContainer, NodeShape, PresentedEdge,
    PresentedGraph, PresentedNode,
};
pub use steensgaard::{SteensgaardResult, SteensgaardSolver};
