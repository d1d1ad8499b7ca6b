//! pointercore-core
//!
//! Entity model (AST nodes, statement sides, constraints), the error type,
//! and configuration shared by every other crate in the workspace.

pub mod config;
pub mod error;
pub mod location;
pub mod types;

pub use config::{AnalysisConfig, Config};
pub use error::{Error, Result};
pub use location::Location;
pub use types::*;
