//! Configuration types
//!
//! Per spec §6, the core itself recognizes exactly one option: a
//! `neo4j=<connection string>` that enables the optional graph-database
//! back-end for the slicer. Everything else here is ambient plumbing (where
//! the local store lives, how long a query may run) that the CLI layers on
//! top without adding any new analysis-facing surface.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// pointercore configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub store: StoreConfig,
    pub analysis: AnalysisConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            analysis: AnalysisConfig::default(),
        }
    }
}

/// Constraint store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Path to the local `sled` store. Defaults to `./.pointercore/store`.
    pub path: Option<PathBuf>,

    /// `neo4j=<connection string>` — when present, the slicer delegates
    /// reachability to the configured remote graph database instead of the
    /// local store. Its absence selects the local store.
    pub neo4j: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: None,
            neo4j: None,
        }
    }
}

/// Analysis-time knobs. None of these change constraint-extraction or
/// solver *semantics* — they bound how long a query may run, which spec §5
/// explicitly leaves to the caller ("there is no internal deadline").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Caller-enforced wall-clock budget for one query. `None` means no
    /// timeout is applied; cancellation is still cooperative (checked
    /// between worklist iterations), never preemptive.
    #[serde(with = "duration_opt_secs")]
    pub cancel_after: Option<Duration>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self { cancel_after: None }
    }
}

mod duration_opt_secs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(v: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        v.map(|d| d.as_secs()).serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(d)?.map(Duration::from_secs))
    }
}
