//! Parallel parsing of independent translation units.
//!
//! Spec §5: "Extraction may run in parallel across independent translation
//! units; each unit owns its own AST-node cache." This module owns only the
//! parallel-parse step (turning source files into `TranslationUnit`s); each
//! unit's own hash/cache bookkeeping happens downstream, in the extractor.

use crate::treesitter::TreeSitterAstSource;
use pointercore_core::Result;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, info};
use walkdir::WalkDir;

/// Progress callback type
pub type ProgressCallback = Box<dyn Fn(ProgressEvent) + Send + Sync>;

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub phase: ProgressPhase,
    pub current: usize,
    pub total: usize,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressPhase {
    Scanning,
    Parsing,
    Complete,
}

/// Parses a batch of files into translation units, one tree-sitter parse per
/// file, fanned out over a rayon thread pool.
pub struct ParallelSource {
    progress_callback: Option<Arc<ProgressCallback>>,
}

impl ParallelSource {
    pub fn new() -> Self {
        Self {
            progress_callback: None,
        }
    }

    pub fn with_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressEvent) + Send + Sync + 'static,
    {
        self.progress_callback = Some(Arc::new(Box::new(callback)));
        self
    }

    /// Parse multiple files in parallel. A per-file parse failure is
    /// reported in its own slot rather than aborting the batch.
    pub fn parse_files(&self, paths: &[PathBuf]) -> Vec<(PathBuf, Result<TreeSitterAstSource>)> {
        let total = paths.len();
        let processed = AtomicUsize::new(0);

        self.emit_progress(ProgressPhase::Parsing, 0, total, "Starting parallel parse...");

        let results: Vec<_> = paths
            .par_iter()
            .map(|path| {
                let result = self.parse_one(path);

                let current = processed.fetch_add(1, Ordering::SeqCst) + 1;
                if current % 10 == 0 || current == total {
                    self.emit_progress(
                        ProgressPhase::Parsing,
                        current,
                        total,
                        format!("Parsed {}/{} files", current, total),
                    );
                }

                (path.clone(), result)
            })
            .collect();

        self.emit_progress(ProgressPhase::Complete, total, total, "Parsing complete");
        results
    }

    pub fn parse_directory(
        &self,
        dir: &Path,
        extensions: &[&str],
    ) -> Vec<(PathBuf, Result<TreeSitterAstSource>)> {
        self.emit_progress(ProgressPhase::Scanning, 0, 0, "Scanning directory...");

        let paths: Vec<PathBuf> = WalkDir::new(dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| {
                e.path()
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| extensions.contains(&ext))
                    .unwrap_or(false)
            })
            .map(|e| e.path().to_path_buf())
            .collect();

        info!("Found {} files to parse", paths.len());
        self.emit_progress(
            ProgressPhase::Scanning,
            paths.len(),
            paths.len(),
            format!("Found {} files", paths.len()),
        );

        self.parse_files(&paths)
    }

    fn parse_one(&self, path: &Path) -> Result<TreeSitterAstSource> {
        let content = std::fs::read_to_string(path)?;
        debug!("Parsing {:?}", path);
        let filename = path.to_string_lossy();
        TreeSitterAstSource::parse(&content, &filename)
            .map_err(pointercore_core::Error::Other)
    }

    fn emit_progress<S: Into<String>>(&self, phase: ProgressPhase, current: usize, total: usize, message: S) {
        if let Some(ref callback) = self.progress_callback {
            callback(ProgressEvent {
                phase,
                current,
                total,
                message: message.into(),
            });
        }
    }
}

impl Default for ParallelSource {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::AstSource;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn parses_a_directory_of_files_in_parallel() {
        let dir = TempDir::new().unwrap();

        for i in 0..5 {
            let path = dir.path().join(format!("test{i}.cpp"));
            let mut file = std::fs::File::create(&path).unwrap();
            writeln!(file, "void func{i}() {{}}").unwrap();
        }

        let source = ParallelSource::new();
        let results = source.parse_directory(dir.path(), &["cpp"]);

        assert_eq!(results.len(), 5);
        for (_, result) in results {
            let source = result.unwrap();
            assert_eq!(source.translation_unit().decls.len(), 1);
        }
    }
}
