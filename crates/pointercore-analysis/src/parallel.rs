//! Parallel extraction across independent translation units (spec §5):
//! "Extraction may run in parallel across independent translation units;
//! each unit owns its own AST-node cache and appends to the shared store
//! under a mutex guarding the constraint index and the per-hash dedup set."
//!
//! Each translation unit is extracted by its own `ExtractionContext` (no
//! state shared across units except the cache and the store, both of which
//! are already safe for concurrent access — `MangledNameCache` behind its
//! own `Mutex`, `ConstraintStore` behind `sled`'s internal locking). This
//! mirrors `pointercore_ast::parallel::ParallelSource`'s `par_iter` shape,
//! generalized from "parse a batch of files" to "extract a batch of parsed
//! units".

use crate::extractor::{extract, ExtractionOutput};
use pointercore_ast::ast::TranslationUnit;
use pointercore_core::Result;
use pointercore_store::{ConstraintStore, MangledNameCache};
use rayon::prelude::*;
use tracing::debug;

/// One translation unit's extraction-and-persist outcome.
pub struct UnitResult {
    pub file: String,
    pub constraints_persisted: usize,
}

/// Extracts and persists every unit in `units` concurrently. `cache` is
/// shared across all units (spec §5: "the only cross-unit shared state is
/// the constraint store and a mangled-name-to-hash map"); `store` absorbs
/// each unit's output as soon as it is ready, independent of the others'
/// progress.
///
/// A single unit's store-transaction failure propagates to the caller (spec
/// §7: transactional failures are not swallowed like per-node/per-constraint
/// errors); units that already persisted are unaffected.
pub fn extract_parallel(
    units: &[TranslationUnit],
    cache: &MangledNameCache,
    store: &ConstraintStore,
) -> Result<Vec<UnitResult>> {
    units
        .par_iter()
        .map(|tu| -> Result<UnitResult> {
            let ExtractionOutput {
                constraints,
                ast_nodes,
            } = extract(tu, cache);

            for node in &ast_nodes {
                store
                    .persist_ast_node(node)
                    .map_err(|e| pointercore_core::Error::Store(e.to_string()))?;
            }
            store
                .persist_constraints(&constraints)
                .map_err(|e| pointercore_core::Error::Store(e.to_string()))?;

            debug!(file = %tu.file, constraints = constraints.len(), "unit extracted and persisted");
            Ok(UnitResult {
                file: tu.file.clone(),
                constraints_persisted: constraints.len(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pointercore_ast::ast::{Expr, StorageClass, TopLevelDecl, TypeInfo, VarDecl};
    use pointercore_core::Location;

    fn pointer_unit(file: &str, var_name: &str) -> TranslationUnit {
        TranslationUnit {
            file: file.into(),
            decls: vec![TopLevelDecl::Variable(VarDecl {
                mangled_name: var_name.into(),
                type_info: TypeInfo {
                    name: "int*".into(),
                    is_pointer: true,
                    is_reference: false,
                    is_array: false,
                },
                storage: StorageClass::Local,
                initializer: Some(Expr::NullPtr {
                    location: Location::new(file, 1, 0),
                }),
                location: Location::new(file, 1, 0),
            })],
        }
    }

    #[test]
    fn extracts_and_persists_independent_units_concurrently() {
        let units = vec![
            pointer_unit("a.cpp", "p_a"),
            pointer_unit("b.cpp", "p_b"),
            pointer_unit("c.cpp", "p_c"),
        ];
        let cache = MangledNameCache::new();
        let store = ConstraintStore::in_memory().unwrap();

        let results = extract_parallel(&units, &cache, &store).unwrap();
        assert_eq!(results.len(), 3);
        for r in &results {
            assert_eq!(r.constraints_persisted, 1);
        }
        assert_eq!(store.len(), 3);
    }
}
