//! The constraint store (C4): append-only, indexed on `lhs.hash` and
//! `rhs.hash`, primary-keyed by constraint `id`. Backed by `sled`, mirroring
//! the tree-per-entity-kind storage pattern used elsewhere in this codebase.

use pointercore_core::{AstNode, Constraint};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Index entry: the list of constraint ids touching one hash.
#[derive(Default, Serialize, Deserialize)]
struct IdList(Vec<u64>);

/// Append-only constraint store.
///
/// Writers go through a single-writer discipline at the call site (spec §5:
/// "a single writer lock during insertion") — this type itself is `Sync` via
/// sled's own internal locking, so the lock lives one layer up, in
/// `MangledNameCache`'s companion `Mutex`, guarding the combined
/// insert-constraint-and-intern-name sequence.
pub struct ConstraintStore {
    db: sled::Db,
    constraints: sled::Tree,
    ast_nodes: sled::Tree,
    lhs_index: sled::Tree,
    rhs_index: sled::Tree,
}

impl ConstraintStore {
    pub fn open(path: &Path) -> Result<Self> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    pub fn in_memory() -> Result<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: sled::Db) -> Result<Self> {
        let constraints = db.open_tree("constraints")?;
        let ast_nodes = db.open_tree("ast_nodes")?;
        let lhs_index = db.open_tree("lhs_index")?;
        let rhs_index = db.open_tree("rhs_index")?;
        Ok(Self {
            db,
            constraints,
            ast_nodes,
            lhs_index,
            rhs_index,
        })
    }

    /// Persist one constraint. Idempotent: re-persisting a constraint with
    /// the same `id` overwrites the existing entry and does not duplicate
    /// index entries (I3, idempotent extraction).
    pub fn persist_constraint(&self, c: &Constraint) -> Result<()> {
        let key = c.id.to_be_bytes();
        let value = serde_json::to_vec(c)?;
        self.constraints.insert(key, value)?;
        self.append_to_index(&self.lhs_index, c.lhs.hash, c.id)?;
        self.append_to_index(&self.rhs_index, c.rhs.hash, c.id)?;
        Ok(())
    }

    /// Persist a batch inside one conceptual transaction (spec §6:
    /// "Transactions are required to bracket bulk persist operations").
    pub fn persist_constraints(&self, constraints: &[Constraint]) -> Result<()> {
        for c in constraints {
            self.persist_constraint(c)?;
        }
        self.db.flush()?;
        Ok(())
    }

    pub fn persist_ast_node(&self, node: &AstNode) -> Result<()> {
        let key = node.hash.to_be_bytes();
        let value = serde_json::to_vec(node)?;
        self.ast_nodes.insert(key, value)?;
        Ok(())
    }

    /// `query<AstNode>(hash = H ∧ kind ∈ {Declaration, Definition, Other})` —
    /// every stored node already satisfies the kind predicate (those are the
    /// only kinds `AstKind` has), so this is a direct lookup.
    pub fn get_ast_node(&self, hash: u64) -> Result<Option<AstNode>> {
        match self.ast_nodes.get(hash.to_be_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// `query<Constraint>(lhs.hash = H ∨ rhs.hash = H)`.
    pub fn constraints_touching(&self, hash: u64) -> Result<Vec<Constraint>> {
        let mut ids: Vec<u64> = self.read_index(&self.lhs_index, hash)?;
        ids.extend(self.read_index(&self.rhs_index, hash)?);
        ids.sort_unstable();
        ids.dedup();

        let mut result = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(bytes) = self.constraints.get(id.to_be_bytes())? {
                result.push(serde_json::from_slice(&bytes)?);
            }
        }
        Ok(result)
    }

    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    fn append_to_index(&self, tree: &sled::Tree, hash: u64, id: u64) -> Result<()> {
        let key = hash.to_be_bytes();
        let mut list: IdList = match tree.get(key)? {
            Some(bytes) => serde_json::from_slice(&bytes)?,
            None => IdList::default(),
        };
        if !list.0.contains(&id) {
            list.0.push(id);
            tree.insert(key, serde_json::to_vec(&list)?)?;
        }
        Ok(())
    }

    fn read_index(&self, tree: &sled::Tree, hash: u64) -> Result<Vec<u64>> {
        match tree.get(hash.to_be_bytes())? {
            Some(bytes) => Ok(serde_json::from_slice::<IdList>(&bytes)?.0),
            None => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pointercore_core::StmtSide;

    #[test]
    fn round_trips_a_constraint_through_both_indices() {
        let store = ConstraintStore::in_memory().unwrap();
        let c = Constraint::new(StmtSide::bare(1), StmtSide::new(2, "&", Default::default()));
        store.persist_constraint(&c).unwrap();

        let by_lhs = store.constraints_touching(1).unwrap();
        let by_rhs = store.constraints_touching(2).unwrap();
        assert_eq!(by_lhs.len(), 1);
        assert_eq!(by_rhs.len(), 1);
        assert_eq!(by_lhs[0].id, c.id);
    }

    #[test]
    fn re_persisting_is_idempotent() {
        let store = ConstraintStore::in_memory().unwrap();
        let c = Constraint::new(StmtSide::bare(1), StmtSide::new(2, "&", Default::default()));
        store.persist_constraint(&c).unwrap();
        store.persist_constraint(&c).unwrap();
        assert_eq!(store.constraints_touching(1).unwrap().len(), 1);
    }
}
