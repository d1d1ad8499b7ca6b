//! Core entity model: AST nodes, statement sides, and constraints.
//!
//! This is the vocabulary every other crate in the workspace shares. Nothing
//! here knows about tree-sitter, sled, or any particular solver — it is pure
//! data plus the stable hash that gives every entity its identity.

use crate::location::Location;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// FNV-1a offset basis / prime, 64-bit. Fixed so the hash is reproducible
/// across runs (`DefaultHasher` is randomly seeded per process and cannot be
/// used as a durable cache key).
const FNV_OFFSET_BASIS: u64 = 0xcbf29ce484222325;
const FNV_PRIME: u64 = 0x100000001b3;

/// Stable 64-bit hash over arbitrary bytes. Used for `mangledNameHash`: a
/// mangled name, optionally suffixed with `fileId:line:column` to distinguish
/// per-occurrence anonymous producers (`nullptr`, `new T`, string literals).
pub fn fnv_hash(bytes: &[u8]) -> u64 {
    let mut hash = FNV_OFFSET_BASIS;
    for &b in bytes {
        hash ^= b as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Hashes a mangled name together with a location suffix, matching the
/// `fileId:line:column` discipline that keeps distinct syntactic occurrences
/// of anonymous producers apart while letting declarations of the same named
/// entity share one hash (when `suffix` is `None`).
pub fn mangled_name_hash(mangled_name: &str, suffix: Option<&Location>) -> u64 {
    match suffix {
        None => fnv_hash(mangled_name.as_bytes()),
        Some(loc) => {
            let with_suffix = format!("{mangled_name}@{}:{}:{}", loc.file, loc.line, loc.column);
            fnv_hash(with_suffix.as_bytes())
        }
    }
}

/// How an AST node was introduced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AstKind {
    Declaration,
    Definition,
    Other,
}

/// The kind of symbol an AST node denotes, independent of its pointer-analysis
/// options (useful for presentation and diagnostics).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SymbolKind {
    Variable,
    Parameter,
    Member,
    Function,
    Literal,
    Anonymous,
}

/// A uniquely hashed record for one interesting point in the program.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AstNode {
    pub hash: u64,
    pub mangled_name: String,
    /// Displayable value, e.g. `"nullptr"` or a variable name.
    pub ast_value: String,
    pub location: Option<Location>,
    pub kind: AstKind,
    pub symbol_kind: SymbolKind,
}

impl AstNode {
    pub fn new(
        mangled_name: impl Into<String>,
        ast_value: impl Into<String>,
        location: Option<Location>,
        kind: AstKind,
        symbol_kind: SymbolKind,
        hash: u64,
    ) -> Self {
        Self {
            hash,
            mangled_name: mangled_name.into(),
            ast_value: ast_value.into(),
            location,
            kind,
            symbol_kind,
        }
    }
}

/// The closed set of tags a statement side may carry. Ordinal order below is
/// the wire encoding referenced by `Constraint`'s serialization (§6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum StmtOption {
    /// Result of `new` / `malloc` / `calloc` / `realloc`.
    HeapObj = 0,
    /// Local variable or parameter.
    StackObj = 1,
    /// File-scope, static, or static data member.
    GlobalObject = 2,
    /// `nullptr` / `NULL`.
    NullPtr = 3,
    /// Declared reference type.
    Reference = 4,
    /// Opaque call result (return-flow was not inlined).
    FunctionCall = 5,
    /// Expression produced by return-flow inlining.
    Return = 6,
    /// Function parameter.
    Param = 7,
    /// Class/struct member access.
    Member = 8,
    /// String literal.
    Literal = 9,
    /// Uninitialized storage.
    Undefined = 10,
}

/// The abstract unit of a constraint: `(hash, operators, options)`.
///
/// Two statement sides are equal iff their `hash` values are equal —
/// `operators` and `options` are metadata that travel with the location, not
/// identity. This is why `PartialEq`/`Eq`/`Hash` are implemented by hand
/// instead of derived: a derive would compare all three fields and silently
/// break every dedup-by-hash invariant the rest of the system relies on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StmtSide {
    pub hash: u64,
    /// Drawn from the alphabet `{'*', '&'}`, applied left-to-right
    /// (outermost first): `""` is the entity itself, `"*"` one dereference,
    /// `"&"` address-of, `"**"` double deref.
    pub operators: String,
    pub options: BTreeSet<StmtOption>,
}

impl StmtSide {
    pub fn bare(hash: u64) -> Self {
        Self {
            hash,
            operators: String::new(),
            options: BTreeSet::new(),
        }
    }

    pub fn new(hash: u64, operators: impl Into<String>, options: BTreeSet<StmtOption>) -> Self {
        Self {
            hash,
            operators: operators.into(),
            options,
        }
    }

    pub fn has_option(&self, opt: StmtOption) -> bool {
        self.options.contains(&opt)
    }

    pub fn is_reference(&self) -> bool {
        self.has_option(StmtOption::Reference)
    }

    /// Same hash, operators stripped of their leading character.
    pub fn with_operators(&self, operators: impl Into<String>) -> Self {
        Self {
            hash: self.hash,
            operators: operators.into(),
            options: self.options.clone(),
        }
    }

    /// Same hash/options, operators cleared entirely.
    pub fn stripped(&self) -> Self {
        self.with_operators(String::new())
    }
}

impl PartialEq for StmtSide {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
    }
}

impl Eq for StmtSide {}

impl PartialOrd for StmtSide {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for StmtSide {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.hash.cmp(&other.hash)
    }
}

impl std::hash::Hash for StmtSide {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.hash.hash(state);
    }
}

/// An assignment `lhs ← rhs` over statement sides. `id` is a 64-bit hash of
/// `lhs.hash ∥ rhs.hash`, used solely for deduplication in the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Constraint {
    pub id: u64,
    pub lhs: StmtSide,
    pub rhs: StmtSide,
}

impl Constraint {
    pub fn new(lhs: StmtSide, rhs: StmtSide) -> Self {
        let id = constraint_id(lhs.hash, rhs.hash);
        Self { id, lhs, rhs }
    }

    /// Whether the RHS is syntactically `&x`, a heap allocation, null, a
    /// literal, or an opaque call result — i.e. the LHS should be considered
    /// to point directly at the RHS rather than at whatever the RHS points to.
    pub fn is_direct_points_to(&self) -> bool {
        self.lhs.is_reference()
            || self.rhs.options.iter().any(|o| {
                matches!(
                    o,
                    StmtOption::NullPtr
                        | StmtOption::HeapObj
                        | StmtOption::Undefined
                        | StmtOption::Literal
                        | StmtOption::FunctionCall
                )
            })
    }

    /// `lhs.operators == ""` and `rhs.operators == "&"` exactly (not merely
    /// "starts with `&`").
    pub fn is_simple(&self) -> bool {
        self.lhs.operators.is_empty() && self.rhs.operators == "&"
    }
}

/// `id` is the hash of the two hashes' decimal-string concatenation, matching
/// the reference system's constraint-id derivation (no delimiter between the
/// two numbers).
pub fn constraint_id(lhs_hash: u64, rhs_hash: u64) -> u64 {
    let concatenated = format!("{lhs_hash}{rhs_hash}");
    fnv_hash(concatenated.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stmt_side_equality_is_hash_only() {
        let a = StmtSide::new(42, "*", BTreeSet::from([StmtOption::Param]));
        let b = StmtSide::new(42, "", BTreeSet::from([StmtOption::Reference]));
        assert_eq!(a, b);
    }

    #[test]
    fn fnv_hash_is_deterministic() {
        assert_eq!(fnv_hash(b"foo"), fnv_hash(b"foo"));
        assert_ne!(fnv_hash(b"foo"), fnv_hash(b"bar"));
    }

    #[test]
    fn constraint_id_is_order_sensitive() {
        assert_ne!(constraint_id(1, 2), constraint_id(2, 1));
    }

    #[test]
    fn is_simple_requires_exact_ampersand() {
        let lhs = StmtSide::bare(1);
        let rhs_simple = StmtSide::new(2, "&", BTreeSet::new());
        let rhs_deref_addr = StmtSide::new(2, "&*", BTreeSet::new());
        assert!(Constraint::new(lhs.clone(), rhs_simple).is_simple());
        assert!(!Constraint::new(lhs, rhs_deref_addr).is_simple());
    }
}
