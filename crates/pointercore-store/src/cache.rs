//! AST-node cache / mangled-name index (C2).
//!
//! Deduplicates abstract locations by stable hash. One instance is shared
//! across all translation units being extracted in parallel (spec §5); a
//! single mutex guards insertion, matching the reference system's
//! mutex-guarded `unordered_map<AstNodeId, u64>`.

use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Default)]
pub struct MangledNameCache {
    inner: Mutex<HashMap<String, u64>>,
}

impl MangledNameCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the hash for a mangled name, overwriting any previous value.
    pub fn insert(&self, mangled_name: impl Into<String>, hash: u64) {
        let mut guard = self.inner.lock().expect("mangled name cache poisoned");
        guard.insert(mangled_name.into(), hash);
    }

    /// Looks up a previously interned hash.
    pub fn at(&self, mangled_name: &str) -> Option<u64> {
        let guard = self.inner.lock().expect("mangled name cache poisoned");
        guard.get(mangled_name).copied()
    }

    /// Interns `mangled_name` if it hasn't been seen before. Returns whether
    /// this call is the one that created the entry — the extractor uses that
    /// to decide whether to emit a fresh `AstNode` for it.
    pub fn insert_if_new(&self, mangled_name: impl Into<String>, hash: u64) -> bool {
        let mut guard = self.inner.lock().expect("mangled name cache poisoned");
        let mangled_name = mangled_name.into();
        if guard.contains_key(&mangled_name) {
            false
        } else {
            guard.insert(mangled_name, hash);
            true
        }
    }

    pub fn contains(&self, mangled_name: &str) -> bool {
        let guard = self.inner.lock().expect("mangled name cache poisoned");
        guard.contains_key(mangled_name)
    }

    pub fn clear(&self) {
        let mut guard = self.inner.lock().expect("mangled name cache poisoned");
        guard.clear();
    }

    pub fn len(&self) -> usize {
        let guard = self.inner.lock().expect("mangled name cache poisoned");
        guard.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inserts_and_looks_up() {
        let cache = MangledNameCache::new();
        cache.insert("foo::bar", 42);
        assert_eq!(cache.at("foo::bar"), Some(42));
        assert!(cache.contains("foo::bar"));
        assert_eq!(cache.at("missing"), None);
    }
}
