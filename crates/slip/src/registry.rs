//! Per-interpreter type registry.
//!
//! Christening assigns each named scope a canonical absolute path and a
//! unique integer type id, monotonic within the interpreter instance. The
//! registry is owned by the interpreter; there is no process-wide state.

use ahash::AHashMap;

/// Unique identifier for a christened type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(u32);

impl TypeId {
    #[inline]
    #[must_use]
    pub fn raw(self) -> u32 {
        self.0
    }
}

#[derive(Debug, Default)]
pub struct TypeRegistry {
    by_path: AHashMap<String, TypeId>,
    paths: Vec<String>,
}

impl TypeRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the type id for a canonical path, allocating a fresh one on
    /// first sight. Registration is idempotent per path.
    pub fn register(&mut self, canonical_path: &str) -> TypeId {
        if let Some(id) = self.by_path.get(canonical_path) {
            return *id;
        }
        let id = TypeId(u32::try_from(self.paths.len()).expect("type registry overflow"));
        self.by_path.insert(canonical_path.to_owned(), id);
        self.paths.push(canonical_path.to_owned());
        id
    }

    #[must_use]
    pub fn lookup(&self, canonical_path: &str) -> Option<TypeId> {
        self.by_path.get(canonical_path).copied()
    }

    #[must_use]
    pub fn path_of(&self, id: TypeId) -> Option<&str> {
        self.paths.get(id.0 as usize).map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_monotonic_and_idempotent() {
        let mut reg = TypeRegistry::new();
        let a = reg.register("Being");
        let b = reg.register("Character");
        assert!(a < b);
        assert_eq!(reg.register("Being"), a);
        assert_eq!(reg.path_of(b), Some("Character"));
    }
}
