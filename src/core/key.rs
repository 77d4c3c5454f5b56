//! Hashed asset keys

use std::fmt;
use std::hash::{Hash, Hasher};

use rustc_hash::FxHasher;
use serde::{Deserialize, Serialize};

/// Stable identity of one asset slot in the registry.
///
/// A key keeps its human-readable name for diagnostics, but identity is
/// decided by a hash computed once at construction: two keys are equal iff
/// their hashes are equal.
#[derive(Clone, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Key {
    name: String,
    hash: u64,
}

impl Key {
    /// Create a key from a name
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let hash = hash_name(&name);
        Self { name, hash }
    }

    /// The name this key was built from
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The precomputed hash
    #[must_use]
    pub const fn hash_value(&self) -> u64 {
        self.hash
    }
}

fn hash_name(name: &str) -> u64 {
    let mut hasher = FxHasher::default();
    name.hash(&mut hasher);
    hasher.finish()
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
    }
}

impl Eq for Key {}

impl Hash for Key {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key({:?}, {:#018x})", self.name, self.hash)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl From<&str> for Key {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for Key {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

impl From<&Key> for Key {
    fn from(key: &Key) -> Self {
        key.clone()
    }
}

impl From<Key> for String {
    fn from(key: Key) -> Self {
        key.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustc_hash::FxHashSet;

    #[test]
    fn test_same_name_same_key() {
        let a = Key::new("mesh1");
        let b = Key::from("mesh1");
        assert_eq!(a, b);
        assert_eq!(a.hash_value(), b.hash_value());
        assert_eq!(a.name(), "mesh1");
    }

    #[test]
    fn test_different_names_differ() {
        assert_ne!(Key::new("mesh1"), Key::new("mesh2"));
    }

    #[test]
    fn test_usable_as_set_member() {
        let mut set = FxHashSet::default();
        set.insert(Key::new("tex1"));
        assert!(set.contains(&Key::new("tex1")));
        assert!(!set.insert(Key::new("tex1")));
    }

    #[test]
    fn test_display_uses_name() {
        assert_eq!(Key::new("shaders/pbr").to_string(), "shaders/pbr");
    }

    #[test]
    fn test_serde_as_plain_name() {
        let key = Key::new("tex1");
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, "\"tex1\"");

        let loaded: Key = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded, key);
        assert_eq!(loaded.hash_value(), key.hash_value());
    }
}
