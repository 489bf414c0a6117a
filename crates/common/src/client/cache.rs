use std::collections::HashMap;

use crate::crypto::AesKey;

/// Decrypted pairwise keys for the life of one session
///
/// Keyed by `<reader>:shared_key<writer>`. Only grows; never persisted.
#[derive(Debug, Default)]
pub struct SharedKeyCache {
    keys: HashMap<String, AesKey>,
}

impl SharedKeyCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&AesKey> {
        self.keys.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.keys.contains_key(name)
    }

    pub fn insert(&mut self, name: String, key: AesKey) {
        self.keys.insert(name, key);
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
