use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use indexmap::IndexMap;

use super::{Iterable, Object, ObjectType};

/// Structural identity of a hashable object: type plus value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HashKey {
    Boolean(bool),
    Integer(i64),
    /// Bit pattern of the float.
    Float(u64),
    String(Arc<str>),
    DocString(String),
    Regexp { pattern: String, flags: String },
}

/// The original key object is kept next to the value so keys can be
/// handed back to scripts.
#[derive(Debug, Clone)]
pub struct HashPair {
    pub key: Object,
    pub value: Object,
}

/// Insertion ordered map from hashable objects to values.
#[derive(Debug, Default)]
pub struct Hash {
    pairs: IndexMap<HashKey, HashPair>,
    offset: AtomicUsize,
}

impl Hash {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails with the key's type when the key is not hashable.
    pub fn insert(&mut self, key: Object, value: Object) -> Result<Option<Object>, ObjectType> {
        let hash_key = key.hash_key().ok_or_else(|| key.object_type())?;
        Ok(self
            .pairs
            .insert(hash_key, HashPair { key, value })
            .map(|previous| previous.value))
    }

    pub fn insert_str(&mut self, key: &str, value: Object) {
        self.pairs.insert(
            HashKey::String(Arc::from(key)),
            HashPair {
                key: Object::from(key),
                value,
            },
        );
    }

    /// `Ok(None)` for a missing key, `Err` with the key's type when the
    /// key cannot be hashed at all.
    pub fn get(&self, key: &Object) -> Result<Option<&Object>, ObjectType> {
        let hash_key = key.hash_key().ok_or_else(|| key.object_type())?;
        Ok(self.pairs.get(&hash_key).map(|pair| &pair.value))
    }

    pub fn get_str(&self, key: &str) -> Option<&Object> {
        self.pairs
            .get(&HashKey::String(Arc::from(key)))
            .map(|pair| &pair.value)
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn pairs(&self) -> impl Iterator<Item = &HashPair> {
        self.pairs.values()
    }

    pub fn keys(&self) -> impl Iterator<Item = &Object> {
        self.pairs.values().map(|pair| &pair.key)
    }

    pub fn values(&self) -> impl Iterator<Item = &Object> {
        self.pairs.values().map(|pair| &pair.value)
    }
}

impl Iterable for Hash {
    fn reset(&self) {
        self.offset.store(0, Ordering::SeqCst);
    }

    fn next(&self) -> Option<(Object, Object)> {
        let len = self.pairs.len();
        let position = self
            .offset
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |offset| {
                (offset < len).then_some(offset + 1)
            })
            .ok()?;
        let (_, pair) = self.pairs.get_index(position)?;
        Some((pair.value.clone(), pair.key.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::Object;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_equal_keys_collide() {
        let mut hash = Hash::new();
        hash.insert(Object::from("a"), Object::from(1)).unwrap();
        let previous = hash.insert(Object::from("a"), Object::from(2)).unwrap();

        assert_eq!(previous, Some(Object::from(1)));
        assert_eq!(hash.len(), 1);
        assert_eq!(hash.get(&Object::from("a")), Ok(Some(&Object::from(2))));
    }

    #[test]
    fn test_missing_and_unhashable_keys() {
        let hash = Hash::new();
        assert_eq!(hash.get(&Object::from(1)), Ok(None));
        assert_eq!(
            hash.get(&Object::array(vec![])),
            Err(ObjectType::Array)
        );

        let mut hash = Hash::new();
        assert_eq!(
            hash.insert(Object::Null, Object::from(1)),
            Err(ObjectType::Null)
        );
    }

    #[test]
    fn test_iteration_keeps_insertion_order() {
        let mut hash = Hash::new();
        hash.insert(Object::from("b"), Object::from(2)).unwrap();
        hash.insert(Object::from(true), Object::from("yes")).unwrap();

        assert_eq!(hash.next(), Some((Object::from(2), Object::from("b"))));
        assert_eq!(hash.next(), Some((Object::from("yes"), Object::from(true))));
        assert_eq!(hash.next(), None);
        hash.reset();
        assert_eq!(hash.next(), Some((Object::from(2), Object::from("b"))));
    }
}
