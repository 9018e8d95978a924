use std::sync::atomic::{AtomicUsize, Ordering};

use super::{Iterable, Object};

/// Multi-line documentation text. Hashable, iterates by character.
#[derive(Debug, Default)]
pub struct DocString {
    value: String,
    offset: AtomicUsize,
}

impl DocString {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            offset: AtomicUsize::new(0),
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn char_count(&self) -> usize {
        self.value.chars().count()
    }
}

impl Iterable for DocString {
    fn reset(&self) {
        self.offset.store(0, Ordering::SeqCst);
    }

    fn next(&self) -> Option<(Object, Object)> {
        let len = self.char_count();
        let position = self
            .offset
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |offset| {
                (offset < len).then_some(offset + 1)
            })
            .ok()?;
        let character = self.value.chars().nth(position)?;
        Some((
            Object::docstring(character.to_string()),
            Object::Integer(position as i64),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_iterates_characters() {
        let doc = DocString::new("hé");
        assert_eq!(doc.char_count(), 2);
        assert_eq!(doc.next(), Some((Object::docstring("h"), Object::from(0))));
        assert_eq!(doc.next(), Some((Object::docstring("é"), Object::from(1))));
        assert_eq!(doc.next(), None);
    }
}
