use std::sync::atomic::{AtomicUsize, Ordering};

use super::{Iterable, Object};

#[derive(Debug, Default)]
pub struct Array {
    pub elements: Vec<Object>,
    /// Marks the `...` array of a call; it is spliced when passed as an argument.
    pub current_args: bool,
    offset: AtomicUsize,
}

impl Array {
    pub fn new(elements: Vec<Object>) -> Self {
        Self {
            elements,
            current_args: false,
            offset: AtomicUsize::new(0),
        }
    }

    pub fn current_args(elements: Vec<Object>) -> Self {
        Self {
            current_args: true,
            ..Self::new(elements)
        }
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

impl Iterable for Array {
    fn reset(&self) {
        self.offset.store(0, Ordering::SeqCst);
    }

    fn next(&self) -> Option<(Object, Object)> {
        let len = self.elements.len();
        let position = self
            .offset
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |offset| {
                (offset < len).then_some(offset + 1)
            })
            .ok()?;
        Some((
            self.elements[position].clone(),
            Object::Integer(position as i64),
        ))
    }
}
