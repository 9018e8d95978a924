//! Runtime values.
//!
//! Scalars are held inline. Containers, functions and errors sit behind
//! `Arc` so copies of an `Object` share identity, which is what `==` on
//! containers compares.

use core::fmt;
use std::sync::Arc;

use strum::Display;

mod array;
mod docstring;
mod error;
mod function;
mod hash;
mod methods;
mod regexp;

pub use array::Array;
pub use docstring::DocString;
pub use error::{ErrorObject, ErrorOrigin};
pub use function::{Closure, Function};
pub use hash::{Hash, HashKey, HashPair};
pub use regexp::Regexp;

use crate::builtins::Builtin;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum ObjectType {
    #[strum(serialize = "NULL")]
    Null,
    #[strum(serialize = "BOOLEAN")]
    Boolean,
    #[strum(serialize = "INTEGER")]
    Integer,
    #[strum(serialize = "FLOAT")]
    Float,
    #[strum(serialize = "STRING")]
    String,
    #[strum(serialize = "DOCSTRING")]
    DocString,
    #[strum(serialize = "REGEXP")]
    Regexp,
    #[strum(serialize = "ARRAY")]
    Array,
    #[strum(serialize = "HASH")]
    Hash,
    #[strum(serialize = "FUNCTION")]
    Function,
    #[strum(serialize = "BUILTIN")]
    Builtin,
    #[strum(serialize = "ERROR")]
    Error,
}

impl ObjectType {
    /// Prefix of registry entries that act as methods on this type,
    /// e.g. `string` for `string.trim`.
    pub fn namespace(self) -> String {
        self.to_string().to_lowercase()
    }
}

/// Restartable traversal owned by an iterable object.
///
/// `next` yields `(value, key)` pairs: elements with their position for
/// arrays, values with their key for hashes, characters with their
/// position for doc strings.
pub trait Iterable: Send + Sync {
    fn reset(&self);
    fn next(&self) -> Option<(Object, Object)>;
}

#[derive(Clone)]
pub enum Object {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(Arc<str>),
    DocString(Arc<DocString>),
    Regexp(Arc<Regexp>),
    Array(Arc<Array>),
    Hash(Arc<Hash>),
    Function(Closure),
    Builtin(Builtin),
    Error(Arc<ErrorObject>),
}

impl Object {
    pub fn object_type(&self) -> ObjectType {
        match self {
            Object::Null => ObjectType::Null,
            Object::Boolean(_) => ObjectType::Boolean,
            Object::Integer(_) => ObjectType::Integer,
            Object::Float(_) => ObjectType::Float,
            Object::String(_) => ObjectType::String,
            Object::DocString(_) => ObjectType::DocString,
            Object::Regexp(_) => ObjectType::Regexp,
            Object::Array(_) => ObjectType::Array,
            Object::Hash(_) => ObjectType::Hash,
            Object::Function(_) => ObjectType::Function,
            Object::Builtin(_) => ObjectType::Builtin,
            Object::Error(_) => ObjectType::Error,
        }
    }

    /// Human readable rendering used by `print` and the REPL.
    pub fn inspect(&self) -> String {
        match self {
            Object::Null => "null".to_string(),
            Object::Boolean(value) => value.to_string(),
            Object::Integer(value) => value.to_string(),
            Object::Float(value) => value.to_string(),
            Object::String(value) => value.to_string(),
            Object::DocString(_) => String::new(),
            Object::Regexp(regexp) => regexp.pattern().to_string(),
            Object::Array(array) => format!(
                "[{}]",
                array
                    .elements
                    .iter()
                    .map(Object::inspect)
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            Object::Hash(hash) => format!(
                "{{{}}}",
                hash.pairs()
                    .map(|pair| format!("{}: {}", pair.key.inspect(), pair.value.inspect()))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            Object::Function(function) => function.literal().to_string(),
            Object::Builtin(builtin) => format!("builtin function {}", builtin.name()),
            Object::Error(error) => error.inspect(),
        }
    }

    /// Structural key for hashable objects, `None` for everything else.
    pub fn hash_key(&self) -> Option<HashKey> {
        match self {
            Object::Boolean(value) => Some(HashKey::Boolean(*value)),
            Object::Integer(value) => Some(HashKey::Integer(*value)),
            Object::Float(value) => Some(HashKey::Float(value.to_bits())),
            Object::String(value) => Some(HashKey::String(Arc::clone(value))),
            Object::DocString(doc) => Some(HashKey::DocString(doc.value().to_string())),
            Object::Regexp(regexp) => Some(HashKey::Regexp {
                pattern: regexp.pattern().to_string(),
                flags: regexp.flags().to_string(),
            }),
            _ => None,
        }
    }

    pub fn is_hashable(&self) -> bool {
        self.hash_key().is_some()
    }

    /// Null and false are falsy; every other value is truthy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Object::Null | Object::Boolean(false))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Object::Error(_))
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, Object::Function(_) | Object::Builtin(_))
    }

    pub fn as_iterable(&self) -> Option<&dyn Iterable> {
        match self {
            Object::Array(array) => Some(array.as_ref()),
            Object::Hash(hash) => Some(hash.as_ref()),
            Object::DocString(doc) => Some(doc.as_ref()),
            _ => None,
        }
    }

    pub fn array(elements: Vec<Object>) -> Self {
        Object::Array(Arc::new(Array::new(elements)))
    }

    pub fn hash(hash: Hash) -> Self {
        Object::Hash(Arc::new(hash))
    }

    pub fn docstring(value: impl Into<String>) -> Self {
        Object::DocString(Arc::new(DocString::new(value)))
    }

    pub fn error(error: ErrorObject) -> Self {
        Object::Error(Arc::new(error))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Object::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Object::Integer(value) => Some(*value),
            _ => None,
        }
    }
}

/// Shorthand for an internal error value.
pub fn new_error(message: impl Into<String>) -> Object {
    Object::error(ErrorObject::internal(message))
}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inspect())
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Object::String(value) => write!(f, "String({:?})", value),
            Object::Error(error) => write!(f, "Error({:?})", error.message),
            other => write!(f, "{}({})", other.object_type(), other.inspect()),
        }
    }
}

/// Value equality for assertions and host code. Containers compare by
/// content here; the script level `==` compares them by identity.
impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Object::Null, Object::Null) => true,
            (Object::Boolean(a), Object::Boolean(b)) => a == b,
            (Object::Integer(a), Object::Integer(b)) => a == b,
            (Object::Float(a), Object::Float(b)) => a == b,
            (Object::String(a), Object::String(b)) => a == b,
            (Object::DocString(a), Object::DocString(b)) => a.value() == b.value(),
            (Object::Regexp(a), Object::Regexp(b)) => {
                a.pattern() == b.pattern() && a.flags() == b.flags()
            }
            (Object::Array(a), Object::Array(b)) => a.elements == b.elements,
            (Object::Hash(a), Object::Hash(b)) => {
                a.len() == b.len()
                    && a.pairs().all(|pair| {
                        matches!(b.get(&pair.key), Ok(Some(value)) if *value == pair.value)
                    })
            }
            (Object::Function(a), Object::Function(b)) => Closure::ptr_eq(a, b),
            (Object::Builtin(a), Object::Builtin(b)) => a.name() == b.name(),
            (Object::Error(a), Object::Error(b)) => a == b,
            _ => false,
        }
    }
}

impl From<bool> for Object {
    fn from(value: bool) -> Self {
        Object::Boolean(value)
    }
}

impl From<i64> for Object {
    fn from(value: i64) -> Self {
        Object::Integer(value)
    }
}

impl From<f64> for Object {
    fn from(value: f64) -> Self {
        Object::Float(value)
    }
}

impl From<&str> for Object {
    fn from(value: &str) -> Self {
        Object::String(Arc::from(value))
    }
}

impl From<String> for Object {
    fn from(value: String) -> Self {
        Object::String(Arc::from(value))
    }
}

impl From<Vec<Object>> for Object {
    fn from(elements: Vec<Object>) -> Self {
        Object::array(elements)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_type_tags() {
        assert_eq!(Object::Null.object_type().to_string(), "NULL");
        assert_eq!(Object::from(1.5).object_type().to_string(), "FLOAT");
        assert_eq!(Object::docstring("x").object_type().to_string(), "DOCSTRING");
        assert_eq!(ObjectType::DocString.namespace(), "docstring");
        assert_eq!(ObjectType::Array.namespace(), "array");
    }

    #[test]
    fn test_inspect() {
        assert_eq!(Object::Null.inspect(), "null");
        assert_eq!(Object::from(2.5).inspect(), "2.5");
        assert_eq!(Object::from("hi").inspect(), "hi");
        assert_eq!(Object::docstring("ignored").inspect(), "");
        assert_eq!(
            Object::array(vec![Object::from(1), Object::from("a")]).inspect(),
            "[1, a]"
        );
        assert_eq!(new_error("boom").inspect(), "ERROR: boom");
    }

    #[test]
    fn test_hash_keys_are_structural() {
        assert_eq!(Object::from("name").hash_key(), Object::from("name").hash_key());
        assert_ne!(Object::from("1").hash_key(), Object::from(1).hash_key());
        assert_eq!(Object::from(1.25).hash_key(), Object::from(1.25).hash_key());
        assert_eq!(
            Object::docstring("doc").hash_key(),
            Object::docstring("doc").hash_key()
        );
        assert_ne!(
            Object::docstring("doc").hash_key(),
            Object::from("doc").hash_key()
        );
        assert!(Object::array(vec![]).hash_key().is_none());
        assert!(Object::Null.hash_key().is_none());
    }

    #[test]
    fn test_truthiness() {
        assert!(!Object::Null.is_truthy());
        assert!(!Object::from(false).is_truthy());
        assert!(Object::from(0).is_truthy());
        assert!(Object::from("").is_truthy());
        assert!(Object::array(vec![]).is_truthy());
    }
}
