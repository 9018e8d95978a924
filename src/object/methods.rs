use std::sync::Arc;

use crate::builtins::{Builtin, BuiltinRegistry, CallContext};

use super::{Object, ObjectType};

/// Methods every value of a type carries without a registry entry.
fn intrinsic_methods(object_type: ObjectType) -> &'static [&'static str] {
    match object_type {
        ObjectType::Array | ObjectType::DocString => &["len", "methods"],
        ObjectType::Hash => &["keys", "len", "methods", "values"],
        ObjectType::String => &["len", "lower", "methods", "upper"],
        _ => &[],
    }
}

impl Object {
    /// Binds `name` to this object.
    ///
    /// Intrinsic methods come first. Otherwise the registry entry
    /// `<type>.<name>` is used with the receiver passed as the first
    /// argument.
    pub fn method(&self, name: &str, registry: &BuiltinRegistry) -> Option<Builtin> {
        let object_type = self.object_type();
        if intrinsic_methods(object_type).contains(&name) {
            return self.intrinsic(name, registry);
        }

        let qualified = format!("{}.{}", object_type.namespace(), name);
        let builtin = registry.get(&qualified)?.clone();
        let capability = builtin.capability();
        let receiver = self.clone();
        let function = Arc::new(move |ctx: CallContext, mut args: Vec<Object>| {
            args.insert(0, receiver.clone());
            builtin.call(ctx, args)
        });
        Some(Builtin::from_native(qualified, capability, function))
    }

    /// Names of every method bound to this object, sorted.
    pub fn method_names(&self, registry: &BuiltinRegistry) -> Vec<String> {
        let object_type = self.object_type();
        let prefix = format!("{}.", object_type.namespace());
        let mut names: Vec<String> = intrinsic_methods(object_type)
            .iter()
            .map(|name| name.to_string())
            .chain(
                registry
                    .names_with_prefix(&prefix)
                    .into_iter()
                    .map(|name| name[prefix.len()..].to_string()),
            )
            .collect();
        names.sort();
        names.dedup();
        names
    }

    fn intrinsic(&self, name: &str, registry: &BuiltinRegistry) -> Option<Builtin> {
        let qualified = format!("{}.{}", self.object_type().namespace(), name);
        let value = match (self, name) {
            (Object::Array(array), "len") => Object::Integer(array.len() as i64),
            (Object::Hash(hash), "len") => Object::Integer(hash.len() as i64),
            (Object::String(value), "len") => Object::Integer(value.chars().count() as i64),
            (Object::DocString(doc), "len") => Object::Integer(doc.char_count() as i64),
            (Object::Hash(hash), "keys") => Object::array(hash.keys().cloned().collect()),
            (Object::Hash(hash), "values") => Object::array(hash.values().cloned().collect()),
            (Object::String(value), "upper") => Object::from(value.to_uppercase()),
            (Object::String(value), "lower") => Object::from(value.to_lowercase()),
            (_, "methods") => Object::array(
                self.method_names(registry)
                    .into_iter()
                    .map(Object::from)
                    .collect(),
            ),
            _ => return None,
        };
        Some(Builtin::sync(qualified, move |_, _| Ok(value.clone())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins::Capability;
    use crate::object::Hash;
    use pretty_assertions::assert_eq;

    fn registry_with(names: &[&str]) -> BuiltinRegistry {
        let mut registry = BuiltinRegistry::new();
        for name in names {
            registry
                .register(Builtin::sync(name.to_string(), |_, args| {
                    Ok(Object::from(args.len() as i64))
                }))
                .unwrap();
        }
        registry
    }

    #[test]
    fn test_methods_lists_intrinsics_and_registry_entries() {
        let registry = registry_with(&["array.first", "string.trim"]);
        let array = Object::array(vec![Object::from(1)]);

        assert_eq!(
            array.method_names(&registry),
            vec!["first".to_string(), "len".to_string(), "methods".to_string()]
        );
        assert!(array.method("trim", &registry).is_none());
        assert!(Object::from(1).method("len", &registry).is_none());
    }

    #[test]
    fn test_registry_methods_receive_the_receiver() {
        let registry = registry_with(&["string.count"]);
        let method = Object::from("abc").method("count", &registry).unwrap();

        assert_eq!(method.name(), "string.count");
        assert_eq!(method.capability(), Capability::Ordinary);
    }

    #[test]
    fn test_hash_intrinsics_are_available() {
        let mut hash = Hash::new();
        hash.insert(Object::from("a"), Object::from(1)).unwrap();
        let hash = Object::hash(hash);
        let registry = BuiltinRegistry::new();

        for name in ["keys", "values", "len", "methods"] {
            assert!(hash.method(name, &registry).is_some(), "missing {}", name);
        }
    }
}
