use std::collections::HashMap;

use thiserror::Error;
use tracing::debug;

use super::types::Builtin;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("builtin already registered: {name}")]
    Duplicate { name: String },
}

/// A namespace of builtins installed in one go, e.g. `core` or `time`.
pub trait BuiltinModule: Send + Sync {
    fn namespace(&self) -> &'static str;

    fn register(&self, registry: &mut BuiltinRegistry) -> Result<(), RegistryError>;
}

/// Name to builtin table. Filled before the interpreter starts and read
/// only afterwards.
#[derive(Debug, Default, Clone)]
pub struct BuiltinRegistry {
    builtins: HashMap<String, Builtin>,
}

impl BuiltinRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the `core` and `time` namespaces installed.
    pub fn standard() -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        registry.install(&crate::stdlib::CoreModule)?;
        registry.install(&crate::stdlib::TimeModule)?;
        Ok(registry)
    }

    pub fn register(&mut self, builtin: Builtin) -> Result<(), RegistryError> {
        if self.builtins.contains_key(builtin.name()) {
            return Err(RegistryError::Duplicate {
                name: builtin.name().to_string(),
            });
        }
        debug!("register builtin: {}", builtin.name());
        self.builtins.insert(builtin.name().to_string(), builtin);
        Ok(())
    }

    pub fn install(&mut self, module: &dyn BuiltinModule) -> Result<(), RegistryError> {
        debug!("install builtin module: {}", module.namespace());
        module.register(self)
    }

    pub fn get(&self, name: &str) -> Option<&Builtin> {
        self.builtins.get(name)
    }

    /// Exact name first, then the same name under `core.`.
    pub fn resolve(&self, name: &str) -> Option<&Builtin> {
        self.get(name)
            .or_else(|| self.builtins.get(&format!("core.{}", name)))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.builtins.contains_key(name)
    }

    /// Sorted names that start with `prefix`.
    pub fn names_with_prefix(&self, prefix: &str) -> Vec<String> {
        let mut names: Vec<String> = self
            .builtins
            .keys()
            .filter(|name| name.starts_with(prefix))
            .cloned()
            .collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.builtins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.builtins.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::Object;
    use pretty_assertions::assert_eq;

    fn constant(name: &str, value: i64) -> Builtin {
        Builtin::sync(name.to_string(), move |_, _| Ok(Object::from(value)))
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let mut registry = BuiltinRegistry::new();
        registry.register(constant("core.answer", 42)).unwrap();

        let result = registry.register(constant("core.answer", 0));
        assert_eq!(
            result,
            Err(RegistryError::Duplicate {
                name: "core.answer".to_string()
            })
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_resolve_falls_back_to_core() {
        let mut registry = BuiltinRegistry::new();
        registry.register(constant("core.answer", 42)).unwrap();
        registry.register(constant("math.answer", 7)).unwrap();

        assert_eq!(registry.resolve("answer").map(Builtin::name), Some("core.answer"));
        assert_eq!(
            registry.resolve("math.answer").map(Builtin::name),
            Some("math.answer")
        );
        assert!(registry.resolve("missing").is_none());
    }

    #[test]
    fn test_names_with_prefix_are_sorted() {
        let mut registry = BuiltinRegistry::new();
        registry.register(constant("string.upper", 1)).unwrap();
        registry.register(constant("string.trim", 1)).unwrap();
        registry.register(constant("array.first", 1)).unwrap();

        assert_eq!(
            registry.names_with_prefix("string."),
            vec!["string.trim".to_string(), "string.upper".to_string()]
        );
    }

    #[test]
    fn test_standard_registry_installs_core_and_time() {
        let registry = BuiltinRegistry::standard().unwrap();
        for name in ["core.len", "core.async", "core.await", "time.sleep", "time.interval"] {
            assert!(registry.contains(name), "missing {}", name);
        }

        let mut registry = registry;
        assert!(registry.install(&crate::stdlib::CoreModule).is_err());
    }
}
