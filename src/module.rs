use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use thiserror::Error;

use crate::ast::Program;

#[derive(Debug, Error)]
pub enum ModuleError {
    #[error("module not available: {}", .0.display())]
    Unavailable(PathBuf),
    #[error("failed to read module {}: {message}", .path.display())]
    Read { path: PathBuf, message: String },
    #[error("failed to parse module {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },
}

/// Finds and parses modules for `import`.
///
/// Parsing lives outside this crate, so a loader is the seam where a host
/// plugs in its search path and parser.
#[async_trait]
pub trait ModuleLoader: Send + Sync {
    fn resolve(&self, name: &str) -> Option<PathBuf>;

    async fn load(&self, path: &Path) -> Result<Program, ModuleError>;
}

/// Loader used when the host provides none. Every import fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoModules;

#[async_trait]
impl ModuleLoader for NoModules {
    fn resolve(&self, _name: &str) -> Option<PathBuf> {
        None
    }

    async fn load(&self, path: &Path) -> Result<Program, ModuleError> {
        Err(ModuleError::Unavailable(path.to_path_buf()))
    }
}

/// In-memory modules keyed by import name.
#[derive(Debug, Default, Clone)]
pub struct StaticModules {
    modules: HashMap<PathBuf, Program>,
}

impl StaticModules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, program: Program) -> Self {
        self.insert(name, program);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, program: Program) {
        self.modules.insert(PathBuf::from(name.into()), program);
    }
}

#[async_trait]
impl ModuleLoader for StaticModules {
    fn resolve(&self, name: &str) -> Option<PathBuf> {
        let path = PathBuf::from(name);
        self.modules.contains_key(&path).then_some(path)
    }

    async fn load(&self, path: &Path) -> Result<Program, ModuleError> {
        self.modules
            .get(path)
            .cloned()
            .ok_or_else(|| ModuleError::Unavailable(path.to_path_buf()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Expression, Statement};
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_static_modules_resolve_and_load() {
        let program = Program::new(vec![Statement::let_binding("x", Expression::int(1))]);
        let loader = StaticModules::new().with("math", program.clone());

        let path = loader.resolve("math").unwrap();
        assert_eq!(loader.load(&path).await.unwrap(), program);
        assert!(loader.resolve("strings").is_none());
    }

    #[tokio::test]
    async fn test_no_modules_finds_nothing() {
        assert!(NoModules.resolve("anything").is_none());
        assert!(matches!(
            NoModules.load(Path::new("anything")).await,
            Err(ModuleError::Unavailable(_))
        ));
    }
}
