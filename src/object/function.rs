use core::fmt;
use std::{ops::Deref, sync::Arc};

use crate::{ast::FunctionLiteral, environment::Environment};

/// A user function: its literal plus the environment it closed over.
pub struct Function {
    literal: Arc<FunctionLiteral>,
    env: Arc<Environment>,
}

impl Function {
    pub fn new(literal: Arc<FunctionLiteral>, env: Arc<Environment>) -> Self {
        Self { literal, env }
    }

    pub fn literal(&self) -> &Arc<FunctionLiteral> {
        &self.literal
    }

    pub fn env(&self) -> &Arc<Environment> {
        &self.env
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("literal", &self.literal.to_string())
            .finish_non_exhaustive()
    }
}

/// Shared handle to a [`Function`], the payload of `Object::Function`.
///
/// Every clone is one strong reference. Dropping a handle lets the call
/// frame the function closed over check whether only its own bindings still
/// reach it, and reclaim itself if so.
#[derive(Clone)]
pub struct Closure(Arc<Function>);

impl Closure {
    pub fn new(literal: Arc<FunctionLiteral>, env: Arc<Environment>) -> Self {
        Self(Arc::new(Function::new(literal, env)))
    }

    pub fn ptr_eq(a: &Closure, b: &Closure) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }

    /// Number of live handles to this function.
    pub fn handle_count(this: &Closure) -> usize {
        Arc::strong_count(&this.0)
    }

    pub(crate) fn address(this: &Closure) -> usize {
        Arc::as_ptr(&this.0) as usize
    }
}

impl Deref for Closure {
    type Target = Function;

    fn deref(&self) -> &Function {
        &self.0
    }
}

impl Drop for Closure {
    fn drop(&mut self) {
        Environment::closure_dropped(self);
    }
}

impl fmt::Debug for Closure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
