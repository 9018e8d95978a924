use core::fmt;
use std::{future::Future, sync::Arc};

use futures::future::{self, BoxFuture, FutureExt};

use crate::{
    environment::Environment,
    interpreter::Interpreter,
    object::{ErrorObject, Object},
};

/// What a builtin needs besides its arguments: the calling scope and the
/// interpreter it runs under.
#[derive(Clone)]
pub struct CallContext {
    pub env: Arc<Environment>,
    pub interpreter: Interpreter,
}

impl CallContext {
    pub fn new(env: Arc<Environment>, interpreter: Interpreter) -> Self {
        Self { env, interpreter }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
pub enum Capability {
    /// Error arguments stop the call before it happens.
    Ordinary,
    /// Receives error arguments as plain values.
    ErrorAware,
    /// Starts work that outlives the call.
    Spawning,
}

/// Result type native code works with. The error side becomes an error
/// value in the script.
pub type NativeResult = Result<Object, ErrorObject>;

pub type BuiltinFuture = BoxFuture<'static, Object>;

pub type NativeFunction = Arc<dyn Fn(CallContext, Vec<Object>) -> BuiltinFuture + Send + Sync>;

#[derive(Clone)]
pub struct Builtin {
    name: Arc<str>,
    capability: Capability,
    function: NativeFunction,
}

impl Builtin {
    /// Wraps an async native function.
    pub fn new<F, Fut>(name: impl Into<Arc<str>>, capability: Capability, function: F) -> Self
    where
        F: Fn(CallContext, Vec<Object>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = NativeResult> + Send + 'static,
    {
        let function: NativeFunction = Arc::new(move |ctx: CallContext, args: Vec<Object>| {
            function(ctx, args).map(fold_result).boxed()
        });
        Self::from_native(name, capability, function)
    }

    /// Wraps a native function that finishes without suspending.
    pub fn sync<F>(name: impl Into<Arc<str>>, function: F) -> Self
    where
        F: Fn(&CallContext, Vec<Object>) -> NativeResult + Send + Sync + 'static,
    {
        let function: NativeFunction = Arc::new(move |ctx: CallContext, args: Vec<Object>| {
            future::ready(fold_result(function(&ctx, args))).boxed()
        });
        Self::from_native(name, Capability::Ordinary, function)
    }

    pub fn from_native(
        name: impl Into<Arc<str>>,
        capability: Capability,
        function: NativeFunction,
    ) -> Self {
        Self {
            name: name.into(),
            capability,
            function,
        }
    }

    pub fn with_capability(mut self, capability: Capability) -> Self {
        self.capability = capability;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capability(&self) -> Capability {
        self.capability
    }

    pub fn call(&self, ctx: CallContext, args: Vec<Object>) -> BuiltinFuture {
        (self.function)(ctx, args)
    }
}

fn fold_result(result: NativeResult) -> Object {
    result.unwrap_or_else(Object::error)
}

impl fmt::Debug for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Builtin")
            .field("name", &self.name)
            .field("capability", &self.capability)
            .finish()
    }
}

/// Fails unless exactly `expected` arguments were passed.
pub fn check_arity(name: &str, args: &[Object], expected: usize) -> Result<(), ErrorObject> {
    if args.len() != expected {
        return Err(ErrorObject::internal(format!(
            "wrong number of arguments to `{}`: got={}, want={}",
            name,
            args.len(),
            expected
        )));
    }
    Ok(())
}
