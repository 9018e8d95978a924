//! # cozy-runtime
//!
//! Runtime core of the cozy scripting language. A host parses source text
//! into an [`ast::Program`] and hands it to an [`Interpreter`], which
//! evaluates it with a tree-walking async evaluator.
//!
//! ## Pipeline
//!
//! ```text
//! Program → define_macros → expand_macros → Interpreter::run → RunOutcome
//! ```
//!
//! - Syntax tree and rewriting ([`ast`], [`macros`])
//! - Values ([`object`]) and scopes ([`environment`])
//! - Evaluation ([`eval`]) of statements, expressions and calls
//! - Native functions ([`builtins`]) and the standard library ([`stdlib`])
//! - Async tasks and timers ([`concurrency`])
//! - Imports through a host supplied [`module::ModuleLoader`]
//!
//! Script failures are [`object::ErrorObject`] values flowing through the
//! evaluator. Host facing failures are [`Error`].

pub mod ast;
pub mod builtins;
pub mod concurrency;
pub mod config;
pub mod environment;
pub mod error;
pub mod eval;
pub mod interpreter;
pub mod macros;
pub mod module;
pub mod object;
pub mod stdlib;

// Re-exports
pub use ast::*;
pub use error::*;
pub use interpreter::{Interpreter, InterpreterBuilder, RunOutcome};
pub use macros::{define_macros, expand_macros, MacroEnvironment};
pub use object::{new_error, ErrorObject, Object, ObjectType};

#[cfg(test)]
mod tests {
    use tracing_subscriber::{EnvFilter, FmtSubscriber};

    #[ctor::ctor]
    fn init_tests() {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(EnvFilter::from_default_env())
            .finish();
        tracing::subscriber::set_global_default(subscriber)
            .expect("Failed to set tracing subscriber");
    }
}
