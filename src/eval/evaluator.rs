use std::sync::Arc;

use crate::{
    ast::{Node, Program},
    environment::Environment,
    interpreter::Interpreter,
    object::{ErrorObject, Object},
};

/// Why evaluation of a statement list stopped early.
#[derive(Debug, Clone)]
pub enum ControlFlow {
    /// `return` unwinding to the nearest call.
    Return(Object),
    /// An error value unwinding to whoever observes it.
    Error(Arc<ErrorObject>),
}

impl ControlFlow {
    /// The value seen by the caller once unwinding stops.
    pub fn into_object(self) -> Object {
        match self {
            ControlFlow::Return(value) => value,
            ControlFlow::Error(error) => Object::Error(error),
        }
    }
}

pub type EvalResult<T = Object> = Result<T, ControlFlow>;

pub(crate) fn failure(message: impl Into<String>) -> ControlFlow {
    ControlFlow::Error(Arc::new(ErrorObject::internal(message)))
}

pub(crate) fn raise<T>(message: impl Into<String>) -> EvalResult<T> {
    Err(failure(message))
}

/// Error values produced by native code start unwinding here.
pub(crate) fn lift(object: Object) -> EvalResult {
    match object {
        Object::Error(error) => Err(ControlFlow::Error(error)),
        other => Ok(other),
    }
}

#[derive(Clone)]
pub struct Evaluator {
    pub(super) interpreter: Interpreter,
}

impl Evaluator {
    pub fn new(interpreter: Interpreter) -> Self {
        Self { interpreter }
    }

    pub fn interpreter(&self) -> &Interpreter {
        &self.interpreter
    }

    /// Evaluates every statement in order and yields the last value.
    /// A top-level `return` ends the program with its value.
    pub async fn eval_program(&self, program: &Program, env: &Arc<Environment>) -> Object {
        self.run_program(program, env)
            .await
            .unwrap_or_else(ControlFlow::into_object)
    }

    pub async fn eval_node(&self, node: &Node, env: &Arc<Environment>) -> Object {
        let result = match node {
            Node::Program(program) => return self.eval_program(program, env).await,
            Node::Statement(statement) => self.eval_statement(statement, env).await,
            Node::Expression(expression) => self.eval_expression(expression, env).await,
            Node::Block(block) => self.eval_block(block, env).await,
            Node::Identifier(identifier) => self.eval_identifier(identifier, env),
        };
        result.unwrap_or_else(ControlFlow::into_object)
    }

    /// Calls a function or builtin value from native code.
    pub async fn apply_function(
        &self,
        env: &Arc<Environment>,
        function: &Object,
        args: Vec<Object>,
    ) -> Object {
        self.call_function(env, function, args)
            .await
            .unwrap_or_else(ControlFlow::into_object)
    }

    pub(super) async fn run_program(
        &self,
        program: &Program,
        env: &Arc<Environment>,
    ) -> EvalResult {
        let mut result = Object::Null;
        for statement in &program.statements {
            result = self.eval_statement(statement, env).await?;
        }
        Ok(result)
    }
}
