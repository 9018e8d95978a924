use std::sync::Arc;

use tracing::trace;

use crate::{
    builtins::CallContext,
    environment::{Environment, Mutability, CURRENT_ARGS},
    object::{Array, Closure, Function, Object},
};

use super::evaluator::{lift, raise, ControlFlow, EvalResult, Evaluator};

impl Evaluator {
    pub(crate) async fn call_function(
        &self,
        env: &Arc<Environment>,
        function: &Object,
        args: Vec<Object>,
    ) -> EvalResult {
        match function {
            Object::Function(function) => self.call_user_function(env, function, args).await,
            Object::Builtin(builtin) => {
                trace!(builtin = builtin.name(), args = args.len(), "calling builtin");
                let ctx = CallContext::new(Environment::new_enclosed(env), self.interpreter.clone());
                lift(builtin.call(ctx, args).await)
            }
            other => raise(format!("not a function: {}", other.object_type())),
        }
    }

    async fn call_user_function(
        &self,
        caller: &Arc<Environment>,
        function: &Closure,
        args: Vec<Object>,
    ) -> EvalResult {
        let config = self.interpreter.config();
        let depth = caller.call_depth() + 1;
        if depth > config.max_call_depth {
            return raise(format!(
                "maximum call depth exceeded ({})",
                config.max_call_depth
            ));
        }

        let frame = Environment::new_frame(function.env(), depth);
        let outcome = match self.bind_arguments(function, &frame, args).await {
            Ok(()) => self.eval_block(&function.literal().body, &frame).await,
            Err(flow) => Err(flow),
        };
        if config.frames.reclaim {
            frame.release();
        }

        match outcome {
            Err(ControlFlow::Return(value)) => Ok(value),
            other => other,
        }
    }

    /// Positional arguments first, then defaults evaluated in the new
    /// frame, then null. Surplus arguments become `...`.
    async fn bind_arguments(
        &self,
        function: &Function,
        frame: &Arc<Environment>,
        mut args: Vec<Object>,
    ) -> EvalResult<()> {
        let literal = function.literal();
        let surplus = if args.len() > literal.parameters.len() {
            args.split_off(literal.parameters.len())
        } else {
            Vec::new()
        };

        let mut supplied = args.into_iter();
        for parameter in &literal.parameters {
            let value = match supplied.next() {
                Some(value) => value,
                None => match literal.defaults.get(&parameter.value) {
                    Some(default) => self.eval_expression(default, frame).await?,
                    None => Object::Null,
                },
            };
            frame.define(parameter.value.as_str(), value, Mutability::Mutable);
        }

        frame.define(
            CURRENT_ARGS,
            Object::Array(Arc::new(Array::current_args(surplus))),
            Mutability::Constant,
        );
        Ok(())
    }
}
