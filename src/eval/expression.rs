use std::sync::Arc;

use async_recursion::async_recursion;
use tracing::{debug, info};

use crate::{
    ast::{
        BlockStatement, Expression, FunctionLiteral, Identifier, InfixOperator, PostfixOperator,
    },
    builtins::Capability,
    environment::{Environment, Mutability, CURRENT_ARGS},
    object::{Closure, Hash, Object, Regexp},
};

use super::{
    evaluator::{failure, raise, ControlFlow, EvalResult, Evaluator},
    operators,
};

impl Evaluator {
    #[async_recursion]
    pub(crate) async fn eval_expression(
        &self,
        expression: &Expression,
        env: &Arc<Environment>,
    ) -> EvalResult {
        match expression {
            Expression::Identifier(identifier) => self.eval_identifier(identifier, env),
            Expression::Integer(value) => Ok(Object::Integer(*value)),
            Expression::Float(value) => Ok(Object::Float(*value)),
            Expression::String(value) => Ok(Object::from(value.as_str())),
            Expression::Boolean(value) => Ok(Object::Boolean(*value)),
            Expression::Regexp { pattern, flags } => Regexp::new(pattern.as_str(), flags.as_str())
                .map(|regexp| Object::Regexp(Arc::new(regexp)))
                .map_err(|e| failure(format!("invalid regular expression /{}/: {}", pattern, e))),
            Expression::DocString(value) => Ok(Object::docstring(value.as_str())),
            Expression::Backtick(command) => self.eval_backtick(command).await,
            Expression::Prefix { operator, right } => {
                let right = self.eval_expression(right, env).await?;
                operators::eval_prefix(*operator, &right)
            }
            Expression::Infix {
                left,
                operator,
                right,
            } => self.eval_infix(left, *operator, right, env).await,
            Expression::Postfix { target, operator } => self.eval_postfix(target, *operator, env),
            Expression::Array(elements) => {
                let mut values = Vec::with_capacity(elements.len());
                for element in elements {
                    values.push(self.eval_expression(element, env).await?);
                }
                Ok(Object::array(values))
            }
            Expression::Hash(pairs) => self.eval_hash(pairs, env).await,
            Expression::Index { left, index } => {
                let left = self.eval_expression(left, env).await?;
                let index = self.eval_expression(index, env).await?;
                operators::eval_index(&left, &index)
            }
            Expression::If {
                condition,
                consequence,
                alternative,
            } => {
                let condition = self.eval_expression(condition, env).await?;
                if condition.is_truthy() {
                    self.eval_block(consequence, env).await
                } else if let Some(alternative) = alternative {
                    self.eval_block(alternative, env).await
                } else {
                    Ok(Object::Null)
                }
            }
            Expression::Ternary {
                condition,
                if_true,
                if_false,
            } => {
                let condition = self.eval_expression(condition, env).await?;
                if condition.is_truthy() {
                    self.eval_expression(if_true, env).await
                } else {
                    self.eval_expression(if_false, env).await
                }
            }
            Expression::While { condition, body } | Expression::For { condition, body } => {
                self.eval_loop(condition, body, env).await
            }
            Expression::Foreach {
                index,
                item,
                iterable,
                body,
            } => {
                self.eval_foreach(index.as_ref(), item, iterable, body, env)
                    .await
            }
            Expression::Import(name) => self.eval_import(name, env).await,
            Expression::Function(literal) => Ok(self.eval_function_literal(literal, env)),
            Expression::Call {
                function,
                arguments,
            } => self.eval_call(function, arguments, env).await,
            Expression::CurrentArgs => env
                .get(CURRENT_ARGS)
                .ok_or_else(|| failure("`...` used outside of a function call")),
            Expression::Macro(_) => raise("macro literal evaluated outside a macro definition"),
            Expression::Empty => Ok(Object::Null),
        }
    }

    /// Bindings first, then builtins, then `receiver.method`.
    pub(crate) fn eval_identifier(
        &self,
        identifier: &Identifier,
        env: &Arc<Environment>,
    ) -> EvalResult {
        let name = identifier.value.as_str();
        if let Some(value) = env.get(name) {
            return Ok(value);
        }

        let builtins = self.interpreter.builtins();
        if let Some(builtin) = builtins.resolve(name) {
            return Ok(Object::Builtin(builtin.clone()));
        }

        if let Some((receiver, method)) = name.split_once('.') {
            if let Some(target) = env.get(receiver) {
                return target.method(method, builtins).map(Object::Builtin).ok_or_else(|| {
                    failure(format!(
                        "{} has no method `{}`",
                        target.object_type(),
                        method
                    ))
                });
            }
        }

        raise(format!("identifier not found: {}", name))
    }

    async fn eval_infix(
        &self,
        left: &Expression,
        operator: InfixOperator,
        right: &Expression,
        env: &Arc<Environment>,
    ) -> EvalResult {
        let left = self.eval_expression(left, env).await?;
        match operator {
            InfixOperator::And if !left.is_truthy() => Ok(Object::Boolean(false)),
            InfixOperator::Or if left.is_truthy() => Ok(Object::Boolean(true)),
            InfixOperator::And | InfixOperator::Or => {
                let right = self.eval_expression(right, env).await?;
                Ok(Object::Boolean(right.is_truthy()))
            }
            _ => {
                let right = self.eval_expression(right, env).await?;
                operators::eval_infix(operator, &left, &right)
            }
        }
    }

    /// `x++` stores the new value and yields the old one.
    fn eval_postfix(
        &self,
        target: &Identifier,
        operator: PostfixOperator,
        env: &Arc<Environment>,
    ) -> EvalResult {
        let current = env
            .get(&target.value)
            .ok_or_else(|| failure(format!("identifier not found: {}", target)))?;
        let updated = operators::eval_postfix(operator, &current)?;
        env.assign(&target.value, updated)
            .map_err(|e| failure(e.to_string()))?;
        Ok(current)
    }

    async fn eval_hash(
        &self,
        pairs: &[(Expression, Expression)],
        env: &Arc<Environment>,
    ) -> EvalResult {
        let mut hash = Hash::new();
        for (key, value) in pairs {
            let key = self.eval_expression(key, env).await?;
            if !key.is_hashable() {
                return raise(format!("unusable as hash key: {}", key.object_type()));
            }
            let value = self.eval_expression(value, env).await?;
            hash.insert(key, value)
                .map_err(|t| failure(format!("unusable as hash key: {}", t)))?;
        }
        Ok(Object::hash(hash))
    }

    /// `while` and `for` share the same shape; the body runs in the
    /// enclosing scope.
    async fn eval_loop(
        &self,
        condition: &Expression,
        body: &BlockStatement,
        env: &Arc<Environment>,
    ) -> EvalResult {
        let mut result = Object::Null;
        while self.eval_expression(condition, env).await?.is_truthy() {
            result = self.eval_block(body, env).await?;
        }
        Ok(result)
    }

    async fn eval_foreach(
        &self,
        index: Option<&Identifier>,
        item: &Identifier,
        iterable: &Expression,
        body: &BlockStatement,
        env: &Arc<Environment>,
    ) -> EvalResult {
        let target = self.eval_expression(iterable, env).await?;
        let Some(iterator) = target.as_iterable() else {
            return raise(format!(
                "foreach over non-iterable value: {}",
                target.object_type()
            ));
        };

        iterator.reset();
        let mut result = Object::Null;
        while let Some((value, key)) = iterator.next() {
            let scope = Environment::new_enclosed(env);
            scope.define(item.value.as_str(), value, Mutability::Mutable);
            if let Some(index) = index {
                scope.define(index.value.as_str(), key, Mutability::Mutable);
            }
            result = self.eval_block(body, &scope).await?;
        }
        Ok(result)
    }

    /// A named literal binds itself and yields null.
    fn eval_function_literal(
        &self,
        literal: &Arc<FunctionLiteral>,
        env: &Arc<Environment>,
    ) -> Object {
        let function = Object::Function(Closure::new(Arc::clone(literal), Arc::clone(env)));
        match &literal.name {
            Some(name) => {
                env.define(name.value.as_str(), function, Mutability::Mutable);
                Object::Null
            }
            None => function,
        }
    }

    async fn eval_call(
        &self,
        callee: &Expression,
        arguments: &[Expression],
        env: &Arc<Environment>,
    ) -> EvalResult {
        let function = self.eval_expression(callee, env).await?;
        let keep_errors = matches!(
            &function,
            Object::Builtin(builtin) if builtin.capability() == Capability::ErrorAware
        );
        let args = self.eval_arguments(arguments, keep_errors, env).await?;
        self.call_function(env, &function, args).await
    }

    /// Evaluates call arguments left to right, splicing `...` arrays.
    /// Error-aware callees receive failed arguments as error values.
    async fn eval_arguments(
        &self,
        arguments: &[Expression],
        keep_errors: bool,
        env: &Arc<Environment>,
    ) -> EvalResult<Vec<Object>> {
        let mut values = Vec::with_capacity(arguments.len());
        for argument in arguments {
            let value = match self.eval_expression(argument, env).await {
                Ok(value) => value,
                // A panic is never handed to a builtin as a value.
                Err(ControlFlow::Error(error)) if keep_errors && !error.is_panic() => {
                    Object::Error(error)
                }
                Err(flow) => return Err(flow),
            };
            match value {
                Object::Array(array) if array.current_args => {
                    values.extend(array.elements.iter().cloned())
                }
                other => values.push(other),
            }
        }
        Ok(values)
    }

    /// Runs a module in a fresh global scope and yields its bindings as a hash.
    #[tracing::instrument(level = "debug", skip_all)]
    async fn eval_import(&self, name: &Expression, env: &Arc<Environment>) -> EvalResult {
        let name = self.eval_expression(name, env).await?;
        let Some(module) = name.as_str() else {
            return raise(format!(
                "import expects a STRING module name, got {}",
                name.object_type()
            ));
        };

        let loader = self.interpreter.modules();
        let Some(path) = loader.resolve(module) else {
            return raise(format!("module not found: {}", module));
        };
        info!(module, path = %path.display(), "importing module");

        let program = loader
            .load(&path)
            .await
            .map_err(|e| failure(format!("failed to load module {}: {}", module, e)))?;

        let scope = Environment::new_global();
        match self.run_program(&program, &scope).await {
            Ok(_) | Err(ControlFlow::Return(_)) => Ok(Object::hash(scope.to_hash())),
            Err(error) => Err(error),
        }
    }

    /// Runs a backtick command through the configured shell.
    async fn eval_backtick(&self, command: &str) -> EvalResult {
        let settings = &self.interpreter.config().backtick;
        if !settings.enabled {
            return raise("backtick commands are disabled");
        }
        debug!(command, shell = %settings.shell, "running backtick command");

        let output = tokio::process::Command::new(&settings.shell)
            .arg("-c")
            .arg(command)
            .output()
            .await
            .map_err(|e| failure(format!("failed to run `{}`: {}", command, e)))?;

        let mut result = Hash::new();
        result.insert_str(
            "stdout",
            Object::from(String::from_utf8_lossy(&output.stdout).into_owned()),
        );
        result.insert_str(
            "stderr",
            Object::from(String::from_utf8_lossy(&output.stderr).into_owned()),
        );
        result.insert_str(
            "status",
            output
                .status
                .code()
                .map(|code| Object::Integer(i64::from(code)))
                .unwrap_or(Object::Null),
        );
        Ok(Object::hash(result))
    }
}
