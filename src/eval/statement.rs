use std::sync::Arc;

use async_recursion::async_recursion;

use crate::{
    ast::{AssignOperator, BlockStatement, Expression, Identifier, Statement},
    environment::{Environment, Mutability},
    object::Object,
};

use super::{
    evaluator::{failure, ControlFlow, EvalResult, Evaluator},
    operators,
};

impl Evaluator {
    #[async_recursion]
    pub(crate) async fn eval_statement(
        &self,
        statement: &Statement,
        env: &Arc<Environment>,
    ) -> EvalResult {
        match statement {
            Statement::Let { name, value } => {
                self.eval_binding(name, value, Mutability::Constant, env)
                    .await
            }
            Statement::Mutable { name, value } => {
                self.eval_binding(name, value, Mutability::Mutable, env)
                    .await
            }
            Statement::Assign {
                name,
                operator,
                value,
            } => self.eval_assign(name, *operator, value, env).await,
            Statement::Return(value) => {
                let value = match value {
                    Some(expression) => self.eval_expression(expression, env).await?,
                    None => Object::Null,
                };
                Err(ControlFlow::Return(value))
            }
            Statement::Expression(expression) => self.eval_expression(expression, env).await,
            Statement::Block(block) => self.eval_block(block, env).await,
        }
    }

    /// Runs the statements in `env` itself; blocks do not open a scope.
    pub(crate) async fn eval_block(
        &self,
        block: &BlockStatement,
        env: &Arc<Environment>,
    ) -> EvalResult {
        let mut result = Object::Null;
        for statement in &block.statements {
            result = self.eval_statement(statement, env).await?;
        }
        Ok(result)
    }

    async fn eval_binding(
        &self,
        name: &Identifier,
        value: &Expression,
        mutability: Mutability,
        env: &Arc<Environment>,
    ) -> EvalResult {
        let value = self.eval_expression(value, env).await?;
        env.define(name.value.as_str(), value, mutability);
        Ok(Object::Null)
    }

    async fn eval_assign(
        &self,
        name: &Identifier,
        operator: AssignOperator,
        value: &Expression,
        env: &Arc<Environment>,
    ) -> EvalResult {
        let value = self.eval_expression(value, env).await?;
        let value = match operator.infix() {
            None => value,
            Some(infix) => {
                let current = env
                    .get(&name.value)
                    .ok_or_else(|| failure(format!("identifier not found: {}", name)))?;
                operators::eval_infix(infix, &current, &value)?
            }
        };
        env.assign(&name.value, value)
            .map_err(|e| failure(e.to_string()))?;
        Ok(Object::Null)
    }
}
