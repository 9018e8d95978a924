#![allow(dead_code)]

use cozy_runtime::{
    config::RuntimeConfig, BlockStatement, Expression, InfixOperator, Interpreter, Object,
    Program, Statement,
};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[ctor::ctor]
fn init_tests() {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

pub fn program(statements: Vec<Statement>) -> Program {
    Program::new(statements)
}

pub fn block(statements: Vec<Statement>) -> BlockStatement {
    BlockStatement::new(statements)
}

pub fn ident(name: &str) -> Expression {
    Expression::ident(name)
}

pub fn int(value: i64) -> Expression {
    Expression::int(value)
}

pub fn string(value: &str) -> Expression {
    Expression::string(value)
}

pub fn infix(left: Expression, operator: InfixOperator, right: Expression) -> Expression {
    Expression::infix(left, operator, right)
}

pub fn call(name: &str, arguments: Vec<Expression>) -> Expression {
    Expression::call(Expression::ident(name), arguments)
}

/// `fn() { <statements> }`
pub fn thunk(statements: Vec<Statement>) -> Expression {
    Expression::lambda(&[], block(statements))
}

pub fn interpreter_with(config: RuntimeConfig) -> Interpreter {
    Interpreter::builder()
        .config(config)
        .build()
        .expect("interpreter builds")
}

pub async fn eval(statements: Vec<Statement>) -> Object {
    let interpreter = Interpreter::new().expect("interpreter builds");
    interpreter.eval_program(&program(statements)).await
}

pub fn error_message(object: &Object) -> String {
    match object {
        Object::Error(error) => error.message.clone(),
        other => panic!("expected an error, got {:?}", other),
    }
}
