mod common;

use common::*;
use cozy_runtime::{
    define_macros, expand_macros, Expression, InfixOperator, Interpreter, Object, PrefixOperator,
    Program, Statement,
};
use pretty_assertions::assert_eq;

async fn expand_and_run(mut source: Program) -> Object {
    let macros = define_macros(&mut source);
    let expanded = expand_macros(source, &macros);
    Interpreter::new().unwrap().eval_program(&expanded).await
}

#[tokio::test]
async fn test_unless_macro() {
    // let unless = macro(cond, cons, alt) { if (!(cond)) { cons } else { alt } };
    let unless = Expression::macro_literal(
        &["cond", "cons", "alt"],
        block(vec![Statement::expr(Expression::if_else(
            Expression::prefix(PrefixOperator::Bang, ident("cond")),
            block(vec![Statement::expr(ident("cons"))]),
            Some(block(vec![Statement::expr(ident("alt"))])),
        ))]),
    );

    let result = expand_and_run(program(vec![
        Statement::let_binding("unless", unless),
        Statement::expr(call(
            "unless",
            vec![
                infix(int(10), InfixOperator::Greater, int(5)),
                string("not greater"),
                string("greater"),
            ],
        )),
    ]))
    .await;
    assert_eq!(result, Object::from("greater"));
}

#[tokio::test]
async fn test_unused_arguments_are_never_evaluated() {
    let ignore = Expression::macro_literal(&["x"], block(vec![Statement::expr(int(1))]));
    let result = expand_and_run(program(vec![
        Statement::let_binding("ignore", ignore),
        Statement::expr(call("ignore", vec![call("error", vec![string("boom")])])),
    ]))
    .await;
    assert_eq!(result, Object::Integer(1));
}

#[tokio::test]
async fn test_macro_body_with_bindings_runs_in_its_own_scope() {
    // let square = macro(x) { let v = x; v * v };
    let square = Expression::macro_literal(
        &["x"],
        block(vec![
            Statement::let_binding("v", ident("x")),
            Statement::expr(infix(ident("v"), InfixOperator::Multiply, ident("v"))),
        ]),
    );
    let result = expand_and_run(program(vec![
        Statement::let_binding("square", square),
        Statement::let_binding("v", int(100)),
        Statement::expr(infix(
            call("square", vec![infix(int(2), InfixOperator::Plus, int(3))]),
            InfixOperator::Plus,
            ident("v"),
        )),
    ]))
    .await;
    assert_eq!(result, Object::Integer(125));
}

#[tokio::test]
async fn test_unexpanded_macro_literal_is_an_error() {
    let result = eval(vec![Statement::expr(Expression::macro_literal(&[], block(vec![])))]).await;
    assert_eq!(
        error_message(&result),
        "macro literal evaluated outside a macro definition"
    );
}
