use criterion::{criterion_group, criterion_main, Criterion};
use cozy_runtime::{
    BlockStatement, Expression, InfixOperator, Interpreter, Program, Statement,
};

/// let fib = fn(n) { if (n < 2) { n } else { fib(n - 1) + fib(n - 2) } }; fib(15)
fn fib_program(n: i64) -> Program {
    let recurse = |offset| {
        Expression::call(
            Expression::ident("fib"),
            vec![Expression::infix(
                Expression::ident("n"),
                InfixOperator::Minus,
                Expression::int(offset),
            )],
        )
    };
    let body = BlockStatement::new(vec![Statement::expr(Expression::if_else(
        Expression::infix(Expression::ident("n"), InfixOperator::Less, Expression::int(2)),
        BlockStatement::new(vec![Statement::expr(Expression::ident("n"))]),
        Some(BlockStatement::new(vec![Statement::expr(Expression::infix(
            recurse(1),
            InfixOperator::Plus,
            recurse(2),
        ))])),
    ))]);

    Program::new(vec![
        Statement::let_binding("fib", Expression::lambda(&["n"], body)),
        Statement::expr(Expression::call(
            Expression::ident("fib"),
            vec![Expression::int(n)],
        )),
    ])
}

fn bench_fib(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().expect("tokio runtime");
    let program = fib_program(15);
    c.bench_function("fib 15", |b| {
        b.iter(|| {
            runtime.block_on(async {
                let interpreter = Interpreter::new().expect("interpreter builds");
                interpreter.eval_program(&program).await
            })
        })
    });
}

fn bench_loop(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().expect("tokio runtime");
    let program = Program::new(vec![
        Statement::mutable("sum", Expression::int(0)),
        Statement::expr(Expression::foreach(
            None,
            "i",
            Expression::infix(Expression::int(1), InfixOperator::Range, Expression::int(1000)),
            BlockStatement::new(vec![Statement::assign(
                "sum",
                cozy_runtime::AssignOperator::AddAssign,
                Expression::ident("i"),
            )]),
        )),
        Statement::expr(Expression::ident("sum")),
    ]);
    c.bench_function("foreach sum 1..1000", |b| {
        b.iter(|| {
            runtime.block_on(async {
                let interpreter = Interpreter::new().expect("interpreter builds");
                interpreter.eval_program(&program).await
            })
        })
    });
}

criterion_group!(benches, bench_fib, bench_loop);
criterion_main!(benches);
