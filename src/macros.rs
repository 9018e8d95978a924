//! Macro definition and expansion.
//!
//! `let name = macro(a, b) { ... };` at the top level of a program defines
//! a macro. Calls to it are replaced before evaluation by its body with the
//! argument expressions substituted for the parameters, unevaluated.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::ast::{
    modify, BlockStatement, Expression, FunctionLiteral, MacroLiteral, Node, Program, Statement,
};

#[derive(Debug, Default, Clone)]
pub struct MacroEnvironment {
    macros: HashMap<String, MacroLiteral>,
}

impl MacroEnvironment {
    pub fn get(&self, name: &str) -> Option<&MacroLiteral> {
        self.macros.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.macros.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.macros.len()
    }

    pub fn is_empty(&self) -> bool {
        self.macros.is_empty()
    }
}

/// Moves top-level macro definitions out of `program`.
pub fn define_macros(program: &mut Program) -> MacroEnvironment {
    let mut env = MacroEnvironment::default();
    program.statements.retain(|statement| match statement {
        Statement::Let {
            name,
            value: Expression::Macro(literal),
        }
        | Statement::Mutable {
            name,
            value: Expression::Macro(literal),
        } => {
            debug!(name = %name, "macro defined");
            env.macros.insert(name.value.clone(), literal.clone());
            false
        }
        _ => true,
    });
    env
}

/// Replaces every call of a defined macro.
pub fn expand_macros(program: Program, macros: &MacroEnvironment) -> Program {
    let expanded = modify(Node::Program(program), |node| match node {
        Node::Expression(Expression::Call {
            function,
            arguments,
        }) => match expand_call(&function, &arguments, macros) {
            Some(expansion) => Node::from(expansion),
            None => Node::Expression(Expression::Call {
                function,
                arguments,
            }),
        },
        other => other,
    });
    Program::try_from(expanded).unwrap_or_default()
}

fn expand_call(
    function: &Expression,
    arguments: &[Expression],
    macros: &MacroEnvironment,
) -> Option<Expression> {
    let Expression::Identifier(name) = function else {
        return None;
    };
    let literal = macros.get(&name.value)?;
    if literal.parameters.len() != arguments.len() {
        warn!(
            name = %name,
            expected = literal.parameters.len(),
            got = arguments.len(),
            "macro called with wrong number of arguments, leaving call in place"
        );
        return None;
    }

    let bindings: HashMap<&str, &Expression> = literal
        .parameters
        .iter()
        .map(|parameter| parameter.value.as_str())
        .zip(arguments)
        .collect();
    let body = modify(Node::Block(literal.body.clone()), |node| match node {
        Node::Identifier(identifier) => match bindings.get(identifier.value.as_str()) {
            Some(argument) => Node::from((*argument).clone()),
            None => Node::Identifier(identifier),
        },
        other => other,
    });
    let body = BlockStatement::try_from(body).ok()?;

    Some(match body.statements.as_slice() {
        [Statement::Expression(expression)] => expression.clone(),
        _ => Expression::call(
            Expression::function(FunctionLiteral::new(Vec::new(), body)),
            Vec::new(),
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::InfixOperator;
    use pretty_assertions::assert_eq;

    fn plus(l: Expression, r: Expression) -> Expression {
        Expression::infix(l, InfixOperator::Plus, r)
    }

    #[test]
    fn test_define_macros_removes_definitions() {
        let mut program = Program::new(vec![
            Statement::let_binding("number", Expression::int(1)),
            Statement::let_binding(
                "twice",
                Expression::macro_literal(
                    &["x"],
                    BlockStatement::new(vec![Statement::expr(plus(
                        Expression::ident("x"),
                        Expression::ident("x"),
                    ))]),
                ),
            ),
        ]);

        let macros = define_macros(&mut program);
        assert_eq!(macros.len(), 1);
        assert!(macros.contains("twice"));
        assert_eq!(
            program,
            Program::new(vec![Statement::let_binding("number", Expression::int(1))])
        );
    }

    #[test]
    fn test_expansion_substitutes_unevaluated_arguments() {
        let mut program = Program::new(vec![
            Statement::let_binding(
                "reverse",
                Expression::macro_literal(
                    &["a", "b"],
                    BlockStatement::new(vec![Statement::expr(Expression::infix(
                        Expression::ident("b"),
                        InfixOperator::Minus,
                        Expression::ident("a"),
                    ))]),
                ),
            ),
            Statement::expr(Expression::call(
                Expression::ident("reverse"),
                vec![
                    Expression::infix(Expression::int(2), InfixOperator::Multiply, Expression::int(2)),
                    plus(Expression::int(10), Expression::int(5)),
                ],
            )),
        ]);

        let macros = define_macros(&mut program);
        let expanded = expand_macros(program, &macros);
        assert_eq!(expanded.to_string(), "((10 + 5) - (2 * 2))");
    }

    #[test]
    fn test_multi_statement_body_expands_to_immediate_call() {
        let mut program = Program::new(vec![
            Statement::let_binding(
                "block",
                Expression::macro_literal(
                    &["x"],
                    BlockStatement::new(vec![
                        Statement::let_binding("y", Expression::ident("x")),
                        Statement::expr(Expression::ident("y")),
                    ]),
                ),
            ),
            Statement::expr(Expression::call(
                Expression::ident("block"),
                vec![Expression::int(7)],
            )),
        ]);

        let macros = define_macros(&mut program);
        let expanded = expand_macros(program, &macros);
        assert_eq!(expanded.to_string(), "fn() { let y = 7; y }()");
    }

    #[test]
    fn test_unknown_calls_and_wrong_arity_are_left_alone() {
        let mut program = Program::new(vec![
            Statement::let_binding(
                "one",
                Expression::macro_literal(
                    &["x"],
                    BlockStatement::new(vec![Statement::expr(Expression::ident("x"))]),
                ),
            ),
            Statement::expr(Expression::call(Expression::ident("other"), vec![])),
            Statement::expr(Expression::call(Expression::ident("one"), vec![])),
        ]);

        let macros = define_macros(&mut program);
        let expanded = expand_macros(program.clone(), &macros);
        assert_eq!(expanded, program);
    }
}
