//! Bottom-up tree rewriting.
//!
//! `modify` visits every child of a node before the node itself and hands
//! each one to the modifier. A replacement that does not fit the slot it
//! came from is dropped: list slots lose the element, expression slots get
//! [`Expression::Empty`] and block slots get an empty block.

use core::fmt;
use std::sync::Arc;

use super::{BlockStatement, Expression, Identifier, MacroLiteral, Program, Statement};

/// Any node the modifier can be handed or asked to return.
///
/// Identifiers and blocks always travel as their own variants, so a
/// modifier can match `Node::Identifier` regardless of the slot it sits in.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Program(Program),
    Statement(Statement),
    Expression(Expression),
    Block(BlockStatement),
    Identifier(Identifier),
}

impl From<Expression> for Node {
    fn from(expression: Expression) -> Self {
        match expression {
            Expression::Identifier(identifier) => Node::Identifier(identifier),
            other => Node::Expression(other),
        }
    }
}

impl From<Statement> for Node {
    fn from(statement: Statement) -> Self {
        match statement {
            Statement::Block(block) => Node::Block(block),
            other => Node::Statement(other),
        }
    }
}

impl From<BlockStatement> for Node {
    fn from(block: BlockStatement) -> Self {
        Node::Block(block)
    }
}

impl From<Program> for Node {
    fn from(program: Program) -> Self {
        Node::Program(program)
    }
}

impl TryFrom<Node> for Expression {
    type Error = Node;

    fn try_from(node: Node) -> Result<Self, Self::Error> {
        match node {
            Node::Expression(expression) => Ok(expression),
            Node::Identifier(identifier) => Ok(Expression::Identifier(identifier)),
            other => Err(other),
        }
    }
}

impl TryFrom<Node> for Statement {
    type Error = Node;

    fn try_from(node: Node) -> Result<Self, Self::Error> {
        match node {
            Node::Statement(statement) => Ok(statement),
            Node::Block(block) => Ok(Statement::Block(block)),
            other => Err(other),
        }
    }
}

impl TryFrom<Node> for BlockStatement {
    type Error = Node;

    fn try_from(node: Node) -> Result<Self, Self::Error> {
        match node {
            Node::Block(block) | Node::Statement(Statement::Block(block)) => Ok(block),
            other => Err(other),
        }
    }
}

impl TryFrom<Node> for Identifier {
    type Error = Node;

    fn try_from(node: Node) -> Result<Self, Self::Error> {
        match node {
            Node::Identifier(identifier)
            | Node::Expression(Expression::Identifier(identifier)) => Ok(identifier),
            other => Err(other),
        }
    }
}

impl TryFrom<Node> for Program {
    type Error = Node;

    fn try_from(node: Node) -> Result<Self, Self::Error> {
        match node {
            Node::Program(program) => Ok(program),
            other => Err(other),
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Program(program) => write!(f, "{}", program),
            Node::Statement(statement) => write!(f, "{}", statement),
            Node::Expression(expression) => write!(f, "{}", expression),
            Node::Block(block) => write!(f, "{}", block),
            Node::Identifier(identifier) => write!(f, "{}", identifier),
        }
    }
}

/// Rewrites `node` bottom-up, applying `modifier` to every node of every
/// composite kind and finally to `node` itself.
pub fn modify<F>(node: Node, mut modifier: F) -> Node
where
    F: FnMut(Node) -> Node,
{
    modify_node(node, &mut modifier)
}

fn modify_node<F>(node: Node, modifier: &mut F) -> Node
where
    F: FnMut(Node) -> Node,
{
    let node = match node {
        Node::Program(program) => Node::Program(Program {
            statements: modify_statements(program.statements, modifier),
        }),
        Node::Block(block) => Node::Block(modify_block_children(block, modifier)),
        Node::Statement(statement) => Node::from(modify_statement_children(statement, modifier)),
        Node::Expression(expression) => {
            Node::from(modify_expression_children(expression, modifier))
        }
        Node::Identifier(identifier) => Node::Identifier(identifier),
    };
    modifier(node)
}

fn modify_statements<F>(statements: Vec<Statement>, modifier: &mut F) -> Vec<Statement>
where
    F: FnMut(Node) -> Node,
{
    statements
        .into_iter()
        .filter_map(|statement| Statement::try_from(modify_node(statement.into(), modifier)).ok())
        .collect()
}

fn modify_expressions<F>(expressions: Vec<Expression>, modifier: &mut F) -> Vec<Expression>
where
    F: FnMut(Node) -> Node,
{
    expressions
        .into_iter()
        .filter_map(|expression| {
            Expression::try_from(modify_node(expression.into(), modifier)).ok()
        })
        .collect()
}

fn modify_identifiers<F>(identifiers: Vec<Identifier>, modifier: &mut F) -> Vec<Identifier>
where
    F: FnMut(Node) -> Node,
{
    identifiers
        .into_iter()
        .filter_map(|identifier| {
            Identifier::try_from(modify_node(Node::Identifier(identifier), modifier)).ok()
        })
        .collect()
}

fn modify_expression<F>(expression: Expression, modifier: &mut F) -> Expression
where
    F: FnMut(Node) -> Node,
{
    Expression::try_from(modify_node(expression.into(), modifier)).unwrap_or(Expression::Empty)
}

fn modify_boxed<F>(expression: Box<Expression>, modifier: &mut F) -> Box<Expression>
where
    F: FnMut(Node) -> Node,
{
    Box::new(modify_expression(*expression, modifier))
}

fn modify_block<F>(block: BlockStatement, modifier: &mut F) -> BlockStatement
where
    F: FnMut(Node) -> Node,
{
    BlockStatement::try_from(modify_node(Node::Block(block), modifier)).unwrap_or_default()
}

fn modify_block_children<F>(block: BlockStatement, modifier: &mut F) -> BlockStatement
where
    F: FnMut(Node) -> Node,
{
    BlockStatement {
        statements: modify_statements(block.statements, modifier),
    }
}

fn modify_statement_children<F>(statement: Statement, modifier: &mut F) -> Statement
where
    F: FnMut(Node) -> Node,
{
    match statement {
        Statement::Let { name, value } => Statement::Let {
            name,
            value: modify_expression(value, modifier),
        },
        Statement::Mutable { name, value } => Statement::Mutable {
            name,
            value: modify_expression(value, modifier),
        },
        Statement::Assign {
            name,
            operator,
            value,
        } => Statement::Assign {
            name,
            operator,
            value: modify_expression(value, modifier),
        },
        Statement::Return(value) => Statement::Return(value.and_then(|value| {
            Expression::try_from(modify_node(value.into(), modifier)).ok()
        })),
        Statement::Expression(expression) => {
            Statement::Expression(modify_expression(expression, modifier))
        }
        Statement::Block(block) => Statement::Block(modify_block_children(block, modifier)),
    }
}

fn modify_expression_children<F>(expression: Expression, modifier: &mut F) -> Expression
where
    F: FnMut(Node) -> Node,
{
    match expression {
        Expression::Prefix { operator, right } => Expression::Prefix {
            operator,
            right: modify_boxed(right, modifier),
        },
        Expression::Infix {
            left,
            operator,
            right,
        } => Expression::Infix {
            left: modify_boxed(left, modifier),
            operator,
            right: modify_boxed(right, modifier),
        },
        Expression::Array(elements) => Expression::Array(modify_expressions(elements, modifier)),
        Expression::Hash(pairs) => Expression::Hash(
            pairs
                .into_iter()
                .filter_map(|(key, value)| {
                    let key = Expression::try_from(modify_node(key.into(), modifier)).ok()?;
                    let value = Expression::try_from(modify_node(value.into(), modifier)).ok()?;
                    Some((key, value))
                })
                .collect(),
        ),
        Expression::Index { left, index } => Expression::Index {
            left: modify_boxed(left, modifier),
            index: modify_boxed(index, modifier),
        },
        Expression::If {
            condition,
            consequence,
            alternative,
        } => Expression::If {
            condition: modify_boxed(condition, modifier),
            consequence: modify_block(consequence, modifier),
            alternative: alternative.map(|block| modify_block(block, modifier)),
        },
        Expression::Ternary {
            condition,
            if_true,
            if_false,
        } => Expression::Ternary {
            condition: modify_boxed(condition, modifier),
            if_true: modify_boxed(if_true, modifier),
            if_false: modify_boxed(if_false, modifier),
        },
        Expression::While { condition, body } => Expression::While {
            condition: modify_boxed(condition, modifier),
            body: modify_block(body, modifier),
        },
        Expression::For { condition, body } => Expression::For {
            condition: modify_boxed(condition, modifier),
            body: modify_block(body, modifier),
        },
        Expression::Foreach {
            index,
            item,
            iterable,
            body,
        } => Expression::Foreach {
            index,
            item,
            iterable: modify_boxed(iterable, modifier),
            body: modify_block(body, modifier),
        },
        Expression::Import(name) => Expression::Import(modify_boxed(name, modifier)),
        Expression::Function(literal) => {
            let mut literal = Arc::unwrap_or_clone(literal);
            literal.parameters = modify_identifiers(literal.parameters, modifier);
            literal.defaults = literal
                .defaults
                .into_iter()
                .filter_map(|(name, value)| {
                    let value = Expression::try_from(modify_node(value.into(), modifier)).ok()?;
                    Some((name, value))
                })
                .collect();
            literal.body = modify_block(literal.body, modifier);
            Expression::Function(Arc::new(literal))
        }
        Expression::Call {
            function,
            arguments,
        } => Expression::Call {
            function: modify_boxed(function, modifier),
            arguments: modify_expressions(arguments, modifier),
        },
        Expression::Macro(literal) => Expression::Macro(MacroLiteral {
            parameters: modify_identifiers(literal.parameters, modifier),
            body: modify_block(literal.body, modifier),
        }),
        leaf => leaf,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{AssignOperator, FunctionLiteral, InfixOperator, PrefixOperator};
    use pretty_assertions::assert_eq;

    fn one() -> Expression {
        Expression::int(1)
    }

    fn two() -> Expression {
        Expression::int(2)
    }

    fn turn_one_into_two(node: Node) -> Node {
        match node {
            Node::Expression(Expression::Integer(1)) => Node::Expression(Expression::int(2)),
            other => other,
        }
    }

    fn block_of(expression: Expression) -> BlockStatement {
        BlockStatement::new(vec![Statement::expr(expression)])
    }

    fn assert_rewrites(input: Node, expected: Node) {
        assert_eq!(modify(input, turn_one_into_two), expected);
    }

    #[test]
    fn test_modify_reaches_every_composite_kind() {
        let cases = vec![
            (Node::Expression(one()), Node::Expression(two())),
            (
                Node::Program(Program::new(vec![Statement::expr(one())])),
                Node::Program(Program::new(vec![Statement::expr(two())])),
            ),
            (
                Expression::infix(one(), InfixOperator::Plus, two()).into(),
                Expression::infix(two(), InfixOperator::Plus, two()).into(),
            ),
            (
                Expression::prefix(PrefixOperator::Minus, one()).into(),
                Expression::prefix(PrefixOperator::Minus, two()).into(),
            ),
            (
                Expression::index(one(), one()).into(),
                Expression::index(two(), two()).into(),
            ),
            (
                Expression::if_else(one(), block_of(one()), Some(block_of(one()))).into(),
                Expression::if_else(two(), block_of(two()), Some(block_of(two()))).into(),
            ),
            (
                Expression::ternary(one(), one(), one()).into(),
                Expression::ternary(two(), two(), two()).into(),
            ),
            (
                Statement::ret(one()).into(),
                Statement::ret(two()).into(),
            ),
            (
                Statement::let_binding("x", one()).into(),
                Statement::let_binding("x", two()).into(),
            ),
            (
                Statement::mutable("x", one()).into(),
                Statement::mutable("x", two()).into(),
            ),
            (
                Statement::assign("x", AssignOperator::AddAssign, one()).into(),
                Statement::assign("x", AssignOperator::AddAssign, two()).into(),
            ),
            (
                Expression::function(FunctionLiteral::new(vec![], block_of(one()))).into(),
                Expression::function(FunctionLiteral::new(vec![], block_of(two()))).into(),
            ),
            (
                Expression::call(Expression::ident("f"), vec![one(), one()]).into(),
                Expression::call(Expression::ident("f"), vec![two(), two()]).into(),
            ),
            (
                Expression::array(vec![one(), one()]).into(),
                Expression::array(vec![two(), two()]).into(),
            ),
            (
                Expression::hash(vec![(one(), one())]).into(),
                Expression::hash(vec![(two(), two())]).into(),
            ),
            (
                Expression::while_loop(one(), block_of(one())).into(),
                Expression::while_loop(two(), block_of(two())).into(),
            ),
            (
                Expression::foreach(None, "x", one(), block_of(one())).into(),
                Expression::foreach(None, "x", two(), block_of(two())).into(),
            ),
        ];

        for (input, expected) in cases {
            assert_rewrites(input, expected);
        }
    }

    #[test]
    fn test_function_defaults_are_rewritten() {
        let input = FunctionLiteral::new(vec![Identifier::new("a")], BlockStatement::default())
            .with_default("a", one());
        let expected = FunctionLiteral::new(vec![Identifier::new("a")], BlockStatement::default())
            .with_default("a", two());

        assert_rewrites(
            Expression::function(input).into(),
            Expression::function(expected).into(),
        );
    }

    #[test]
    fn test_modify_applies_modifier_to_root_last() {
        let mut visited = Vec::new();
        modify(
            Expression::infix(one(), InfixOperator::Plus, two()).into(),
            |node| {
                visited.push(node.to_string());
                node
            },
        );
        assert_eq!(visited, vec!["1", "2", "(1 + 2)"]);
    }

    #[test]
    fn test_incompatible_replacement_is_dropped() {
        // An expression handed back for a statement slot cannot stand there.
        let program = Program::new(vec![
            Statement::let_binding("x", one()),
            Statement::expr(Expression::ident("keep")),
        ]);
        let rewritten = modify(program.into(), |node| match node {
            Node::Statement(Statement::Let { .. }) => Node::Expression(one()),
            other => other,
        });
        assert_eq!(
            rewritten,
            Node::Program(Program::new(vec![Statement::expr(Expression::ident("keep"))]))
        );

        // A statement handed back for an expression slot leaves a placeholder.
        let rewritten = modify(
            Expression::infix(one(), InfixOperator::Plus, two()).into(),
            |node| match node {
                Node::Expression(Expression::Integer(1)) => Node::Statement(Statement::Return(None)),
                other => other,
            },
        );
        assert_eq!(
            rewritten,
            Expression::infix(Expression::Empty, InfixOperator::Plus, two()).into()
        );

        // Dropped array elements disappear from the list.
        let rewritten = modify(
            Expression::array(vec![one(), two(), one()]).into(),
            |node| match node {
                Node::Expression(Expression::Integer(1)) => Node::Program(Program::default()),
                other => other,
            },
        );
        assert_eq!(rewritten, Expression::array(vec![two()]).into());
    }

    #[test]
    fn test_identity_modifier_preserves_rendering() {
        let counter = FunctionLiteral::new(
            vec![Identifier::new("step")],
            BlockStatement::new(vec![
                Statement::mutable("total", one()),
                Statement::assign("total", AssignOperator::AddAssign, Expression::ident("step")),
                Statement::ret(Expression::ident("total")),
            ]),
        )
        .with_default("step", two());
        let program = Program::new(vec![
            Statement::let_binding("count", Expression::function(counter)),
            Statement::let_binding(
                "table",
                Expression::hash(vec![(
                    Expression::string("k"),
                    Expression::array(vec![one(), Expression::float(2.5)]),
                )]),
            ),
            Statement::expr(Expression::foreach(
                Some("i"),
                "x",
                Expression::index(Expression::ident("table"), Expression::string("k")),
                BlockStatement::new(vec![Statement::expr(Expression::if_else(
                    Expression::prefix(
                        PrefixOperator::Bang,
                        Expression::infix(Expression::ident("i"), InfixOperator::Equal, one()),
                    ),
                    block_of(Expression::call(Expression::ident("count"), vec![])),
                    Some(block_of(Expression::ternary(
                        Expression::boolean(true),
                        Expression::string("a"),
                        Expression::regexp("b+", "i"),
                    ))),
                ))]),
            )),
            Statement::expr(Expression::while_loop(
                Expression::boolean(false),
                block_of(Expression::postfix("i", crate::ast::PostfixOperator::Increment)),
            )),
        ]);

        let rendered = program.to_string();
        let rewritten = modify(program.clone().into(), |node| node);
        assert_eq!(rewritten.to_string(), rendered);
        assert_eq!(rewritten, Node::Program(program));
    }

    #[test]
    fn test_identifiers_are_handed_to_modifier_uniformly() {
        let rewritten = modify(
            Expression::call(Expression::ident("x"), vec![Expression::ident("x")]).into(),
            |node| match node {
                Node::Identifier(ident) if ident.value == "x" => Node::Expression(one()),
                other => other,
            },
        );
        assert_eq!(rewritten, Expression::call(one(), vec![one()]).into());
    }
}
