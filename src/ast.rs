use core::fmt;
use std::{collections::HashMap, sync::Arc};

use strum::{Display, EnumString};

pub mod modify;

pub use modify::{modify, Node};

/// Common surface of every syntax tree node.
pub trait AstNode: fmt::Display {
    /// Literal text of the token the node starts with.
    fn token_literal(&self) -> String;
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Identifier {
    pub value: String,
}

impl Identifier {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }
}

impl From<&str> for Identifier {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

impl AstNode for Identifier {
    fn token_literal(&self) -> String {
        self.value.clone()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
pub enum PrefixOperator {
    #[strum(serialize = "!")]
    Bang,
    #[strum(serialize = "-")]
    Minus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
pub enum InfixOperator {
    #[strum(serialize = "+")]
    Plus,
    #[strum(serialize = "-")]
    Minus,
    #[strum(serialize = "*")]
    Multiply,
    #[strum(serialize = "/")]
    Divide,
    #[strum(serialize = "%")]
    Modulo,
    #[strum(serialize = "**")]
    Power,
    #[strum(serialize = "<")]
    Less,
    #[strum(serialize = "<=")]
    LessEqual,
    #[strum(serialize = ">")]
    Greater,
    #[strum(serialize = ">=")]
    GreaterEqual,
    #[strum(serialize = "==")]
    Equal,
    #[strum(serialize = "!=")]
    NotEqual,
    #[strum(serialize = "&&")]
    And,
    #[strum(serialize = "||")]
    Or,
    #[strum(serialize = "=~")]
    Matches,
    #[strum(serialize = "!~")]
    NotMatches,
    #[strum(serialize = "..")]
    Range,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
pub enum PostfixOperator {
    #[strum(serialize = "++")]
    Increment,
    #[strum(serialize = "--")]
    Decrement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
pub enum AssignOperator {
    #[strum(serialize = "=")]
    Assign,
    #[strum(serialize = "+=")]
    AddAssign,
    #[strum(serialize = "-=")]
    SubAssign,
    #[strum(serialize = "*=")]
    MulAssign,
    #[strum(serialize = "/=")]
    DivAssign,
}

impl AssignOperator {
    /// Arithmetic operator a compound assignment applies before storing.
    pub fn infix(self) -> Option<InfixOperator> {
        match self {
            AssignOperator::Assign => None,
            AssignOperator::AddAssign => Some(InfixOperator::Plus),
            AssignOperator::SubAssign => Some(InfixOperator::Minus),
            AssignOperator::MulAssign => Some(InfixOperator::Multiply),
            AssignOperator::DivAssign => Some(InfixOperator::Divide),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct BlockStatement {
    pub statements: Vec<Statement>,
}

impl BlockStatement {
    pub fn new(statements: Vec<Statement>) -> Self {
        Self { statements }
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
}

/// `fn name(a, b = 2) { ... }`. A named literal binds itself in the
/// enclosing scope when evaluated.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FunctionLiteral {
    pub name: Option<Identifier>,
    pub parameters: Vec<Identifier>,
    pub defaults: HashMap<String, Expression>,
    pub body: BlockStatement,
}

impl FunctionLiteral {
    pub fn new(parameters: Vec<Identifier>, body: BlockStatement) -> Self {
        Self {
            name: None,
            parameters,
            defaults: HashMap::new(),
            body,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(Identifier::new(name));
        self
    }

    pub fn with_default(mut self, parameter: impl Into<String>, value: Expression) -> Self {
        self.defaults.insert(parameter.into(), value);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MacroLiteral {
    pub parameters: Vec<Identifier>,
    pub body: BlockStatement,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Identifier(Identifier),
    Integer(i64),
    Float(f64),
    String(String),
    Boolean(bool),
    Regexp {
        pattern: String,
        flags: String,
    },
    DocString(String),
    Backtick(String),
    Prefix {
        operator: PrefixOperator,
        right: Box<Expression>,
    },
    Infix {
        left: Box<Expression>,
        operator: InfixOperator,
        right: Box<Expression>,
    },
    Postfix {
        target: Identifier,
        operator: PostfixOperator,
    },
    Array(Vec<Expression>),
    /// Pairs stay in source order.
    Hash(Vec<(Expression, Expression)>),
    Index {
        left: Box<Expression>,
        index: Box<Expression>,
    },
    If {
        condition: Box<Expression>,
        consequence: BlockStatement,
        alternative: Option<BlockStatement>,
    },
    Ternary {
        condition: Box<Expression>,
        if_true: Box<Expression>,
        if_false: Box<Expression>,
    },
    While {
        condition: Box<Expression>,
        body: BlockStatement,
    },
    For {
        condition: Box<Expression>,
        body: BlockStatement,
    },
    Foreach {
        index: Option<Identifier>,
        item: Identifier,
        iterable: Box<Expression>,
        body: BlockStatement,
    },
    Import(Box<Expression>),
    Function(Arc<FunctionLiteral>),
    Call {
        function: Box<Expression>,
        arguments: Vec<Expression>,
    },
    /// `...`, the arguments of the running call beyond its declared parameters.
    CurrentArgs,
    Macro(MacroLiteral),
    /// Left behind when a rewrite drops a required child.
    Empty,
}

// Constructors used by embedders and tests that build trees by hand.
impl Expression {
    pub fn ident(name: impl Into<String>) -> Self {
        Expression::Identifier(Identifier::new(name))
    }

    pub fn int(value: i64) -> Self {
        Expression::Integer(value)
    }

    pub fn float(value: f64) -> Self {
        Expression::Float(value)
    }

    pub fn string(value: impl Into<String>) -> Self {
        Expression::String(value.into())
    }

    pub fn boolean(value: bool) -> Self {
        Expression::Boolean(value)
    }

    pub fn regexp(pattern: impl Into<String>, flags: impl Into<String>) -> Self {
        Expression::Regexp {
            pattern: pattern.into(),
            flags: flags.into(),
        }
    }

    pub fn docstring(value: impl Into<String>) -> Self {
        Expression::DocString(value.into())
    }

    pub fn backtick(command: impl Into<String>) -> Self {
        Expression::Backtick(command.into())
    }

    pub fn prefix(operator: PrefixOperator, right: Expression) -> Self {
        Expression::Prefix {
            operator,
            right: Box::new(right),
        }
    }

    pub fn infix(left: Expression, operator: InfixOperator, right: Expression) -> Self {
        Expression::Infix {
            left: Box::new(left),
            operator,
            right: Box::new(right),
        }
    }

    pub fn postfix(target: impl Into<String>, operator: PostfixOperator) -> Self {
        Expression::Postfix {
            target: Identifier::new(target),
            operator,
        }
    }

    pub fn array(elements: Vec<Expression>) -> Self {
        Expression::Array(elements)
    }

    pub fn hash(pairs: Vec<(Expression, Expression)>) -> Self {
        Expression::Hash(pairs)
    }

    pub fn index(left: Expression, index: Expression) -> Self {
        Expression::Index {
            left: Box::new(left),
            index: Box::new(index),
        }
    }

    pub fn if_else(
        condition: Expression,
        consequence: BlockStatement,
        alternative: Option<BlockStatement>,
    ) -> Self {
        Expression::If {
            condition: Box::new(condition),
            consequence,
            alternative,
        }
    }

    pub fn ternary(condition: Expression, if_true: Expression, if_false: Expression) -> Self {
        Expression::Ternary {
            condition: Box::new(condition),
            if_true: Box::new(if_true),
            if_false: Box::new(if_false),
        }
    }

    pub fn while_loop(condition: Expression, body: BlockStatement) -> Self {
        Expression::While {
            condition: Box::new(condition),
            body,
        }
    }

    pub fn for_loop(condition: Expression, body: BlockStatement) -> Self {
        Expression::For {
            condition: Box::new(condition),
            body,
        }
    }

    pub fn foreach(
        index: Option<&str>,
        item: impl Into<String>,
        iterable: Expression,
        body: BlockStatement,
    ) -> Self {
        Expression::Foreach {
            index: index.map(Identifier::new),
            item: Identifier::new(item),
            iterable: Box::new(iterable),
            body,
        }
    }

    pub fn import(name: impl Into<String>) -> Self {
        Expression::Import(Box::new(Expression::string(name)))
    }

    pub fn function(literal: FunctionLiteral) -> Self {
        Expression::Function(Arc::new(literal))
    }

    /// Anonymous function over plain parameter names.
    pub fn lambda(parameters: &[&str], body: BlockStatement) -> Self {
        Expression::function(FunctionLiteral::new(
            parameters.iter().copied().map(Identifier::new).collect(),
            body,
        ))
    }

    pub fn call(function: Expression, arguments: Vec<Expression>) -> Self {
        Expression::Call {
            function: Box::new(function),
            arguments,
        }
    }

    pub fn macro_literal(parameters: &[&str], body: BlockStatement) -> Self {
        Expression::Macro(MacroLiteral {
            parameters: parameters.iter().copied().map(Identifier::new).collect(),
            body,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// `let name = value;` introduces a constant.
    Let { name: Identifier, value: Expression },
    Mutable { name: Identifier, value: Expression },
    Assign {
        name: Identifier,
        operator: AssignOperator,
        value: Expression,
    },
    Return(Option<Expression>),
    Expression(Expression),
    Block(BlockStatement),
}

impl Statement {
    pub fn let_binding(name: impl Into<String>, value: Expression) -> Self {
        Statement::Let {
            name: Identifier::new(name),
            value,
        }
    }

    pub fn mutable(name: impl Into<String>, value: Expression) -> Self {
        Statement::Mutable {
            name: Identifier::new(name),
            value,
        }
    }

    pub fn assign(name: impl Into<String>, operator: AssignOperator, value: Expression) -> Self {
        Statement::Assign {
            name: Identifier::new(name),
            operator,
            value,
        }
    }

    pub fn ret(value: Expression) -> Self {
        Statement::Return(Some(value))
    }

    pub fn expr(expression: Expression) -> Self {
        Statement::Expression(expression)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub statements: Vec<Statement>,
}

impl Program {
    pub fn new(statements: Vec<Statement>) -> Self {
        Self { statements }
    }
}

fn join<T: fmt::Display>(items: &[T], separator: &str) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(separator)
}

impl fmt::Display for BlockStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.statements.is_empty() {
            return f.write_str("{}");
        }
        write!(f, "{{ {} }}", join(&self.statements, " "))
    }
}

impl fmt::Display for FunctionLiteral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parameters = self
            .parameters
            .iter()
            .map(|p| match self.defaults.get(&p.value) {
                Some(default) => format!("{} = {}", p, default),
                None => p.to_string(),
            })
            .collect::<Vec<_>>()
            .join(", ");
        match &self.name {
            Some(name) => write!(f, "fn {}({}) {}", name, parameters, self.body),
            None => write!(f, "fn({}) {}", parameters, self.body),
        }
    }
}

impl fmt::Display for MacroLiteral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "macro({}) {}", join(&self.parameters, ", "), self.body)
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Identifier(ident) => write!(f, "{}", ident),
            Expression::Integer(value) => write!(f, "{}", value),
            Expression::Float(value) => write!(f, "{:?}", value),
            Expression::String(value) => write!(f, "{:?}", value),
            Expression::Boolean(value) => write!(f, "{}", value),
            Expression::Regexp { pattern, flags } => write!(f, "/{}/{}", pattern, flags),
            Expression::DocString(value) => write!(f, "<<<{}>>>", value),
            Expression::Backtick(command) => write!(f, "`{}`", command),
            Expression::Prefix { operator, right } => write!(f, "({}{})", operator, right),
            Expression::Infix {
                left,
                operator,
                right,
            } => write!(f, "({} {} {})", left, operator, right),
            Expression::Postfix { target, operator } => write!(f, "({}{})", target, operator),
            Expression::Array(elements) => write!(f, "[{}]", join(elements, ", ")),
            Expression::Hash(pairs) => {
                let pairs = pairs
                    .iter()
                    .map(|(k, v)| format!("{}: {}", k, v))
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "{{{}}}", pairs)
            }
            Expression::Index { left, index } => write!(f, "({}[{}])", left, index),
            Expression::If {
                condition,
                consequence,
                alternative,
            } => {
                write!(f, "if ({}) {}", condition, consequence)?;
                if let Some(alternative) = alternative {
                    write!(f, " else {}", alternative)?;
                }
                Ok(())
            }
            Expression::Ternary {
                condition,
                if_true,
                if_false,
            } => write!(f, "({} ? {} : {})", condition, if_true, if_false),
            Expression::While { condition, body } => write!(f, "while ({}) {}", condition, body),
            Expression::For { condition, body } => write!(f, "for ({}) {}", condition, body),
            Expression::Foreach {
                index,
                item,
                iterable,
                body,
            } => match index {
                Some(index) => write!(f, "foreach {}, {} in {} {}", index, item, iterable, body),
                None => write!(f, "foreach {} in {} {}", item, iterable, body),
            },
            Expression::Import(name) => write!(f, "import({})", name),
            Expression::Function(literal) => write!(f, "{}", literal),
            Expression::Call {
                function,
                arguments,
            } => write!(f, "{}({})", function, join(arguments, ", ")),
            Expression::CurrentArgs => f.write_str("..."),
            Expression::Macro(literal) => write!(f, "{}", literal),
            Expression::Empty => Ok(()),
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::Let { name, value } => write!(f, "let {} = {};", name, value),
            Statement::Mutable { name, value } => write!(f, "mutable {} = {};", name, value),
            Statement::Assign {
                name,
                operator,
                value,
            } => write!(f, "{} {} {};", name, operator, value),
            Statement::Return(Some(value)) => write!(f, "return {};", value),
            Statement::Return(None) => f.write_str("return;"),
            Statement::Expression(expression) => write!(f, "{}", expression),
            Statement::Block(block) => write!(f, "{}", block),
        }
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&join(&self.statements, "\n"))
    }
}

impl AstNode for Expression {
    fn token_literal(&self) -> String {
        match self {
            Expression::Identifier(ident) => ident.token_literal(),
            Expression::Integer(value) => value.to_string(),
            Expression::Float(value) => format!("{:?}", value),
            Expression::String(value) | Expression::DocString(value) => value.clone(),
            Expression::Boolean(value) => value.to_string(),
            Expression::Regexp { pattern, .. } => pattern.clone(),
            Expression::Backtick(command) => command.clone(),
            Expression::Prefix { operator, .. } => operator.to_string(),
            Expression::Infix { operator, .. } => operator.to_string(),
            Expression::Postfix { target, .. } => target.token_literal(),
            Expression::Array(_) | Expression::Index { .. } => "[".to_string(),
            Expression::Hash(_) => "{".to_string(),
            Expression::If { .. } => "if".to_string(),
            Expression::Ternary { .. } => "?".to_string(),
            Expression::While { .. } => "while".to_string(),
            Expression::For { .. } => "for".to_string(),
            Expression::Foreach { .. } => "foreach".to_string(),
            Expression::Import(_) => "import".to_string(),
            Expression::Function(_) => "fn".to_string(),
            Expression::Call { .. } => "(".to_string(),
            Expression::CurrentArgs => "...".to_string(),
            Expression::Macro(_) => "macro".to_string(),
            Expression::Empty => String::new(),
        }
    }
}

impl AstNode for BlockStatement {
    fn token_literal(&self) -> String {
        "{".to_string()
    }
}

impl AstNode for Statement {
    fn token_literal(&self) -> String {
        match self {
            Statement::Let { .. } => "let".to_string(),
            Statement::Mutable { .. } => "mutable".to_string(),
            Statement::Assign { name, .. } => name.token_literal(),
            Statement::Return(_) => "return".to_string(),
            Statement::Expression(expression) => expression.token_literal(),
            Statement::Block(block) => block.token_literal(),
        }
    }
}

impl AstNode for Program {
    fn token_literal(&self) -> String {
        self.statements
            .first()
            .map(AstNode::token_literal)
            .unwrap_or_default()
    }
}
