/// Tree-walking evaluation.
///
/// [`Evaluator`] is a cheap handle over an [`Interpreter`](crate::Interpreter).
/// Evaluation is split the same way the tree is: statements, expressions,
/// calls and the pure operator tables.
mod call;
pub mod evaluator;
mod expression;
pub mod operators;
mod statement;

pub use evaluator::{ControlFlow, EvalResult, Evaluator};
