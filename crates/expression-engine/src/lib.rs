//! The scripting seam consumed by the `compute`, `filter`, and `expand`
//! transformer kinds. Owns a small bundled expression language
//! (`ScriptEngine`/`DefaultScriptEngine`) behind the same trait a real
//! JavaScript evaluator would implement in production.

pub mod ast;
pub mod context;
pub mod engine;
pub mod error;
pub mod eval;
pub mod functions;

pub use ast::{parser::parse, BinaryOp, Expr, UnaryOp};
pub use context::{EmptyContext, EvalContext};
pub use engine::{DefaultScriptEngine, ScriptEngine};
pub use error::{ExpressionError, Result};
pub use eval::{eval, eval_predicate};
pub use functions::FunctionRegistry;
