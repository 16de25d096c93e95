pub mod parser;

use model::core::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Equal,
    NotEqual,
    GreaterThan,
    LessThan,
    GreaterOrEqual,
    LessOrEqual,
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Negate,
}

/// The closed expression grammar the default evaluator understands. This is
/// deliberately a small arithmetic/boolean/field-access language, not a JS
/// parser — the full scripting surface `compute`/`filter`/`expand`
/// directives describe in the CLI is an external collaborator behind
/// `ScriptEngine` (spec §1 Non-goals); this AST is the one concrete,
/// bundled implementation of that interface.
#[derive(Debug, Clone)]
pub enum Expr {
    Literal(Value),
    /// A bare or dotted field reference, e.g. `row.active` or `active`.
    /// The `row.` prefix is optional sugar; both resolve against the
    /// current row's schema.
    Field(String),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
    },
    Call {
        name: String,
        args: Vec<Expr>,
    },
}
