pub mod binary;

use model::core::value::Value;
use tracing::warn;

use self::binary::BinaryOpEvaluator;
use crate::ast::{BinaryOp, Expr, UnaryOp};
use crate::context::EvalContext;
use crate::error::{ExpressionError, Result};
use crate::functions::FunctionRegistry;

/// Evaluates a parsed `Expr` against a row context, producing a `Value`.
/// Unlike the teacher's `CompiledExpression` evaluator this returns a
/// `Result` rather than silently degrading to `None` on a missing field —
/// callers (the `compute`/`filter` transformers) decide whether a missing
/// field is a data error or a null.
pub fn eval(expr: &Expr, ctx: &dyn EvalContext, registry: &FunctionRegistry) -> Result<Value> {
    match expr {
        Expr::Literal(v) => Ok(v.clone()),
        Expr::Field(name) => Ok(ctx.field(name).unwrap_or(Value::Null)),
        Expr::Unary { op, operand } => {
            let value = eval(operand, ctx, registry)?;
            eval_unary(*op, &value)
        }
        Expr::Binary { left, op, right } => {
            let l = eval(left, ctx, registry)?;
            let r = eval(right, ctx, registry)?;
            BinaryOpEvaluator::new(&l, &r, *op)
                .evaluate()
                .ok_or_else(|| ExpressionError::UnsupportedOperation(format!("{op:?} on {l:?} and {r:?}")))
        }
        Expr::Call { name, args } => {
            let evaluated: Vec<Value> = args
                .iter()
                .map(|a| eval(a, ctx, registry))
                .collect::<Result<_>>()?;
            registry.call(name, &evaluated, ctx)
        }
    }
}

fn eval_unary(op: UnaryOp, value: &Value) -> Result<Value> {
    match (op, value) {
        (UnaryOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
        (UnaryOp::Negate, Value::Int64(i)) => Ok(Value::Int64(-i)),
        (UnaryOp::Negate, Value::Float64(f)) => Ok(Value::Float64(-f)),
        (UnaryOp::Negate, Value::Int32(i)) => Ok(Value::Int32(-i)),
        (op, other) => {
            warn!("unary operator {:?} not applicable to {:?}", op, other);
            Err(ExpressionError::TypeMismatch {
                expected: "numeric or boolean".into(),
                actual: format!("{other:?}"),
            })
        }
    }
}

/// Evaluates an expression expecting a boolean result, as the `filter`
/// transformer kind does (§4.2: "drops row when predicate is falsy").
/// Non-boolean truthy coercion mirrors common scripting-language semantics:
/// non-null, non-zero, non-empty values are truthy.
pub fn eval_predicate(expr: &Expr, ctx: &dyn EvalContext, registry: &FunctionRegistry) -> Result<bool> {
    let value = eval(expr, ctx, registry)?;
    Ok(is_truthy(&value))
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        Value::Int8(i) => *i != 0,
        Value::Int16(i) => *i != 0,
        Value::Int32(i) => *i != 0,
        Value::Int64(i) => *i != 0,
        Value::Uint8(i) => *i != 0,
        Value::Uint16(i) => *i != 0,
        Value::Uint32(i) => *i != 0,
        Value::Uint64(i) => *i != 0,
        Value::Float32(f) => *f != 0.0,
        Value::Float64(f) => *f != 0.0,
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::parser::parse;
    use std::collections::HashMap;

    struct MapContext(HashMap<String, Value>);
    impl EvalContext for MapContext {
        fn field(&self, name: &str) -> Option<Value> {
            self.0.get(name).cloned()
        }
    }

    #[test]
    fn evaluates_field_reference() {
        let mut fields = HashMap::new();
        fields.insert("active".to_string(), Value::Bool(true));
        let ctx = MapContext(fields);
        let registry = FunctionRegistry::new();
        let expr = parse("row.active").unwrap();
        assert_eq!(eval(&expr, &ctx, &registry).unwrap(), Value::Bool(true));
    }

    #[test]
    fn missing_field_evaluates_to_null() {
        let ctx = MapContext(HashMap::new());
        let registry = FunctionRegistry::new();
        let expr = parse("row.missing").unwrap();
        assert_eq!(eval(&expr, &ctx, &registry).unwrap(), Value::Null);
    }

    #[test]
    fn predicate_coerces_truthiness() {
        let mut fields = HashMap::new();
        fields.insert("name".to_string(), Value::String("".into()));
        let ctx = MapContext(fields);
        let registry = FunctionRegistry::new();
        let expr = parse("row.name").unwrap();
        assert!(!eval_predicate(&expr, &ctx, &registry).unwrap());
    }
}
