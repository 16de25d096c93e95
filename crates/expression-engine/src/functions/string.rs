use model::core::value::Value;

use crate::context::EvalContext;
use crate::error::{ExpressionError, Result};

pub fn eval_lower(args: &[Value], _ctx: &dyn EvalContext) -> Result<Value> {
    match args.first() {
        Some(Value::String(s)) => Ok(Value::String(s.to_lowercase())),
        Some(other) => Err(ExpressionError::InvalidFunctionArgs {
            function: "lower".into(),
            message: format!("expected string, got {other:?}"),
        }),
        None => Err(ExpressionError::InvalidFunctionArgs {
            function: "lower".into(),
            message: "expected 1 argument, got 0".into(),
        }),
    }
}

pub fn eval_upper(args: &[Value], _ctx: &dyn EvalContext) -> Result<Value> {
    match args.first() {
        Some(Value::String(s)) => Ok(Value::String(s.to_uppercase())),
        Some(other) => Err(ExpressionError::InvalidFunctionArgs {
            function: "upper".into(),
            message: format!("expected string, got {other:?}"),
        }),
        None => Err(ExpressionError::InvalidFunctionArgs {
            function: "upper".into(),
            message: "expected 1 argument, got 0".into(),
        }),
    }
}

pub fn eval_concat(args: &[Value], _ctx: &dyn EvalContext) -> Result<Value> {
    Ok(Value::String(
        args.iter().map(Value::as_display_string).collect::<Vec<_>>().join(""),
    ))
}

pub fn eval_trim(args: &[Value], _ctx: &dyn EvalContext) -> Result<Value> {
    match args.first() {
        Some(Value::String(s)) => Ok(Value::String(s.trim().to_string())),
        Some(other) => Err(ExpressionError::InvalidFunctionArgs {
            function: "trim".into(),
            message: format!("expected string, got {other:?}"),
        }),
        None => Err(ExpressionError::InvalidFunctionArgs {
            function: "trim".into(),
            message: "expected 1 argument, got 0".into(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::EmptyContext;

    #[test]
    fn lower_and_upper_round_trip() {
        let ctx = EmptyContext;
        let upper = eval_upper(&[Value::String("hi".into())], &ctx).unwrap();
        assert_eq!(upper, Value::String("HI".into()));
        let lower = eval_lower(&[upper], &ctx).unwrap();
        assert_eq!(lower, Value::String("hi".into()));
    }

    #[test]
    fn concat_joins_mixed_types() {
        let ctx = EmptyContext;
        let result = eval_concat(&[Value::String("n=".into()), Value::Int32(3)], &ctx).unwrap();
        assert_eq!(result, Value::String("n=3".into()));
    }
}
