use model::core::value::Value;

use crate::context::EvalContext;
use crate::error::{ExpressionError, Result};

/// `env(name)` or `env(name, default)` — reads a process environment
/// variable through the context so tests can stub it without touching the
/// real environment.
pub fn eval_env(args: &[Value], ctx: &dyn EvalContext) -> Result<Value> {
    let name = match args.first() {
        Some(Value::String(s)) => s,
        _ => {
            return Err(ExpressionError::InvalidFunctionArgs {
                function: "env".into(),
                message: "expected a string variable name".into(),
            })
        }
    };
    match ctx.env(name) {
        Some(v) => Ok(Value::String(v)),
        None => match args.get(1) {
            Some(default) => Ok(default.clone()),
            None => Ok(Value::Null),
        },
    }
}
