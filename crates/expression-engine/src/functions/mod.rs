pub mod env;
pub mod string;

use std::collections::HashMap;

use model::core::value::Value;

use crate::context::EvalContext;
use crate::error::{ExpressionError, Result};

pub type FunctionImpl = fn(&[Value], &dyn EvalContext) -> Result<Value>;

/// Registry of functions callable from `compute`/`filter`/`format`
/// expressions. A fixed set of built-ins is registered by default;
/// `register` lets a caller extend it (e.g. the `fake` transformer plugs
/// in generator functions keyed by provider name).
pub struct FunctionRegistry {
    functions: HashMap<String, FunctionImpl>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            functions: HashMap::new(),
        };
        registry.register("env", env::eval_env);
        registry.register("lower", string::eval_lower);
        registry.register("upper", string::eval_upper);
        registry.register("concat", string::eval_concat);
        registry.register("trim", string::eval_trim);
        registry
    }

    pub fn register(&mut self, name: &str, func: FunctionImpl) {
        self.functions.insert(name.to_ascii_lowercase(), func);
    }

    pub fn call(&self, name: &str, args: &[Value], ctx: &dyn EvalContext) -> Result<Value> {
        let func = self
            .functions
            .get(&name.to_ascii_lowercase())
            .ok_or_else(|| ExpressionError::UnknownFunction(name.to_string()))?;
        func(args, ctx)
    }

    pub fn has_function(&self, name: &str) -> bool {
        self.functions.contains_key(&name.to_ascii_lowercase())
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::EmptyContext;

    #[test]
    fn built_ins_are_registered_case_insensitively() {
        let registry = FunctionRegistry::new();
        assert!(registry.has_function("UPPER"));
        assert!(registry.has_function("Concat"));
    }

    #[test]
    fn unknown_function_is_an_error() {
        let registry = FunctionRegistry::new();
        let ctx = EmptyContext;
        assert!(registry.call("nope", &[], &ctx).is_err());
    }

    #[test]
    fn custom_registration_overrides_lookup() {
        fn shout(args: &[Value], _ctx: &dyn EvalContext) -> Result<Value> {
            match args.first() {
                Some(Value::String(s)) => Ok(Value::String(format!("{}!", s.to_uppercase()))),
                _ => Ok(Value::Null),
            }
        }
        let mut registry = FunctionRegistry::new();
        registry.register("shout", shout);
        let ctx = EmptyContext;
        let result = registry.call("shout", &[Value::String("hi".into())], &ctx).unwrap();
        assert_eq!(result, Value::String("HI!".into()));
    }
}
