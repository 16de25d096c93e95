use model::core::value::Value;

/// Runtime access to the row currently being evaluated and to the process
/// environment, threaded through every `Expr` evaluation. Implemented by
/// callers in `engine-core` against a `Row`/`Schema` pair; kept as a trait
/// here so this crate never depends on a concrete row type's schema lookup.
pub trait EvalContext {
    fn field(&self, name: &str) -> Option<Value>;
    fn env(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// A context with no row, used to evaluate constant subexpressions (e.g.
/// `--overwrite` literal arguments) without a row in scope.
pub struct EmptyContext;

impl EvalContext for EmptyContext {
    fn field(&self, _name: &str) -> Option<Value> {
        None
    }
}
