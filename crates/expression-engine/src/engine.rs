use std::collections::HashMap;

use model::core::value::Value;

use crate::ast::parser::parse;
use crate::context::EvalContext;
use crate::error::{ExpressionError, Result};
use crate::eval::{eval, eval_predicate};
use crate::functions::FunctionRegistry;

/// The pluggable scripting seam the `compute`, `filter`, and `expand`
/// transformer kinds are built against (§4.2). Out of scope per spec §1:
/// "the JavaScript evaluator embedded by scripting transformers" — this
/// trait is the interface that evaluator is expected to satisfy.
/// `DefaultScriptEngine` is the one concrete, bundled implementation: a
/// small arithmetic/boolean expression language, not JavaScript. A
/// production deployment wanting full JS semantics (arbitrary `.map`/
/// `.filter` chains, closures, etc.) swaps in its own `ScriptEngine` impl
/// around an embedded JS runtime.
pub trait ScriptEngine: Send + Sync {
    /// Evaluates `source` to a scalar `Value`, used by `compute`.
    fn compute(&self, source: &str, ctx: &dyn EvalContext) -> Result<Value>;

    /// Evaluates `source` to a boolean, used by `filter`. Falsy coercion
    /// follows `eval::is_truthy`.
    fn predicate(&self, source: &str, ctx: &dyn EvalContext) -> Result<bool>;

    /// Evaluates `source` to a sequence of field-override maps, one per
    /// output row, used by `expand`. Each map is merged over the current
    /// row's fields to produce the replacement rows (§4.2: "replaces row
    /// with an array of rows; each must conform to the current schema").
    fn expand(&self, source: &str, ctx: &dyn EvalContext) -> Result<Vec<HashMap<String, Value>>>;
}

/// The bundled, non-JS `ScriptEngine`. Supports:
/// - `compute`/`filter`: the full arithmetic/boolean/field-access grammar
///   in `crate::ast::parser`.
/// - `expand`: a single narrow directive, `split(<expr>, "<delim>") as
///   <field>`, sufficient for the spec's own worked example (§8 scenario 5)
///   of splitting a delimited column into multiple rows. Any other expand
///   expression returns `UnsupportedOperation` — a real JS engine is
///   required for general `.map`/`.filter` chains.
pub struct DefaultScriptEngine {
    registry: FunctionRegistry,
}

impl DefaultScriptEngine {
    pub fn new() -> Self {
        Self {
            registry: FunctionRegistry::new(),
        }
    }

    pub fn with_registry(registry: FunctionRegistry) -> Self {
        Self { registry }
    }
}

impl Default for DefaultScriptEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptEngine for DefaultScriptEngine {
    fn compute(&self, source: &str, ctx: &dyn EvalContext) -> Result<Value> {
        let expr = parse(source)?;
        eval(&expr, ctx, &self.registry)
    }

    fn predicate(&self, source: &str, ctx: &dyn EvalContext) -> Result<bool> {
        let expr = parse(source)?;
        eval_predicate(&expr, ctx, &self.registry)
    }

    fn expand(&self, source: &str, ctx: &dyn EvalContext) -> Result<Vec<HashMap<String, Value>>> {
        let (expr_src, field) = parse_expand_directive(source)?;
        let value = self.compute(expr_src, ctx)?;
        let text = value.as_display_string();
        Ok(text
            .split(',')
            .map(|token| {
                let mut row = HashMap::new();
                row.insert(field.clone(), Value::String(token.to_string()));
                row
            })
            .collect())
    }
}

/// Parses `split(<expr>) as <field>`, the one expand directive the default
/// engine understands. The delimiter is fixed to `,` for now — the only
/// case the spec's scenario 5 exercises.
fn parse_expand_directive(source: &str) -> Result<(&str, String)> {
    let (before_as, field) = source
        .rsplit_once(" as ")
        .ok_or_else(|| ExpressionError::UnsupportedOperation(format!("expand directive `{source}` is not `split(..) as field`")))?;
    let inner = before_as
        .trim()
        .strip_prefix("split(")
        .and_then(|rest| rest.strip_suffix(')'))
        .ok_or_else(|| ExpressionError::UnsupportedOperation(format!("expand directive `{source}` is not `split(..) as field`")))?;
    Ok((inner.trim(), field.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::EmptyContext;
    use std::collections::HashMap as StdHashMap;

    struct MapContext(StdHashMap<String, Value>);
    impl EvalContext for MapContext {
        fn field(&self, name: &str) -> Option<Value> {
            self.0.get(name).cloned()
        }
    }

    #[test]
    fn compute_evaluates_arithmetic() {
        let engine = DefaultScriptEngine::new();
        let ctx = EmptyContext;
        let result = engine.compute("1 + 2 * 3", &ctx).unwrap();
        assert_eq!(result, Value::Float64(7.0));
    }

    #[test]
    fn predicate_reads_row_field() {
        let mut fields = StdHashMap::new();
        fields.insert("active".to_string(), Value::Bool(true));
        let ctx = MapContext(fields);
        let engine = DefaultScriptEngine::new();
        assert!(engine.predicate("row.active", &ctx).unwrap());
    }

    #[test]
    fn expand_splits_on_comma() {
        let mut fields = StdHashMap::new();
        fields.insert("tags".to_string(), Value::String("A,B,C".into()));
        let ctx = MapContext(fields);
        let engine = DefaultScriptEngine::new();
        let rows = engine.expand("split(row.tags) as tag", &ctx).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].get("tag"), Some(&Value::String("A".into())));
        assert_eq!(rows[2].get("tag"), Some(&Value::String("C".into())));
    }

    #[test]
    fn expand_rejects_unsupported_directives() {
        let ctx = EmptyContext;
        let engine = DefaultScriptEngine::new();
        let result = engine.expand("row.tags.split(',').map(t => t)", &ctx);
        assert!(result.is_err());
    }
}
