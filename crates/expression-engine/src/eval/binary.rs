use bigdecimal::{BigDecimal, FromPrimitive};
use model::core::value::Value;
use tracing::warn;

use crate::ast::BinaryOp;

/// Binary operation evaluator, dispatching on the value types of both
/// operands. Numeric operands are widened to `f64` for the duration of the
/// computation and the result is re-boxed in the wider of the two input
/// representations (`Decimal` wins over `Float64`, matching the "widening"
/// rule `LogicalType::is_widening_compatible` enforces elsewhere).
pub(crate) struct BinaryOpEvaluator<'a> {
    left: &'a Value,
    right: &'a Value,
    op: BinaryOp,
}

impl<'a> BinaryOpEvaluator<'a> {
    pub fn new(left: &'a Value, right: &'a Value, op: BinaryOp) -> Self {
        Self { left, right, op }
    }

    pub fn evaluate(&self) -> Option<Value> {
        use Value::*;
        match (self.left, self.right) {
            (String(l), String(r)) => self.eval_string(l, r),
            (Bool(l), Bool(r)) => self.eval_bool(*l, *r),
            (Null, Null) => self.eval_null_null(),
            (Null, _) | (_, Null) => self.eval_null_other(),
            (Decimal(_), _) | (_, Decimal(_)) => self.eval_decimal(),
            _ if self.both_numeric() => self.eval_float(),
            _ => None,
        }
    }

    fn both_numeric(&self) -> bool {
        self.as_float(self.left).is_some() && self.as_float(self.right).is_some()
    }

    fn as_float(&self, v: &Value) -> Option<f64> {
        match v {
            Value::Int8(i) => Some(*i as f64),
            Value::Int16(i) => Some(*i as f64),
            Value::Int32(i) => Some(*i as f64),
            Value::Int64(i) => Some(*i as f64),
            Value::Uint8(i) => Some(*i as f64),
            Value::Uint16(i) => Some(*i as f64),
            Value::Uint32(i) => Some(*i as f64),
            Value::Uint64(i) => Some(*i as f64),
            Value::Float32(f) => Some(*f as f64),
            Value::Float64(f) => Some(*f),
            Value::Decimal(d) => {
                use bigdecimal::ToPrimitive;
                d.to_f64()
            }
            _ => None,
        }
    }

    fn eval_float(&self) -> Option<Value> {
        use Value::*;
        let l = self.as_float(self.left)?;
        let r = self.as_float(self.right)?;
        Some(match self.op {
            BinaryOp::Add => Float64(l + r),
            BinaryOp::Subtract => Float64(l - r),
            BinaryOp::Multiply => Float64(l * r),
            BinaryOp::Divide => Float64(l / r),
            BinaryOp::Modulo => Float64(l % r),
            BinaryOp::Equal => Bool((l - r).abs() < f64::EPSILON),
            BinaryOp::NotEqual => Bool((l - r).abs() >= f64::EPSILON),
            BinaryOp::GreaterThan => Bool(l > r),
            BinaryOp::LessThan => Bool(l < r),
            BinaryOp::GreaterOrEqual => Bool(l >= r),
            BinaryOp::LessOrEqual => Bool(l <= r),
            BinaryOp::And | BinaryOp::Or => {
                warn!("logical operator {:?} applied to numeric operands", self.op);
                return None;
            }
        })
    }

    fn eval_decimal(&self) -> Option<Value> {
        use Value::*;
        let l = self.as_float(self.left)?;
        let r = self.as_float(self.right)?;
        Some(match self.op {
            BinaryOp::Add => Decimal(BigDecimal::from_f64(l + r)?),
            BinaryOp::Subtract => Decimal(BigDecimal::from_f64(l - r)?),
            BinaryOp::Multiply => Decimal(BigDecimal::from_f64(l * r)?),
            BinaryOp::Divide => Decimal(BigDecimal::from_f64(l / r)?),
            BinaryOp::Modulo => Decimal(BigDecimal::from_f64(l % r)?),
            BinaryOp::Equal => Bool((l - r).abs() < f64::EPSILON),
            BinaryOp::NotEqual => Bool((l - r).abs() >= f64::EPSILON),
            BinaryOp::GreaterThan => Bool(l > r),
            BinaryOp::LessThan => Bool(l < r),
            BinaryOp::GreaterOrEqual => Bool(l >= r),
            BinaryOp::LessOrEqual => Bool(l <= r),
            BinaryOp::And | BinaryOp::Or => return None,
        })
    }

    fn eval_string(&self, l: &str, r: &str) -> Option<Value> {
        use Value::*;
        Some(match self.op {
            BinaryOp::Add => String(format!("{l}{r}")),
            BinaryOp::Equal => Bool(l == r),
            BinaryOp::NotEqual => Bool(l != r),
            BinaryOp::GreaterThan => Bool(l > r),
            BinaryOp::LessThan => Bool(l < r),
            BinaryOp::GreaterOrEqual => Bool(l >= r),
            BinaryOp::LessOrEqual => Bool(l <= r),
            _ => {
                warn!("unsupported operator {:?} for strings", self.op);
                return None;
            }
        })
    }

    fn eval_bool(&self, l: bool, r: bool) -> Option<Value> {
        use Value::*;
        Some(match self.op {
            BinaryOp::And => Bool(l && r),
            BinaryOp::Or => Bool(l || r),
            BinaryOp::Equal => Bool(l == r),
            BinaryOp::NotEqual => Bool(l != r),
            _ => return None,
        })
    }

    fn eval_null_null(&self) -> Option<Value> {
        match self.op {
            BinaryOp::Equal => Some(Value::Bool(true)),
            BinaryOp::NotEqual => Some(Value::Bool(false)),
            _ => None,
        }
    }

    fn eval_null_other(&self) -> Option<Value> {
        match self.op {
            BinaryOp::Equal => Some(Value::Bool(false)),
            BinaryOp::NotEqual => Some(Value::Bool(true)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adds_integers_as_float() {
        let l = Value::Int32(2);
        let r = Value::Int32(3);
        let result = BinaryOpEvaluator::new(&l, &r, BinaryOp::Add).evaluate();
        assert_eq!(result, Some(Value::Float64(5.0)));
    }

    #[test]
    fn compares_strings_lexicographically() {
        let l = Value::String("a".into());
        let r = Value::String("b".into());
        let result = BinaryOpEvaluator::new(&l, &r, BinaryOp::LessThan).evaluate();
        assert_eq!(result, Some(Value::Bool(true)));
    }

    #[test]
    fn null_equals_null() {
        let result = BinaryOpEvaluator::new(&Value::Null, &Value::Null, BinaryOp::Equal).evaluate();
        assert_eq!(result, Some(Value::Bool(true)));
    }
}
