//! The runtime value representation flowing through rows. Closed over the
//! `LogicalType` set (§3): every `Value` variant maps to exactly one or two
//! logical types, and every logical type has a home variant here.

use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};
use uuid::Uuid;

use super::data_type::LogicalType;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Value {
    Bool(bool),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Uint8(u8),
    Uint16(u16),
    Uint32(u32),
    Uint64(u64),
    Float32(f32),
    Float64(f64),
    Decimal(BigDecimal),
    String(String),
    Bytes(Vec<u8>),
    Date(NaiveDate),
    Timestamp(DateTime<Utc>),
    TimestampTz(DateTime<Utc>),
    Uuid(Uuid),
    Null,
}

impl Value {
    pub fn logical_type(&self) -> Option<LogicalType> {
        match self {
            Value::Bool(_) => Some(LogicalType::Bool),
            Value::Int8(_) => Some(LogicalType::Int8),
            Value::Int16(_) => Some(LogicalType::Int16),
            Value::Int32(_) => Some(LogicalType::Int32),
            Value::Int64(_) => Some(LogicalType::Int64),
            Value::Uint8(_) => Some(LogicalType::Uint8),
            Value::Uint16(_) => Some(LogicalType::Uint16),
            Value::Uint32(_) => Some(LogicalType::Uint32),
            Value::Uint64(_) => Some(LogicalType::Uint64),
            Value::Float32(_) => Some(LogicalType::Float32),
            Value::Float64(_) => Some(LogicalType::Float64),
            Value::Decimal(_) => Some(LogicalType::Decimal),
            Value::String(_) => Some(LogicalType::String),
            Value::Bytes(_) => Some(LogicalType::Bytes),
            Value::Date(_) => Some(LogicalType::Date),
            Value::Timestamp(_) => Some(LogicalType::Timestamp),
            Value::TimestampTz(_) => Some(LogicalType::TimestampTz),
            Value::Uuid(_) => Some(LogicalType::Uuid),
            Value::Null => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Best-effort stringification used by `mask`, `format`, and CSV encoding.
    pub fn as_display_string(&self) -> String {
        match self {
            Value::Bool(v) => v.to_string(),
            Value::Int8(v) => v.to_string(),
            Value::Int16(v) => v.to_string(),
            Value::Int32(v) => v.to_string(),
            Value::Int64(v) => v.to_string(),
            Value::Uint8(v) => v.to_string(),
            Value::Uint16(v) => v.to_string(),
            Value::Uint32(v) => v.to_string(),
            Value::Uint64(v) => v.to_string(),
            Value::Float32(v) => v.to_string(),
            Value::Float64(v) => v.to_string(),
            Value::Decimal(v) => v.to_string(),
            Value::String(v) => v.clone(),
            Value::Bytes(v) => hex_encode(v),
            Value::Date(v) => v.to_string(),
            Value::Timestamp(v) => v.to_rfc3339(),
            Value::TimestampTz(v) => v.to_rfc3339(),
            Value::Uuid(v) => v.to_string(),
            Value::Null => String::new(),
        }
    }

    /// Approximate in-memory size, used by the kernel to decide when an
    /// output batch is large enough to flush regardless of row count.
    pub fn size_bytes(&self) -> usize {
        match self {
            Value::Bool(_) => 1,
            Value::Int8(_) | Value::Uint8(_) => 1,
            Value::Int16(_) | Value::Uint16(_) => 2,
            Value::Int32(_) | Value::Uint32(_) | Value::Float32(_) => 4,
            Value::Int64(_) | Value::Uint64(_) | Value::Float64(_) => 8,
            Value::Decimal(v) => v.to_string().len(),
            Value::String(v) => v.len(),
            Value::Bytes(v) => v.len(),
            Value::Date(_) => 4,
            Value::Timestamp(_) | Value::TimestampTz(_) => 8,
            Value::Uuid(_) => 16,
            Value::Null => 0,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int8(a), Value::Int8(b)) => a == b,
            (Value::Int16(a), Value::Int16(b)) => a == b,
            (Value::Int32(a), Value::Int32(b)) => a == b,
            (Value::Int64(a), Value::Int64(b)) => a == b,
            (Value::Uint8(a), Value::Uint8(b)) => a == b,
            (Value::Uint16(a), Value::Uint16(b)) => a == b,
            (Value::Uint32(a), Value::Uint32(b)) => a == b,
            (Value::Uint64(a), Value::Uint64(b)) => a == b,
            (Value::Float32(a), Value::Float32(b)) => a.to_bits() == b.to_bits(),
            (Value::Float64(a), Value::Float64(b)) => a.to_bits() == b.to_bits(),
            (Value::Decimal(a), Value::Decimal(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            (Value::Date(a), Value::Date(b)) => a == b,
            (Value::Timestamp(a), Value::Timestamp(b)) => a == b,
            (Value::TimestampTz(a), Value::TimestampTz(b)) => a == b,
            (Value::Uuid(a), Value::Uuid(b)) => a == b,
            (Value::Null, Value::Null) => true,
            _ => false,
        }
    }
}

impl Eq for Value {}

// Manual Hash since f32/f64 and BigDecimal need normalization for use as
// seed-column keys in the `fake` transformer's deterministic mode (§4.2).
impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Bool(v) => v.hash(state),
            Value::Int8(v) => v.hash(state),
            Value::Int16(v) => v.hash(state),
            Value::Int32(v) => v.hash(state),
            Value::Int64(v) => v.hash(state),
            Value::Uint8(v) => v.hash(state),
            Value::Uint16(v) => v.hash(state),
            Value::Uint32(v) => v.hash(state),
            Value::Uint64(v) => v.hash(state),
            Value::Float32(v) => v.to_bits().hash(state),
            Value::Float64(v) => v.to_bits().hash(state),
            Value::Decimal(v) => v.to_string().hash(state),
            Value::String(v) => v.hash(state),
            Value::Bytes(v) => v.hash(state),
            Value::Date(v) => v.hash(state),
            Value::Timestamp(v) => v.hash(state),
            Value::TimestampTz(v) => v.hash(state),
            Value::Uuid(v) => v.hash(state),
            Value::Null => {}
        }
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_has_no_logical_type() {
        assert_eq!(Value::Null.logical_type(), None);
    }

    #[test]
    fn nan_float_equality_is_bitwise() {
        let a = Value::Float64(f64::NAN);
        let b = Value::Float64(f64::NAN);
        assert_eq!(a, b);
    }

    #[test]
    fn display_string_round_trips_plain_values() {
        assert_eq!(Value::Int32(42).as_display_string(), "42");
        assert_eq!(Value::String("hi".into()).as_display_string(), "hi");
        assert_eq!(Value::Null.as_display_string(), "");
    }
}
