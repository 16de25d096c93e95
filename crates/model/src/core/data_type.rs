//! The closed set of logical column types every reader/writer adapter must
//! map its native types onto (spec §3, `PipeColumnInfo.logicalType`).

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum LogicalType {
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Float32,
    Float64,
    Decimal,
    String,
    Bytes,
    Date,
    Timestamp,
    TimestampTz,
    Uuid,
}

impl LogicalType {
    /// Whether two logical types may be widened into one another without
    /// loss, used by the schema validator's `TypeMismatch` classification.
    pub fn is_widening_compatible(&self, target: &LogicalType) -> bool {
        use LogicalType::*;
        if self == target {
            return true;
        }
        matches!(
            (self, target),
            (Int8, Int16 | Int32 | Int64)
                | (Int16, Int32 | Int64)
                | (Int32, Int64)
                | (Uint8, Uint16 | Uint32 | Uint64)
                | (Uint16, Uint32 | Uint64)
                | (Uint32, Uint64)
                | (Float32, Float64)
                | (Date, Timestamp | TimestampTz)
                | (Timestamp, TimestampTz)
        )
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            LogicalType::Int8
                | LogicalType::Int16
                | LogicalType::Int32
                | LogicalType::Int64
                | LogicalType::Uint8
                | LogicalType::Uint16
                | LogicalType::Uint32
                | LogicalType::Uint64
                | LogicalType::Float32
                | LogicalType::Float64
                | LogicalType::Decimal
        )
    }
}

impl fmt::Display for LogicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogicalType::Bool => "bool",
            LogicalType::Int8 => "int8",
            LogicalType::Int16 => "int16",
            LogicalType::Int32 => "int32",
            LogicalType::Int64 => "int64",
            LogicalType::Uint8 => "uint8",
            LogicalType::Uint16 => "uint16",
            LogicalType::Uint32 => "uint32",
            LogicalType::Uint64 => "uint64",
            LogicalType::Float32 => "float32",
            LogicalType::Float64 => "float64",
            LogicalType::Decimal => "decimal",
            LogicalType::String => "string",
            LogicalType::Bytes => "bytes",
            LogicalType::Date => "date",
            LogicalType::Timestamp => "timestamp",
            LogicalType::TimestampTz => "timestampTZ",
            LogicalType::Uuid => "uuid",
        };
        write!(f, "{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widening_is_one_directional() {
        assert!(LogicalType::Int32.is_widening_compatible(&LogicalType::Int64));
        assert!(!LogicalType::Int64.is_widening_compatible(&LogicalType::Int32));
        assert!(LogicalType::Int32.is_widening_compatible(&LogicalType::Int32));
    }

    #[test]
    fn date_widens_into_timestamp() {
        assert!(LogicalType::Date.is_widening_compatible(&LogicalType::Timestamp));
        assert!(LogicalType::Date.is_widening_compatible(&LogicalType::TimestampTz));
        assert!(!LogicalType::Timestamp.is_widening_compatible(&LogicalType::Date));
    }
}
