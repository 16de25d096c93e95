//! `--overwrite COL:literal` (spec §4.2): replaces the named column with a
//! fixed literal value on every row, coerced to the column's logical type
//! once at `initialize` rather than re-parsed per row.

use model::core::data_type::LogicalType;
use model::core::schema::Schema;
use model::core::value::Value;
use model::execution::job::TransformerConfig;
use model::records::row::Row;
use std::str::FromStr;

use crate::error::EngineError;
use crate::transform::{TransformOutcome, Transformer};

struct OverwriteSpec {
    column: String,
    literal: String,
}

pub struct OverwriteTransformer {
    specs: Vec<OverwriteSpec>,
    resolved: Vec<(usize, Value)>,
}

impl OverwriteTransformer {
    pub fn new(group: &[TransformerConfig]) -> Result<Self, EngineError> {
        let specs = group
            .iter()
            .flat_map(|c| c.args.iter())
            .map(|arg| parse_spec(arg))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            specs,
            resolved: Vec::new(),
        })
    }
}

fn parse_spec(arg: &str) -> Result<OverwriteSpec, EngineError> {
    let (column, literal) = arg
        .split_once(':')
        .ok_or_else(|| EngineError::Fatal(format!("overwrite argument `{arg}` is not `COL:literal`")))?;
    Ok(OverwriteSpec {
        column: column.to_string(),
        literal: literal.to_string(),
    })
}

pub fn coerce_literal(text: &str, logical_type: LogicalType) -> Result<Value, EngineError> {
    if text == "null" {
        return Ok(Value::Null);
    }
    let invalid = |_| EngineError::Fatal(format!("cannot coerce `{text}` to {logical_type}"));
    let value = match logical_type {
        LogicalType::Bool => Value::Bool(text.parse().map_err(invalid)?),
        LogicalType::Int8 => Value::Int8(text.parse().map_err(invalid)?),
        LogicalType::Int16 => Value::Int16(text.parse().map_err(invalid)?),
        LogicalType::Int32 => Value::Int32(text.parse().map_err(invalid)?),
        LogicalType::Int64 => Value::Int64(text.parse().map_err(invalid)?),
        LogicalType::Uint8 => Value::Uint8(text.parse().map_err(invalid)?),
        LogicalType::Uint16 => Value::Uint16(text.parse().map_err(invalid)?),
        LogicalType::Uint32 => Value::Uint32(text.parse().map_err(invalid)?),
        LogicalType::Uint64 => Value::Uint64(text.parse().map_err(invalid)?),
        LogicalType::Float32 => Value::Float32(text.parse().map_err(invalid)?),
        LogicalType::Float64 => Value::Float64(text.parse().map_err(invalid)?),
        LogicalType::Decimal => Value::Decimal(bigdecimal::BigDecimal::from_str(text).map_err(invalid)?),
        LogicalType::String => Value::String(text.to_string()),
        LogicalType::Bytes => Value::Bytes(text.as_bytes().to_vec()),
        LogicalType::Date => Value::Date(chrono::NaiveDate::parse_from_str(text, "%Y-%m-%d").map_err(invalid)?),
        LogicalType::Timestamp | LogicalType::TimestampTz => Value::Timestamp(
            chrono::DateTime::parse_from_rfc3339(text)
                .map(|dt| dt.with_timezone(&chrono::Utc))
                .map_err(invalid)?,
        ),
        LogicalType::Uuid => Value::Uuid(uuid::Uuid::parse_str(text).map_err(invalid)?),
    };
    Ok(value)
}

impl Transformer for OverwriteTransformer {
    fn initialize(&mut self, schema_in: &Schema) -> Result<Schema, EngineError> {
        self.resolved = self
            .specs
            .iter()
            .map(|spec| {
                let position = schema_in
                    .position_of(&spec.column)
                    .ok_or_else(|| EngineError::Fatal(format!("overwrite transformer: unknown column `{}`", spec.column)))?;
                let logical_type = schema_in.columns()[position].logical_type;
                let value = coerce_literal(&spec.literal, logical_type)?;
                Ok((position, value))
            })
            .collect::<Result<_, EngineError>>()?;
        Ok(schema_in.clone())
    }

    fn transform(&mut self, mut row: Row) -> Result<TransformOutcome, EngineError> {
        for (position, value) in &self.resolved {
            row.set(*position, value.clone());
        }
        Ok(TransformOutcome::Row(row))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::core::schema::PipeColumnInfo;

    #[test]
    fn overwrites_with_coerced_literal() {
        let schema = Schema::new(vec![
            PipeColumnInfo::new("id", LogicalType::Int64, false),
            PipeColumnInfo::new("tier", LogicalType::String, false),
        ]);
        let group = vec![TransformerConfig::new("overwrite", vec!["tier:gold".into()])];
        let mut t = OverwriteTransformer::new(&group).unwrap();
        t.initialize(&schema).unwrap();
        let row = Row::new(vec![Value::Int64(1), Value::String("bronze".into())]);
        match t.transform(row).unwrap() {
            TransformOutcome::Row(r) => assert_eq!(r.get(1), Some(&Value::String("gold".into()))),
            _ => panic!("expected a row"),
        }
    }

    #[test]
    fn rejects_malformed_argument() {
        let group = vec![TransformerConfig::new("overwrite", vec!["no-colon".into()])];
        assert!(OverwriteTransformer::new(&group).is_err());
    }
}
