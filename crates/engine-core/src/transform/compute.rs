//! `--compute COL:expr` or `--compute COL:TYPE:expr` (spec §4.2): appends a
//! new column computed from an expression over the current row. Multiple
//! `--compute` specs in the same adjacent run are applied in declaration
//! order, so a later spec may reference a column an earlier spec in the
//! same group just added.

use model::core::data_type::LogicalType;
use model::core::schema::{PipeColumnInfo, Schema};
use model::execution::job::TransformerConfig;
use model::records::row::Row;

use crate::context::RowEvalContext;
use crate::error::EngineError;
use crate::transform::{TransformOutcome, Transformer};
use expression_engine::{DefaultScriptEngine, ScriptEngine};

struct ComputeSpec {
    column: String,
    logical_type: LogicalType,
    expr: String,
}

pub struct ComputeTransformer {
    specs: Vec<ComputeSpec>,
    /// The schema as seen by the *first* spec — extended incrementally at
    /// transform time as each spec's result is appended, so later specs in
    /// the same group can reference earlier ones by name.
    base_schema: Schema,
    engine: DefaultScriptEngine,
}

impl ComputeTransformer {
    pub fn new(group: &[TransformerConfig]) -> Result<Self, EngineError> {
        let specs = group
            .iter()
            .flat_map(|c| c.args.iter())
            .map(|arg| parse_spec(arg))
            .collect::<Result<Vec<_>, EngineError>>()?;
        Ok(Self {
            specs,
            base_schema: Schema::empty(),
            engine: DefaultScriptEngine::new(),
        })
    }
}

fn parse_spec(arg: &str) -> Result<ComputeSpec, EngineError> {
    let (column, rest) = arg
        .split_once(':')
        .ok_or_else(|| EngineError::Fatal(format!("compute argument `{arg}` is not `COL:expr`")))?;
    let (logical_type, expr) = match rest.split_once(':') {
        Some((type_token, expr)) if parse_logical_type(type_token).is_some() => (parse_logical_type(type_token).unwrap(), expr),
        _ => (LogicalType::String, rest),
    };
    Ok(ComputeSpec {
        column: column.to_string(),
        logical_type,
        expr: expr.to_string(),
    })
}

fn parse_logical_type(name: &str) -> Option<LogicalType> {
    use LogicalType::*;
    Some(match name {
        "bool" => Bool,
        "int8" => Int8,
        "int16" => Int16,
        "int32" => Int32,
        "int64" => Int64,
        "uint8" => Uint8,
        "uint16" => Uint16,
        "uint32" => Uint32,
        "uint64" => Uint64,
        "float32" => Float32,
        "float64" => Float64,
        "decimal" => Decimal,
        "string" => String,
        "bytes" => Bytes,
        "date" => Date,
        "timestamp" => Timestamp,
        "timestamptz" => TimestampTz,
        "uuid" => Uuid,
        _ => return None,
    })
}

impl Transformer for ComputeTransformer {
    fn initialize(&mut self, schema_in: &Schema) -> Result<Schema, EngineError> {
        self.base_schema = schema_in.clone();
        let mut schema = schema_in.clone();
        for spec in &self.specs {
            schema = schema.with_column(PipeColumnInfo::new(spec.column.clone(), spec.logical_type, true));
        }
        Ok(schema)
    }

    fn transform(&mut self, mut row: Row) -> Result<TransformOutcome, EngineError> {
        let mut running_schema = self.base_schema.clone();
        for spec in &self.specs {
            let value = {
                let ctx = RowEvalContext::new(&row, &running_schema);
                self.engine.compute(&spec.expr, &ctx)?
            };
            row.push(value);
            running_schema = running_schema.with_column(PipeColumnInfo::new(spec.column.clone(), spec.logical_type, true));
        }
        Ok(TransformOutcome::Row(row))
    }
}
