//! Arrow-native-type conversions shared by the Arrow IPC and Parquet
//! adapters, which both sit on top of `arrow::record_batch::RecordBatch`.

use std::sync::Arc;

use arrow::array::{
    Array, ArrayRef, BinaryArray, BooleanArray, Date32Array, Decimal128Array, Float32Array,
    Float64Array, Int16Array, Int32Array, Int64Array, Int8Array, StringArray,
    TimestampMicrosecondArray, UInt16Array, UInt32Array, UInt64Array, UInt8Array,
};
use arrow::datatypes::{DataType, Field, Schema as ArrowSchema, SchemaRef, TimeUnit};
use arrow::record_batch::RecordBatch;
use bigdecimal::BigDecimal;
use chrono::{NaiveDate, TimeZone, Utc};

use model::{LogicalType, PipeColumnInfo, Row, Schema, Value};

use crate::error::{ConnectorError, Result};

pub fn logical_to_arrow_dtype(lt: LogicalType) -> DataType {
    match lt {
        LogicalType::Bool => DataType::Boolean,
        LogicalType::Int8 => DataType::Int8,
        LogicalType::Int16 => DataType::Int16,
        LogicalType::Int32 => DataType::Int32,
        LogicalType::Int64 => DataType::Int64,
        LogicalType::Uint8 => DataType::UInt8,
        LogicalType::Uint16 => DataType::UInt16,
        LogicalType::Uint32 => DataType::UInt32,
        LogicalType::Uint64 => DataType::UInt64,
        LogicalType::Float32 => DataType::Float32,
        LogicalType::Float64 => DataType::Float64,
        LogicalType::Decimal => DataType::Decimal128(38, 10),
        LogicalType::String => DataType::Utf8,
        LogicalType::Bytes => DataType::Binary,
        LogicalType::Date => DataType::Date32,
        LogicalType::Timestamp | LogicalType::TimestampTz => DataType::Timestamp(TimeUnit::Microsecond, None),
        LogicalType::Uuid => DataType::Utf8,
    }
}

pub fn arrow_dtype_to_logical(dt: &DataType) -> LogicalType {
    match dt {
        DataType::Boolean => LogicalType::Bool,
        DataType::Int8 => LogicalType::Int8,
        DataType::Int16 => LogicalType::Int16,
        DataType::Int32 => LogicalType::Int32,
        DataType::Int64 => LogicalType::Int64,
        DataType::UInt8 => LogicalType::Uint8,
        DataType::UInt16 => LogicalType::Uint16,
        DataType::UInt32 => LogicalType::Uint32,
        DataType::UInt64 => LogicalType::Uint64,
        DataType::Float32 => LogicalType::Float32,
        DataType::Float64 => LogicalType::Float64,
        DataType::Decimal128(_, _) => LogicalType::Decimal,
        DataType::Binary | DataType::LargeBinary => LogicalType::Bytes,
        DataType::Date32 | DataType::Date64 => LogicalType::Date,
        DataType::Timestamp(_, Some(_)) => LogicalType::TimestampTz,
        DataType::Timestamp(_, None) => LogicalType::Timestamp,
        _ => LogicalType::String,
    }
}

pub fn schema_to_arrow(schema: &Schema) -> SchemaRef {
    Arc::new(ArrowSchema::new(
        schema
            .columns()
            .iter()
            .map(|c| Field::new(&c.name, logical_to_arrow_dtype(c.logical_type), c.is_nullable))
            .collect::<Vec<_>>(),
    ))
}

pub fn arrow_schema_to_model(schema: &ArrowSchema) -> Schema {
    Schema::new(
        schema
            .fields()
            .iter()
            .map(|f| PipeColumnInfo::new(f.name().clone(), arrow_dtype_to_logical(f.data_type()), f.is_nullable()))
            .collect(),
    )
}

/// Converts a whole `RecordBatch` into row-major `Row`s. Used after reading
/// a column-major Arrow/Parquet batch, before the rows enter the kernel's
/// row-oriented transformer pipeline.
pub fn record_batch_to_rows(batch: &RecordBatch) -> Vec<Row> {
    let num_rows = batch.num_rows();
    let columns: Vec<ArrayRef> = batch.columns().to_vec();
    let mut rows = Vec::with_capacity(num_rows);
    for row_idx in 0..num_rows {
        let values: Vec<Value> = columns.iter().map(|col| array_value_at(col, row_idx)).collect();
        rows.push(Row::new(values));
    }
    rows
}

fn array_value_at(array: &ArrayRef, idx: usize) -> Value {
    if array.is_null(idx) {
        return Value::Null;
    }
    match array.data_type() {
        DataType::Boolean => Value::Bool(array.as_any().downcast_ref::<BooleanArray>().unwrap().value(idx)),
        DataType::Int8 => Value::Int8(array.as_any().downcast_ref::<Int8Array>().unwrap().value(idx)),
        DataType::Int16 => Value::Int16(array.as_any().downcast_ref::<Int16Array>().unwrap().value(idx)),
        DataType::Int32 => Value::Int32(array.as_any().downcast_ref::<Int32Array>().unwrap().value(idx)),
        DataType::Int64 => Value::Int64(array.as_any().downcast_ref::<Int64Array>().unwrap().value(idx)),
        DataType::UInt8 => Value::Uint8(array.as_any().downcast_ref::<UInt8Array>().unwrap().value(idx)),
        DataType::UInt16 => Value::Uint16(array.as_any().downcast_ref::<UInt16Array>().unwrap().value(idx)),
        DataType::UInt32 => Value::Uint32(array.as_any().downcast_ref::<UInt32Array>().unwrap().value(idx)),
        DataType::UInt64 => Value::Uint64(array.as_any().downcast_ref::<UInt64Array>().unwrap().value(idx)),
        DataType::Float32 => Value::Float32(array.as_any().downcast_ref::<Float32Array>().unwrap().value(idx)),
        DataType::Float64 => Value::Float64(array.as_any().downcast_ref::<Float64Array>().unwrap().value(idx)),
        DataType::Decimal128(_, scale) => {
            let arr = array.as_any().downcast_ref::<Decimal128Array>().unwrap();
            let raw = arr.value(idx);
            Value::Decimal(BigDecimal::new(raw.into(), *scale as i64))
        }
        DataType::Utf8 => Value::String(array.as_any().downcast_ref::<StringArray>().unwrap().value(idx).to_string()),
        DataType::Binary => Value::Bytes(array.as_any().downcast_ref::<BinaryArray>().unwrap().value(idx).to_vec()),
        DataType::Date32 => {
            let days = array.as_any().downcast_ref::<Date32Array>().unwrap().value(idx);
            Value::Date(NaiveDate::from_ymd_opt(1970, 1, 1).unwrap() + chrono::Duration::days(days as i64))
        }
        DataType::Timestamp(TimeUnit::Microsecond, tz) => {
            let micros = array.as_any().downcast_ref::<TimestampMicrosecondArray>().unwrap().value(idx);
            let dt = Utc.timestamp_micros(micros).single().unwrap_or_else(|| Utc.timestamp_opt(0, 0).unwrap());
            if tz.is_some() {
                Value::TimestampTz(dt)
            } else {
                Value::Timestamp(dt)
            }
        }
        _ => Value::Null,
    }
}

/// Converts row-major `Row`s back into a column-major `RecordBatch` for
/// writing. Column builders are chosen from `schema`'s logical types rather
/// than re-inferred from the rows, so a null-only column still gets the
/// right Arrow type.
pub fn rows_to_record_batch(schema: &Schema, rows: &[Row]) -> Result<RecordBatch> {
    let arrow_schema = schema_to_arrow(schema);
    let mut arrays: Vec<ArrayRef> = Vec::with_capacity(schema.len());
    for (col_idx, column) in schema.columns().iter().enumerate() {
        let values: Vec<&Value> = rows.iter().map(|r| r.get(col_idx).unwrap_or(&Value::Null)).collect();
        arrays.push(build_array(column.logical_type, &values)?);
    }
    RecordBatch::try_new(arrow_schema, arrays).map_err(|e| ConnectorError::Fatal(e.to_string()))
}

fn build_array(logical_type: LogicalType, values: &[&Value]) -> Result<ArrayRef> {
    use arrow::array::*;
    let array: ArrayRef = match logical_type {
        LogicalType::Bool => Arc::new(values.iter().map(|v| as_bool(v)).collect::<BooleanArray>()),
        LogicalType::Int8 => Arc::new(values.iter().map(|v| as_i64(v).map(|n| n as i8)).collect::<Int8Array>()),
        LogicalType::Int16 => Arc::new(values.iter().map(|v| as_i64(v).map(|n| n as i16)).collect::<Int16Array>()),
        LogicalType::Int32 => Arc::new(values.iter().map(|v| as_i64(v).map(|n| n as i32)).collect::<Int32Array>()),
        LogicalType::Int64 => Arc::new(values.iter().map(as_i64).collect::<Int64Array>()),
        LogicalType::Uint8 => Arc::new(values.iter().map(|v| as_i64(v).map(|n| n as u8)).collect::<UInt8Array>()),
        LogicalType::Uint16 => Arc::new(values.iter().map(|v| as_i64(v).map(|n| n as u16)).collect::<UInt16Array>()),
        LogicalType::Uint32 => Arc::new(values.iter().map(|v| as_i64(v).map(|n| n as u32)).collect::<UInt32Array>()),
        LogicalType::Uint64 => Arc::new(values.iter().map(|v| as_i64(v).map(|n| n as u64)).collect::<UInt64Array>()),
        LogicalType::Float32 => Arc::new(values.iter().map(|v| as_f64(v).map(|n| n as f32)).collect::<Float32Array>()),
        LogicalType::Float64 => Arc::new(values.iter().map(as_f64).collect::<Float64Array>()),
        LogicalType::Decimal => {
            let decimals: Decimal128Array = values
                .iter()
                .map(|v| match v {
                    Value::Decimal(d) => d.to_string().replace('.', "").parse::<i128>().ok(),
                    _ => None,
                })
                .collect::<Vec<Option<i128>>>()
                .into_iter()
                .collect();
            Arc::new(decimals.with_precision_and_scale(38, 10).map_err(|e| ConnectorError::Fatal(e.to_string()))?)
        }
        LogicalType::String | LogicalType::Uuid => Arc::new(values.iter().map(|v| as_string(v)).collect::<StringArray>()),
        LogicalType::Bytes => Arc::new(
            values
                .iter()
                .map(|v| match v {
                    Value::Bytes(b) => Some(b.as_slice()),
                    _ => None,
                })
                .collect::<BinaryArray>(),
        ),
        LogicalType::Date => Arc::new(
            values
                .iter()
                .map(|v| match v {
                    Value::Date(d) => Some((*d - NaiveDate::from_ymd_opt(1970, 1, 1).unwrap()).num_days() as i32),
                    _ => None,
                })
                .collect::<Date32Array>(),
        ),
        LogicalType::Timestamp | LogicalType::TimestampTz => Arc::new(
            values
                .iter()
                .map(|v| match v {
                    Value::Timestamp(dt) | Value::TimestampTz(dt) => Some(dt.timestamp_micros()),
                    _ => None,
                })
                .collect::<TimestampMicrosecondArray>(),
        ),
    };
    Ok(array)
}

fn as_bool(v: &Value) -> Option<bool> {
    match v {
        Value::Bool(b) => Some(*b),
        _ => None,
    }
}

fn as_i64(v: &Value) -> Option<i64> {
    match v {
        Value::Int8(n) => Some(*n as i64),
        Value::Int16(n) => Some(*n as i64),
        Value::Int32(n) => Some(*n as i64),
        Value::Int64(n) => Some(*n),
        Value::Uint8(n) => Some(*n as i64),
        Value::Uint16(n) => Some(*n as i64),
        Value::Uint32(n) => Some(*n as i64),
        Value::Uint64(n) => Some(*n as i64),
        _ => None,
    }
}

fn as_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Float32(n) => Some(*n as f64),
        Value::Float64(n) => Some(*n),
        _ => None,
    }
}

fn as_string(v: &Value) -> Option<String> {
    match v {
        Value::Null => None,
        other => Some(other.as_display_string()),
    }
}
