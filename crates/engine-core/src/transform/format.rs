//! `--format COL:template` (spec §4.2): renders a template containing
//! `{{name}}`/`{{name|spec}}` tokens against the current row's fields and
//! writes the result into `COL` as a string, appending the column if it
//! doesn't already exist. `|spec` is either a `%`-style numeric format
//! (`%.2f`) applied via a manual fixed-point render, or a `chrono`
//! strftime pattern applied when the referenced field is a date/timestamp.

use model::core::data_type::LogicalType;
use model::core::schema::{PipeColumnInfo, Schema};
use model::core::value::Value;
use model::execution::job::TransformerConfig;
use model::records::row::Row;

use crate::error::EngineError;
use crate::transform::{TransformOutcome, Transformer};

struct FormatSpec {
    column: String,
    template: String,
}

enum TargetColumn {
    Existing(usize),
    Appended,
}

pub struct FormatTransformer {
    specs: Vec<FormatSpec>,
    targets: Vec<TargetColumn>,
    /// The schema as it stood when the template tokens were resolved —
    /// appending target columns never moves an existing column's position,
    /// so this stays valid for reading token fields out of each row.
    read_schema: Schema,
}

impl FormatTransformer {
    pub fn new(group: &[TransformerConfig]) -> Result<Self, EngineError> {
        let specs = group
            .iter()
            .flat_map(|c| c.args.iter())
            .map(|arg| {
                let (column, template) = arg
                    .split_once(':')
                    .ok_or_else(|| EngineError::Fatal(format!("format argument `{arg}` is not `COL:template`")))?;
                Ok(FormatSpec {
                    column: column.to_string(),
                    template: template.to_string(),
                })
            })
            .collect::<Result<Vec<_>, EngineError>>()?;
        Ok(Self {
            specs,
            targets: Vec::new(),
            read_schema: Schema::empty(),
        })
    }
}

fn render_token(value: &Value, spec: Option<&str>) -> String {
    match spec {
        Some(fmt) if fmt.starts_with('%') => render_numeric(value, fmt),
        Some(fmt) => render_temporal(value, fmt),
        None => value.as_display_string(),
    }
}

fn render_numeric(value: &Value, fmt: &str) -> String {
    let precision = fmt
        .strip_prefix("%.")
        .and_then(|rest| rest.strip_suffix('f'))
        .and_then(|digits| digits.parse::<usize>().ok())
        .unwrap_or(2);
    match value {
        Value::Float32(v) => format!("{v:.precision$}"),
        Value::Float64(v) => format!("{v:.precision$}"),
        Value::Decimal(v) => format!("{v:.precision$}"),
        other => other.as_display_string(),
    }
}

fn render_temporal(value: &Value, fmt: &str) -> String {
    match value {
        Value::Date(v) => v.format(fmt).to_string(),
        Value::Timestamp(v) | Value::TimestampTz(v) => v.format(fmt).to_string(),
        other => other.as_display_string(),
    }
}

/// Renders `template` against `row`/`schema`, resolving each `{{name}}` or
/// `{{name|spec}}` token in turn.
fn render(template: &str, row: &Row, schema: &Schema) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            out.push_str(&rest[start..]);
            rest = "";
            break;
        };
        let token = &after[..end];
        let (name, spec) = match token.split_once('|') {
            Some((name, spec)) => (name, Some(spec)),
            None => (token, None),
        };
        let value = schema
            .position_of(name.trim())
            .and_then(|pos| row.get(pos))
            .cloned()
            .unwrap_or(Value::Null);
        out.push_str(&render_token(&value, spec));
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    out
}

impl Transformer for FormatTransformer {
    fn initialize(&mut self, schema_in: &Schema) -> Result<Schema, EngineError> {
        self.read_schema = schema_in.clone();
        let mut schema = schema_in.clone();
        self.targets = self
            .specs
            .iter()
            .map(|spec| match schema_in.position_of(&spec.column) {
                Some(pos) => TargetColumn::Existing(pos),
                None => {
                    schema = schema
                        .clone()
                        .with_column(PipeColumnInfo::new(spec.column.clone(), LogicalType::String, true));
                    TargetColumn::Appended
                }
            })
            .collect();
        Ok(schema)
    }

    fn transform(&mut self, mut row: Row) -> Result<TransformOutcome, EngineError> {
        let rendered: Vec<String> = self
            .specs
            .iter()
            .map(|spec| render(&spec.template, &row, &self.read_schema))
            .collect();
        for (target, text) in self.targets.iter().zip(rendered) {
            match target {
                TargetColumn::Existing(pos) => row.set(*pos, Value::String(text)),
                TargetColumn::Appended => row.push(Value::String(text)),
            }
        }
        Ok(TransformOutcome::Row(row))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn schema() -> Schema {
        Schema::new(vec![
            PipeColumnInfo::new("first", LogicalType::String, false),
            PipeColumnInfo::new("amount", LogicalType::Float64, false),
            PipeColumnInfo::new("signed_up", LogicalType::Date, false),
        ])
    }

    #[test]
    fn renders_plain_and_numeric_tokens() {
        let group = vec![TransformerConfig::new(
            "format",
            vec!["label:{{first}} paid {{amount|%.2f}}".into()],
        )];
        let mut t = FormatTransformer::new(&group).unwrap();
        let out_schema = t.initialize(&schema()).unwrap();
        assert_eq!(out_schema.names(), vec!["first", "amount", "signed_up", "label"]);
        let row = Row::new(vec![Value::String("Ada".into()), Value::Float64(9.5), Value::Date(NaiveDate::from_ymd_opt(2020, 1, 1).unwrap())]);
        match t.transform(row).unwrap() {
            TransformOutcome::Row(r) => assert_eq!(r.get(3), Some(&Value::String("Ada paid 9.50".into()))),
            _ => panic!("expected a row"),
        }
    }

    #[test]
    fn renders_date_spec_tokens() {
        let group = vec![TransformerConfig::new("format", vec!["joined:{{signed_up|%Y}}".into()])];
        let mut t = FormatTransformer::new(&group).unwrap();
        t.initialize(&schema()).unwrap();
        let row = Row::new(vec![
            Value::String("Ada".into()),
            Value::Float64(1.0),
            Value::Date(NaiveDate::from_ymd_opt(2020, 6, 1).unwrap()),
        ]);
        match t.transform(row).unwrap() {
            TransformOutcome::Row(r) => assert_eq!(r.get(3), Some(&Value::String("2020".into()))),
            _ => panic!("expected a row"),
        }
    }
}
