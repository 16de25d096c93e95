//! `--mask COL:pattern` (spec §4.2): rewrites a string column against
//! `pattern` with a sequential source cursor — a `#` in the pattern
//! consumes and keeps the next unconsumed source character, any other
//! character is inserted literally without consuming source (the SSN-style
//! `###-##-####` overlay). Once the pattern is exhausted, any source
//! characters left unconsumed are appended verbatim. A `null_policy=skip-null`
//! option leaves `Null` values untouched (the default masks a `Null` by
//! rendering it as an empty source string).

use model::core::schema::Schema;
use model::core::value::Value;
use model::execution::job::TransformerConfig;
use model::records::row::Row;

use crate::error::EngineError;
use crate::transform::{TransformOutcome, Transformer};

struct MaskSpec {
    column: String,
    pattern: String,
}

pub struct MaskTransformer {
    specs: Vec<MaskSpec>,
    positions: Vec<usize>,
    skip_null: bool,
}

impl MaskTransformer {
    pub fn new(group: &[TransformerConfig]) -> Result<Self, EngineError> {
        let skip_null = group
            .iter()
            .any(|c| c.options.get("null_policy").map(String::as_str) == Some("skip-null"));
        let specs = group
            .iter()
            .flat_map(|c| c.args.iter())
            .map(|arg| {
                let (column, pattern) = arg
                    .split_once(':')
                    .ok_or_else(|| EngineError::Fatal(format!("mask argument `{arg}` is not `COL:pattern`")))?;
                Ok(MaskSpec {
                    column: column.to_string(),
                    pattern: pattern.to_string(),
                })
            })
            .collect::<Result<Vec<_>, EngineError>>()?;
        Ok(Self {
            specs,
            positions: Vec::new(),
            skip_null,
        })
    }
}

fn apply_mask(source: &str, pattern: &str) -> String {
    let source_chars: Vec<char> = source.chars().collect();
    let mut out = String::with_capacity(source_chars.len().max(pattern.chars().count()));
    let mut cursor = 0usize;
    for pattern_char in pattern.chars() {
        if pattern_char == '#' {
            match source_chars.get(cursor) {
                Some(&source_char) => {
                    out.push(source_char);
                    cursor += 1;
                }
                None => break,
            }
        } else {
            out.push(pattern_char);
        }
    }
    if cursor < source_chars.len() {
        out.extend(&source_chars[cursor..]);
    }
    out
}

impl Transformer for MaskTransformer {
    fn initialize(&mut self, schema_in: &Schema) -> Result<Schema, EngineError> {
        self.positions = self
            .specs
            .iter()
            .map(|spec| {
                schema_in
                    .position_of(&spec.column)
                    .ok_or_else(|| EngineError::Fatal(format!("mask transformer: unknown column `{}`", spec.column)))
            })
            .collect::<Result<_, _>>()?;
        Ok(schema_in.clone())
    }

    fn transform(&mut self, mut row: Row) -> Result<TransformOutcome, EngineError> {
        for (spec, &position) in self.specs.iter().zip(&self.positions) {
            let current = row.get(position).cloned().unwrap_or(Value::Null);
            if current.is_null() {
                if self.skip_null {
                    continue;
                }
                row.set(position, Value::String(apply_mask("", &spec.pattern)));
                continue;
            }
            let masked = apply_mask(&current.as_display_string(), &spec.pattern);
            row.set(position, Value::String(masked));
        }
        Ok(TransformOutcome::Row(row))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::core::data_type::LogicalType;
    use model::core::schema::PipeColumnInfo;

    fn schema() -> Schema {
        Schema::new(vec![PipeColumnInfo::new("ssn", LogicalType::String, true)])
    }

    #[test]
    fn masks_digits_keeping_pattern_literals() {
        assert_eq!(apply_mask("123456789", "###-##-####"), "123-45-6789");
    }

    #[test]
    fn keeps_trailing_source_characters_once_the_pattern_is_exhausted() {
        // "XX" are literal inserts consuming no source; the two `#`s consume
        // the first two source characters, then everything left unconsumed
        // is appended verbatim.
        assert_eq!(apply_mask("1234567890123", "XX##"), "XX1234567890123");
    }

    #[test]
    fn skip_null_leaves_null_untouched() {
        let group = vec![{
            let mut cfg = TransformerConfig::new("mask", vec!["ssn:###-##-####".into()]);
            cfg.options.insert("null_policy".into(), "skip-null".into());
            cfg
        }];
        let mut t = MaskTransformer::new(&group).unwrap();
        t.initialize(&schema()).unwrap();
        let row = Row::new(vec![Value::Null]);
        match t.transform(row).unwrap() {
            TransformOutcome::Row(r) => assert_eq!(r.get(0), Some(&Value::Null)),
            _ => panic!("expected a row"),
        }
    }
}
