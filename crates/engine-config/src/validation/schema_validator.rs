//! Column- and row-level checks (spec §4.4). Column matching proceeds
//! positionally-then-by-name: a source column first tries the target
//! column at its own position, and only falls back to a scan by name
//! (under the target dialect's identifier-equivalence rule) if that
//! position is already taken or doesn't match. Each target column is bound
//! to at most one source column, and vice versa ("matches are consumed").

use serde::{Deserialize, Serialize};

use model::core::schema::{PipeColumnInfo, Schema, TargetColumnInfo, TargetSchemaInfo};
use model::core::value::Value;
use model::records::row::Row;
use planner::Dialect;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// The per-column classification spec §4.4 names explicitly.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ColumnVerdict {
    Compatible,
    WillBeCreated,
    PossibleTruncation,
    TypeMismatch,
    MissingInTarget,
    ExtraInTarget,
    ExtraInTargetNotNull,
    NullabilityConflict,
}

impl ColumnVerdict {
    fn severity(self) -> Severity {
        match self {
            ColumnVerdict::Compatible | ColumnVerdict::WillBeCreated | ColumnVerdict::ExtraInTarget => Severity::Info,
            ColumnVerdict::PossibleTruncation | ColumnVerdict::MissingInTarget => Severity::Warning,
            ColumnVerdict::TypeMismatch | ColumnVerdict::ExtraInTargetNotNull | ColumnVerdict::NullabilityConflict => Severity::Error,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ColumnFinding {
    pub column: String,
    pub verdict: ColumnVerdict,
    pub severity: Severity,
    pub detail: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RowViolationKind {
    NotNullViolation,
    MaxLengthOverflow,
    PrecisionOverflow,
    DuplicateUnique,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RowFinding {
    pub row_index: usize,
    pub column: String,
    pub kind: RowViolationKind,
    pub detail: String,
}

/// The validator's full verdict on one `(source schema, target)` pair
/// (spec §4.4). In strict mode, `has_errors()` aborts the job before any
/// row is read; otherwise `render()` goes to stderr and the run proceeds.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaValidationReport {
    pub columns: Vec<ColumnFinding>,
    pub rows: Vec<RowFinding>,
}

impl SchemaValidationReport {
    pub fn has_errors(&self) -> bool {
        self.columns.iter().any(|c| c.severity == Severity::Error)
            || self.rows.iter().any(|r| matches!(r.kind, RowViolationKind::NotNullViolation | RowViolationKind::DuplicateUnique))
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for finding in &self.columns {
            out.push_str(&format!("[{:?}] {}: {} ({})\n", finding.severity, finding.column, finding.detail, describe(finding.verdict)));
        }
        for finding in &self.rows {
            out.push_str(&format!("[row {}] {}: {}\n", finding.row_index, finding.column, finding.detail));
        }
        out
    }
}

fn describe(verdict: ColumnVerdict) -> &'static str {
    match verdict {
        ColumnVerdict::Compatible => "compatible",
        ColumnVerdict::WillBeCreated => "will be created",
        ColumnVerdict::PossibleTruncation => "possible truncation",
        ColumnVerdict::TypeMismatch => "type mismatch",
        ColumnVerdict::MissingInTarget => "missing in target",
        ColumnVerdict::ExtraInTarget => "extra in target",
        ColumnVerdict::ExtraInTargetNotNull => "extra in target, NOT NULL",
        ColumnVerdict::NullabilityConflict => "nullability conflict",
    }
}

/// Compares `source` against `target` (spec §4.4). When `target.exists` is
/// false every source column is `WillBeCreated`; otherwise each target
/// column is consumed by at most one source column.
pub fn validate_schema(source: &Schema, target: &TargetSchemaInfo, dialect: &dyn Dialect) -> SchemaValidationReport {
    let mut findings = Vec::new();

    if !target.exists {
        for column in source.columns() {
            findings.push(ColumnFinding {
                column: column.name.clone(),
                verdict: ColumnVerdict::WillBeCreated,
                severity: Severity::Info,
                detail: format!("table will be created with column `{}`", column.name),
            });
        }
        return SchemaValidationReport { columns: findings, rows: Vec::new() };
    }

    let mut matched_target = vec![false; target.columns.len()];

    for (src_idx, column) in source.columns().iter().enumerate() {
        let positional = target
            .columns
            .get(src_idx)
            .filter(|t| !matched_target[src_idx] && matches_identifier(column, t, dialect))
            .map(|t| (src_idx, t));

        let matched = positional.or_else(|| {
            target
                .columns
                .iter()
                .enumerate()
                .find(|(idx, t)| !matched_target[*idx] && matches_identifier(column, t, dialect))
        });

        let Some((idx, target_col)) = matched else {
            findings.push(ColumnFinding {
                column: column.name.clone(),
                verdict: ColumnVerdict::MissingInTarget,
                severity: ColumnVerdict::MissingInTarget.severity(),
                detail: format!("source column `{}` has no match in target", column.name),
            });
            continue;
        };
        matched_target[idx] = true;

        let verdict = classify_column(column, target_col);
        findings.push(ColumnFinding {
            column: column.name.clone(),
            severity: verdict.severity(),
            detail: describe_pair(column, target_col, verdict),
            verdict,
        });
    }

    for (idx, target_col) in target.columns.iter().enumerate() {
        if matched_target[idx] {
            continue;
        }
        let verdict = if !target_col.nullable {
            ColumnVerdict::ExtraInTargetNotNull
        } else {
            ColumnVerdict::ExtraInTarget
        };
        findings.push(ColumnFinding {
            column: target_col.name.clone(),
            severity: verdict.severity(),
            detail: format!("target column `{}` ({}) has no source counterpart", target_col.name, target_col.native_type),
            verdict,
        });
    }

    SchemaValidationReport { columns: findings, rows: Vec::new() }
}

fn matches_identifier(source: &PipeColumnInfo, target: &TargetColumnInfo, dialect: &dyn Dialect) -> bool {
    if source.is_case_sensitive {
        source.name == target.name
    } else {
        dialect.normalize(&source.name) == dialect.normalize(&target.name)
    }
}

fn classify_column(source: &PipeColumnInfo, target: &TargetColumnInfo) -> ColumnVerdict {
    if source.is_nullable && !target.nullable {
        return ColumnVerdict::NullabilityConflict;
    }
    let source_ty = source.logical_type;
    let target_ty = target.inferred_logical_type;
    if source_ty == target_ty {
        return ColumnVerdict::Compatible;
    }
    if source_ty.is_widening_compatible(&target_ty) {
        return ColumnVerdict::Compatible;
    }
    if target_ty.is_widening_compatible(&source_ty) {
        return ColumnVerdict::PossibleTruncation;
    }
    ColumnVerdict::TypeMismatch
}

fn describe_pair(source: &PipeColumnInfo, target: &TargetColumnInfo, verdict: ColumnVerdict) -> String {
    let base = format!(
        "source `{}` ({}) -> target `{}` ({}, native {})",
        source.name, source.logical_type, target.name, target.inferred_logical_type, target.native_type
    );
    match verdict {
        ColumnVerdict::NullabilityConflict => format!("{base} (source allows null, target does not)"),
        _ => base,
    }
}

/// Parses `DECIMAL(p,s)`/`NUMERIC(p,s)`-shaped native type names for the
/// precision-overflow row check (spec §4.4, scenario 3's
/// `price DECIMAL(18,4)`). Returns `None` for any other native type name.
fn parse_decimal_precision(native_type: &str) -> Option<(u32, u32)> {
    let upper = native_type.to_ascii_uppercase();
    let start = upper.find('(')?;
    let end = upper.find(')')?;
    let inner = &upper[start + 1..end];
    let mut parts = inner.split(',');
    let precision = parts.next()?.trim().parse().ok()?;
    let scale = parts.next().unwrap_or("0").trim().parse().ok()?;
    Some((precision, scale))
}

/// Samples `rows` against `target`'s introspected constraints (spec §4.4:
/// "for a sample of rows: NOT NULL violations, max-length overflows,
/// numeric precision overflows, duplicate values on UNIQUE columns").
pub fn validate_row_sample(source: &Schema, target: &TargetSchemaInfo, rows: &[Row]) -> Vec<RowFinding> {
    let mut findings = Vec::new();
    let mut seen_unique: std::collections::HashMap<usize, std::collections::HashSet<String>> = std::collections::HashMap::new();

    for (target_idx, target_col) in target.columns.iter().enumerate() {
        let Some(source_idx) = source.position_of(&target_col.name) else {
            continue;
        };

        for (row_idx, row) in rows.iter().enumerate() {
            let Some(value) = row.values().get(source_idx) else { continue };

            if value.is_null() && !target_col.nullable {
                findings.push(RowFinding {
                    row_index: row_idx,
                    column: target_col.name.clone(),
                    kind: RowViolationKind::NotNullViolation,
                    detail: format!("NOT NULL column `{}` received a null value", target_col.name),
                });
                continue;
            }

            if let (Value::String(s), Some(max_len)) = (value, target_col.max_length) {
                if s.chars().count() as u32 > max_len {
                    findings.push(RowFinding {
                        row_index: row_idx,
                        column: target_col.name.clone(),
                        kind: RowViolationKind::MaxLengthOverflow,
                        detail: format!("value length {} exceeds max length {max_len}", s.chars().count()),
                    });
                }
            }

            if let Value::Decimal(d) = value {
                if let Some((precision, scale)) = parse_decimal_precision(&target_col.native_type) {
                    let digits = d.digits();
                    if digits > precision.into() || d.fractional_digit_count().max(0) as u32 > scale {
                        findings.push(RowFinding {
                            row_index: row_idx,
                            column: target_col.name.clone(),
                            kind: RowViolationKind::PrecisionOverflow,
                            detail: format!("value `{d}` overflows {}", target_col.native_type),
                        });
                    }
                }
            }

            if target_col.is_unique && !value.is_null() {
                let seen = seen_unique.entry(target_idx).or_default();
                if !seen.insert(value.as_display_string()) {
                    findings.push(RowFinding {
                        row_index: row_idx,
                        column: target_col.name.clone(),
                        kind: RowViolationKind::DuplicateUnique,
                        detail: format!("duplicate value for UNIQUE column `{}`", target_col.name),
                    });
                }
            }
        }
    }

    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::core::data_type::LogicalType;

    struct TestDialect;
    impl Dialect for TestDialect {
        fn quote(&self, name: &str) -> String {
            format!("\"{name}\"")
        }
        fn needs_quoting(&self, _name: &str) -> bool {
            false
        }
        fn normalize(&self, name: &str) -> String {
            name.to_ascii_lowercase()
        }
        fn native_type_name(&self, _logical_type: LogicalType) -> &'static str {
            "TEXT"
        }
        fn placeholder(&self, n: usize) -> String {
            format!("${n}")
        }
        fn supports_native_upsert(&self) -> bool {
            true
        }
        fn name(&self) -> &'static str {
            "test"
        }
    }

    fn target_col(name: &str, ty: LogicalType, nullable: bool) -> TargetColumnInfo {
        TargetColumnInfo {
            name: name.into(),
            native_type: "TEXT".into(),
            inferred_logical_type: ty,
            nullable,
            is_primary_key: false,
            is_unique: false,
            max_length: None,
        }
    }

    #[test]
    fn missing_target_marks_every_column_will_be_created() {
        let schema = Schema::new(vec![PipeColumnInfo::new("id", LogicalType::Int64, false)]);
        let report = validate_schema(&schema, &TargetSchemaInfo::missing(), &TestDialect);
        assert_eq!(report.columns.len(), 1);
        assert_eq!(report.columns[0].verdict, ColumnVerdict::WillBeCreated);
        assert!(!report.has_errors());
    }

    #[test]
    fn nullability_conflict_is_an_error() {
        let schema = Schema::new(vec![PipeColumnInfo::new("email", LogicalType::String, true)]);
        let target = TargetSchemaInfo {
            exists: true,
            columns: vec![target_col("email", LogicalType::String, false)],
            primary_key_columns: vec![],
            row_count: None,
            size_bytes: None,
        };
        let report = validate_schema(&schema, &target, &TestDialect);
        assert_eq!(report.columns[0].verdict, ColumnVerdict::NullabilityConflict);
        assert!(report.has_errors());
    }

    #[test]
    fn widening_int_is_compatible() {
        let schema = Schema::new(vec![PipeColumnInfo::new("n", LogicalType::Int32, false)]);
        let target = TargetSchemaInfo {
            exists: true,
            columns: vec![target_col("n", LogicalType::Int64, false)],
            primary_key_columns: vec![],
            row_count: None,
            size_bytes: None,
        };
        let report = validate_schema(&schema, &target, &TestDialect);
        assert_eq!(report.columns[0].verdict, ColumnVerdict::Compatible);
    }

    #[test]
    fn narrowing_int_is_possible_truncation() {
        let schema = Schema::new(vec![PipeColumnInfo::new("n", LogicalType::Int64, false)]);
        let target = TargetSchemaInfo {
            exists: true,
            columns: vec![target_col("n", LogicalType::Int32, false)],
            primary_key_columns: vec![],
            row_count: None,
            size_bytes: None,
        };
        let report = validate_schema(&schema, &target, &TestDialect);
        assert_eq!(report.columns[0].verdict, ColumnVerdict::PossibleTruncation);
        assert!(!report.has_errors());
    }

    #[test]
    fn extra_not_null_target_column_is_an_error() {
        let schema = Schema::new(vec![PipeColumnInfo::new("id", LogicalType::Int64, false)]);
        let target = TargetSchemaInfo {
            exists: true,
            columns: vec![target_col("id", LogicalType::Int64, false), target_col("required", LogicalType::String, false)],
            primary_key_columns: vec![],
            row_count: None,
            size_bytes: None,
        };
        let report = validate_schema(&schema, &target, &TestDialect);
        let extra = report.columns.iter().find(|c| c.column == "required").unwrap();
        assert_eq!(extra.verdict, ColumnVerdict::ExtraInTargetNotNull);
        assert!(report.has_errors());
    }

    #[test]
    fn row_sample_flags_not_null_violation() {
        let schema = Schema::new(vec![PipeColumnInfo::new("email", LogicalType::String, true)]);
        let target = TargetSchemaInfo {
            exists: true,
            columns: vec![target_col("email", LogicalType::String, false)],
            primary_key_columns: vec![],
            row_count: None,
            size_bytes: None,
        };
        let rows = vec![Row::new(vec![Value::Null])];
        let findings = validate_row_sample(&schema, &target, &rows);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].kind, RowViolationKind::NotNullViolation);
    }

    #[test]
    fn row_sample_flags_duplicate_unique_values() {
        let schema = Schema::new(vec![PipeColumnInfo::new("email", LogicalType::String, true)]);
        let mut target_column = target_col("email", LogicalType::String, true);
        target_column.is_unique = true;
        let target = TargetSchemaInfo {
            exists: true,
            columns: vec![target_column],
            primary_key_columns: vec![],
            row_count: None,
            size_bytes: None,
        };
        let rows = vec![
            Row::new(vec![Value::String("a@x.com".into())]),
            Row::new(vec![Value::String("a@x.com".into())]),
        ];
        let findings = validate_row_sample(&schema, &target, &rows);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].kind, RowViolationKind::DuplicateUnique);
        assert_eq!(findings[0].row_index, 1);
    }

    #[test]
    fn reordered_columns_still_match_by_name_when_position_disagrees() {
        let schema = Schema::new(vec![
            PipeColumnInfo::new("name", LogicalType::String, false),
            PipeColumnInfo::new("id", LogicalType::Int64, false),
        ]);
        let target = TargetSchemaInfo {
            exists: true,
            columns: vec![target_col("id", LogicalType::Int64, false), target_col("name", LogicalType::String, false)],
            primary_key_columns: vec![],
            row_count: None,
            size_bytes: None,
        };
        let report = validate_schema(&schema, &target, &TestDialect);
        assert_eq!(report.columns.len(), 2);
        assert!(report.columns.iter().all(|c| c.verdict == ColumnVerdict::Compatible));
    }
}
