//! `CREATE TABLE` / `DROP TABLE` / `TRUNCATE` statement rendering for the
//! Writer Strategy Engine (spec §4.3). Pure string builders — this crate
//! renders SQL text, it never executes it (`connectors` does).

use model::{PipeColumnInfo, Schema, TargetColumnInfo};

use crate::dialect::Dialect;
use crate::error::{PlannerError, Result};

/// Renders `CREATE TABLE <table> (...)` from a source `Schema`, used
/// whenever a strategy's "target missing" column in spec §4.3's table
/// says "create from source schema".
pub fn create_table_from_schema(table: &str, schema: &Schema, dialect: &dyn Dialect) -> Result<String> {
    if schema.is_empty() {
        return Err(PlannerError::EmptySchema(table.to_string()));
    }
    let columns: Vec<String> = schema.columns().iter().map(|c| render_column(c, dialect)).collect();
    Ok(format!(
        "CREATE TABLE {} (\n  {}\n)",
        dialect.render_identifier(table, false),
        columns.join(",\n  ")
    ))
}

fn render_column(column: &PipeColumnInfo, dialect: &dyn Dialect) -> String {
    let name = dialect.render_identifier(&column.name, column.is_case_sensitive);
    let native_type = dialect.native_type_name(column.logical_type);
    let nullability = if column.is_nullable { "" } else { " NOT NULL" };
    format!("{name} {native_type}{nullability}")
}

/// Renders `CREATE TABLE <table> (...)` using captured native column
/// types rather than re-deriving them from logical types — the
/// Introspect-Before-Drop invariant for `Recreate` (spec §4.3, §8): the
/// recreated table must reuse the native type discovered before the drop.
pub fn create_table_from_native(table: &str, columns: &[TargetColumnInfo], dialect: &dyn Dialect) -> Result<String> {
    if columns.is_empty() {
        return Err(PlannerError::EmptySchema(table.to_string()));
    }
    let rendered: Vec<String> = columns
        .iter()
        .map(|c| {
            let name = dialect.render_identifier(&c.name, false);
            let nullability = if c.nullable { "" } else { " NOT NULL" };
            format!("{name} {}{nullability}", c.native_type)
        })
        .collect();
    let pk = columns.iter().filter(|c| c.is_primary_key).map(|c| c.name.clone()).collect::<Vec<_>>();
    let mut body = rendered.join(",\n  ");
    if !pk.is_empty() {
        let pk_cols: Vec<String> = pk.iter().map(|n| dialect.render_identifier(n, false)).collect();
        body.push_str(&format!(",\n  PRIMARY KEY ({})", pk_cols.join(", ")));
    }
    Ok(format!("CREATE TABLE {} (\n  {}\n)", dialect.render_identifier(table, false), body))
}

pub fn drop_table(table: &str, dialect: &dyn Dialect) -> String {
    format!("DROP TABLE {}", dialect.render_identifier(table, false))
}

pub fn drop_table_if_exists(table: &str, dialect: &dyn Dialect) -> String {
    format!("DROP TABLE IF EXISTS {}", dialect.render_identifier(table, false))
}

/// Native `TRUNCATE TABLE`. Callers must check `dialect.supports_truncate()`
/// first and fall back to `DeleteThenInsert` otherwise (spec §4.3).
pub fn truncate_table(table: &str, dialect: &dyn Dialect) -> String {
    format!("TRUNCATE TABLE {}", dialect.render_identifier(table, false))
}

pub fn delete_all(table: &str, dialect: &dyn Dialect) -> String {
    format!("DELETE FROM {}", dialect.render_identifier(table, false))
}

pub fn staging_table_name(target_table: &str, staging_id: &str) -> String {
    format!("__dtpipe_stage_{target_table}_{staging_id}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Postgres;
    use model::LogicalType;

    #[test]
    fn renders_not_null_and_nullable_columns() {
        let schema = Schema::new(vec![
            PipeColumnInfo::new("id", LogicalType::Int64, false),
            PipeColumnInfo::new("name", LogicalType::String, true),
        ]);
        let sql = create_table_from_schema("users", &schema, &Postgres).unwrap();
        assert!(sql.contains("id bigint NOT NULL"));
        assert!(sql.contains("name text"));
        assert!(!sql.contains("name text NOT NULL"));
    }

    #[test]
    fn empty_schema_is_an_error() {
        let schema = Schema::empty();
        assert!(create_table_from_schema("users", &schema, &Postgres).is_err());
    }

    #[test]
    fn native_recreate_includes_primary_key_clause() {
        let columns = vec![TargetColumnInfo {
            name: "id".into(),
            native_type: "bigint".into(),
            inferred_logical_type: LogicalType::Int64,
            nullable: false,
            is_primary_key: true,
            is_unique: true,
            max_length: None,
        }];
        let sql = create_table_from_native("users", &columns, &Postgres).unwrap();
        assert!(sql.contains("PRIMARY KEY (id)"));
    }
}
