//! `INSERT` / native upsert (`ON CONFLICT` / `MERGE`) / keyed `DELETE`
//! statement rendering (spec §4.3 "Load mechanics"). Array binding itself
//! is a connector concern; this module only renders the SQL text around a
//! placeholder list the connector fills in per row or per batch.

use crate::dialect::Dialect;

/// Renders a single parameterized `INSERT INTO <table> (...) VALUES (...)`
/// for one row. Connectors drive "Standard" insert mode by calling this
/// once per row (or batching several `VALUES (...)` tuples together, which
/// `insert_multi_row` does).
pub fn insert_row(table: &str, columns: &[String], dialect: &dyn Dialect) -> String {
    let col_list = render_columns(columns, dialect);
    let placeholders: Vec<String> = (1..=columns.len()).map(|i| dialect.placeholder(i)).collect();
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        dialect.render_identifier(table, false),
        col_list,
        placeholders.join(", ")
    )
}

/// Renders one `INSERT` with `row_count` value tuples, used by the
/// "Standard" array-bound insert mode to batch several rows per round
/// trip rather than one statement per row.
pub fn insert_multi_row(table: &str, columns: &[String], row_count: usize, dialect: &dyn Dialect) -> String {
    let col_list = render_columns(columns, dialect);
    let mut param = 0usize;
    let tuples: Vec<String> = (0..row_count)
        .map(|_| {
            let placeholders: Vec<String> = (0..columns.len())
                .map(|_| {
                    param += 1;
                    dialect.placeholder(param)
                })
                .collect();
            format!("({})", placeholders.join(", "))
        })
        .collect();
    format!(
        "INSERT INTO {} ({}) VALUES {}",
        dialect.render_identifier(table, false),
        col_list,
        tuples.join(", ")
    )
}

fn render_columns(columns: &[String], dialect: &dyn Dialect) -> String {
    columns
        .iter()
        .map(|c| dialect.render_identifier(c, false))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Renders a native `INSERT ... ON CONFLICT (...) DO UPDATE SET ...`
/// (Postgres/DuckDB/SQLite) for the `Upsert` strategy. Callers must check
/// `dialect.supports_native_upsert()` first; dialects without it merge
/// through a staging table instead (spec §4.3).
pub fn upsert_on_conflict(table: &str, columns: &[String], key_columns: &[String], dialect: &dyn Dialect) -> String {
    let insert = insert_row(table, columns, dialect);
    let key_list = render_columns(key_columns, dialect);
    let update_cols: Vec<&String> = columns.iter().filter(|c| !key_columns.contains(c)).collect();
    if update_cols.is_empty() {
        return format!("{insert} ON CONFLICT ({key_list}) DO NOTHING");
    }
    let set_clause = update_cols
        .iter()
        .map(|c| {
            let ident = dialect.render_identifier(c, false);
            format!("{ident} = EXCLUDED.{ident}")
        })
        .collect::<Vec<_>>()
        .join(", ");
    format!("{insert} ON CONFLICT ({key_list}) DO UPDATE SET {set_clause}")
}

/// Renders the same insert with `ON CONFLICT ... DO NOTHING`, for the
/// `Ignore` strategy (keep the existing row on a key collision).
pub fn ignore_on_conflict(table: &str, columns: &[String], key_columns: &[String], dialect: &dyn Dialect) -> String {
    let insert = insert_row(table, columns, dialect);
    let key_list = render_columns(key_columns, dialect);
    format!("{insert} ON CONFLICT ({key_list}) DO NOTHING")
}

/// Renders an Oracle-style `MERGE INTO` statement driven directly off bind
/// variables (no staging table) for `Upsert`. Oracle's dialect reports
/// `supports_native_upsert() == true` specifically for this path.
pub fn merge_into(table: &str, columns: &[String], key_columns: &[String], dialect: &dyn Dialect) -> String {
    let source_alias = "src";
    let target_alias = "tgt";
    let mut param = 0usize;
    let select_list = columns
        .iter()
        .map(|c| {
            param += 1;
            format!("{} AS {}", dialect.placeholder(param), dialect.render_identifier(c, false))
        })
        .collect::<Vec<_>>()
        .join(", ");
    let on_clause = key_columns
        .iter()
        .map(|k| {
            let ident = dialect.render_identifier(k, false);
            format!("{target_alias}.{ident} = {source_alias}.{ident}")
        })
        .collect::<Vec<_>>()
        .join(" AND ");
    let update_cols: Vec<&String> = columns.iter().filter(|c| !key_columns.contains(c)).collect();
    let set_clause = update_cols
        .iter()
        .map(|c| {
            let ident = dialect.render_identifier(c, false);
            format!("{ident} = {source_alias}.{ident}")
        })
        .collect::<Vec<_>>()
        .join(", ");
    let insert_cols = render_columns(columns, dialect);
    let insert_vals = columns
        .iter()
        .map(|c| format!("{source_alias}.{}", dialect.render_identifier(c, false)))
        .collect::<Vec<_>>()
        .join(", ");

    let matched_clause = if set_clause.is_empty() {
        String::new()
    } else {
        format!("WHEN MATCHED THEN UPDATE SET {set_clause}\n")
    };

    format!(
        "MERGE INTO {table} {target_alias}\nUSING (SELECT {select_list} FROM dual) {source_alias}\nON ({on_clause})\n{matched_clause}WHEN NOT MATCHED THEN INSERT ({insert_cols}) VALUES ({insert_vals})",
        table = dialect.render_identifier(table, false),
    )
}

/// Renders the staging-table merge `UPDATE ... FROM staging` /
/// `INSERT ... SELECT ... WHERE NOT EXISTS` pair used by dialects without
/// a native upsert (MsSql in this design). Returns `(update_sql,
/// insert_sql)`; the writer runs both inside one transaction at Complete.
pub fn staging_merge(target: &str, staging: &str, columns: &[String], key_columns: &[String], dialect: &dyn Dialect) -> (String, String) {
    let update_cols: Vec<&String> = columns.iter().filter(|c| !key_columns.contains(c)).collect();
    let target_ident = dialect.render_identifier(target, false);
    let staging_ident = dialect.render_identifier(staging, false);
    let join_clause = key_columns
        .iter()
        .map(|k| {
            let ident = dialect.render_identifier(k, false);
            format!("t.{ident} = s.{ident}")
        })
        .collect::<Vec<_>>()
        .join(" AND ");
    let set_clause = update_cols
        .iter()
        .map(|c| {
            let ident = dialect.render_identifier(c, false);
            format!("{ident} = s.{ident}")
        })
        .collect::<Vec<_>>()
        .join(", ");
    let update_sql = if set_clause.is_empty() {
        String::new()
    } else {
        format!("UPDATE t SET {set_clause} FROM {target_ident} t INNER JOIN {staging_ident} s ON {join_clause}")
    };
    let col_list = render_columns(columns, dialect);
    let select_list = columns
        .iter()
        .map(|c| format!("s.{}", dialect.render_identifier(c, false)))
        .collect::<Vec<_>>()
        .join(", ");
    let insert_sql = format!(
        "INSERT INTO {target_ident} ({col_list}) SELECT {select_list} FROM {staging_ident} s WHERE NOT EXISTS (SELECT 1 FROM {target_ident} t WHERE {join_clause})"
    );
    (update_sql, insert_sql)
}

/// Renders the Ignore variant of the staging merge: insert only rows whose
/// key is absent from the target, never touching existing rows.
pub fn staging_insert_missing(target: &str, staging: &str, columns: &[String], key_columns: &[String], dialect: &dyn Dialect) -> String {
    let (_, insert_sql) = staging_merge(target, staging, columns, key_columns, dialect);
    insert_sql
}

pub fn delete_all_keyed(table: &str, key_columns: &[String], dialect: &dyn Dialect) -> String {
    let target = dialect.render_identifier(table, false);
    let predicate = key_columns
        .iter()
        .enumerate()
        .map(|(i, k)| format!("{} = {}", dialect.render_identifier(k, false), dialect.placeholder(i + 1)))
        .collect::<Vec<_>>()
        .join(" AND ");
    format!("DELETE FROM {target} WHERE {predicate}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{MsSql, Postgres};

    #[test]
    fn insert_row_numbers_placeholders_from_one() {
        let sql = insert_row("users", &["id".into(), "name".into()], &Postgres);
        assert_eq!(sql, "INSERT INTO users (id, name) VALUES ($1, $2)");
    }

    #[test]
    fn multi_row_insert_increments_placeholders_across_tuples() {
        let sql = insert_multi_row("users", &["id".into()], 2, &Postgres);
        assert_eq!(sql, "INSERT INTO users (id) VALUES ($1), ($2)");
    }

    #[test]
    fn upsert_excludes_key_columns_from_set_clause() {
        let sql = upsert_on_conflict("users", &["id".into(), "name".into()], &["id".into()], &Postgres);
        assert!(sql.contains("ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name"));
    }

    #[test]
    fn staging_merge_joins_on_all_key_columns() {
        let (update_sql, insert_sql) = staging_merge(
            "users",
            "stage",
            &["id".into(), "name".into()],
            &["id".into()],
            &MsSql,
        );
        assert!(update_sql.contains("t.[id] = s.[id]"));
        assert!(insert_sql.contains("WHERE NOT EXISTS"));
    }
}
