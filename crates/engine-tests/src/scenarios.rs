#[cfg(test)]
mod tests {
    use crate::fixtures::*;
    use connectors::open_sql_adapter;
    use connectors::sql::SqlAdapter;
    use engine_runtime::execute_job;
    use model::execution::job::{InsertMode, WriteStrategy};
    use tokio_util::sync::CancellationToken;

    // Test Settings: `generate:2` source, `--fake Email:internet.email --fake-seed-column UserId`.
    // Scenario: two rows share the same `UserId` but carry different source `Email` values.
    // Expected Outcome: both output rows receive the identical faked `Email` value (spec §8 scenario 1).
    #[tokio::test]
    async fn anonymization_with_seed_column_is_deterministic_across_rows() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.csv");

        let input = write_csv(
            &dir,
            "in.csv",
            &["UserId,Email", "1,a@x.example", "1,b@y.example"],
        );

        let mut job = base_job(csv_endpoint(&input), csv_endpoint(&out));
        job.transformers = vec![transformer("fake", vec!["Email:internet.email#seed:UserId"])];

        execute_job(&job, &CancellationToken::new()).await.unwrap();

        let (header, rows) = read_csv(&out);
        assert_eq!(header, vec!["UserId", "Email"]);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][1], rows[1][1], "same seed column value must fake to the same value");
    }

    // Test Settings: SQLite target `users(id PK, name)` pre-populated with `(1, "old")`.
    // Scenario: input CSV `1,new` / `2,fresh` loaded with `--strategy Upsert --key id`.
    // Expected Outcome: target ends up `{(1,"new"),(2,"fresh")}`, two rows written (spec §8 scenario 2).
    #[tokio::test]
    async fn upsert_resolves_collisions_against_the_introspected_primary_key() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("users.sqlite3");

        {
            let adapter = open_sql_adapter(&sqlite_endpoint(&db_path)).await.unwrap();
            adapter
                .execute("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL)")
                .await
                .unwrap();
            adapter.execute("INSERT INTO users (id, name) VALUES (1, 'old')").await.unwrap();
        }

        let input = write_csv(&dir, "in.csv", &["id,name", "1,new", "2,fresh"]);

        let mut job = base_job(csv_endpoint(&input), sqlite_endpoint(&db_path));
        job.strategy = WriteStrategy::Upsert;
        job.key_columns = vec!["id".into()];
        job.target_table = Some("users".into());

        let outcome = execute_job(&job, &CancellationToken::new()).await.unwrap();
        assert_eq!(outcome.result.rows_out, 2);

        let adapter = open_sql_adapter(&sqlite_endpoint(&db_path)).await.unwrap();
        let (_, rows) = adapter.query("SELECT id, name FROM users ORDER BY id").await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get(1).unwrap().as_display_string(), "new");
        assert_eq!(rows[1].get(1).unwrap().as_display_string(), "fresh");
    }

    // Test Settings: DuckDB target has `price DECIMAL(18,4)`; source schema infers `price` as a string.
    // Scenario: `--strategy Recreate` against that existing table.
    // Expected Outcome: the recreated column's native type is still `DECIMAL(18,4)` (spec §8 scenario 3).
    #[tokio::test]
    async fn recreate_preserves_the_introspected_native_column_type() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("prices.duckdb");

        {
            let adapter = open_sql_adapter(&duckdb_path_endpoint(&db_path)).await.unwrap();
            adapter
                .execute("CREATE TABLE prices (id INTEGER, price DECIMAL(18,4))")
                .await
                .unwrap();
            adapter.execute("INSERT INTO prices VALUES (1, 9.5)").await.unwrap();
        }

        let input = write_csv(&dir, "in.csv", &["id,price", "1,19.9900", "2,4.5000"]);

        let mut job = base_job(csv_endpoint(&input), duckdb_path_endpoint(&db_path));
        job.strategy = WriteStrategy::Recreate;
        job.target_table = Some("prices".into());

        execute_job(&job, &CancellationToken::new()).await.unwrap();

        let adapter = open_sql_adapter(&duckdb_path_endpoint(&db_path)).await.unwrap();
        let target = adapter.introspect_table("prices").await.unwrap();
        let price_col = target.columns.iter().find(|c| c.name.eq_ignore_ascii_case("price")).unwrap();
        assert_eq!(price_col.native_type.to_ascii_uppercase(), "DECIMAL(18,4)");
    }

    // Test Settings: source has column `extra` absent from the target, no default, target present,
    // `--strategy Append --strict-schema`.
    // Expected Outcome: fatal before any row is read; no rows land in the target (spec §8 scenario 4).
    #[tokio::test]
    async fn strict_schema_aborts_before_any_row_is_written() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("strict.sqlite3");

        {
            let adapter = open_sql_adapter(&sqlite_endpoint(&db_path)).await.unwrap();
            adapter.execute("CREATE TABLE widgets (id INTEGER PRIMARY KEY NOT NULL)").await.unwrap();
        }

        let input = write_csv(&dir, "in.csv", &["id,extra", "1,surplus"]);

        let mut job = base_job(csv_endpoint(&input), sqlite_endpoint(&db_path));
        job.strategy = WriteStrategy::Append;
        job.strict_schema = true;
        job.target_table = Some("widgets".into());

        let result = execute_job(&job, &CancellationToken::new()).await;
        assert!(result.is_err());

        let adapter = open_sql_adapter(&sqlite_endpoint(&db_path)).await.unwrap();
        let (_, rows) = adapter.query("SELECT id FROM widgets").await.unwrap();
        assert!(rows.is_empty(), "no row may reach a strict-schema mismatch target");
    }

    // Test Settings: rows `{tags:"A,B,C", active:"yes"}` and `{tags:"", active:""}` with
    // `--filter row.active --expand "split(row.tags) as tag"`. CSV columns always come back
    // as strings, and this engine's truthiness treats any non-empty string as truthy (the
    // literal text "false" would itself be truthy) — so the falsy row is written as an empty
    // field rather than the word "false".
    // Expected Outcome: three output rows, one per split token, source-then-split order (spec §8 scenario 5).
    #[tokio::test]
    async fn filter_then_expand_preserves_source_order() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.csv");

        let input = write_csv(&dir, "in.csv", &["tags,active", "\"A,B,C\",yes", "\"\",\"\""]);

        let mut job = base_job(csv_endpoint(&input), csv_endpoint(&out));
        job.transformers = vec![
            transformer("filter", vec!["row.active"]),
            transformer("expand", vec!["split(row.tags) as tag"]),
        ];

        execute_job(&job, &CancellationToken::new()).await.unwrap();

        let (header, rows) = read_csv(&out);
        assert_eq!(header, vec!["tags", "active", "tag"]);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows.iter().map(|r| r[2].as_str()).collect::<Vec<_>>(), vec!["A", "B", "C"]);
    }

    // Test Settings: `--pre-exec`/`--on-error-exec`/`--finally-exec` hooks writing a marker file each,
    // target database rejects every write.
    // Expected Outcome: `PreExec` runs before the reader opens, `OnErrorExec` and `FinallyExec` both run
    // on a fatal write failure, and `PostExec` never does (spec §8 scenario 6's hook-ordering half).
    #[tokio::test]
    async fn fatal_write_failure_runs_on_error_and_finally_but_not_post_exec() {
        let dir = tempfile::tempdir().unwrap();
        let pre_marker = dir.path().join("pre.marker");
        let on_error_marker = dir.path().join("on_error.marker");
        let finally_marker = dir.path().join("finally.marker");
        let post_marker = dir.path().join("post.marker");

        let input = write_csv(&dir, "in.csv", &["id", "1"]);
        // A target column typed NOT NULL with no matching source column forces every insert to fail
        // at load time (not at strict-schema pre-flight, since strict_schema is left off here).
        let db_path = dir.path().join("hooks.sqlite3");
        {
            let adapter = open_sql_adapter(&sqlite_endpoint(&db_path)).await.unwrap();
            adapter
                .execute("CREATE TABLE t (id INTEGER PRIMARY KEY, required TEXT NOT NULL)")
                .await
                .unwrap();
        }

        let mut job = base_job(csv_endpoint(&input), sqlite_endpoint(&db_path));
        job.strategy = WriteStrategy::Append;
        job.insert_mode = InsertMode::Standard;
        job.target_table = Some("t".into());
        job.hooks.pre_exec = Some(format!("touch {}", pre_marker.display()));
        job.hooks.on_error_exec = Some(format!("touch {}", on_error_marker.display()));
        job.hooks.finally_exec = Some(format!("touch {}", finally_marker.display()));
        job.hooks.post_exec = Some(format!("touch {}", post_marker.display()));

        let result = execute_job(&job, &CancellationToken::new()).await;
        assert!(result.is_err());

        assert!(pre_marker.exists(), "PreExec must run before the reader opens");
        assert!(on_error_marker.exists(), "OnErrorExec must run on a fatal failure");
        assert!(finally_marker.exists(), "FinallyExec must always run");
        assert!(!post_marker.exists(), "PostExec must not run after a fatal failure");
    }
}
