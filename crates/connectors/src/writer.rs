//! Physical write capability for file sinks (spec §6: CSV, Parquet, Arrow
//! IPC). Strategy semantics (Append/Truncate/DeleteThenInsert/Recreate/
//! Upsert/Ignore) are a database-sink concern owned by
//! `engine-runtime::writer_engine::WriterStrategyEngine`, which drives
//! `sql::base::SqlAdapter` directly; file sinks have only one meaningful
//! placement mode, so this trait is intentionally simpler than `SqlAdapter`.

use async_trait::async_trait;
use model::{Row, Schema};

use crate::error::Result;

#[async_trait]
pub trait FileSink: Send + Sync {
    /// Opens the sink for writing. `truncate` distinguishes `Append`
    /// (false — open in append mode, or create if absent) from `Truncate`/
    /// `Recreate` (true — start the file over). `DeleteThenInsert` on a
    /// file sink behaves like `truncate: true`; `Upsert`/`Ignore` are
    /// rejected by the caller before `open` is reached (file sinks require
    /// `--key` but have no native collision resolution, spec §4.3's
    /// per-strategy table only defines these against "Target present").
    async fn open(&mut self, schema: &Schema, truncate: bool) -> Result<()>;

    async fn write_batch(&mut self, rows: &[Row]) -> Result<()>;

    async fn close(&mut self) -> Result<()>;
}
