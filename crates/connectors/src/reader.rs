//! The Reader Adapter Skeleton (spec §4.5): every source — relational or
//! file — implements `Open`, `ReadBatches`, `Close` against this trait.
//! Readers are expected to stream; none of the concrete adapters in this
//! crate materializes a full result set in memory.

use async_trait::async_trait;
use model::Schema;

use crate::error::Result;

/// Provider-tunable knobs threaded through `Open`/`ReadBatches`. Database
/// readers use `fetch_size`/`array_binding`; file readers mostly ignore
/// them. Frozen once the reader is opened (spec §5 "Option registries are
/// frozen before the loop and read-only thereafter").
#[derive(Debug, Clone, Default)]
pub struct ReaderOptions {
    pub connection_timeout_ms: Option<u64>,
    pub query_timeout_ms: Option<u64>,
    pub fetch_size: Option<usize>,
    pub array_binding: bool,
}

/// One fetched batch of rows, paired with whether the stream is now
/// exhausted. A reader that returns `exhausted: true` with a non-empty
/// `rows` signals "this was the last batch"; an empty batch with
/// `exhausted: true` signals "nothing more, and nothing in this call".
#[derive(Debug, Clone)]
pub struct ReadResult {
    pub rows: Vec<model::Row>,
    pub exhausted: bool,
}

#[async_trait]
pub trait Reader: Send + Sync {
    /// Negotiates the session, executes the user query (if the provider
    /// requires one), and exposes the resulting schema. Must be called
    /// exactly once, before any `read_batch` call.
    async fn open(&mut self, opts: &ReaderOptions) -> Result<Schema>;

    /// Fetches up to `batch_size` more rows. Must not materialize the full
    /// result set — each call pulls only what it returns.
    async fn read_batch(&mut self, batch_size: usize) -> Result<ReadResult>;

    async fn close(&mut self) -> Result<()>;

    /// Whether this provider requires `query` to be set (spec §4.5:
    /// "database readers do, file readers may not").
    fn requires_query(&self) -> bool {
        false
    }
}
