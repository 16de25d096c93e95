//! A generic streaming `Reader` built on any `SqlAdapter`. Pulls one
//! dialect-windowed page per `read_batch` call rather than materializing
//! the whole result set, so a multi-million row source query never has to
//! fit in memory at once (spec §4.5).

use async_trait::async_trait;
use model::Schema;

use crate::error::Result;
use crate::reader::{ReadResult, Reader, ReaderOptions};
use crate::sql::base::SqlAdapter;

pub struct SqlReader<A: SqlAdapter> {
    adapter: A,
    query: String,
    schema: Option<Schema>,
    offset: u64,
}

impl<A: SqlAdapter> SqlReader<A> {
    pub fn new(adapter: A, query: impl Into<String>) -> Self {
        Self {
            adapter,
            query: query.into(),
            schema: None,
            offset: 0,
        }
    }
}

#[async_trait]
impl<A: SqlAdapter + Send + Sync> Reader for SqlReader<A> {
    async fn open(&mut self, _opts: &ReaderOptions) -> Result<Schema> {
        let probe = self.adapter.dialect().paginate(&self.query, 0, 1);
        let (schema, _) = self.adapter.query(&probe).await?;
        self.schema = Some(schema.clone());
        Ok(schema)
    }

    async fn read_batch(&mut self, batch_size: usize) -> Result<ReadResult> {
        let windowed = self.adapter.dialect().paginate(&self.query, self.offset, batch_size as u64);
        let (_, rows) = self.adapter.query(&windowed).await?;
        let fetched = rows.len();
        self.offset += fetched as u64;
        Ok(ReadResult {
            rows,
            exhausted: fetched < batch_size,
        })
    }

    async fn close(&mut self) -> Result<()> {
        Ok(())
    }

    fn requires_query(&self) -> bool {
        true
    }
}
