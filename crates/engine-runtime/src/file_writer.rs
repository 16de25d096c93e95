//! Adapts `connectors::writer::FileSink` to `engine-core::kernel::Writer`.
//! File sinks have exactly one meaningful placement axis — truncate the
//! file or append to it — so strategy handling here collapses to that one
//! boolean rather than the full state machine `writer_engine` runs for
//! database sinks.

use async_trait::async_trait;
use connectors::writer::FileSink;
use engine_core::error::EngineError;
use engine_core::kernel::Writer;
use model::execution::job::WriteStrategy;
use model::records::batch::Batch;
use model::Schema;

pub struct FileWriter {
    sink: Box<dyn FileSink>,
    strategy: WriteStrategy,
}

impl FileWriter {
    pub fn new(sink: Box<dyn FileSink>, strategy: WriteStrategy) -> Self {
        Self { sink, strategy }
    }
}

#[async_trait]
impl Writer for FileWriter {
    async fn initialize(&mut self, schema: &Schema, _strict_schema: bool) -> Result<(), EngineError> {
        if self.strategy.requires_key() {
            return Err(EngineError::Fatal(format!(
                "{:?} has no native collision resolution on a file sink",
                self.strategy
            )));
        }
        let truncate = !matches!(self.strategy, WriteStrategy::Append);
        self.sink.open(schema, truncate).await?;
        Ok(())
    }

    async fn write_batch(&mut self, batch: &Batch) -> Result<(), EngineError> {
        self.sink.write_batch(batch.rows()).await?;
        Ok(())
    }

    async fn complete(&mut self) -> Result<(), EngineError> {
        self.sink.close().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use connectors::error::Result as ConnResult;
    use model::core::data_type::LogicalType;
    use model::core::schema::PipeColumnInfo;
    use model::core::value::Value;
    use model::records::row::Row;
    use std::sync::{Arc, Mutex};

    #[derive(Default, Clone)]
    struct RecordedCalls {
        opened_truncate: Arc<Mutex<Option<bool>>>,
        rows: Arc<Mutex<Vec<Row>>>,
        closed: Arc<Mutex<bool>>,
    }

    struct RecordingSink(RecordedCalls);

    #[async_trait]
    impl FileSink for RecordingSink {
        async fn open(&mut self, _schema: &Schema, truncate: bool) -> ConnResult<()> {
            *self.0.opened_truncate.lock().unwrap() = Some(truncate);
            Ok(())
        }

        async fn write_batch(&mut self, rows: &[Row]) -> ConnResult<()> {
            self.0.rows.lock().unwrap().extend(rows.iter().cloned());
            Ok(())
        }

        async fn close(&mut self) -> ConnResult<()> {
            *self.0.closed.lock().unwrap() = true;
            Ok(())
        }
    }

    fn schema() -> Schema {
        Schema::new(vec![PipeColumnInfo::new("id", LogicalType::Int64, false)])
    }

    #[tokio::test]
    async fn append_opens_without_truncating() {
        let calls = RecordedCalls::default();
        let mut writer = FileWriter::new(Box::new(RecordingSink(calls.clone())), WriteStrategy::Append);
        writer.initialize(&schema(), false).await.unwrap();
        let batch = Batch::new(schema(), vec![Row::new(vec![Value::Int64(1)])]);
        writer.write_batch(&batch).await.unwrap();
        writer.complete().await.unwrap();
        assert_eq!(*calls.opened_truncate.lock().unwrap(), Some(false));
        assert_eq!(calls.rows.lock().unwrap().len(), 1);
        assert!(*calls.closed.lock().unwrap());
    }

    #[tokio::test]
    async fn recreate_truncates_the_file() {
        let calls = RecordedCalls::default();
        let mut writer = FileWriter::new(Box::new(RecordingSink(calls.clone())), WriteStrategy::Recreate);
        writer.initialize(&schema(), false).await.unwrap();
        assert_eq!(*calls.opened_truncate.lock().unwrap(), Some(true));
    }

    #[tokio::test]
    async fn upsert_is_rejected_for_file_sinks() {
        let calls = RecordedCalls::default();
        let mut writer = FileWriter::new(Box::new(RecordingSink(calls)), WriteStrategy::Upsert);
        assert!(writer.initialize(&schema(), false).await.is_err());
    }
}
