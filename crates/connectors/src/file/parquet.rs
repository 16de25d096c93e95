//! Parquet `Reader`/`FileSink`, built on `parquet`'s Arrow integration —
//! the same `RecordBatch`-to-`Row` conversion in `file::conv` that the
//! Arrow IPC adapter uses, since Parquet's `arrow` feature already produces
//! `RecordBatch`es on read and consumes them on write.

use std::fs::File;

use async_trait::async_trait;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::arrow_writer::ArrowWriter;
use parquet::file::properties::WriterProperties;

use model::{Row, Schema};

use crate::error::{ConnectorError, Result};
use crate::file::conv::{arrow_schema_to_model, record_batch_to_rows, rows_to_record_batch, schema_to_arrow};
use crate::reader::{ReadResult, Reader, ReaderOptions};
use crate::writer::FileSink;

pub struct ParquetReader {
    path: String,
    inner: Option<Box<dyn Iterator<Item = std::result::Result<arrow::record_batch::RecordBatch, arrow::error::ArrowError>>>>,
    pending: Vec<Row>,
}

impl ParquetReader {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            inner: None,
            pending: Vec::new(),
        }
    }
}

#[async_trait]
impl Reader for ParquetReader {
    async fn open(&mut self, opts: &ReaderOptions) -> Result<Schema> {
        let file = File::open(&self.path).map_err(ConnectorError::from)?;
        let mut builder = ParquetRecordBatchReaderBuilder::try_new(file).map_err(|e| ConnectorError::Fatal(e.to_string()))?;
        if let Some(fetch_size) = opts.fetch_size {
            builder = builder.with_batch_size(fetch_size);
        }
        let arrow_schema = builder.schema().clone();
        let reader = builder.build().map_err(|e| ConnectorError::Fatal(e.to_string()))?;
        let schema = arrow_schema_to_model(arrow_schema.as_ref());
        self.inner = Some(Box::new(reader));
        Ok(schema)
    }

    async fn read_batch(&mut self, batch_size: usize) -> Result<ReadResult> {
        while self.pending.len() < batch_size {
            let Some(inner) = self.inner.as_mut() else {
                return Err(ConnectorError::Fatal("Parquet reader not opened".into()));
            };
            match inner.next() {
                Some(Ok(record_batch)) => self.pending.extend(record_batch_to_rows(&record_batch)),
                Some(Err(e)) => return Err(ConnectorError::Fatal(e.to_string())),
                None => break,
            }
        }
        let take = batch_size.min(self.pending.len());
        let rows: Vec<Row> = self.pending.drain(..take).collect();
        let exhausted = self.pending.is_empty() && rows.len() < batch_size;
        Ok(ReadResult { rows, exhausted })
    }

    async fn close(&mut self) -> Result<()> {
        self.inner = None;
        Ok(())
    }
}

pub struct ParquetSink {
    path: String,
    inner: Option<ArrowWriter<File>>,
    schema: Option<Schema>,
}

impl ParquetSink {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            inner: None,
            schema: None,
        }
    }
}

#[async_trait]
impl FileSink for ParquetSink {
    async fn open(&mut self, schema: &Schema, _truncate: bool) -> Result<()> {
        // Parquet's footer-based format has no append mode either; every
        // open starts a fresh file, same as the Arrow IPC sink.
        let file = File::create(&self.path).map_err(ConnectorError::from)?;
        let arrow_schema = schema_to_arrow(schema);
        let props = WriterProperties::builder().build();
        let writer = ArrowWriter::try_new(file, arrow_schema, Some(props)).map_err(|e| ConnectorError::Fatal(e.to_string()))?;
        self.inner = Some(writer);
        self.schema = Some(schema.clone());
        Ok(())
    }

    async fn write_batch(&mut self, rows: &[Row]) -> Result<()> {
        let schema = self.schema.as_ref().ok_or_else(|| ConnectorError::Fatal("Parquet sink not opened".into()))?;
        let batch = rows_to_record_batch(schema, rows)?;
        let writer = self.inner.as_mut().ok_or_else(|| ConnectorError::Fatal("Parquet sink not opened".into()))?;
        writer.write(&batch).map_err(|e| ConnectorError::Fatal(e.to_string()))
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(writer) = self.inner.take() {
            writer.close().map_err(|e| ConnectorError::Fatal(e.to_string()))?;
        }
        Ok(())
    }
}
