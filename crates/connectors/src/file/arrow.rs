//! Arrow IPC (`.arrow`/`.ipc`) `Reader`/`FileSink`. Arrow's columnar
//! `RecordBatch` is converted to/from row-major `Row`s at the boundary via
//! `file::conv` — everywhere else in the kernel stays row-oriented.

use std::fs::File;
use std::io::BufReader;

use arrow::ipc::reader::FileReader as ArrowIpcReader;
use arrow::ipc::writer::FileWriter as ArrowIpcWriter;
use async_trait::async_trait;

use model::{Row, Schema};

use crate::error::{ConnectorError, Result};
use crate::file::conv::{arrow_schema_to_model, record_batch_to_rows, rows_to_record_batch, schema_to_arrow};
use crate::reader::{ReadResult, Reader, ReaderOptions};
use crate::writer::FileSink;

pub struct ArrowReader {
    path: String,
    inner: Option<ArrowIpcReader<BufReader<File>>>,
    pending: Vec<Row>,
}

impl ArrowReader {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            inner: None,
            pending: Vec::new(),
        }
    }
}

#[async_trait]
impl Reader for ArrowReader {
    async fn open(&mut self, _opts: &ReaderOptions) -> Result<Schema> {
        let file = File::open(&self.path).map_err(ConnectorError::from)?;
        let reader = ArrowIpcReader::try_new(BufReader::new(file), None).map_err(|e| ConnectorError::Fatal(e.to_string()))?;
        let schema = arrow_schema_to_model(reader.schema().as_ref());
        self.inner = Some(reader);
        Ok(schema)
    }

    async fn read_batch(&mut self, batch_size: usize) -> Result<ReadResult> {
        while self.pending.len() < batch_size {
            let reader = self.inner.as_mut().ok_or_else(|| ConnectorError::Fatal("Arrow reader not opened".into()))?;
            match reader.next() {
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

pub struct ArrowSink {
    path: String,
    inner: Option<ArrowIpcWriter<File>>,
    schema: Option<Schema>,
}

impl ArrowSink {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            inner: None,
            schema: None,
        }
    }
}

#[async_trait]
impl FileSink for ArrowSink {
    async fn open(&mut self, schema: &Schema, _truncate: bool) -> Result<()> {
        // Arrow IPC's file format has no append mode; every open starts a
        // fresh file regardless of strategy (the writer engine rejects
        // Append against file sinks with a frozen schema mismatch instead).
        let file = File::create(&self.path).map_err(ConnectorError::from)?;
        let arrow_schema = schema_to_arrow(schema);
        let writer = ArrowIpcWriter::try_new(file, arrow_schema.as_ref()).map_err(|e| ConnectorError::Fatal(e.to_string()))?;
        self.inner = Some(writer);
        self.schema = Some(schema.clone());
        Ok(())
    }

    async fn write_batch(&mut self, rows: &[Row]) -> Result<()> {
        let schema = self.schema.as_ref().ok_or_else(|| ConnectorError::Fatal("Arrow sink not opened".into()))?;
        let batch = rows_to_record_batch(schema, rows)?;
        let writer = self.inner.as_mut().ok_or_else(|| ConnectorError::Fatal("Arrow sink not opened".into()))?;
        writer.write(&batch).map_err(|e| ConnectorError::Fatal(e.to_string()))
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(mut writer) = self.inner.take() {
            writer.finish().map_err(|e| ConnectorError::Fatal(e.to_string()))?;
        }
        Ok(())
    }
}
