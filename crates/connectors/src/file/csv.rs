//! CSV `Reader`/`FileSink`. Every value crosses the file boundary as text —
//! schema inference on read treats every column as `LogicalType::String`
//! (narrower sniffing lives in the transformer's `format` kind, not here)
//! and every column on write goes through `Value::as_display_string`.

use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter};

use async_trait::async_trait;
use csv::{ReaderBuilder, WriterBuilder};

use model::{LogicalType, PipeColumnInfo, Row, Schema, Value};

use crate::error::{ConnectorError, Result};
use crate::reader::{ReadResult, Reader, ReaderOptions};
use crate::writer::FileSink;

#[derive(Debug, Clone)]
pub struct CsvSettings {
    pub delimiter: u8,
    pub has_headers: bool,
}

impl Default for CsvSettings {
    fn default() -> Self {
        Self {
            delimiter: b',',
            has_headers: true,
        }
    }
}

pub struct CsvReader {
    path: String,
    settings: CsvSettings,
    inner: Option<csv::Reader<BufReader<File>>>,
    headers: Vec<String>,
}

impl CsvReader {
    pub fn new(path: impl Into<String>, settings: CsvSettings) -> Self {
        Self {
            path: path.into(),
            settings,
            inner: None,
            headers: Vec::new(),
        }
    }
}

#[async_trait]
impl Reader for CsvReader {
    async fn open(&mut self, _opts: &ReaderOptions) -> Result<Schema> {
        let file = File::open(&self.path).map_err(ConnectorError::from)?;
        let mut reader = ReaderBuilder::new()
            .delimiter(self.settings.delimiter)
            .has_headers(self.settings.has_headers)
            .from_reader(BufReader::new(file));

        self.headers = if self.settings.has_headers {
            reader.headers().map_err(ConnectorError::from)?.iter().map(String::from).collect()
        } else {
            let width = reader
                .records()
                .next()
                .transpose()
                .map_err(ConnectorError::from)?
                .map(|r| r.len())
                .unwrap_or(0);
            reader.seek(csv::Position::new()).map_err(ConnectorError::from)?;
            (0..width).map(|i| format!("column_{i}")).collect()
        };

        let schema = Schema::new(
            self.headers
                .iter()
                .map(|name| PipeColumnInfo::new(name.clone(), LogicalType::String, true))
                .collect(),
        );
        self.inner = Some(reader);
        Ok(schema)
    }

    async fn read_batch(&mut self, batch_size: usize) -> Result<ReadResult> {
        let reader = self.inner.as_mut().ok_or_else(|| ConnectorError::Fatal("CSV reader not opened".into()))?;
        let mut rows = Vec::with_capacity(batch_size);
        for record_result in reader.records().take(batch_size) {
            let record = record_result.map_err(ConnectorError::from)?;
            let values: Vec<Value> = record
                .iter()
                .map(|field| if field.is_empty() { Value::Null } else { Value::String(field.to_string()) })
                .collect();
            rows.push(Row::new(values));
        }
        let exhausted = rows.len() < batch_size;
        Ok(ReadResult { rows, exhausted })
    }

    async fn close(&mut self) -> Result<()> {
        self.inner = None;
        Ok(())
    }
}

pub struct CsvSink {
    path: String,
    settings: CsvSettings,
    inner: Option<csv::Writer<BufWriter<File>>>,
}

impl CsvSink {
    pub fn new(path: impl Into<String>, settings: CsvSettings) -> Self {
        Self {
            path: path.into(),
            settings,
            inner: None,
        }
    }
}

#[async_trait]
impl FileSink for CsvSink {
    async fn open(&mut self, schema: &Schema, truncate: bool) -> Result<()> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(truncate)
            .append(!truncate)
            .open(&self.path)
            .map_err(ConnectorError::from)?;
        let write_headers = truncate && self.settings.has_headers;
        let mut writer = WriterBuilder::new()
            .delimiter(self.settings.delimiter)
            .has_headers(false)
            .from_writer(BufWriter::new(file));
        if write_headers {
            let names: Vec<&str> = schema.columns().iter().map(|c| c.name.as_str()).collect();
            writer.write_record(&names).map_err(ConnectorError::from)?;
        }
        self.inner = Some(writer);
        Ok(())
    }

    async fn write_batch(&mut self, rows: &[Row]) -> Result<()> {
        let writer = self.inner.as_mut().ok_or_else(|| ConnectorError::Fatal("CSV sink not opened".into()))?;
        for row in rows {
            let fields: Vec<String> = row.values().iter().map(Value::as_display_string).collect();
            writer.write_record(&fields).map_err(ConnectorError::from)?;
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(mut writer) = self.inner.take() {
            writer.flush().map_err(|e| ConnectorError::from(std::io::Error::from(e)))?;
        }
        Ok(())
    }
}
