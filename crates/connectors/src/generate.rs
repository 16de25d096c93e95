//! The synthetic `generate:<N>[;rate=R]` reader (spec §6): a sequence of
//! rows with a single monotonically increasing `SampleIndex` column, at an
//! optional rate limit. Used by the CLI's scenario tests and as a
//! dependency-free smoke-test source.

use async_trait::async_trait;
use tokio::time::{Duration, Instant};

use model::{GenerateSpec, LogicalType, PipeColumnInfo, Row, Schema, Value};

use crate::error::Result;
use crate::reader::{ReadResult, Reader, ReaderOptions};

pub struct GenerateReader {
    spec: GenerateSpec,
    emitted: u64,
    started_at: Option<Instant>,
}

impl GenerateReader {
    pub fn new(spec: GenerateSpec) -> Self {
        Self {
            spec,
            emitted: 0,
            started_at: None,
        }
    }
}

#[async_trait]
impl Reader for GenerateReader {
    async fn open(&mut self, _opts: &ReaderOptions) -> Result<Schema> {
        self.started_at = Some(Instant::now());
        Ok(Schema::new(vec![PipeColumnInfo::new("SampleIndex", LogicalType::Int64, false)]))
    }

    async fn read_batch(&mut self, batch_size: usize) -> Result<ReadResult> {
        let remaining = self.spec.count.saturating_sub(self.emitted);
        let take = remaining.min(batch_size as u64);

        if let Some(rate) = self.spec.rate_per_sec {
            if rate > 0 {
                let expected_elapsed = Duration::from_secs_f64(self.emitted as f64 / rate as f64);
                let actual_elapsed = self.started_at.map(|s| s.elapsed()).unwrap_or_default();
                if expected_elapsed > actual_elapsed {
                    tokio::time::sleep(expected_elapsed - actual_elapsed).await;
                }
            }
        }

        let rows: Vec<Row> = (0..take).map(|i| Row::new(vec![Value::Int64((self.emitted + i) as i64)])).collect();
        self.emitted += take;
        Ok(ReadResult {
            rows,
            exhausted: self.emitted >= self.spec.count,
        })
    }

    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}
