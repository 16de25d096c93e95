use serde::{Deserialize, Serialize};
use xxhash_rust::xxh3::xxh3_64_with_seed;

use crate::core::identifiers::BatchId;
use crate::core::schema::Schema;
use crate::records::row::Row;

/// A contiguous buffer of rows produced by the reader or by a transformer.
/// Size bounded by the configured `batchSize`. A batch never crosses schema
/// boundaries — a schema change forces a new batch.
#[derive(Debug, Clone)]
pub struct Batch {
    id: BatchId,
    schema: Schema,
    rows: Vec<Row>,
}

impl Batch {
    pub fn new(schema: Schema, rows: Vec<Row>) -> Self {
        Self {
            id: BatchId::new(),
            schema,
            rows,
        }
    }

    pub fn id(&self) -> &BatchId {
        &self.id
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn size_bytes(&self) -> usize {
        self.rows.iter().map(Row::size_bytes).sum()
    }

    /// In-memory only, not a resume/checkpoint mechanism: used by the batch
    /// failure analyzer's bisection (§4.3) and by tests asserting a batch
    /// was not silently mutated in transit between stages.
    pub fn manifest(&self) -> Manifest {
        manifest_for(&self.rows)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub row_count: usize,
    pub checksum_xxh3: u64,
}

pub fn manifest_for(rows: &[Row]) -> Manifest {
    let mut checksum: u64 = 0;
    for (i, row) in rows.iter().enumerate() {
        let canon: String = row
            .values()
            .iter()
            .map(|v| v.as_display_string())
            .collect::<Vec<_>>()
            .join("\u{1f}");
        checksum ^= xxh3_64_with_seed(canon.as_bytes(), i as u64);
    }
    Manifest {
        row_count: rows.len(),
        checksum_xxh3: checksum,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::data_type::LogicalType;
    use crate::core::schema::PipeColumnInfo;
    use crate::core::value::Value;

    fn schema() -> Schema {
        Schema::new(vec![PipeColumnInfo::new("id", LogicalType::Int64, false)])
    }

    #[test]
    fn manifest_is_stable_for_identical_rows() {
        let rows = vec![Row::new(vec![Value::Int64(1)]), Row::new(vec![Value::Int64(2)])];
        let a = manifest_for(&rows);
        let b = manifest_for(&rows);
        assert_eq!(a, b);
        assert_eq!(a.row_count, 2);
    }

    #[test]
    fn manifest_changes_with_row_order() {
        let forward = vec![Row::new(vec![Value::Int64(1)]), Row::new(vec![Value::Int64(2)])];
        let reversed = vec![Row::new(vec![Value::Int64(2)]), Row::new(vec![Value::Int64(1)])];
        assert_ne!(manifest_for(&forward), manifest_for(&reversed));
    }

    #[test]
    fn batch_exposes_schema_and_rows() {
        let batch = Batch::new(schema(), vec![Row::new(vec![Value::Int64(1)])]);
        assert_eq!(batch.len(), 1);
        assert_eq!(batch.schema().len(), 1);
    }
}
