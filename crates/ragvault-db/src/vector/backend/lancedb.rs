//! LanceDB vector store backend.
//!
//! Production vector search with ANN support. Filterable fields live in
//! dedicated columns; the rest of the chunk metadata is a JSON `payload`
//! column.

use super::super::config::{VectorStoreConfig, DEFAULT_BACKEND, LANCEDB_TABLE_NAME};
use super::super::record::{RecordFilter, StoredRecord};
use super::super::traits::{VectorHit, VectorStore};
use crate::error::{DbError, DbResult};
use arrow_array::{
    Array, ArrayRef, FixedSizeListArray, Float32Array, RecordBatch, RecordBatchIterator,
    StringArray,
};
use arrow_schema::{DataType, Field, Schema};
use async_trait::async_trait;
use futures::TryStreamExt;
use lance_arrow::FixedSizeListArrayExt;
use lancedb::{
    connect,
    query::{ExecutableQuery, QueryBase},
    Connection, DistanceType, Table,
};
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use tracing::{debug, trace};

/// LanceDB vector store backend.
pub struct LanceDbVectorStore {
    /// Path to the store directory.
    path: PathBuf,

    /// Vector dimension.
    dimension: usize,

    /// LanceDB connection.
    #[allow(dead_code)]
    connection: Connection,

    /// LanceDB table; `None` once closed.
    table: RwLock<Option<Table>>,
}

impl LanceDbVectorStore {
    /// Open or create a LanceDB vector store.
    pub async fn open(config: &VectorStoreConfig) -> DbResult<Self> {
        debug!("Opening LanceDbVectorStore at {:?}", config.path);

        let connection = connect(config.path.to_string_lossy().as_ref())
            .execute()
            .await
            .map_err(|e| DbError::lance(format!("Failed to connect: {}", e)))?;

        let table_names = connection
            .table_names()
            .execute()
            .await
            .map_err(|e| DbError::lance(format!("Failed to list tables: {}", e)))?;

        let table = if table_names.contains(&LANCEDB_TABLE_NAME.to_string()) {
            debug!("Opening existing table '{}'", LANCEDB_TABLE_NAME);
            connection
                .open_table(LANCEDB_TABLE_NAME)
                .execute()
                .await
                .map_err(|e| DbError::lance(format!("Failed to open table: {}", e)))?
        } else {
            debug!("Creating new table '{}'", LANCEDB_TABLE_NAME);
            let schema = Arc::new(create_schema(config.dimension));
            let batch = records_to_batch(&schema, config.dimension, &[])?;
            let batches = RecordBatchIterator::new(vec![Ok(batch)], schema);

            connection
                .create_table(LANCEDB_TABLE_NAME, Box::new(batches))
                .execute()
                .await
                .map_err(|e| DbError::lance(format!("Failed to create table: {}", e)))?
        };

        Ok(Self {
            path: config.path.clone(),
            dimension: config.dimension,
            connection,
            table: RwLock::new(Some(table)),
        })
    }

    /// Get the table handle, failing if the store was closed.
    fn get_table(&self) -> DbResult<Table> {
        let guard = self
            .table
            .read()
            .map_err(|e| DbError::internal(format!("Failed to acquire table lock: {}", e)))?;

        guard.clone().ok_or_else(|| {
            DbError::internal(format!(
                "Vector store at {} has been closed",
                self.path.display()
            ))
        })
    }
}

/// Create the Arrow schema for stored records.
fn create_schema(dimension: usize) -> Schema {
    Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new(
            "vector",
            DataType::FixedSizeList(
                Arc::new(Field::new("item", DataType::Float32, true)),
                dimension as i32,
            ),
            false,
        ),
        Field::new("text", DataType::Utf8, false),
        Field::new("file_path", DataType::Utf8, false),
        Field::new("record_type", DataType::Utf8, false),
        Field::new("message_id", DataType::Utf8, true),
        Field::new("payload", DataType::Utf8, true),
    ])
}

/// Convert records to a RecordBatch. An empty slice yields an empty batch.
fn records_to_batch(
    schema: &Arc<Schema>,
    dimension: usize,
    records: &[StoredRecord],
) -> DbResult<RecordBatch> {
    let ids: ArrayRef = Arc::new(StringArray::from(
        records.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(),
    ));

    let flat_vectors: Vec<f32> = records.iter().flat_map(|r| r.vector.clone()).collect();
    let values = Float32Array::from(flat_vectors);
    let vector_array = FixedSizeListArray::try_new_from_values(values, dimension as i32)
        .map_err(|e| DbError::internal(format!("Failed to create vector array: {}", e)))?;
    let vectors: ArrayRef = Arc::new(vector_array);

    let texts: ArrayRef = Arc::new(StringArray::from(
        records.iter().map(|r| r.text.as_str()).collect::<Vec<_>>(),
    ));

    let file_paths: ArrayRef = Arc::new(StringArray::from(
        records
            .iter()
            .map(|r| r.file_path.as_str())
            .collect::<Vec<_>>(),
    ));

    let record_types: ArrayRef = Arc::new(StringArray::from(
        records
            .iter()
            .map(|r| r.record_type.as_str())
            .collect::<Vec<_>>(),
    ));

    let message_ids: ArrayRef = Arc::new(StringArray::from(
        records
            .iter()
            .map(|r| r.message_id.as_deref())
            .collect::<Vec<_>>(),
    ));

    let payloads: ArrayRef = Arc::new(StringArray::from(
        records
            .iter()
            .map(|r| serde_json::to_string(&r.payload).ok())
            .collect::<Vec<_>>(),
    ));

    RecordBatch::try_new(
        schema.clone(),
        vec![
            ids,
            vectors,
            texts,
            file_paths,
            record_types,
            message_ids,
            payloads,
        ],
    )
    .map_err(|e| DbError::internal(format!("Failed to create batch: {}", e)))
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> DbResult<&'a StringArray> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<StringArray>())
        .ok_or_else(|| DbError::internal(format!("Missing or invalid column '{}'", name)))
}

/// Convert a RecordBatch back into records, with `_distance` when present.
fn batch_to_records(batch: &RecordBatch) -> DbResult<Vec<(StoredRecord, Option<f32>)>> {
    let ids = string_column(batch, "id")?;
    let texts = string_column(batch, "text")?;
    let file_paths = string_column(batch, "file_path")?;
    let record_types = string_column(batch, "record_type")?;
    let message_ids = string_column(batch, "message_id")?;
    let payloads = string_column(batch, "payload")?;

    let vectors = batch
        .column_by_name("vector")
        .and_then(|c| c.as_any().downcast_ref::<FixedSizeListArray>());

    let distances = batch
        .column_by_name("_distance")
        .and_then(|c| c.as_any().downcast_ref::<Float32Array>());

    let mut out = Vec::with_capacity(batch.num_rows());
    for i in 0..batch.num_rows() {
        let vector = vectors
            .map(|v| {
                let item = v.value(i);
                item.as_any()
                    .downcast_ref::<Float32Array>()
                    .map(|f| f.values().to_vec())
                    .unwrap_or_default()
            })
            .unwrap_or_default();

        let payload = if payloads.is_null(i) {
            serde_json::json!({})
        } else {
            serde_json::from_str(payloads.value(i)).unwrap_or(serde_json::json!({}))
        };

        let message_id = if message_ids.is_null(i) {
            None
        } else {
            Some(message_ids.value(i).to_string())
        };

        let record = StoredRecord {
            id: ids.value(i).to_string(),
            vector,
            text: texts.value(i).to_string(),
            file_path: file_paths.value(i).to_string(),
            record_type: record_types.value(i).to_string(),
            message_id,
            payload,
        };

        out.push((record, distances.map(|d| d.value(i))));
    }

    Ok(out)
}

#[async_trait]
impl VectorStore for LanceDbVectorStore {
    async fn add(&self, records: &[StoredRecord]) -> DbResult<()> {
        if records.is_empty() {
            return Ok(());
        }

        for record in records {
            if record.vector.len() != self.dimension {
                return Err(DbError::DimensionMismatch {
                    expected: self.dimension,
                    actual: record.vector.len(),
                });
            }
        }

        debug!("Adding {} records", records.len());
        let table = self.get_table()?;

        let schema = Arc::new(create_schema(self.dimension));
        let batch = records_to_batch(&schema, self.dimension, records)?;
        let batches = RecordBatchIterator::new(vec![Ok(batch)], schema);

        table
            .add(Box::new(batches))
            .execute()
            .await
            .map_err(|e| DbError::lance(format!("Insert failed: {}", e)))?;

        Ok(())
    }

    async fn search(&self, embedding: &[f32], limit: usize) -> DbResult<Vec<VectorHit>> {
        trace!("Searching LanceDbVectorStore, limit={}", limit);

        if embedding.len() != self.dimension {
            return Err(DbError::DimensionMismatch {
                expected: self.dimension,
                actual: embedding.len(),
            });
        }

        let table = self.get_table()?;

        let results = table
            .vector_search(embedding.to_vec())
            .map_err(|e| DbError::lance(format!("Failed to create query: {}", e)))?
            .distance_type(DistanceType::Cosine)
            .limit(limit)
            .execute()
            .await
            .map_err(|e| DbError::lance(format!("Query failed: {}", e)))?;

        let batches: Vec<RecordBatch> = results
            .try_collect()
            .await
            .map_err(|e| DbError::lance(format!("Failed to collect results: {}", e)))?;

        let mut hits = Vec::new();
        for batch in &batches {
            for (record, distance) in batch_to_records(batch)? {
                hits.push(VectorHit::new(record, distance.unwrap_or(f32::MAX)));
            }
        }

        hits.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        Ok(hits)
    }

    async fn delete(&self, filter: &RecordFilter) -> DbResult<()> {
        let table = self.get_table()?;
        let predicate = filter.to_lance_filter().unwrap_or_else(|| "true".to_string());
        debug!("Deleting records where {}", predicate);

        table
            .delete(&predicate)
            .await
            .map_err(|e| DbError::lance(format!("Delete failed: {}", e)))?;
        Ok(())
    }

    async fn count(&self) -> DbResult<usize> {
        let table = self.get_table()?;
        let count = table
            .count_rows(None)
            .await
            .map_err(|e| DbError::lance(format!("Count failed: {}", e)))?;
        Ok(count)
    }

    async fn scan(&self) -> DbResult<Vec<StoredRecord>> {
        let table = self.get_table()?;

        let stream = table
            .query()
            .execute()
            .await
            .map_err(|e| DbError::lance(format!("Scan failed: {}", e)))?;

        let batches: Vec<RecordBatch> = stream
            .try_collect()
            .await
            .map_err(|e| DbError::lance(format!("Failed to collect rows: {}", e)))?;

        let mut records = Vec::new();
        for batch in &batches {
            records.extend(batch_to_records(batch)?.into_iter().map(|(r, _)| r));
        }
        Ok(records)
    }

    async fn sample(&self, limit: usize) -> DbResult<Vec<StoredRecord>> {
        let table = self.get_table()?;

        let stream = table
            .query()
            .limit(limit)
            .execute()
            .await
            .map_err(|e| DbError::lance(format!("Sample query failed: {}", e)))?;

        let batches: Vec<RecordBatch> = stream
            .try_collect()
            .await
            .map_err(|e| DbError::lance(format!("Failed to collect rows: {}", e)))?;

        let mut records = Vec::new();
        for batch in &batches {
            records.extend(batch_to_records(batch)?.into_iter().map(|(r, _)| r));
        }
        Ok(records)
    }

    async fn close(&self) -> DbResult<()> {
        let mut guard = self
            .table
            .write()
            .map_err(|e| DbError::internal(format!("Failed to acquire table lock: {}", e)))?;
        *guard = None;
        debug!("Closed LanceDbVectorStore at {:?}", self.path);
        Ok(())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn backend_name(&self) -> &'static str {
        DEFAULT_BACKEND
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_round_trip_keeps_nullable_columns() {
        let schema = Arc::new(create_schema(2));
        let records = vec![
            StoredRecord::new("a", vec![0.5, 0.5], "alpha", "a.md"),
            StoredRecord::new("b", vec![1.0, 0.0], "beta", "b.md")
                .with_record_type("pinned_user")
                .with_message_id("m-9")
                .with_payload(serde_json::json!({"priority": 2})),
        ];

        let batch = records_to_batch(&schema, 2, &records).unwrap();
        assert_eq!(batch.num_rows(), 2);

        let parsed = batch_to_records(&batch).unwrap();
        assert_eq!(parsed[0].0.message_id, None);
        assert_eq!(parsed[1].0.message_id.as_deref(), Some("m-9"));
        assert_eq!(parsed[1].0.payload["priority"], 2);
        assert_eq!(parsed[1].0.vector, vec![1.0, 0.0]);
        assert!(parsed[0].1.is_none());
    }

    #[test]
    fn test_empty_batch() {
        let schema = Arc::new(create_schema(4));
        let batch = records_to_batch(&schema, 4, &[]).unwrap();
        assert_eq!(batch.num_rows(), 0);
    }
}
