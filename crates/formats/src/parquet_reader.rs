//! Streaming Parquet corpus reader
//!
//! Decodes Parquet row groups batch by batch and converts each row into a
//! JSON object so the rest of the pipeline sees the same `Record` shape as
//! for JSONL input.

use crate::{Error, Record, Result};
use arrow::array::{Array, AsArray};
use arrow::datatypes::{
    DataType, Float32Type, Float64Type, Int16Type, Int32Type, Int64Type, Int8Type, Schema,
    UInt16Type, UInt32Type, UInt64Type, UInt8Type,
};
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::{ParquetRecordBatchReader, ParquetRecordBatchReaderBuilder};
use serde_json::{Map, Number, Value};
use std::collections::VecDeque;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Rows decoded per Arrow batch
pub const DEFAULT_BATCH_SIZE: usize = 4096;

/// Streaming Parquet reader that yields one `Record` per row
pub struct ParquetReader {
    reader: ParquetRecordBatchReader,
    schema: Arc<Schema>,
    pending: VecDeque<Record>,
    batches_read: usize,
    records_read: usize,
    total_bytes: u64,
    total_rows: u64,
}

impl ParquetReader {
    /// Open a Parquet file
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_batch_size(path, DEFAULT_BATCH_SIZE)
    }

    /// Open a Parquet file decoding `batch_size` rows at a time
    pub fn open_with_batch_size<P: AsRef<Path>>(path: P, batch_size: usize) -> Result<Self> {
        let path = path.as_ref();
        debug!("Opening Parquet file: {:?}", path);

        let file = File::open(path)?;
        let total_bytes = file.metadata()?.len();

        let builder = ParquetRecordBatchReaderBuilder::try_new(file)?.with_batch_size(batch_size);
        let total_rows = builder.metadata().file_metadata().num_rows().max(0) as u64;
        let schema = builder.schema().clone();
        debug!("Parquet file has {} rows", total_rows);

        Ok(Self {
            reader: builder.build()?,
            schema,
            pending: VecDeque::new(),
            batches_read: 0,
            records_read: 0,
            total_bytes,
            total_rows,
        })
    }

    /// Arrow schema of the file
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn total_bytes(&self) -> Option<u64> {
        Some(self.total_bytes)
    }

    /// Row count from the file footer
    pub fn total_records(&self) -> Option<u64> {
        Some(self.total_rows)
    }

    pub fn batches_processed(&self) -> usize {
        self.batches_read
    }

    pub fn records_processed(&self) -> usize {
        self.records_read
    }

    fn queue_batch(&mut self, batch: RecordBatch) -> Result<()> {
        // Row indices continue across batches.
        let start = self.records_read + self.pending.len();
        for row in 0..batch.num_rows() {
            let mut map = Map::with_capacity(batch.num_columns());
            for (field, column) in self.schema.fields().iter().zip(batch.columns()) {
                map.insert(field.name().clone(), cell_to_json(column.as_ref(), row)?);
            }
            self.pending.push_back(Record::new(Value::Object(map), start + row));
        }
        self.batches_read += 1;
        Ok(())
    }
}

impl Iterator for ParquetReader {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(record) = self.pending.pop_front() {
                self.records_read += 1;
                return Some(Ok(record));
            }

            match self.reader.next()? {
                Ok(batch) => {
                    if let Err(e) = self.queue_batch(batch) {
                        return Some(Err(e));
                    }
                }
                Err(e) => return Some(Err(Error::ArrowError(e))),
            }
        }
    }
}

fn float_to_json(value: f64) -> Value {
    Number::from_f64(value).map(Value::Number).unwrap_or(Value::Null)
}

/// Convert a single Arrow cell to JSON
fn cell_to_json(array: &dyn Array, row: usize) -> Result<Value> {
    if array.is_null(row) {
        return Ok(Value::Null);
    }

    let value = match array.data_type() {
        DataType::Boolean => Value::Bool(array.as_boolean().value(row)),
        DataType::Int8 => array.as_primitive::<Int8Type>().value(row).into(),
        DataType::Int16 => array.as_primitive::<Int16Type>().value(row).into(),
        DataType::Int32 => array.as_primitive::<Int32Type>().value(row).into(),
        DataType::Int64 => array.as_primitive::<Int64Type>().value(row).into(),
        DataType::UInt8 => array.as_primitive::<UInt8Type>().value(row).into(),
        DataType::UInt16 => array.as_primitive::<UInt16Type>().value(row).into(),
        DataType::UInt32 => array.as_primitive::<UInt32Type>().value(row).into(),
        DataType::UInt64 => array.as_primitive::<UInt64Type>().value(row).into(),
        DataType::Float32 => float_to_json(array.as_primitive::<Float32Type>().value(row) as f64),
        DataType::Float64 => float_to_json(array.as_primitive::<Float64Type>().value(row)),
        DataType::Utf8 => Value::String(array.as_string::<i32>().value(row).to_string()),
        DataType::LargeUtf8 => Value::String(array.as_string::<i64>().value(row).to_string()),
        DataType::List(_) => list_to_json(array.as_list::<i32>().value(row).as_ref())?,
        DataType::LargeList(_) => list_to_json(array.as_list::<i64>().value(row).as_ref())?,
        DataType::Struct(fields) => {
            let array = array.as_struct();
            let mut map = Map::with_capacity(fields.len());
            for (field, column) in fields.iter().zip(array.columns()) {
                map.insert(field.name().clone(), cell_to_json(column.as_ref(), row)?);
            }
            Value::Object(map)
        }
        other => {
            return Err(Error::InvalidFile(format!(
                "unsupported Parquet column type: {}",
                other
            )))
        }
    };

    Ok(value)
}

fn list_to_json(list: &dyn Array) -> Result<Value> {
    (0..list.len())
        .map(|i| cell_to_json(list, i))
        .collect::<Result<Vec<_>>>()
        .map(Value::Array)
}
